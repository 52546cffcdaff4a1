//! Core simulation world: logical clock, event list and counters.
//!
//! The channel, timer and traffic operations are implemented on [`SimWorld`]
//! in their own modules; this file holds the state they share and the
//! scheduling primitives.

use std::collections::{HashMap, VecDeque};

use crate::{chaos::reset_assertion_results, SimulationConfig};

use super::{
    channel::ScriptedFault,
    events::{Entity, Event, EventQueue, ScheduledEvent, SimTime},
    rng::{reset_sim_rng, set_sim_seed},
    state::SimulationStats,
};

/// The central simulation coordinator that manages time and the event list.
///
/// `SimWorld` exclusively owns every pending [`Event`]: scheduling moves an
/// event in, [`SimWorld::next_event`] moves the earliest one out and advances
/// the clock to its timestamp. Nothing ever blocks; time only jumps forward.
#[derive(Debug)]
pub struct SimWorld {
    pub(crate) current_time: SimTime,
    pub(crate) event_queue: EventQueue,
    pub(crate) next_sequence: u64,
    pub(crate) config: SimulationConfig,
    pub(crate) stats: SimulationStats,
    pub(crate) scripted_faults: HashMap<Entity, VecDeque<ScriptedFault>>,
    pub(crate) events_processed: u64,
}

impl SimWorld {
    /// Creates a world for `config`, seeding the thread-local RNG with
    /// `config.seed`.
    ///
    /// The RNG is reset before seeding, which makes consecutive simulations
    /// on the same thread independent.
    pub fn new(config: SimulationConfig) -> Self {
        reset_sim_rng();
        set_sim_seed(config.seed);
        reset_assertion_results();

        Self {
            current_time: 0.0,
            event_queue: EventQueue::new(),
            next_sequence: 0,
            config,
            stats: SimulationStats::default(),
            scripted_faults: HashMap::new(),
            events_processed: 0,
        }
    }

    /// Returns the current simulation time.
    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    /// The configuration this world was created with.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> SimulationStats {
        self.stats
    }

    /// Number of events handed out by [`SimWorld::next_event`].
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Schedules an event to execute after `delay` from the current time.
    pub fn schedule_event(&mut self, event: Event, delay: SimTime) {
        let time = self.current_time + delay;
        self.schedule_event_at(event, time);
    }

    /// Schedules an event to execute at the absolute time `time`.
    ///
    /// Events at equal times execute in the order they were scheduled.
    pub fn schedule_event_at(&mut self, event: Event, time: SimTime) {
        tracing::trace!(
            target: "rdt_sim::scheduler",
            now = self.current_time,
            at = time,
            kind = ?event.kind(),
            entity = %event.entity(),
            "insert event"
        );
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.event_queue
            .schedule(ScheduledEvent::new(time, event, sequence));
    }

    /// Removes the earliest pending event and advances the clock to it.
    ///
    /// Returns `None` once the event list is empty.
    pub fn next_event(&mut self) -> Option<ScheduledEvent> {
        let scheduled = self.event_queue.pop_earliest()?;
        self.current_time = scheduled.time();
        self.events_processed += 1;
        Some(scheduled)
    }

    /// Returns `true` if there are events waiting to be processed.
    pub fn has_pending_events(&self) -> bool {
        !self.event_queue.is_empty()
    }

    /// Returns the number of events waiting to be processed.
    pub fn pending_event_count(&self) -> usize {
        self.event_queue.len()
    }

    /// Pending events in execution order.
    pub fn pending_events(&self) -> Vec<&ScheduledEvent> {
        self.event_queue.snapshot()
    }

    /// Dump the event list at trace level.
    pub fn log_event_list(&self) {
        for scheduled in self.event_queue.snapshot() {
            tracing::trace!(
                target: "rdt_sim::scheduler",
                time = scheduled.time(),
                kind = ?scheduled.event().kind(),
                entity = %scheduled.event().entity(),
                "pending event"
            );
        }
    }

    pub(crate) fn record_message_generated(&mut self) -> u64 {
        self.stats.messages_generated += 1;
        self.stats.messages_generated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_event_advances_clock() {
        let mut sim = SimWorld::new(SimulationConfig::reliable());
        sim.schedule_event(Event::TimerInterrupt { entity: Entity::A }, 7.5);
        sim.schedule_event(Event::AppMessageArrival { entity: Entity::A }, 2.0);

        let first = sim.next_event().map(|e| e.into_event());
        assert_eq!(first, Some(Event::AppMessageArrival { entity: Entity::A }));
        assert_eq!(sim.current_time(), 2.0);

        // Relative scheduling is anchored at the new current time.
        sim.schedule_event(Event::TimerInterrupt { entity: Entity::B }, 1.0);
        let second = sim.next_event().map(|e| e.time());
        assert_eq!(second, Some(3.0));

        assert_eq!(sim.next_event().map(|e| e.time()), Some(7.5));
        assert!(sim.next_event().is_none());
        assert_eq!(sim.events_processed(), 3);
    }

    #[test]
    fn equal_times_keep_insertion_order() {
        let mut sim = SimWorld::new(SimulationConfig::reliable());
        sim.schedule_event_at(Event::TimerInterrupt { entity: Entity::A }, 10.0);
        sim.schedule_event_at(Event::AppMessageArrival { entity: Entity::A }, 10.0);
        sim.schedule_event_at(Event::TimerInterrupt { entity: Entity::B }, 10.0);

        let kinds: Vec<_> = std::iter::from_fn(|| sim.next_event())
            .map(|e| (e.event().kind(), e.event().entity()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (crate::sim::EventKind::TimerInterrupt, Entity::A),
                (crate::sim::EventKind::AppMessageArrival, Entity::A),
                (crate::sim::EventKind::TimerInterrupt, Entity::B),
            ]
        );
    }

    #[test]
    fn new_world_starts_clean() {
        let sim = SimWorld::new(SimulationConfig::default().with_seed(5));
        assert_eq!(sim.current_time(), 0.0);
        assert_eq!(sim.stats(), SimulationStats::default());
        assert!(!sim.has_pending_events());
        assert_eq!(crate::sim::get_current_sim_seed(), 5);
    }
}
