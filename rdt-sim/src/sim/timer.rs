//! Per-entity countdown timers built on the event list.
//!
//! Each entity owns at most one timer. A running timer is nothing more than a
//! pending [`Event::TimerInterrupt`] addressed to that entity, so starting,
//! stopping and querying a timer are event list operations.

use super::{
    events::{Entity, Event, EventKind, SimTime},
    world::SimWorld,
};

impl SimWorld {
    /// Start the timer of `entity`, expiring `increment` time units from now.
    ///
    /// Starting a timer that is already running is a warning, not an error:
    /// the running timer is left untouched and `false` is returned.
    pub fn start_timer(&mut self, entity: Entity, increment: SimTime) -> bool {
        if self.timer_running(entity) {
            tracing::warn!(
                target: "rdt_sim::timer",
                %entity,
                now = self.current_time,
                "attempt to start a timer that is already started"
            );
            return false;
        }

        tracing::trace!(
            target: "rdt_sim::timer",
            %entity,
            now = self.current_time,
            expires = self.current_time + increment,
            "start timer"
        );
        self.schedule_event(Event::TimerInterrupt { entity }, increment);
        true
    }

    /// Stop the timer of `entity`.
    ///
    /// Stopping a timer that is not running is a warning; returns whether a
    /// pending timer was cancelled.
    pub fn stop_timer(&mut self, entity: Entity) -> bool {
        let cancelled = self
            .event_queue
            .cancel_matching(EventKind::TimerInterrupt, entity);

        if cancelled {
            tracing::trace!(
                target: "rdt_sim::timer",
                %entity,
                now = self.current_time,
                "stop timer"
            );
        } else {
            tracing::warn!(
                target: "rdt_sim::timer",
                %entity,
                now = self.current_time,
                "unable to cancel timer, it wasn't running"
            );
        }
        cancelled
    }

    /// Whether `entity` has a pending timer.
    pub fn timer_running(&self, entity: Entity) -> bool {
        self.event_queue
            .contains(EventKind::TimerInterrupt, entity)
    }
}
