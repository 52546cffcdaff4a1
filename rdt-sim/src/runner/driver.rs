//! The driver loop: pops events in time order and routes them to the
//! entities until the run is over.

use std::{collections::HashMap, fmt, time::Instant};

use tracing::instrument;

use crate::{
    always_assert,
    protocol::{
        ApplicationSink, EntityContext, Message, Packet, Payload, Receiver, Sender,
    },
    sim::{ChannelOutcome, Entity, Event, SimTime, SimWorld},
    sometimes_assert, SimulationConfig, SimulationError, SimulationResult,
};

use super::report::SimulationMetrics;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The last message was generated and draining was disabled.
    MessageLimitReached,
    /// Every generated message was handled and the event list emptied.
    Drained,
    /// The event list emptied before the message limit was reached.
    EventListExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::MessageLimitReached => f.write_str("message limit reached"),
            StopReason::Drained => f.write_str("drained"),
            StopReason::EventListExhausted => f.write_str("event list exhausted"),
        }
    }
}

/// One complete simulation: the world, both entities and the application
/// sink receiving B's deliveries.
#[derive(Debug)]
pub struct Simulation<S> {
    world: SimWorld,
    sender: Sender,
    receiver: Receiver,
    sink: S,
    last_arrival: HashMap<Entity, SimTime>,
    finished: bool,
}

impl<S: ApplicationSink> Simulation<S> {
    /// Validate `config` and wire up a fresh simulation.
    ///
    /// Creating the world reseeds the thread-local RNG with `config.seed`.
    pub fn new(config: SimulationConfig, sink: S) -> SimulationResult<Self> {
        config.validate()?;
        let sender = Sender::new(config.timeout);
        Ok(Self {
            world: SimWorld::new(config),
            sender,
            receiver: Receiver::new(),
            sink,
            last_arrival: HashMap::new(),
            finished: false,
        })
    }

    /// The simulation world.
    pub fn world(&self) -> &SimWorld {
        &self.world
    }

    /// Mutable access to the world, for scripting channel faults before a run.
    pub fn world_mut(&mut self) -> &mut SimWorld {
        &mut self.world
    }

    /// Entity A.
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Entity B.
    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// The application sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the simulation and return the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run the event loop to completion.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::UnroutableEvent`] if an event reaches an
    /// entity that cannot handle it, and [`SimulationError::AlreadyFinished`]
    /// if the simulation already ran. A simulation runs once; its counters
    /// are frozen afterwards.
    ///
    /// # Panics
    ///
    /// Panics through `always_assert!` if a protocol invariant is violated.
    #[instrument(skip(self), fields(seed = self.world.config().seed))]
    pub fn run(&mut self) -> SimulationResult<SimulationMetrics> {
        if self.finished {
            return Err(SimulationError::AlreadyFinished {
                time: self.world.current_time(),
            });
        }
        self.finished = true;

        let started = Instant::now();
        let max_messages = self.world.config().max_messages;
        let drain = self.world.config().drain_in_flight;

        if max_messages > 0 {
            self.world.generate_next_arrival();
        }

        let stop_reason = loop {
            let generated = self.world.stats().messages_generated;
            if !drain && generated >= max_messages {
                break StopReason::MessageLimitReached;
            }

            let Some(scheduled) = self.world.next_event() else {
                if generated >= max_messages {
                    break StopReason::Drained;
                }
                tracing::warn!(
                    target: "rdt_sim::driver",
                    now = self.world.current_time(),
                    generated,
                    max_messages,
                    "event list empty before message limit"
                );
                break StopReason::EventListExhausted;
            };

            let time = scheduled.time();
            self.dispatch(time, scheduled.into_event())?;
        };

        self.world.log_event_list();
        let stats = self.world.stats();
        sometimes_assert!(
            timeout_retransmission,
            self.sender.counters().timeout_retransmissions > 0,
            "sender timer expired at least once"
        );
        tracing::info!(
            target: "rdt_sim::driver",
            %stop_reason,
            "Simulator terminated at time {:.3} after sending {} msgs from the application",
            self.world.current_time(),
            stats.messages_generated
        );

        Ok(SimulationMetrics {
            seed: self.world.config().seed,
            wall_time: started.elapsed(),
            simulated_time: self.world.current_time(),
            events_processed: self.world.events_processed(),
            stop_reason,
            channel: stats,
            sender: self.sender.counters(),
            receiver: self.receiver.counters(),
        })
    }

    fn dispatch(&mut self, time: SimTime, event: Event) -> SimulationResult<()> {
        tracing::debug!(
            target: "rdt_sim::driver",
            time,
            kind = ?event.kind(),
            entity = %event.entity(),
            "event"
        );

        match event {
            Event::AppMessageArrival { entity: Entity::A } => self.on_app_message(),
            Event::TimerInterrupt { entity: Entity::A } => {
                let mut layer = Layer::new(&mut self.world, &mut self.sink, Entity::A);
                self.sender.on_timer_interrupt(&mut layer);
                Ok(())
            }
            Event::ChannelPacketArrival {
                entity,
                packet,
                corrupted,
            } => {
                self.on_channel_arrival(time, entity, &packet, corrupted);
                Ok(())
            }
            unroutable => Err(SimulationError::UnroutableEvent {
                kind: unroutable.kind(),
                entity: unroutable.entity(),
                time,
            }),
        }
    }

    fn on_app_message(&mut self) -> SimulationResult<()> {
        let max_messages = self.world.config().max_messages;
        let drain = self.world.config().drain_in_flight;

        let generated = self.world.record_message_generated();
        if !drain || generated < max_messages {
            self.world.generate_next_arrival();
        }

        let message = Message::synthesize(generated - 1);
        let mut layer = Layer::new(&mut self.world, &mut self.sink, Entity::A);
        let accepted = self.sender.on_app_message(&mut layer, message);

        sometimes_assert!(sender_busy, !accepted, "application message dropped by busy sender");
        let counters = self.sender.counters();
        always_assert!(
            single_outstanding_packet,
            counters.messages_accepted <= counters.acks_received + 1,
            format!(
                "sender has {} accepted messages but only {} ACKs",
                counters.messages_accepted, counters.acks_received
            )
        );
        Ok(())
    }

    fn on_channel_arrival(
        &mut self,
        time: SimTime,
        entity: Entity,
        packet: &Packet,
        corrupted: bool,
    ) {
        always_assert!(
            checksum_detects_corruption,
            packet.is_intact() != corrupted,
            format!("checksum check disagrees with channel for {packet:?}")
        );
        let previous = self.last_arrival.insert(entity, time);
        always_assert!(
            fifo_arrivals,
            previous.map_or(true, |previous| previous <= time),
            format!("arrival at {entity} went back in time to {time}")
        );

        match entity {
            Entity::A => {
                sometimes_assert!(ack_corrupted, corrupted, "ACK/NACK corrupted in transit");
                let mut layer = Layer::new(&mut self.world, &mut self.sink, Entity::A);
                self.sender.on_channel_packet(&mut layer, packet);
            }
            Entity::B => {
                sometimes_assert!(data_corrupted, corrupted, "data packet corrupted in transit");
                let before = self.receiver.counters();
                let previous_seq = self.receiver.last_delivered().map(|p| p.seq_num);

                let mut layer = Layer::new(&mut self.world, &mut self.sink, Entity::B);
                self.receiver.on_channel_packet(&mut layer, packet);

                let after = self.receiver.counters();
                if !corrupted {
                    sometimes_assert!(
                        duplicate_suppressed,
                        after.duplicates_suppressed > before.duplicates_suppressed,
                        "receiver saw a retransmission of a delivered packet"
                    );
                }
                if after.delivered > before.delivered {
                    self.check_delivery(previous_seq);
                }
            }
        }
    }

    fn check_delivery(&self, previous_seq: Option<i32>) {
        let delivered = self.receiver.last_delivered().map(|p| (p.seq_num, p.payload));
        let outstanding = self.sender.last_sent().map(|p| p.payload);

        always_assert!(
            alternating_delivery,
            delivered.map(|(seq, _)| seq) != previous_seq,
            format!("receiver delivered sequence {previous_seq:?} twice in a row")
        );
        always_assert!(
            delivers_outstanding_message,
            delivered.map(|(_, payload)| payload) == outstanding,
            "receiver delivered a payload the sender is not waiting on"
        );
    }
}

/// The services one entity sees during a single event.
struct Layer<'a, S> {
    world: &'a mut SimWorld,
    sink: &'a mut S,
    entity: Entity,
}

impl<'a, S> Layer<'a, S> {
    fn new(world: &'a mut SimWorld, sink: &'a mut S, entity: Entity) -> Self {
        Self {
            world,
            sink,
            entity,
        }
    }
}

impl<S: ApplicationSink> EntityContext for Layer<'_, S> {
    fn now(&self) -> SimTime {
        self.world.current_time()
    }

    fn to_channel(&mut self, packet: &Packet) {
        let outcome = self.world.send_to_channel(self.entity, packet);
        sometimes_assert!(
            packet_lost,
            outcome == ChannelOutcome::Lost,
            "channel dropped a packet"
        );
    }

    fn start_timer(&mut self, increment: SimTime) {
        self.world.start_timer(self.entity, increment);
    }

    fn stop_timer(&mut self) {
        self.world.stop_timer(self.entity);
    }

    fn to_application(&mut self, payload: &Payload) {
        self.sink.deliver(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chaos::get_assertion_results,
        protocol::RecordingSink,
        sim::{Corruption, ScriptedFault},
    };

    fn reliable(messages: u64) -> SimulationConfig {
        SimulationConfig::reliable()
            .with_max_messages(messages)
            .with_timeout(100.0)
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = Simulation::new(
            SimulationConfig::default().with_loss_prob(1.5),
            RecordingSink::new(),
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::InvalidConfiguration(_)));
    }

    #[test]
    fn single_message_over_perfect_channel() {
        let mut sim = Simulation::new(reliable(1), RecordingSink::new()).unwrap();
        let metrics = sim.run().unwrap();

        assert_eq!(metrics.stop_reason, StopReason::Drained);
        assert_eq!(metrics.channel.messages_generated, 1);
        assert_eq!(metrics.channel.packets_sent, 2);
        assert_eq!(metrics.receiver.delivered, 1);
        assert_eq!(sim.sink().delivered(), &[Message::synthesize(0).data]);
        assert_eq!(
            sim.sender().state(),
            crate::protocol::SenderState::Idle
        );
        assert!(!sim.world().has_pending_events());
    }

    #[test]
    fn zero_messages_stops_immediately() {
        let mut sim = Simulation::new(reliable(0), RecordingSink::new()).unwrap();
        let metrics = sim.run().unwrap();
        assert_eq!(metrics.stop_reason, StopReason::Drained);
        assert_eq!(metrics.events_processed, 0);
    }

    #[test]
    fn without_drain_stops_right_after_last_message() {
        let config = reliable(3).with_drain_in_flight(false);
        let mut sim = Simulation::new(config, RecordingSink::new()).unwrap();
        let metrics = sim.run().unwrap();

        assert_eq!(metrics.stop_reason, StopReason::MessageLimitReached);
        assert_eq!(metrics.channel.messages_generated, 3);
        // The third data packet is still in flight.
        assert!(sim.world().has_pending_events());
        assert!(metrics.receiver.delivered < 3);
    }

    #[test]
    fn scripted_corruption_is_nacked_and_resent() {
        let mut sim = Simulation::new(reliable(1), RecordingSink::new()).unwrap();
        sim.world_mut()
            .inject_fault(Entity::A, ScriptedFault::Corrupt(Corruption::Payload));

        let metrics = sim.run().unwrap();
        assert_eq!(metrics.receiver.nacks_sent, 1);
        assert_eq!(metrics.sender.nack_retransmissions, 1);
        assert_eq!(metrics.receiver.delivered, 1);
        assert_eq!(sim.sink().len(), 1);
        assert_eq!(get_assertion_results()["data_corrupted"].successes, 1);
    }

    #[test]
    fn second_run_is_rejected_and_counters_stay_frozen() {
        let mut sim = Simulation::new(reliable(1), RecordingSink::new()).unwrap();
        let first = sim.run().unwrap();
        assert_eq!(first.channel.messages_generated, 1);

        let err = sim.run().unwrap_err();
        assert!(matches!(err, SimulationError::AlreadyFinished { .. }));
        assert_eq!(sim.world().stats(), first.channel);
        assert_eq!(sim.receiver().counters(), first.receiver);
        assert_eq!(sim.sink().len(), 1);
    }

    #[test]
    fn misrouted_event_is_fatal() {
        let mut sim = Simulation::new(reliable(1), RecordingSink::new()).unwrap();
        sim.world_mut()
            .schedule_event_at(Event::TimerInterrupt { entity: Entity::B }, 0.0);

        let err = sim.run().unwrap_err();
        assert!(matches!(
            err,
            SimulationError::UnroutableEvent {
                entity: Entity::B,
                ..
            }
        ));
    }

    #[test]
    fn closure_sink_sees_every_delivery() {
        let mut count = 0u64;
        let metrics = {
            let mut sim =
                Simulation::new(reliable(4), |_: &Payload| count += 1).unwrap();
            sim.run().unwrap()
        };
        assert_eq!(count, metrics.receiver.delivered);
    }
}
