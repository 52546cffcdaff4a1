//! End-to-end exchanges between A and B with scripted channel faults.
//!
//! The harness drives the entities by hand over a `SimWorld` so every packet
//! that enters the channel can be inspected.

use rdt_sim::{
    protocol::{
        nack_value, EntityContext, Message, Packet, Payload, Receiver, RecordingSink, Sender,
        SenderState,
    },
    sim::{Corruption, Entity, Event, ScriptedFault, SimTime, SimWorld},
    Simulation, SimulationConfig, StopReason,
};

const TIMEOUT: SimTime = 50.0;

struct Wire<'a> {
    world: &'a mut SimWorld,
    entity: Entity,
    sent: &'a mut Vec<(Entity, Packet)>,
    delivered: &'a mut Vec<Payload>,
}

impl EntityContext for Wire<'_> {
    fn now(&self) -> SimTime {
        self.world.current_time()
    }

    fn to_channel(&mut self, packet: &Packet) {
        self.sent.push((self.entity, *packet));
        self.world.send_to_channel(self.entity, packet);
    }

    fn start_timer(&mut self, increment: SimTime) {
        self.world.start_timer(self.entity, increment);
    }

    fn stop_timer(&mut self) {
        self.world.stop_timer(self.entity);
    }

    fn to_application(&mut self, payload: &Payload) {
        self.delivered.push(*payload);
    }
}

/// The world plus everything the entities emitted.
struct Net {
    world: SimWorld,
    sent: Vec<(Entity, Packet)>,
    delivered: Vec<Payload>,
}

impl Net {
    fn wire(&mut self, entity: Entity) -> Wire<'_> {
        Wire {
            world: &mut self.world,
            entity,
            sent: &mut self.sent,
            delivered: &mut self.delivered,
        }
    }
}

struct Harness {
    net: Net,
    sender: Sender,
    receiver: Receiver,
}

impl Harness {
    fn new() -> Self {
        let config = SimulationConfig::reliable().with_timeout(TIMEOUT);
        Self {
            sender: Sender::new(config.timeout),
            net: Net {
                world: SimWorld::new(config),
                sent: Vec::new(),
                delivered: Vec::new(),
            },
            receiver: Receiver::new(),
        }
    }

    fn offer(&mut self, index: u64) -> bool {
        self.sender
            .on_app_message(&mut self.net.wire(Entity::A), Message::synthesize(index))
    }

    fn run_until_quiet(&mut self) {
        while let Some(scheduled) = self.net.world.next_event() {
            match scheduled.into_event() {
                Event::TimerInterrupt { entity: Entity::A } => {
                    self.sender.on_timer_interrupt(&mut self.net.wire(Entity::A));
                }
                Event::ChannelPacketArrival {
                    entity: Entity::A,
                    packet,
                    ..
                } => {
                    self.sender
                        .on_channel_packet(&mut self.net.wire(Entity::A), &packet);
                }
                Event::ChannelPacketArrival {
                    entity: Entity::B,
                    packet,
                    ..
                } => {
                    self.receiver
                        .on_channel_packet(&mut self.net.wire(Entity::B), &packet);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
    }
}

#[test]
fn single_message_over_perfect_channel() {
    let mut h = Harness::new();
    assert!(h.offer(0));
    h.run_until_quiet();

    let data = Packet::new(0, 0, Message::synthesize(0).data);
    assert_eq!(
        h.net.sent,
        vec![(Entity::A, data), (Entity::B, Packet::control(0, 0))]
    );
    assert_eq!(h.net.delivered, vec![Message::synthesize(0).data]);
    assert_eq!(h.sender.state(), SenderState::Idle);
    assert_eq!(h.net.world.stats().packets_sent, 2);
}

#[test]
fn corrupted_data_is_nacked_and_resent_unchanged() {
    let mut h = Harness::new();
    h.net.world
        .inject_fault(Entity::A, ScriptedFault::Corrupt(Corruption::Payload));
    h.offer(0);
    h.run_until_quiet();

    let data = Packet::new(0, 0, Message::synthesize(0).data);
    assert_eq!(h.net.sent.len(), 4);
    assert_eq!(h.net.sent[0], (Entity::A, data));

    let (from, nack) = h.net.sent[1];
    assert_eq!(from, Entity::B);
    assert_eq!(nack.ack_num, nack_value(0));
    assert_eq!(nack.ack_num, -2);

    assert_eq!(h.net.sent[2], (Entity::A, data));
    assert_eq!(h.net.sent[3], (Entity::B, Packet::control(0, 0)));
    assert_eq!(h.net.delivered.len(), 1);
    assert_eq!(h.sender.counters().nack_retransmissions, 1);
    assert_eq!(h.sender.counters().timeout_retransmissions, 0);
}

#[test]
fn lost_ack_triggers_timeout_and_duplicate_suppression() {
    let mut h = Harness::new();
    h.net.world.inject_fault(Entity::B, ScriptedFault::Lose);
    h.offer(0);
    h.run_until_quiet();

    let data = Packet::new(0, 0, Message::synthesize(0).data);
    let ack = Packet::control(0, 0);
    // B's second ACK carries its flipped sequence bit.
    let reack = Packet::control(1, 0);
    assert_eq!(
        h.net.sent,
        vec![
            (Entity::A, data),
            (Entity::B, ack),
            (Entity::A, data),
            (Entity::B, reack),
        ]
    );
    assert_eq!(h.net.delivered.len(), 1);
    assert_eq!(h.receiver.counters().duplicates_suppressed, 1);
    assert_eq!(h.sender.counters().timeout_retransmissions, 1);
    assert_eq!(h.sender.state(), SenderState::Idle);
    assert!(h.net.world.current_time() >= TIMEOUT);
}

#[test]
fn corrupted_ack_is_recovered_by_timeout() {
    let mut h = Harness::new();
    h.net.world
        .inject_fault(Entity::B, ScriptedFault::Corrupt(Corruption::AckNum));
    h.offer(0);
    h.run_until_quiet();

    assert_eq!(h.sender.counters().corrupt_received, 1);
    assert_eq!(h.sender.counters().timeout_retransmissions, 1);
    assert_eq!(h.net.delivered.len(), 1);
    assert_eq!(h.sender.state(), SenderState::Idle);
}

#[test]
fn repeated_losses_resend_identical_copies() {
    let mut h = Harness::new();
    for _ in 0..3 {
        h.net.world.inject_fault(Entity::A, ScriptedFault::Lose);
    }
    h.offer(4);
    h.run_until_quiet();

    let copies: Vec<_> = h
        .net
        .sent
        .iter()
        .filter(|(from, _)| *from == Entity::A)
        .map(|(_, packet)| *packet)
        .collect();
    assert_eq!(copies.len(), 4);
    assert!(copies.iter().all(|p| *p == copies[0]));
    assert_eq!(h.net.world.stats().packets_lost, 3);
    assert_eq!(h.net.delivered, vec![Message::synthesize(4).data]);
}

#[test]
fn busy_sender_drops_second_message() {
    let mut h = Harness::new();
    assert!(h.offer(0));
    assert!(!h.offer(1));
    h.run_until_quiet();

    assert_eq!(h.net.delivered, vec![Message::synthesize(0).data]);
    assert_eq!(h.sender.counters().messages_discarded, 1);
}

#[test]
fn full_simulation_with_lost_ack() {
    let config = SimulationConfig::reliable()
        .with_max_messages(2)
        .with_mean_interarrival(100_000.0)
        .with_timeout(TIMEOUT);
    let mut simulation = Simulation::new(config, RecordingSink::new()).expect("valid config");
    simulation
        .world_mut()
        .inject_fault(Entity::B, ScriptedFault::Lose);

    let metrics = simulation.run().expect("run completes");

    assert_eq!(metrics.stop_reason, StopReason::Drained);
    assert_eq!(metrics.channel.packets_lost, 1);
    assert_eq!(metrics.sender.timeout_retransmissions, 1);
    assert_eq!(metrics.receiver.duplicates_suppressed, 1);
    assert_eq!(
        simulation.sink().delivered(),
        &[Message::synthesize(0).data, Message::synthesize(1).data]
    );
}
