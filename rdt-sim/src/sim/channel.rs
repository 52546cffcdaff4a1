//! Emulated unreliable channel between the two entities.
//!
//! | Fault | Config field | Effect |
//! |-------|--------------|--------|
//! | Loss | `loss_prob` | Packet vanishes, no arrival is scheduled |
//! | Corruption | `corrupt_prob` | Payload byte 0, `seq_num` or `ack_num` is overwritten |
//!
//! The channel never reorders: a packet for a destination is scheduled
//! between 1 and 10 time units after the latest arrival already scheduled for
//! that destination (or after now, when there is none).
//!
//! Corruption picks its target with a second draw: payload 75%, sequence
//! number 12.5%, acknowledgement number 12.5%.
//!
//! Tests can override the random decisions for specific packets with
//! [`SimWorld::inject_fault`].

use super::{
    events::{Entity, Event, SimTime},
    rng::sim_random_f64,
    world::SimWorld,
};
use crate::protocol::Packet;

/// Value written into payload byte 0 by a payload corruption.
pub const CORRUPTED_PAYLOAD_BYTE: u8 = b'Z';

/// Value written into a header field by a header corruption.
pub const CORRUPTED_FIELD_VALUE: i32 = 999_999;

/// Minimum transit delay of a packet.
pub const MIN_TRANSIT_DELAY: SimTime = 1.0;

/// Maximum random delay added on top of [`MIN_TRANSIT_DELAY`].
pub const TRANSIT_JITTER: SimTime = 9.0;

const PAYLOAD_CORRUPTION_CUTOFF: f64 = 0.75;
const SEQ_CORRUPTION_CUTOFF: f64 = 0.875;

/// Which part of a packet the channel damages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
    /// Overwrite payload byte 0 with [`CORRUPTED_PAYLOAD_BYTE`].
    Payload,
    /// Overwrite `seq_num` with [`CORRUPTED_FIELD_VALUE`].
    SeqNum,
    /// Overwrite `ack_num` with [`CORRUPTED_FIELD_VALUE`].
    AckNum,
}

impl Corruption {
    /// Map a uniform draw in `[0, 1)` to a corruption target.
    pub fn from_draw(x: f64) -> Self {
        if x < PAYLOAD_CORRUPTION_CUTOFF {
            Corruption::Payload
        } else if x < SEQ_CORRUPTION_CUTOFF {
            Corruption::SeqNum
        } else {
            Corruption::AckNum
        }
    }

    /// Damage `packet` in place. The stored checksum is left as is.
    pub fn apply(self, packet: &mut Packet) {
        match self {
            Corruption::Payload => packet.payload[0] = CORRUPTED_PAYLOAD_BYTE,
            Corruption::SeqNum => packet.seq_num = CORRUPTED_FIELD_VALUE,
            Corruption::AckNum => packet.ack_num = CORRUPTED_FIELD_VALUE,
        }
    }
}

/// A channel decision forced for the next packet from a given source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFault {
    /// Drop the packet.
    Lose,
    /// Deliver the packet damaged as described.
    Corrupt(Corruption),
    /// Deliver the packet intact regardless of the configured probabilities.
    Deliver,
}

/// What the channel did with a packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelOutcome {
    /// The packet was dropped.
    Lost,
    /// An arrival was scheduled at the peer.
    Scheduled {
        /// Destination entity.
        destination: Entity,
        /// Scheduled arrival time.
        arrival: SimTime,
        /// Corruption applied to the delivered copy, if any.
        corruption: Option<Corruption>,
    },
}

impl SimWorld {
    /// Hand `packet` from `source` to the channel.
    ///
    /// The channel keeps its own copy; the caller's packet is never touched.
    /// RNG draws happen in a fixed order (loss, delay, corruption, corruption
    /// target) so a seed reproduces a run exactly.
    pub fn send_to_channel(&mut self, source: Entity, packet: &Packet) -> ChannelOutcome {
        self.stats.packets_sent += 1;

        let scripted = self
            .scripted_faults
            .get_mut(&source)
            .and_then(|faults| faults.pop_front());

        let lost = match scripted {
            Some(ScriptedFault::Lose) => true,
            Some(_) => false,
            None => sim_random_f64() < self.config.loss_prob,
        };
        if lost {
            self.stats.packets_lost += 1;
            tracing::info!(
                target: "rdt_sim::channel",
                %source,
                now = self.current_time,
                seq = packet.seq_num,
                ack = packet.ack_num,
                "packet being lost"
            );
            return ChannelOutcome::Lost;
        }

        let mut copy = *packet;
        let destination = source.peer();

        let base = self
            .event_queue
            .latest_arrival_for(destination)
            .map_or(self.current_time, |latest| latest.max(self.current_time));
        let arrival = base + MIN_TRANSIT_DELAY + TRANSIT_JITTER * sim_random_f64();

        let corruption = match scripted {
            Some(ScriptedFault::Corrupt(corruption)) => Some(corruption),
            Some(_) => None,
            None => (sim_random_f64() < self.config.corrupt_prob)
                .then(|| Corruption::from_draw(sim_random_f64())),
        };
        if let Some(corruption) = corruption {
            self.stats.packets_corrupted += 1;
            corruption.apply(&mut copy);
            tracing::info!(
                target: "rdt_sim::channel",
                %source,
                now = self.current_time,
                ?corruption,
                "packet being corrupted"
            );
        }

        tracing::trace!(
            target: "rdt_sim::channel",
            %source,
            %destination,
            arrival,
            packet = ?copy,
            "scheduling arrival on other side"
        );
        self.schedule_event_at(
            Event::ChannelPacketArrival {
                entity: destination,
                packet: copy,
                corrupted: corruption.is_some(),
            },
            arrival,
        );

        ChannelOutcome::Scheduled {
            destination,
            arrival,
            corruption,
        }
    }

    /// Force the channel's decision for the next packet sent by `source`.
    ///
    /// Faults queue up and are consumed one per packet, in order.
    pub fn inject_fault(&mut self, source: Entity, fault: ScriptedFault) {
        self.scripted_faults
            .entry(source)
            .or_default()
            .push_back(fault);
    }

    /// Number of scripted faults still waiting for packets from `source`.
    pub fn pending_faults(&self, source: Entity) -> usize {
        self.scripted_faults.get(&source).map_or(0, |f| f.len())
    }
}
