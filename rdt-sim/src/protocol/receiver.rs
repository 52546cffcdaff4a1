//! Entity B: the receiving side. B has no timer and never originates data.

use super::{
    context::EntityContext,
    packet::{nack_value, Packet},
};

/// Activity counters of the receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverCounters {
    /// Payloads handed to the application.
    pub delivered: u64,
    /// Intact retransmissions of the last delivered packet.
    pub duplicates_suppressed: u64,
    /// NACKs sent in response to corrupted packets.
    pub nacks_sent: u64,
    /// ACKs sent, including re-ACKs of duplicates.
    pub acks_sent: u64,
}

/// Entity B.
#[derive(Debug, Clone, Default)]
pub struct Receiver {
    seq_bit: i32,
    ack_bit: i32,
    last_delivered: Option<Packet>,
    counters: ReceiverCounters,
}

impl Receiver {
    /// Fresh receiver with both bits at 0 and nothing delivered.
    pub fn new() -> Self {
        Self::default()
    }

    /// The sequence value B expects next.
    pub fn expected_seq(&self) -> i32 {
        self.ack_bit
    }

    /// The packet delivered most recently.
    pub fn last_delivered(&self) -> Option<&Packet> {
        self.last_delivered.as_ref()
    }

    /// Activity counters.
    pub fn counters(&self) -> ReceiverCounters {
        self.counters
    }

    /// Handle a data packet from A.
    ///
    /// Always answers: a NACK when the checksum fails, an ACK otherwise. Only
    /// an intact packet that differs in sequence from the last delivery
    /// reaches the application.
    pub fn on_channel_packet(&mut self, ctx: &mut impl EntityContext, packet: &Packet) {
        if !packet.is_intact() {
            let nack = Packet::control(self.seq_bit, nack_value(self.ack_bit));
            tracing::debug!(
                target: "rdt_sim::receiver",
                now = ctx.now(),
                ?packet,
                "corrupted packet, sending NACK"
            );
            ctx.to_channel(&nack);
            self.counters.nacks_sent += 1;
            return;
        }

        let ack = Packet::control(self.seq_bit, packet.seq_num);
        ctx.to_channel(&ack);
        self.counters.acks_sent += 1;

        if self
            .last_delivered
            .is_some_and(|last| last.seq_num == packet.seq_num)
        {
            self.counters.duplicates_suppressed += 1;
            tracing::debug!(
                target: "rdt_sim::receiver",
                now = ctx.now(),
                seq = packet.seq_num,
                "duplicate packet, re-ACKed without delivery"
            );
            return;
        }

        self.seq_bit ^= 1;
        self.ack_bit ^= 1;
        tracing::info!(
            target: "rdt_sim::receiver",
            now = ctx.now(),
            seq = packet.seq_num,
            "delivering payload to application"
        );
        ctx.to_application(&packet.payload);
        self.last_delivered = Some(*packet);
        self.counters.delivered += 1;
    }
}
