//! Entity A: the stop-and-wait sender.
//!
//! ```text
//!            app message / send, start timer
//!   Idle ────────────────────────────────────▶ WaitingForAck
//!    ▲                                          │  │    ▲
//!    │              valid ACK / stop timer      │  │    │ NACK or timeout /
//!    └──────────────────────────────────────────┘  └────┘ resend last packet
//! ```
//!
//! Application messages arriving while a packet is outstanding are dropped.

use super::{
    context::EntityContext,
    packet::{Message, Packet},
};
use crate::sim::SimTime;

/// Sender protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// Ready to accept an application message.
    Idle,
    /// One packet is outstanding.
    WaitingForAck,
}

/// Activity counters of the sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderCounters {
    /// Application messages turned into packets.
    pub messages_accepted: u64,
    /// Application messages dropped because a packet was outstanding.
    pub messages_discarded: u64,
    /// Packets received with a bad checksum.
    pub corrupt_received: u64,
    /// ACKs that completed an exchange.
    pub acks_received: u64,
    /// Retransmissions caused by a NACK.
    pub nack_retransmissions: u64,
    /// Retransmissions caused by the timer.
    pub timeout_retransmissions: u64,
}

impl SenderCounters {
    /// All retransmissions, whatever their cause.
    pub fn retransmissions(&self) -> u64 {
        self.nack_retransmissions + self.timeout_retransmissions
    }
}

/// Entity A.
#[derive(Debug, Clone)]
pub struct Sender {
    seq_bit: i32,
    ack_bit: i32,
    state: SenderState,
    last_sent: Option<Packet>,
    timeout: SimTime,
    counters: SenderCounters,
}

impl Sender {
    /// Fresh sender with both bits at 0, retransmitting after `timeout`.
    pub fn new(timeout: SimTime) -> Self {
        Self {
            seq_bit: 0,
            ack_bit: 0,
            state: SenderState::Idle,
            last_sent: None,
            timeout,
            counters: SenderCounters::default(),
        }
    }

    /// Current protocol state.
    pub fn state(&self) -> SenderState {
        self.state
    }

    /// Sequence bit the next new packet will carry.
    pub fn seq_bit(&self) -> i32 {
        self.seq_bit
    }

    /// The retransmission buffer.
    pub fn last_sent(&self) -> Option<&Packet> {
        self.last_sent.as_ref()
    }

    /// Activity counters.
    pub fn counters(&self) -> SenderCounters {
        self.counters
    }

    /// Handle a message from the application layer.
    ///
    /// Returns `false` when the message was dropped for back-pressure.
    pub fn on_app_message(&mut self, ctx: &mut impl EntityContext, message: Message) -> bool {
        if self.state == SenderState::WaitingForAck {
            self.counters.messages_discarded += 1;
            tracing::info!(
                target: "rdt_sim::sender",
                now = ctx.now(),
                "waiting for ACK, application message dropped"
            );
            return false;
        }

        let packet = Packet::new(self.seq_bit, self.ack_bit, message.data);
        tracing::debug!(target: "rdt_sim::sender", now = ctx.now(), ?packet, "sending");

        ctx.to_channel(&packet);
        self.seq_bit ^= 1;
        ctx.start_timer(self.timeout);
        self.state = SenderState::WaitingForAck;
        self.last_sent = Some(packet);
        self.counters.messages_accepted += 1;
        true
    }

    /// Handle an ACK or NACK from B.
    pub fn on_channel_packet(&mut self, ctx: &mut impl EntityContext, packet: &Packet) {
        if !packet.is_intact() {
            self.counters.corrupt_received += 1;
            tracing::debug!(
                target: "rdt_sim::sender",
                now = ctx.now(),
                ?packet,
                "corrupted packet discarded"
            );
            return;
        }

        let last_sent = match (self.state, self.last_sent) {
            (SenderState::WaitingForAck, Some(last_sent)) => last_sent,
            _ => {
                tracing::debug!(
                    target: "rdt_sim::sender",
                    now = ctx.now(),
                    ?packet,
                    "stale packet while idle, ignored"
                );
                return;
            }
        };

        if packet.is_nack_for(last_sent.seq_num) {
            tracing::debug!(
                target: "rdt_sim::sender",
                now = ctx.now(),
                seq = last_sent.seq_num,
                "NACK received, resending"
            );
            ctx.stop_timer();
            ctx.to_channel(&last_sent);
            ctx.start_timer(self.timeout);
            self.counters.nack_retransmissions += 1;
        } else if packet.is_ack_for(last_sent.seq_num) {
            tracing::debug!(
                target: "rdt_sim::sender",
                now = ctx.now(),
                seq = last_sent.seq_num,
                "ACK received"
            );
            ctx.stop_timer();
            self.state = SenderState::Idle;
            self.counters.acks_received += 1;
        } else {
            tracing::debug!(
                target: "rdt_sim::sender",
                now = ctx.now(),
                ack = packet.ack_num,
                expected = last_sent.seq_num,
                "unexpected acknowledgement ignored"
            );
        }
    }

    /// Handle expiry of A's timer: resend the outstanding packet.
    pub fn on_timer_interrupt(&mut self, ctx: &mut impl EntityContext) {
        let Some(last_sent) = self.last_sent else {
            tracing::warn!(
                target: "rdt_sim::sender",
                now = ctx.now(),
                "timer interrupt with nothing sent, ignored"
            );
            return;
        };

        tracing::debug!(
            target: "rdt_sim::sender",
            now = ctx.now(),
            seq = last_sent.seq_num,
            "timeout, resending"
        );
        ctx.to_channel(&last_sent);
        ctx.start_timer(self.timeout);
        self.state = SenderState::WaitingForAck;
        self.counters.timeout_retransmissions += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        context::mock::{Effect, MockContext},
        nack_value, Packet,
    };

    const TIMEOUT: SimTime = 20.0;

    fn sender_with_outstanding(ctx: &mut MockContext) -> (Sender, Packet) {
        let mut sender = Sender::new(TIMEOUT);
        assert!(sender.on_app_message(ctx, Message::synthesize(0)));
        let sent = ctx.sent()[0];
        ctx.take();
        (sender, sent)
    }

    #[test]
    fn app_message_sends_packet_and_arms_timer() {
        let mut ctx = MockContext::default();
        let mut sender = Sender::new(TIMEOUT);

        assert!(sender.on_app_message(&mut ctx, Message::synthesize(0)));

        let expected = Packet::new(0, 0, Message::synthesize(0).data);
        assert_eq!(
            ctx.effects,
            vec![Effect::Sent(expected), Effect::TimerStarted(TIMEOUT)]
        );
        assert_eq!(sender.state(), SenderState::WaitingForAck);
        assert_eq!(sender.seq_bit(), 1);
        assert_eq!(sender.last_sent(), Some(&expected));
    }

    #[test]
    fn busy_sender_drops_new_messages() {
        let mut ctx = MockContext::default();
        let (mut sender, _) = sender_with_outstanding(&mut ctx);

        assert!(!sender.on_app_message(&mut ctx, Message::synthesize(1)));
        assert!(ctx.effects.is_empty());
        assert_eq!(sender.counters().messages_discarded, 1);
        assert_eq!(sender.seq_bit(), 1);
    }

    #[test]
    fn ack_returns_to_idle() {
        let mut ctx = MockContext::default();
        let (mut sender, sent) = sender_with_outstanding(&mut ctx);

        sender.on_channel_packet(&mut ctx, &Packet::control(0, sent.seq_num));

        assert_eq!(ctx.effects, vec![Effect::TimerStopped]);
        assert_eq!(sender.state(), SenderState::Idle);

        // The next message uses the flipped bit.
        sender.on_app_message(&mut ctx, Message::synthesize(1));
        assert_eq!(ctx.sent()[0].seq_num, 1);
    }

    #[test]
    fn nack_resends_identical_packet() {
        let mut ctx = MockContext::default();
        let (mut sender, sent) = sender_with_outstanding(&mut ctx);

        sender.on_channel_packet(&mut ctx, &Packet::control(0, nack_value(sent.seq_num)));

        assert_eq!(
            ctx.effects,
            vec![
                Effect::TimerStopped,
                Effect::Sent(sent),
                Effect::TimerStarted(TIMEOUT)
            ]
        );
        assert_eq!(sender.state(), SenderState::WaitingForAck);
        assert_eq!(sender.counters().nack_retransmissions, 1);
    }

    #[test]
    fn corrupted_ack_is_ignored() {
        let mut ctx = MockContext::default();
        let (mut sender, sent) = sender_with_outstanding(&mut ctx);

        let mut ack = Packet::control(0, sent.seq_num);
        ack.ack_num = 999_999;
        sender.on_channel_packet(&mut ctx, &ack);

        assert!(ctx.effects.is_empty());
        assert_eq!(sender.state(), SenderState::WaitingForAck);
        assert_eq!(sender.counters().corrupt_received, 1);
    }

    #[test]
    fn repeated_timeouts_resend_byte_identical_copies() {
        let mut ctx = MockContext::default();
        let (mut sender, sent) = sender_with_outstanding(&mut ctx);

        for _ in 0..3 {
            sender.on_timer_interrupt(&mut ctx);
        }

        assert_eq!(ctx.sent(), vec![sent; 3]);
        assert_eq!(sender.counters().timeout_retransmissions, 3);
        assert_eq!(sender.counters().retransmissions(), 3);
        assert_eq!(sender.state(), SenderState::WaitingForAck);
    }

    #[test]
    fn stale_ack_while_idle_is_ignored() {
        let mut ctx = MockContext::default();
        let (mut sender, sent) = sender_with_outstanding(&mut ctx);
        sender.on_channel_packet(&mut ctx, &Packet::control(0, sent.seq_num));
        ctx.take();

        sender.on_channel_packet(&mut ctx, &Packet::control(0, sent.seq_num));
        assert!(ctx.effects.is_empty());
        assert_eq!(sender.counters().acks_received, 1);
    }

    #[test]
    fn timeout_before_any_send_is_ignored() {
        let mut ctx = MockContext::default();
        let mut sender = Sender::new(TIMEOUT);
        sender.on_timer_interrupt(&mut ctx);
        assert!(ctx.effects.is_empty());
        assert_eq!(sender.state(), SenderState::Idle);
    }

    #[test]
    fn mismatched_ack_keeps_waiting() {
        let mut ctx = MockContext::default();
        let (mut sender, sent) = sender_with_outstanding(&mut ctx);

        sender.on_channel_packet(&mut ctx, &Packet::control(0, sent.seq_num ^ 1));
        assert!(ctx.effects.is_empty());
        assert_eq!(sender.state(), SenderState::WaitingForAck);
    }
}
