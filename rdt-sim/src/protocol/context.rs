//! The boundary between the protocol entities and everything around them.
//!
//! Entities are pure state machines. Every side effect (sending a packet,
//! arming a timer, handing data up) goes through an [`EntityContext`], so the
//! same sender and receiver code runs inside the simulation driver and inside
//! unit tests with a recording mock.

use super::packet::{Packet, Payload};
use crate::sim::SimTime;

/// Services the layer below and above offer to one protocol entity.
///
/// A context is bound to a single entity: `to_channel` sends from that entity
/// and the timer operations act on that entity's timer.
pub trait EntityContext {
    /// Current simulation time.
    fn now(&self) -> SimTime;

    /// Hand a packet to the unreliable channel. The channel takes a copy.
    fn to_channel(&mut self, packet: &Packet);

    /// Arm this entity's timer to expire `increment` time units from now.
    fn start_timer(&mut self, increment: SimTime);

    /// Cancel this entity's timer.
    fn stop_timer(&mut self);

    /// Deliver a payload to the application layer above this entity.
    fn to_application(&mut self, payload: &Payload);
}

/// Consumer of the payloads B delivers upward.
pub trait ApplicationSink {
    /// Receive one in-order, duplicate-free payload.
    fn deliver(&mut self, payload: &Payload);
}

impl<F> ApplicationSink for F
where
    F: FnMut(&Payload),
{
    fn deliver(&mut self, payload: &Payload) {
        self(payload)
    }
}

/// Sink that keeps every delivered payload in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSink {
    delivered: Vec<Payload>,
}

impl RecordingSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads delivered so far, oldest first.
    pub fn delivered(&self) -> &[Payload] {
        &self.delivered
    }

    /// Number of payloads delivered.
    pub fn len(&self) -> usize {
        self.delivered.len()
    }

    /// Whether nothing has been delivered.
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty()
    }

    /// Take the delivered payloads.
    pub fn into_inner(self) -> Vec<Payload> {
        self.delivered
    }
}

impl ApplicationSink for RecordingSink {
    fn deliver(&mut self, payload: &Payload) {
        self.delivered.push(*payload);
    }
}
