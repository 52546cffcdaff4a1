//! Process-wide counters of a simulation run.

/// Counters owned by the [`SimWorld`](super::SimWorld).
///
/// Initialized to zero when the world is created and only advanced by the
/// world's own operations, so they are read-only once the run is over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// Application messages generated so far.
    pub messages_generated: u64,
    /// Packets handed to the channel, by either entity.
    pub packets_sent: u64,
    /// Packets dropped by the channel.
    pub packets_lost: u64,
    /// Packets corrupted by the channel.
    pub packets_corrupted: u64,
}

impl SimulationStats {
    /// Packets the channel scheduled for delivery.
    pub fn packets_forwarded(&self) -> u64 {
        self.packets_sent.saturating_sub(self.packets_lost)
    }
}
