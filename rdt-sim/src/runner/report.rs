//! Per-run metrics and the multi-run report.

use std::{collections::BTreeMap, fmt, time::Duration};

use crate::{
    chaos::AssertionStats,
    protocol::{ReceiverCounters, SenderCounters},
    sim::{SimTime, SimulationStats},
    SimulationResult,
};

use super::driver::StopReason;

/// Everything measured during one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationMetrics {
    /// Seed the run used.
    pub seed: u64,
    /// Wall-clock time taken by the run.
    pub wall_time: Duration,
    /// Simulated time at which the run stopped.
    pub simulated_time: SimTime,
    /// Events popped from the event list.
    pub events_processed: u64,
    /// Why the run stopped.
    pub stop_reason: StopReason,
    /// Channel and generator counters.
    pub channel: SimulationStats,
    /// Entity A counters.
    pub sender: SenderCounters,
    /// Entity B counters.
    pub receiver: ReceiverCounters,
}

impl SimulationMetrics {
    /// Share of generated messages that reached B's application, as a
    /// percentage. Zero when nothing was generated.
    pub fn delivery_ratio(&self) -> f64 {
        if self.channel.messages_generated == 0 {
            0.0
        } else {
            (self.receiver.delivered as f64 / self.channel.messages_generated as f64) * 100.0
        }
    }
}

/// Outcome of a batch of simulation runs.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Number of iterations executed.
    pub iterations: usize,
    /// Number of runs that completed.
    pub successful_runs: usize,
    /// Number of runs that returned an error.
    pub failed_runs: usize,
    /// Result of each run, in execution order.
    pub individual_metrics: Vec<SimulationResult<SimulationMetrics>>,
    /// Seed of each run, in execution order.
    pub seeds_used: Vec<u64>,
    /// Seeds of the runs that failed.
    pub seeds_failing: Vec<u64>,
    /// `sometimes_assert!` counts summed over all runs.
    pub assertion_results: BTreeMap<String, AssertionStats>,
    /// Assertions that were checked but never held.
    pub assertion_violations: Vec<String>,
}

impl SimulationReport {
    /// Metrics of the runs that completed.
    pub fn successful_metrics(&self) -> impl Iterator<Item = &SimulationMetrics> {
        self.individual_metrics.iter().filter_map(|r| r.as_ref().ok())
    }

    /// Success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            (self.successful_runs as f64 / self.iterations as f64) * 100.0
        }
    }

    /// Channel counters summed over successful runs.
    pub fn channel_totals(&self) -> SimulationStats {
        self.successful_metrics()
            .fold(SimulationStats::default(), |mut total, m| {
                total.messages_generated += m.channel.messages_generated;
                total.packets_sent += m.channel.packets_sent;
                total.packets_lost += m.channel.packets_lost;
                total.packets_corrupted += m.channel.packets_corrupted;
                total
            })
    }

    /// Sender counters summed over successful runs.
    pub fn sender_totals(&self) -> SenderCounters {
        self.successful_metrics()
            .fold(SenderCounters::default(), |mut total, m| {
                total.messages_accepted += m.sender.messages_accepted;
                total.messages_discarded += m.sender.messages_discarded;
                total.corrupt_received += m.sender.corrupt_received;
                total.acks_received += m.sender.acks_received;
                total.nack_retransmissions += m.sender.nack_retransmissions;
                total.timeout_retransmissions += m.sender.timeout_retransmissions;
                total
            })
    }

    /// Receiver counters summed over successful runs.
    pub fn receiver_totals(&self) -> ReceiverCounters {
        self.successful_metrics()
            .fold(ReceiverCounters::default(), |mut total, m| {
                total.delivered += m.receiver.delivered;
                total.duplicates_suppressed += m.receiver.duplicates_suppressed;
                total.nacks_sent += m.receiver.nacks_sent;
                total.acks_sent += m.receiver.acks_sent;
                total
            })
    }

    /// Total wall-clock time of successful runs.
    pub fn total_wall_time(&self) -> Duration {
        self.successful_metrics().map(|m| m.wall_time).sum()
    }

    /// Mean simulated time at which successful runs stopped.
    pub fn average_simulated_time(&self) -> SimTime {
        if self.successful_runs == 0 {
            0.0
        } else {
            self.successful_metrics()
                .map(|m| m.simulated_time)
                .sum::<SimTime>()
                / self.successful_runs as f64
        }
    }

    /// Mean number of events processed per successful run.
    pub fn average_events_processed(&self) -> f64 {
        if self.successful_runs == 0 {
            0.0
        } else {
            self.successful_metrics()
                .map(|m| m.events_processed)
                .sum::<u64>() as f64
                / self.successful_runs as f64
        }
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channel = self.channel_totals();
        let sender = self.sender_totals();
        let receiver = self.receiver_totals();

        writeln!(f, "=== Simulation Report ===")?;
        writeln!(f, "Iterations: {}", self.iterations)?;
        writeln!(f, "Successful: {}", self.successful_runs)?;
        writeln!(f, "Failed: {}", self.failed_runs)?;
        writeln!(f, "Success Rate: {:.2}%", self.success_rate())?;
        writeln!(f)?;
        writeln!(f, "Total Wall Time: {:?}", self.total_wall_time())?;
        writeln!(
            f,
            "Average Simulated Time: {:.3}",
            self.average_simulated_time()
        )?;
        writeln!(
            f,
            "Average Events Processed: {:.1}",
            self.average_events_processed()
        )?;
        writeln!(f)?;
        writeln!(f, "Messages generated: {}", channel.messages_generated)?;
        writeln!(f, "Messages delivered: {}", receiver.delivered)?;
        writeln!(f, "Messages dropped by busy sender: {}", sender.messages_discarded)?;
        writeln!(f, "Packets sent: {}", channel.packets_sent)?;
        writeln!(f, "Packets lost: {}", channel.packets_lost)?;
        writeln!(f, "Packets corrupted: {}", channel.packets_corrupted)?;
        writeln!(
            f,
            "Retransmissions: {} (timeout {}, NACK {})",
            sender.retransmissions(),
            sender.timeout_retransmissions,
            sender.nack_retransmissions
        )?;
        writeln!(f, "NACKs sent: {}", receiver.nacks_sent)?;
        writeln!(f, "Duplicates suppressed: {}", receiver.duplicates_suppressed)?;

        if !self.assertion_results.is_empty() {
            writeln!(f)?;
            writeln!(f, "Assertions:")?;
            for (name, stats) in &self.assertion_results {
                writeln!(
                    f,
                    "  {}: {}/{} ({:.1}%)",
                    name,
                    stats.successes,
                    stats.total_checks,
                    stats.success_rate()
                )?;
            }
        }

        if !self.assertion_violations.is_empty() {
            writeln!(f)?;
            writeln!(f, "Unreached paths:")?;
            for violation in &self.assertion_violations {
                writeln!(f, "  - {}", violation)?;
            }
        }

        if !self.seeds_failing.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failing seeds: {:?}", self.seeds_failing)?;
        }

        Ok(())
    }
}
