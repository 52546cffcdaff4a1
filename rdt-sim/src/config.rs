//! # Simulation Configuration
//!
//! Everything a run needs is read once from a [`SimulationConfig`] and never
//! changes afterwards.
//!
//! | Field | Default | Meaning |
//! |-------|---------|---------|
//! | `max_messages` | 20 | Application messages to generate before stopping |
//! | `loss_prob` | 0.2 | Probability that the channel drops a packet, in `[0, 1)` |
//! | `corrupt_prob` | 0.1 | Probability that the channel corrupts a packet, in `[0, 1)` |
//! | `mean_interarrival` | 2000.0 | Mean time between application messages |
//! | `timeout` | 20.0 | Retransmission timer duration used by the sender |
//! | `trace_level` | 1 | Verbosity 0..=3 for the tracing output |
//! | `seed` | 9999 | Seed of the deterministic RNG |
//! | `drain_in_flight` | true | Keep running after the last message until all traffic settles |
//!
//! ## Examples
//!
//! ### Lossless channel
//! ```rust
//! use rdt_sim::SimulationConfig;
//!
//! let config = SimulationConfig::reliable().with_max_messages(5);
//! assert_eq!(config.loss_prob, 0.0);
//! assert!(config.validate().is_ok());
//! ```
//!
//! ### Custom fault rates
//! ```rust
//! use rdt_sim::SimulationConfig;
//!
//! let config = SimulationConfig::default()
//!     .with_loss_prob(0.3)
//!     .with_corrupt_prob(0.2)
//!     .with_seed(42);
//! assert!(config.validate().is_ok());
//! ```

use tracing::level_filters::LevelFilter;

use crate::{SimulationError, SimulationResult};

/// Highest accepted `trace_level`.
pub const MAX_TRACE_LEVEL: u8 = 3;

/// Immutable parameters of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Number of application messages to generate.
    pub max_messages: u64,
    /// Probability that a packet handed to the channel is lost.
    pub loss_prob: f64,
    /// Probability that a packet surviving the channel is corrupted.
    pub corrupt_prob: f64,
    /// Mean interarrival time of application messages (`lambda`).
    pub mean_interarrival: f64,
    /// Duration of the sender's retransmission timer.
    pub timeout: f64,
    /// Trace verbosity, 0 (warnings only) to 3 (everything).
    pub trace_level: u8,
    /// Seed for the deterministic RNG.
    pub seed: u64,
    /// Whether to keep processing after the last message is generated
    /// until the event list empties.
    pub drain_in_flight: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_messages: 20,
            loss_prob: 0.2,
            corrupt_prob: 0.1,
            mean_interarrival: 2000.0,
            timeout: 20.0,
            trace_level: 1,
            seed: 9999,
            drain_in_flight: true,
        }
    }
}

impl SimulationConfig {
    /// A channel that neither loses nor corrupts packets.
    pub fn reliable() -> Self {
        Self {
            loss_prob: 0.0,
            corrupt_prob: 0.0,
            ..Self::default()
        }
    }

    /// Set the number of messages to generate.
    pub fn with_max_messages(mut self, max_messages: u64) -> Self {
        self.max_messages = max_messages;
        self
    }

    /// Set the loss probability.
    pub fn with_loss_prob(mut self, loss_prob: f64) -> Self {
        self.loss_prob = loss_prob;
        self
    }

    /// Set the corruption probability.
    pub fn with_corrupt_prob(mut self, corrupt_prob: f64) -> Self {
        self.corrupt_prob = corrupt_prob;
        self
    }

    /// Set the mean interarrival time of application messages.
    pub fn with_mean_interarrival(mut self, mean_interarrival: f64) -> Self {
        self.mean_interarrival = mean_interarrival;
        self
    }

    /// Set the retransmission timeout.
    pub fn with_timeout(mut self, timeout: f64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the trace verbosity.
    pub fn with_trace_level(mut self, trace_level: u8) -> Self {
        self.trace_level = trace_level;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable draining in-flight traffic after the last message.
    pub fn with_drain_in_flight(mut self, drain_in_flight: bool) -> Self {
        self.drain_in_flight = drain_in_flight;
        self
    }

    /// Check every field against its accepted range.
    pub fn validate(&self) -> SimulationResult<()> {
        check_probability("loss_prob", self.loss_prob)?;
        check_probability("corrupt_prob", self.corrupt_prob)?;

        if !(self.mean_interarrival.is_finite() && self.mean_interarrival > 0.0) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "mean_interarrival must be a positive number, got {}",
                self.mean_interarrival
            )));
        }
        if !(self.timeout.is_finite() && self.timeout > 0.0) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "timeout must be a positive number, got {}",
                self.timeout
            )));
        }
        if self.trace_level > MAX_TRACE_LEVEL {
            return Err(SimulationError::InvalidConfiguration(format!(
                "trace_level must be at most {MAX_TRACE_LEVEL}, got {}",
                self.trace_level
            )));
        }
        Ok(())
    }

    /// Tracing filter matching `trace_level`.
    ///
    /// 0 keeps warnings, 1 adds loss/corruption and deliveries, 2 adds event
    /// dispatch, 3 adds scheduler and timer bookkeeping.
    pub fn trace_filter(&self) -> LevelFilter {
        match self.trace_level {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

fn check_probability(name: &str, value: f64) -> SimulationResult<()> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimulationError::InvalidConfiguration(format!(
            "{name} must be in [0, 1), got {value}"
        )))
    }
}
