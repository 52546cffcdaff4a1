//! # rdt-sim
//!
//! A deterministic discrete-event simulator of the alternating-bit protocol:
//! a sender (entity A) and a receiver (entity B) exchanging data over a
//! channel that loses and corrupts packets but never reorders them.
//!
//! ## Layout
//!
//! - [`sim`]: logical clock, event list, channel emulator, timers, traffic
//!   generator and the seeded RNG
//! - [`protocol`]: packet format and the sender/receiver state machines
//! - [`runner`]: the driver loop, metrics and seeded batches
//! - [`chaos`]: invariant checks and coverage tracking
//!
//! ## Example
//!
//! ```rust
//! use rdt_sim::{protocol::RecordingSink, Simulation, SimulationConfig, StopReason};
//!
//! let config = SimulationConfig::reliable()
//!     .with_max_messages(3)
//!     .with_mean_interarrival(100_000.0);
//! let mut simulation = Simulation::new(config, RecordingSink::new())?;
//! let metrics = simulation.run()?;
//!
//! assert_eq!(metrics.stop_reason, StopReason::Drained);
//! assert_eq!(metrics.receiver.delivered, 3);
//! assert_eq!(simulation.sink().len(), 3);
//! # Ok::<(), rdt_sim::SimulationError>(())
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Assertion macros and result tracking.
pub mod chaos;
/// Simulation configuration and validation.
pub mod config;
/// Error types of the simulator.
pub mod error;
/// Alternating-bit protocol entities and packet format.
pub mod protocol;
/// Simulation driver, metrics and batch runner.
pub mod runner;
/// Discrete-event simulation core.
pub mod sim;

pub use config::SimulationConfig;
pub use error::{SimulationError, SimulationResult};
pub use runner::{
    IterationControl, Simulation, SimulationBuilder, SimulationMetrics, SimulationReport,
    StopReason,
};
pub use sim::{Entity, SimWorld};
