//! Driving simulations: the event loop, single-run metrics and seeded
//! batches.

mod builder;
mod driver;
mod report;

pub use builder::{IterationControl, SimulationBuilder};
pub use driver::{Simulation, StopReason};
pub use report::{SimulationMetrics, SimulationReport};
