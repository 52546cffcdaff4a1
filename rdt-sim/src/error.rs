use thiserror::Error;

use crate::sim::{Entity, EventKind};

/// Errors that can occur while configuring or running a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// The configuration was rejected before the run started.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// `run` was called on a simulation that already ran to completion.
    #[error("Simulation already finished at time {time:.3}")]
    AlreadyFinished {
        /// Simulated time at which the earlier run stopped.
        time: f64,
    },
    /// An event reached the driver that no entity is able to handle.
    ///
    /// This indicates a scheduling inconsistency; the run is aborted because
    /// there are no recovery semantics for it.
    #[error("Unroutable event {kind:?} for entity {entity} at time {time:.3}")]
    UnroutableEvent {
        /// Kind of the offending event.
        kind: EventKind,
        /// Entity the event was addressed to.
        entity: Entity,
        /// Simulated time at which the event was popped.
        time: f64,
    },
}

/// A type alias for `Result<T, SimulationError>`.
pub type SimulationResult<T> = Result<T, SimulationError>;
