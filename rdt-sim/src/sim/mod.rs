//! Discrete-event simulation core.
//!
//! [`SimWorld`] owns the logical clock and the event list. The channel
//! emulator, the timer service and the traffic generator are all operations
//! on the world, split across the submodules below.

mod channel;
mod events;
pub mod rng;
mod state;
mod timer;
mod traffic;
mod world;

pub use channel::{
    ChannelOutcome, Corruption, ScriptedFault, CORRUPTED_FIELD_VALUE, CORRUPTED_PAYLOAD_BYTE,
    MIN_TRANSIT_DELAY, TRANSIT_JITTER,
};
pub use events::{Entity, Event, EventKind, EventQueue, ScheduledEvent, SimTime};
pub use rng::{
    get_current_sim_seed, reset_sim_rng, set_sim_seed, sim_draw_count, sim_random,
    sim_random_f64,
};
pub use state::SimulationStats;
pub use world::SimWorld;
