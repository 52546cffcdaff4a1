//! Application message generator.
//!
//! Arrivals are spaced by a uniform draw on `[0, 2 * mean_interarrival)`, so
//! the mean gap is `mean_interarrival`.

use super::{
    events::{Entity, Event, SimTime},
    rng::sim_random_f64,
    world::SimWorld,
};

impl SimWorld {
    /// Schedule the next application message arrival at entity A.
    ///
    /// Returns the absolute time of the arrival.
    pub fn generate_next_arrival(&mut self) -> SimTime {
        let gap = sim_random_f64() * 2.0 * self.config.mean_interarrival;
        let at = self.current_time + gap;

        tracing::trace!(
            target: "rdt_sim::scheduler",
            now = self.current_time,
            at,
            "generate next arrival"
        );
        self.schedule_event_at(Event::AppMessageArrival { entity: Entity::A }, at);
        at
    }
}
