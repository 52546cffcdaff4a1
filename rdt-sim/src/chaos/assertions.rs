//! Protocol property checks with per-thread result tracking.
//!
//! - [`always_assert!`](crate::always_assert) guards invariants that must hold
//!   on every event, such as "a checksum mismatch means the channel corrupted
//!   the packet". A violation panics with the seed that reproduces it.
//! - [`sometimes_assert!`](crate::sometimes_assert) records how often a
//!   probabilistic situation occurred (a loss, a NACK, a duplicate) so a batch
//!   of runs can show which protocol paths were actually exercised.
//!
//! Results live in thread-local storage and are reset whenever a new
//! [`SimWorld`](crate::sim::SimWorld) is created.

use std::{cell::RefCell, collections::BTreeMap};

/// Outcome counts of one named assertion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssertionStats {
    /// Times the condition was evaluated.
    pub total_checks: usize,
    /// Times the condition held.
    pub successes: usize,
}

impl AssertionStats {
    /// Share of checks that held, as a percentage. Zero before any check.
    ///
    /// ```rust
    /// use rdt_sim::chaos::AssertionStats;
    ///
    /// let stats = AssertionStats { total_checks: 8, successes: 2 };
    /// assert_eq!(stats.success_rate(), 25.0);
    /// ```
    pub fn success_rate(&self) -> f64 {
        if self.total_checks == 0 {
            0.0
        } else {
            (self.successes as f64 / self.total_checks as f64) * 100.0
        }
    }

    /// Count one evaluation.
    pub fn record(&mut self, success: bool) {
        self.total_checks += 1;
        if success {
            self.successes += 1;
        }
    }

    /// Fold another set of counts into this one.
    pub fn merge(&mut self, other: &AssertionStats) {
        self.total_checks += other.total_checks;
        self.successes += other.successes;
    }
}

thread_local! {
    static ASSERTION_RESULTS: RefCell<BTreeMap<String, AssertionStats>> =
        RefCell::new(BTreeMap::new());
}

/// Record one evaluation of the assertion `name`.
///
/// Called by `sometimes_assert!`; exposed for callers that compute the
/// condition elsewhere.
pub fn record_assertion(name: &str, success: bool) {
    ASSERTION_RESULTS.with(|results| {
        results
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .record(success);
    });
}

/// Snapshot of every assertion recorded on this thread, ordered by name.
///
/// ```rust
/// use rdt_sim::chaos::{get_assertion_results, record_assertion, reset_assertion_results};
///
/// reset_assertion_results();
/// record_assertion("ack_lost", true);
/// record_assertion("ack_lost", false);
///
/// let results = get_assertion_results();
/// assert_eq!(results["ack_lost"].total_checks, 2);
/// assert_eq!(results["ack_lost"].success_rate(), 50.0);
/// ```
pub fn get_assertion_results() -> BTreeMap<String, AssertionStats> {
    ASSERTION_RESULTS.with(|results| results.borrow().clone())
}

/// Forget every assertion recorded on this thread.
pub fn reset_assertion_results() {
    ASSERTION_RESULTS.with(|results| results.borrow_mut().clear());
}

/// List the `sometimes_assert!` conditions that were checked but never held.
///
/// An empty result means every recorded path was reached at least once.
pub fn validate_assertion_contracts(
    results: &BTreeMap<String, AssertionStats>,
) -> Vec<String> {
    results
        .iter()
        .filter(|(_, stats)| stats.total_checks > 0 && stats.successes == 0)
        .map(|(name, stats)| {
            format!(
                "sometimes_assert!({name}) never held in {} checks",
                stats.total_checks
            )
        })
        .collect()
}

/// Assert a protocol invariant, panicking with the current seed on failure.
///
/// Successful checks are not recorded.
///
/// ```rust
/// use rdt_sim::always_assert;
///
/// let outstanding = 1;
/// always_assert!(single_outstanding, outstanding <= 1, "A has more than one unacked packet");
/// ```
#[macro_export]
macro_rules! always_assert {
    ($name:ident, $condition:expr, $message:expr) => {
        if !$condition {
            panic!(
                "Always assertion '{}' failed (seed: {}): {}",
                stringify!($name),
                $crate::sim::get_current_sim_seed(),
                $message
            );
        }
    };
}

/// Record whether a probabilistic protocol situation occurred.
///
/// Never fails the run; the counts end up in the
/// [`SimulationReport`](crate::runner::SimulationReport).
///
/// ```rust
/// use rdt_sim::sometimes_assert;
///
/// let lost = true;
/// sometimes_assert!(packet_lost, lost, "channel drops packets");
/// ```
#[macro_export]
macro_rules! sometimes_assert {
    ($name:ident, $condition:expr, $message:expr) => {
        $crate::chaos::record_assertion(stringify!($name), $condition);
    };
}
