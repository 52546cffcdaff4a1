//! Property checking for simulation runs.

mod assertions;

pub use assertions::{
    get_assertion_results, record_assertion, reset_assertion_results,
    validate_assertion_contracts, AssertionStats,
};
