pub mod clock_mock;
pub mod horizon_mock;

pub use clock_mock::MockClock;
pub use horizon_mock::{MockHorizonClient, SubmitOutcome};

use std::env;

/// Check if mock mode is enabled
pub fn is_mock_mode() -> bool {
    env::var("API_MODE").unwrap_or_default() == "mock"
}
