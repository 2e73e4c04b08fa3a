pub mod clock;
pub mod core;
pub mod racer;
pub mod scheduler;
pub mod state;

pub use clock::{Clock, SystemClock};
pub use core::SweepEngine;
pub use racer::SubmissionRacer;
pub use scheduler::Scheduler;
pub use state::{EngineState, SharedState};
