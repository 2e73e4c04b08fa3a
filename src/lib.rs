// Stellar/Pi claimable-balance sweep bot library

#![allow(dead_code)]

pub mod api;
pub mod bundle;
pub mod config;
pub mod engine;
pub mod fees;
pub mod horizon;
pub mod keys;
pub mod mocks;
pub mod predicate;

// Core types
pub mod constants;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use engine::{Clock, SweepEngine, SystemClock};
pub use types::{BotPhase, SubmissionResult, SweepError};
