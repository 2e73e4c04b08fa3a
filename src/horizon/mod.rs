pub mod client;

pub use client::{HorizonClient, HttpHorizon};
