//! Core data models for sampleref.
//!
//! Epistemic mapping:
//! - K_i (Knowledge): Canonical sample types with compile-time guarantees
//! - B_i (Beliefs): Registry answers wrapped in Result/Option
//! - I^R (Resolvable): Service URIs and credentials from config
//! - I^B (Bounded): Error kinds that drive the retry policy

mod config;
mod error;
mod sample;

pub use config::*;
pub use error::*;
pub use sample::*;
