//! Sample resolution.
//!
//! Epistemic foundation:
//! - K_i: The identifier prefix decides which registry is asked first
//! - B_i: That registry holds a usable record (the other one is asked otherwise)

mod classify;
mod sample_resolver;

pub use classify::*;
pub use sample_resolver::*;
