//! Validation report sink.
//!
//! The resolver turns failures into report messages; manifest processing
//! owns the report and decides what the submitter sees.

mod counter;
mod message;
mod validation_report;

pub use counter::*;
pub use message::*;
pub use validation_report::*;
