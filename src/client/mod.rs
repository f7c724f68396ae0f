//! Registry clients.
//!
//! Epistemic foundation:
//! - K_i: Two authorities hold sample metadata (BioSamples, Webin)
//! - B_i: Either may be down, incomplete, or unaware of a given identifier
//! - I^B: Transport failures are bounded by the shared retry executor

mod auth;
mod biosamples;
mod http;
mod retry;
mod sample_xml;
mod webin;

pub use auth::*;
pub use biosamples::*;
pub use retry::*;
pub use sample_xml::*;
pub use webin::*;

use crate::models::{Result, Sample, SampleReference};
use async_trait::async_trait;

/// Public accession registry (BioSamples).
#[async_trait]
pub trait AccessionRegistry: Send + Sync {
    /// `Ok(None)` when the registry does not know the accession.
    async fn find_sample(&self, accession: &str) -> Result<Option<Sample>>;
}

/// Submission registry (Webin) that decides whether a sample may be referenced.
#[async_trait]
pub trait SubmissionRegistry: Send + Sync {
    /// Reference record keyed by internal ID, alias or BioSamples accession.
    async fn reference_sample(&self, sample_id: &str) -> Result<SampleReference>;

    /// Full record (name, taxonomy, attributes) keyed by internal ID.
    async fn sample_xml(&self, sample_id: &str) -> Result<Sample>;
}
