//! sampleref - Resolve submitter sample identifiers against BioSamples and Webin.
//!
//! ## Architecture
//!
//! sampleref talks to two registries:
//! - **BioSamples**: public accession registry, authoritative for metadata
//! - **Webin**: submission registry, authoritative for whether a sample may
//!   be referenced, and source of the sample XML
//!
//! ## Resolution
//!
//! Classify identifier → preferred registry → alternate registry →
//! cross-reference back to BioSamples → XML enrichment → canonical [`Sample`]
//!
//! ## Epistemic Design
//!
//! - K_i (Knowledge): Canonical sample types, authority precedence
//! - B_i (Beliefs): Registry answers (Result, Option)
//! - I^R (Resolvable): Service URIs and credentials from config
//! - I^B (Bounded): Network uncertainty (retry, backoff)

pub mod client;
pub mod models;
pub mod report;
pub mod resolver;

// Re-exports for convenience
pub use client::{BioSamplesClient, RetryPolicy, WebinAuthClient, WebinClient};
pub use models::{Config, ResolverError, Result, Sample, SampleReference};
pub use report::{Severity, ValidationMessage, ValidationReport};
pub use resolver::{Authority, SampleResolver, classify, is_biosample_id};
