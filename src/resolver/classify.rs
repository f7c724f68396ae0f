//! Identifier classification.

use regex::Regex;
use std::sync::LazyLock;

/// Prefix shared by every BioSamples accession.
pub const BIOSAMPLES_ID_PREFIX: &str = "SAM";

static BIOSAMPLE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^SAM[END][A-Z]?\d{6,}$").expect("valid accession pattern"));

/// Registry that holds the metadata for an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Public accession registry (SAM...)
    BioSamples,
    /// Submission registry (internal IDs and aliases)
    Webin,
}

impl Authority {
    /// The registry to try when this one has nothing usable.
    pub fn other(self) -> Self {
        match self {
            Self::BioSamples => Self::Webin,
            Self::Webin => Self::BioSamples,
        }
    }
}

impl std::fmt::Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BioSamples => write!(f, "biosamples"),
            Self::Webin => write!(f, "webin"),
        }
    }
}

/// Preferred authority for a submitter-supplied identifier.
///
/// Any identifier starting with `SAM` (case-insensitive) goes to BioSamples first.
pub fn classify(sample_id: &str) -> Authority {
    let prefix = sample_id.trim().get(..BIOSAMPLES_ID_PREFIX.len());
    match prefix {
        Some(p) if p.eq_ignore_ascii_case(BIOSAMPLES_ID_PREFIX) => Authority::BioSamples,
        _ => Authority::Webin,
    }
}

/// Whether an identifier is a well-formed BioSamples accession
/// (`SAMEA…`, `SAMN…`, `SAMD…` followed by at least six digits).
pub fn is_biosample_id(sample_id: &str) -> bool {
    BIOSAMPLE_ID_RE.is_match(sample_id)
}
