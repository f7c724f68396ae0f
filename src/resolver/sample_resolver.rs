//! Sample resolution across BioSamples and Webin.
//!
//! Epistemic foundation:
//! - K_i: BioSamples data wins whenever it is usable (has a tax ID)
//! - K_i: Webin decides whether a sample may be referenced at all
//! - B_i: The preferred registry has a usable record (fall back otherwise)
//! - I^B: Transport failures are retried inside the clients, then surface here
//!
//! ## Stages
//!
//! 1. Classify: `SAM*` → BioSamples first, anything else → Webin first
//! 2. Preferred lookup, returned as soon as it is usable
//! 3. Alternate lookup, following Webin's cross-reference back to BioSamples
//! 4. Nothing usable → `Ok(None)`

use crate::client::{AccessionRegistry, BioSamplesClient, SubmissionRegistry, WebinClient};
use crate::models::{
    Config, ResolverError, ResolverSettings, Result, Sample, SampleReference,
    sample_validation_message,
};
use crate::report::{ValidationMessage, ValidationOrigin, ValidationReport};
use crate::resolver::{Authority, classify};
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves submitter sample identifiers to one canonical [`Sample`].
///
/// Holds only immutable configuration; concurrent calls share nothing else.
#[derive(Clone)]
pub struct SampleResolver {
    biosamples: Arc<dyn AccessionRegistry>,
    webin: Arc<dyn SubmissionRegistry>,
}

impl SampleResolver {
    pub fn new(biosamples: Arc<dyn AccessionRegistry>, webin: Arc<dyn SubmissionRegistry>) -> Self {
        Self { biosamples, webin }
    }

    /// Build HTTP clients from validated settings.
    pub fn from_settings(settings: ResolverSettings) -> Result<Self> {
        let biosamples = BioSamplesClient::new(settings.biosamples)?;
        let webin = WebinClient::new(settings.webin)?;
        Ok(Self::new(Arc::new(biosamples), Arc::new(webin)))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::from_settings(config.resolver_settings()?)
    }

    /// Resolve an identifier.
    ///
    /// Returns `Ok(None)` when no registry has a usable record. Validation
    /// errors from the fallback lookup and exhausted transient failures are
    /// returned as `Err`.
    pub async fn resolve(&self, sample_id: &str) -> Result<Option<Sample>> {
        let sample_id = sample_id.trim();
        if sample_id.is_empty() {
            debug!("Empty sample identifier");
            return Ok(None);
        }
        let preferred = classify(sample_id);
        debug!(sample_id = sample_id, preferred = %preferred, alternate = %preferred.other(), "Resolving sample");

        let sample = match preferred {
            Authority::BioSamples => self.resolve_biosamples_first(sample_id).await?,
            Authority::Webin => self.resolve_webin_first(sample_id).await?,
        };

        match &sample {
            Some(s) => info!(
                sample_id = sample_id,
                biosample_id = s.biosample_id.as_deref().unwrap_or("-"),
                sra_sample_id = s.sra_sample_id.as_deref().unwrap_or("-"),
                tax_id = s.tax_id,
                "Sample resolved"
            ),
            None => info!(sample_id = sample_id, "Sample not found"),
        }
        Ok(sample)
    }

    /// Webin reference completed with the sample XML; BioSamples is not consulted.
    pub async fn resolve_complete(&self, sample_id: &str) -> Result<Sample> {
        let sample_id = sample_id.trim();
        if sample_id.is_empty() {
            return Err(ResolverError::sample_not_referenceable(sample_id));
        }
        let reference = self.webin.reference_sample(sample_id).await?;
        self.complete_reference(reference).await
    }

    /// Resolve and record any failure in `report` under a `sample` origin.
    pub async fn resolve_into_report(
        &self,
        sample_id: &str,
        report: &ValidationReport,
    ) -> Option<Sample> {
        let sample_id = sample_id.trim();
        let origin = ValidationOrigin::new("sample", sample_id);

        match self.resolve(sample_id).await {
            Ok(Some(sample)) => Some(sample),
            Ok(None) => {
                report.add(
                    ValidationMessage::error(sample_validation_message(sample_id))
                        .with_origin(origin),
                );
                None
            }
            Err(e) => {
                report.add(ValidationMessage::error(e.to_string()).with_origin(origin));
                None
            }
        }
    }

    async fn resolve_biosamples_first(&self, sample_id: &str) -> Result<Option<Sample>> {
        let preferred = self.biosamples.find_sample(sample_id).await?;
        if preferred.as_ref().is_some_and(Sample::is_usable) {
            return Ok(preferred);
        }
        debug!(
            sample_id = sample_id,
            found = preferred.is_some(),
            "BioSamples record missing or incomplete, asking Webin"
        );

        // No further registry to fall back to: validation errors propagate.
        let reference = self.webin.reference_sample(sample_id).await?;

        if let Some(accession) = reference.biosample_id.as_deref() {
            if !accession.eq_ignore_ascii_case(sample_id) {
                debug!(accession = accession, "Following Webin cross-reference to BioSamples");
                let requeried = self.biosamples.find_sample(accession).await?;
                if requeried.as_ref().is_some_and(Sample::is_usable) {
                    return Ok(requeried);
                }
            }
        }

        if !reference.is_usable() {
            return Ok(None);
        }
        self.complete_reference(reference).await.map(Some)
    }

    async fn resolve_webin_first(&self, sample_id: &str) -> Result<Option<Sample>> {
        let reference = match self.webin.reference_sample(sample_id).await {
            Ok(reference) => Some(reference),
            Err(e) if e.is_validation() => {
                debug!(sample_id = sample_id, error = %e, "Webin has no referenceable sample, asking BioSamples");
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(reference) = reference.as_ref().filter(|r| r.is_usable()) {
            return self.complete_reference(reference.clone()).await.map(Some);
        }

        let accession = reference
            .as_ref()
            .and_then(|r| r.biosample_id.as_deref())
            .unwrap_or(sample_id);
        let Some(sample) = self.biosamples.find_sample(accession).await? else {
            return Ok(None);
        };
        if !sample.is_usable() {
            return Ok(None);
        }

        match reference {
            Some(reference) if sample.attributes.is_empty() => {
                debug!(sra_sample_id = %reference.id, "Enriching BioSample with Webin attributes");
                let xml = self.webin.sample_xml(&reference.id).await?;
                Ok(Some(Self::with_sra_id(sample, &reference).merge_attributes_from(xml)))
            }
            Some(reference) => Ok(Some(Self::with_sra_id(sample, &reference))),
            None => Ok(Some(sample)),
        }
    }

    /// Webin reference fields plus name and attributes from the sample XML.
    async fn complete_reference(&self, reference: SampleReference) -> Result<Sample> {
        let xml = self.webin.sample_xml(&reference.id).await?;

        let mut sample = reference.to_sample();
        if sample.tax_id.is_none() {
            sample.tax_id = xml.tax_id;
        }
        if sample.organism.is_none() {
            sample.organism = xml.organism.clone();
        }
        if sample.sra_sample_id.is_none() {
            sample.sra_sample_id = xml.sra_sample_id.clone();
        }
        Ok(sample.merge_attributes_from(xml))
    }

    fn with_sra_id(mut sample: Sample, reference: &SampleReference) -> Sample {
        if sample.sra_sample_id.is_none() {
            sample.sra_sample_id = Some(reference.id.clone());
        }
        sample
    }
}

impl std::fmt::Debug for SampleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleResolver").finish_non_exhaustive()
    }
}

/// Convenience for callers that only need an error when nothing was found.
pub fn require_sample(sample_id: &str, sample: Option<Sample>) -> Result<Sample> {
    sample.ok_or_else(|| ResolverError::sample_not_referenceable(sample_id))
}
