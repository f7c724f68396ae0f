//! Webin REST client: sample reference lookup and sample XML.
//!
//! Epistemic foundation:
//! - K_i: Webin is authoritative for whether a submitter may reference a sample
//! - K_i: `cli/reference/sample/{id}` accepts internal ID, alias or BioSamples accession
//! - B_i: The sample is referenceable (validation error otherwise, never retried)
//! - B_i: Sample XML is well formed (validation error otherwise, never retried)
//! - I^B: Network availability unknowable → retry transport failures only

use crate::client::SubmissionRegistry;
use crate::client::http::{build_client, endpoint_url, read_body, send_error, status_error};
use crate::client::retry::{RetryContext, RetryPolicy, execute_with_retry};
use crate::client::sample_xml::parse_sample_xml;
use crate::models::{
    ResolverError, Result, Sample, SampleReference, TRANSPORT_ERRORS, WebinConfig,
};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

/// `GET cli/reference/sample/{id}` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SampleReferenceResponse {
    tax_id: Option<i64>,
    id: Option<String>,
    organism: Option<String>,
    bio_sample_id: Option<String>,
    #[serde(default)]
    can_be_referenced: bool,
}

impl SampleReferenceResponse {
    fn into_reference(self, requested_id: &str) -> Result<SampleReference> {
        if !self.can_be_referenced {
            return Err(ResolverError::sample_not_referenceable(requested_id));
        }
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ResolverError::sample_not_referenceable(requested_id))?;

        Ok(SampleReference {
            id,
            biosample_id: self.bio_sample_id.filter(|id| !id.is_empty()),
            organism: self.organism.filter(|o| !o.is_empty()),
            tax_id: self
                .tax_id
                .filter(|t| *t > 0)
                .and_then(|t| u32::try_from(t).ok()),
        })
    }
}

/// Client for the Webin REST sample endpoints.
pub struct WebinClient {
    client: reqwest::Client,
    config: WebinConfig,
    retry_policy: RetryPolicy,
}

impl WebinClient {
    pub fn new(config: WebinConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout())?,
            config,
            retry_policy: RetryPolicy::default(),
        })
    }

    /// Override the retry policy.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Look up a sample the submitter wants to reference.
    ///
    /// B_i(referenceable) → validation error when Webin does not know the
    /// sample (404, empty body) or refuses the reference.
    pub async fn reference_sample(&self, sample_id: &str) -> Result<SampleReference> {
        let sample_id = sample_id.trim();

        let body = self
            .get_with_retry(&["cli", "reference", "sample", sample_id], "application/json")
            .await?;

        let Some(body) = body else {
            return Err(ResolverError::sample_not_referenceable(sample_id));
        };

        if body.trim().is_empty() {
            return Err(ResolverError::sample_not_referenceable(sample_id));
        }

        let parsed: SampleReferenceResponse = serde_json::from_str(&body).map_err(|e| {
            debug!(sample_id = sample_id, error = %e, "Unreadable sample reference");
            ResolverError::sample_not_referenceable(sample_id)
        })?;

        parsed.into_reference(sample_id)
    }

    /// Fetch the sample XML and map it onto a [`Sample`].
    pub async fn sample_xml(&self, sample_id: &str) -> Result<Sample> {
        let sample_id = sample_id.trim();

        let body = self
            .get_with_retry(&["samples", sample_id], "application/xml")
            .await?
            .ok_or_else(|| ResolverError::sample_not_referenceable(sample_id))?;

        parse_sample_xml(&body).map_err(|e| {
            warn!(sample_id = sample_id, error = %e, "Rejecting sample XML");
            ResolverError::sample_not_referenceable(sample_id)
        })
    }

    /// GET through the retry executor and return the body. `Ok(None)` on 404.
    async fn get_with_retry(&self, segments: &[&str], accept: &str) -> Result<Option<String>> {
        let url = endpoint_url(self.config.base_uri(), segments)?;

        let result = execute_with_retry(
            &self.retry_policy,
            || self.get_once(url.clone(), accept),
            |ctx: &RetryContext<'_, ResolverError>| {
                warn!(
                    retry = ctx.retry_count,
                    url = %url,
                    error = %ctx.last_error,
                    "Retrying sample retrieval from server."
                )
            },
            TRANSPORT_ERRORS,
        )
        .await;

        match result {
            Ok(body) => Ok(body),
            Err(e) if e.is_retryable() => Err(ResolverError::system(
                format!("Could not retrieve sample from {url}"),
                e,
            )),
            Err(e) => Err(e),
        }
    }

    async fn get_once(&self, url: reqwest::Url, accept: &str) -> Result<Option<String>> {
        debug!(url = %url, "Fetching from Webin");

        let request = self.client.get(url).header(ACCEPT, accept);
        let response = self
            .config
            .auth()
            .apply(request)
            .send()
            .await
            .map_err(|e| send_error(e, self.config.timeout()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                read_body(response, self.config.timeout()).await.map(Some)
            }
            _ => Err(status_error(response).await),
        }
    }
}

#[async_trait]
impl SubmissionRegistry for WebinClient {
    async fn reference_sample(&self, sample_id: &str) -> Result<SampleReference> {
        WebinClient::reference_sample(self, sample_id).await
    }

    async fn sample_xml(&self, sample_id: &str) -> Result<Sample> {
        WebinClient::sample_xml(self, sample_id).await
    }
}
