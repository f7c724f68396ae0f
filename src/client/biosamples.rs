//! BioSamples client.
//!
//! Epistemic foundation:
//! - K_i: BioSamples is the public authority for SAM* accessions
//! - K_i: Characteristics arrive as name → list of typed values, in document order
//! - B_i: The accession exists (404 means "no sample", not an error)
//! - B_i: Tax ID is present (private or brokered samples may omit it)
//! - I^B: Network availability unknowable → retry with backoff

use crate::client::AccessionRegistry;
use crate::client::auth::WebinAuthClient;
use crate::client::http::{build_client, endpoint_url, read_body, send_error, status_error};
use crate::client::retry::{RetryContext, RetryPolicy, execute_with_retry};
use crate::models::{
    Attribute, BioSamplesConfig, ResolverError, Result, Sample, TRANSPORT_ERRORS,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Ontology prefix that carries an NCBI taxonomy ID.
const NCBI_TAXON_MARKER: &str = "NCBITaxon_";

/// `GET /v2/samples/{accession}` response (fields we use).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BioSampleResponse {
    accession: Option<String>,
    name: Option<String>,
    tax_id: Option<i64>,
    #[serde(default)]
    characteristics: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CharacteristicValue {
    text: Option<String>,
    #[serde(default)]
    ontology_terms: Vec<String>,
    unit: Option<String>,
}

/// Map a BioSamples document onto the canonical sample.
///
/// K_i: A record without an accession cannot be referenced, so it is malformed.
fn to_sample(response: BioSampleResponse) -> Result<Sample> {
    let accession = response
        .accession
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| ResolverError::Parse("BioSample document has no accession".to_string()))?;

    let mut attributes = Vec::new();
    let mut organism: Option<(String, Vec<String>)> = None;

    for (name, values) in response.characteristics {
        let values: Vec<CharacteristicValue> = serde_json::from_value(values)
            .map_err(|e| ResolverError::Parse(format!("Characteristic '{name}': {e}")))?;

        for value in values {
            if organism.is_none() && name.eq_ignore_ascii_case("organism") {
                organism = Some((
                    value.text.clone().unwrap_or_default(),
                    value.ontology_terms.clone(),
                ));
            }
            attributes.push(
                Attribute::new(name.clone(), value.text, value.unit)
                    .with_iris(value.ontology_terms),
            );
        }
    }

    let explicit_tax_id = response
        .tax_id
        .filter(|id| *id > 0)
        .and_then(|id| u32::try_from(id).ok());
    let tax_id = explicit_tax_id.or_else(|| {
        organism
            .as_ref()
            .and_then(|(_, iris)| tax_id_from_iris(iris.iter().map(String::as_str)))
    });

    Ok(Sample {
        biosample_id: Some(accession),
        sra_sample_id: None,
        name: response.name,
        organism: organism.map(|(text, _)| text).filter(|t| !t.is_empty()),
        tax_id,
        attributes,
    })
}

/// Tax ID from the first ontology URI ending in `NCBITaxon_<positive integer>`.
pub fn tax_id_from_iris<'a>(iris: impl IntoIterator<Item = &'a str>) -> Option<u32> {
    iris.into_iter().find_map(|iri| {
        let (_, id) = iri.rsplit_once(NCBI_TAXON_MARKER)?;
        id.parse::<u32>().ok().filter(|id| *id > 0)
    })
}

/// BioSamples API client.
///
/// Authenticates with a configured bearer token, or with a token requested
/// from the Webin token endpoint, or not at all.
pub struct BioSamplesClient {
    client: reqwest::Client,
    config: BioSamplesConfig,
    auth: Option<WebinAuthClient>,
    retry_policy: RetryPolicy,
}

impl BioSamplesClient {
    pub fn new(config: BioSamplesConfig) -> Result<Self> {
        let auth = match config.token() {
            Some(_) => None,
            None => config.auth().cloned().map(WebinAuthClient::new).transpose()?,
        };

        Ok(Self {
            client: build_client(config.timeout())?,
            config,
            auth,
            retry_policy: RetryPolicy::default(),
        })
    }

    /// Override the retry policy (token acquisition included).
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.auth = self
            .auth
            .map(|auth| auth.with_retry_policy(retry_policy.clone()));
        self.retry_policy = retry_policy;
        self
    }

    /// Fetch a sample by accession.
    ///
    /// B_i(accession known) → Ok(None) when BioSamples answers 404
    /// I^B(transport) → retried, then a system error
    pub async fn find_sample(&self, accession: &str) -> Result<Option<Sample>> {
        let accession = accession.trim();
        let token = self.bearer_token().await?;

        let result = execute_with_retry(
            &self.retry_policy,
            || self.fetch_sample(accession, token.as_deref()),
            |ctx: &RetryContext<'_, ResolverError>| {
                warn!(
                    retry = ctx.retry_count,
                    accession = accession,
                    error = %ctx.last_error,
                    "Retrying sample retrieval from Biosamples."
                )
            },
            TRANSPORT_ERRORS,
        )
        .await;

        match result {
            Ok(sample) => Ok(sample),
            Err(e) if e.is_retryable() => Err(ResolverError::system(
                format!("Could not retrieve BioSample [{accession}]"),
                e,
            )),
            Err(e) => Err(e),
        }
    }

    async fn bearer_token(&self) -> Result<Option<String>> {
        if let Some(token) = self.config.token() {
            return Ok(Some(token.to_string()));
        }
        match &self.auth {
            Some(auth) => auth.token().await.map(Some),
            None => Ok(None),
        }
    }

    async fn fetch_sample(&self, accession: &str, token: Option<&str>) -> Result<Option<Sample>> {
        let url = endpoint_url(self.config.base_uri(), &["v2", "samples", accession])?;
        debug!(url = %url, "Fetching BioSample");

        let mut request = self.client.get(url).header(ACCEPT, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| send_error(e, self.config.timeout()))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(accession = accession, "BioSample not found");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body = read_body(response, self.config.timeout()).await?;
        let body: BioSampleResponse = serde_json::from_str(&body).map_err(|e| {
            ResolverError::Parse(format!("Failed to parse BioSample {accession}: {e}"))
        })?;

        to_sample(body).map(Some)
    }
}

#[async_trait]
impl AccessionRegistry for BioSamplesClient {
    async fn find_sample(&self, accession: &str) -> Result<Option<Sample>> {
        BioSamplesClient::find_sample(self, accession).await
    }
}
