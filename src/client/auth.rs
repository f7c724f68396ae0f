//! Webin authentication token client.
//!
//! Epistemic foundation:
//! - K_i: The token endpoint exchanges Webin credentials for a short-lived JWT
//! - K_i: The response body is the token itself (no JSON envelope)
//! - B_i: Credentials are valid (4xx otherwise, never retried)
//! - I^B: Endpoint availability unknowable → retry on transport failures

use crate::client::http::{build_client, read_body, send_error, status_error};
use crate::client::retry::{RetryContext, RetryPolicy, execute_with_retry};
use crate::models::{AuthConfig, ResolverError, Result, TRANSPORT_ERRORS};
use serde::Serialize;
use tracing::{debug, warn};

/// Realm requested for every token.
const AUTH_REALM: &str = "ENA";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
    auth_realms: [&'static str; 1],
}

/// Client for the Webin token endpoint.
///
/// Tokens are not cached: every call to [`WebinAuthClient::token`] requests
/// a fresh one.
pub struct WebinAuthClient {
    client: reqwest::Client,
    config: AuthConfig,
    retry_policy: RetryPolicy,
}

impl WebinAuthClient {
    pub fn new(config: AuthConfig) -> Result<Self> {
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

    /// Request a bearer token.
    pub async fn token(&self) -> Result<String> {
        let result = execute_with_retry(
            &self.retry_policy,
            || self.request_token(),
            |ctx: &RetryContext<'_, ResolverError>| {
                warn!(
                    retry = ctx.retry_count,
                    error = %ctx.last_error,
                    "Retrying acquiring authentication token."
                )
            },
            TRANSPORT_ERRORS,
        )
        .await;

        match result {
            Ok(token) => Ok(token),
            Err(e) if e.is_retryable() => Err(ResolverError::system(
                "Could not acquire authentication token",
                e,
            )),
            Err(e) => Err(e),
        }
    }

    async fn request_token(&self) -> Result<String> {
        let credentials = self.config.credentials();
        let body = TokenRequest {
            username: &credentials.username,
            password: &credentials.password,
            auth_realms: [AUTH_REALM],
        };

        debug!(uri = %self.config.token_uri(), user = %credentials.username, "Requesting token");

        let response = self
            .client
            .post(self.config.token_uri().clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, self.config.timeout()))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let token = read_body(response, self.config.timeout()).await?;
        let token = token.trim();
        if token.is_empty() {
            return Err(ResolverError::Parse(
                "Token endpoint returned an empty body".to_string(),
            ));
        }
        Ok(token.to_string())
    }
}
