//! Helpers shared by the registry clients.

use crate::models::{ResolverError, Result};
use reqwest::{Response, Url};
use std::time::Duration;

/// Append path segments to a base URL.
///
/// Segments are percent-encoded, so aliases with spaces or slashes stay a
/// single segment. A trailing slash on the base is ignored.
pub(crate) fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ResolverError::Internal(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Build an HTTP client with the given request timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ResolverError::Network)
}

/// Map a transport failure onto the error taxonomy.
pub(crate) fn send_error(error: reqwest::Error, timeout: Duration) -> ResolverError {
    if error.is_timeout() {
        ResolverError::Timeout(timeout)
    } else {
        ResolverError::Network(error)
    }
}

/// Read the whole body. Runs inside the retried operation so a connection
/// dropped mid-body is retried like any other transport failure.
pub(crate) async fn read_body(response: Response, timeout: Duration) -> Result<String> {
    response.text().await.map_err(|e| send_error(e, timeout))
}

/// Turn a non-success response into an `Api` error, keeping the body for context.
pub(crate) async fn status_error(response: Response) -> ResolverError {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let message = response.text().await.unwrap_or_default();
    ResolverError::Api {
        status,
        url,
        message,
    }
}
