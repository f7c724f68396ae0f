//! End-to-end resolution against an in-process mock of the token endpoint,
//! BioSamples and the Webin REST service.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use sampleref::client::{BioSamplesClient, RetryPolicy, WebinClient};
use sampleref::models::{
    AuthConfig, AuthMethod, BioSamplesConfig, Credentials, ErrorKind, ResolverError, WebinConfig,
};
use sampleref::SampleResolver;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const TOKEN: &str = "mock-token";
const USERNAME: &str = "Webin-256";
const PASSWORD: &str = "secret";

const ERS000002_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SAMPLE_SET>
  <SAMPLE alias="yeast_sk1" accession="ERS000002">
    <SAMPLE_NAME>
      <TAXON_ID>580239</TAXON_ID>
      <SCIENTIFIC_NAME>Saccharomyces cerevisiae SK1</SCIENTIFIC_NAME>
    </SAMPLE_NAME>
    <SAMPLE_ATTRIBUTES>
      <SAMPLE_ATTRIBUTE><TAG>strain</TAG><VALUE>SK1</VALUE></SAMPLE_ATTRIBUTE>
      <SAMPLE_ATTRIBUTE><TAG>temperature</TAG><VALUE>30</VALUE><UNITS>C</UNITS></SAMPLE_ATTRIBUTE>
    </SAMPLE_ATTRIBUTES>
  </SAMPLE>
</SAMPLE_SET>"#;

#[derive(Default)]
struct MockState {
    biosamples: HashMap<String, Value>,
    references: HashMap<String, Value>,
    xml: HashMap<String, String>,
    /// Number of upcoming requests answered with 503, per endpoint
    biosamples_failures: AtomicU32,
    token_failures: AtomicU32,
    reference_failures: AtomicU32,
    token_requests: AtomicU32,
    authorization: Mutex<Vec<(String, Option<String>)>>,
}

fn take_failure(remaining: &AtomicU32) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl MockState {
    fn record(&self, route: &str, headers: &HeaderMap) {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.authorization
            .lock()
            .unwrap()
            .push((route.to_string(), value));
    }

    fn authorization_for(&self, route: &str) -> Vec<Option<String>> {
        self.authorization
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r == route)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBody {
    username: String,
    password: String,
    auth_realms: Vec<String>,
}

async fn issue_token(State(state): State<Arc<MockState>>, Json(body): Json<TokenBody>) -> Response {
    state.token_requests.fetch_add(1, Ordering::SeqCst);
    if take_failure(&state.token_failures) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if body.username != USERNAME || body.password != PASSWORD || body.auth_realms != ["ENA"] {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    TOKEN.into_response()
}

async fn biosample(
    State(state): State<Arc<MockState>>,
    Path(accession): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record("biosamples", &headers);
    if take_failure(&state.biosamples_failures) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    match state.biosamples.get(&accession) {
        Some(body) => Json(body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn sample_reference(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record("reference", &headers);
    if take_failure(&state.reference_failures) {
        return StatusCode::BAD_GATEWAY.into_response();
    }
    match state.references.get(&id) {
        Some(body) => Json(body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn sample_xml(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record("xml", &headers);
    match state.xml.get(&id) {
        Some(body) => ([(header::CONTENT_TYPE, "application/xml")], body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn registries() -> MockState {
    let mut state = MockState::default();

    state.biosamples.insert(
        "SAMEA13774371".to_string(),
        json!({
            "accession": "SAMEA13774371",
            "name": "source material",
            "characteristics": {
                "organism": [{
                    "text": "Homo sapiens",
                    "ontologyTerms": ["http://purl.obolibrary.org/obo/NCBITaxon_9606"]
                }],
                "age": [{ "text": "30", "unit": "years" }]
            }
        }),
    );
    state.biosamples.insert(
        "SAMEA749881".to_string(),
        json!({ "accession": "SAMEA749881", "name": "SK1", "characteristics": {} }),
    );

    state.references.insert(
        "ERS000002".to_string(),
        json!({
            "taxId": 580239,
            "id": "ERS000002",
            "organism": "Saccharomyces cerevisiae SK1",
            "bioSampleId": "SAMEA749881",
            "canBeReferenced": true
        }),
    );
    state.references.insert(
        "SAMEA749881".to_string(),
        json!({
            "taxId": 580239,
            "id": "ERS000002",
            "organism": "Saccharomyces cerevisiae SK1",
            "bioSampleId": "SAMEA749881",
            "canBeReferenced": true
        }),
    );
    state.references.insert(
        "ERS999999".to_string(),
        json!({ "taxId": 9606, "id": "ERS999999", "canBeReferenced": false }),
    );
    state
        .xml
        .insert("ERS000002".to_string(), ERS000002_XML.to_string());

    state
}

async fn serve(state: Arc<MockState>) -> String {
    let app = Router::new()
        .route("/auth/token", post(issue_token))
        .route("/biosamples/v2/samples/:accession", get(biosample))
        .route("/webin/cli/reference/sample/:id", get(sample_reference))
        .route("/webin/samples/:id", get(sample_xml))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn fast_retries() -> RetryPolicy {
    RetryPolicy {
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        ..RetryPolicy::default()
    }
}

fn resolver(base: &str, webin_auth: AuthMethod) -> SampleResolver {
    resolver_with_password(base, webin_auth, PASSWORD)
}

fn resolver_with_password(base: &str, webin_auth: AuthMethod, password: &str) -> SampleResolver {
    let timeout = Duration::from_secs(5);
    let auth = AuthConfig::new(
        &format!("{base}/auth/token"),
        Credentials::new(USERNAME, password),
        timeout,
    )
    .unwrap();

    let biosamples = BioSamplesClient::new(
        BioSamplesConfig::new(&format!("{base}/biosamples/"), None, Some(auth), timeout).unwrap(),
    )
    .unwrap()
    .with_retry_policy(fast_retries());

    let webin = WebinClient::new(
        WebinConfig::new(&format!("{base}/webin/"), webin_auth, timeout).unwrap(),
    )
    .unwrap()
    .with_retry_policy(fast_retries());

    SampleResolver::new(Arc::new(biosamples), Arc::new(webin))
}

#[tokio::test]
async fn test_biosamples_accession_with_token() {
    let state = Arc::new(registries());
    let base = serve(state.clone()).await;
    let resolver = resolver(&base, AuthMethod::None);

    let sample = resolver.resolve("SAMEA13774371").await.unwrap().unwrap();

    assert_eq!(sample.biosample_id.as_deref(), Some("SAMEA13774371"));
    assert_eq!(sample.tax_id, Some(9606));
    assert_eq!(sample.organism.as_deref(), Some("Homo sapiens"));
    assert_eq!(sample.attribute_value("age"), Some("30"));
    assert_eq!(state.token_requests.load(Ordering::SeqCst), 1);
    assert_eq!(
        state.authorization_for("biosamples"),
        vec![Some(format!("Bearer {TOKEN}"))]
    );
}

#[tokio::test]
async fn test_internal_id_with_basic_auth_and_xml() {
    let state = Arc::new(registries());
    let base = serve(state.clone()).await;
    let resolver = resolver(&base, AuthMethod::Basic(Credentials::new(USERNAME, PASSWORD)));

    let sample = resolver.resolve("ERS000002").await.unwrap().unwrap();

    assert_eq!(sample.sra_sample_id.as_deref(), Some("ERS000002"));
    assert_eq!(sample.biosample_id.as_deref(), Some("SAMEA749881"));
    assert_eq!(sample.tax_id, Some(580239));
    assert_eq!(sample.name.as_deref(), Some("yeast_sk1"));
    assert_eq!(sample.attributes.len(), 2);
    assert_eq!(sample.attributes[1].unit.as_deref(), Some("C"));

    // "Webin-256:secret"
    let basic = Some("Basic V2ViaW4tMjU2OnNlY3JldA==".to_string());
    assert_eq!(state.authorization_for("reference"), vec![basic.clone()]);
    assert_eq!(state.authorization_for("xml"), vec![basic]);
    assert!(state.authorization_for("biosamples").is_empty());
}

#[tokio::test]
async fn test_incomplete_biosample_completed_from_webin() {
    let state = Arc::new(registries());
    let base = serve(state.clone()).await;
    let resolver = resolver(&base, AuthMethod::Bearer("webin-token".to_string()));

    let sample = resolver.resolve("SAMEA749881").await.unwrap().unwrap();

    assert_eq!(sample.biosample_id.as_deref(), Some("SAMEA749881"));
    assert_eq!(sample.sra_sample_id.as_deref(), Some("ERS000002"));
    assert_eq!(sample.tax_id, Some(580239));
    assert_eq!(sample.attribute_value("strain"), Some("SK1"));
    assert_eq!(
        state.authorization_for("reference"),
        vec![Some("Bearer webin-token".to_string())]
    );
}

#[tokio::test]
async fn test_unknown_identifiers() {
    let state = Arc::new(registries());
    let base = serve(state.clone()).await;
    let resolver = resolver(&base, AuthMethod::None);

    assert_eq!(resolver.resolve("xxx").await.unwrap(), None);

    let err = resolver.resolve("SAMEA0000000").await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(
        err.to_string(),
        "Unknown sample SAMEA0000000 or the sample cannot be referenced by your submission \
         account. Samples must be submitted before they can be referenced in the submission."
    );

    let err = resolver.resolve_complete("ERS999999").await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let state = Arc::new(registries());
    state.biosamples_failures.store(3, Ordering::SeqCst);
    let base = serve(state.clone()).await;
    let resolver = resolver(&base, AuthMethod::None);

    let sample = resolver.resolve("SAMEA13774371").await.unwrap().unwrap();

    assert_eq!(sample.tax_id, Some(9606));
    assert_eq!(state.authorization_for("biosamples").len(), 4);
}

#[tokio::test]
async fn test_exhausted_retries_surface_as_system_error() {
    let state = Arc::new(registries());
    state.biosamples_failures.store(100, Ordering::SeqCst);
    let base = serve(state.clone()).await;
    let resolver = resolver(&base, AuthMethod::None);

    let err = resolver.resolve("SAMEA13774371").await.unwrap_err();

    assert!(matches!(err, ResolverError::System { .. }));
    assert!(!err.is_validation());
    assert_eq!(state.authorization_for("biosamples").len(), 7);
}

#[tokio::test]
async fn test_token_endpoint_server_errors_are_retried() {
    let state = Arc::new(registries());
    state.token_failures.store(2, Ordering::SeqCst);
    let base = serve(state.clone()).await;
    let resolver = resolver(&base, AuthMethod::None);

    let sample = resolver.resolve("SAMEA13774371").await.unwrap().unwrap();

    assert_eq!(sample.tax_id, Some(9606));
    assert_eq!(state.token_requests.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_rejected_credentials_are_not_retried() {
    let state = Arc::new(registries());
    let base = serve(state.clone()).await;
    let resolver = resolver_with_password(&base, AuthMethod::None, "wrong");

    let err = resolver.resolve("SAMEA13774371").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ClientError);
    assert_eq!(state.token_requests.load(Ordering::SeqCst), 1);
    assert!(state.authorization_for("biosamples").is_empty());
}

#[tokio::test]
async fn test_webin_server_errors_are_retried() {
    let state = Arc::new(registries());
    state.reference_failures.store(3, Ordering::SeqCst);
    let base = serve(state.clone()).await;
    let resolver = resolver(&base, AuthMethod::None);

    let sample = resolver.resolve("ERS000002").await.unwrap().unwrap();

    assert_eq!(sample.sra_sample_id.as_deref(), Some("ERS000002"));
    assert_eq!(state.authorization_for("reference").len(), 4);
}

#[tokio::test]
async fn test_webin_exhausted_retries_surface_as_system_error() {
    let state = Arc::new(registries());
    state.reference_failures.store(100, Ordering::SeqCst);
    let base = serve(state.clone()).await;
    let resolver = resolver(&base, AuthMethod::None);

    let err = resolver.resolve("ERS000002").await.unwrap_err();

    assert!(matches!(
        &err,
        ResolverError::System { source, .. } if source.kind() == ErrorKind::ServerError
    ));
    assert_eq!(state.authorization_for("reference").len(), 7);
    assert!(state.authorization_for("biosamples").is_empty());
}

/// Serves `body` with a correct `content-length`, but the first connection
/// is closed after ten bytes of it.
async fn truncate_first_response(body: &'static str, hits: Arc<AtomicU32>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let hit = hits.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&chunk[..n]),
                    }
                }

                let head = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n",
                    body.len()
                );
                let sent = if hit == 0 { &body[..10] } else { body };
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(sent.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}/")
}

#[tokio::test]
async fn test_webin_body_cut_off_is_retried() {
    let hits = Arc::new(AtomicU32::new(0));
    let base = truncate_first_response(
        r#"{"taxId":580239,"id":"ERS000002","bioSampleId":"SAMEA749881","canBeReferenced":true}"#,
        hits.clone(),
    )
    .await;

    let webin = WebinClient::new(
        WebinConfig::new(&base, AuthMethod::None, Duration::from_secs(5)).unwrap(),
    )
    .unwrap()
    .with_retry_policy(fast_retries());

    let reference = webin.reference_sample("ERS000002").await.unwrap();

    assert_eq!(reference.id, "ERS000002");
    assert_eq!(reference.tax_id, Some(580239));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_biosamples_body_cut_off_is_retried() {
    let hits = Arc::new(AtomicU32::new(0));
    let base = truncate_first_response(
        r#"{"accession":"SAMEA13774371","taxId":9606,"characteristics":{}}"#,
        hits.clone(),
    )
    .await;

    let biosamples = BioSamplesClient::new(
        BioSamplesConfig::new(&base, Some(TOKEN.to_string()), None, Duration::from_secs(5))
            .unwrap(),
    )
    .unwrap()
    .with_retry_policy(fast_retries());

    let sample = biosamples.find_sample("SAMEA13774371").await.unwrap().unwrap();

    assert_eq!(sample.biosample_id.as_deref(), Some("SAMEA13774371"));
    assert_eq!(sample.tax_id, Some(9606));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}
