//! Configuration models for sampleref.
//!
//! All I^R (resolvable ignorance) is parameterized here.
//! The user resolves these unknowns at runtime via config file or environment.

use regex::Regex;
use reqwest::{RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

/// Top-level configuration for sampleref.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Which set of default service URIs to use
    #[serde(default)]
    pub environment: Environment,

    /// Webin authentication (token endpoint and submitter credentials)
    #[serde(default)]
    pub auth: AuthSection,

    /// BioSamples registry
    #[serde(default)]
    pub biosamples: BioSamplesSection,

    /// Webin REST service (sample reference and sample XML)
    #[serde(default)]
    pub webin: WebinSection,
}

/// Deployment the default URIs point at.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Test,
}

impl Environment {
    pub fn auth_uri(self) -> &'static str {
        match self {
            Self::Production => "https://www.ebi.ac.uk/ena/submit/webin/auth/token",
            Self::Test => "https://wwwdev.ebi.ac.uk/ena/submit/webin/auth/token",
        }
    }

    pub fn biosamples_uri(self) -> &'static str {
        match self {
            Self::Production => "https://www.ebi.ac.uk/biosamples/",
            Self::Test => "https://wwwdev.ebi.ac.uk/biosamples/",
        }
    }

    pub fn webin_uri(self) -> &'static str {
        match self {
            Self::Production => "https://www.ebi.ac.uk/ena/submit/drop-box/",
            Self::Test => "https://wwwdev.ebi.ac.uk/ena/submit/drop-box/",
        }
    }
}

/// `[auth]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    /// Token endpoint (defaults to the environment's endpoint)
    #[serde(default)]
    pub uri: Option<String>,

    /// Webin username (supports ${ENV_VAR} expansion)
    #[serde(default)]
    pub username: Option<String>,

    /// Environment variable consulted when `username` is not set
    #[serde(default = "default_username_env")]
    pub username_env: String,

    /// Webin password (supports ${ENV_VAR} expansion)
    #[serde(default)]
    pub password: Option<String>,

    /// Environment variable consulted when `password` is not set
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Pre-issued bearer token; skips token acquisition
    #[serde(default)]
    pub token: Option<String>,

    /// Environment variable consulted when `token` is not set
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Token request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_username_env() -> String {
    "WEBIN_USERNAME".to_string()
}

fn default_password_env() -> String {
    "WEBIN_PASSWORD".to_string()
}

fn default_token_env() -> String {
    "WEBIN_TOKEN".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            uri: None,
            username: None,
            username_env: default_username_env(),
            password: None,
            password_env: default_password_env(),
            token: None,
            token_env: default_token_env(),
            timeout_secs: default_timeout(),
        }
    }
}

/// `[biosamples]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BioSamplesSection {
    /// Base URI (defaults to the environment's BioSamples)
    #[serde(default)]
    pub uri: Option<String>,

    /// Webin username used only for BioSamples tokens
    #[serde(default)]
    pub username: Option<String>,

    /// Webin password used only for BioSamples tokens
    #[serde(default)]
    pub password: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for BioSamplesSection {
    fn default() -> Self {
        Self {
            uri: None,
            username: None,
            password: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// `[webin]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebinSection {
    /// Base URI of the Webin REST service (defaults to the environment's drop-box)
    #[serde(default)]
    pub uri: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for WebinSection {
    fn default() -> Self {
        Self {
            uri: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Username and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// How a request to the Webin REST service is authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    Bearer(String),
    Basic(Credentials),
    None,
}

impl AuthMethod {
    /// Bearer token if present, else Basic credentials, else nothing.
    pub fn from_parts(token: Option<String>, credentials: Option<Credentials>) -> Self {
        match (token, credentials) {
            (Some(token), _) => Self::Bearer(token),
            (None, Some(credentials)) => Self::Basic(credentials),
            (None, None) => Self::None,
        }
    }

    /// Attach the matching `Authorization` header.
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(token) => request.bearer_auth(token),
            Self::Basic(c) => request.basic_auth(&c.username, Some(&c.password)),
            Self::None => request,
        }
    }
}

/// Validated token endpoint configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    token_uri: Url,
    credentials: Credentials,
    timeout: Duration,
}

impl AuthConfig {
    pub fn new(
        token_uri: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(ConfigError::IncompleteCredentials("auth".to_string()));
        }
        Ok(Self {
            token_uri: parse_base_url("auth.uri", token_uri)?,
            credentials,
            timeout,
        })
    }

    pub fn token_uri(&self) -> &Url {
        &self.token_uri
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Validated BioSamples client configuration.
#[derive(Debug, Clone)]
pub struct BioSamplesConfig {
    base_uri: Url,
    token: Option<String>,
    auth: Option<AuthConfig>,
    timeout: Duration,
}

impl BioSamplesConfig {
    pub fn new(
        base_uri: &str,
        token: Option<String>,
        auth: Option<AuthConfig>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            base_uri: parse_base_url("biosamples.uri", base_uri)?,
            token: token.filter(|t| !t.is_empty()),
            auth,
            timeout,
        })
    }

    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    /// Pre-issued token, used as-is when present.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Token endpoint used when no token was configured.
    pub fn auth(&self) -> Option<&AuthConfig> {
        self.auth.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Validated Webin REST client configuration.
#[derive(Debug, Clone)]
pub struct WebinConfig {
    base_uri: Url,
    auth: AuthMethod,
    timeout: Duration,
}

impl WebinConfig {
    pub fn new(base_uri: &str, auth: AuthMethod, timeout: Duration) -> Result<Self, ConfigError> {
        if let AuthMethod::Basic(c) = &auth {
            if c.username.is_empty() || c.password.is_empty() {
                return Err(ConfigError::IncompleteCredentials("webin".to_string()));
            }
        }
        Ok(Self {
            base_uri: parse_base_url("webin.uri", base_uri)?,
            auth,
            timeout,
        })
    }

    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    pub fn auth(&self) -> &AuthMethod {
        &self.auth
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Per-client configuration derived from [`Config`].
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub biosamples: BioSamplesConfig,
    pub webin: WebinConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// B_i(file exists) → Result
    /// B_i(file is valid TOML) → Result
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Configuration with defaults for the given environment.
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            ..Default::default()
        }
    }

    /// Resolve the submitter's Webin credentials from config or environment.
    ///
    /// Returns `Ok(None)` when neither username nor password is available.
    pub fn resolve_credentials(&self) -> Result<Option<Credentials>, ConfigError> {
        let username = resolve_secret(self.auth.username.as_deref(), &self.auth.username_env);
        let password = resolve_secret(self.auth.password.as_deref(), &self.auth.password_env);

        match (username, password) {
            (Some(username), Some(password)) => Ok(Some(Credentials { username, password })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::IncompleteCredentials("auth".to_string())),
        }
    }

    /// Resolve a pre-issued bearer token from config or environment.
    pub fn resolve_token(&self) -> Option<String> {
        resolve_secret(self.auth.token.as_deref(), &self.auth.token_env)
    }

    /// Build and validate the configuration of every client.
    pub fn resolver_settings(&self) -> Result<ResolverSettings, ConfigError> {
        let token = self.resolve_token();
        let credentials = self.resolve_credentials()?;

        let biosamples_credentials = match (&self.biosamples.username, &self.biosamples.password) {
            (Some(u), Some(p)) => Some(Credentials::new(expand_env_vars(u), expand_env_vars(p))),
            (None, None) => credentials.clone(),
            _ => return Err(ConfigError::IncompleteCredentials("biosamples".to_string())),
        };

        let auth_uri = self
            .auth
            .uri
            .as_deref()
            .unwrap_or(self.environment.auth_uri());
        let token_endpoint = biosamples_credentials
            .map(|c| AuthConfig::new(auth_uri, c, Duration::from_secs(self.auth.timeout_secs)))
            .transpose()?;

        let biosamples = BioSamplesConfig::new(
            self.biosamples
                .uri
                .as_deref()
                .unwrap_or(self.environment.biosamples_uri()),
            token.clone(),
            token_endpoint,
            Duration::from_secs(self.biosamples.timeout_secs),
        )?;

        let webin = WebinConfig::new(
            self.webin
                .uri
                .as_deref()
                .unwrap_or(self.environment.webin_uri()),
            AuthMethod::from_parts(token, credentials),
            Duration::from_secs(self.webin.timeout_secs),
        )?;

        Ok(ResolverSettings { biosamples, webin })
    }
}

fn resolve_secret(explicit: Option<&str>, env_var: &str) -> Option<String> {
    if let Some(value) = explicit {
        return Some(expand_env_vars(value)).filter(|v| !v.is_empty());
    }
    std::env::var(env_var).ok().filter(|v| !v.is_empty())
}

fn parse_base_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        field: field.to_string(),
        url: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("not a base URL".to_string()));
    }
    Ok(url)
}

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();

    for cap in ENV_VAR_RE.captures_iter(s) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

/// Configuration errors.
///
/// Epistemic origin:
/// - B_i falsified: File not found, parse error, malformed URL
/// - I^B materialized: Missing required values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid URL for {field} ('{url}'): {reason}")]
    InvalidUrl {
        field: String,
        url: String,
        reason: String,
    },

    #[error("Incomplete credentials in [{0}]: both username and password are required")]
    IncompleteCredentials(String),
}
