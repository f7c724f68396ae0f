//! Report messages.

use serde::{Deserialize, Serialize};

/// Message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "ERROR"),
            Self::Info => write!(f, "INFO"),
        }
    }
}

/// Where a message came from, e.g. `sample: ERS000002`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOrigin {
    pub key: String,
    pub value: String,
}

impl ValidationOrigin {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for ValidationOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

/// One report entry. Origins are ordered outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMessage {
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub origins: Vec<ValidationOrigin>,
}

impl ValidationMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            origins: Vec::new(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
            origins: Vec::new(),
        }
    }

    pub fn with_origin(mut self, origin: ValidationOrigin) -> Self {
        self.origins.push(origin);
        self
    }

    /// Prepend origins of an enclosing report.
    pub fn prepend_origins(&mut self, origins: &[ValidationOrigin]) {
        if !origins.is_empty() {
            self.origins.splice(0..0, origins.iter().cloned());
        }
    }

    /// `message [origin, origin]`
    pub fn format_for_log(&self) -> String {
        if self.origins.is_empty() {
            return self.message.clone();
        }
        let origins: Vec<String> = self.origins.iter().map(ToString::to_string).collect();
        format!("{} [{}]", self.message, origins.join(", "))
    }

    /// `SEVERITY: message [origin, origin]`
    pub fn format_for_report(&self) -> String {
        format!("{}: {}", self.severity, self.format_for_log())
    }
}
