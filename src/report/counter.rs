//! Message listeners.

use crate::report::{Severity, ValidationMessage};
use regex::Regex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives every message that reaches the root report.
pub trait MessageListener: Send + Sync {
    fn listen(&self, message: &ValidationMessage);
}

#[derive(Debug)]
enum MessageMatch {
    Text(String),
    Regex(Regex),
}

/// Counts messages of one severity whose text matches.
#[derive(Debug)]
pub struct MessageCounter {
    severity: Severity,
    matcher: MessageMatch,
    count: AtomicUsize,
}

impl MessageCounter {
    /// Match the exact message text.
    pub fn text(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            matcher: MessageMatch::Text(text.into()),
            count: AtomicUsize::new(0),
        }
    }

    /// Match the whole message text against a regular expression.
    pub fn regex(severity: Severity, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            severity,
            matcher: MessageMatch::Regex(Regex::new(&format!("^(?:{pattern})$"))?),
            count: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl MessageListener for MessageCounter {
    fn listen(&self, message: &ValidationMessage) {
        if message.severity != self.severity {
            return;
        }
        let matched = match &self.matcher {
            MessageMatch::Text(text) => &message.message == text,
            MessageMatch::Regex(re) => re.is_match(&message.message),
        };
        if matched {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
    }
}
