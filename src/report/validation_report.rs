//! Append-only validation report.

use crate::report::{MessageListener, Severity, ValidationMessage, ValidationOrigin};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// Builder for [`ValidationReport`].
#[derive(Default)]
pub struct ValidationReportBuilder {
    parent: Option<Arc<ValidationReport>>,
    file: Option<PathBuf>,
    log: bool,
    origins: Vec<ValidationOrigin>,
    listeners: Vec<Arc<dyn MessageListener>>,
}

impl ValidationReportBuilder {
    /// Forward messages, with this report's origins prepended, to `parent`.
    pub fn parent(mut self, parent: Arc<ValidationReport>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Append messages to a report file.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_owned());
        self
    }

    /// Emit messages as tracing events.
    pub fn log(mut self) -> Self {
        self.log = true;
        self
    }

    pub fn origin(mut self, origin: ValidationOrigin) -> Self {
        self.origins.push(origin);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn MessageListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> std::io::Result<ValidationReport> {
        let file = self
            .file
            .map(|path| OpenOptions::new().create(true).append(true).open(path))
            .transpose()?;

        Ok(ValidationReport {
            parent: self.parent,
            file: file.map(Mutex::new),
            log: self.log,
            origins: self.origins,
            listeners: self.listeners,
            error_count: AtomicUsize::new(0),
            info_count: AtomicUsize::new(0),
        })
    }
}

/// Collects validation messages.
///
/// A child report counts its own messages and hands everything else to its
/// parent; listeners, file output and logging only happen at the root.
pub struct ValidationReport {
    parent: Option<Arc<ValidationReport>>,
    file: Option<Mutex<File>>,
    log: bool,
    origins: Vec<ValidationOrigin>,
    listeners: Vec<Arc<dyn MessageListener>>,
    error_count: AtomicUsize,
    info_count: AtomicUsize,
}

impl ValidationReport {
    pub fn builder() -> ValidationReportBuilder {
        ValidationReportBuilder::default()
    }

    /// Record a message.
    pub fn add(&self, mut message: ValidationMessage) {
        match message.severity {
            Severity::Error => self.error_count.fetch_add(1, Ordering::Relaxed),
            Severity::Info => self.info_count.fetch_add(1, Ordering::Relaxed),
        };

        message.prepend_origins(&self.origins);

        if let Some(parent) = &self.parent {
            parent.add(message);
            return;
        }

        for listener in &self.listeners {
            listener.listen(&message);
        }

        let mut written = false;
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                written = writeln!(file, "{}", message.format_for_report()).is_ok();
            }
        }

        if self.log || (self.file.is_some() && !written) {
            Self::log_message(&message);
        }
    }

    fn log_message(message: &ValidationMessage) {
        match message.severity {
            Severity::Error => error!("{}", message.format_for_log()),
            Severity::Info => info!("{}", message.format_for_log()),
        }
    }

    /// No ERROR messages recorded.
    pub fn is_valid(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) == 0
    }

    /// Total number of messages recorded.
    pub fn count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed) + self.info_count.load(Ordering::Relaxed)
    }

    /// Number of messages recorded with the given severity.
    pub fn count_of(&self, severity: Severity) -> usize {
        match severity {
            Severity::Error => self.error_count.load(Ordering::Relaxed),
            Severity::Info => self.info_count.load(Ordering::Relaxed),
        }
    }
}
