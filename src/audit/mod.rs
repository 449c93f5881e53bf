//! Append-only audit trail for ingestion requests.
//!
//! Every line is written with a single open/append/close cycle, so lines from
//! concurrent requests never tear but may interleave. The request id on each
//! line is what ties a request's lines back together.

use chrono::Local;
use log::{info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

pub const LOG_FILE_NAME: &str = "api_log.txt";

/// Sink for human-readable audit lines
pub trait AuditLog: Send + Sync {
    /// Append one line. Failures are reported through `log`, never to the caller.
    fn append(&self, line: &str);
}

/// Audit log backed by `<root>/logs/api_log.txt`
#[derive(Debug, Clone)]
pub struct FileAuditLog {
    path: PathBuf,
}

impl FileAuditLog {
    pub fn new(log_dir: &Path) -> Self {
        Self {
            path: log_dir.join(LOG_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // One write call per line keeps lines intact under concurrent appends
        let entry = format!("[{}] {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), line);
        file.write_all(entry.as_bytes())
    }
}

impl AuditLog for FileAuditLog {
    fn append(&self, line: &str) {
        info!("{}", line);
        if let Err(e) = self.write_line(line) {
            warn!("Failed to append audit line to {}: {}", self.path.display(), e);
        }
    }
}

/// Audit handle bound to a single request
#[derive(Clone)]
pub struct AuditScope {
    log: Arc<dyn AuditLog>,
    request_id: Uuid,
}

impl AuditScope {
    pub fn new(log: Arc<dyn AuditLog>) -> Self {
        Self {
            log,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn record(&self, message: impl AsRef<str>) {
        self.log
            .append(&format!("[{}] {}", self.request_id, message.as_ref()));
    }
}
