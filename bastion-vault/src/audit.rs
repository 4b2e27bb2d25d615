//! Audit logging: every vault operation emits one pipe-separated line.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};

use crate::error::VaultError;

// ---------------------------------------------------------------------------
// Entry vocabulary
// ---------------------------------------------------------------------------

/// What happened. Closed set; the log format never grows new operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditOp {
    Init,
    Seal,
    Unseal,
    Store,
    Update,
    Retrieve,
    Delete,
    List,
    AddPolicy,
    RemovePolicy,
}

impl AuditOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOp::Init => "init",
            AuditOp::Seal => "seal",
            AuditOp::Unseal => "unseal",
            AuditOp::Store => "store",
            AuditOp::Update => "update",
            AuditOp::Retrieve => "retrieve",
            AuditOp::Delete => "delete",
            AuditOp::List => "list",
            AuditOp::AddPolicy => "add-policy",
            AuditOp::RemovePolicy => "remove-policy",
        }
    }
}

impl fmt::Display for AuditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How it ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Denied,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Denied => "denied",
            Outcome::Error => "error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line: `timestamp | identity | operation | path-or-dash | outcome`,
/// with the detail as a sixth field when present. Timestamp is captured at
/// call time, UTC with explicit offset.
fn format_entry(
    identity: &str,
    op: AuditOp,
    path: Option<&str>,
    outcome: Outcome,
    detail: Option<&str>,
) -> String {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false);
    let mut line = format!(
        "{} | {} | {} | {} | {}",
        timestamp,
        identity,
        op,
        path.unwrap_or("-"),
        outcome,
    );
    if let Some(detail) = detail {
        line.push_str(" | ");
        line.push_str(detail);
    }
    line.push('\n');
    line
}

// ---------------------------------------------------------------------------
// Audit sink trait
// ---------------------------------------------------------------------------

/// Where audit entries go.
///
/// `append` writes exactly one entry per call and never rewrites prior
/// bytes. I/O failures propagate to the engine, which reports them as the
/// originating operation's `error` outcome.
pub trait AuditSink: Send + Sync {
    fn append(
        &self,
        identity: &str,
        op: AuditOp,
        path: Option<&str>,
        outcome: Outcome,
        detail: Option<&str>,
    ) -> Result<(), VaultError>;

    /// The raw entry lines, oldest first; with `last_n`, exactly the
    /// trailing N (fewer if the log is shorter).
    fn replay(&self, last_n: Option<usize>) -> Result<Vec<String>, VaultError>;
}

fn tail(mut lines: Vec<String>, last_n: Option<usize>) -> Vec<String> {
    if let Some(n) = last_n {
        if lines.len() > n {
            lines.drain(..lines.len() - n);
        }
    }
    lines
}

// ---------------------------------------------------------------------------
// Built-in sinks
// ---------------------------------------------------------------------------

/// Appends entries to a log file, opened in append mode per write.
pub struct FileAuditSink {
    path: PathBuf,
}

impl FileAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AuditSink for FileAuditSink {
    fn append(
        &self,
        identity: &str,
        op: AuditOp,
        path: Option<&str>,
        outcome: Outcome,
        detail: Option<&str>,
    ) -> Result<(), VaultError> {
        let line = format_entry(identity, op, path, outcome, detail);
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| VaultError::AuditError(e.to_string()))?;
        file.write_all(line.as_bytes())
            .map_err(|e| VaultError::AuditError(e.to_string()))
    }

    fn replay(&self, last_n: Option<usize>) -> Result<Vec<String>, VaultError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VaultError::LogMissing)
            }
            Err(e) => return Err(VaultError::AuditError(e.to_string())),
        };
        let lines = text.lines().map(str::to_string).collect();
        Ok(tail(lines, last_n))
    }
}

/// Collects entries in memory (for tests and long-lived embedding).
pub struct MemoryAuditSink {
    entries: Mutex<Vec<String>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(
        &self,
        identity: &str,
        op: AuditOp,
        path: Option<&str>,
        outcome: Outcome,
        detail: Option<&str>,
    ) -> Result<(), VaultError> {
        let mut line = format_entry(identity, op, path, outcome, detail);
        line.pop(); // entries are stored unterminated, like replay returns them
        self.entries.lock().unwrap().push(line);
        Ok(())
    }

    fn replay(&self, last_n: Option<usize>) -> Result<Vec<String>, VaultError> {
        Ok(tail(self.entries(), last_n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn entry_format_fixed_field_order() {
        let line = format_entry("alice", AuditOp::Store, Some("a/b"), Outcome::Success, None);
        let fields: Vec<&str> = line.trim_end().split(" | ").collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[1], "alice");
        assert_eq!(fields[2], "store");
        assert_eq!(fields[3], "a/b");
        assert_eq!(fields[4], "success");
        // explicit UTC offset
        assert!(fields[0].ends_with("+00:00"));
    }

    #[test]
    fn absent_path_is_dash_and_detail_appends() {
        let line = format_entry(
            "system",
            AuditOp::Unseal,
            None,
            Outcome::Error,
            Some("Incorrect master password"),
        );
        let fields: Vec<&str> = line.trim_end().split(" | ").collect();
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[3], "-");
        assert_eq!(fields[5], "Incorrect master password");
    }

    #[test]
    fn file_sink_appends_one_line_per_call() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileAuditSink::new(dir.path().join("audit.log"));
        sink.append("a", AuditOp::Init, None, Outcome::Success, None).unwrap();
        sink.append("b", AuditOp::Store, Some("x"), Outcome::Denied, None).unwrap();

        let lines = sink.replay(None).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" | init | "));
        assert!(lines[1].contains(" | denied"));
    }

    #[test]
    fn file_sink_never_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let sink = FileAuditSink::new(&path);
        for _ in 0..5 {
            sink.append("a", AuditOp::List, None, Outcome::Success, None).unwrap();
        }
        let first = std::fs::read_to_string(&path).unwrap();
        sink.append("a", AuditOp::List, None, Outcome::Success, None).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert!(second.starts_with(&first));
    }

    #[test]
    fn replay_missing_log_fails() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileAuditSink::new(dir.path().join("nope.log"));
        assert_eq!(sink.replay(None), Err(VaultError::LogMissing));
    }

    #[test]
    fn replay_last_n_returns_tail() {
        let sink = MemoryAuditSink::new();
        for path in ["p1", "p2", "p3", "p4"] {
            sink.append("a", AuditOp::Store, Some(path), Outcome::Success, None).unwrap();
        }
        let tail = sink.replay(Some(2)).unwrap();
        assert_eq!(tail.len(), 2);
        assert!(tail[0].contains("p3"));
        assert!(tail[1].contains("p4"));
        // longer than the log: everything
        assert_eq!(sink.replay(Some(100)).unwrap().len(), 4);
    }

    #[test]
    fn sinks_are_shareable() {
        let sink: Arc<dyn AuditSink> = Arc::new(MemoryAuditSink::new());
        sink.append("a", AuditOp::Seal, None, Outcome::Success, None).unwrap();
        assert_eq!(sink.replay(None).unwrap().len(), 1);
    }
}
