//! Diagnostic model (spec.md §3 "Diagnostic", §4.5, §7).
//!
//! Every later stage reports through this module instead of returning bare
//! strings: a `Diagnostic` always carries a severity, an optional source
//! position, and two hashes — a 64-bit `short_hash` for de-duplicating
//! repeats within one run, and a base58 `long_hash` stable enough to quote
//! in a bug report.

use crate::position::SourcePosition;
use sha2::{Digest, Sha256};
use std::fmt;

/// Severity, in increasing order (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        write!(f, "{s}")
    }
}

/// A secondary note attached to a diagnostic (e.g. "first declared here").
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedNote {
    pub position: SourcePosition,
    pub message: String,
}

/// A single structured diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub position: Option<SourcePosition>,
    pub short_hash: u64,
    pub long_hash: String,
    pub related: Vec<RelatedNote>,
    /// Populated only for `Fatal` diagnostics when a backtrace is available.
    pub stack_symbols: Option<Vec<String>>,
}

impl Diagnostic {
    /// Build a diagnostic, computing both hashes from `(message, file, line,
    /// column, timestamp)`. `timestamp` is a unix-seconds value supplied by
    /// the caller — this module performs no clock reads so that hashes stay
    /// reproducible in tests (spec.md invariant 9).
    pub fn new(
        severity: Severity,
        message: impl Into<String>,
        position: Option<SourcePosition>,
        timestamp: u32,
    ) -> Self {
        let message = message.into();
        let (file, line, column) = match &position {
            Some(p) => (p.file.as_ref(), p.line, p.column),
            None => ("", 0, 0),
        };
        let digest = content_digest(&message, file, line, column);
        let short_hash = u64::from_be_bytes(digest[0..8].try_into().unwrap());
        let long_hash = encode_long_hash(&digest, timestamp, line, column);

        Diagnostic {
            severity,
            message,
            position,
            short_hash,
            long_hash,
            related: Vec::new(),
            stack_symbols: None,
        }
    }

    pub fn with_related(mut self, position: SourcePosition, message: impl Into<String>) -> Self {
        self.related.push(RelatedNote { position, message: message.into() });
        self
    }

    pub fn with_stack_symbols(mut self, symbols: Vec<String>) -> Self {
        self.stack_symbols = Some(symbols);
        self
    }

    pub fn blocks_emission(&self) -> bool {
        self.severity >= Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.position {
            Some(p) => write!(f, "{}: {}: {} [{}]", p, self.severity, self.message, self.long_hash),
            None => write!(f, "{}: {} [{}]", self.severity, self.message, self.long_hash),
        }
    }
}

fn content_digest(message: &str, file: &str, line: u32, column: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    hasher.update(b"::");
    hasher.update(file.as_bytes());
    hasher.update(b"::");
    hasher.update(line.to_le_bytes());
    hasher.update(b"::");
    hasher.update(column.to_le_bytes());
    hasher.finalize().into()
}

/// Tag "JC0" followed by base58 of `{hash[0..12], unix_ts_le32, line_le16, column_le32}`.
fn encode_long_hash(digest: &[u8; 32], timestamp: u32, line: u32, column: u32) -> String {
    let mut payload = [0u8; 22];
    payload[0..12].copy_from_slice(&digest[0..12]);
    payload[12..16].copy_from_slice(&timestamp.to_le_bytes());
    payload[16..18].copy_from_slice(&(line as u16).to_le_bytes());
    payload[18..22].copy_from_slice(&column.to_le_bytes());
    format!("JC0{}", crate::base58::encode(&payload))
}

/// Append-only collection of diagnostics for a single compilation unit
/// (spec.md §5 "Ordering guarantee for diagnostics"). Diagnostics are never
/// removed or reordered once pushed.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSink {
    unit_name: String,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new(unit_name: impl Into<String>) -> Self {
        DiagnosticSink { unit_name: unit_name.into(), diagnostics: Vec::new() }
    }

    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// The highest severity observed, if any diagnostics were pushed.
    pub fn max_severity(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|d| d.severity).max()
    }

    /// spec.md §7: "A unit that produced at least one Error diagnostic does
    /// not emit target source."
    pub fn blocks_emission(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::blocks_emission)
    }

    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Fatal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pos() -> SourcePosition {
        SourcePosition::new(Arc::from("a.j"), 3, 5)
    }

    #[test]
    fn long_hash_is_stable_for_fixed_timestamp() {
        let a = Diagnostic::new(Severity::Error, "bad token", Some(pos()), 1_700_000_000);
        let b = Diagnostic::new(Severity::Error, "bad token", Some(pos()), 1_700_000_000);
        assert_eq!(a.long_hash, b.long_hash);
        assert_eq!(a.short_hash, b.short_hash);
    }

    #[test]
    fn long_hash_changes_with_timestamp() {
        let a = Diagnostic::new(Severity::Error, "bad token", Some(pos()), 1);
        let b = Diagnostic::new(Severity::Error, "bad token", Some(pos()), 2);
        assert_ne!(a.long_hash, b.long_hash);
        // short hash is a pure function of (message, file, line, column) only
        assert_eq!(a.short_hash, b.short_hash);
    }

    #[test]
    fn long_hash_has_tag_prefix() {
        let d = Diagnostic::new(Severity::Warning, "x", None, 0);
        assert!(d.long_hash.starts_with("JC0"));
    }

    #[test]
    fn severity_ordering_blocks_emission() {
        assert!(!Diagnostic::new(Severity::Warning, "m", None, 0).blocks_emission());
        assert!(Diagnostic::new(Severity::Error, "m", None, 0).blocks_emission());
        assert!(Diagnostic::new(Severity::Fatal, "m", None, 0).blocks_emission());
    }

    #[test]
    fn sink_preserves_push_order() {
        let mut sink = DiagnosticSink::new("unit-a");
        sink.push(Diagnostic::new(Severity::Info, "one", None, 0));
        sink.push(Diagnostic::new(Severity::Warning, "two", None, 0));
        let messages: Vec<_> = sink.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["one", "two"]);
        assert_eq!(sink.max_severity(), Some(Severity::Warning));
    }
}
