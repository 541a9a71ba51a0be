//! Diagnostics.
//!
//! The pipeline accumulates [`CompileError`]s rather than aborting (the
//! teacher's `validate::CompilerError` does the same) — only a handful of
//! truly unrecoverable conditions (source unreadable, markup-return subtree
//! missing) short-circuit codegen. Those live in [`FatalError`], kept
//! separate so `compile`/`compile_file` can return a `Result` without
//! forcing every warning into the error channel.

use crate::ir::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ErrorSpan {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    pub file: String,
    pub start: SourceLocation,
    pub end: SourceLocation,
}

/// A single diagnostic. `code` is a stable string (see the `codes` module)
/// so tooling can key off it without parsing `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileError {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub location: ErrorLocation,
    pub suggestion: Option<String>,
}

impl CompileError {
    pub fn new(
        code: &str,
        severity: Severity,
        message: impl Into<String>,
        file: &str,
        loc: SourceLocation,
    ) -> Self {
        CompileError {
            code: code.to_string(),
            severity,
            message: message.into(),
            location: ErrorLocation {
                file: file.to_string(),
                start: loc,
                end: loc,
            },
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_fatal_for_codegen(&self) -> bool {
        self.severity == Severity::Error && self.code == codes::PARSE_ERROR
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}:{}:{}: {}",
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "info",
            },
            self.code,
            self.location.file,
            self.location.start.line,
            self.location.start.column,
            self.message
        )
    }
}

/// Stable diagnostic codes. Never renumbered; a code once shipped keeps its
/// meaning.
pub mod codes {
    pub const PARSE_ERROR: &str = "BF-PARSE-001";
    pub const EXTRACTION_WARNING: &str = "BF-EXTRACT-001";
    pub const UNSUPPORTED_EXPRESSION: &str = "BF-ADAPT-001";
    pub const AMBIGUOUS_REACTIVITY: &str = "BF-REACT-001";
    pub const ADAPTER_INCAPABILITY: &str = "BF-ADAPT-002";
    pub const MALFORMED_LOOP_BODY: &str = "BF-LOOP-001";
    pub const MISSING_MARKUP_RETURN: &str = "BF-ANALYZE-001";
}

/// Renders a one-line code frame: the offending source line with a caret
/// under the reported column. Used by CLI diagnostics output.
pub fn code_frame(source: &str, error: &CompileError) -> String {
    let line_no = error.location.start.line as usize;
    let column = error.location.start.column as usize;
    let line = source.lines().nth(line_no.saturating_sub(1)).unwrap_or("");
    let caret = " ".repeat(column) + "^";
    format!(
        "{}\n  --> {}:{}:{}\n   | {}\n   | {}",
        error, error.location.file, line_no, column, line, caret
    )
}

/// Conditions that prevent `CompileResult` from being produced at all.
/// Distinct from [`CompileError`]: these abort the call, diagnostics do not.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} could not be parsed: {message}")]
    Parse { path: String, message: String },
}
