//! Diagnostics reported by the compiler pipeline.
//!
//! The core never formats diagnostics for humans. It hands each one to a
//! [`DiagnosticSink`] and carries on; presentation belongs to the caller.

use std::path::PathBuf;

use tracing::{error, warn};

/// Severity level of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single message with an optional source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub file: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic without a location.
    pub fn error(message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            line: None,
            column: None,
            file: None,
        }
    }

    /// Create a new warning diagnostic without a location.
    pub fn warning(message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            line: None,
            column: None,
            file: None,
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Diagnostic {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Diagnostic {
        self.file = Some(file.into());
        self
    }
}

/// Fire-and-forget receiver for diagnostics.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Forwards diagnostics to the `tracing` subscriber installed by the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        let file = diagnostic
            .file
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        match diagnostic.severity {
            Severity::Error => error!(
                file = %file,
                line = diagnostic.line,
                column = diagnostic.column,
                "{}",
                diagnostic.message
            ),
            Severity::Warning => warn!(
                file = %file,
                line = diagnostic.line,
                column = diagnostic.column,
                "{}",
                diagnostic.message
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_collects_in_order() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        sink.report(Diagnostic::warning("first"));
        sink.report(Diagnostic::error("second").at(2, 5).in_file("main.rr"));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].severity, Severity::Warning);
        assert_eq!(sink[1].line, Some(2));
        assert_eq!(sink[1].column, Some(5));
        assert_eq!(sink[1].file.as_deref(), Some(std::path::Path::new("main.rr")));
    }
}
