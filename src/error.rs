//! Tova Compiler Diagnostic Types
//!
//! Provides rich diagnostics with source locations, code snippets,
//! stable error codes, and suggested fixes - inspired by Rust's
//! excellent error messages.

use colored::Colorize;
use std::fmt;

/// Source location attached to tokens, AST nodes, and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Loc {
    pub file: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Length of the span in characters
    pub length: usize,
}

impl Loc {
    pub fn new(file: impl Into<String>, line: usize, column: usize, length: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            length,
        }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single diagnostic produced by the analyzer, merger, or import resolver.
///
/// Diagnostics are data, not control flow: each phase runs to completion
/// collecting them, and the build driver decides pass/fail at the end.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable code from the registry in `error_codes` (e.g. "E202")
    pub code: &'static str,
    pub message: String,
    pub loc: Loc,
    pub snippet: Option<String>,
    pub hint: Option<String>,
    pub fix: Option<String>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, loc: Loc) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            loc,
            snippet: None,
            hint: None,
            fix: None,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>, loc: Loc) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            loc,
            snippet: None,
            hint: None,
            fix: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    /// In strict mode every warning is promoted to an error.
    pub fn promote(mut self) -> Self {
        self.severity = Severity::Error;
        self
    }

    /// Render as `<file>:<line>:<col> — <severity> <code>: <message>` plus
    /// optional snippet, hint, and fix lines.
    pub fn render(&self) -> String {
        let mut out = format!(
            "{} — {} {}: {}",
            self.loc, self.severity, self.code, self.message
        );
        if let Some(ref snippet) = self.snippet {
            for line in snippet.lines() {
                out.push_str("\n    ");
                out.push_str(line);
            }
            if self.loc.column > 0 {
                out.push_str("\n    ");
                out.push_str(&" ".repeat(self.loc.column - 1));
                out.push_str(&"^".repeat(self.loc.length.max(1)));
            }
        }
        if let Some(ref hint) = self.hint {
            out.push_str("\n  hint: ");
            out.push_str(hint);
        }
        if let Some(ref fix) = self.fix {
            out.push_str("\n  fix: ");
            out.push_str(fix);
        }
        out
    }

    /// Render with terminal colors for CLI output.
    pub fn render_colored(&self) -> String {
        let severity = match self.severity {
            Severity::Error => format!("{} {}", "error".red().bold(), self.code.red()),
            Severity::Warning => format!("{} {}", "warning".yellow().bold(), self.code.yellow()),
        };
        let mut out = format!(
            "{} — {}: {}",
            self.loc.to_string().cyan(),
            severity,
            self.message
        );
        if let Some(ref snippet) = self.snippet {
            for line in snippet.lines() {
                out.push_str("\n    ");
                out.push_str(line);
            }
            if self.loc.column > 0 {
                out.push_str("\n    ");
                out.push_str(&" ".repeat(self.loc.column - 1));
                out.push_str(&"^".repeat(self.loc.length.max(1)).red().to_string());
            }
        }
        if let Some(ref hint) = self.hint {
            out.push_str(&format!("\n  {} {}", "hint:".cyan(), hint));
        }
        if let Some(ref fix) = self.fix {
            out.push_str(&format!("\n  {} {}", "fix:".green(), fix));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Summary line for a batch of diagnostics.
pub fn summarize(diagnostics: &[Diagnostic]) -> String {
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    format!("{} error(s), {} warning(s)", errors, warnings)
}

/// Extract the source line a diagnostic points at, for snippet rendering.
pub fn snippet_from_source(source: &str, line: usize) -> Option<String> {
    source.lines().nth(line.saturating_sub(1)).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_render() {
        let diag = Diagnostic::error(
            "E202",
            "unresolved identifier 'foo'",
            Loc::new("app.tova", 3, 15, 3),
        )
        .with_snippet("    let x = foo + 1")
        .with_hint("did you mean 'for'?");

        let output = diag.render();
        assert!(output.contains("app.tova:3:15"));
        assert!(output.contains("error E202"));
        assert!(output.contains("hint: did you mean 'for'?"));
    }

    #[test]
    fn test_warning_promotion() {
        let diag = Diagnostic::warning("W302", "shadowed binding 'x'", Loc::default()).promote();
        assert_eq!(diag.severity, Severity::Error);
    }

    #[test]
    fn test_summarize() {
        let diags = vec![
            Diagnostic::error("E201", "dup", Loc::default()),
            Diagnostic::warning("W301", "unused", Loc::default()),
            Diagnostic::warning("W302", "shadow", Loc::default()),
        ];
        assert_eq!(summarize(&diags), "1 error(s), 2 warning(s)");
    }
}
