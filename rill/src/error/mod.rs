//! Error types and reporting
//!
//! The core distinguishes semantic errors (well-formed syntax with
//! ill-formed meaning, raised fail-fast at construction or mutation time)
//! from lookup misses, which are `Option` returns and never errors — the
//! caller decides whether an unresolved name is a problem.

use crate::ast::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CompileError>;

/// Compile error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Ill-formed type or declaration. The span is attached by the
    /// elaboration pass; errors raised inside the type model carry none.
    #[error("Semantic error: {message}")]
    Semantic { message: String, span: Option<Span> },
}

impl CompileError {
    pub fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic {
            message: message.into(),
            span: None,
        }
    }

    /// Attach a source location unless one is already present. The
    /// innermost span wins so that nested elaboration keeps the most
    /// precise location.
    pub fn with_span(mut self, span: Span) -> Self {
        match &mut self {
            Self::Semantic { span: slot, .. } => {
                if slot.is_none() {
                    *slot = Some(span);
                }
            }
        }
        self
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Semantic { span, .. } => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Semantic { message, .. } => message,
        }
    }
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &CompileError) {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    if let Some(span) = error.span() {
        Report::build(ReportKind::Error, (filename, span.start..span.end))
            .with_message("Semantic error")
            .with_label(
                Label::new((filename, span.start..span.end))
                    .with_message(error.message())
                    .with_color(Color::Red),
            )
            .finish()
            .print((filename, Source::from(source)))
            .unwrap();
    } else {
        Report::build(ReportKind::Error, (filename, 0..0))
            .with_message(format!("Semantic error: {}", error.message()))
            .finish()
            .print((filename, Source::from(source)))
            .unwrap();
    }
}
