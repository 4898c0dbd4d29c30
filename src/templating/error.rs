//! Template error types with miette integration

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
#[error("Failed to render template {name}")]
pub struct TemplateError {
    name: String,

    #[source_code]
    src: NamedSource<String>,

    #[label("{}", self.reason)]
    span: Option<SourceSpan>,

    reason: String,

    #[help]
    help: Option<String>,

    #[source]
    source: Option<minijinja::Error>,
}

impl TemplateError {
    /// Create a new template error from a MiniJinja error
    pub fn from_minijinja_error(error: minijinja::Error, name: &str, source: &str) -> Self {
        let (span, reason, help) = Self::extract_error_info(&error, source);

        Self {
            name: name.to_string(),
            src: NamedSource::new(name, source.to_string()),
            span,
            reason,
            help,
            source: Some(error),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn extract_error_info(
        error: &minijinja::Error,
        source: &str,
    ) -> (Option<SourceSpan>, String, Option<String>) {
        let span = match (error.range(), error.line()) {
            (Some(range), _) => Some(SourceSpan::from(range)),
            // MiniJinja uses 1-based line numbers
            (None, Some(line)) => Some(SourceSpan::from(Self::line_to_offset(
                source,
                line.saturating_sub(1),
            ))),
            (None, None) => None,
        };

        let detail = error.detail().unwrap_or("unknown");
        let reason = match error.kind() {
            minijinja::ErrorKind::UndefinedError => match error.detail() {
                Some(detail) => format!("undefined variable: {detail}"),
                None => "undefined variable".to_string(),
            },
            minijinja::ErrorKind::SyntaxError => format!("syntax error: {detail}"),
            minijinja::ErrorKind::TemplateNotFound => format!("template not found: {detail}"),
            minijinja::ErrorKind::InvalidOperation => format!("invalid operation: {detail}"),
            minijinja::ErrorKind::UnknownFilter => format!("unknown filter: {detail}"),
            minijinja::ErrorKind::UnknownFunction => format!("unknown function: {detail}"),
            _ => error.to_string(),
        };

        let help = match error.kind() {
            minijinja::ErrorKind::UndefinedError => Some(
                "Function templates only see the fields of the function context \
                 (name, image, handler, artifact, protocol, input, output, ...)"
                    .to_string(),
            ),
            minijinja::ErrorKind::SyntaxError => Some(
                "Check the MiniJinja template syntax at https://docs.rs/minijinja/".to_string(),
            ),
            _ => None,
        };

        (span, reason, help)
    }

    /// Calculate byte offset from line number
    fn line_to_offset(source: &str, target_line: usize) -> usize {
        let mut current_line = 0;

        for (idx, ch) in source.char_indices() {
            if current_line == target_line {
                return idx;
            }

            if ch == '\n' {
                current_line += 1;
            }
        }

        source.len()
    }
}
