use miette::Diagnostic;
use thiserror::Error;

use crate::initializers::InitializerError;
use crate::kubectl::KubectlError;
use crate::validation::ValidationError;

/// Why a command failed. Only `Usage` is reported together with usage text.
#[derive(Error, Debug, Diagnostic)]
pub enum CommandError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Initializer(#[from] InitializerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Kubectl(#[from] KubectlError),
}

impl CommandError {
    pub fn is_usage(&self) -> bool {
        matches!(self, CommandError::Usage(_))
    }
}
