//! Option records for `riff init`
//!
//! `InitOptions` is what the command line produced. `FunctionConfig` is what
//! validation produced from it; initializers only ever see the latter.

use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_VERSION: &str = "0.0.1";
pub const DEFAULT_RIFF_VERSION: &str = "0.0.6";
pub const FALLBACK_USER_ACCOUNT: &str = "riff";

/// Raw init parameters, as parsed from flags and positional arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitOptions {
    pub file_path: String,
    pub function_name: String,
    pub artifact: String,
    pub handler: String,
    pub version: String,
    pub riff_version: String,
    pub user_account: String,
    pub input: String,
    pub output: String,
    pub protocol: String,
    pub dry_run: bool,
    pub force: bool,
}

/// Wire protocol spoken between the platform sidecar and the function invoker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Stdio,
    Http,
    Grpc,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Stdio, Protocol::Http, Protocol::Grpc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Stdio => "stdio",
            Protocol::Http => "http",
            Protocol::Grpc => "grpc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }

    pub fn supported() -> String {
        Self::ALL
            .iter()
            .map(Protocol::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated, fully defaulted function parameters.
///
/// Built once by [`crate::validation::validate`] and then handed by value to
/// an initializer. `directory` is canonical and `artifact` is relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionConfig {
    pub directory: PathBuf,
    pub name: String,
    pub artifact: Option<PathBuf>,
    pub handler: Option<String>,
    pub version: String,
    pub riff_version: String,
    pub user_account: String,
    pub input: String,
    pub output: Option<String>,
    pub protocol: Option<Protocol>,
    pub dry_run: bool,
    pub force: bool,
}

impl FunctionConfig {
    pub fn with_handler(self, handler: Option<String>) -> Self {
        Self { handler, ..self }
    }

    /// Docker image reference the function is published under.
    pub fn image(&self) -> String {
        format!("{}/{}:{}", self.user_account, self.name, self.version)
    }
}

/// Upper-cases the first character and leaves the rest alone.
pub fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
