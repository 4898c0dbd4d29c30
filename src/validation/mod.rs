//! Validation and normalization of `riff init` options
//!
//! Checks run in a fixed order: filepath, function name, artifact, protocol.
//! The first failure wins, so a bad filepath is always reported before
//! anything that depends on it.

mod error;

pub use error::ValidationError;

use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::options::{FunctionConfig, InitOptions, Protocol};

static FUNCTION_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("Invalid function name pattern - this is a bug")
});

/// Where the function lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionPath {
    /// Canonical function directory.
    pub directory: PathBuf,
    /// Set when the user pointed at a file rather than a directory; relative to `directory`.
    pub file: Option<PathBuf>,
}

/// Validate and default `options`, producing the immutable function config.
pub fn validate(options: InitOptions) -> Result<FunctionConfig, ValidationError> {
    let target = validate_filepath(&options.file_path)?;
    let name = validate_function_name(&options.function_name, &target)?;
    let artifact = validate_artifact(&options.artifact, &target)?;
    let protocol = validate_protocol(&options.protocol)?;

    debug!(
        directory = %target.directory.display(),
        name = %name,
        artifact = ?artifact,
        "init options validated"
    );

    let input = if options.input.is_empty() {
        name.clone()
    } else {
        options.input
    };

    Ok(FunctionConfig {
        directory: target.directory,
        name,
        artifact,
        handler: non_empty(options.handler),
        version: options.version,
        riff_version: options.riff_version,
        user_account: options.user_account,
        input,
        output: non_empty(options.output),
        protocol,
        dry_run: options.dry_run,
        force: options.force,
    })
}

/// Resolve the function path, defaulting to the current directory.
pub fn validate_filepath(path: &str) -> Result<FunctionPath, ValidationError> {
    let requested = if path.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(path)
    };

    let resolved = fs::canonicalize(&requested).map_err(|_| ValidationError::FilePathNotFound {
        path: requested.clone(),
    })?;

    if resolved.is_file() {
        let directory = resolved
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| ValidationError::FilePathNotFound {
                path: requested.clone(),
            })?;
        let file = resolved.file_name().map(PathBuf::from);
        Ok(FunctionPath { directory, file })
    } else {
        Ok(FunctionPath {
            directory: resolved,
            file: None,
        })
    }
}

/// Default the function name from the path and check it is filesystem safe.
pub fn validate_function_name(name: &str, target: &FunctionPath) -> Result<String, ValidationError> {
    let name = if name.is_empty() {
        let base = match &target.file {
            Some(file) => file.file_stem(),
            None => target.directory.file_name(),
        };
        base.and_then(OsStr::to_str)
            .map(str::to_string)
            .ok_or_else(|| ValidationError::MissingFunctionName {
                path: target.directory.clone(),
            })?
    } else {
        name.to_string()
    };

    if !FUNCTION_NAME.is_match(&name) || name.contains("..") {
        return Err(ValidationError::InvalidFunctionName { name });
    }

    Ok(name)
}

/// Check the artifact exists under the function directory and return it relative to it.
///
/// An empty artifact falls back to the file the filepath pointed at, if any.
pub fn validate_artifact(
    artifact: &str,
    target: &FunctionPath,
) -> Result<Option<PathBuf>, ValidationError> {
    if artifact.is_empty() {
        return Ok(target.file.clone());
    }

    let requested = PathBuf::from(artifact);
    let resolved = fs::canonicalize(target.directory.join(&requested)).map_err(|_| {
        ValidationError::ArtifactNotFound {
            artifact: requested.clone(),
        }
    })?;

    let relative = resolved
        .strip_prefix(&target.directory)
        .map_err(|_| ValidationError::ArtifactOutsideFilePath {
            artifact: requested.clone(),
            directory: target.directory.clone(),
        })?
        .to_path_buf();

    if !resolved.is_file() {
        return Err(ValidationError::ArtifactNotAFile {
            artifact: requested,
        });
    }

    Ok(Some(relative))
}

/// An empty protocol means "use the language default".
pub fn validate_protocol(protocol: &str) -> Result<Option<Protocol>, ValidationError> {
    if protocol.is_empty() {
        return Ok(None);
    }
    Protocol::parse(protocol)
        .map(Some)
        .ok_or_else(|| ValidationError::UnsupportedProtocol {
            protocol: protocol.to_string(),
            supported: Protocol::supported(),
        })
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn options_for(path: &Path) -> InitOptions {
        InitOptions {
            file_path: path.to_string_lossy().into_owned(),
            version: "0.0.1".to_string(),
            riff_version: "0.0.6".to_string(),
            user_account: "acme".to_string(),
            ..InitOptions::default()
        }
    }

    #[test]
    fn test_defaults_name_and_input_from_directory() {
        let dir = tempdir().unwrap();
        let function_dir = dir.path().join("square");
        fs::create_dir(&function_dir).unwrap();

        let config = validate(options_for(&function_dir)).unwrap();
        assert_eq!(config.directory, fs::canonicalize(&function_dir).unwrap());
        assert_eq!(config.name, "square");
        assert_eq!(config.input, "square");
        assert_eq!(config.output, None);
        assert_eq!(config.artifact, None);
        assert_eq!(config.protocol, None);
    }

    #[test]
    fn test_explicit_values_are_kept() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("upper.js"), "module.exports = x => x;").unwrap();

        let mut options = options_for(dir.path());
        options.function_name = "upper".to_string();
        options.artifact = "upper.js".to_string();
        options.input = "words".to_string();
        options.output = "shouts".to_string();
        options.protocol = "http".to_string();

        let config = validate(options).unwrap();
        assert_eq!(config.name, "upper");
        assert_eq!(config.artifact, Some(PathBuf::from("upper.js")));
        assert_eq!(config.input, "words");
        assert_eq!(config.output.as_deref(), Some("shouts"));
        assert_eq!(config.protocol, Some(Protocol::Http));
    }

    #[test]
    fn test_filepath_pointing_at_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("echo.sh");
        fs::write(&file, "#!/bin/sh\ncat\n").unwrap();

        let config = validate(options_for(&file)).unwrap();
        assert_eq!(config.directory, fs::canonicalize(dir.path()).unwrap());
        assert_eq!(config.name, "echo");
        assert_eq!(config.artifact, Some(PathBuf::from("echo.sh")));
    }

    #[test]
    fn test_missing_filepath() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = validate_filepath(missing.to_str().unwrap()).unwrap_err();
        assert_eq!(err, ValidationError::FilePathNotFound { path: missing });
    }

    #[test]
    fn test_filepath_failure_reported_first() {
        let dir = tempdir().unwrap();
        let mut options = options_for(&dir.path().join("nope"));
        options.function_name = "bad name!".to_string();
        options.artifact = "missing.js".to_string();
        options.protocol = "carrier-pigeon".to_string();

        let err = validate(options).unwrap_err();
        assert!(matches!(err, ValidationError::FilePathNotFound { .. }));
    }

    #[test]
    fn test_name_failure_reported_before_artifact() {
        let dir = tempdir().unwrap();
        let mut options = options_for(dir.path());
        options.function_name = "bad name!".to_string();
        options.artifact = "missing.js".to_string();

        let err = validate(options).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFunctionName { .. }));
    }

    #[test]
    fn test_artifact_failure_reported_before_protocol() {
        let dir = tempdir().unwrap();
        let mut options = options_for(dir.path());
        options.function_name = "fine".to_string();
        options.artifact = "missing.js".to_string();
        options.protocol = "carrier-pigeon".to_string();

        let err = validate(options).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ArtifactNotFound {
                artifact: PathBuf::from("missing.js")
            }
        );
    }

    #[test]
    fn test_hidden_directory_needs_explicit_name() {
        let dir = tempdir().unwrap();
        let hidden = dir.path().join(".cache");
        fs::create_dir(&hidden).unwrap();

        let err = validate(options_for(&hidden)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidFunctionName {
                name: ".cache".to_string()
            }
        );

        let mut options = options_for(&hidden);
        options.function_name = "cache".to_string();
        assert_eq!(validate(options).unwrap().name, "cache");
    }

    #[test]
    fn test_function_name_rules() {
        let target = FunctionPath {
            directory: PathBuf::from("/work/square"),
            file: None,
        };
        assert_eq!(validate_function_name("", &target).unwrap(), "square");
        assert_eq!(validate_function_name("my_func-2.v1", &target).unwrap(), "my_func-2.v1");

        for bad in ["-leading", "with space", "a/b", "..", "a..b", ".hidden"] {
            assert!(
                matches!(
                    validate_function_name(bad, &target),
                    Err(ValidationError::InvalidFunctionName { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_function_name_from_root_fails() {
        let target = FunctionPath {
            directory: PathBuf::from("/"),
            file: None,
        };
        assert!(matches!(
            validate_function_name("", &target),
            Err(ValidationError::MissingFunctionName { .. })
        ));
    }

    #[test]
    fn test_artifact_is_normalized_relative_to_directory() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("target/upper-1.0.0.jar"), b"PK").unwrap();
        let target = validate_filepath(dir.path().to_str().unwrap()).unwrap();

        let artifact = validate_artifact("./target/../target/upper-1.0.0.jar", &target).unwrap();
        assert_eq!(artifact, Some(PathBuf::from("target/upper-1.0.0.jar")));

        let absolute = target.directory.join("target/upper-1.0.0.jar");
        let artifact = validate_artifact(absolute.to_str().unwrap(), &target).unwrap();
        assert_eq!(artifact, Some(PathBuf::from("target/upper-1.0.0.jar")));
    }

    #[test]
    fn test_artifact_outside_directory() {
        let dir = tempdir().unwrap();
        let function_dir = dir.path().join("fn");
        fs::create_dir(&function_dir).unwrap();
        fs::write(dir.path().join("outside.js"), "").unwrap();
        let target = validate_filepath(function_dir.to_str().unwrap()).unwrap();

        let err = validate_artifact("../outside.js", &target).unwrap_err();
        assert!(matches!(err, ValidationError::ArtifactOutsideFilePath { .. }));
    }

    #[test]
    fn test_artifact_must_be_a_file() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        let target = validate_filepath(dir.path().to_str().unwrap()).unwrap();

        let err = validate_artifact("lib", &target).unwrap_err();
        assert!(matches!(err, ValidationError::ArtifactNotAFile { .. }));
    }

    #[test]
    fn test_protocol() {
        assert_eq!(validate_protocol("").unwrap(), None);
        assert_eq!(validate_protocol("stdio").unwrap(), Some(Protocol::Stdio));
        let err = validate_protocol("pipes").unwrap_err();
        assert_eq!(
            err.to_string(),
            "protocol 'pipes' is unsupported"
        );
    }
}
