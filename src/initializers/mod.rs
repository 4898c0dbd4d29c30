//! Per-language function initializers
//!
//! Every language renders the same set of artifacts from embedded templates:
//! a `Dockerfile` based on the language invoker image, the `Function` and
//! `Topic` manifests, and a source stub when no source exists yet.

mod discovery;
mod error;

pub use discovery::{ArtifactChoice, detect_language, find_candidates, resolve_artifact};
pub use error::InitializerError;

use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::options::{FunctionConfig, Protocol};
use crate::templating::TemplateEngine;

// Embed the function templates at compile time
const TEMPLATES: &[(&str, &str)] = &[
    (
        "function.yaml",
        include_str!("templates/common/function.yaml.j2"),
    ),
    ("topics.yaml", include_str!("templates/common/topics.yaml.j2")),
    (
        "java/Dockerfile",
        include_str!("templates/java/Dockerfile.j2"),
    ),
    (
        "command/Dockerfile",
        include_str!("templates/command/Dockerfile.j2"),
    ),
    (
        "command/function",
        include_str!("templates/command/function.sh.j2"),
    ),
    (
        "node/Dockerfile",
        include_str!("templates/node/Dockerfile.j2"),
    ),
    (
        "node/function",
        include_str!("templates/node/function.js.j2"),
    ),
    (
        "python/Dockerfile",
        include_str!("templates/python/Dockerfile.j2"),
    ),
    (
        "python/function",
        include_str!("templates/python/function.py.j2"),
    ),
    ("go/Dockerfile", include_str!("templates/go/Dockerfile.j2")),
    ("go/function", include_str!("templates/go/function.go.j2")),
];

/// The supported function languages. Each one is its own initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Java,
    Command,
    Node,
    Python,
    Go,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Java,
        Language::Command,
        Language::Node,
        Language::Python,
        Language::Go,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Command => "command",
            Language::Node => "node",
            Language::Python => "python",
            Language::Go => "go",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Java => &["jar"],
            Language::Command => &["sh"],
            Language::Node => &["js"],
            Language::Python => &["py"],
            Language::Go => &["go"],
        }
    }

    /// Directories searched for artifacts, relative to the function directory.
    pub(crate) fn search_dirs(&self) -> &'static [&'static str] {
        match self {
            Language::Java => &["", "target", "build/libs"],
            _ => &[""],
        }
    }

    pub(crate) fn excluded_patterns(&self) -> &'static [&'static str] {
        match self {
            Language::Go => &["*_test.go"],
            _ => &[],
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|language| language.extensions().contains(&ext))
    }

    /// Protocol used when none was given on the command line.
    pub fn default_protocol(&self) -> Protocol {
        match self {
            Language::Java | Language::Node => Protocol::Http,
            Language::Python | Language::Command => Protocol::Stdio,
            Language::Go => Protocol::Grpc,
        }
    }

    pub fn invoker_image(&self, riff_version: &str) -> String {
        let invoker = match self {
            Language::Python => "python3",
            other => other.name(),
        };
        format!("projectriff/{invoker}-function-invoker:{riff_version}")
    }

    /// Java functions are shipped as jars, so there is nothing to stub.
    pub fn stub_file_name(&self, function_name: &str) -> Option<PathBuf> {
        match self {
            Language::Java => None,
            other => Some(PathBuf::from(format!(
                "{function_name}.{}",
                other.extensions()[0]
            ))),
        }
    }

    /// Generate the function artifacts, writing reports (or the dry-run
    /// output) to `out`.
    pub fn initialize<W: Write>(
        self,
        config: FunctionConfig,
        out: &mut W,
    ) -> Result<(), InitializerError> {
        info!("Initializing {} function {}", self.name(), config.name);
        let files = self.render(&config)?;

        if config.dry_run {
            print_files(&files, out)
        } else {
            write_files(&config.directory, &files, config.force, out)
        }
    }

    /// Render every artifact for `config` without touching the disk.
    pub fn render(self, config: &FunctionConfig) -> Result<Vec<GeneratedFile>, InitializerError> {
        let mut engine = TemplateEngine::new();
        engine.add_templates(TEMPLATES)?;

        let artifact = resolve_artifact(self, config)?;
        debug!("Using artifact {:?}", artifact);

        let context = FunctionContext {
            name: &config.name,
            image: config.image(),
            invoker: self.invoker_image(&config.riff_version),
            handler: config.handler.as_deref(),
            artifact: slash_path(artifact.path()),
            artifact_file: artifact
                .path()
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            protocol: config
                .protocol
                .unwrap_or_else(|| self.default_protocol())
                .as_str(),
            input: &config.input,
            output: config.output.as_deref(),
            has_requirements: config.directory.join("requirements.txt").is_file(),
        };

        let mut files = Vec::new();
        if let ArtifactChoice::Stub(path) = &artifact {
            files.push(GeneratedFile {
                path: path.clone(),
                contents: engine.render(&format!("{}/function", self.name()), &context)?,
                executable: self == Language::Command,
            });
        }
        files.push(GeneratedFile {
            path: PathBuf::from("Dockerfile"),
            contents: engine.render(&format!("{}/Dockerfile", self.name()), &context)?,
            executable: false,
        });
        files.push(GeneratedFile {
            path: PathBuf::from(format!("{}-function.yaml", config.name)),
            contents: engine.render("function.yaml", &context)?,
            executable: false,
        });
        files.push(GeneratedFile {
            path: PathBuf::from(format!("{}-topics.yaml", config.name)),
            contents: engine.render("topics.yaml", &context)?,
            executable: false,
        });

        Ok(files)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One rendered artifact, relative to the function directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
    pub executable: bool,
}

#[derive(Debug, Serialize)]
struct FunctionContext<'a> {
    name: &'a str,
    image: String,
    invoker: String,
    handler: Option<&'a str>,
    artifact: String,
    artifact_file: String,
    protocol: &'static str,
    input: &'a str,
    output: Option<&'a str>,
    has_requirements: bool,
}

fn print_files<W: Write>(files: &[GeneratedFile], out: &mut W) -> Result<(), InitializerError> {
    for file in files {
        writeln!(out, "---- {} ----", file.path.display()).map_err(InitializerError::Output)?;
        out.write_all(file.contents.as_bytes())
            .map_err(InitializerError::Output)?;
        if !file.contents.ends_with('\n') {
            writeln!(out).map_err(InitializerError::Output)?;
        }
        writeln!(out).map_err(InitializerError::Output)?;
    }
    Ok(())
}

/// Write all files, refusing up front if any exists and `force` is off.
fn write_files<W: Write>(
    directory: &Path,
    files: &[GeneratedFile],
    force: bool,
    out: &mut W,
) -> Result<(), InitializerError> {
    if !force {
        if let Some(existing) = files
            .iter()
            .map(|file| directory.join(&file.path))
            .find(|path| path.exists())
        {
            return Err(InitializerError::FileExists { path: existing });
        }
    }

    for file in files {
        let target = directory.join(&file.path);
        fs::write(&target, &file.contents).map_err(|source| InitializerError::Write {
            path: target.clone(),
            source,
        })?;
        if file.executable {
            make_executable(&target).map_err(|source| InitializerError::Write {
                path: target.clone(),
                source,
            })?;
        }
        info!("Wrote {}", target.display());
        writeln!(out, "Created {}", file.path.display()).map_err(InitializerError::Output)?;
    }
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Dockerfiles always use forward slashes.
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
