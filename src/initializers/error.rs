use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::templating::TemplateError;

#[derive(Error, Debug, Diagnostic)]
pub enum InitializerError {
    #[error("no jar file found for java function in {}", .directory.display())]
    #[diagnostic(
        code(riff::init::artifact),
        help("build the function jar first, or point at it with --artifact")
    )]
    MissingJar { directory: PathBuf },

    #[error("found several candidate artifacts: {}", .candidates.join(", "))]
    #[diagnostic(code(riff::init::artifact), help("pick one with --artifact"))]
    AmbiguousArtifact { candidates: Vec<String> },

    #[error("{} already exists", .path.display())]
    #[diagnostic(
        code(riff::init::exists),
        help("use --force to overwrite existing function artifacts")
    )]
    FileExists { path: PathBuf },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error("failed to search {} for function artifacts", .directory.display())]
    Search {
        directory: PathBuf,
        #[source]
        source: globwalk::GlobError,
    },

    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to print generated artifacts")]
    Output(#[source] io::Error),
}
