use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// A rejected `riff init` option. Reported without usage text.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("filepath {} does not exist", .path.display())]
    #[diagnostic(
        code(riff::validation::filepath),
        help("pass an existing directory with --filepath or as the positional argument")
    )]
    FilePathNotFound { path: PathBuf },

    #[error("could not derive a function name from {}", .path.display())]
    #[diagnostic(code(riff::validation::name), help("set the name explicitly with --name"))]
    MissingFunctionName { path: PathBuf },

    #[error("invalid function name '{name}'")]
    #[diagnostic(
        code(riff::validation::name),
        help(
            "function names start with a letter or digit and may only contain letters, digits, '.', '_' and '-'; pass --name when the directory name is not one"
        )
    )]
    InvalidFunctionName { name: String },

    #[error("artifact {} does not exist", .artifact.display())]
    #[diagnostic(
        code(riff::validation::artifact),
        help("relative artifact paths are resolved against the function filepath")
    )]
    ArtifactNotFound { artifact: PathBuf },

    #[error("artifact {} is not inside the function filepath {}", .artifact.display(), .directory.display())]
    #[diagnostic(code(riff::validation::artifact))]
    ArtifactOutsideFilePath {
        artifact: PathBuf,
        directory: PathBuf,
    },

    #[error("artifact {} is not a regular file", .artifact.display())]
    #[diagnostic(code(riff::validation::artifact))]
    ArtifactNotAFile { artifact: PathBuf },

    #[error("protocol '{protocol}' is unsupported")]
    #[diagnostic(code(riff::validation::protocol), help("supported protocols are: {supported}"))]
    UnsupportedProtocol { protocol: String, supported: String },

    #[error("could not determine the function language in {}", .directory.display())]
    #[diagnostic(
        code(riff::validation::language),
        help("{reason}; use one of `riff init java|command|node|python|go`")
    )]
    UnknownLanguage { directory: PathBuf, reason: String },

    #[error("java functions require a handler")]
    #[diagnostic(
        code(riff::validation::handler),
        help("use `riff init java --handler <fully.qualified.ClassName>`")
    )]
    MissingJavaHandler,
}
