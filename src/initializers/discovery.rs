//! Finding existing function sources on disk

use globwalk::{FileType, GlobWalkerBuilder};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::Language;
use super::error::InitializerError;
use crate::options::FunctionConfig;
use crate::validation::ValidationError;

/// What the Dockerfile should package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactChoice {
    /// A file that is already present, relative to the function directory.
    Existing(PathBuf),
    /// No source was found; a stub with this relative path will be generated.
    Stub(PathBuf),
}

impl ArtifactChoice {
    pub fn path(&self) -> &Path {
        match self {
            ArtifactChoice::Existing(path) | ArtifactChoice::Stub(path) => path,
        }
    }
}

/// Files with one of `language`'s extensions, relative to `directory` and sorted.
pub fn find_candidates(
    language: Language,
    directory: &Path,
) -> Result<Vec<PathBuf>, InitializerError> {
    let mut patterns: Vec<String> = language
        .extensions()
        .iter()
        .map(|ext| format!("*.{ext}"))
        .collect();
    patterns.extend(language.excluded_patterns().iter().map(|p| format!("!{p}")));

    let mut results = Vec::new();
    for search_dir in language.search_dirs() {
        let base = directory.join(search_dir);
        if !base.is_dir() {
            continue;
        }

        let walker = GlobWalkerBuilder::from_patterns(&base, patterns.as_slice())
            .max_depth(1)
            .follow_links(true)
            .file_type(FileType::FILE)
            .build()
            .map_err(|source| InitializerError::Search {
                directory: base.clone(),
                source,
            })?;

        for entry in walker.into_iter().filter_map(Result::ok) {
            if let Ok(rel) = entry.path().strip_prefix(directory) {
                results.push(rel.to_path_buf());
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Pick the artifact for `language`: the explicit one, a single discovered
/// candidate, `<name>.<ext>` among several, or a stub when nothing is found.
pub fn resolve_artifact(
    language: Language,
    config: &FunctionConfig,
) -> Result<ArtifactChoice, InitializerError> {
    if let Some(artifact) = &config.artifact {
        return Ok(ArtifactChoice::Existing(artifact.clone()));
    }

    let candidates = find_candidates(language, &config.directory)?;
    debug!("{} artifact candidates: {candidates:?}", language.name());

    match candidates.as_slice() {
        [] => match language.stub_file_name(&config.name) {
            Some(stub) => Ok(ArtifactChoice::Stub(stub)),
            None => Err(InitializerError::MissingJar {
                directory: config.directory.clone(),
            }),
        },
        [only] => Ok(ArtifactChoice::Existing(only.clone())),
        several => {
            let preferred = language
                .extensions()
                .iter()
                .map(|ext| PathBuf::from(format!("{}.{ext}", config.name)))
                .find(|name| several.contains(name));
            match preferred {
                Some(path) => Ok(ArtifactChoice::Existing(path)),
                None => Err(InitializerError::AmbiguousArtifact {
                    candidates: several
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect(),
                }),
            }
        }
    }
}

/// Work out the language of a function from its artifact or directory contents.
pub fn detect_language(config: &FunctionConfig) -> Result<Language, ValidationError> {
    if let Some(artifact) = &config.artifact {
        let ext = artifact
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        return Language::from_extension(ext).ok_or_else(|| ValidationError::UnknownLanguage {
            directory: config.directory.clone(),
            reason: format!("artifact {} has no known extension", artifact.display()),
        });
    }

    let mut found = Vec::new();
    for language in Language::ALL {
        // A failing search is treated like an empty one; the initializer repeats it and reports
        let candidates = find_candidates(language, &config.directory).unwrap_or_default();
        if !candidates.is_empty() {
            found.push(language);
        }
    }

    match found.as_slice() {
        [language] => Ok(*language),
        [] => Err(ValidationError::UnknownLanguage {
            directory: config.directory.clone(),
            reason: "no function source files were found".to_string(),
        }),
        several => Err(ValidationError::UnknownLanguage {
            directory: config.directory.clone(),
            reason: format!(
                "sources for several languages were found ({})",
                several
                    .iter()
                    .map(|l| l.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }),
    }
}
