//! Layered lookup for settings that can come from several places
//!
//! Sources are queried in order and the first one holding the key wins:
//! command-line flag, `RIFF_*` environment variable, the YAML config file,
//! then compiled defaults. Everything is captured up front so resolution
//! never reads process-wide state.

use anyhow::{Context, Result, bail};
use serde_yaml::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::options::FALLBACK_USER_ACCOUNT;

pub const ENV_PREFIX: &str = "RIFF_";
pub const CONFIG_FILE_NAME: &str = ".riff.yaml";

pub const USER_ACCOUNT: &str = "useraccount";
pub const NAMESPACE: &str = "namespace";

/// One named layer of settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingSource {
    pub name: String,
    values: HashMap<String, String>,
}

impl SettingSource {
    pub fn new(name: impl Into<String>, values: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// `RIFF_USERACCOUNT=x` becomes `useraccount = x`.
    pub fn environment<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let values = vars
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PREFIX)
                    .map(|name| (name.to_lowercase(), value))
            })
            .collect();
        Self::new("environment", values)
    }

    /// Parse a flat YAML mapping; only scalar values are kept.
    pub fn config_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let document: Value = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let mut values = HashMap::new();
        match document {
            Value::Null => {}
            Value::Mapping(mapping) => {
                for (key, value) in mapping {
                    let Some(key) = key.as_str() else {
                        continue;
                    };
                    match scalar_to_string(&value) {
                        Some(value) => {
                            values.insert(key.to_lowercase(), value);
                        }
                        None => debug!("Ignoring non-scalar config key {key}"),
                    }
                }
            }
            _ => bail!(
                "Config file {} must contain a mapping of setting names to values",
                path.display()
            ),
        }

        Ok(Self::new(format!("config file {}", path.display()), values))
    }

    /// Compiled defaults. The user account defaults to the current OS user.
    pub fn defaults(env: &HashMap<String, String>) -> Self {
        let user_account = env
            .get("USER")
            .or_else(|| env.get("USERNAME"))
            .filter(|user| !user.is_empty())
            .cloned()
            .unwrap_or_else(|| FALLBACK_USER_ACCOUNT.to_string());

        let values = HashMap::from([(USER_ACCOUNT.to_string(), user_account)]);
        Self::new("default", values)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// A resolved value and the name of the source it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'a> {
    pub value: &'a str,
    pub source: &'a str,
}

/// Ordered settings sources, highest precedence first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    sources: Vec<SettingSource>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source below every source already present.
    pub fn with_source(mut self, source: SettingSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Build the process settings from an environment snapshot.
    ///
    /// `config_path` is the `--config` value; when absent `$HOME/.riff.yaml`
    /// is used if it exists.
    pub fn from_env(env: HashMap<String, String>, config_path: Option<&Path>) -> Result<Self> {
        let mut settings = Self::new().with_source(SettingSource::environment(env.clone()));

        match config_path {
            Some(path) => {
                if !path.is_file() {
                    bail!("Config file {} does not exist", path.display());
                }
                settings = settings.with_source(SettingSource::config_file(path)?);
            }
            None => {
                if let Some(path) = default_config_path(&env).filter(|path| path.is_file()) {
                    settings = settings.with_source(SettingSource::config_file(&path)?);
                }
            }
        }

        Ok(settings.with_source(SettingSource::defaults(&env)))
    }

    /// Copy of these settings with an explicit flag value on top.
    pub fn with_flag(&self, key: &str, value: Option<&str>) -> Self {
        let mut sources = Vec::with_capacity(self.sources.len() + 1);
        if let Some(value) = value {
            sources.push(SettingSource::new(
                "flag",
                HashMap::from([(key.to_string(), value.to_string())]),
            ));
        }
        sources.extend(self.sources.iter().cloned());
        Self { sources }
    }

    pub fn resolve(&self, key: &str) -> Option<Resolved<'_>> {
        let resolved = self.sources.iter().find_map(|source| {
            source.get(key).map(|value| Resolved {
                value,
                source: &source.name,
            })
        });
        if let Some(resolved) = resolved {
            debug!("Resolved {key} = {:?} from {}", resolved.value, resolved.source);
        }
        resolved
    }

    /// Resolved value, or an empty string when no source has the key.
    pub fn get(&self, key: &str) -> String {
        self.resolve(key)
            .map(|resolved| resolved.value.to_string())
            .unwrap_or_default()
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.name.as_str()).collect()
    }
}

fn default_config_path(env: &HashMap<String, String>) -> Option<PathBuf> {
    env.get("HOME")
        .or_else(|| env.get("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .map(|home| Path::new(home).join(CONFIG_FILE_NAME))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
