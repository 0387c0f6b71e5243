//! Models file loading and placeholder resolution
//!
//! The models file is YAML:
//!
//! ```yaml
//! prompt: "Explain quantum computing in 2-3 sentences."
//! defaults:
//!   base_url: ${API_BASE}
//!   api_key: ${API_KEY}
//! models:
//!   - name: GPT-4o mini
//!     model: gpt-4o-mini
//!     base_url: ${OPENAI_BASE_URL}
//!     api_key: ${OPENAI_API_KEY}
//! ```
//!
//! `base_url` and `api_key` stay unresolved in [`ModelDescriptor`]. They are
//! resolved against an [`Environment`] snapshot when the model's turn comes,
//! so an unset variable fails that model only.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default location of the models file
pub const DEFAULT_CONFIG_PATH: &str = "config/models.yaml";

/// Prompt used when neither the CLI nor the models file provides one
pub const DEFAULT_PROMPT: &str = "Explain quantum computing in 2-3 sentences.";

/// System message sent ahead of the user prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Snapshot of environment variables used for `${VAR}` resolution
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Capture the current process environment
    ///
    /// Variables whose name or value is not valid UTF-8 are left out.
    pub fn from_process() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Build an environment from raw OS pairs, skipping non-UTF-8 entries
    pub fn from_os_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        vars.into_iter()
            .filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
                (Ok(name), Ok(value)) => Some((name, value)),
                (Ok(name), Err(_)) => {
                    tracing::debug!("Ignoring {}: value is not valid UTF-8", name);
                    None
                }
                (Err(name), _) => {
                    tracing::debug!(
                        "Ignoring {}: name is not valid UTF-8",
                        name.to_string_lossy()
                    );
                    None
                }
            })
            .collect()
    }

    /// Build an environment from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect()
    }

    /// Look up a variable
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(|s| s.as_str())
    }

    /// Resolve a `${NAME}` placeholder
    ///
    /// Only a value that starts with `${` and ends with `}` is treated as a
    /// placeholder. Anything else is returned unchanged.
    pub fn resolve(&self, value: &str) -> Result<String, ConfigError> {
        let Some(name) = value
            .strip_prefix("${")
            .and_then(|rest| rest.strip_suffix('}'))
        else {
            return Ok(value.to_string());
        };

        match self.get(name) {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(ConfigError::UnsetVariable(name.to_string())),
        }
    }
}

impl FromIterator<(String, String)> for Environment {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

/// One model to benchmark, as written in the models file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Display label
    pub name: String,
    /// Identifier sent to the endpoint
    pub model_id: String,
    /// Endpoint base URL, possibly a `${VAR}` placeholder
    pub base_url: String,
    /// Credential, possibly a `${VAR}` placeholder
    pub api_key: String,
}

impl ModelDescriptor {
    /// Create a descriptor from already-known values
    pub fn new(
        name: impl Into<String>,
        model_id: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model_id: model_id.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Resolve the endpoint settings against an environment
    pub fn resolve(&self, env: &Environment) -> Result<Endpoint, ConfigError> {
        Ok(Endpoint {
            model_id: self.model_id.clone(),
            base_url: env.resolve(&self.base_url)?,
            api_key: env.resolve(&self.api_key)?,
        })
    }
}

/// Fully resolved connection settings for one model
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Identifier sent to the endpoint
    pub model_id: String,
    /// Base URL with placeholders resolved
    pub base_url: String,
    /// Credential with placeholders resolved; empty means no auth header
    pub api_key: String,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("model_id", &self.model_id)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Endpoint settings inherited by models that omit them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointDefaults {
    /// Fallback base URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Fallback credential
    #[serde(default)]
    pub api_key: Option<String>,
}

/// A model entry in the models file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Display label
    pub name: String,
    /// Model identifier
    #[serde(alias = "model_id")]
    pub model: String,
    /// Endpoint base URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Credential
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Contents of the models file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Prompt sent to every model
    #[serde(default)]
    pub prompt: Option<String>,

    /// System message; an explicit `null` disables it
    #[serde(default = "default_system_prompt")]
    pub system_prompt: Option<String>,

    /// Shared endpoint settings
    #[serde(default)]
    pub defaults: EndpointDefaults,

    /// Models to benchmark, in run order
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

fn default_system_prompt() -> Option<String> {
    Some(DEFAULT_SYSTEM_PROMPT.to_string())
}

impl BenchConfig {
    /// Parse a models file from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Build descriptors, filling gaps from `defaults`
    pub fn descriptors(&self) -> Result<Vec<ModelDescriptor>, ConfigError> {
        if self.models.is_empty() {
            return Err(ConfigError::NoModels);
        }

        self.models
            .iter()
            .map(|entry| {
                let base_url = entry
                    .base_url
                    .clone()
                    .or_else(|| self.defaults.base_url.clone())
                    .ok_or_else(|| ConfigError::MissingField {
                        model: entry.name.clone(),
                        field: "base_url",
                    })?;
                let api_key = entry
                    .api_key
                    .clone()
                    .or_else(|| self.defaults.api_key.clone())
                    .ok_or_else(|| ConfigError::MissingField {
                        model: entry.name.clone(),
                        field: "api_key",
                    })?;

                Ok(ModelDescriptor {
                    name: entry.name.clone(),
                    model_id: entry.model.clone(),
                    base_url,
                    api_key,
                })
            })
            .collect()
    }
}

/// Loads the models file and resolves placeholders against an environment
#[derive(Debug, Clone)]
pub struct ConfigProvider {
    path: PathBuf,
    env: Environment,
}

impl ConfigProvider {
    /// Create a provider for the given file and environment snapshot
    pub fn new(path: impl Into<PathBuf>, env: Environment) -> Self {
        Self {
            path: path.into(),
            env,
        }
    }

    /// Path of the models file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Environment used for resolution
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Read and parse the whole models file
    pub fn load(&self) -> Result<BenchConfig, ConfigError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(self.path.clone())
            } else {
                ConfigError::Read {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let config = BenchConfig::from_yaml_str(&content)?;
        tracing::debug!(
            "Loaded {} model entries from {}",
            config.models.len(),
            self.path.display()
        );
        Ok(config)
    }

    /// Load the model descriptors
    pub fn load_models(&self) -> Result<Vec<ModelDescriptor>, ConfigError> {
        self.load()?.descriptors()
    }

    /// Resolve a single value
    pub fn resolve(&self, value: &str) -> Result<String, ConfigError> {
        self.env.resolve(value)
    }
}
