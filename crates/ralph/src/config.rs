use std::fs;
use std::path::Path;

use serde::Deserialize;
use strum_macros::Display;

use crate::errors::ConfigError;
use crate::providers::configs::{GoogleProviderConfig, OllamaProviderConfig, ProviderConfig};
use crate::providers::google::{GOOGLE_HOST, GOOGLE_MODEL};
use crate::providers::ollama::{OLLAMA_HOST, OLLAMA_MODEL};

const GOOGLE_API_KEY_FILE: &str = "google_api_key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProviderKind {
    Google,
    Ollama,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub provider: ProviderKind,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub level: Option<String>,
}

/// Run configuration: a YAML file for the non-secret settings plus a
/// secrets directory holding one file per credential.
#[derive(Debug, Clone, Deserialize)]
pub struct RalphConfig {
    pub provider: ProviderSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(skip)]
    google_api_key: Option<String>,
}

impl RalphConfig {
    pub fn from_yaml_and_secrets(config_path: &Path, secrets_dir: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(config_path).map_err(|source| ConfigError::Io {
            path: config_path.to_path_buf(),
            source,
        })?;
        let mut config: RalphConfig = serde_yaml::from_str(&raw)?;
        config.google_api_key = read_secret(secrets_dir, GOOGLE_API_KEY_FILE)?;
        Ok(config)
    }

    /// Resolve the provider configuration, failing fast on a missing
    /// required credential so the loop never starts without a usable
    /// collaborator.
    pub fn provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        let settings = &self.provider;
        match settings.provider {
            ProviderKind::Google => {
                let api_key = self.google_api_key.clone().ok_or_else(|| {
                    ConfigError::MissingCredential(GOOGLE_API_KEY_FILE.to_string())
                })?;
                Ok(ProviderConfig::Google(GoogleProviderConfig {
                    host: settings
                        .host
                        .clone()
                        .unwrap_or_else(|| GOOGLE_HOST.to_string()),
                    model: settings
                        .model
                        .clone()
                        .unwrap_or_else(|| GOOGLE_MODEL.to_string()),
                    api_key,
                    temperature: settings.temperature,
                }))
            }
            ProviderKind::Ollama => Ok(ProviderConfig::Ollama(OllamaProviderConfig {
                host: settings
                    .host
                    .clone()
                    .unwrap_or_else(|| OLLAMA_HOST.to_string()),
                model: settings
                    .model
                    .clone()
                    .unwrap_or_else(|| OLLAMA_MODEL.to_string()),
                temperature: settings.temperature,
                max_tokens: settings.max_tokens,
            })),
        }
    }
}

fn read_secret(dir: &Path, name: &str) -> Result<Option<String>, ConfigError> {
    let path = dir.join(name);
    if !path.exists() {
        return Ok(None);
    }
    let value = fs::read_to_string(&path).map_err(|source| ConfigError::Io { path, source })?;
    Ok(Some(value.trim().to_string()))
}
