//! Configuration file (`modelgarden.toml`)
//!
//! ```toml
//! [provider]
//! credentials = "~/keys/sa.json"
//!
//! [model_garden.weather]
//! prompt = "Sunday is expected to be sunny..."
//! project_id = "my-project"
//! location = "us-central1"
//! model_name = "gemini-1.5-pro-002"
//! response_schema = '{"type": "object"}'
//! ```
//!
//! `response_schema` may also be written as an inline TOML table; it is
//! encoded to JSON text before planning.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Attribute holding the schema, which accepts a table as well as text
const SCHEMA_ATTRIBUTE: &str = "response_schema";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    /// `model_garden` entities by name, attributes as written
    #[serde(default)]
    pub model_garden: BTreeMap<String, toml::Table>,
}

/// Provider settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Service account JSON file
    pub credentials: Option<String>,

    /// Pre-minted OAuth access token
    pub access_token: Option<String>,

    /// Deadline for each model call, in seconds
    pub timeout_secs: Option<u64>,

    /// Override the API base URL (e.g. a local proxy)
    pub api_base: Option<String>,
}

impl Config {
    /// Load the config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!(
            "Loaded {} model_garden entities from {}",
            config.model_garden.len(),
            path.display()
        );
        Ok(config)
    }

    /// Load the config file, or an empty config if it doesn't exist
    pub fn load_optional(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file {} does not exist", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Entity configurations as attribute maps, ready for planning
    pub fn entities(&self) -> Result<BTreeMap<String, Value>> {
        self.model_garden
            .iter()
            .map(|(name, table)| {
                let value = entity_value(table)
                    .with_context(|| format!("Invalid configuration for model_garden.{name}"))?;
                Ok((name.clone(), value))
            })
            .collect()
    }
}

fn entity_value(table: &toml::Table) -> Result<Value> {
    let mut object = serde_json::Map::new();
    for (key, value) in table {
        let value = match value {
            toml::Value::Table(schema) if key == SCHEMA_ATTRIBUTE => {
                Value::String(serde_json::to_string(schema)?)
            }
            other => serde_json::to_value(other)?,
        };
        object.insert(key.clone(), value);
    }
    Ok(Value::Object(object))
}
