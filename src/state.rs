use crate::resource::model_garden::{ModelGarden, TYPE_NAME};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::{Outcome, StateChange};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ============================================================================
// State Structures
// ============================================================================

/// Entities known to exist, as of the last apply
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StateFile {
    /// Incremented on every save
    #[serde(default)]
    pub serial: u64,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    /// `model_garden` entities by name
    #[serde(default)]
    pub model_garden: BTreeMap<String, ModelGarden>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            serial: 0,
            last_updated: Utc::now(),
            model_garden: BTreeMap::new(),
        }
    }
}

// ============================================================================
// StateFile Implementation
// ============================================================================

impl StateFile {
    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!(
            "Loaded state serial {} from {}",
            state.serial,
            path.display()
        );
        Ok(state)
    }

    /// Save state to disk
    ///
    /// Bumps the serial and timestamp, then replaces the file in one rename.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        self.serial += 1;
        self.last_updated = Utc::now();
        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, &content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state serial {} to {}", self.serial, path.display());
        Ok(())
    }

    /// Entity states as attribute maps, ready for planning
    pub fn entities(&self) -> Result<BTreeMap<String, Value>> {
        self.model_garden
            .iter()
            .map(|(name, entity)| {
                let value = serde_json::to_value(entity)
                    .with_context(|| format!("Failed to encode state of {TYPE_NAME}.{name}"))?;
                Ok((name.clone(), value))
            })
            .collect()
    }

    /// Store one entity from its attribute map
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let entity: ModelGarden = serde_json::from_value(value)
            .with_context(|| format!("Failed to decode state of {TYPE_NAME}.{name}"))?;
        self.model_garden.insert(name.to_string(), entity);
        Ok(())
    }

    /// Record what the executor did
    ///
    /// Returns the number of entries that changed.
    pub fn commit(&mut self, outcomes: &[Outcome]) -> Result<usize> {
        let mut changed = 0;
        for outcome in outcomes {
            if outcome.address.resource_type != TYPE_NAME {
                log::warn!("Ignoring outcome for unknown type {}", outcome.address);
                continue;
            }

            let name = outcome.address.name.as_str();
            match &outcome.state {
                StateChange::Set(value) => {
                    self.set(name, value.clone())?;
                    changed += 1;
                }
                StateChange::Remove => {
                    if self.model_garden.remove(name).is_some() {
                        changed += 1;
                    }
                }
                StateChange::Keep => {}
            }
        }
        Ok(changed)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Action, Address, ApplyResult, Diagnostic};
    use serde_json::json;

    fn entity(prompt: &str) -> ModelGarden {
        ModelGarden {
            prompt: prompt.to_string(),
            project_id: "my-project".to_string(),
            location: "us-central1".to_string(),
            model_name: "gemini-1.5-pro-002".to_string(),
            response_schema: r#"{"type":"object"}"#.to_string(),
            response: Some(r#"{"forecast":[]}"#.to_string()),
        }
    }

    fn outcome(name: &str, state: StateChange) -> Outcome {
        Outcome {
            address: Address::new(TYPE_NAME, name),
            action: Action::Create,
            result: ApplyResult::Created,
            state,
        }
    }

    #[test]
    fn test_default_state() {
        let state = StateFile::default();
        assert_eq!(state.serial, 0);
        assert!(state.model_garden.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::load(&dir.path().join("state.toml")).unwrap();
        assert_eq!(state.serial, 0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.toml");

        let mut state = StateFile::default();
        state.model_garden.insert("weather".to_string(), entity("X"));
        state.save(&path).unwrap();
        state.save(&path).unwrap();

        let loaded = StateFile::load(&path).unwrap();
        assert_eq!(loaded.serial, 2);
        assert_eq!(loaded, state);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_pending_response_not_written() {
        let mut state = StateFile::default();
        state.model_garden.insert(
            "weather".to_string(),
            ModelGarden {
                response: None,
                ..entity("X")
            },
        );

        let content = toml::to_string_pretty(&state).unwrap();
        assert!(!content.contains("response ="));
        let parsed: StateFile = toml::from_str(&content).unwrap();
        assert!(parsed.model_garden["weather"].response.is_none());
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");
        fs::write(&path, "serial = [").unwrap();

        let err = StateFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse state file"));
    }

    #[test]
    fn test_entities_as_values() {
        let mut state = StateFile::default();
        state.model_garden.insert("weather".to_string(), entity("X"));

        let entities = state.entities().unwrap();
        assert_eq!(entities["weather"]["prompt"], "X");
        assert_eq!(entities["weather"]["response"], r#"{"forecast":[]}"#);
    }

    #[test]
    fn test_commit_outcomes() {
        let mut state = StateFile::default();
        state.model_garden.insert("kept".to_string(), entity("old"));
        state.model_garden.insert("gone".to_string(), entity("old"));

        let value = serde_json::to_value(entity("new")).unwrap();
        let failed = Outcome {
            result: ApplyResult::Failed {
                diagnostics: Diagnostic::error("Error generating content", "boom").into(),
            },
            ..outcome("kept", StateChange::Keep)
        };
        let outcomes = vec![
            outcome("fresh", StateChange::Set(value)),
            outcome("gone", StateChange::Remove),
            failed,
        ];

        let changed = state.commit(&outcomes).unwrap();
        assert_eq!(changed, 2);
        assert_eq!(state.model_garden["fresh"].prompt, "new");
        assert_eq!(state.model_garden["kept"].prompt, "old");
        assert!(!state.model_garden.contains_key("gone"));
    }

    #[test]
    fn test_commit_rejects_malformed_value() {
        let mut state = StateFile::default();
        let outcomes = vec![outcome("bad", StateChange::Set(json!({"prompt": 1})))];

        assert!(state.commit(&outcomes).is_err());
        assert!(state.model_garden.is_empty());
    }
}
