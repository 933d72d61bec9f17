//! Path resolution for modelgarden
//!
//! # Environment Variables
//!
//! - `MODELGARDEN_CONFIG` - Override the config file (default `./modelgarden.toml`)
//! - `MODELGARDEN_STATE_DIR` - Override the state directory
//!
//! # State Directory Priority
//!
//! 1. `MODELGARDEN_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/modelgarden` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\modelgarden`
//!    - macOS/Linux: `~/.local/state/modelgarden`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config file override
pub const ENV_CONFIG: &str = "MODELGARDEN_CONFIG";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "MODELGARDEN_STATE_DIR";

const APP_DIR: &str = "modelgarden";

/// Config file used when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "modelgarden.toml";

/// State file name inside the state directory
pub const STATE_FILE: &str = "state.toml";

/// Get the modelgarden state directory path
pub fn state_dir() -> Result<PathBuf> {
    state_dir_from(|key| std::env::var(key).ok())
}

fn state_dir_from(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(dir) = env(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Some(xdg_state) = env("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            let path = local_app_data.join(APP_DIR);
            log::debug!("Using Windows state dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP_DIR);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Get the default state file path
pub fn state_file() -> Result<PathBuf> {
    Ok(state_dir()?.join(STATE_FILE))
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
