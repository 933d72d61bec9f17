//! Provider configuration
//!
//! Turns the `[provider]` section into the options every model call uses.
//! The credentials file is read here and handed to the client as opaque
//! bytes.

use crate::config::ProviderConfig;
use crate::paths;
use declarative::{Diagnostic, Diagnostics};
use std::fs;
use std::time::{Duration, Instant};
use vertexkit::{ClientOptions, Credentials};

/// A configured provider
#[derive(Debug, Clone, Default)]
pub struct Provider {
    pub options: ClientOptions,
    /// Deadline for each model call
    pub timeout: Option<Duration>,
}

/// Configure the provider
///
/// Without `credentials` the client falls back to ambient credentials.
pub fn configure(config: &ProviderConfig) -> Result<Provider, Diagnostics> {
    let mut options = ClientOptions::new();

    if let Some(credentials) = &config.credentials {
        let path = paths::expand(credentials);
        let json = fs::read(&path).map_err(|e| {
            Diagnostic::error(
                "Unable to read credentials file",
                format!(
                    "Unable to read service account credentials file {}: {e}",
                    path.display()
                ),
            )
            .for_attribute("credentials")
        })?;
        log::debug!("Using credentials from {}", path.display());
        options = options.credentials(Credentials::new(path, json));
    }

    if let Some(token) = &config.access_token {
        options = options.access_token(token.as_str());
    }

    if let Some(api_base) = &config.api_base {
        options = options.api_base(api_base.as_str());
    }

    let timeout = config.timeout_secs.map(Duration::from_secs);
    if let Some(t) = timeout
        && Instant::now().checked_add(t).is_none()
    {
        return Err(Diagnostic::error(
            "Invalid timeout",
            format!("timeout_secs = {} is too large to form a deadline", t.as_secs()),
        )
        .for_attribute("timeout_secs")
        .into());
    }

    Ok(Provider { options, timeout })
}
