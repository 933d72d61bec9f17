//! Access token resolution.
//!
//! Tokens come from, in order:
//!
//! 1. [`ClientOptions::access_token`]
//! 2. the `GOOGLE_OAUTH_ACCESS_TOKEN` environment variable
//! 3. `gcloud auth application-default print-access-token`, with
//!    `GOOGLE_APPLICATION_CREDENTIALS` pointed at the configured credentials
//!
//! Credentials are never parsed beyond checking they are a JSON object.

use crate::error::{Error, Result};
use crate::types::{ClientOptions, Credentials};
use std::process::Command;

/// Environment variable holding a pre-minted access token.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Resolve the bearer token for a connection.
///
/// # Errors
///
/// Returns [`Error::ClientCreation`] if the credentials are malformed or no
/// token can be obtained.
pub fn resolve_token(options: &ClientOptions) -> Result<String> {
    if let Some(credentials) = &options.credentials {
        credentials.validate()?;
    }

    if let Some(token) = non_empty(options.access_token.as_deref()) {
        log::debug!("Using access token from client options");
        return Ok(token);
    }

    if let Some(token) = non_empty(std::env::var(ACCESS_TOKEN_ENV).ok().as_deref()) {
        log::debug!("Using access token from {ACCESS_TOKEN_ENV}");
        return Ok(token);
    }

    gcloud_token(options.credentials.as_ref())
}

fn non_empty(token: Option<&str>) -> Option<String> {
    token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Mint a token with the gcloud CLI.
fn gcloud_token(credentials: Option<&Credentials>) -> Result<String> {
    let gcloud = which::which("gcloud").map_err(|_| {
        Error::client(format!(
            "no access token configured, {ACCESS_TOKEN_ENV} is unset and gcloud was not found in PATH"
        ))
    })?;

    let mut cmd = Command::new(&gcloud);
    cmd.args(["auth", "application-default", "print-access-token"]);
    if let Some(credentials) = credentials {
        cmd.env("GOOGLE_APPLICATION_CREDENTIALS", credentials.path());
    }

    log::debug!("Minting access token with {}", gcloud.display());
    let output = cmd
        .output()
        .map_err(|e| Error::client(format!("failed to run gcloud: {e}")))?;

    if !output.status.success() {
        return Err(Error::client(format!(
            "gcloud could not mint an access token: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    non_empty(Some(&String::from_utf8_lossy(&output.stdout)))
        .ok_or_else(|| Error::client("gcloud returned an empty access token"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_token_wins() {
        let options = ClientOptions::new().access_token("  ya29.token\n");
        assert_eq!(resolve_token(&options).unwrap(), "ya29.token");
    }

    #[test]
    fn test_malformed_credentials_fail_before_token() {
        let options = ClientOptions::new()
            .access_token("ya29.token")
            .credentials(Credentials::new("/tmp/sa.json", b"{oops".to_vec()));
        assert!(matches!(
            resolve_token(&options),
            Err(Error::ClientCreation(_))
        ));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(Some(" t ")), Some("t".to_string()));
    }
}
