//! Vertex AI REST backend.
//!
//! This module provides the [`VertexBackend`] implementation, which sends
//! `generateContent` calls to the regional Vertex AI endpoint over HTTPS.

use crate::auth;
use crate::backend::{Backend, Connection};
use crate::error::{Error, Result};
use crate::types::{
    CallContext, ClientOptions, Endpoint, GenerateContentRequest, GenerateContentResponse,
};
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("vertexkit-rs/", env!("CARGO_PKG_VERSION"));

/// Upper bound on a request when the caller sets no deadline.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Vertex AI backend.
///
/// # Example
///
/// ```no_run
/// use vertexkit::backend::Backend;
/// use vertexkit::backend::vertex::VertexBackend;
/// use vertexkit::{CallContext, ClientOptions, Endpoint, GenerationRequest};
///
/// let backend = VertexBackend::new();
/// let options = ClientOptions::new().access_token("ya29...");
/// let endpoint = Endpoint::new("my-project", "us-central1");
/// let conn = backend.connect(&endpoint, &options, None).unwrap();
///
/// let request = GenerationRequest::new("Hello", "gemini-1.5-pro-002", endpoint);
/// let ctx = CallContext::new();
/// let response = conn
///     .generate_content(&ctx, &request.model_name, &request.to_wire())
///     .unwrap();
/// println!("{} candidates", response.candidates.len());
/// ```
#[derive(Debug, Default)]
pub struct VertexBackend;

impl VertexBackend {
    /// Create a new Vertex AI backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn api_base(endpoint: &Endpoint, options: &ClientOptions) -> String {
        options
            .api_base
            .as_deref()
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("https://{}", endpoint.host()))
    }
}

impl Backend for VertexBackend {
    fn connect(
        &self,
        endpoint: &Endpoint,
        options: &ClientOptions,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn Connection>> {
        endpoint.validate()?;
        let token = auth::resolve_token(options)?;

        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout.unwrap_or(DEFAULT_CALL_TIMEOUT)))
            .build();
        let agent: ureq::Agent = config.into();

        let api_base = Self::api_base(endpoint, options);
        log::debug!("Opened Vertex AI connection to {api_base} ({endpoint})");

        Ok(Box::new(VertexConnection {
            agent,
            api_base,
            endpoint: endpoint.clone(),
            token,
        }))
    }
}

struct VertexConnection {
    agent: ureq::Agent,
    api_base: String,
    endpoint: Endpoint,
    token: String,
}

impl VertexConnection {
    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/v1/{}:generateContent",
            self.api_base,
            self.endpoint.model_path(model)
        )
    }
}

impl Connection for VertexConnection {
    fn generate_content(
        &self,
        ctx: &CallContext,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        ctx.check()?;
        let url = self.generate_url(model);
        log::debug!("POST {url}");

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("User-Agent", USER_AGENT)
            .send_json(request)?;

        ctx.check()?;
        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(Error::generation(api_error_message(status, &body), Some(status)));
        }

        let parsed: GenerateContentResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| Error::generation(format!("invalid API response: {e}"), Some(status)))?;

        log::trace!(
            "Received {} candidate(s) from {}",
            parsed.candidates.len(),
            model
        );
        Ok(parsed)
    }
}

impl Drop for VertexConnection {
    fn drop(&mut self) {
        log::trace!("Closed Vertex AI connection to {}", self.api_base);
    }
}

// =============================================================================
// API error body
// =============================================================================

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Best-effort message from an error response body.
fn api_error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.status.is_empty() => {
            format!("HTTP {status} {}: {}", parsed.error.status, parsed.error.message)
        }
        Ok(parsed) => format!("HTTP {status}: {}", parsed.error.message),
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}
