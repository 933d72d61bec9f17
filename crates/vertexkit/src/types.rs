//! Core types for vertexkit.

use crate::error::{Error, Result};
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// The only response encoding requested from the model.
pub const JSON_MIME_TYPE: &str = "application/json";

// =============================================================================
// Endpoint
// =============================================================================

/// Project and location identifying a Vertex AI endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Google Cloud project ID.
    pub project_id: String,
    /// Region, e.g. `us-central1`, or `global`.
    pub location: String,
}

impl Endpoint {
    /// Create an endpoint.
    pub fn new(project_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
        }
    }

    /// Check that the location can form an API host name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientCreation`] unless the location is a
    /// non-empty run of lowercase letters, digits and `-`.
    pub fn validate(&self) -> Result<()> {
        let valid = !self.location.is_empty()
            && self
                .location
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if valid {
            Ok(())
        } else {
            Err(Error::client(format!(
                "invalid location {:?}: expected lowercase letters, digits and '-'",
                self.location
            )))
        }
    }

    /// API host for this location.
    #[must_use]
    pub fn host(&self) -> String {
        if self.location == "global" {
            "aiplatform.googleapis.com".to_string()
        } else {
            format!("{}-aiplatform.googleapis.com", self.location)
        }
    }

    /// Resource path of a model.
    ///
    /// Bare names resolve to Google publisher models. Names with a `/` are
    /// taken as paths, either fully qualified (`projects/...`) or relative
    /// to this endpoint (`publishers/meta/models/...`).
    #[must_use]
    pub fn model_path(&self, model: &str) -> String {
        let location = format!("projects/{}/locations/{}", self.project_id, self.location);
        if model.starts_with("projects/") {
            model.to_string()
        } else if model.contains('/') {
            format!("{location}/{model}")
        } else {
            format!("{location}/publishers/google/models/{model}")
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_id, self.location)
    }
}

// =============================================================================
// Generation request
// =============================================================================

/// One structured generation call.
///
/// Built fresh for every call and never mutated afterwards.
///
/// # Example
///
/// ```
/// use vertexkit::{Endpoint, GenerationRequest};
///
/// let request = GenerationRequest::new(
///     "Summarize the week's weather",
///     "gemini-1.5-pro-002",
///     Endpoint::new("my-project", "us-central1"),
/// );
/// assert_eq!(request.response_mime_type(), "application/json");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Prompt text.
    pub prompt: String,
    /// Model identifier.
    pub model_name: String,
    /// Target endpoint.
    pub endpoint: Endpoint,
    /// Required output shape.
    pub response_schema: Option<Schema>,
}

impl GenerationRequest {
    /// Create a request without an output schema.
    pub fn new(prompt: impl Into<String>, model_name: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            prompt: prompt.into(),
            model_name: model_name.into(),
            endpoint,
            response_schema: None,
        }
    }

    /// Constrain the output shape.
    #[must_use]
    pub fn with_response_schema(mut self, schema: Option<Schema>) -> Self {
        self.response_schema = schema;
        self
    }

    /// Output encoding requested from the model.
    #[must_use]
    pub fn response_mime_type(&self) -> &'static str {
        JSON_MIME_TYPE
    }

    /// Build the `generateContent` request body.
    #[must_use]
    pub fn to_wire(&self) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part::text(&self.prompt)],
            }],
            generation_config: GenerationConfig {
                response_mime_type: self.response_mime_type().to_string(),
                response_schema: self.response_schema.clone(),
            },
        }
    }
}

// =============================================================================
// Client options
// =============================================================================

/// Service account or user credentials, held as opaque bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    path: PathBuf,
    json: Vec<u8>,
}

impl Credentials {
    /// Wrap credentials read from `path`.
    pub fn new(path: impl Into<PathBuf>, json: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    /// File the credentials were read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw credential bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.json
    }

    /// Check the bytes form a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientCreation`] otherwise.
    pub fn validate(&self) -> Result<()> {
        match serde_json::from_slice::<serde_json::Value>(&self.json) {
            Ok(serde_json::Value::Object(_)) => Ok(()),
            Ok(_) => Err(Error::client(format!(
                "credentials file {} is not a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(Error::client(format!(
                "credentials file {} is not valid JSON: {e}",
                self.path.display()
            ))),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("path", &self.path)
            .field("json", &format_args!("<{} bytes>", self.json.len()))
            .finish()
    }
}

/// Options used to open a backend connection.
#[derive(Clone, Default)]
pub struct ClientOptions {
    /// Credentials handed to the connection.
    pub credentials: Option<Credentials>,
    /// Pre-minted OAuth access token.
    pub access_token: Option<String>,
    /// Override for the API base URL (private endpoints, testing).
    pub api_base: Option<String>,
}

impl ClientOptions {
    /// Options that use ambient credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use these credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Use a pre-minted access token.
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Send requests to a different API base.
    #[must_use]
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("credentials", &self.credentials)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("api_base", &self.api_base)
            .finish()
    }
}

// =============================================================================
// Call context
// =============================================================================

/// Deadline and cancellation for a single call.
///
/// Clones share the cancel flag, so one clone can cancel a call waiting on
/// another.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl CallContext {
    /// A context without deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the call once `deadline` passes.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Fail the call after `timeout` from now.
    ///
    /// A timeout too large to represent leaves the call without deadline.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now().checked_add(timeout))
    }

    /// Observe an externally owned cancel flag.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// The deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fail if the call was cancelled or its deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] or [`Error::DeadlineExceeded`].
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// `generateContent` request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns; a single user turn here.
    pub contents: Vec<Content>,
    /// Output configuration.
    pub generation_config: GenerationConfig,
}

/// Output configuration of a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Response encoding.
    pub response_mime_type: String,
    /// Required output shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Schema>,
}

/// A turn of content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// `user` or `model`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    /// Ordered content parts.
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A piece of content.
///
/// Text parts carry `text`; every other field (function calls, inline
/// data, ...) is kept verbatim in `other`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Text payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Fields of non-text parts.
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl Part {
    /// A text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            other: serde_json::Map::new(),
        }
    }

    /// Canonical string form of the part.
    ///
    /// The text for text parts, compact JSON for anything else.
    #[must_use]
    pub fn normalized(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => serde_json::Value::Object(self.other.clone()).to_string(),
        }
    }
}

/// `generateContent` response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidate responses, in order.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Feedback about the prompt, e.g. when it was blocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
    /// Version of the model that answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl GenerateContentResponse {
    /// A response with one candidate holding one text part.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: "model".to_string(),
                    parts: vec![Part::text(text)],
                }),
                finish_reason: Some("STOP".to_string()),
            }],
            ..Default::default()
        }
    }

    /// First part of the first candidate, if both exist.
    #[must_use]
    pub fn first_part(&self) -> Option<&Part> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
    }
}

/// A candidate response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content; absent when generation was blocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    /// Why generation stopped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Feedback about the prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Reason the prompt was blocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}
