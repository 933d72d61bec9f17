//! # vertexkit
//!
//! Pure Rust library for structured generation with Vertex AI models.
//!
//! This crate provides functionality for:
//! - Translating loosely-typed response schemas into the API's typed schema
//! - Issuing a single `generateContent` call constrained to JSON output
//! - Normalizing the response into one text payload
//!
//! ## Example
//!
//! ```no_run
//! use vertexkit::schema::{StructuralSchema, translate};
//! use vertexkit::{CallContext, Client, ClientOptions, Endpoint, GenerationRequest};
//!
//! let raw = StructuralSchema::parse(r#"{"type": "object", "properties": {"day": {"type": "string"}}}"#)
//!     .expect("schema should parse");
//!
//! let request = GenerationRequest::new(
//!     "Sunday will be sunny.",
//!     "gemini-1.5-pro-002",
//!     Endpoint::new("my-project", "us-central1"),
//! )
//! .with_response_schema(translate(Some(&raw)));
//!
//! let client = Client::new();
//! let text = client
//!     .generate(&CallContext::new(), &request, &ClientOptions::new())
//!     .expect("generation failed");
//! println!("{text}");
//! ```
//!
//! ## Extraction rule
//!
//! Only the first content part of the first candidate is returned. A JSON
//! document split across several parts is truncated to its first part.
//!
//! ## Cancellation
//!
//! The [`CallContext`] travels into the connection. Connections check it
//! before sending and again while they wait, and the HTTP agent's timeout is
//! bounded by the deadline. The connection is dropped before
//! [`Client::generate`] returns, on every path.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod backend;
pub mod error;
pub mod schema;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use schema::{Schema, StructuralSchema, Type, translate};
pub use types::{
    CallContext, ClientOptions, Credentials, Endpoint, GenerateContentRequest,
    GenerateContentResponse, GenerationRequest, JSON_MIME_TYPE, Part,
};

pub use backend::MockBackend;
use backend::vertex::VertexBackend;
use backend::Backend;

/// High-level client for structured generation.
///
/// # Example
///
/// ```
/// use vertexkit::{CallContext, Client, ClientOptions, Endpoint, Error, GenerationRequest, MockBackend};
///
/// let mock = MockBackend::new();
/// mock.push_response(Default::default());
///
/// let client = Client::with_backend(Box::new(mock));
/// let request = GenerationRequest::new("X", "gemini", Endpoint::new("p", "us-central1"));
/// let err = client
///     .generate(&CallContext::new(), &request, &ClientOptions::new())
///     .unwrap_err();
/// assert!(matches!(err, Error::EmptyResponse));
/// ```
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a new client with the default Vertex AI backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            backend: Box::new(VertexBackend::new()),
        }
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Generate content for `request`.
    ///
    /// Opens one connection, sends exactly one call and returns the
    /// normalized first part of the first candidate. The connection is
    /// released on every exit path. Nothing is retried.
    ///
    /// # Errors
    ///
    /// - [`Error::ClientCreation`] if the connection cannot be opened
    /// - [`Error::Generation`] if the call fails
    /// - [`Error::EmptyResponse`] if there is no candidate or no part
    /// - [`Error::Cancelled`] / [`Error::DeadlineExceeded`] if `ctx` ends first
    pub fn generate(
        &self,
        ctx: &CallContext,
        request: &GenerationRequest,
        options: &ClientOptions,
    ) -> Result<String> {
        ctx.check()?;

        log::debug!(
            "Generating with {} at {}",
            request.model_name,
            request.endpoint
        );
        let connection = self
            .backend
            .connect(&request.endpoint, options, ctx.remaining())?;

        let response =
            connection.generate_content(ctx, &request.model_name, &request.to_wire());
        drop(connection);
        let response = response?;

        let part = response.first_part().ok_or(Error::EmptyResponse)?;
        Ok(part.normalized())
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
