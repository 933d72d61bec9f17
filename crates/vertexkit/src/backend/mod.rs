//! Backend traits and implementations for the model API.
//!
//! A [`Backend`] opens [`Connection`]s; a connection sends
//! `generateContent` calls. Connections are scoped: dropping one releases
//! it, so every exit path of a call gives the connection back. The primary
//! implementation is [`vertex::VertexBackend`].
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access:
//!
//! ```
//! use vertexkit::backend::MockBackend;
//! use vertexkit::{CallContext, Client, ClientOptions, Endpoint, GenerationRequest};
//!
//! let mock = MockBackend::new();
//! mock.push_text(r#"{"forecast": []}"#);
//!
//! let client = Client::with_backend(Box::new(mock.clone()));
//! let request = GenerationRequest::new("X", "gemini", Endpoint::new("p", "us-central1"));
//! let text = client
//!     .generate(&CallContext::new(), &request, &ClientOptions::new())
//!     .unwrap();
//!
//! assert_eq!(text, r#"{"forecast": []}"#);
//! assert_eq!(mock.call_count(), 1);
//! assert_eq!(mock.open_connections(), 0);
//! ```

pub mod vertex;

use crate::error::{Error, Result};
use crate::types::{
    CallContext, ClientOptions, Endpoint, GenerateContentRequest, GenerateContentResponse,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// How often a delayed mock call re-checks its [`CallContext`].
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Source of connections to the model API.
pub trait Backend: Send + Sync {
    /// Open a connection to `endpoint`.
    ///
    /// `timeout` bounds every request made on the connection.
    ///
    /// # Errors
    ///
    /// Returns `Error::ClientCreation` if the connection cannot be set up.
    fn connect(
        &self,
        endpoint: &Endpoint,
        options: &ClientOptions,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn Connection>>;
}

/// An open connection. Dropping it releases the connection.
pub trait Connection: Send {
    /// Send one `generateContent` call for `model` and wait for the response.
    ///
    /// Runs on the caller's thread and stops waiting once `ctx` ends.
    ///
    /// # Errors
    ///
    /// Returns `Error::Generation` if the call fails, or
    /// `Error::Cancelled` / `Error::DeadlineExceeded` if `ctx` ends first.
    fn generate_content(
        &self,
        ctx: &CallContext,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

// =============================================================================
// Mock backend
// =============================================================================

/// A reply queued on the [`MockBackend`].
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this response.
    Response(GenerateContentResponse),
    /// Fail the call.
    Failure {
        /// Error message.
        message: String,
        /// HTTP status.
        status: Option<u16>,
    },
}

/// A call observed by the [`MockBackend`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Endpoint the connection was opened against.
    pub endpoint: Endpoint,
    /// Model name passed to the call.
    pub model: String,
    /// Request body.
    pub request: GenerateContentRequest,
}

#[derive(Debug, Default)]
struct MockState {
    replies: VecDeque<MockReply>,
    calls: Vec<RecordedCall>,
    connect_error: Option<String>,
    latency: Duration,
    opened: usize,
    closed: usize,
}

/// Mock backend for testing without network access.
///
/// Replies are served in the order they were queued. Clones share state, so
/// a test can keep a clone to inspect calls after handing one to a
/// [`Client`](crate::Client).
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a mock with no replies queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a response.
    pub fn push_response(&self, response: GenerateContentResponse) {
        self.state()
            .replies
            .push_back(MockReply::Response(response));
    }

    /// Queue a response with a single text part.
    pub fn push_text(&self, text: impl Into<String>) {
        self.push_response(GenerateContentResponse::from_text(text));
    }

    /// Queue a failed call.
    pub fn push_failure(&self, message: impl Into<String>, status: Option<u16>) {
        self.state().replies.push_back(MockReply::Failure {
            message: message.into(),
            status,
        });
    }

    /// Make every `connect` fail with `message`.
    pub fn fail_connect(&self, message: impl Into<String>) {
        self.state().connect_error = Some(message.into());
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    /// Calls observed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Number of calls observed so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Number of connections ever opened.
    #[must_use]
    pub fn connections_opened(&self) -> usize {
        self.state().opened
    }

    /// Number of connections opened and not yet released.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        let state = self.state();
        state.opened - state.closed
    }
}

impl Backend for MockBackend {
    fn connect(
        &self,
        endpoint: &Endpoint,
        _options: &ClientOptions,
        _timeout: Option<Duration>,
    ) -> Result<Box<dyn Connection>> {
        let mut state = self.state();
        if let Some(message) = &state.connect_error {
            return Err(Error::client(message.clone()));
        }
        state.opened += 1;

        Ok(Box::new(MockConnection {
            backend: self.clone(),
            endpoint: endpoint.clone(),
        }))
    }
}

struct MockConnection {
    backend: MockBackend,
    endpoint: Endpoint,
}

impl Connection for MockConnection {
    fn generate_content(
        &self,
        ctx: &CallContext,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let latency = self.backend.state().latency;
        let arrives = Instant::now().checked_add(latency);
        loop {
            ctx.check()?;
            let left = arrives.map_or(POLL_INTERVAL, |at| {
                at.saturating_duration_since(Instant::now())
            });
            if left.is_zero() {
                break;
            }
            thread::sleep(left.min(POLL_INTERVAL));
        }

        let mut state = self.backend.state();
        state.calls.push(RecordedCall {
            endpoint: self.endpoint.clone(),
            model: model.to_string(),
            request: request.clone(),
        });

        match state.replies.pop_front() {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Failure { message, status }) => Err(Error::generation(message, status)),
            None => Err(Error::generation("mock backend has no reply queued", None)),
        }
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.backend.state().closed += 1;
    }
}
