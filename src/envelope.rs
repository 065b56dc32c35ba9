//! The uniform result type every handler returns.
//!
//! Whatever handler ends the chain, and whether it succeeded or not, the
//! client receives the same JSON shape:
//!
//! ```text
//! { "successful": true,  "data": … }
//! { "successful": false, "data": …, "error": { "code": 403, "message": "Forbidden", "data": … } }
//! ```
//!
//! `error` is omitted on success, not sent as `null`. The HTTP status travels
//! on the status line only and never appears in the body.

use std::fmt;

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

/// Error details carried by an unsuccessful [`Envelope`].
///
/// `code` is never chosen by the caller. [`Envelope::fail`] copies it from the
/// response status, so the body and the status line always agree.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorInfo {
    code: u16,
    message: String,
    data: Value,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self { code: 0, message: message.into(), data: Value::Null }
    }

    /// Attach structured diagnostics to the error object.
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }

    /// The HTTP status of the envelope carrying this error.
    ///
    /// `0` until the error has been attached with [`Envelope::fail`] (or one of
    /// the shortcuts built on it).
    pub fn code(&self) -> u16 { self.code }

    pub fn message(&self) -> &str { &self.message }
    pub fn data(&self) -> &Value { &self.data }
}

/// Outcome of one handler.
///
/// Build it with the named constructors; the fields are private so a
/// successful envelope can never carry an error and vice versa.
///
/// ```rust
/// use baton::Envelope;
///
/// let done = Envelope::ok("hello");
/// let denied = Envelope::forbidden().with_message("Token required");
/// let carry_on = Envelope::next_with(42);
///
/// assert!(done.is_terminal());
/// assert_eq!(denied.status().as_u16(), 403);
/// assert!(!carry_on.is_terminal());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Envelope {
    successful: bool,
    data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorInfo>,
    #[serde(skip)]
    status: StatusCode,
    #[serde(skip)]
    terminal: bool,
}

impl Envelope {
    /// `200 OK`, ends the chain.
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            successful: true,
            data: data.into(),
            error: None,
            status: StatusCode::OK,
            terminal: true,
        }
    }

    /// Unsuccessful result with an explicit status. Ends the chain.
    ///
    /// `data` is still sent, which lets a failing handler pass along
    /// whatever diagnostics it gathered.
    pub fn fail(status: StatusCode, data: impl Into<Value>, mut error: ErrorInfo) -> Self {
        error.code = status.as_u16();
        Self {
            successful: false,
            data: data.into(),
            error: Some(error),
            status,
            terminal: true,
        }
    }

    /// `403 Forbidden`.
    pub fn forbidden() -> Self {
        Self::fail(StatusCode::FORBIDDEN, Value::Null, ErrorInfo::new("Forbidden"))
    }

    /// `400 Bad Request`.
    pub fn bad_request() -> Self {
        Self::fail(StatusCode::BAD_REQUEST, Value::Null, ErrorInfo::new("Bad Request"))
    }

    /// `401 Unauthorized`.
    pub fn unauthorized() -> Self {
        Self::fail(StatusCode::UNAUTHORIZED, Value::Null, ErrorInfo::new("Unauthorized"))
    }

    /// `500 Internal Server Error`, with the error's `Display` output as message.
    pub fn internal_error(err: impl fmt::Display) -> Self {
        Self::fail(
            StatusCode::INTERNAL_SERVER_ERROR,
            Value::Null,
            ErrorInfo::new(err.to_string()),
        )
    }

    /// Hand over to the next handler in the chain.
    pub fn next() -> Self {
        Self::next_with(Value::Null)
    }

    /// Hand over to the next handler, which reads `data` through
    /// [`Context::previous`](crate::Context::previous).
    pub fn next_with(data: impl Into<Value>) -> Self {
        Self {
            successful: true,
            data: data.into(),
            error: None,
            status: StatusCode::OK,
            terminal: false,
        }
    }

    /// Replace the default error message. Has no effect on a successful envelope.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.message = message.into();
        }
        self
    }

    pub fn is_successful(&self) -> bool { self.successful }
    pub fn is_terminal(&self) -> bool { self.terminal }
    pub fn status(&self) -> StatusCode { self.status }
    pub fn data(&self) -> &Value { &self.data }
    pub fn error(&self) -> Option<&ErrorInfo> { self.error.as_ref() }

    /// Take the payload out, e.g. to wrap it in an end hook.
    pub fn into_data(self) -> Value { self.data }
}

// ── IntoEnvelope ──────────────────────────────────────────────────────────────

/// Conversion into an [`Envelope`], applied to every handler's return value.
///
/// `Result<Envelope, E>` is accepted so handlers can use `?`; an `Err`
/// becomes [`Envelope::internal_error`].
///
/// ```rust
/// use baton::{Context, Envelope};
///
/// async fn parse_limit(ctx: Context) -> Result<Envelope, std::num::ParseIntError> {
///     let limit: u32 = ctx.query("limit").unwrap_or("10").parse()?;
///     Ok(Envelope::next_with(limit))
/// }
/// ```
pub trait IntoEnvelope {
    fn into_envelope(self) -> Envelope;
}

impl IntoEnvelope for Envelope {
    fn into_envelope(self) -> Envelope { self }
}

impl<E: fmt::Display> IntoEnvelope for Result<Envelope, E> {
    fn into_envelope(self) -> Envelope {
        match self {
            Ok(envelope) => envelope,
            Err(err) => Envelope::internal_error(err),
        }
    }
}
