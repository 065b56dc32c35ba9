//! Outgoing HTTP response: the wire form of an [`Envelope`].
//!
//! Every dispatched request ends here. The envelope's status goes on the
//! status line and the envelope itself, minus status and chain bookkeeping,
//! becomes the `application/json` body.

use bytes::Bytes;
use http::{StatusCode, header};
use http_body_util::Full;
use tracing::error;

use crate::envelope::Envelope;

const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Body sent if an envelope ever fails to serialize.
const SERIALIZE_FAILED: &[u8] =
    br#"{"successful":false,"data":null,"error":{"code":500,"message":"response serialization failed","data":null}}"#;

/// An outgoing HTTP response.
#[derive(Clone, Debug)]
pub struct Response {
    status: StatusCode,
    content_type: Option<&'static str>,
    body: Bytes,
}

impl Response {
    pub fn status(&self) -> StatusCode { self.status }
    pub fn body(&self) -> &[u8] { &self.body }

    /// `Content-Type` of the body, `None` for bodiless responses.
    pub fn content_type(&self) -> Option<&str> { self.content_type }

    /// Bodiless response for requests no route matched. These never reach
    /// the dispatcher, so they are not envelopes.
    pub(crate) fn not_found() -> Self {
        Self { status: StatusCode::NOT_FOUND, content_type: None, body: Bytes::new() }
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        if let Some(content_type) = self.content_type {
            res.headers_mut()
                .insert(header::CONTENT_TYPE, header::HeaderValue::from_static(content_type));
        }
        res
    }
}

impl From<Envelope> for Response {
    fn from(envelope: Envelope) -> Self {
        match serde_json::to_vec(&envelope) {
            Ok(body) => Self {
                status: envelope.status(),
                content_type: Some(CONTENT_TYPE_JSON),
                body: body.into(),
            },
            Err(e) => {
                error!("envelope serialization failed: {e}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    content_type: Some(CONTENT_TYPE_JSON),
                    body: Bytes::from_static(SERIALIZE_FAILED),
                }
            }
        }
    }
}
