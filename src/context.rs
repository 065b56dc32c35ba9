//! Per-request state handed to each handler in a chain.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::envelope::Envelope;
use crate::error::Error;
use crate::logger::Logger;
use crate::request::Request;

/// What a handler sees when it runs.
///
/// Every step of a chain receives its own `Context` by value. The request,
/// global context and logger are shared behind `Arc`s; only
/// [`previous`](Context::previous) differs from one step to the next. `G` is
/// the application's global context type, set with
/// [`ApiBuilder::global_context`](crate::ApiBuilder::global_context).
pub struct Context<G = ()> {
    request: Arc<Request>,
    global: Arc<G>,
    logger: Arc<dyn Logger>,
    previous: Envelope,
}

impl<G> Context<G> {
    pub(crate) fn new(
        request: Arc<Request>,
        global: Arc<G>,
        logger: Arc<dyn Logger>,
        previous: Envelope,
    ) -> Self {
        Self { request, global, logger, previous }
    }

    /// Result of the step before this one.
    ///
    /// For the first step of a chain this is the init hook's result, or a
    /// data-less [`Envelope::next`] when no init hook is configured. Inside the
    /// end hook it is the envelope that would otherwise be sent.
    pub fn previous(&self) -> &Envelope { &self.previous }

    /// Take ownership of the previous result.
    pub fn into_previous(self) -> Envelope { self.previous }

    pub fn request(&self) -> &Request { &self.request }
    pub fn global(&self) -> &G { &self.global }
    pub fn logger(&self) -> &dyn Logger { self.logger.as_ref() }

    pub fn query(&self, name: &str) -> Option<&str> { self.request.query(name) }
    pub fn param(&self, name: &str) -> Option<&str> { self.request.param(name) }
    pub fn header(&self, name: &str) -> Option<&str> { self.request.header(name) }
    pub fn body(&self) -> &[u8] { self.request.body() }

    /// See [`Request::json`].
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        self.request.json()
    }
}

impl<G> fmt::Debug for Context<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.request.method())
            .field("path", &self.request.path())
            .field("previous", &self.previous)
            .finish_non_exhaustive()
    }
}
