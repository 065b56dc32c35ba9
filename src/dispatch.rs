//! Chain execution.
//!
//! For every matched request:
//!
//! 1. **init**: the optional init hook runs on a data-less [`Envelope::next`].
//!    A terminal result skips the route's chain entirely.
//! 2. **chain**: handlers run in registration order, each receiving the
//!    previous result. The first terminal result stops the chain. If none is
//!    terminal, the last handler's result is final as it stands.
//! 3. **end**: the optional end hook receives the final result and its return
//!    value is what gets sent, terminal or not.
//!
//! Each step gets a fresh [`Context`] built from the shared request parts and
//! the previous step's result, so the whole run is a fold over the chain.
//! Every handler is called at most once per request.

use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::envelope::Envelope;
use crate::handler::BoxedHandler;
use crate::logger::Logger;
use crate::request::Request;

pub(crate) struct Dispatcher<G> {
    pub(crate) global: Arc<G>,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) init: Option<BoxedHandler<G>>,
    pub(crate) end: Option<BoxedHandler<G>>,
}

impl<G: Send + Sync + 'static> Dispatcher<G> {
    /// Runs init hook, `chain` and end hook for one request and returns the
    /// envelope to send.
    pub(crate) async fn dispatch(&self, chain: &[BoxedHandler<G>], request: Request) -> Envelope {
        let request = Arc::new(request);
        let context = |previous: Envelope| {
            Context::new(
                Arc::clone(&request),
                Arc::clone(&self.global),
                Arc::clone(&self.logger),
                previous,
            )
        };

        let seed = Envelope::next();
        let seed = match &self.init {
            Some(init) => init.call(context(seed)).await,
            None => seed,
        };

        let result = if seed.is_terminal() {
            debug!(status = %seed.status(), "init hook ended the request");
            seed
        } else {
            run_chain(chain, seed, &context).await
        };

        match &self.end {
            Some(end) => end.call(context(result)).await,
            None => result,
        }
    }
}

async fn run_chain<G: 'static>(
    chain: &[BoxedHandler<G>],
    seed: Envelope,
    context: impl Fn(Envelope) -> Context<G>,
) -> Envelope {
    let mut previous = seed;
    for (position, handler) in chain.iter().enumerate() {
        let result = handler.call(context(previous)).await;
        if result.is_terminal() {
            if position + 1 < chain.len() {
                debug!(position, skipped = chain.len() - position - 1, "chain short-circuited");
            }
            return result;
        }
        previous = result;
    }
    previous
}
