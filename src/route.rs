//! Route table entries.
//!
//! One [`Route`] is recorded per verb for every `map` call. The table is
//! plain data: building it never fails, and it is compiled into radix trees
//! only when the application starts serving.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::handler::{BoxedHandler, Chain};
use crate::method::Method;

/// A single `(verb, path) → chain` binding.
pub struct Route<G = ()> {
    method: Method,
    path: String,
    chain: Arc<[BoxedHandler<G>]>,
}

impl<G> Route<G> {
    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }

    /// Number of handlers in this route's chain.
    pub fn chain_len(&self) -> usize { self.chain.len() }

    pub(crate) fn chain(&self) -> &Arc<[BoxedHandler<G>]> { &self.chain }
}

impl<G> fmt::Debug for Route<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handlers", &self.chain.len())
            .finish()
    }
}

/// Splits a comma-separated verb list and appends one route per supported
/// verb to `routes`, all sharing `chain`.
///
/// Unsupported tokens are skipped with a warning; they never fail the call.
pub(crate) fn register<G>(
    routes: &mut Vec<Route<G>>,
    verbs: &str,
    path: &str,
    chain: Chain<G>,
) {
    let chain = chain.into_shared();
    for token in verbs.split(',') {
        match token.parse::<Method>() {
            Ok(method) => routes.push(Route {
                method,
                path: path.to_owned(),
                chain: Arc::clone(&chain),
            }),
            Err(e) => warn!(path, "route not registered: {e}"),
        }
    }
}
