//! Radix-tree route lookup.
//!
//! One tree per HTTP method, O(path-length) lookup. Built once from the
//! route table when the application starts serving and read-only after that.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::method::Method;
use crate::route::Route;

type SharedChain<G> = Arc<[BoxedHandler<G>]>;

pub(crate) struct Router<G> {
    trees: HashMap<Method, MatchitRouter<SharedChain<G>>>,
}

impl<G> Router<G> {
    /// Compiles `routes` in registration order.
    ///
    /// A `(method, path)` pair that collides with an earlier one, or a path
    /// `matchit` cannot parse, is a configuration error.
    pub(crate) fn build(routes: &[Route<G>]) -> Result<Self, Error> {
        let mut trees: HashMap<Method, MatchitRouter<SharedChain<G>>> = HashMap::new();
        for route in routes {
            trees
                .entry(route.method())
                .or_default()
                .insert(route.path(), Arc::clone(route.chain()))
                .map_err(|source| Error::Route {
                    method: route.method(),
                    path: route.path().to_owned(),
                    source,
                })?;
        }
        Ok(Self { trees })
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(SharedChain<G>, HashMap<String, String>)> {
        let tree = self.trees.get(&method)?;
        let matched = tree.at(path).ok()?;
        let chain = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((chain, params))
    }
}
