//! Handler trait, type erasure and handler chains.
//!
//! # How async handlers are stored
//!
//! A route holds an ordered list of handlers of *different* concrete types,
//! and the same list is shared by every verb the route was mapped with. Rust
//! collections hold one type, so each handler is hidden behind a trait object
//! (`dyn ErasedHandler<G>`):
//!
//! ```text
//! async fn auth(ctx: Context) -> Envelope { … }    ← user writes this
//!        ↓ Chain::new(auth)
//! auth.into_boxed_handler()                        ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(auth))                        ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler<G> = Arc<dyn ErasedHandler<G>>
//! handler.call(ctx)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { auth(ctx).await.into_envelope() })
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::envelope::{Envelope, IntoEnvelope};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to an [`Envelope`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Envelope> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler<G>: Send + Sync + 'static {
    fn call(&self, ctx: Context<G>) -> BoxFuture;
}

/// A type-erased handler shared across routes, verbs and concurrent requests.
#[doc(hidden)]
pub type BoxedHandler<G> = Arc<dyn ErasedHandler<G>>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` (or closure returning a future) with the shape:
///
/// ```text
/// async fn name(ctx: Context<G>) -> impl IntoEnvelope
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler<G>: private::Sealed<G> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler<G>;
}

mod private {
    pub trait Sealed<G> {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R, G> private::Sealed<G> for F
where
    F: Fn(Context<G>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoEnvelope,
    G: 'static,
{
}

impl<F, Fut, R, G> Handler<G> for F
where
    F: Fn(Context<G>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoEnvelope,
    G: 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler<G> {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler `F` to the [`ErasedHandler`] trait object.
struct FnHandler<F>(F);

impl<F, Fut, R, G> ErasedHandler<G> for FnHandler<F>
where
    F: Fn(Context<G>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoEnvelope,
    G: 'static,
{
    fn call(&self, ctx: Context<G>) -> BoxFuture {
        let fut = (self.0)(ctx);
        Box::pin(async move { fut.await.into_envelope() })
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// An ordered, non-empty sequence of handlers bound to a route.
///
/// Handlers run in the order they were added. Any of them can end the chain
/// by returning a terminal envelope; the rest then never run.
///
/// ```rust
/// use baton::{Chain, Context, Envelope, chain};
///
/// async fn auth(ctx: Context) -> Envelope {
///     match ctx.query("token") {
///         Some("secret") => Envelope::next(),
///         _ => Envelope::forbidden(),
///     }
/// }
///
/// async fn echo(_ctx: Context) -> Envelope {
///     Envelope::ok("secret")
/// }
///
/// let a = Chain::new(auth).then(echo);
/// let b = chain![auth, echo];
/// assert_eq!(a.len(), b.len());
/// ```
pub struct Chain<G = ()> {
    handlers: Vec<BoxedHandler<G>>,
}

impl<G: 'static> Chain<G> {
    pub fn new(first: impl Handler<G>) -> Self {
        Self { handlers: vec![first.into_boxed_handler()] }
    }

    /// Append a handler. Returns `self` for chaining.
    pub fn then(mut self, next: impl Handler<G>) -> Self {
        self.handlers.push(next.into_boxed_handler());
        self
    }
}

impl<G> Chain<G> {
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Always `false`: a chain starts with one handler and only grows.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub(crate) fn into_shared(self) -> Arc<[BoxedHandler<G>]> {
        self.handlers.into()
    }
}

/// Builds a [`Chain`] from one or more handlers: `chain![auth, load, render]`.
#[macro_export]
macro_rules! chain {
    ($first:expr $(, $rest:expr)* $(,)?) => {
        $crate::Chain::new($first)$(.then($rest))*
    };
}
