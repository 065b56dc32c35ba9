//! Logging capability handed to every handler.
//!
//! Applications plug in their own sink by implementing [`Logger`]; the
//! default forwards to `tracing`, so a `tracing_subscriber` installed in
//! `main` picks up handler output alongside the server's own events.
//!
//! ```rust
//! use baton::{Context, Envelope};
//!
//! async fn greet(ctx: Context) -> Envelope {
//!     let name = ctx.query("name").unwrap_or("world");
//!     ctx.logger().info(format_args!("greeting {name}"));
//!     Envelope::ok(format!("hello {name}"))
//! }
//! ```

use std::fmt;

/// Four-level logging sink. Shared by every in-flight request, so
/// implementations must be thread-safe.
pub trait Logger: Send + Sync + 'static {
    fn debug(&self, args: fmt::Arguments<'_>);
    fn info(&self, args: fmt::Arguments<'_>);
    fn warn(&self, args: fmt::Arguments<'_>);
    fn error(&self, args: fmt::Arguments<'_>);
}

/// Default [`Logger`]: emits `tracing` events under the `baton::handler` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(target: "baton::handler", "{args}");
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(target: "baton::handler", "{args}");
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(target: "baton::handler", "{args}");
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(target: "baton::handler", "{args}");
    }
}
