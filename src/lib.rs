//! # baton
//!
//! Handler-chain dispatch for JSON APIs on hyper.
//!
//! A route is a path, one or more verbs, and an ordered chain of handlers.
//! Each handler receives the result of the one before it and either passes
//! the baton on ([`Envelope::next`]) or ends the request (any other
//! constructor). Whoever ends it, the client gets the same JSON shape:
//!
//! ```text
//! {"successful":true,"data":"secret"}
//! {"successful":false,"data":null,"error":{"code":403,"message":"Forbidden","data":null}}
//! ```
//!
//! Two optional global hooks wrap every chain: an init hook that runs first
//! and can reject a request before any route handler sees it, and an end hook
//! whose result replaces whatever the chain produced.
//!
//! What baton leaves to others: authentication is just a handler in the
//! chain, URL matching is [`matchit`], serialization is `serde_json`, and
//! logging is whatever [`Logger`] you plug in (by default, `tracing`).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use baton::{Api, Context, Envelope, chain};
//!
//! #[tokio::main]
//! async fn main() {
//!     let api = Api::builder()
//!         .map("get", "/time", chain![time])
//!         .map("get", "/secret", chain![auth, secret])
//!         .build();
//!
//!     api.run("0.0.0.0:9999").await.unwrap();
//! }
//!
//! async fn time(_ctx: Context) -> Envelope {
//!     Envelope::ok(std::time::UNIX_EPOCH.elapsed().map(|d| d.as_secs()).unwrap_or(0))
//! }
//!
//! // Lets the request through only with `?apiToken=0123456789`.
//! async fn auth(ctx: Context) -> Envelope {
//!     match ctx.query("apiToken") {
//!         Some("0123456789") => Envelope::next(),
//!         _ => Envelope::forbidden(),
//!     }
//! }
//!
//! async fn secret(_ctx: Context) -> Envelope {
//!     Envelope::ok("secret")
//! }
//! ```

mod api;
mod context;
mod dispatch;
mod envelope;
mod error;
mod handler;
mod logger;
mod method;
mod request;
mod response;
mod route;
mod router;
mod server;

pub use api::{Api, ApiBuilder, App};
pub use context::Context;
pub use envelope::{Envelope, ErrorInfo, IntoEnvelope};
pub use error::Error;
pub use handler::{Chain, Handler};
pub use logger::{Logger, TracingLogger};
pub use method::{Method, UnsupportedMethod};
pub use request::Request;
pub use response::Response;
pub use route::Route;
pub use server::Server;
