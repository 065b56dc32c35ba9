//! Application configuration and the compiled request handler.
//!
//! Configuration happens once, up front, through [`ApiBuilder`]. `build()`
//! freezes it into an [`Api`], which is handed to a [`Server`] (or to one of
//! the `run*` shortcuts). Nothing about an `Api` can change while it serves.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::handler::{BoxedHandler, Chain, Handler};
use crate::logger::{Logger, TracingLogger};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::route::{self, Route};
use crate::router::Router;
use crate::server::Server;

const DEFAULT_GRACEFUL_TIMEOUT: Duration = Duration::from_secs(60);

/// Collects routes, hooks, the global context and the logger.
///
/// Each method returns `self` so configuration chains naturally:
///
/// ```rust
/// use baton::{Api, Context, Envelope, chain};
///
/// async fn auth(ctx: Context) -> Envelope {
///     if ctx.query("token") == Some("secret") {
///         Envelope::next()
///     } else {
///         Envelope::forbidden()
///     }
/// }
///
/// async fn secret(_ctx: Context) -> Envelope {
///     Envelope::ok("secret")
/// }
///
/// let api = Api::builder()
///     .map("get", "/secured", chain![auth, secret])
///     .map("get, post", "/open", chain![secret])
///     .build();
///
/// assert_eq!(api.routes().len(), 3);
/// ```
pub struct ApiBuilder<G = ()> {
    routes: Vec<Route<G>>,
    global: G,
    logger: Arc<dyn Logger>,
    init: Option<BoxedHandler<G>>,
    end: Option<BoxedHandler<G>>,
    graceful_timeout: Duration,
}

impl<G: Send + Sync + 'static> ApiBuilder<G> {
    /// Starts a configuration whose handlers see `global` through
    /// [`Context::global`](crate::Context::global).
    pub fn new(global: G) -> Self {
        Self {
            routes: Vec::new(),
            global,
            logger: Arc::new(TracingLogger),
            init: None,
            end: None,
            graceful_timeout: DEFAULT_GRACEFUL_TIMEOUT,
        }
    }

    /// Binds `chain` to `path` for every verb in the comma-separated `verbs`
    /// list (`"get"`, `"get,post"`, `"post, put"`).
    ///
    /// Verbs outside get/post/put/patch/delete are skipped with a warning
    /// rather than rejected. Path parameters use `{name}` syntax.
    pub fn map(mut self, verbs: &str, path: &str, chain: Chain<G>) -> Self {
        route::register(&mut self.routes, verbs, path, chain);
        self
    }

    /// Replaces the global context value.
    pub fn global_context(mut self, global: G) -> Self {
        self.global = global;
        self
    }

    /// Runs before every route's chain. A terminal result skips the chain.
    pub fn init_handler(mut self, handler: impl Handler<G>) -> Self {
        self.init = Some(handler.into_boxed_handler());
        self
    }

    /// Runs after every route's chain; its result is what gets sent.
    pub fn end_handler(mut self, handler: impl Handler<G>) -> Self {
        self.end = Some(handler.into_boxed_handler());
        self
    }

    /// Logger handed to handlers. Defaults to [`TracingLogger`].
    pub fn logger(mut self, logger: impl Logger) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// How long shutdown waits for open connections. Defaults to 60 s.
    pub fn graceful_timeout(mut self, timeout: Duration) -> Self {
        self.graceful_timeout = timeout;
        self
    }

    /// Routes registered so far, in registration order.
    pub fn routes(&self) -> &[Route<G>] {
        &self.routes
    }

    pub fn build(self) -> Api<G> {
        Api {
            routes: self.routes,
            dispatcher: Dispatcher {
                global: Arc::new(self.global),
                logger: self.logger,
                init: self.init,
                end: self.end,
            },
            graceful_timeout: self.graceful_timeout,
        }
    }
}

impl Default for ApiBuilder<()> {
    fn default() -> Self { Self::new(()) }
}

/// Frozen application configuration.
pub struct Api<G = ()> {
    routes: Vec<Route<G>>,
    dispatcher: Dispatcher<G>,
    graceful_timeout: Duration,
}

impl Api<()> {
    /// Configuration without a global context.
    pub fn builder() -> ApiBuilder<()> {
        ApiBuilder::default()
    }
}

impl<G: Send + Sync + 'static> Api<G> {
    /// Configuration carrying `global` to every handler.
    pub fn with_global(global: G) -> ApiBuilder<G> {
        ApiBuilder::new(global)
    }

    pub fn routes(&self) -> &[Route<G>] {
        &self.routes
    }

    pub fn graceful_timeout(&self) -> Duration {
        self.graceful_timeout
    }

    /// Builds the lookup trees. Fails on conflicting or malformed paths.
    pub fn compile(self) -> Result<App<G>, Error> {
        Ok(App {
            router: Router::build(&self.routes)?,
            dispatcher: self.dispatcher,
        })
    }

    /// Serves plain HTTP on `addr` until SIGTERM or Ctrl-C.
    pub async fn run(self, addr: &str) -> Result<(), Error> {
        Server::bind(addr).await?.serve(self).await
    }

    /// Serves HTTPS on `addr` with a PEM certificate chain and private key.
    pub async fn run_tls(
        self,
        addr: &str,
        cert_file: impl AsRef<Path>,
        key_file: impl AsRef<Path>,
    ) -> Result<(), Error> {
        Server::bind_tls(addr, cert_file, key_file).await?.serve(self).await
    }

    /// Serves plain HTTP on a Unix-domain socket at `path`.
    #[cfg(unix)]
    pub async fn run_unix_socket(self, path: impl AsRef<Path>) -> Result<(), Error> {
        Server::bind_unix(path)?.serve(self).await
    }
}

/// A compiled application: route lookup plus dispatch.
///
/// Transport-independent. The server feeds it buffered requests, and tests
/// can call [`handle`](App::handle) directly.
pub struct App<G = ()> {
    router: Router<G>,
    dispatcher: Dispatcher<G>,
}

impl<G: Send + Sync + 'static> App<G> {
    /// Routes one request and produces one response.
    ///
    /// Requests that match no route get a bodiless `404` and never reach the
    /// dispatcher or the hooks.
    pub async fn handle(&self, req: http::Request<Bytes>) -> Response {
        let Some(method) = Method::from_http(req.method()) else {
            debug!(method = %req.method(), path = req.uri().path(), "no route for method");
            return Response::not_found();
        };
        let Some((chain, params)) = self.router.lookup(method, req.uri().path()) else {
            debug!(%method, path = req.uri().path(), "no route");
            return Response::not_found();
        };

        let envelope = self.dispatcher.dispatch(&chain, Request::new(req, params)).await;
        Response::from(envelope)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::StatusCode;
    use serde_json::{Value, json};

    use super::*;
    use crate::{Context, Envelope, chain};

    fn get(uri: &str) -> http::Request<Bytes> {
        http::Request::builder().uri(uri).body(Bytes::new()).unwrap()
    }

    fn body(res: &Response) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    async fn auth(ctx: Context) -> Envelope {
        match ctx.query("token") {
            Some("secret") => Envelope::next(),
            _ => Envelope::forbidden(),
        }
    }

    async fn echo(_ctx: Context) -> Envelope {
        Envelope::ok("secret")
    }

    #[tokio::test]
    async fn forbidden_without_token() {
        let app = Api::builder().map("get", "/secured", chain![auth, echo]).build().compile().unwrap();

        let res = app.handle(get("/secured")).await;

        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            res.body(),
            br#"{"successful":false,"data":null,"error":{"code":403,"message":"Forbidden","data":null}}"#,
        );
    }

    #[tokio::test]
    async fn passes_with_token() {
        let app = Api::builder().map("get", "/secured", chain![auth, echo]).build().compile().unwrap();

        let res = app.handle(get("/secured?token=secret")).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), br#"{"successful":true,"data":"secret"}"#);
    }

    #[tokio::test]
    async fn unmatched_requests_skip_hooks() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Api::builder()
            .map("banana", "/x", chain![echo])
            .map("get", "/y", chain![echo])
            .init_handler(move |_ctx: Context| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Envelope::next() }
            })
            .build()
            .compile()
            .unwrap();

        for req in [get("/x"), get("/nope")] {
            let res = app.handle(req).await;
            assert_eq!(res.status(), StatusCode::NOT_FOUND);
            assert!(res.body().is_empty());
        }
        let head = http::Request::builder()
            .method(http::Method::HEAD)
            .uri("/y")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(app.handle(head).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn global_context_reaches_handlers() {
        #[derive(Debug)]
        struct Config {
            region: &'static str,
        }

        async fn region(ctx: Context<Config>) -> Envelope {
            Envelope::ok(json!({ "region": ctx.global().region }))
        }

        let app = Api::with_global(Config { region: "eu" })
            .map("get", "/region", Chain::new(region))
            .build()
            .compile()
            .unwrap();

        let res = app.handle(get("/region")).await;
        assert_eq!(body(&res), json!({ "successful": true, "data": { "region": "eu" } }));
    }

    #[tokio::test]
    async fn path_params_reach_handlers() {
        async fn user(ctx: Context) -> Envelope {
            Envelope::ok(ctx.param("id").unwrap_or_default().to_owned())
        }

        let app = Api::builder().map("get", "/users/{id}", chain![user]).build().compile().unwrap();
        let res = app.handle(get("/users/42")).await;
        assert_eq!(body(&res)["data"], json!("42"));
    }

    #[test]
    fn conflicting_routes_fail_to_compile() {
        let api = Api::builder()
            .map("get", "/dup", chain![echo])
            .map("get,post", "/dup", chain![echo])
            .build();
        assert_eq!(api.routes().len(), 3);
        assert!(matches!(api.compile(), Err(Error::Route { .. })));
    }

    #[test]
    fn builder_defaults() {
        let api = Api::builder().build();
        assert!(api.routes().is_empty());
        assert_eq!(api.graceful_timeout(), Duration::from_secs(60));

        let api = Api::builder().graceful_timeout(Duration::from_secs(5)).build();
        assert_eq!(api.graceful_timeout(), Duration::from_secs(5));
    }
}
