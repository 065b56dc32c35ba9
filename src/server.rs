//! HTTP server: listeners, connection handling and graceful shutdown.
//!
//! Three listener kinds feed the same request path:
//!
//! - [`Server::bind`]: plain TCP
//! - [`Server::bind_tls`]: TCP with a rustls handshake per connection
//! - [`Server::bind_unix`]: a Unix-domain socket, for a reverse proxy on the same host
//!
//! Connections speak HTTP/1.1. Each request body is read in full before the
//! application sees it.
//!
//! # Graceful shutdown
//!
//! On SIGTERM / Ctrl-C (or the custom signal passed to
//! [`serve_with_shutdown`](Server::serve_with_shutdown)) the server:
//!
//! 1. Stops accepting connections.
//! 2. Asks every open connection to finish its in-flight request and close.
//! 3. Waits up to the configured graceful timeout, then aborts stragglers.

use std::convert::Infallible;
use std::fmt;
use std::fs::File;
use std::future::Future;
use std::io::{self, BufReader};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::crypto::ring;
use tracing::{debug, error, info, warn};

use crate::api::{Api, App};
use crate::envelope::Envelope;
use crate::error::Error;
use crate::response::Response;

/// The HTTP server. Bind first, then [`serve`](Server::serve) an [`Api`].
///
/// ```rust,no_run
/// use baton::{Api, Server};
///
/// # async fn run(api: Api) -> Result<(), baton::Error> {
/// Server::bind("0.0.0.0:3000").await?.serve(api).await
/// # }
/// ```
pub struct Server {
    listener: Listener,
}

impl Server {
    /// Binds a TCP listener. Errors (address in use, bad address) surface here.
    pub async fn bind(addr: &str) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener: Listener::Tcp(listener) })
    }

    /// Loads a PEM certificate chain and private key, then binds a TCP listener
    /// that terminates TLS on every accepted connection.
    pub async fn bind_tls(
        addr: &str,
        cert_file: impl AsRef<Path>,
        key_file: impl AsRef<Path>,
    ) -> Result<Self, Error> {
        let acceptor = tls_acceptor(cert_file.as_ref(), key_file.as_ref())?;
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener: Listener::Tls(listener, acceptor) })
    }

    /// Binds a Unix-domain socket at `path`.
    ///
    /// A stale socket file left by a previous run is removed first. The
    /// socket file is removed again when the server stops.
    #[cfg(unix)]
    pub fn bind_unix(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed stale socket file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let listener = tokio::net::UnixListener::bind(path)?;
        Ok(Self {
            listener: Listener::Unix(listener, SocketFile(path.to_owned())),
        })
    }

    /// The bound TCP address; `None` for Unix sockets.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            Listener::Tcp(l) | Listener::Tls(l, _) => l.local_addr().ok(),
            #[cfg(unix)]
            Listener::Unix(..) => None,
        }
    }

    /// Serves `api` until SIGTERM or Ctrl-C, then shuts down gracefully.
    pub async fn serve<G>(self, api: Api<G>) -> Result<(), Error>
    where
        G: Send + Sync + 'static,
    {
        self.serve_with_shutdown(api, shutdown_signal()).await
    }

    /// Serves `api` until `signal` resolves, then shuts down gracefully.
    ///
    /// Fails before accepting anything if the route table does not compile.
    pub async fn serve_with_shutdown<G>(
        self,
        api: Api<G>,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error>
    where
        G: Send + Sync + 'static,
    {
        let grace = api.graceful_timeout();
        let app = Arc::new(api.compile()?);

        info!(listener = %self.listener, "baton listening");

        // Every connection holds a receiver; sending on `stop` asks them all
        // to finish their current request and close.
        let (stop, stopping) = watch::channel(());
        let mut tasks = JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting immediately,
                // even if more connections are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = self.listener.accept() => {
                    let conn = match res {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };
                    tasks.spawn(conn.serve(Arc::clone(&app), stopping.clone()));
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        let _ = stop.send(());

        let drain = async { while tasks.join_next().await.is_some() {} };
        if tokio::time::timeout(grace, drain).await.is_err() {
            warn!(remaining = tasks.len(), ?grace, "graceful timeout elapsed, aborting connections");
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }

        info!("baton stopped");
        Ok(())
    }
}

// ── Listeners ─────────────────────────────────────────────────────────────────

enum Listener {
    Tcp(TcpListener),
    Tls(TcpListener, TlsAcceptor),
    #[cfg(unix)]
    Unix(tokio::net::UnixListener, SocketFile),
}

impl Listener {
    async fn accept(&self) -> io::Result<Connection> {
        match self {
            Self::Tcp(l) => {
                let (stream, peer) = l.accept().await?;
                Ok(Connection::Tcp(stream, peer))
            }
            Self::Tls(l, acceptor) => {
                let (stream, peer) = l.accept().await?;
                Ok(Connection::Tls(stream, peer, acceptor.clone()))
            }
            #[cfg(unix)]
            Self::Unix(l, _) => {
                let (stream, _) = l.accept().await?;
                Ok(Connection::Unix(stream))
            }
        }
    }
}

impl fmt::Display for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(l) => match l.local_addr() {
                Ok(addr) => write!(f, "http://{addr}"),
                Err(_) => f.write_str("http://<unknown>"),
            },
            Self::Tls(l, _) => match l.local_addr() {
                Ok(addr) => write!(f, "https://{addr}"),
                Err(_) => f.write_str("https://<unknown>"),
            },
            #[cfg(unix)]
            Self::Unix(_, socket) => write!(f, "unix:{}", socket.0.display()),
        }
    }
}

/// Removes the socket file when the listener goes away.
#[cfg(unix)]
struct SocketFile(std::path::PathBuf);

#[cfg(unix)]
impl Drop for SocketFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn tls_acceptor(cert_file: &Path, key_file: &Path) -> Result<TlsAcceptor, Error> {
    let certs = rustls_pemfile::certs(&mut BufReader::new(File::open(cert_file)?))
        .collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(Error::Certificate(format!(
            "no certificates found in {}",
            cert_file.display()
        )));
    }

    let key = rustls_pemfile::private_key(&mut BufReader::new(File::open(key_file)?))?
        .ok_or_else(|| {
            Error::Certificate(format!("no private key found in {}", key_file.display()))
        })?;

    let mut config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}

// ── Connections ───────────────────────────────────────────────────────────────

enum Connection {
    Tcp(TcpStream, SocketAddr),
    Tls(TcpStream, SocketAddr, TlsAcceptor),
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
}

impl Connection {
    async fn serve<G>(self, app: Arc<App<G>>, stopping: watch::Receiver<()>)
    where
        G: Send + Sync + 'static,
    {
        match self {
            Self::Tcp(stream, peer) => serve_io(stream, &peer.to_string(), app, stopping).await,
            Self::Tls(stream, peer, acceptor) => match acceptor.accept(stream).await {
                Ok(stream) => serve_io(stream, &peer.to_string(), app, stopping).await,
                Err(e) => warn!(%peer, "tls handshake failed: {e}"),
            },
            #[cfg(unix)]
            Self::Unix(stream) => serve_io(stream, "unix", app, stopping).await,
        }
    }
}

async fn serve_io<I, G>(io: I, peer: &str, app: Arc<App<G>>, mut stopping: watch::Receiver<()>)
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    G: Send + Sync + 'static,
{
    // `service_fn` is called once per request on the connection, not once
    // per connection.
    let svc = service_fn(move |req| {
        let app = Arc::clone(&app);
        async move { Ok::<_, Infallible>(handle(app, req).await) }
    });

    let conn = http1::Builder::new().serve_connection(TokioIo::new(io), svc);
    tokio::pin!(conn);

    let res = tokio::select! {
        res = conn.as_mut() => res,
        _ = stopping.changed() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = res {
        error!(peer, "connection error: {e}");
    }
}

// ── Request handling ──────────────────────────────────────────────────────────

/// Buffers the body and hands the request to the application. A body that
/// cannot be read is answered with a 400 envelope.
async fn handle<G>(app: Arc<App<G>>, req: hyper::Request<Incoming>) -> http::Response<Full<Bytes>>
where
    G: Send + Sync + 'static,
{
    let (parts, body) = req.into_parts();
    let response = match body.collect().await {
        Ok(collected) => {
            app.handle(http::Request::from_parts(parts, collected.to_bytes())).await
        }
        Err(e) => {
            warn!(path = parts.uri.path(), "failed to read request body: {e}");
            Response::from(Envelope::bad_request().with_message("Unreadable request body"))
        }
    };
    response.into_inner()
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM (Unix) or Ctrl-C the process receives.
///
/// If a handler cannot be installed that signal source is ignored, and the
/// server keeps running until the other one fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
