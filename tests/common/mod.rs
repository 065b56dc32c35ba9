#![allow(dead_code)]

use std::net::SocketAddr;

use baton::{Api, Error, Server};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A server running on an ephemeral localhost port until [`stop`](TestServer::stop).
pub struct TestServer {
    pub addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<(), Error>>,
}

impl TestServer {
    pub async fn start<G: Send + Sync + 'static>(api: Api<G>) -> Self {
        let server = Server::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve_with_shutdown(api, async move {
            let _ = stopped.await;
        }));
        Self { addr, stop, task }
    }

    pub async fn get(&self, path: &str) -> Reply {
        self.send("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: &str) -> Reply {
        self.send("POST", path, Some(body)).await
    }

    pub async fn send(&self, method: &str, path: &str, body: Option<&str>) -> Reply {
        let stream = TcpStream::connect(self.addr).await.unwrap();
        exchange(stream, method, path, body).await
    }

    pub async fn stop(self) {
        self.stop.send(()).unwrap();
        self.task.await.unwrap().unwrap();
    }
}

/// Status and raw body of one HTTP response.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }

    /// `(status, error.message)` of a failure envelope.
    pub fn failure(&self) -> (u16, String) {
        let body = self.json();
        assert_eq!(body["successful"], Value::Bool(false), "{}", self.body);
        assert_eq!(body["error"]["code"], Value::from(self.status));
        (self.status, body["error"]["message"].as_str().unwrap().to_owned())
    }
}

/// Writes one HTTP/1.1 request with `Connection: close` and reads the reply.
pub async fn exchange<S>(mut stream: S, method: &str, path: &str, body: Option<&str>) -> Reply
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let body = body.unwrap_or("");
    let request = format!(
        "{method} {path} HTTP/1.1\r\n\
         Host: localhost\r\n\
         Connection: close\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         \r\n\
         {body}",
        body.len(),
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    read_reply(stream).await
}

/// Reads until the server closes the connection and parses the reply.
pub async fn read_reply<S>(mut stream: S) -> Reply
where
    S: AsyncRead + Unpin,
{
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8(raw).unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
    Reply { status, body: body.to_owned() }
}
