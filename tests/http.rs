mod common;

use std::fmt;
use std::sync::{Arc, Mutex};

use baton::{Api, Context, Envelope, Logger, chain};
use serde::Deserialize;
use serde_json::json;

use common::TestServer;

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn auth(ctx: Context) -> Envelope {
    if ctx.query("token") == Some("secret") {
        Envelope::next()
    } else {
        Envelope::forbidden()
    }
}

async fn echo(_ctx: Context) -> Envelope {
    Envelope::ok("secret")
}

async fn hello(_ctx: Context) -> Envelope {
    Envelope::ok("hello")
}

async fn empty(_ctx: Context) -> Envelope {
    Envelope::ok(())
}

async fn validate_token(ctx: Context) -> Envelope {
    match ctx.query("token") {
        None => Envelope::forbidden().with_message("Token required"),
        Some(token) if !token.starts_with('S') => {
            Envelope::bad_request().with_message("Invalid token")
        }
        Some(_) => Envelope::next(),
    }
}

#[derive(Deserialize)]
struct Session {
    session_id: Option<String>,
}

async fn validate_session(ctx: Context) -> Envelope {
    let Ok(session) = ctx.json::<Session>() else {
        return Envelope::bad_request().with_message("No body");
    };
    match session.session_id.as_deref() {
        None => Envelope::forbidden().with_message("Session required"),
        Some(id) if !id.starts_with("ID") => {
            Envelope::bad_request().with_message("Invalid session")
        }
        Some(id) => Envelope::next_with(id.to_owned()),
    }
}

async fn stamp(ctx: Context) -> Envelope {
    Envelope::ok(json!({
        "date": chrono::Utc::now().to_rfc3339(),
        "response": ctx.into_previous().into_data(),
    }))
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn forbidden_without_token() {
    let server = TestServer::start(
        Api::builder().map("get", "/secured", chain![auth, echo]).build(),
    )
    .await;

    let reply = server.get("/secured").await;

    assert_eq!(reply.status, 403);
    assert_eq!(
        reply.body,
        r#"{"successful":false,"data":null,"error":{"code":403,"message":"Forbidden","data":null}}"#,
    );
    server.stop().await;
}

#[tokio::test]
async fn authorized_request_reaches_second_handler() {
    let server = TestServer::start(
        Api::builder().map("get", "/secured", chain![auth, echo]).build(),
    )
    .await;

    let reply = server.get("/secured?token=secret").await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, r#"{"successful":true,"data":"secret"}"#);
    server.stop().await;
}

#[tokio::test]
async fn end_hook_wraps_every_response() {
    let server = TestServer::start(
        Api::builder()
            .map("get", "/path1", chain![hello])
            .map("get", "/path2", chain![empty])
            .end_handler(stamp)
            .build(),
    )
    .await;

    let reply = server.get("/path1").await;
    assert_eq!(reply.status, 200);
    let body = reply.json();
    assert_eq!(body["successful"], json!(true));
    assert_eq!(body["data"]["response"], json!("hello"));
    assert!(!body["data"]["date"].as_str().unwrap().is_empty());
    assert!(body.get("error").is_none());

    let body = server.get("/path2").await.json();
    assert_eq!(body["data"]["response"], json!(null));
    server.stop().await;
}

#[tokio::test]
async fn unsupported_verb_leaves_path_unrouted() {
    let server = TestServer::start(
        Api::builder()
            .map("banana", "/x", chain![echo])
            .end_handler(stamp)
            .build(),
    )
    .await;

    for method in ["GET", "POST", "PUT", "PATCH", "DELETE"] {
        let reply = server.send(method, "/x", None).await;
        assert_eq!(reply.status, 404, "{method}");
        assert!(reply.body.is_empty(), "{method}");
    }
    server.stop().await;
}

#[tokio::test]
async fn every_supported_verb_is_served() {
    let server = TestServer::start(
        Api::builder()
            .map("get,post,put,patch,delete", "/a/b/c/d/e", chain![empty])
            .build(),
    )
    .await;

    for method in ["GET", "POST", "PUT", "PATCH", "DELETE"] {
        let body = Some(r#"{"data":"dnepr"}"#).filter(|_| method != "GET" && method != "DELETE");
        let reply = server.send(method, "/a/b/c/d/e", body).await;
        assert_eq!(reply.status, 200, "{method}");
        assert_eq!(reply.body, r#"{"successful":true,"data":null}"#);
    }
    server.stop().await;
}

async fn check_secured_endpoint(server: &TestServer, path: &str) {
    let reply = server.post(path, "").await;
    assert_eq!(reply.failure(), (403, "Token required".to_owned()));

    let reply = server.post(&format!("{path}?token=123"), "").await;
    assert_eq!(reply.failure(), (400, "Invalid token".to_owned()));

    let reply = server.post(&format!("{path}?token=S123"), "").await;
    assert_eq!(reply.failure(), (400, "No body".to_owned()));

    let reply = server.post(&format!("{path}?token=S123"), "{}").await;
    assert_eq!(reply.failure(), (403, "Session required".to_owned()));

    let reply = server.post(&format!("{path}?token=S123"), r#"{"session_id":"qwerty"}"#).await;
    assert_eq!(reply.failure(), (400, "Invalid session".to_owned()));

    let reply = server.post(&format!("{path}?token=S123"), r#"{"session_id":"ID12345"}"#).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.json()["successful"], json!(true));
}

#[tokio::test]
async fn chained_validation() {
    async fn message(ctx: Context) -> Envelope {
        Envelope::ok(json!({ "session": ctx.previous().data() }))
    }

    let server = TestServer::start(
        Api::builder()
            .map("post", "/protected/area", chain![validate_token, validate_session, message])
            .build(),
    )
    .await;

    check_secured_endpoint(&server, "/protected/area").await;

    let reply = server
        .post("/protected/area?token=S123", r#"{"session_id":"ID12345"}"#)
        .await;
    assert_eq!(reply.json()["data"], json!({ "session": "ID12345" }));
    server.stop().await;
}

#[tokio::test]
async fn init_hook_validates_every_route() {
    async fn init(ctx: Context) -> Envelope {
        match validate_token_ref(&ctx) {
            Some(rejected) => rejected,
            None => validate_session(ctx).await,
        }
    }

    fn validate_token_ref(ctx: &Context) -> Option<Envelope> {
        match ctx.query("token") {
            None => Some(Envelope::forbidden().with_message("Token required")),
            Some(token) if !token.starts_with('S') => {
                Some(Envelope::bad_request().with_message("Invalid token"))
            }
            Some(_) => None,
        }
    }

    let server = TestServer::start(
        Api::builder()
            .init_handler(init)
            .map("post", "/path1", chain![empty])
            .map("post", "/path2", chain![hello])
            .build(),
    )
    .await;

    check_secured_endpoint(&server, "/path1").await;
    check_secured_endpoint(&server, "/path2").await;
    server.stop().await;
}

#[tokio::test]
async fn route_handler_doubles_as_init_hook() {
    let server = TestServer::start(
        Api::builder()
            .init_handler(validate_token)
            .map("get", "/open", chain![hello])
            .build(),
    )
    .await;

    assert_eq!(server.get("/open").await.failure(), (403, "Token required".to_owned()));
    assert_eq!(server.get("/open?token=S1").await.json()["data"], json!("hello"));
    server.stop().await;
}

#[tokio::test]
async fn global_context_is_visible_to_handlers() {
    async fn pass_global(ctx: Context<serde_json::Value>) -> Envelope {
        Envelope::ok(ctx.global().clone())
    }

    let server = TestServer::start(
        Api::with_global(json!({ "bebe": "meme" }))
            .map("get", "/global-context", baton::Chain::new(pass_global))
            .build(),
    )
    .await;

    let reply = server.get("/global-context").await;
    assert_eq!(reply.json()["data"]["bebe"], json!("meme"));
    server.stop().await;
}

#[derive(Clone, Default)]
struct RecordingLogger(Arc<Mutex<Vec<String>>>);

impl RecordingLogger {
    fn push(&self, level: &str, args: fmt::Arguments<'_>) {
        self.0.lock().unwrap().push(format!("[{level}] {args}"));
    }
}

impl Logger for RecordingLogger {
    fn debug(&self, args: fmt::Arguments<'_>) { self.push("debug", args) }
    fn info(&self, args: fmt::Arguments<'_>) { self.push("info", args) }
    fn warn(&self, args: fmt::Arguments<'_>) { self.push("warn", args) }
    fn error(&self, args: fmt::Arguments<'_>) { self.push("error", args) }
}

#[tokio::test]
async fn handlers_log_through_configured_logger() {
    async fn logging(ctx: Context) -> Envelope {
        let who = "World";
        ctx.logger().debug(format_args!("Hello {who}"));
        ctx.logger().info(format_args!("Hello {who}"));
        ctx.logger().warn(format_args!("Hello {who}"));
        ctx.logger().error(format_args!("Hello {who}"));
        Envelope::ok(())
    }

    let logger = RecordingLogger::default();
    let server = TestServer::start(
        Api::builder()
            .logger(logger.clone())
            .map("get", "/log", chain![logging])
            .build(),
    )
    .await;

    assert_eq!(server.get("/log").await.status, 200);
    assert_eq!(
        *logger.0.lock().unwrap(),
        [
            "[debug] Hello World",
            "[info] Hello World",
            "[warn] Hello World",
            "[error] Hello World",
        ],
    );
    server.stop().await;
}

#[tokio::test]
async fn handler_errors_become_internal_errors() {
    async fn parse(ctx: Context) -> Result<Envelope, std::num::ParseIntError> {
        let n: i64 = ctx.query("n").unwrap_or_default().parse()?;
        Ok(Envelope::ok(n * 2))
    }

    let server = TestServer::start(Api::builder().map("get", "/double", chain![parse]).build()).await;

    assert_eq!(server.get("/double?n=21").await.json()["data"], json!(42));

    let reply = server.get("/double?n=x").await;
    assert_eq!(reply.failure().0, 500);
    server.stop().await;
}
