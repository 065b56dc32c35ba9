//! Minimal baton example: a public route, a token-protected chain, and an
//! end hook that stamps every response.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:9999/time
//!   curl http://localhost:9999/secret
//!   curl 'http://localhost:9999/secret?apiToken=0123456789'
//!   curl -X POST http://localhost:9999/echo -d '{"name":"alice"}'

use baton::{Api, Context, Envelope, chain};
use serde::Deserialize;
use serde_json::json;

struct Settings {
    api_token: &'static str,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let api = Api::with_global(Settings { api_token: "0123456789" })
        .map("get", "/time", chain![time])
        .map("get", "/secret", chain![auth, secret])
        .map("post, put", "/echo", chain![echo])
        .end_handler(stamp)
        .build();

    if let Err(e) = api.run("0.0.0.0:9999").await {
        eprintln!("server error: {e}");
        std::process::exit(1);
    }
}

// GET /time
async fn time(_ctx: Context<Settings>) -> Envelope {
    Envelope::ok(chrono::Utc::now().to_rfc3339())
}

// Passes the request on only when `?apiToken=` matches the configured token.
async fn auth(ctx: Context<Settings>) -> Envelope {
    if ctx.query("apiToken") == Some(ctx.global().api_token) {
        return Envelope::next();
    }
    ctx.logger().warn(format_args!("rejected {} without a valid token", ctx.request().path()));
    Envelope::forbidden()
}

// GET /secret
async fn secret(_ctx: Context<Settings>) -> Envelope {
    Envelope::ok("secret")
}

#[derive(Deserialize)]
struct Greeting {
    name: String,
}

// POST|PUT /echo
async fn echo(ctx: Context<Settings>) -> Envelope {
    match ctx.json::<Greeting>() {
        Ok(greeting) => Envelope::ok(format!("hello {}", greeting.name)),
        Err(e) => Envelope::bad_request().with_message(e.to_string()),
    }
}

// Wraps every successful payload as {"date": …, "response": …}.
async fn stamp(ctx: Context<Settings>) -> Envelope {
    let result = ctx.into_previous();
    if !result.is_successful() {
        return result;
    }
    Envelope::ok(json!({
        "date": chrono::Utc::now().to_rfc3339(),
        "response": result.into_data(),
    }))
}
