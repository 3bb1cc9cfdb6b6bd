use std::sync::Arc;

use anyhow::Context;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use pacman_arena_server::config::{ServerArgs, ServerConfig};
use pacman_arena_server::constants::OUTBOX_CAPACITY;
use pacman_arena_server::matchmaking::Matchmaker;
use pacman_arena_server::server_protocol::{parse_client_message, ParsedClientMessage};
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type SharedMatchmaker = Arc<Matchmaker>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_args(ServerArgs::parse());
    let level = config.load_level().with_context(|| match &config.level_path {
        Some(path) => format!("failed to load level {}", path.display()),
        None => "failed to parse built-in level".to_string(),
    })?;
    info!(
        width = level.grid.width(),
        height = level.grid.height(),
        "level loaded"
    );

    let matchmaker: SharedMatchmaker = Arc::new(Matchmaker::new(Arc::new(level)));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/pacman", get(ws_handler))
        .with_state(matchmaker);

    let app = if let Some(static_dir) = config.resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        app
    };

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!(port = config.port, "listening");
    axum::serve(listener, app)
        .await
        .context("server runtime failed")?;
    Ok(())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(matchmaker): State<SharedMatchmaker>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(matchmaker, socket))
}

async fn handle_socket(matchmaker: SharedMatchmaker, socket: WebSocket) {
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOX_CAPACITY);
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    let participant = matchmaker.join(tx).await;

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };
        match message {
            Message::Text(raw) => {
                handle_client_message(&matchmaker, &participant, raw.as_str()).await
            }
            Message::Binary(raw) => match String::from_utf8(raw.to_vec()) {
                Ok(text) => handle_client_message(&matchmaker, &participant, &text).await,
                Err(_) => debug!(participant = %participant, "ignoring non-utf8 frame"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    matchmaker.leave(&participant).await;
    writer.abort();
    info!(participant = %participant, "connection closed");
}

async fn handle_client_message(matchmaker: &Matchmaker, participant: &str, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        debug!(participant = %participant, "ignoring malformed message");
        return;
    };
    match message {
        ParsedClientMessage::KeyEvent(intent) => {
            matchmaker.route_intent(participant, intent).await;
        }
    }
}
