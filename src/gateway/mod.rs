pub mod auth;
pub mod protocol;

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use futures::SinkExt;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::MidConfig;
use crate::dialogue::{DialogueEngine, DialogueOptions};
use crate::store::memory::InMemoryStore;
use crate::store::rest::RestStore;
use crate::store::{MediaStore, MemoryStore};

/// Shared gateway state. The stores are shared across connections; each
/// connection gets its own dialogue engine, so sessions stay independent.
pub struct AppState {
    pub token: Option<String>,
    pub memories: Arc<dyn MemoryStore>,
    pub media: Arc<dyn MediaStore>,
    pub options: DialogueOptions,
}

/// Build store handles from the configured backend mode.
pub fn build_stores(
    config: &MidConfig,
) -> anyhow::Result<(Arc<dyn MemoryStore>, Arc<dyn MediaStore>)> {
    match config.backend.mode.as_str() {
        "rest" => {
            let base = config
                .backend
                .base_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("backend.base_url is required for rest mode"))?;
            let store = Arc::new(RestStore::new(base, config.backend.token.clone())?);
            let memories: Arc<dyn MemoryStore> = store.clone();
            let media: Arc<dyn MediaStore> = store;
            Ok((memories, media))
        }
        _ => {
            let store = Arc::new(InMemoryStore::new());
            let memories: Arc<dyn MemoryStore> = store.clone();
            let media: Arc<dyn MediaStore> = store;
            Ok((memories, media))
        }
    }
}

pub async fn run(config: MidConfig, token: Option<String>) -> anyhow::Result<()> {
    let is_loopback = config.gateway.bind == "127.0.0.1" || config.gateway.bind == "::1";

    if !is_loopback && token.is_none() {
        anyhow::bail!(
            "Auth token required when binding to non-loopback address. \
             Set --token or MID_TOKEN env var."
        );
    }

    let addr = format!("{}:{}", config.gateway.bind, config.gateway.port);
    let (memories, media) = build_stores(&config)?;

    let state = Arc::new(AppState {
        token,
        memories,
        media,
        options: DialogueOptions {
            listing_limit: config.diary.listing_limit,
        },
    });

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("mid gateway listening on {addr}");
    if is_loopback {
        info!("bound to loopback — local access only");
    } else {
        warn!("bound to {addr} — ensure auth token is set");
    }

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(mut socket: WebSocket, state: Arc<AppState>) {
    if state.token.is_some() {
        // First message must be auth when token auth is enabled.
        let authed = match socket.recv().await {
            Some(Ok(Message::Text(msg))) => auth::verify_connect(&msg, &state.token),
            _ => false,
        };

        if !authed {
            let _ = socket
                .send(Message::Text(
                    r#"{"error":"auth_failed","code":4001}"#.into(),
                ))
                .await;
            let _ = socket.close().await;
            return;
        }
    }

    let hello = format!(
        r#"{{"ok":true,"version":"{}"}}"#,
        env!("CARGO_PKG_VERSION")
    );
    let _ = socket.send(Message::Text(hello.into())).await;

    info!("client connected");

    // One engine per connection: one diary session with its own active
    // flow, serialized by the message loop below.
    let mut engine = DialogueEngine::with_options(
        Arc::clone(&state.memories),
        Arc::clone(&state.media),
        state.options.clone(),
    );

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let response = protocol::handle_rpc(&text, &mut engine).await;
                if socket.send(Message::Text(response.into())).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    info!("client disconnected");
}
