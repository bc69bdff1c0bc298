//! Demo relay server.
//!
//! Run with: cargo run -p relay-server-demo
//!
//! Open http://localhost:3000 to mint a fresh session token. The page shows a
//! snippet to paste into any page's console to start broadcasting, plus a
//! watch link that replays the full event history and then follows live.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use session_relay_core::{SessionRegistry, generate_token};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across page handlers.
#[derive(Clone)]
struct AppState {
    registry: Arc<SessionRegistry>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let registry = Arc::new(SessionRegistry::new());
    let state = AppState {
        registry: Arc::clone(&registry),
    };

    let app = Router::new()
        .route("/", get(new_session_page))
        .route("/{token}", get(watch_page))
        .route("/{token}/broadcast.js", get(broadcast_script))
        .with_state(state)
        .merge(session_relay_transport::router(registry))
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive());

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind listener")?;
    tracing::info!("now running on http://{addr}");
    axum::serve(listener, app).await.context("serve")?;

    Ok(())
}

fn host_from(headers: &HeaderMap) -> &str {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:3000")
}

fn ws_scheme(host: &str) -> &'static str {
    if host.starts_with("localhost") || host.starts_with("127.") {
        "ws"
    } else {
        "wss"
    }
}

/// Root page: mints a token and explains how to broadcast and how to watch.
async fn new_session_page(headers: HeaderMap) -> Html<String> {
    let token = generate_token();
    Html(
        NEW_SESSION_HTML
            .replace("__HOST__", host_from(&headers))
            .replace("__TOKEN__", &token),
    )
}

/// Bootstrap script: opens the relay channel and emits timestamped events.
async fn broadcast_script(Path(token): Path<String>, headers: HeaderMap) -> impl IntoResponse {
    let host = host_from(&headers);
    let body = BROADCAST_JS
        .replace("__SCHEME__", ws_scheme(host))
        .replace("__HOST__", host)
        .replace("__TOKEN__", &token);
    ([(header::CONTENT_TYPE, "text/javascript")], body)
}

/// Viewer page. Shows the live event feed, or "Session not found" for a token
/// no endpoint has ever connected to.
async fn watch_page(
    Path(token): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    if state.registry.get(&token).is_none() {
        return "Session not found".into_response();
    }
    let host = host_from(&headers);
    Html(
        WATCH_HTML
            .replace("__SCHEME__", ws_scheme(host))
            .replace("__HOST__", host)
            .replace("__TOKEN__", &token),
    )
    .into_response()
}

const NEW_SESSION_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <title>New session</title>
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  </head>
  <body>
    <p>To start broadcasting, paste the following code in the console of the page you want to stream from:</p>
    <code>(function(d,s){var t=d.getElementsByTagName(s)[0],n=d.createElement(s);n.async=true;n.src='//__HOST__/__TOKEN__/broadcast.js';t.parentNode.insertBefore(n,t)})(document,'script');</code>
    <p>To watch the session, go <a href="/__TOKEN__">here</a>.</p>
  </body>
</html>
"#;

const BROADCAST_JS: &str = r#"(function() {
  var socket = new WebSocket('__SCHEME__://__HOST__/__TOKEN__/websocket');
  socket.addEventListener('open', function() {
    var emit = function(event) {
      socket.send(JSON.stringify(event));
    };
    // Anything serializable can go through; the relay treats it as opaque.
    window.sessionRelayEmit = emit;
    emit({ timestamp: Date.now(), type: 'session-start', href: location.href });
    document.addEventListener('click', function(e) {
      emit({ timestamp: Date.now(), type: 'click', x: e.clientX, y: e.clientY });
    });
    document.addEventListener('visibilitychange', function() {
      emit({ timestamp: Date.now(), type: 'visibility', state: document.visibilityState });
    });
  });
})();
"#;

const WATCH_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <title>Session __TOKEN__</title>
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <style>
      body, html { margin: 0; padding: 0; }
      body { background-color: #111; color: #ddd; font-family: monospace; padding: 1rem; }
      h1 { font-size: 1rem; }
      li { white-space: pre-wrap; }
    </style>
  </head>
  <body>
    <h1>Session __TOKEN__</h1>
    <ol id="feed"></ol>
    <script>
      const feed = document.getElementById('feed');
      const ws = new WebSocket('__SCHEME__://__HOST__/__TOKEN__/websocket');
      ws.addEventListener('message', (message) => {
        const item = document.createElement('li');
        item.textContent = message.data;
        feed.appendChild(item);
      });
    </script>
  </body>
</html>
"#;
