//! Documentation of a shared pixel canvas.
//!
//! Many clients paint one N × N grid, one pixel at a time, each waiting out a
//! cooldown between placements. The canvas lives in memory and is backed up to
//! disk on a timer.
//!
//!
//!
//! # General Infrastructure
//! - Single process, single instance, no external database
//! - Canvas and cooldowns live in [`state::State`], shared by every request through an `Arc`
//! - One background task writes the canvas to a JSON backup every backup interval
//! - Running two instances against one backup file is not supported
//!
//!
//!
//! # Request Flow
//!
//! **Placement**: `POST /place-pixel` with `{ "userId", "x", "y", "color" }`
//!
//! - Body is validated field by field, every bad field is reported at once (400)
//! - The [`placement::Coordinator`] checks the user's cooldown, a rejection returns
//!   the remaining milliseconds (429) and leaves the canvas untouched
//! - Otherwise the cooldown is recorded, the pixel painted, and the cooldown
//!   duration returned so the client knows when to try again
//!
//! **Canvas**: `GET /canvas` returns `{ "canvas": [{ "x", "y", "color" }, ...] }`
//!
//!
//!
//! # Notes
//!
//! ## Identity
//! The user id is whatever the client sends. Anyone can claim any id, so the
//! cooldown keeps honest clients honest and nothing more.
//!
//! ## Locking
//! The canvas and the cooldown map each sit behind one lock, held for a single
//! read or write. No lock is ever held across an await point, so a slow backup
//! write never blocks placements.
//!
//!
//!
//! # Setup
//!
//! Run the server.
//! ```sh
//! RUST_LOG=info cargo run -p place-backend
//! ```
//!
//! Fire test placements at it.
//! ```sh
//! cargo run -p tester -- --users 20 --requests 5
//! ```
//!
//! All settings come from the environment, see [`config::Config`].
use std::{io, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderName, HeaderValue, Method,
        header::{
            CONTENT_SECURITY_POLICY, CONTENT_TYPE, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod backup;
pub mod canvas;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod placement;
pub mod routes;
pub mod state;
pub mod utils;

use backup::{backup_canvas, spawn_backups};
use routes::{canvas_handler, place_pixel_handler};
use state::State;

pub const BODY_LIMIT: usize = 10 * 1024;

pub async fn start_server() -> io::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new().await;

    let backups = spawn_backups(state.clone());

    info!("Starting server...");
    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");
    backups.abort();
    let _ = backup_canvas(&state).await;

    Ok(())
}

pub fn router(state: Arc<State>) -> Router {
    Router::new()
        .route("/canvas", get(canvas_handler))
        .route("/place-pixel", post(place_pixel_handler))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(security_header(X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(security_header(X_FRAME_OPTIONS, "SAMEORIGIN"))
        .layer(security_header(REFERRER_POLICY, "no-referrer"))
        .layer(security_header(CONTENT_SECURITY_POLICY, "default-src 'self'"))
        .with_state(state)
}

fn cors(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|e| warn!("Ignoring invalid CORS origin {origin}: {e}"))
                    .ok()
            })
            .collect();

        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}

fn security_header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
