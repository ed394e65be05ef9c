use anyhow::{Context, Result};
use std::time::Duration;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{
    admin::make_admin_routes, auth::require_basic_auth, log_requests, metrics::metrics_handler,
    songs::make_song_routes, state::*, ServerConfig,
};

#[derive(Serialize)]
struct ServerStats {
    pub name: &'static str,
    pub version: &'static str,
    pub uptime: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime: format_uptime(state.start_time.elapsed()),
    })
}

pub fn make_app(
    config: ServerConfig,
    library: GuardedLibrary,
    scheduler_handle: OptionalSchedulerHandle,
) -> Result<Router> {
    let state = ServerState::new(config, library, scheduler_handle);

    let protected_routes: Router = make_song_routes(state.clone())
        .nest("/admin", make_admin_routes(state.clone()))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ));

    let app: Router = Router::new()
        .route("/", get(home))
        .route("/metrics", get(metrics_handler))
        .with_state(state.clone())
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

/// Serves until `shutdown_token` is cancelled.
pub async fn run_server(
    config: ServerConfig,
    library: GuardedLibrary,
    scheduler_handle: OptionalSchedulerHandle,
    shutdown_token: CancellationToken,
) -> Result<()> {
    let address = format!("{}:{}", config.host, config.port);
    let app = make_app(config, library, scheduler_handle)?;

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Ready to serve at {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}
