pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod rate_limit;
pub mod state;
pub mod ws;

use axum::Router;
use axum::routing::get;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let web_root = config.web_root.clone();
    let state = AppState::new(config);

    let api_routes = Router::new().route("/sessions/{code}", get(api::get_session));

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_routes)
        .fallback_service(ServeDir::new(&web_root))
        .with_state(state.clone());

    (app, state)
}

/// Background task that closes idle sessions and, when a phase timeout is
/// configured, forces stalled phases forward.
pub fn spawn_session_sweeper(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let sessions = &state.config.sessions;
        let idle_timeout = sessions.idle_timeout();
        let phase_timeout = sessions.phase_timeout();
        let mut interval = tokio::time::interval(sessions.sweep_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let report = state
                .gateway
                .write()
                .await
                .sweep(idle_timeout, phase_timeout);
            if report != gateway::SweepReport::default() {
                tracing::info!(
                    closed = report.closed,
                    forced = report.forced,
                    reaped = report.reaped,
                    "Session sweep"
                );
            }
        }
    })
}
