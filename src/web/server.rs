use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use super::{api, ws, AppState};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(api::health_check))
        // Engine lifecycle
        .route("/api/initialize", post(api::post_initialize))
        .route("/api/load", post(api::post_load))
        .route("/api/train", post(api::post_train))
        .route("/api/process", post(api::post_process))
        // Inspection
        .route("/api/tree", get(api::get_tree))
        .route("/api/status", get(api::get_status))
        .route("/api/nodes/:id", get(api::get_node))
        // WebSocket
        .route("/ws", get(ws::websocket_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Engine server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
