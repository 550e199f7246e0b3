use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};

use super::api::{AppState, create_api_router};
use crate::device_manager::SharedManager;

pub async fn start_web_server(
    manager: SharedManager,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState { manager };

    // Create API router
    let api_router = create_api_router(state);

    let app = Router::new().nest("/api", api_router).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Web server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e).into())
}
