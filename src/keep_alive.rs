use axum::{routing::get, Router};
use tracing::{error, info};

async fn alive() -> &'static str {
    "Bot is alive!"
}

/// Liveness route for the hosting platform. `get` also answers `HEAD`.
pub fn router() -> Router {
    Router::new().route("/", get(alive))
}

/// Serves the liveness route on `0.0.0.0:port` in a background task.
pub fn spawn(port: u16) {
    tokio::spawn(async move {
        let addr = format!("0.0.0.0:{}", port);
        let listener = match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind liveness endpoint on {}: {}", addr, e);
                return;
            }
        };

        info!("Liveness endpoint listening on {}", addr);
        if let Err(e) = axum::serve(listener, router()).await {
            error!("Liveness endpoint stopped: {}", e);
        }
    });
}
