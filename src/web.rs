//! HTTP routes.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /` | HTML page, always 200 (failures show as a notice) |
//! | `GET /api/news` | JSON [`NewsPage`], 502 when upstream failed |
//! | `GET /healthz` | `ok` |

use crate::models::NewsPage;
use crate::outputs::html::PageRenderer;
use crate::service::NewsService;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

pub struct AppState {
    pub service: NewsService,
    pub pages: PageRenderer,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/news", get(news_json))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Serve until Ctrl-C.
#[instrument(level = "info", skip_all, fields(addr = %addr))]
pub async fn serve(state: AppState, addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(local_addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await
}

/// Resolves when `signal` fires. If the handler cannot be installed, never
/// resolves, so the server keeps running instead of shutting down at once.
async fn shutdown_on(signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        error!(error = %e, "Could not install Ctrl-C handler; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn index(State(state): State<Arc<AppState>>) -> Response {
    let page = state.service.load_page(Utc::now()).await;
    match state.pages.render_page(&page) {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            error!(error = %e, "Rendering the news page failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

async fn news_json(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let page: NewsPage = state.service.load_page(Utc::now()).await;
    let status = if page.is_unavailable() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    (status, Json(page))
}

async fn healthz() -> &'static str {
    "ok"
}
