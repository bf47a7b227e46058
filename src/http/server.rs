//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the page and API handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener and stop on the shutdown signal

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::http::page;
use crate::http::request::{make_span, propagate_request_id_layer, set_request_id_layer};
use crate::http::response::{ApiError, MintResponse};
use crate::mint::{Minter, RequestView, StatusView};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub minter: Arc<Minter>,
}

/// HTTP server for the status page and API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(minter: Arc<Minter>, request_timeout: Duration) -> Self {
        let router = Self::build_router(AppState { minter }, request_timeout);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/api/status", get(status))
            .route("/api/wallet", post(select_wallet))
            .route("/api/mint", post(mint))
            .route("/api/request", get(request))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(
                        TraceLayer::new_for_http()
                            .make_span_with(|req: &Request<Body>| make_span(req)),
                    )
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::new(request_timeout)),
            )
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let status = state.minter.status().await;
    Html(page::render(&status, &state.minter.wallet_ids()))
}

async fn status(State(state): State<AppState>) -> Json<StatusView> {
    Json(state.minter.status().await)
}

#[derive(Debug, Deserialize)]
struct WalletSelection {
    wallet: Option<String>,
}

async fn select_wallet(
    State(state): State<AppState>,
    Json(selection): Json<WalletSelection>,
) -> Result<Json<StatusView>, ApiError> {
    state.minter.connect_wallet(selection.wallet.as_deref()).await?;
    Ok(Json(state.minter.status().await))
}

async fn mint(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let tx_hash = state.minter.mint().await?;
    Ok(Json(MintResponse {
        tx_hash: tx_hash.to_string(),
        explorer_url: state.minter.network().explorer_tx_url(&tx_hash),
    }))
}

async fn request(State(state): State<AppState>) -> Result<Json<RequestView>, ApiError> {
    let view = state
        .minter
        .request()
        .and_then(|r| r.view())
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{KeyWalletExtension, Network, ScriptType, WalletRegistry};
    use crate::config::MinterConfig;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let mut config = MinterConfig::default();
        config.policy.script_type = ScriptType::PlutusV2;
        config.policy.script = "480100002221200101".into();
        let mut registry = WalletRegistry::new();
        registry.register(
            "local",
            Arc::new(KeyWalletExtension::from_env("local", Network::Preprod, "MINTER_TEST_UNSET_KEY_VAR")),
        );
        let minter = Arc::new(Minter::new(&config, registry).unwrap());
        HttpServer::new(minter, Duration::from_secs(5))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let response = server()
            .router()
            .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let status = body_json(response).await;
        assert_eq!(status["network"], "Preprod");
        assert_eq!(status["connected"], false);
    }

    #[tokio::test]
    async fn test_mint_without_wallet() {
        let response = server()
            .router()
            .oneshot(Request::post("/api/mint").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Wallet is not connected.");
    }

    #[tokio::test]
    async fn test_disconnect_via_api() {
        let response = server()
            .router()
            .oneshot(
                Request::post("/api/wallet")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"wallet":null}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["connected"], false);
    }

    #[tokio::test]
    async fn test_index_renders_page() {
        let response = server()
            .router()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Mint CIP-68 Token"));
        assert!(html.contains("selectWallet('local')"));
    }
}
