//! HTTP API for the product key checker.

use std::sync::Arc;
use axum::{
    Router,
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use keycheck_core::{
    ActivationClient, CheckerConfig, ConfigCatalog, KeyCheckError, KeyCheckResult, KeyChecker,
    ValidationEngine,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Shared state behind the router.
pub struct AppState {
    pub checker: KeyChecker,
    pub activation: ActivationClient,
}

impl AppState {
    /// Assembles the state from `config`, reading the catalog into the
    /// process-wide [`ConfigCatalog::global`] on first use.
    pub fn from_config(
        config: &CheckerConfig,
        engine: Arc<dyn ValidationEngine>,
    ) -> KeyCheckResult<Self> {
        let catalog = ConfigCatalog::global(config);
        info!("{} pkeyconfig candidates loaded", catalog.len());

        let checker =
            KeyChecker::new(catalog, engine).with_marketplace_id(config.marketplace_id.clone());
        let activation = ActivationClient::new(config.activation.clone())?;
        Ok(Self {
            checker,
            activation,
        })
    }
}

/// Body of a check request.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyRequest {
    #[serde(alias = "ProductKey")]
    pub product_key: Option<String>,
}

async fn check_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<KeyRequest>,
) -> Response {
    let Some(product_key) = request.product_key.filter(|k| !k.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            "ProductKey must be provided and not empty.",
        )
            .into_response();
    };

    let worker = Arc::clone(&state);
    let checked =
        tokio::task::spawn_blocking(move || worker.checker.check_key(&product_key)).await;

    match checked {
        Ok(Ok(mut detail)) => {
            if let Some(pid) = detail.key_pid().map(str::to_owned) {
                detail.remaining_activations = Some(state.activation.query_remaining(&pid).await);
            }
            info!("Checked key, product: {}", detail.prd());
            Json(detail).into_response()
        }
        Ok(Err(KeyCheckError::NotFound)) => {
            (StatusCode::NOT_FOUND, "Key not found or invalid.").into_response()
        }
        Ok(Err(KeyCheckError::Input(message))) => {
            (StatusCode::BAD_REQUEST, message).into_response()
        }
        Ok(Err(e)) => internal_error(&e),
        Err(e) => internal_error(&e),
    }
}

fn internal_error(e: &dyn std::fmt::Display) -> Response {
    error!("Error checking product key: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Internal server error: {e}"),
    )
        .into_response()
}

/// Build the HTTP API router with the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/keychecker/check", post(check_handler))
        .with_state(state)
}
