use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::{AppState, middleware::log_errors};

pub mod group;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// 组装群组 API 路由；限流和 CORS 由 `main` 按配置叠加
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/groups", post(group::create_group))
        .route("/groups/{join_code}", get(group::find_group))
        .route("/join", post(group::join_group))
        .route("/health", get(health));

    let router = match state.config.api_base_uri.as_deref() {
        Some(base) => Router::new().nest(base, api),
        None => api,
    };

    router
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state)
}
