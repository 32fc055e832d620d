use axum::{
    extract::{Json, Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    AppState,
    error::AppError,
    models::{CreateGroupRequest, Group, JoinRequest},
};

#[axum::debug_handler]
pub async fn create_group(
    State(state): State<AppState>,
    payload: Result<Json<CreateGroupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Group>), AppError> {
    let Json(req) = payload?;

    // 在进入存储层之前完成请求体校验
    if req.points.is_empty() {
        return Err(AppError::BadRequest(
            "points must contain at least one point".to_string(),
        ));
    }
    for point in &req.points {
        point.validate().map_err(AppError::BadRequest)?;
    }

    let group = state.store.create_group(req.points).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[axum::debug_handler]
pub async fn join_group(
    State(state): State<AppState>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<Json<Group>, AppError> {
    let Json(req) = payload?;

    if req.join_code.trim().is_empty() {
        return Err(AppError::BadRequest("joinCode must not be empty".to_string()));
    }
    req.point.validate().map_err(AppError::BadRequest)?;

    let group = state.store.join_group(&req.join_code, req.point).await?;
    Ok(Json(group))
}

#[axum::debug_handler]
pub async fn find_group(
    State(state): State<AppState>,
    Path(join_code): Path<String>,
) -> Result<Json<Group>, AppError> {
    let group = state.store.find_group(&join_code).await?;
    Ok(Json(group))
}
