use axum::{Json, Router, extract::State, routing::post};
use serde_json::Value as JsonValue;

use crate::{
    engine::Operation,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/query", post(run_query))
        .route("/batch", post(run_batch))
}

#[utoipa::path(
    post,
    path = "/api/query",
    request_body = Operation,
    responses(
        (status = 200, description = "Operation result wrapped in `ApiResponse`"),
        (status = 400, description = "Invalid arguments"),
        (status = 404, description = "Record not found"),
        (status = 409, description = "Constraint violation")
    ),
    security(("bearer_auth" = [])),
    tag = "Query"
)]
pub async fn run_query(
    State(state): State<AppState>,
    user: AuthUser,
    Json(op): Json<Operation>,
) -> AppResult<Json<ApiResponse<JsonValue>>> {
    let invocation = op.model.map(|model| (model, op.action));
    let meta = Meta::operation(op.model, op.action);
    tracing::debug!(user_id = %user.user_id, action = %op.action, "query");

    let data = state.client.execute(op).await.map_err(|err| {
        AppError::invocation(err, state.client.config().error_format, invocation)
    })?;
    let meta = meta.counting(&data);
    Ok(Json(ApiResponse::success("OK", data, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/batch",
    request_body = Vec<Operation>,
    responses(
        (status = 200, description = "Results in operation order, wrapped in `ApiResponse`"),
        (status = 400, description = "Invalid arguments"),
        (status = 408, description = "Transaction timed out")
    ),
    security(("bearer_auth" = [])),
    tag = "Query"
)]
pub async fn run_batch(
    State(state): State<AppState>,
    user: AuthUser,
    Json(ops): Json<Vec<Operation>>,
) -> AppResult<Json<ApiResponse<Vec<JsonValue>>>> {
    let total = ops.len();
    tracing::debug!(user_id = %user.user_id, operations = total, "batch");

    let data = state
        .client
        .batch(ops)
        .await
        .map_err(|err| AppError::invocation(err, state.client.config().error_format, None))?;
    Ok(Json(ApiResponse::success(
        "OK",
        data,
        Some(Meta::empty().with_count(total)),
    )))
}
