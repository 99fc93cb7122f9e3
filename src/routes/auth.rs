use axum::{Json, Router, extract::State, routing::post};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    blacklist, error::AppResult, middleware::auth::AuthUser, response::ApiResponse,
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct RevokeResponse {
    pub revoked: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/revoke", post(revoke))
}

#[utoipa::path(
    post,
    path = "/api/auth/revoke",
    responses(
        (status = 200, description = "Token revoked", body = ApiResponse<RevokeResponse>),
        (status = 401, description = "Missing, invalid or already revoked token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn revoke(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<RevokeResponse>>> {
    blacklist::revoke_token(&state.client, &user.token, user.expires_at).await?;
    tracing::info!(user_id = %user.user_id, "token revoked");
    Ok(Json(ApiResponse::success(
        "Token revoked",
        RevokeResponse { revoked: true },
        None,
    )))
}
