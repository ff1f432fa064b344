//! API token endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, models::user::Credentials};

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Exchange a username and password for the user's API token
#[utoipa::path(
    post,
    path = "/api-token-auth/",
    tag = "auth",
    request_body = Credentials,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing or invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn obtain_auth_token(
    State(state): State<crate::AppState>,
    credentials: Result<Json<Credentials>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(credentials) = credentials?;
    let token = state.services.auth.obtain_token(&credentials).await?;
    tracing::info!(user_id = token.user_id, "API token issued");
    Ok(Json(TokenResponse { token: token.key }))
}
