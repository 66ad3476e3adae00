use axum::{
    Router,
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::{get, post},
};
use mutfak_feedback_service::notification::sweep::sweep_database;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::models::*;

use super::{AppState, login, require_admin};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/token", post(issue_token))
        .route("/process-low-ratings", get(process_low_ratings))
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service is up", body = MessageResponse),
    ),
    tag = "auth"
)]
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to the Mutfak restaurant feedback API".to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/token",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued successfully", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ApiErrorResponse),
        (status = 400, description = "Inactive user", body = ApiErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn issue_token(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    Ok(Json(
        login(&state, &payload.email, &payload.password, None).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/process-low-ratings",
    responses(
        (status = 200, description = "Sweep finished", body = ProcessLowRatingsResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Admin access required", body = ApiErrorResponse),
        (status = 500, description = "Submissions could not be loaded", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "auth"
)]
#[instrument(skip(state, headers))]
pub async fn process_low_ratings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProcessLowRatingsResponse>, ApiError> {
    let admin = require_admin(&headers, &state).await?;
    info!(admin = %admin.email, "Manual low rating sweep requested");

    let processed =
        sweep_database(&state.pool, state.notifier.as_ref(), state.settings.sweep_window()).await?;

    Ok(Json(ProcessLowRatingsResponse {
        message: format!("{processed} low rating notifications sent"),
        processed,
    }))
}
