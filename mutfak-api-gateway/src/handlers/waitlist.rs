use axum::{
    Router,
    extract::{Query, State},
    http::HeaderMap,
    response::Json,
    routing::post,
};
use mutfak_feedback_service::store::{self, Page, waitlist::WaitlistStore};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::models::*;

use super::{AppState, require_admin};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/waitlist", post(join_waitlist).get(list_waitlist))
}

#[utoipa::path(
    post,
    path = "/api/waitlist",
    request_body = WaitlistRequest,
    responses(
        (status = 200, description = "Email added to the waitlist", body = WaitlistResponse),
        (status = 400, description = "Email already on the waitlist", body = ApiErrorResponse),
        (status = 422, description = "Invalid email", body = ApiErrorResponse),
    ),
    tag = "waitlist"
)]
#[instrument(skip(state, payload))]
pub async fn join_waitlist(
    State(state): State<AppState>,
    Json(payload): Json<WaitlistRequest>,
) -> Result<Json<WaitlistResponse>, ApiError> {
    let email = payload.email.trim();
    if !is_valid_email(email) {
        return Err(ApiError::Validation("Invalid email".to_string()));
    }

    let mut conn = store::connection(&state.pool).await?;
    let entry = WaitlistStore::new(&mut conn).join(email).await?;

    info!(entry_id = entry.id, "Waitlist signup");
    Ok(Json(entry.into()))
}

#[utoipa::path(
    get,
    path = "/api/waitlist",
    params(PageQuery),
    responses(
        (status = 200, description = "Waitlist entries", body = [WaitlistResponse]),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Admin access required", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "waitlist"
)]
#[instrument(skip(state, headers))]
pub async fn list_waitlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<WaitlistResponse>>, ApiError> {
    require_admin(&headers, &state).await?;

    let mut conn = store::connection(&state.pool).await?;
    let entries = WaitlistStore::new(&mut conn)
        .list(Page::new(page.skip, page.limit))
        .await?;

    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };

    use crate::handlers::tests::{json_body, send};

    #[tokio::test]
    async fn invalid_email_is_rejected_before_storage() {
        let response = send(
            Request::post("/api/waitlist")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"email": "nobody"}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"], "Invalid email");
    }
}
