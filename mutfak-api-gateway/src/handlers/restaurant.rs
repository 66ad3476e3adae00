use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{delete, get, patch, post},
};
use mutfak_feedback_service::{
    auth::hash_password,
    models::{NewPlatform, PlatformChangeset, UserChangeset, UserRole},
    stats::{self, Rated},
    store::{
        self, Page, feedback::FeedbackStore, platforms::PlatformStore,
        restaurants::RestaurantStore, users::UserStore,
    },
};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::models::*;

use super::{
    AppState, current_user, ensure_restaurant, load_star_click_stats, owned_restaurant_id,
    save_star_click, verify_restaurant_access,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/restaurant/login", post(login))
        .route("/api/restaurant/dashboard", get(dashboard))
        .route("/api/restaurant/settings", patch(update_settings))
        .route(
            "/api/restaurant/platforms",
            get(list_platforms).post(create_platform),
        )
        .route(
            "/api/restaurant/platforms/{platform_id}",
            patch(update_platform).delete(delete_platform),
        )
        .route("/api/restaurant/feedbacks", get(list_feedbacks))
        .route("/api/restaurant/complaints", get(list_complaints))
        .route("/api/restaurant/feedbacks/{feedback_id}", delete(delete_feedback))
        .route(
            "/api/restaurant/complaints/{complaint_id}",
            delete(delete_complaint),
        )
        .route(
            "/api/restaurant/{restaurant_id}/star-clicks",
            get(star_click_stats),
        )
        .route(
            "/api/restaurant/{restaurant_id}/star-click",
            post(record_star_click),
        )
        .route(
            "/api/restaurant/details/{restaurant_id}",
            get(restaurant_details),
        )
}

#[utoipa::path(
    post,
    path = "/api/restaurant/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued successfully", body = TokenResponse),
        (status = 401, description = "Not a restaurant owner account", body = ApiErrorResponse),
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    Ok(Json(
        super::login(
            &state,
            &payload.email,
            &payload.password,
            Some(UserRole::RestaurantOwner),
        )
        .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/restaurant/dashboard",
    responses(
        (status = 200, description = "Dashboard of the caller's restaurant", body = DashboardResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "User has no restaurant", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, headers))]
pub async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, ApiError> {
    let user = current_user(&headers, &state).await?;
    let restaurant_id = owned_restaurant_id(&user)?;

    let mut conn = store::connection(&state.pool).await?;
    let mut submissions = FeedbackStore::new(&mut conn);
    let feedbacks = submissions.all_feedbacks_for(restaurant_id).await?;
    let complaints = submissions.all_complaints_for(restaurant_id).await?;

    let rows: Vec<Rated> = feedbacks
        .iter()
        .map(Rated::from)
        .chain(complaints.iter().map(Rated::from))
        .collect();

    Ok(Json(DashboardResponse::new(
        restaurant_id,
        stats::dashboard(&rows),
    )))
}

#[utoipa::path(
    patch,
    path = "/api/restaurant/settings",
    request_body = SettingsUpdateRequest,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 400, description = "Email already registered", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 422, description = "Invalid email", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, headers, payload))]
pub async fn update_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SettingsUpdateRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = current_user(&headers, &state).await?;

    if let Some(email) = &payload.email {
        if !is_valid_email(email) {
            return Err(ApiError::Validation("Invalid email".to_string()));
        }
    }
    let changes = UserChangeset {
        email: payload.email,
        hashed_password: payload
            .password
            .as_deref()
            .map(hash_password)
            .transpose()?,
        is_active: payload.is_active,
    };

    let mut conn = store::connection(&state.pool).await?;
    let updated = UserStore::new(&mut conn)
        .update_settings(user.id, changes)
        .await?;

    info!(user_id = updated.id, "Account settings updated");
    Ok(Json(updated.into()))
}

#[utoipa::path(
    get,
    path = "/api/restaurant/platforms",
    responses(
        (status = 200, description = "Review platforms of the caller's restaurant", body = [PlatformResponse]),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "User has no restaurant", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, headers))]
pub async fn list_platforms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<PlatformResponse>>, ApiError> {
    let user = current_user(&headers, &state).await?;
    let restaurant_id = owned_restaurant_id(&user)?;

    let mut conn = store::connection(&state.pool).await?;
    let platforms = PlatformStore::new(&mut conn).list_for(restaurant_id).await?;

    Ok(Json(platforms.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/restaurant/platforms",
    request_body = PlatformRequest,
    responses(
        (status = 200, description = "Platform created", body = PlatformResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not allowed to access this restaurant", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, headers))]
pub async fn create_platform(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PlatformRequest>,
) -> Result<Json<PlatformResponse>, ApiError> {
    let user = current_user(&headers, &state).await?;
    let restaurant_id = match payload.restaurant_id {
        Some(id) => {
            verify_restaurant_access(&user, id)?;
            id
        }
        None => owned_restaurant_id(&user)?,
    };

    let mut conn = store::connection(&state.pool).await?;
    ensure_restaurant(&mut conn, restaurant_id).await?;
    let platform = PlatformStore::new(&mut conn)
        .create(&NewPlatform {
            name: payload.name,
            url: payload.url,
            restaurant_id,
        })
        .await?;

    Ok(Json(platform.into()))
}

#[utoipa::path(
    patch,
    path = "/api/restaurant/platforms/{platform_id}",
    params(
        ("platform_id" = i32, Path, description = "Platform ID")
    ),
    request_body = PlatformUpdateRequest,
    responses(
        (status = 200, description = "Platform updated", body = PlatformResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not allowed to access this restaurant", body = ApiErrorResponse),
        (status = 404, description = "Platform not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, headers))]
pub async fn update_platform(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(platform_id): Path<i32>,
    Json(payload): Json<PlatformUpdateRequest>,
) -> Result<Json<PlatformResponse>, ApiError> {
    let user = current_user(&headers, &state).await?;

    let mut conn = store::connection(&state.pool).await?;
    let mut platforms = PlatformStore::new(&mut conn);
    let platform = platforms
        .get(platform_id)
        .await
        .map_err(ApiError::not_found("Platform not found"))?;
    verify_restaurant_access(&user, platform.restaurant_id)?;

    let updated = platforms
        .update(
            platform_id,
            &PlatformChangeset {
                name: payload.name,
                url: payload.url,
            },
        )
        .await?;

    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/restaurant/platforms/{platform_id}",
    params(
        ("platform_id" = i32, Path, description = "Platform ID")
    ),
    responses(
        (status = 204, description = "Platform deleted"),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not allowed to access this restaurant", body = ApiErrorResponse),
        (status = 404, description = "Platform not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, headers))]
pub async fn delete_platform(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(platform_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&headers, &state).await?;

    let mut conn = store::connection(&state.pool).await?;
    let mut platforms = PlatformStore::new(&mut conn);
    let platform = platforms
        .get(platform_id)
        .await
        .map_err(ApiError::not_found("Platform not found"))?;
    verify_restaurant_access(&user, platform.restaurant_id)?;
    platforms
        .delete(platform_id)
        .await
        .map_err(ApiError::not_found("Platform not found"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/restaurant/feedbacks",
    params(PageQuery),
    responses(
        (status = 200, description = "Feedback of the caller's restaurant, newest first", body = [FeedbackResponse]),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "User has no restaurant", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, headers))]
pub async fn list_feedbacks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<FeedbackResponse>>, ApiError> {
    let user = current_user(&headers, &state).await?;
    let restaurant_id = owned_restaurant_id(&user)?;

    let mut conn = store::connection(&state.pool).await?;
    let feedbacks = FeedbackStore::new(&mut conn)
        .feedbacks_for(restaurant_id, Page::new(page.skip, page.limit))
        .await?;

    Ok(Json(feedbacks.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/restaurant/complaints",
    params(PageQuery),
    responses(
        (status = 200, description = "Complaints of the caller's restaurant, newest first", body = [ComplaintResponse]),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "User has no restaurant", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, headers))]
pub async fn list_complaints(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ComplaintResponse>>, ApiError> {
    let user = current_user(&headers, &state).await?;
    let restaurant_id = owned_restaurant_id(&user)?;

    let mut conn = store::connection(&state.pool).await?;
    let complaints = FeedbackStore::new(&mut conn)
        .complaints_for(restaurant_id, Page::new(page.skip, page.limit))
        .await?;

    Ok(Json(complaints.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    delete,
    path = "/api/restaurant/feedbacks/{feedback_id}",
    params(
        ("feedback_id" = i32, Path, description = "Feedback ID")
    ),
    responses(
        (status = 204, description = "Feedback deleted"),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "User has no restaurant", body = ApiErrorResponse),
        (status = 404, description = "Feedback not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, headers))]
pub async fn delete_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(feedback_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&headers, &state).await?;
    let restaurant_id = owned_restaurant_id(&user)?;

    let mut conn = store::connection(&state.pool).await?;
    FeedbackStore::new(&mut conn)
        .delete_feedback(restaurant_id, feedback_id)
        .await
        .map_err(ApiError::not_found("Feedback not found"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/restaurant/complaints/{complaint_id}",
    params(
        ("complaint_id" = i32, Path, description = "Complaint ID")
    ),
    responses(
        (status = 204, description = "Complaint deleted"),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "User has no restaurant", body = ApiErrorResponse),
        (status = 404, description = "Complaint not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, headers))]
pub async fn delete_complaint(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(complaint_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&headers, &state).await?;
    let restaurant_id = owned_restaurant_id(&user)?;

    let mut conn = store::connection(&state.pool).await?;
    FeedbackStore::new(&mut conn)
        .delete_complaint(restaurant_id, complaint_id)
        .await
        .map_err(ApiError::not_found("Complaint not found"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/restaurant/{restaurant_id}/star-clicks",
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 200, description = "Reconciled star click counters", body = StarClickStatsResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not allowed to access this restaurant", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, headers))]
pub async fn star_click_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<i32>,
) -> Result<Json<StarClickStatsResponse>, ApiError> {
    let user = current_user(&headers, &state).await?;
    verify_restaurant_access(&user, restaurant_id)?;

    Ok(Json(load_star_click_stats(&state, restaurant_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/restaurant/{restaurant_id}/star-click",
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID"),
        StarClickQuery
    ),
    responses(
        (status = 200, description = "Click recorded", body = StarClickResponse),
        (status = 400, description = "Star value outside 1..5", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not allowed to access this restaurant", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, headers))]
pub async fn record_star_click(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<i32>,
    Query(query): Query<StarClickQuery>,
) -> Result<Json<StarClickResponse>, ApiError> {
    let user = current_user(&headers, &state).await?;
    verify_restaurant_access(&user, restaurant_id)?;

    Ok(Json(
        save_star_click(&state, restaurant_id, query.star_value).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/restaurant/details/{restaurant_id}",
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 200, description = "Restaurant details", body = RestaurantResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not allowed to access this restaurant", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, headers))]
pub async fn restaurant_details(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<i32>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let user = current_user(&headers, &state).await?;
    verify_restaurant_access(&user, restaurant_id)?;

    let mut conn = store::connection(&state.pool).await?;
    let restaurant = RestaurantStore::new(&mut conn)
        .get(restaurant_id)
        .await
        .map_err(ApiError::not_found("Restaurant not found"))?;

    Ok(Json(restaurant.into()))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, header},
    };

    use super::*;
    use crate::handlers::tests::{json_body, send};

    #[tokio::test]
    async fn owner_routes_require_a_token() {
        for (method, uri) in [
            ("GET", "/api/restaurant/platforms"),
            ("GET", "/api/restaurant/feedbacks"),
            ("DELETE", "/api/restaurant/complaints/3"),
            ("GET", "/api/restaurant/4/star-clicks"),
            ("GET", "/api/restaurant/details/4"),
        ] {
            let response = send(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn settings_reject_a_malformed_header() {
        let response = send(
            Request::patch("/api/restaurant/settings")
                .header(header::AUTHORIZATION, "Token abc")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "Invalid token");
    }
}
