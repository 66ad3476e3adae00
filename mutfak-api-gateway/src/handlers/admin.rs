use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
};
use chrono::Utc;
use mutfak_feedback_service::{
    auth::hash_password,
    models::{NewRestaurant, RestaurantChangeset, UserRole},
    notification::{Submission, SubmissionKind},
    qrcode::QrCode,
    rating::Ratings,
    store::{self, Page, restaurants::OwnerUpdate, restaurants::RestaurantStore},
};
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::models::*;

use super::{AppState, require_admin};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/login", post(login))
        .route(
            "/api/admin/restaurants",
            post(create_restaurant).get(list_restaurants),
        )
        .route(
            "/api/admin/restaurants/{restaurant_id}",
            get(get_restaurant)
                .patch(update_restaurant)
                .delete(delete_restaurant),
        )
        .route("/api/admin/qrcode", post(create_qrcode).get(list_qrcodes))
        .route("/api/admin/test-email", post(send_test_email))
}

#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued successfully", body = TokenResponse),
        (status = 401, description = "Not an admin account", body = ApiErrorResponse),
    ),
    tag = "admin"
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    Ok(Json(
        super::login(&state, &payload.email, &payload.password, Some(UserRole::Admin)).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/restaurants",
    request_body = CreateRestaurantRequest,
    responses(
        (status = 200, description = "Restaurant and owner created", body = RestaurantWithOwnerResponse),
        (status = 400, description = "Subdomain or email already registered", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Admin access required", body = ApiErrorResponse),
        (status = 422, description = "Invalid owner email", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers, payload), fields(subdomain = %payload.subdomain))]
pub async fn create_restaurant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRestaurantRequest>,
) -> Result<Json<RestaurantWithOwnerResponse>, ApiError> {
    require_admin(&headers, &state).await?;

    if !is_valid_email(&payload.owner_email) {
        return Err(ApiError::Validation("Invalid owner email".to_string()));
    }
    let hashed_password = hash_password(&payload.owner_password)?;

    let mut conn = store::connection(&state.pool).await?;
    let (restaurant, owner) = RestaurantStore::new(&mut conn)
        .create_with_owner(
            NewRestaurant {
                name: payload.name,
                subdomain: payload.subdomain,
            },
            payload.owner_email,
            hashed_password,
        )
        .await?;

    info!(restaurant_id = restaurant.id, "Restaurant registered");
    Ok(Json((restaurant, Some(owner)).into()))
}

#[utoipa::path(
    get,
    path = "/api/admin/restaurants",
    params(PageQuery),
    responses(
        (status = 200, description = "Restaurants with their owners", body = [RestaurantWithOwnerResponse]),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Admin access required", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn list_restaurants(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<RestaurantWithOwnerResponse>>, ApiError> {
    require_admin(&headers, &state).await?;

    let mut conn = store::connection(&state.pool).await?;
    let restaurants = RestaurantStore::new(&mut conn)
        .list_with_owners(Page::new(page.skip, page.limit))
        .await?;

    Ok(Json(restaurants.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/admin/restaurants/{restaurant_id}",
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 200, description = "Restaurant with its owner", body = RestaurantWithOwnerResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Admin access required", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn get_restaurant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<i32>,
) -> Result<Json<RestaurantWithOwnerResponse>, ApiError> {
    require_admin(&headers, &state).await?;

    let mut conn = store::connection(&state.pool).await?;
    let mut restaurants = RestaurantStore::new(&mut conn);
    let restaurant = restaurants
        .get(restaurant_id)
        .await
        .map_err(ApiError::not_found("Restaurant not found"))?;
    let owner = restaurants.owner(restaurant_id).await?;

    Ok(Json((restaurant, owner).into()))
}

#[utoipa::path(
    patch,
    path = "/api/admin/restaurants/{restaurant_id}",
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID")
    ),
    request_body = UpdateRestaurantRequest,
    responses(
        (status = 200, description = "Restaurant updated", body = RestaurantWithOwnerResponse),
        (status = 400, description = "Subdomain or email already registered", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Admin access required", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers, payload))]
pub async fn update_restaurant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<i32>,
    Json(payload): Json<UpdateRestaurantRequest>,
) -> Result<Json<RestaurantWithOwnerResponse>, ApiError> {
    require_admin(&headers, &state).await?;

    if let Some(email) = &payload.owner_email {
        if !is_valid_email(email) {
            return Err(ApiError::Validation("Invalid owner email".to_string()));
        }
    }
    let owner_changes = OwnerUpdate {
        email: payload.owner_email,
        hashed_password: payload
            .owner_password
            .as_deref()
            .map(hash_password)
            .transpose()?,
    };
    let changes = RestaurantChangeset {
        name: payload.name,
        subdomain: payload.subdomain,
        updated_at: None,
    };

    let mut conn = store::connection(&state.pool).await?;
    let updated = RestaurantStore::new(&mut conn)
        .update_with_owner(restaurant_id, changes, owner_changes)
        .await
        .map_err(ApiError::not_found("Restaurant not found"))?;

    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/admin/restaurants/{restaurant_id}",
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 204, description = "Restaurant and owner deleted"),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Admin access required", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn delete_restaurant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(restaurant_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let admin = require_admin(&headers, &state).await?;

    let mut conn = store::connection(&state.pool).await?;
    RestaurantStore::new(&mut conn)
        .delete_with_owner(restaurant_id)
        .await
        .map_err(ApiError::not_found("Restaurant not found"))?;

    info!(restaurant_id, admin = %admin.email, "Restaurant deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/admin/qrcode",
    request_body = QrCodeRequest,
    responses(
        (status = 200, description = "QR code descriptor", body = QrCodeResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Admin access required", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn create_qrcode(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<QrCodeRequest>,
) -> Result<Json<QrCodeResponse>, ApiError> {
    require_admin(&headers, &state).await?;

    let mut conn = store::connection(&state.pool).await?;
    if !RestaurantStore::new(&mut conn)
        .exists(payload.restaurant_id)
        .await?
    {
        return Err(ApiError::NotFound("Restaurant not found".to_string()));
    }

    Ok(Json(
        QrCode::new(
            &state.settings.frontend_url,
            payload.restaurant_id,
            payload.size,
        )
        .into(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/qrcode",
    responses(
        (status = 200, description = "One QR code descriptor per restaurant", body = [QrCodeResponse]),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Admin access required", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn list_qrcodes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<QrCodeResponse>>, ApiError> {
    require_admin(&headers, &state).await?;

    let mut conn = store::connection(&state.pool).await?;
    let restaurants = RestaurantStore::new(&mut conn)
        .list(Page::new(None, Some(Page::MAX_LIMIT)))
        .await?;

    Ok(Json(
        restaurants
            .iter()
            .map(|r| QrCode::new(&state.settings.frontend_url, r.id, None).into())
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/test-email",
    request_body = TestEmailRequest,
    responses(
        (status = 200, description = "Outcome of the sample alert", body = TestEmailResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Admin access required", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
        (status = 422, description = "Invalid email", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = []),
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers), fields(to = %payload.email))]
pub async fn send_test_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TestEmailRequest>,
) -> Result<Json<TestEmailResponse>, ApiError> {
    require_admin(&headers, &state).await?;

    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Invalid email".to_string()));
    }

    let mut conn = store::connection(&state.pool).await?;
    let restaurant = RestaurantStore::new(&mut conn)
        .get(payload.restaurant_id)
        .await
        .map_err(ApiError::not_found("Restaurant not found"))?;
    drop(conn);

    let submission = sample_submission(restaurant.id);
    let response = match state
        .notifier
        .send_to(&submission, &restaurant.name, &payload.email)
        .await
    {
        Ok(()) => TestEmailResponse {
            success: true,
            message: format!("Test email sent to {}", payload.email),
        },
        Err(err) => {
            warn!("Test email failed: {err}");
            TestEmailResponse {
                success: false,
                message: format!("Test email could not be sent: {err}"),
            }
        }
    };
    Ok(Json(response))
}

fn sample_submission(restaurant_id: i32) -> Submission {
    let ratings = Ratings {
        food: 2,
        service: 1,
        atmosphere: 3,
    };
    Submission {
        kind: SubmissionKind::Feedback,
        id: 0,
        restaurant_id,
        customer_name: "Test Guest".to_string(),
        food_rating: ratings.food,
        service_rating: ratings.service,
        atmosphere_rating: ratings.atmosphere,
        average_rating: ratings.average(),
        comment: Some("This is a test notification.".to_string()),
        created_at: Utc::now(),
    }
}
