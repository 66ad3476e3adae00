use axum::{
    Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
};
use mutfak_feedback_service::{
    models::{NewComplaint, NewFeedback},
    notification::{PgNotificationSource, Submission, notify_submission},
    rating::Ratings,
    stats::{self, Rated},
    store::{
        self, Page, feedback::FeedbackStore, platforms::PlatformStore,
        restaurants::RestaurantStore,
    },
};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::models::*;

use super::{
    AppState, ensure_restaurant, load_star_click_stats, save_star_click, tenant_from_host,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customer/restaurant", get(restaurant_from_host))
        .route("/api/customer/restaurants/{restaurant_id}", get(get_restaurant))
        .route(
            "/api/customer/restaurants/subdomain/{subdomain}",
            get(get_restaurant_by_subdomain),
        )
        .route("/api/customer/feedbacks", post(create_feedback))
        .route("/api/customer/complaints", post(create_complaint))
        .route("/api/customer/feedbacks/stats", get(feedback_stats))
        .route("/api/customer/{restaurant_id}/feedbacks", get(list_feedbacks))
        .route("/api/customer/{restaurant_id}/analytics", get(analytics))
        .route("/api/customer/{restaurant_id}/platforms", get(list_platforms))
        .route(
            "/api/customer/restaurants/{restaurant_id}/star-click",
            post(record_star_click),
        )
        .route(
            "/api/customer/restaurants/{restaurant_id}/star-clicks",
            get(star_click_stats),
        )
}

/// Explicit restaurant id from the form, or the tenant the guest is browsing.
fn target_restaurant(requested: Option<i32>, headers: &HeaderMap) -> Result<i32, ApiError> {
    match requested {
        Some(id) => Ok(id),
        None => tenant_from_host(headers),
    }
}

fn check_contact(email: &str) -> Result<(), ApiError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ApiError::Validation("Invalid email".to_string()))
    }
}

#[utoipa::path(
    get,
    path = "/api/customer/restaurant",
    responses(
        (status = 200, description = "Restaurant resolved from the Host header", body = RestaurantResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    tag = "customer"
)]
#[instrument(skip(state, headers))]
pub async fn restaurant_from_host(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let restaurant_id = tenant_from_host(&headers)?;

    let mut conn = store::connection(&state.pool).await?;
    let restaurant = RestaurantStore::new(&mut conn)
        .get(restaurant_id)
        .await
        .map_err(ApiError::not_found("Restaurant not found"))?;

    Ok(Json(restaurant.into()))
}

#[utoipa::path(
    get,
    path = "/api/customer/restaurants/{restaurant_id}",
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 200, description = "Restaurant", body = RestaurantResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    tag = "customer"
)]
#[instrument(skip(state))]
pub async fn get_restaurant(
    State(state): State<AppState>,
    Path(restaurant_id): Path<i32>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let mut conn = store::connection(&state.pool).await?;
    let restaurant = RestaurantStore::new(&mut conn)
        .get(restaurant_id)
        .await
        .map_err(ApiError::not_found("Restaurant not found"))?;

    Ok(Json(restaurant.into()))
}

#[utoipa::path(
    get,
    path = "/api/customer/restaurants/subdomain/{subdomain}",
    params(
        ("subdomain" = String, Path, description = "Restaurant subdomain")
    ),
    responses(
        (status = 200, description = "Restaurant", body = RestaurantResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    tag = "customer"
)]
#[instrument(skip(state))]
pub async fn get_restaurant_by_subdomain(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let mut conn = store::connection(&state.pool).await?;
    let restaurant = RestaurantStore::new(&mut conn)
        .get_by_subdomain(&subdomain)
        .await
        .map_err(ApiError::not_found("Restaurant not found"))?;

    Ok(Json(restaurant.into()))
}

#[utoipa::path(
    post,
    path = "/api/customer/feedbacks",
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Feedback stored", body = FeedbackResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
        (status = 422, description = "Rating or email invalid", body = ApiErrorResponse),
    ),
    tag = "customer"
)]
#[instrument(skip(state, headers, payload), fields(restaurant_id = ?payload.restaurant_id))]
pub async fn create_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let ratings = Ratings::new(
        payload.food_rating,
        payload.service_rating,
        payload.atmosphere_rating,
    )?;
    check_contact(&payload.email)?;
    let restaurant_id = target_restaurant(payload.restaurant_id, &headers)?;

    let mut conn = store::connection(&state.pool).await?;
    ensure_restaurant(&mut conn, restaurant_id).await?;

    let feedback = FeedbackStore::new(&mut conn)
        .insert_feedback(&NewFeedback {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            food_rating: ratings.food,
            service_rating: ratings.service,
            atmosphere_rating: ratings.atmosphere,
            average_rating: ratings.average(),
            comment: payload.comment,
            restaurant_id,
        })
        .await?;
    info!(feedback_id = feedback.id, restaurant_id, "Feedback received");

    drop(conn);

    notify_submission(
        &mut PgNotificationSource::new(state.pool.clone()),
        state.notifier.as_ref(),
        &Submission::from(&feedback),
    )
    .await;

    Ok(Json(feedback.into()))
}

#[utoipa::path(
    post,
    path = "/api/customer/complaints",
    request_body = ComplaintRequest,
    responses(
        (status = 200, description = "Complaint stored", body = ComplaintResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
        (status = 422, description = "Rating, email or comment invalid", body = ApiErrorResponse),
    ),
    tag = "customer"
)]
#[instrument(skip(state, headers, payload), fields(restaurant_id = ?payload.restaurant_id))]
pub async fn create_complaint(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ComplaintRequest>,
) -> Result<Json<ComplaintResponse>, ApiError> {
    let ratings = Ratings::new(
        payload.food_rating,
        payload.service_rating,
        payload.atmosphere_rating,
    )?;
    check_contact(&payload.email)?;
    if payload.comment.trim().is_empty() {
        return Err(ApiError::Validation("Comment is required".to_string()));
    }
    let restaurant_id = target_restaurant(payload.restaurant_id, &headers)?;

    let mut conn = store::connection(&state.pool).await?;
    ensure_restaurant(&mut conn, restaurant_id).await?;

    let complaint = FeedbackStore::new(&mut conn)
        .insert_complaint(&NewComplaint {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            food_rating: ratings.food,
            service_rating: ratings.service,
            atmosphere_rating: ratings.atmosphere,
            average_rating: ratings.average(),
            comment: payload.comment,
            restaurant_id,
        })
        .await?;
    info!(complaint_id = complaint.id, restaurant_id, "Complaint received");

    drop(conn);

    notify_submission(
        &mut PgNotificationSource::new(state.pool.clone()),
        state.notifier.as_ref(),
        &Submission::from(&complaint),
    )
    .await;

    Ok(Json(complaint.into()))
}

#[utoipa::path(
    get,
    path = "/api/customer/feedbacks/stats",
    responses(
        (status = 200, description = "Feedback statistics of the Host tenant", body = FeedbackStatsResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    tag = "customer"
)]
#[instrument(skip(state, headers))]
pub async fn feedback_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<FeedbackStatsResponse>, ApiError> {
    let restaurant_id = tenant_from_host(&headers)?;

    let mut conn = store::connection(&state.pool).await?;
    ensure_restaurant(&mut conn, restaurant_id).await?;
    let feedbacks = FeedbackStore::new(&mut conn)
        .all_feedbacks_for(restaurant_id)
        .await?;
    let rows: Vec<Rated> = feedbacks.iter().map(Rated::from).collect();

    Ok(Json(FeedbackStatsResponse::new(
        restaurant_id,
        stats::feedback_stats(&rows),
    )))
}

#[utoipa::path(
    get,
    path = "/api/customer/{restaurant_id}/feedbacks",
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Feedback, newest first", body = [FeedbackResponse]),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    tag = "customer"
)]
#[instrument(skip(state))]
pub async fn list_feedbacks(
    State(state): State<AppState>,
    Path(restaurant_id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<FeedbackResponse>>, ApiError> {
    let mut conn = store::connection(&state.pool).await?;
    ensure_restaurant(&mut conn, restaurant_id).await?;
    let feedbacks = FeedbackStore::new(&mut conn)
        .feedbacks_for(restaurant_id, Page::new(page.skip, page.limit))
        .await?;

    Ok(Json(feedbacks.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/customer/{restaurant_id}/analytics",
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 200, description = "Feedback analytics", body = AnalyticsResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    tag = "customer"
)]
#[instrument(skip(state))]
pub async fn analytics(
    State(state): State<AppState>,
    Path(restaurant_id): Path<i32>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let mut conn = store::connection(&state.pool).await?;
    ensure_restaurant(&mut conn, restaurant_id).await?;
    let feedbacks = FeedbackStore::new(&mut conn)
        .all_feedbacks_for(restaurant_id)
        .await?;
    let rows: Vec<Rated> = feedbacks.iter().map(Rated::from).collect();

    Ok(Json(AnalyticsResponse::new(
        restaurant_id,
        stats::analytics(&rows),
    )))
}

#[utoipa::path(
    get,
    path = "/api/customer/{restaurant_id}/platforms",
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 200, description = "Review platforms", body = [PlatformResponse]),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    tag = "customer"
)]
#[instrument(skip(state))]
pub async fn list_platforms(
    State(state): State<AppState>,
    Path(restaurant_id): Path<i32>,
) -> Result<Json<Vec<PlatformResponse>>, ApiError> {
    let mut conn = store::connection(&state.pool).await?;
    ensure_restaurant(&mut conn, restaurant_id).await?;
    let platforms = PlatformStore::new(&mut conn).list_for(restaurant_id).await?;

    Ok(Json(platforms.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/customer/restaurants/{restaurant_id}/star-click",
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID"),
        StarClickQuery
    ),
    responses(
        (status = 200, description = "Click recorded", body = StarClickResponse),
        (status = 400, description = "Star value outside 1..5", body = ApiErrorResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    tag = "customer"
)]
#[instrument(skip(state))]
pub async fn record_star_click(
    State(state): State<AppState>,
    Path(restaurant_id): Path<i32>,
    Query(query): Query<StarClickQuery>,
) -> Result<Json<StarClickResponse>, ApiError> {
    Ok(Json(
        save_star_click(&state, restaurant_id, query.star_value).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/customer/restaurants/{restaurant_id}/star-clicks",
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 200, description = "Star click counters", body = StarClickStatsResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    tag = "customer"
)]
#[instrument(skip(state))]
pub async fn star_click_stats(
    State(state): State<AppState>,
    Path(restaurant_id): Path<i32>,
) -> Result<Json<StarClickStatsResponse>, ApiError> {
    Ok(Json(load_star_click_stats(&state, restaurant_id).await?))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use serde_json::json;

    use super::*;
    use crate::handlers::tests::{json_body, send};

    fn feedback_body(food: i32, email: &str, restaurant_id: Option<i32>) -> Body {
        Body::from(
            json!({
                "name": "Ayşe",
                "email": email,
                "phone": "+90 555 000 00 00",
                "food_rating": food,
                "service_rating": 4,
                "atmosphere_rating": 4,
                "comment": "Lovely",
                "restaurant_id": restaurant_id,
            })
            .to_string(),
        )
    }

    #[tokio::test]
    async fn out_of_range_rating_is_unprocessable() {
        let response = send(
            Request::post("/api/customer/feedbacks")
                .header(header::CONTENT_TYPE, "application/json")
                .body(feedback_body(6, "guest@example.com", Some(1)))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            json_body(response).await["error"],
            "food_rating must be between 1 and 5, got 6"
        );
    }

    #[tokio::test]
    async fn malformed_email_is_unprocessable() {
        let response = send(
            Request::post("/api/customer/feedbacks")
                .header(header::CONTENT_TYPE, "application/json")
                .body(feedback_body(4, "not-an-email", Some(1)))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"], "Invalid email");
    }

    #[tokio::test]
    async fn feedback_without_tenant_is_not_found() {
        let response = send(
            Request::post("/api/customer/feedbacks")
                .header(header::HOST, "localhost:8000")
                .header(header::CONTENT_TYPE, "application/json")
                .body(feedback_body(4, "guest@example.com", None))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Restaurant not found");
    }

    #[tokio::test]
    async fn blank_complaint_comment_is_unprocessable() {
        let body = json!({
            "name": "Mehmet",
            "email": "guest@example.com",
            "phone": "555",
            "food_rating": 1,
            "service_rating": 1,
            "atmosphere_rating": 1,
            "comment": "   ",
            "restaurant_id": 2,
        });
        let response = send(
            Request::post("/api/customer/complaints")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"], "Comment is required");
    }

    #[tokio::test]
    async fn stats_without_tenant_host_are_not_found() {
        let response = send(
            Request::get("/api/customer/feedbacks/stats")
                .header(header::HOST, "www.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn star_click_outside_range_is_rejected() {
        let response = send(
            Request::post("/api/customer/restaurants/3/star-click?star_value=9")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "Star value must be between 1 and 5"
        );
    }

    #[test]
    fn explicit_restaurant_wins_over_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "restaurant-8.localhost".parse().unwrap());
        assert_eq!(target_restaurant(Some(3), &headers).unwrap(), 3);
        assert_eq!(target_restaurant(None, &headers).unwrap(), 8);
    }
}
