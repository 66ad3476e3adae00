pub mod admin;
pub mod auth;
pub mod customer;
pub mod restaurant;
pub mod waitlist;

// Re-export routers for easier importing
pub use admin::router as admin_router;
pub use auth::router as auth_router;
pub use customer::router as customer_router;
pub use restaurant::router as restaurant_router;
pub use waitlist::router as waitlist_router;

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderMap, header},
};
use mutfak_feedback_service::{
    DbConnection, DbPool,
    auth::{Claims, TokenIssuer, verify_password},
    config::Settings,
    mail::OutboxMailer,
    models::{User, UserRole},
    notification::Notifier,
    rating::{MAX_RATING, MIN_RATING},
    stats,
    store::{
        self, restaurants::RestaurantStore, star_clicks::StarClickStore, users::UserStore,
    },
    tenant::resolve_restaurant_id,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use crate::models::{StarClickResponse, StarClickStatsResponse, TokenResponse};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub settings: Arc<Settings>,
    pub notifier: Arc<Notifier<OutboxMailer>>,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(pool: DbPool, settings: Settings) -> Self {
        let notifier = Notifier::new(
            OutboxMailer::new(pool.clone(), settings.enable_email_notifications),
            settings.notification(),
        );
        let tokens = TokenIssuer::new(&settings.secret_key, settings.access_token_expires());
        Self {
            pool,
            settings: Arc::new(settings),
            notifier: Arc::new(notifier),
            tokens: Arc::new(tokens),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(auth_router())
        .merge(admin_router())
        .merge(restaurant_router())
        .merge(customer_router())
        .merge(waitlist_router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

// Shared utility functions
fn extract_claims_from_token(headers: &HeaderMap, state: &AppState) -> Result<Claims, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::AuthenticationFailed)?
        .to_str()
        .map_err(|_| ApiError::InvalidToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::InvalidToken)?;

    Ok(state.tokens.decode(token)?)
}

async fn current_user(headers: &HeaderMap, state: &AppState) -> Result<User, ApiError> {
    let claims = extract_claims_from_token(headers, state)?;

    let mut conn = store::connection(&state.pool).await?;
    let user = UserStore::new(&mut conn)
        .find_by_email(&claims.sub)
        .await?
        .ok_or(ApiError::InvalidToken)?;

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }
    Ok(user)
}

async fn require_admin(headers: &HeaderMap, state: &AppState) -> Result<User, ApiError> {
    let user = current_user(headers, state).await?;
    if user.role != UserRole::Admin {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }
    Ok(user)
}

fn owned_restaurant_id(user: &User) -> Result<i32, ApiError> {
    user.restaurant_id
        .ok_or_else(|| ApiError::Forbidden("User has no restaurant".to_string()))
}

fn verify_restaurant_access(user: &User, restaurant_id: i32) -> Result<(), ApiError> {
    if user.role == UserRole::Admin || user.restaurant_id == Some(restaurant_id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Not allowed to access this restaurant".to_string(),
        ))
    }
}

fn tenant_from_host(headers: &HeaderMap) -> Result<i32, ApiError> {
    headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .and_then(resolve_restaurant_id)
        .ok_or_else(|| ApiError::NotFound("Restaurant not found".to_string()))
}

async fn ensure_restaurant(conn: &mut DbConnection, restaurant_id: i32) -> Result<(), ApiError> {
    if RestaurantStore::new(conn).exists(restaurant_id).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound("Restaurant not found".to_string()))
    }
}

fn check_star_value(star_value: i32) -> Result<(), ApiError> {
    if (MIN_RATING..=MAX_RATING).contains(&star_value) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(
            "Star value must be between 1 and 5".to_string(),
        ))
    }
}

async fn save_star_click(
    state: &AppState,
    restaurant_id: i32,
    star_value: i32,
) -> Result<StarClickResponse, ApiError> {
    check_star_value(star_value)?;

    let mut conn = store::connection(&state.pool).await?;
    ensure_restaurant(&mut conn, restaurant_id).await?;
    let click = StarClickStore::new(&mut conn)
        .record(restaurant_id, star_value)
        .await?;
    Ok(click.into())
}

/// Brings the per-star counters up to date with the click log and reports them.
async fn load_star_click_stats(
    state: &AppState,
    restaurant_id: i32,
) -> Result<StarClickStatsResponse, ApiError> {
    let mut conn = store::connection(&state.pool).await?;
    ensure_restaurant(&mut conn, restaurant_id).await?;
    let counts = StarClickStore::new(&mut conn).reconcile(restaurant_id).await?;
    Ok(stats::star_click_summary(restaurant_id, &counts).into())
}

/// Password login. `role` restricts which accounts may use the endpoint.
async fn login(
    state: &AppState,
    email: &str,
    password: &str,
    role: Option<UserRole>,
) -> Result<TokenResponse, ApiError> {
    let mut conn = store::connection(&state.pool).await?;
    let user = UserStore::new(&mut conn)
        .find_by_email(email)
        .await?
        .filter(|user| verify_password(password, &user.hashed_password))
        .ok_or(ApiError::InvalidCredentials)?;

    if role.is_some_and(|role| role != user.role) {
        return Err(ApiError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    Ok(TokenResponse {
        access_token: state.tokens.issue(&user)?,
        token_type: "bearer".to_string(),
        role: user.role.as_str().to_string(),
        restaurant_id: user.restaurant_id,
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::root,
        auth::issue_token,
        auth::process_low_ratings,
        admin::login,
        admin::create_restaurant,
        admin::list_restaurants,
        admin::get_restaurant,
        admin::update_restaurant,
        admin::delete_restaurant,
        admin::create_qrcode,
        admin::list_qrcodes,
        admin::send_test_email,
        restaurant::login,
        restaurant::dashboard,
        restaurant::update_settings,
        restaurant::list_platforms,
        restaurant::create_platform,
        restaurant::update_platform,
        restaurant::delete_platform,
        restaurant::list_feedbacks,
        restaurant::list_complaints,
        restaurant::delete_feedback,
        restaurant::delete_complaint,
        restaurant::star_click_stats,
        restaurant::record_star_click,
        restaurant::restaurant_details,
        customer::restaurant_from_host,
        customer::get_restaurant,
        customer::get_restaurant_by_subdomain,
        customer::create_feedback,
        customer::create_complaint,
        customer::feedback_stats,
        customer::list_feedbacks,
        customer::analytics,
        customer::list_platforms,
        customer::record_star_click,
        customer::star_click_stats,
        waitlist::join_waitlist,
        waitlist::list_waitlist,
    ),
    components(
        schemas(
            crate::models::LoginRequest,
            crate::models::TokenResponse,
            crate::models::MessageResponse,
            crate::models::ProcessLowRatingsResponse,
            crate::models::RestaurantResponse,
            crate::models::OwnerSummary,
            crate::models::RestaurantWithOwnerResponse,
            crate::models::CreateRestaurantRequest,
            crate::models::UpdateRestaurantRequest,
            crate::models::QrCodeRequest,
            crate::models::QrCodeResponse,
            crate::models::TestEmailRequest,
            crate::models::TestEmailResponse,
            crate::models::SettingsUpdateRequest,
            crate::models::UserResponse,
            crate::models::PlatformRequest,
            crate::models::PlatformUpdateRequest,
            crate::models::PlatformResponse,
            crate::models::FeedbackRequest,
            crate::models::ComplaintRequest,
            crate::models::FeedbackResponse,
            crate::models::ComplaintResponse,
            crate::models::SatisfactionResponse,
            crate::models::RecentCommentResponse,
            crate::models::DashboardResponse,
            crate::models::FeedbackStatsResponse,
            crate::models::DimensionStatsResponse,
            crate::models::AnalyticsResponse,
            crate::models::StarClickResponse,
            crate::models::StarClickStatsResponse,
            crate::models::WaitlistRequest,
            crate::models::WaitlistResponse,
            crate::models::ApiErrorResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "admin", description = "Restaurant administration"),
        (name = "restaurant", description = "Restaurant owner panel"),
        (name = "customer", description = "Public guest endpoints"),
        (name = "waitlist", description = "Product waitlist")
    ),
    info(
        title = "Mutfak API",
        description = "Multi-tenant restaurant feedback backend",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::*;
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        response::Response,
    };
    use mutfak_feedback_service::establish_pool;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    /// State whose pool points nowhere; only requests rejected before any
    /// database access can be exercised with it.
    pub fn offline_state() -> AppState {
        let settings = Settings {
            database_url: "postgres://nobody@127.0.0.1:1/none".to_string(),
            secret_key: "test-secret".to_string(),
            access_token_expire_minutes: 30,
            admin_email: "admin@mutfakyazilim.com".to_string(),
            admin_password: None,
            frontend_url: "http://localhost:8080".to_string(),
            smtp_from: "contact@mutfakyazilim.com".to_string(),
            enable_email_notifications: false,
            notify_on_low_rating: true,
            low_rating_threshold: 3.0,
            sweep_window_hours: 24,
            sweep_interval_minutes: 60,
            bind_address: "127.0.0.1:0".to_string(),
        };
        let pool = establish_pool(&settings.database_url).unwrap();
        AppState::new(pool, settings)
    }

    pub async fn send(request: Request<Body>) -> Response {
        app(offline_state()).oneshot(request).await.unwrap()
    }

    pub async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn root_answers_without_auth() {
        let response = send(Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await["message"].is_string());
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = send(
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let doc = json_body(response).await;
        assert!(doc["paths"]["/api/customer/feedbacks"].is_object());
    }

    #[tokio::test]
    async fn protected_routes_require_a_bearer_token() {
        for (method, uri) in [
            ("GET", "/api/admin/restaurants"),
            ("GET", "/api/restaurant/dashboard"),
            ("GET", "/api/waitlist"),
            ("GET", "/process-low-ratings"),
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
            assert_eq!(
                json_body(response).await["error"],
                "Authentication failed",
                "{uri}"
            );
        }
    }

    #[tokio::test]
    async fn forged_tokens_are_rejected() {
        let response = send(
            Request::get("/api/restaurant/dashboard")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "Invalid token");

        let response = send(
            Request::get("/api/restaurant/dashboard")
                .header(header::AUTHORIZATION, "Basic abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn restaurant_access_is_limited_to_the_owner_and_admins() {
        let owner = User {
            id: 1,
            email: "owner@example.com".to_string(),
            hashed_password: String::new(),
            role: UserRole::RestaurantOwner,
            is_active: true,
            restaurant_id: Some(4),
        };
        let admin = User {
            role: UserRole::Admin,
            restaurant_id: None,
            ..owner.clone()
        };

        assert!(verify_restaurant_access(&owner, 4).is_ok());
        assert!(matches!(
            verify_restaurant_access(&owner, 5),
            Err(ApiError::Forbidden(_))
        ));
        assert!(verify_restaurant_access(&admin, 5).is_ok());
        assert_eq!(owned_restaurant_id(&owner).unwrap(), 4);
        assert!(matches!(
            owned_restaurant_id(&admin),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn star_values_outside_one_to_five_are_rejected() {
        assert!(check_star_value(1).is_ok());
        assert!(check_star_value(5).is_ok());
        assert!(matches!(check_star_value(0), Err(ApiError::BadRequest(_))));
        assert!(matches!(check_star_value(6), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn tenant_comes_from_the_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "restaurant-8.localhost:5173".parse().unwrap());
        assert_eq!(tenant_from_host(&headers).unwrap(), 8);

        headers.insert(header::HOST, "localhost".parse().unwrap());
        assert!(matches!(
            tenant_from_host(&headers),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            tenant_from_host(&HeaderMap::new()),
            Err(ApiError::NotFound(_))
        ));
    }
}
