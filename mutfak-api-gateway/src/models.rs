use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mutfak_feedback_service::{models, qrcode::QrCode, stats};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,
    /// Token type, always "bearer"
    pub token_type: String,
    /// Role of the authenticated user
    pub role: String,
    /// Restaurant owned by the user, if any
    pub restaurant_id: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessLowRatingsResponse {
    pub message: String,
    /// Number of alerts handed to the mail transport
    pub processed: usize,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Rows to skip
    pub skip: Option<i64>,
    /// Maximum rows to return (default 100)
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StarClickQuery {
    /// Clicked star, 1 to 5
    pub star_value: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantResponse {
    pub id: i32,
    pub name: String,
    pub subdomain: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<models::Restaurant> for RestaurantResponse {
    fn from(r: models::Restaurant) -> Self {
        Self {
            id: r.id,
            name: r.name,
            subdomain: r.subdomain,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OwnerSummary {
    pub id: i32,
    pub email: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantWithOwnerResponse {
    pub id: i32,
    pub name: String,
    pub subdomain: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub owner: Option<OwnerSummary>,
}

impl From<(models::Restaurant, Option<models::User>)> for RestaurantWithOwnerResponse {
    fn from((r, owner): (models::Restaurant, Option<models::User>)) -> Self {
        Self {
            id: r.id,
            name: r.name,
            subdomain: r.subdomain,
            created_at: r.created_at,
            updated_at: r.updated_at,
            owner: owner.map(|u| OwnerSummary {
                id: u.id,
                email: u.email,
                is_active: u.is_active,
            }),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRestaurantRequest {
    pub name: String,
    /// Unique subdomain label
    pub subdomain: String,
    /// Login email of the owner account created alongside
    pub owner_email: String,
    pub owner_password: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateRestaurantRequest {
    pub name: Option<String>,
    pub subdomain: Option<String>,
    pub owner_email: Option<String>,
    pub owner_password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QrCodeRequest {
    pub restaurant_id: i32,
    /// Edge length in pixels (default 180)
    pub size: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QrCodeResponse {
    pub restaurant_id: i32,
    /// Feedback form URL to encode
    pub url: String,
    pub size: u32,
}

impl From<QrCode> for QrCodeResponse {
    fn from(qr: QrCode) -> Self {
        Self {
            restaurant_id: qr.restaurant_id,
            url: qr.url,
            size: qr.size,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TestEmailRequest {
    pub restaurant_id: i32,
    /// Address that receives the sample alert
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TestEmailResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SettingsUpdateRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub restaurant_id: Option<i32>,
}

impl From<models::User> for UserResponse {
    fn from(u: models::User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            role: u.role.as_str().to_string(),
            is_active: u.is_active,
            restaurant_id: u.restaurant_id,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlatformRequest {
    pub name: String,
    pub url: String,
    /// Only admins may set this; owners always create for their own restaurant
    pub restaurant_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PlatformUpdateRequest {
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlatformResponse {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub restaurant_id: i32,
}

impl From<models::Platform> for PlatformResponse {
    fn from(p: models::Platform) -> Self {
        Self {
            id: p.id,
            name: p.name,
            url: p.url,
            restaurant_id: p.restaurant_id,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FeedbackRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub food_rating: i32,
    pub service_rating: i32,
    pub atmosphere_rating: i32,
    pub comment: Option<String>,
    /// Falls back to the restaurant resolved from the Host header
    pub restaurant_id: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ComplaintRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub food_rating: i32,
    pub service_rating: i32,
    pub atmosphere_rating: i32,
    pub comment: String,
    /// Falls back to the restaurant resolved from the Host header
    pub restaurant_id: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeedbackResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub food_rating: i32,
    pub service_rating: i32,
    pub atmosphere_rating: i32,
    pub average_rating: f64,
    pub comment: Option<String>,
    pub restaurant_id: i32,
    pub created_at: DateTime<Utc>,
}

impl From<models::Feedback> for FeedbackResponse {
    fn from(f: models::Feedback) -> Self {
        Self {
            id: f.id,
            name: f.name,
            email: f.email,
            phone: f.phone,
            food_rating: f.food_rating,
            service_rating: f.service_rating,
            atmosphere_rating: f.atmosphere_rating,
            average_rating: f.average_rating,
            comment: f.comment,
            restaurant_id: f.restaurant_id,
            created_at: f.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComplaintResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub food_rating: i32,
    pub service_rating: i32,
    pub atmosphere_rating: i32,
    pub average_rating: f64,
    pub comment: String,
    pub restaurant_id: i32,
    pub created_at: DateTime<Utc>,
}

impl From<models::Complaint> for ComplaintResponse {
    fn from(c: models::Complaint) -> Self {
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            phone: c.phone,
            food_rating: c.food_rating,
            service_rating: c.service_rating,
            atmosphere_rating: c.atmosphere_rating,
            average_rating: c.average_rating,
            comment: c.comment,
            restaurant_id: c.restaurant_id,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SatisfactionResponse {
    pub satisfied: i64,
    pub neutral: i64,
    pub dissatisfied: i64,
}

impl From<stats::Satisfaction> for SatisfactionResponse {
    fn from(s: stats::Satisfaction) -> Self {
        Self {
            satisfied: s.satisfied,
            neutral: s.neutral,
            dissatisfied: s.dissatisfied,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentCommentResponse {
    pub comment: String,
    pub rating: f64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub restaurant_id: i32,
    pub total_feedbacks: i64,
    pub average_rating: f64,
    pub latest_feedback_date: Option<DateTime<Utc>>,
    /// Submissions per rounded star value
    pub rating_distribution: BTreeMap<i32, i64>,
    pub satisfaction: SatisfactionResponse,
    pub recent_comments: Vec<RecentCommentResponse>,
}

impl DashboardResponse {
    pub fn new(restaurant_id: i32, summary: stats::DashboardSummary) -> Self {
        Self {
            restaurant_id,
            total_feedbacks: summary.total_feedbacks,
            average_rating: summary.average_rating,
            latest_feedback_date: summary.latest_feedback_date,
            rating_distribution: summary.rating_distribution,
            satisfaction: summary.satisfaction.into(),
            recent_comments: summary
                .recent_comments
                .into_iter()
                .map(|c| RecentCommentResponse {
                    comment: c.comment,
                    rating: c.rating,
                    date: c.date,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeedbackStatsResponse {
    pub restaurant_id: i32,
    pub total: i64,
    pub rating_distribution: BTreeMap<i32, i64>,
    pub satisfaction: SatisfactionResponse,
}

impl FeedbackStatsResponse {
    pub fn new(restaurant_id: i32, s: stats::FeedbackStats) -> Self {
        Self {
            restaurant_id,
            total: s.total,
            rating_distribution: s.rating_distribution,
            satisfaction: s.satisfaction.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DimensionStatsResponse {
    pub counts: BTreeMap<i32, i64>,
    pub percentages: BTreeMap<i32, f64>,
}

impl From<stats::DimensionStats> for DimensionStatsResponse {
    fn from(d: stats::DimensionStats) -> Self {
        Self {
            counts: d.counts,
            percentages: d.percentages,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyticsResponse {
    pub restaurant_id: i32,
    pub total_feedbacks: i64,
    pub average_rating: f64,
    pub rating_distribution: BTreeMap<i32, i64>,
    pub satisfaction: SatisfactionResponse,
    pub food: DimensionStatsResponse,
    pub service: DimensionStatsResponse,
    pub atmosphere: DimensionStatsResponse,
}

impl AnalyticsResponse {
    pub fn new(restaurant_id: i32, a: stats::Analytics) -> Self {
        Self {
            restaurant_id,
            total_feedbacks: a.total_feedbacks,
            average_rating: a.average_rating,
            rating_distribution: a.rating_distribution,
            satisfaction: a.satisfaction.into(),
            food: a.food.into(),
            service: a.service.into(),
            atmosphere: a.atmosphere.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StarClickResponse {
    pub id: i32,
    pub restaurant_id: i32,
    pub star_value: i32,
    pub created_at: DateTime<Utc>,
}

impl From<models::StarClick> for StarClickResponse {
    fn from(c: models::StarClick) -> Self {
        Self {
            id: c.id,
            restaurant_id: c.restaurant_id,
            star_value: c.star_value,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StarClickStatsResponse {
    pub restaurant_id: i32,
    pub total_clicks: i64,
    pub star_distribution: BTreeMap<i32, i64>,
    /// Empty until the first click
    pub percentages: BTreeMap<i32, f64>,
}

impl From<stats::StarClickSummary> for StarClickStatsResponse {
    fn from(s: stats::StarClickSummary) -> Self {
        Self {
            restaurant_id: s.restaurant_id,
            total_clicks: s.total_clicks,
            star_distribution: s.star_distribution,
            percentages: s.percentages,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WaitlistRequest {
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WaitlistResponse {
    pub id: i32,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<models::WaitlistEntry> for WaitlistResponse {
    fn from(w: models::WaitlistEntry) -> Self {
        Self {
            id: w.id,
            email: w.email,
            created_at: w.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Error message
    pub error: String,
}

/// Loose shape check: one `@`, something before it and a dotted domain after.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.trim().split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !domain.contains(char::is_whitespace)
        && !local.contains(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("guest@example.com"));
        assert!(is_valid_email("first.last@mail.example.com.tr"));
        assert!(!is_valid_email("guest"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("guest@localhost"));
        assert!(!is_valid_email("guest@@example.com"));
        assert!(!is_valid_email("gu est@example.com"));
        assert!(!is_valid_email("guest@example.com."));
    }
}
