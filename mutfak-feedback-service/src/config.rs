use std::{env, fmt::Display, str::FromStr};

use chrono::TimeDelta;
use tracing::{info, warn};

use crate::notification::NotificationSettings;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub admin_email: String,
    pub admin_password: Option<String>,
    pub frontend_url: String,
    pub smtp_from: String,
    pub enable_email_notifications: bool,
    pub notify_on_low_rating: bool,
    pub low_rating_threshold: f64,
    pub sweep_window_hours: i64,
    pub sweep_interval_minutes: u64,
    pub bind_address: String,
}

impl Settings {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            secret_key: env::var("SECRET_KEY").expect("SECRET_KEY must be set"),
            access_token_expire_minutes: try_load("ACCESS_TOKEN_EXPIRE_MINUTES", 30),
            admin_email: try_load("ADMIN_EMAIL", "admin@mutfakyazilim.com".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),
            frontend_url: try_load("FRONTEND_URL", "http://localhost:8080".to_string()),
            smtp_from: try_load("SMTP_FROM", "contact@mutfakyazilim.com".to_string()),
            enable_email_notifications: load_flag("ENABLE_EMAIL_NOTIFICATIONS", true),
            notify_on_low_rating: load_flag("NOTIFY_ON_LOW_RATING", true),
            low_rating_threshold: try_load("LOW_RATING_THRESHOLD", 3.0),
            sweep_window_hours: try_load("SWEEP_WINDOW_HOURS", 24),
            sweep_interval_minutes: try_load("SWEEP_INTERVAL_MINUTES", 60),
            bind_address: try_load("BIND_ADDRESS", "0.0.0.0:8100".to_string()),
        }
    }

    pub fn notification(&self) -> NotificationSettings {
        NotificationSettings {
            notify_on_low_rating: self.notify_on_low_rating,
            low_rating_threshold: self.low_rating_threshold,
            sender: self.smtp_from.clone(),
        }
    }

    pub fn access_token_expires(&self) -> TimeDelta {
        TimeDelta::minutes(self.access_token_expire_minutes)
    }

    pub fn sweep_window(&self) -> TimeDelta {
        TimeDelta::hours(self.sweep_window_hours)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_minutes.max(1) * 60)
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    parse_setting(key, env::var(key).ok(), default)
}

/// Parses `raw` for `key`, falling back to `default` when it is unset or
/// does not parse.
fn parse_setting<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = raw else {
        info!("{key} not set, using default: {default}");
        return default;
    };
    match raw.parse() {
        Ok(value) => value,
        Err(err) => {
            warn!("Invalid {key} value {raw:?}: {err}, using default: {default}");
            default
        }
    }
}

fn load_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => parse_flag(&value).unwrap_or_else(|| {
            warn!("Invalid {key} value: {value}, using default: {default}");
            default
        }),
        Err(_) => default,
    }
}

pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "t" | "yes" | "y" => Some(true),
        "false" | "0" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}
