use chrono::TimeDelta;
use mutfak_feedback_service::{
    config::Settings,
    establish_pool,
    mail::OutboxMailer,
    notification::{sweep::sweep_database, Notifier},
};
use tracing::info;

pub async fn main(hours: Option<i64>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Settings::load();
    let pool = establish_pool(&settings.database_url)?;
    let window = hours.map(TimeDelta::hours).unwrap_or(settings.sweep_window());

    let notifier = Notifier::new(
        OutboxMailer::new(pool.clone(), settings.enable_email_notifications),
        settings.notification(),
    );
    let sent = sweep_database(&pool, &notifier, window).await?;
    info!(sent, window_hours = window.num_hours(), "Sweep finished");
    Ok(())
}
