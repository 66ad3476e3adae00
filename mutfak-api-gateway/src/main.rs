use dotenvy::dotenv;
use mutfak_feedback_service::{
    auth::hash_password,
    config::Settings,
    establish_connection, establish_pool,
    notification::sweep::{run_periodic, sweep_database},
    run_migrations,
    store::{self, users::UserStore},
};
use tracing::info;

mod error;
mod handlers;
mod models;

use handlers::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Settings::load();

    tokio::task::spawn_blocking(|| run_migrations(&mut establish_connection())).await??;

    let pool = establish_pool(&settings.database_url)?;

    if let Some(password) = &settings.admin_password {
        let mut conn = store::connection(&pool).await?;
        let created = UserStore::new(&mut conn)
            .ensure_admin(&settings.admin_email, hash_password(password)?)
            .await?;
        if created {
            info!(email = %settings.admin_email, "Admin account created");
        }
    }

    let bind_address = settings.bind_address.clone();
    let state = AppState::new(pool, settings);

    if state.settings.enable_email_notifications {
        let sweeper = state.clone();
        tokio::spawn(async move {
            run_periodic(sweeper.settings.sweep_interval(), || {
                sweep_database(
                    &sweeper.pool,
                    sweeper.notifier.as_ref(),
                    sweeper.settings.sweep_window(),
                )
            })
            .await;
        });
    }

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("API Gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, handlers::app(state)).await?;

    Ok(())
}
