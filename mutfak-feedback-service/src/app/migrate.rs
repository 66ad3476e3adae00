use mutfak_feedback_service::{establish_connection, run_migrations};

pub fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = establish_connection();
    run_migrations(&mut conn)?;
    tracing::info!("Database is up to date");
    Ok(())
}
