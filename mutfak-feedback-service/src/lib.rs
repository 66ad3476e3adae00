use std::env;
use std::time::Duration;

use deadpool::Runtime;
use diesel::{Connection, PgConnection};
use diesel_async::pooled_connection::deadpool::{BuildError, Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenvy::dotenv;

pub mod auth;
pub mod config;
pub mod mail;
pub mod models;
pub mod notification;
pub mod qrcode;
pub mod rating;
pub mod schema;
pub mod stats;
pub mod store;
pub mod tenant;

pub const EMAIL_CHANNEL: &str = "notification.email";

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

pub type DbPool = Pool<AsyncPgConnection>;
pub type DbConnection = Object<AsyncPgConnection>;

/// Longest a caller waits for a free pooled connection before getting an error.
pub const POOL_WAIT_TIMEOUT: Duration = Duration::from_secs(5);
pub const POOL_CREATE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn establish_connection() -> PgConnection {
    dotenv().ok();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgConnection::establish(&database_url)
        .unwrap_or_else(|_| panic!("Error connecting to {}", database_url))
}

/// Builds the request-path pool. Connections are opened lazily on first use.
/// An exhausted pool fails the checkout after [`POOL_WAIT_TIMEOUT`].
pub fn establish_pool(database_url: &str) -> Result<DbPool, BuildError> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    Pool::builder(manager)
        .wait_timeout(Some(POOL_WAIT_TIMEOUT))
        .create_timeout(Some(POOL_CREATE_TIMEOUT))
        .runtime(Runtime::Tokio1)
        .build()
}

pub fn run_migrations(conn: &mut PgConnection) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    for version in applied {
        tracing::info!(%version, "applied migration");
    }
    Ok(())
}
