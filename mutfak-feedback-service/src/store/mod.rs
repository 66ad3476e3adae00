use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::deadpool::PoolError;
use thiserror::Error;

use crate::{DbConnection, DbPool};

pub mod feedback;
pub mod platforms;
pub mod restaurants;
pub mod star_clicks;
pub mod users;
pub mod waitlist;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Query(DieselError),
    #[error("Connection pool error: {0}")]
    Pool(#[from] PoolError),
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => StoreError::NotFound,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            }
            err => StoreError::Query(err),
        }
    }
}

pub async fn connection(pool: &DbPool) -> Result<DbConnection, StoreError> {
    Ok(pool.get().await?)
}

/// Offset/limit pair for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    pub const MAX_LIMIT: i64 = 1000;

    pub fn new(skip: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            skip: skip.unwrap_or(0).max(0),
            limit: limit.unwrap_or(100).clamp(1, Self::MAX_LIMIT),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
