use std::future::Future;

use diesel::insert_into;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    models::NewOutbox,
    schema::outbox,
    store::{self, StoreError},
    DbPool, EMAIL_CHANNEL,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Email notifications are disabled")]
    Disabled,
    #[error("Cannot serialize email: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Cannot queue email: {0}")]
    Store(#[from] StoreError),
}

pub trait Mailer {
    fn send(&self, message: &EmailMessage) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// Queues messages in the outbox table; the relay publishes them to the
/// `notification.email` topic where the mail sender picks them up.
#[derive(Clone)]
pub struct OutboxMailer {
    pool: DbPool,
    enabled: bool,
}

impl OutboxMailer {
    pub fn new(pool: DbPool, enabled: bool) -> Self {
        Self { pool, enabled }
    }
}

impl Mailer for OutboxMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if !self.enabled {
            return Err(MailError::Disabled);
        }

        let value = serde_json::to_vec(message)?;
        let mut conn = store::connection(&self.pool).await?;
        insert_into(outbox::table)
            .values(NewOutbox {
                topic: EMAIL_CHANNEL.to_string(),
                key: message.to.clone(),
                value,
            })
            .execute(&mut *conn)
            .await
            .map_err(StoreError::from)?;

        debug!(to = %message.to, subject = %message.subject, "queued email");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::establish_pool;

    #[tokio::test]
    async fn disabled_mailer_refuses_without_touching_the_database() {
        // The pool never connects because the mailer returns first.
        let pool = establish_pool("postgres://nobody@127.0.0.1:1/none").unwrap();
        let mailer = OutboxMailer::new(pool, false);
        let message = EmailMessage {
            from: "contact@mutfakyazilim.com".to_string(),
            to: "owner@example.com".to_string(),
            subject: "Test".to_string(),
            html: "<p>Test</p>".to_string(),
            text: "Test".to_string(),
        };

        assert!(matches!(
            mailer.send(&message).await,
            Err(MailError::Disabled)
        ));
    }
}
