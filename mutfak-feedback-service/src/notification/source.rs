use chrono::{DateTime, Utc};

use crate::{
    store::{self, feedback::FeedbackStore, restaurants::RestaurantStore, StoreError},
    DbPool,
};

use super::{NotificationSource, Recipient, Submission};

/// Reads submissions and recipients from Postgres.
///
/// Every call checks a connection out of the pool and hands it back before
/// returning, so the mailer can take one while an alert is dispatched.
#[derive(Clone)]
pub struct PgNotificationSource {
    pool: DbPool,
}

impl PgNotificationSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl NotificationSource for PgNotificationSource {
    async fn submissions_since(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Submission>, StoreError> {
        let mut conn = store::connection(&self.pool).await?;
        let mut store = FeedbackStore::new(&mut conn);
        let feedbacks = store.feedbacks_since(cutoff).await?;
        let complaints = store.complaints_since(cutoff).await?;

        Ok(feedbacks
            .iter()
            .map(Submission::from)
            .chain(complaints.iter().map(Submission::from))
            .collect())
    }

    async fn recipient(&mut self, restaurant_id: i32) -> Result<Option<Recipient>, StoreError> {
        let mut conn = store::connection(&self.pool).await?;
        let mut store = RestaurantStore::new(&mut conn);
        let restaurant = match store.get(restaurant_id).await {
            Ok(restaurant) => restaurant,
            Err(StoreError::NotFound) => return Ok(None),
            Err(err) => return Err(err),
        };
        let owner = store.owner(restaurant_id).await?;

        Ok(Some(Recipient {
            restaurant_name: restaurant.name,
            owner_email: owner.map(|user| user.email),
        }))
    }
}
