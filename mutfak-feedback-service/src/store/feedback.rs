use chrono::{DateTime, Utc};
use diesel::{insert_into, prelude::*};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::{
    models::{Complaint, Feedback, NewComplaint, NewFeedback},
    schema::{complaints, feedbacks},
};

use super::{Page, StoreError};

/// Feedback and complaint rows. Both tables share the rating columns; only
/// the nullability of `comment` differs.
pub struct FeedbackStore<'a> {
    conn: &'a mut AsyncPgConnection,
}

impl<'a> FeedbackStore<'a> {
    pub fn new(conn: &'a mut AsyncPgConnection) -> Self {
        Self { conn }
    }

    pub async fn insert_feedback(&mut self, new: &NewFeedback) -> Result<Feedback, StoreError> {
        Ok(insert_into(feedbacks::table)
            .values(new)
            .returning(Feedback::as_returning())
            .get_result(self.conn)
            .await?)
    }

    pub async fn insert_complaint(&mut self, new: &NewComplaint) -> Result<Complaint, StoreError> {
        Ok(insert_into(complaints::table)
            .values(new)
            .returning(Complaint::as_returning())
            .get_result(self.conn)
            .await?)
    }

    pub async fn feedbacks_for(
        &mut self,
        restaurant_id: i32,
        page: Page,
    ) -> Result<Vec<Feedback>, StoreError> {
        Ok(feedbacks::table
            .select(Feedback::as_select())
            .filter(feedbacks::restaurant_id.eq(restaurant_id))
            .order((feedbacks::created_at.desc(), feedbacks::id.desc()))
            .offset(page.skip)
            .limit(page.limit)
            .load(self.conn)
            .await?)
    }

    pub async fn complaints_for(
        &mut self,
        restaurant_id: i32,
        page: Page,
    ) -> Result<Vec<Complaint>, StoreError> {
        Ok(complaints::table
            .select(Complaint::as_select())
            .filter(complaints::restaurant_id.eq(restaurant_id))
            .order((complaints::created_at.desc(), complaints::id.desc()))
            .offset(page.skip)
            .limit(page.limit)
            .load(self.conn)
            .await?)
    }

    pub async fn all_feedbacks_for(&mut self, restaurant_id: i32) -> Result<Vec<Feedback>, StoreError> {
        Ok(feedbacks::table
            .select(Feedback::as_select())
            .filter(feedbacks::restaurant_id.eq(restaurant_id))
            .order(feedbacks::created_at.desc())
            .load(self.conn)
            .await?)
    }

    pub async fn all_complaints_for(
        &mut self,
        restaurant_id: i32,
    ) -> Result<Vec<Complaint>, StoreError> {
        Ok(complaints::table
            .select(Complaint::as_select())
            .filter(complaints::restaurant_id.eq(restaurant_id))
            .order(complaints::created_at.desc())
            .load(self.conn)
            .await?)
    }

    pub async fn feedbacks_since(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Feedback>, StoreError> {
        Ok(feedbacks::table
            .select(Feedback::as_select())
            .filter(feedbacks::created_at.ge(cutoff))
            .order(feedbacks::created_at.asc())
            .load(self.conn)
            .await?)
    }

    pub async fn complaints_since(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Complaint>, StoreError> {
        Ok(complaints::table
            .select(Complaint::as_select())
            .filter(complaints::created_at.ge(cutoff))
            .order(complaints::created_at.asc())
            .load(self.conn)
            .await?)
    }

    pub async fn delete_feedback(&mut self, restaurant_id: i32, id: i32) -> Result<(), StoreError> {
        let deleted = diesel::delete(
            feedbacks::table
                .filter(feedbacks::id.eq(id))
                .filter(feedbacks::restaurant_id.eq(restaurant_id)),
        )
        .execute(self.conn)
        .await?;
        if deleted == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub async fn delete_complaint(&mut self, restaurant_id: i32, id: i32) -> Result<(), StoreError> {
        let deleted = diesel::delete(
            complaints::table
                .filter(complaints::id.eq(id))
                .filter(complaints::restaurant_id.eq(restaurant_id)),
        )
        .execute(self.conn)
        .await?;
        if deleted == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
