use diesel::{insert_into, prelude::*};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::{
    models::{NewWaitlistEntry, WaitlistEntry},
    schema::waitlist,
};

use super::{Page, StoreError};

pub struct WaitlistStore<'a> {
    conn: &'a mut AsyncPgConnection,
}

impl<'a> WaitlistStore<'a> {
    pub fn new(conn: &'a mut AsyncPgConnection) -> Self {
        Self { conn }
    }

    /// Fails with [`StoreError::Conflict`] when the email is already listed.
    pub async fn join(&mut self, email: &str) -> Result<WaitlistEntry, StoreError> {
        insert_into(waitlist::table)
            .values(NewWaitlistEntry {
                email: email.to_string(),
            })
            .returning(WaitlistEntry::as_returning())
            .get_result(self.conn)
            .await
            .map_err(|err| match StoreError::from(err) {
                StoreError::Conflict(_) => {
                    StoreError::Conflict("Email already on the waitlist".to_string())
                }
                err => err,
            })
    }

    pub async fn list(&mut self, page: Page) -> Result<Vec<WaitlistEntry>, StoreError> {
        Ok(waitlist::table
            .select(WaitlistEntry::as_select())
            .order(waitlist::created_at.desc())
            .offset(page.skip)
            .limit(page.limit)
            .load(self.conn)
            .await?)
    }
}
