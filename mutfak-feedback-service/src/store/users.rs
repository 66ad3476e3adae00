use diesel::{insert_into, prelude::*, update};
use diesel_async::{
    scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl,
};

use crate::{
    models::{NewUser, User, UserChangeset, UserRole},
    schema::users,
};

use super::{restaurants::email_taken, StoreError};

pub struct UserStore<'a> {
    conn: &'a mut AsyncPgConnection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a mut AsyncPgConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(users::table
            .select(User::as_select())
            .filter(users::email.eq(email))
            .first(self.conn)
            .await
            .optional()?)
    }

    pub async fn get(&mut self, id: i32) -> Result<User, StoreError> {
        Ok(users::table
            .select(User::as_select())
            .find(id)
            .first(self.conn)
            .await?)
    }

    /// Creates the admin account unless a user with that email already exists.
    /// Returns whether a row was inserted.
    pub async fn ensure_admin(
        &mut self,
        email: &str,
        hashed_password: String,
    ) -> Result<bool, StoreError> {
        let inserted = insert_into(users::table)
            .values(NewUser {
                email: email.to_string(),
                hashed_password,
                role: UserRole::Admin,
                restaurant_id: None,
            })
            .on_conflict(users::email)
            .do_nothing()
            .execute(self.conn)
            .await?;
        Ok(inserted > 0)
    }

    /// Applies account settings, rejecting an email already used by someone else.
    pub async fn update_settings(
        &mut self,
        id: i32,
        changes: UserChangeset,
    ) -> Result<User, StoreError> {
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    if let Some(email) = &changes.email {
                        if email_taken(conn, email, Some(id)).await? {
                            return Err(StoreError::Conflict(
                                "Email already registered".to_string(),
                            ));
                        }
                    }
                    if changes.is_empty() {
                        return Ok(users::table
                            .select(User::as_select())
                            .find(id)
                            .first::<User>(conn)
                            .await?);
                    }
                    Ok(update(users::table.find(id))
                        .set(&changes)
                        .returning(User::as_returning())
                        .get_result::<User>(conn)
                        .await?)
                }
                .scope_boxed()
            })
            .await
    }
}
