use std::collections::HashMap;

use chrono::Utc;
use diesel::{dsl::exists, insert_into, prelude::*, select, update};
use diesel_async::{
    scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl,
};

use crate::{
    models::{
        NewRestaurant, NewUser, Restaurant, RestaurantChangeset, User, UserChangeset, UserRole,
    },
    schema::{restaurants, users},
};

use super::{Page, StoreError};

/// Owner account fields supplied when registering or editing a restaurant.
/// The password is already hashed.
#[derive(Debug, Default)]
pub struct OwnerUpdate {
    pub email: Option<String>,
    pub hashed_password: Option<String>,
}

pub struct RestaurantStore<'a> {
    conn: &'a mut AsyncPgConnection,
}

impl<'a> RestaurantStore<'a> {
    pub fn new(conn: &'a mut AsyncPgConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&mut self, page: Page) -> Result<Vec<Restaurant>, StoreError> {
        Ok(restaurants::table
            .select(Restaurant::as_select())
            .order(restaurants::id.asc())
            .offset(page.skip)
            .limit(page.limit)
            .load(self.conn)
            .await?)
    }

    pub async fn list_with_owners(
        &mut self,
        page: Page,
    ) -> Result<Vec<(Restaurant, Option<User>)>, StoreError> {
        let found = self.list(page).await?;
        let ids: Vec<i32> = found.iter().map(|r| r.id).collect();
        let mut owners: HashMap<i32, User> = users::table
            .select(User::as_select())
            .filter(users::restaurant_id.eq_any(ids))
            .filter(users::role.eq(UserRole::RestaurantOwner))
            .load::<User>(self.conn)
            .await?
            .into_iter()
            .filter_map(|user| user.restaurant_id.map(|id| (id, user)))
            .collect();

        Ok(found
            .into_iter()
            .map(|restaurant| {
                let owner = owners.remove(&restaurant.id);
                (restaurant, owner)
            })
            .collect())
    }

    pub async fn get(&mut self, id: i32) -> Result<Restaurant, StoreError> {
        Ok(restaurants::table
            .select(Restaurant::as_select())
            .find(id)
            .first(self.conn)
            .await?)
    }

    pub async fn get_by_subdomain(&mut self, subdomain: &str) -> Result<Restaurant, StoreError> {
        Ok(restaurants::table
            .select(Restaurant::as_select())
            .filter(restaurants::subdomain.eq(subdomain))
            .first(self.conn)
            .await?)
    }

    pub async fn exists(&mut self, id: i32) -> Result<bool, StoreError> {
        Ok(select(exists(restaurants::table.find(id)))
            .get_result(self.conn)
            .await?)
    }

    pub async fn owner(&mut self, restaurant_id: i32) -> Result<Option<User>, StoreError> {
        Ok(users::table
            .select(User::as_select())
            .filter(users::restaurant_id.eq(restaurant_id))
            .filter(users::role.eq(UserRole::RestaurantOwner))
            .order(users::id.asc())
            .first(self.conn)
            .await
            .optional()?)
    }

    /// Registers a restaurant together with its owner account.
    pub async fn create_with_owner(
        &mut self,
        restaurant: NewRestaurant,
        owner_email: String,
        owner_hashed_password: String,
    ) -> Result<(Restaurant, User), StoreError> {
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    if subdomain_taken(conn, &restaurant.subdomain, None).await? {
                        return Err(StoreError::Conflict(
                            "Subdomain already registered".to_string(),
                        ));
                    }
                    if email_taken(conn, &owner_email, None).await? {
                        return Err(StoreError::Conflict("Email already registered".to_string()));
                    }

                    let created = insert_into(restaurants::table)
                        .values(&restaurant)
                        .returning(Restaurant::as_returning())
                        .get_result::<Restaurant>(conn)
                        .await?;
                    let owner = insert_into(users::table)
                        .values(NewUser {
                            email: owner_email,
                            hashed_password: owner_hashed_password,
                            role: UserRole::RestaurantOwner,
                            restaurant_id: Some(created.id),
                        })
                        .returning(User::as_returning())
                        .get_result::<User>(conn)
                        .await?;
                    Ok((created, owner))
                }
                .scope_boxed()
            })
            .await
    }

    pub async fn update_with_owner(
        &mut self,
        id: i32,
        mut changes: RestaurantChangeset,
        owner_changes: OwnerUpdate,
    ) -> Result<(Restaurant, Option<User>), StoreError> {
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    let mut restaurant = restaurants::table
                        .select(Restaurant::as_select())
                        .find(id)
                        .for_update()
                        .first::<Restaurant>(conn)
                        .await?;

                    if let Some(subdomain) = &changes.subdomain {
                        if subdomain_taken(conn, subdomain, Some(id)).await? {
                            return Err(StoreError::Conflict(
                                "Subdomain already registered".to_string(),
                            ));
                        }
                    }

                    if changes.name.is_some() || changes.subdomain.is_some() {
                        changes.updated_at = Some(Utc::now());
                        restaurant = update(restaurants::table.find(id))
                            .set(&changes)
                            .returning(Restaurant::as_returning())
                            .get_result::<Restaurant>(conn)
                            .await?;
                    }

                    let mut owner = users::table
                        .select(User::as_select())
                        .filter(users::restaurant_id.eq(id))
                        .filter(users::role.eq(UserRole::RestaurantOwner))
                        .first::<User>(conn)
                        .await
                        .optional()?;

                    if let Some(owner_id) = owner.as_ref().map(|user| user.id) {
                        if let Some(email) = &owner_changes.email {
                            if email_taken(conn, email, Some(owner_id)).await? {
                                return Err(StoreError::Conflict(
                                    "Email already registered".to_string(),
                                ));
                            }
                        }
                        let user_changes = UserChangeset {
                            email: owner_changes.email,
                            hashed_password: owner_changes.hashed_password,
                            is_active: None,
                        };
                        if !user_changes.is_empty() {
                            owner = Some(
                                update(users::table.find(owner_id))
                                    .set(&user_changes)
                                    .returning(User::as_returning())
                                    .get_result::<User>(conn)
                                    .await?,
                            );
                        }
                    }

                    Ok((restaurant, owner))
                }
                .scope_boxed()
            })
            .await
    }

    /// Deletes the restaurant and its owner account. Submissions, platforms
    /// and star clicks go with it through the cascading foreign keys.
    pub async fn delete_with_owner(&mut self, id: i32) -> Result<(), StoreError> {
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    diesel::delete(
                        users::table
                            .filter(users::restaurant_id.eq(id))
                            .filter(users::role.eq(UserRole::RestaurantOwner)),
                    )
                    .execute(conn)
                    .await?;
                    let deleted = diesel::delete(restaurants::table.find(id))
                        .execute(conn)
                        .await?;
                    if deleted == 0 {
                        return Err(StoreError::NotFound);
                    }
                    Ok(())
                }
                .scope_boxed()
            })
            .await
    }
}

async fn subdomain_taken(
    conn: &mut AsyncPgConnection,
    subdomain: &str,
    except: Option<i32>,
) -> Result<bool, StoreError> {
    let holder = restaurants::table
        .select(restaurants::id)
        .filter(restaurants::subdomain.eq(subdomain))
        .first::<i32>(conn)
        .await
        .optional()?;
    Ok(matches!(holder, Some(id) if Some(id) != except))
}

pub(crate) async fn email_taken(
    conn: &mut AsyncPgConnection,
    email: &str,
    except: Option<i32>,
) -> Result<bool, StoreError> {
    let holder = users::table
        .select(users::id)
        .filter(users::email.eq(email))
        .first::<i32>(conn)
        .await
        .optional()?;
    Ok(matches!(holder, Some(id) if Some(id) != except))
}
