use std::io::Write;

use chrono::{DateTime, Utc};
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
};
use serde::{Deserialize, Serialize};

use crate::schema::{
    complaints, feedbacks, outbox, platforms, restaurants, star_click_statistics, star_clicks,
    users, waitlist,
};

#[derive(
    FromSqlRow, AsExpression, Serialize, Deserialize, PartialEq, Eq, Hash, Copy, Clone, Debug,
)]
#[diesel(sql_type = crate::schema::sql_types::UserRole)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    RestaurantOwner,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::RestaurantOwner => "restaurant_owner",
        }
    }
}

impl ToSql<crate::schema::sql_types::UserRole, Pg> for UserRole {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::UserRole, Pg> for UserRole {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"admin" => Ok(UserRole::Admin),
            b"restaurant_owner" => Ok(UserRole::RestaurantOwner),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = restaurants)]
pub struct Restaurant {
    pub id: i32,
    pub name: String,
    pub subdomain: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = restaurants)]
pub struct NewRestaurant {
    pub name: String,
    pub subdomain: String,
}

#[derive(AsChangeset, Default, Debug, PartialEq)]
#[diesel(table_name = restaurants)]
pub struct RestaurantChangeset {
    pub name: Option<String>,
    pub subdomain: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub hashed_password: String,
    pub role: UserRole,
    pub is_active: bool,
    pub restaurant_id: Option<i32>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
    pub role: UserRole,
    pub restaurant_id: Option<i32>,
}

#[derive(AsChangeset, Default, Debug, PartialEq)]
#[diesel(table_name = users)]
pub struct UserChangeset {
    pub email: Option<String>,
    pub hashed_password: Option<String>,
    pub is_active: Option<bool>,
}

impl UserChangeset {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.hashed_password.is_none() && self.is_active.is_none()
    }
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = feedbacks)]
pub struct Feedback {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub food_rating: i32,
    pub service_rating: i32,
    pub atmosphere_rating: i32,
    pub average_rating: f64,
    pub comment: Option<String>,
    pub restaurant_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = feedbacks)]
pub struct NewFeedback {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub food_rating: i32,
    pub service_rating: i32,
    pub atmosphere_rating: i32,
    pub average_rating: f64,
    pub comment: Option<String>,
    pub restaurant_id: i32,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = complaints)]
pub struct Complaint {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub food_rating: i32,
    pub service_rating: i32,
    pub atmosphere_rating: i32,
    pub average_rating: f64,
    pub comment: String,
    pub restaurant_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = complaints)]
pub struct NewComplaint {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub food_rating: i32,
    pub service_rating: i32,
    pub atmosphere_rating: i32,
    pub average_rating: f64,
    pub comment: String,
    pub restaurant_id: i32,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = platforms)]
pub struct Platform {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub restaurant_id: i32,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = platforms)]
pub struct NewPlatform {
    pub name: String,
    pub url: String,
    pub restaurant_id: i32,
}

#[derive(AsChangeset, Default, Debug, PartialEq)]
#[diesel(table_name = platforms)]
pub struct PlatformChangeset {
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = star_clicks)]
pub struct StarClick {
    pub id: i32,
    pub restaurant_id: i32,
    pub star_value: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = star_clicks)]
pub struct NewStarClick {
    pub restaurant_id: i32,
    pub star_value: i32,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = star_click_statistics)]
pub struct StarClickStatistics {
    pub id: i32,
    pub restaurant_id: i32,
    pub star_value: i32,
    pub count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = star_click_statistics)]
pub struct NewStarClickStatistics {
    pub restaurant_id: i32,
    pub star_value: i32,
    pub count: i32,
}

#[derive(Queryable, Selectable, Identifiable, Debug, PartialEq)]
#[diesel(table_name = waitlist)]
pub struct WaitlistEntry {
    pub id: i32,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = waitlist)]
pub struct NewWaitlistEntry {
    pub email: String,
}

#[derive(Queryable, Selectable, Debug, PartialEq)]
#[diesel(table_name = outbox)]
pub struct Outbox {
    pub id: i32,
    pub topic: String,
    pub key: String,
    pub value: Vec<u8>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = outbox)]
pub struct NewOutbox {
    pub topic: String,
    pub key: String,
    pub value: Vec<u8>,
}
