use diesel::{insert_into, prelude::*, update};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::{
    models::{NewPlatform, Platform, PlatformChangeset},
    schema::platforms,
};

use super::StoreError;

pub struct PlatformStore<'a> {
    conn: &'a mut AsyncPgConnection,
}

impl<'a> PlatformStore<'a> {
    pub fn new(conn: &'a mut AsyncPgConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for(&mut self, restaurant_id: i32) -> Result<Vec<Platform>, StoreError> {
        Ok(platforms::table
            .select(Platform::as_select())
            .filter(platforms::restaurant_id.eq(restaurant_id))
            .order(platforms::id.asc())
            .load(self.conn)
            .await?)
    }

    pub async fn get(&mut self, id: i32) -> Result<Platform, StoreError> {
        Ok(platforms::table
            .select(Platform::as_select())
            .find(id)
            .first(self.conn)
            .await?)
    }

    pub async fn create(&mut self, new: &NewPlatform) -> Result<Platform, StoreError> {
        Ok(insert_into(platforms::table)
            .values(new)
            .returning(Platform::as_returning())
            .get_result(self.conn)
            .await?)
    }

    pub async fn update(
        &mut self,
        id: i32,
        changes: &PlatformChangeset,
    ) -> Result<Platform, StoreError> {
        if changes.name.is_none() && changes.url.is_none() {
            return self.get(id).await;
        }
        Ok(update(platforms::table.find(id))
            .set(changes)
            .returning(Platform::as_returning())
            .get_result(self.conn)
            .await?)
    }

    pub async fn delete(&mut self, id: i32) -> Result<(), StoreError> {
        let deleted = diesel::delete(platforms::table.find(id))
            .execute(self.conn)
            .await?;
        if deleted == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
