use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::bookings},
};
use domain::{
    entities::bookings::{BookingEntity, InsertBookingEntity, UpdateBookingEntity},
    repositories::bookings::BookingRepository,
    value_objects::{bookings::BookingPatch, enums::booking_statuses::BookingStatus},
};

pub struct BookingPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BookingPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl BookingRepository for BookingPostgres {
    async fn create_booking(&self, booking: InsertBookingEntity) -> Result<BookingEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(bookings::table)
            .values(&booking)
            .returning(BookingEntity::as_select())
            .get_result::<BookingEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = bookings::table
            .find(booking_id)
            .select(BookingEntity::as_select())
            .first::<BookingEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn update_booking(
        &self,
        booking_id: Uuid,
        patch: BookingPatch,
    ) -> Result<Option<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<Option<BookingEntity>, anyhow::Error, _>(|conn| {
            let current = bookings::table
                .find(booking_id)
                .select(BookingEntity::as_select())
                .for_update()
                .first::<BookingEntity>(conn)
                .optional()?;

            let Some(mut booking) = current else {
                return Ok(None);
            };

            patch.apply_to(&mut booking, Utc::now())?;

            let updated = update(bookings::table.find(booking_id))
                .set(&UpdateBookingEntity::from(&booking))
                .returning(BookingEntity::as_select())
                .get_result::<BookingEntity>(conn)?;

            Ok(Some(updated))
        })?;

        Ok(result)
    }

    async fn advance_status_if(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(bookings::table.find(booking_id))
            .filter(bookings::status.eq(from.as_str()))
            .set((
                bookings::status.eq(to.as_str()),
                bookings::updated_at.eq(Utc::now()),
            ))
            .returning(BookingEntity::as_select())
            .get_result::<BookingEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
