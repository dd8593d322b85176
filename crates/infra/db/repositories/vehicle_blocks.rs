use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::{
    PgConnection, RunQueryDsl, delete,
    dsl::{And, GtEq, LtEq, exists},
    insert_into,
    prelude::*,
    select,
    sql_types::Text,
    update,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{bookings, vehicle_blocks, vehicles},
    },
};
use domain::{
    entities::{
        bookings::BookingEntity,
        vehicle_blocks::{InsertVehicleBlockEntity, VehicleBlockEntity},
    },
    repositories::vehicle_blocks::VehicleBlockRepository,
    value_objects::{
        date_ranges::DateRange,
        enums::block_reasons::BlockReason,
        vehicle_blocks::{BookingBlockOutcome, BookingBlockTarget, ManualBlockOutcome},
    },
};

pub struct VehicleBlockPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl VehicleBlockPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

// Held until the surrounding transaction ends.
fn lock_vehicle(conn: &mut PgConnection, vehicle_id: Uuid) -> QueryResult<()> {
    diesel::sql_query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind::<Text, _>(vehicle_id.to_string())
        .execute(conn)?;
    Ok(())
}

type OverlapsRange = And<
    LtEq<vehicle_blocks::from_date, NaiveDate>,
    GtEq<vehicle_blocks::to_date, NaiveDate>,
>;

/// Row filter form of `DateRange::overlaps`: closed intervals, touching ends overlap.
fn overlaps_range(range: &DateRange) -> OverlapsRange {
    vehicle_blocks::from_date
        .le(range.to())
        .and(vehicle_blocks::to_date.ge(range.from()))
}

// Lock order is booking row first, then vehicle.
fn lock_booking(conn: &mut PgConnection, booking_id: Uuid) -> QueryResult<Option<BookingEntity>> {
    bookings::table
        .find(booking_id)
        .select(BookingEntity::as_select())
        .for_update()
        .first::<BookingEntity>(conn)
        .optional()
}

fn overlapping_blocks(
    conn: &mut PgConnection,
    vehicle_id: Uuid,
    range: &DateRange,
) -> QueryResult<Vec<VehicleBlockEntity>> {
    vehicle_blocks::table
        .filter(vehicle_blocks::vehicle_id.eq(vehicle_id))
        .filter(overlaps_range(range))
        .order(vehicle_blocks::from_date.asc())
        .select(VehicleBlockEntity::as_select())
        .load::<VehicleBlockEntity>(conn)
}

fn block_for_booking(
    conn: &mut PgConnection,
    booking_id: Uuid,
) -> QueryResult<Option<VehicleBlockEntity>> {
    vehicle_blocks::table
        .filter(vehicle_blocks::booking_id.eq(booking_id))
        .select(VehicleBlockEntity::as_select())
        .for_update()
        .first::<VehicleBlockEntity>(conn)
        .optional()
}

fn hold_booking_block(
    conn: &mut PgConnection,
    booking_id: Uuid,
    vehicle_id: Uuid,
    range: &DateRange,
) -> QueryResult<BookingBlockOutcome> {
    lock_vehicle(conn, vehicle_id)?;

    if let Some(existing) = block_for_booking(conn, booking_id)? {
        let in_sync = existing.vehicle_id == vehicle_id
            && existing.from_date == range.from()
            && existing.to_date == range.to();
        if in_sync {
            return Ok(BookingBlockOutcome::Unchanged(existing));
        }

        let moved = update(vehicle_blocks::table.find(existing.id))
            .set((
                vehicle_blocks::vehicle_id.eq(vehicle_id),
                vehicle_blocks::from_date.eq(range.from()),
                vehicle_blocks::to_date.eq(range.to()),
            ))
            .returning(VehicleBlockEntity::as_select())
            .get_result::<VehicleBlockEntity>(conn)?;
        return Ok(BookingBlockOutcome::Resynced(moved));
    }

    let created = insert_into(vehicle_blocks::table)
        .values(&InsertVehicleBlockEntity {
            vehicle_id,
            from_date: range.from(),
            to_date: range.to(),
            reason: BlockReason::Booking.as_str().to_string(),
            booking_id: Some(booking_id),
            notes: None,
        })
        .returning(VehicleBlockEntity::as_select())
        .get_result::<VehicleBlockEntity>(conn)?;

    Ok(BookingBlockOutcome::Created(created))
}

fn release_booking_blocks(conn: &mut PgConnection, booking_id: Uuid) -> QueryResult<usize> {
    delete(vehicle_blocks::table.filter(vehicle_blocks::booking_id.eq(booking_id))).execute(conn)
}

#[async_trait]
impl VehicleBlockRepository for VehicleBlockPostgres {
    async fn vehicle_exists(&self, vehicle_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let found = select(exists(vehicles::table.filter(vehicles::id.eq(vehicle_id))))
            .get_result::<bool>(&mut conn)?;

        Ok(found)
    }

    async fn create_manual_block(
        &self,
        block: InsertVehicleBlockEntity,
    ) -> Result<ManualBlockOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let range = DateRange::new(block.from_date, block.to_date)?;

        let outcome = conn.transaction::<ManualBlockOutcome, anyhow::Error, _>(|conn| {
            if let Some(booking_id) = block.booking_id {
                if lock_booking(conn, booking_id)?.is_none() {
                    return Ok(ManualBlockOutcome::MissingBooking(booking_id));
                }
            }
            lock_vehicle(conn, block.vehicle_id)?;

            let conflicts = overlapping_blocks(conn, block.vehicle_id, &range)?;
            if !conflicts.is_empty() {
                return Ok(ManualBlockOutcome::Conflict(conflicts));
            }

            if let Some(booking_id) = block.booking_id {
                if let Some(existing) = block_for_booking(conn, booking_id)? {
                    return Ok(ManualBlockOutcome::Conflict(vec![existing]));
                }
            }

            let created = insert_into(vehicle_blocks::table)
                .values(&block)
                .returning(VehicleBlockEntity::as_select())
                .get_result::<VehicleBlockEntity>(conn)?;

            Ok(ManualBlockOutcome::Created(created))
        })?;

        Ok(outcome)
    }

    async fn ensure_booking_block(&self, booking_id: Uuid) -> Result<BookingBlockOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let outcome = conn.transaction::<BookingBlockOutcome, anyhow::Error, _>(|conn| {
            let Some(booking) = lock_booking(conn, booking_id)? else {
                return Ok(BookingBlockOutcome::Untouched);
            };

            match booking.block_target()? {
                BookingBlockTarget::Hold { vehicle_id, range } => {
                    Ok(hold_booking_block(conn, booking_id, vehicle_id, &range)?)
                }
                BookingBlockTarget::Release => Ok(BookingBlockOutcome::Released(
                    release_booking_blocks(conn, booking_id)?,
                )),
                BookingBlockTarget::Leave => Ok(BookingBlockOutcome::Untouched),
            }
        })?;

        Ok(outcome)
    }

    async fn delete_blocks_for_booking(&self, booking_id: Uuid) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = conn.transaction::<usize, anyhow::Error, _>(|conn| {
            if let Some(booking) = lock_booking(conn, booking_id)? {
                if let BookingBlockTarget::Hold { .. } = booking.block_target()? {
                    return Ok(0);
                }
            }
            Ok(release_booking_blocks(conn, booking_id)?)
        })?;

        Ok(deleted)
    }

    async fn delete_block(&self, block_id: Uuid) -> Result<Option<VehicleBlockEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = delete(vehicle_blocks::table.find(block_id))
            .returning(VehicleBlockEntity::as_select())
            .get_result::<VehicleBlockEntity>(&mut conn)
            .optional()?;

        Ok(deleted)
    }

    async fn list_overlapping(
        &self,
        vehicle_ids: Vec<Uuid>,
        range: DateRange,
    ) -> Result<Vec<VehicleBlockEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = vehicle_blocks::table
            .filter(vehicle_blocks::vehicle_id.eq_any(vehicle_ids))
            .filter(overlaps_range(&range))
            .order((vehicle_blocks::vehicle_id.asc(), vehicle_blocks::from_date.asc()))
            .select(VehicleBlockEntity::as_select())
            .load::<VehicleBlockEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_for_vehicle(
        &self,
        vehicle_id: Uuid,
        range: Option<DateRange>,
    ) -> Result<Vec<VehicleBlockEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = vehicle_blocks::table
            .filter(vehicle_blocks::vehicle_id.eq(vehicle_id))
            .select(VehicleBlockEntity::as_select())
            .into_boxed();

        if let Some(range) = range {
            query = query.filter(overlaps_range(&range));
        }

        let results = query
            .order(vehicle_blocks::from_date.asc())
            .load::<VehicleBlockEntity>(&mut conn)?;

        Ok(results)
    }
}
