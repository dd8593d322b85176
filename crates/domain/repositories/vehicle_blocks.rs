use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::vehicle_blocks::{InsertVehicleBlockEntity, VehicleBlockEntity};
use crate::domain::value_objects::{
    date_ranges::DateRange,
    vehicle_blocks::{BookingBlockOutcome, ManualBlockOutcome},
};

#[automock]
#[async_trait]
pub trait VehicleBlockRepository {
    async fn vehicle_exists(&self, vehicle_id: Uuid) -> Result<bool>;

    /// Overlap check and insert run under a per-vehicle lock.
    async fn create_manual_block(
        &self,
        block: InsertVehicleBlockEntity,
    ) -> Result<ManualBlockOutcome>;

    /// Locks the booking row and makes its single `BOOKING` block match that row: created,
    /// moved to the row's vehicle and dates, or released if the booking no longer holds one.
    /// Never checks for conflicts with other blocks.
    async fn ensure_booking_block(&self, booking_id: Uuid) -> Result<BookingBlockOutcome>;

    /// Locks the booking row and deletes its blocks, unless the row holds a block again.
    async fn delete_blocks_for_booking(&self, booking_id: Uuid) -> Result<usize>;

    /// Returns the deleted row, or `None` if it did not exist.
    async fn delete_block(&self, block_id: Uuid) -> Result<Option<VehicleBlockEntity>>;

    async fn list_overlapping(
        &self,
        vehicle_ids: Vec<Uuid>,
        range: DateRange,
    ) -> Result<Vec<VehicleBlockEntity>>;

    async fn list_for_vehicle(
        &self,
        vehicle_id: Uuid,
        range: Option<DateRange>,
    ) -> Result<Vec<VehicleBlockEntity>>;
}
