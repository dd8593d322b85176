use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::bookings::{BookingEntity, InsertBookingEntity};
use crate::domain::value_objects::{
    bookings::BookingPatch, enums::booking_statuses::BookingStatus,
};

#[automock]
#[async_trait]
pub trait BookingRepository {
    async fn create_booking(&self, booking: InsertBookingEntity) -> Result<BookingEntity>;

    async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<BookingEntity>>;

    /// Applies `patch` to the locked row and writes it back in one transaction.
    /// A rejected patch surfaces as a `FieldViolation` inside the error.
    async fn update_booking(
        &self,
        booking_id: Uuid,
        patch: BookingPatch,
    ) -> Result<Option<BookingEntity>>;

    /// Moves the booking to `to` only while it is still in `from`.
    async fn advance_status_if(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<BookingEntity>>;
}
