use std::sync::Arc;

use anyhow::Result;
use tourops_core::domain::{
    entities::bookings::BookingEntity,
    repositories::vehicle_blocks::VehicleBlockRepository,
    value_objects::vehicle_blocks::{BookingBlockOutcome, BookingBlockTarget},
};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub enum BlockReconciliation {
    Ensured(BookingBlockOutcome),
    Released(usize),
    Untouched,
}

/// Brings the vehicle block ledger in line with a saved booking. Safe to run repeatedly.
///
/// The snapshot only picks the repository call. The repository re-reads the booking under a
/// row lock, so a status change committed in between wins over the snapshot.
pub struct BookingBlockReconciler<V>
where
    V: VehicleBlockRepository + Send + Sync + 'static,
{
    block_repo: Arc<V>,
}

impl<V> BookingBlockReconciler<V>
where
    V: VehicleBlockRepository + Send + Sync + 'static,
{
    pub fn new(block_repo: Arc<V>) -> Self {
        Self { block_repo }
    }

    pub async fn reconcile(&self, booking: &BookingEntity) -> Result<BlockReconciliation> {
        let booking_id = booking.id;

        match booking.block_target()? {
            BookingBlockTarget::Hold { .. } => {
                let outcome = self.block_repo.ensure_booking_block(booking_id).await?;
                match &outcome {
                    BookingBlockOutcome::Created(block) => info!(
                        %booking_id,
                        vehicle_id = %block.vehicle_id,
                        block_id = %block.id,
                        "bookings: booking block created"
                    ),
                    BookingBlockOutcome::Resynced(block) => info!(
                        %booking_id,
                        vehicle_id = %block.vehicle_id,
                        block_id = %block.id,
                        "bookings: booking block moved to match booking"
                    ),
                    BookingBlockOutcome::Released(released) => info!(
                        %booking_id,
                        released,
                        "bookings: booking changed concurrently, blocks released"
                    ),
                    BookingBlockOutcome::Unchanged(_) | BookingBlockOutcome::Untouched => {}
                }
                Ok(BlockReconciliation::Ensured(outcome))
            }
            BookingBlockTarget::Release => {
                let released = self.block_repo.delete_blocks_for_booking(booking_id).await?;
                if released > 0 {
                    info!(%booking_id, released, "bookings: booking blocks released");
                }
                Ok(BlockReconciliation::Released(released))
            }
            BookingBlockTarget::Leave => Ok(BlockReconciliation::Untouched),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use mockall::predicate::eq;
    use rust_decimal::Decimal;
    use tourops_core::domain::{
        entities::vehicle_blocks::VehicleBlockEntity,
        repositories::vehicle_blocks::MockVehicleBlockRepository,
        value_objects::enums::booking_statuses::BookingStatus,
    };
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn booking(status: BookingStatus, vehicle_id: Option<Uuid>) -> BookingEntity {
        BookingEntity {
            id: Uuid::new_v4(),
            booking_no: 12,
            customer_name: "Nimal Perera".to_string(),
            customer_email: "nimal@example.com".to_string(),
            customer_phone: None,
            booking_type: "VEHICLE".to_string(),
            from_date: day(10),
            to_date: day(15),
            pax: 2,
            status: status.as_str().to_string(),
            assigned_vehicle_id: vehicle_id,
            total_cost: Decimal::new(100000, 2),
            paid_amount: Decimal::ZERO,
            remaining_balance: Decimal::new(100000, 2),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn block_for(booking: &BookingEntity) -> VehicleBlockEntity {
        VehicleBlockEntity {
            id: Uuid::new_v4(),
            vehicle_id: booking.assigned_vehicle_id.unwrap(),
            from_date: booking.from_date,
            to_date: booking.to_date,
            reason: "BOOKING".to_string(),
            booking_id: Some(booking.id),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn confirmed_booking_with_vehicle_ensures_block() {
        let vehicle_id = Uuid::new_v4();
        let confirmed = booking(BookingStatus::Confirmed, Some(vehicle_id));
        let block = block_for(&confirmed);

        let mut block_repo = MockVehicleBlockRepository::new();
        let created = block.clone();
        block_repo
            .expect_ensure_booking_block()
            .with(eq(confirmed.id))
            .times(1)
            .returning(move |_| Ok(BookingBlockOutcome::Created(created.clone())));

        let result = BookingBlockReconciler::new(Arc::new(block_repo))
            .reconcile(&confirmed)
            .await
            .unwrap();

        assert_eq!(
            result,
            BlockReconciliation::Ensured(BookingBlockOutcome::Created(block))
        );
    }

    #[tokio::test]
    async fn confirmation_overtaken_by_cancel_releases_instead() {
        let stale = booking(BookingStatus::Confirmed, Some(Uuid::new_v4()));

        let mut block_repo = MockVehicleBlockRepository::new();
        block_repo
            .expect_ensure_booking_block()
            .with(eq(stale.id))
            .times(1)
            .returning(|_| Ok(BookingBlockOutcome::Released(0)));
        block_repo.expect_delete_blocks_for_booking().never();

        let result = BookingBlockReconciler::new(Arc::new(block_repo))
            .reconcile(&stale)
            .await
            .unwrap();

        assert_eq!(
            result,
            BlockReconciliation::Ensured(BookingBlockOutcome::Released(0))
        );
    }

    #[tokio::test]
    async fn cancelled_booking_releases_blocks() {
        let cancelled = booking(BookingStatus::Cancelled, Some(Uuid::new_v4()));

        let mut block_repo = MockVehicleBlockRepository::new();
        block_repo
            .expect_delete_blocks_for_booking()
            .with(eq(cancelled.id))
            .times(1)
            .returning(|_| Ok(1));

        let result = BookingBlockReconciler::new(Arc::new(block_repo))
            .reconcile(&cancelled)
            .await
            .unwrap();

        assert_eq!(result, BlockReconciliation::Released(1));
    }

    #[tokio::test]
    async fn confirmed_booking_without_vehicle_holds_no_block() {
        let confirmed = booking(BookingStatus::Confirmed, None);

        let mut block_repo = MockVehicleBlockRepository::new();
        block_repo
            .expect_delete_blocks_for_booking()
            .times(1)
            .returning(|_| Ok(0));
        block_repo.expect_ensure_booking_block().never();

        let result = BookingBlockReconciler::new(Arc::new(block_repo))
            .reconcile(&confirmed)
            .await
            .unwrap();

        assert_eq!(result, BlockReconciliation::Released(0));
    }

    #[tokio::test]
    async fn other_statuses_leave_ledger_alone() {
        for status in [
            BookingStatus::New,
            BookingStatus::Contacted,
            BookingStatus::Completed,
        ] {
            let mut block_repo = MockVehicleBlockRepository::new();
            block_repo.expect_ensure_booking_block().never();
            block_repo.expect_delete_blocks_for_booking().never();

            let result = BookingBlockReconciler::new(Arc::new(block_repo))
                .reconcile(&booking(status, Some(Uuid::new_v4())))
                .await
                .unwrap();

            assert_eq!(result, BlockReconciliation::Untouched);
        }
    }
}
