use std::sync::Arc;

use tourops_core::domain::{
    entities::{audit_logs::InsertAuditLogEntity, bookings::BookingEntity},
    repositories::{
        audit_logs::AuditLogRepository, bookings::BookingRepository,
        vehicle_blocks::VehicleBlockRepository,
    },
    value_objects::bookings::{BookingModel, BookingPatch, InsertBookingModel},
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    audit::AuditTrail,
    booking_side_effects::BookingBlockReconciler,
    errors::{UseCaseError, UseCaseResult},
};

pub struct BookingUseCase<B, V, A>
where
    B: BookingRepository + Send + Sync + 'static,
    V: VehicleBlockRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    booking_repo: Arc<B>,
    block_repo: Arc<V>,
    reconciler: BookingBlockReconciler<V>,
    audit: AuditTrail<A>,
}

impl<B, V, A> BookingUseCase<B, V, A>
where
    B: BookingRepository + Send + Sync + 'static,
    V: VehicleBlockRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    pub fn new(booking_repo: Arc<B>, block_repo: Arc<V>, audit_repo: Arc<A>) -> Self {
        Self {
            booking_repo,
            reconciler: BookingBlockReconciler::new(Arc::clone(&block_repo)),
            block_repo,
            audit: AuditTrail::new(audit_repo),
        }
    }

    pub async fn create_booking(
        &self,
        actor: &str,
        model: InsertBookingModel,
    ) -> UseCaseResult<BookingModel> {
        let insert = model.into_entity().inspect_err(|violation| {
            warn!(field = violation.field, "bookings: invalid booking");
        })?;

        if let Some(vehicle_id) = insert.assigned_vehicle_id {
            self.ensure_vehicle_exists(vehicle_id).await?;
        }

        let booking = self
            .booking_repo
            .create_booking(insert)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "bookings: failed to create booking");
                UseCaseError::from_repository(err)
            })?;

        info!(
            booking_id = %booking.id,
            reference = %booking.reference(),
            "bookings: booking created"
        );

        self.after_save(&booking).await?;

        self.audit
            .record(InsertAuditLogEntity::new(
                actor,
                "booking.created",
                "booking",
                booking.id,
                serde_json::json!({
                    "reference": booking.reference(),
                    "status": booking.status,
                }),
            ))
            .await;

        Ok(BookingModel::try_from(booking)?)
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> UseCaseResult<BookingModel> {
        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await
            .map_err(|err| {
                error!(%booking_id, db_error = ?err, "bookings: failed to load booking");
                UseCaseError::Unavailable(err)
            })?
            .ok_or_else(|| UseCaseError::not_found("booking", booking_id))?;

        Ok(BookingModel::try_from(booking)?)
    }

    /// Saves the patch, then brings the vehicle block ledger in line with the saved row.
    pub async fn update_booking(
        &self,
        actor: &str,
        booking_id: Uuid,
        patch: BookingPatch,
    ) -> UseCaseResult<BookingModel> {
        if let Some(Some(vehicle_id)) = patch.assigned_vehicle_id {
            self.ensure_vehicle_exists(vehicle_id).await?;
        }

        let detail = serde_json::to_value(&patch).unwrap_or_default();

        let booking = self
            .booking_repo
            .update_booking(booking_id, patch)
            .await
            .map_err(|err| {
                let err = UseCaseError::from_repository(err);
                match &err {
                    UseCaseError::InvalidArgument { field, .. } => {
                        warn!(%booking_id, field, "bookings: invalid booking update");
                    }
                    _ => error!(%booking_id, db_error = ?err, "bookings: failed to update booking"),
                }
                err
            })?
            .ok_or_else(|| UseCaseError::not_found("booking", booking_id))?;

        info!(%booking_id, status = %booking.status, "bookings: booking updated");

        self.after_save(&booking).await?;

        self.audit
            .record(InsertAuditLogEntity::new(
                actor,
                "booking.updated",
                "booking",
                booking_id,
                detail,
            ))
            .await;

        Ok(BookingModel::try_from(booking)?)
    }

    async fn ensure_vehicle_exists(&self, vehicle_id: Uuid) -> UseCaseResult<()> {
        let exists = self
            .block_repo
            .vehicle_exists(vehicle_id)
            .await
            .map_err(|err| {
                error!(%vehicle_id, db_error = ?err, "bookings: failed to look up vehicle");
                UseCaseError::Unavailable(err)
            })?;

        if !exists {
            warn!(%vehicle_id, "bookings: assigned vehicle does not exist");
            return Err(UseCaseError::not_found("vehicle", vehicle_id));
        }

        Ok(())
    }

    // A failure here leaves the booking saved; repeating the request reconciles again.
    async fn after_save(&self, booking: &BookingEntity) -> UseCaseResult<()> {
        self.reconciler.reconcile(booking).await.map_err(|err| {
            error!(
                booking_id = %booking.id,
                db_error = ?err,
                "bookings: failed to reconcile vehicle blocks"
            );
            UseCaseError::Unavailable(err)
        })?;
        Ok(())
    }
}
