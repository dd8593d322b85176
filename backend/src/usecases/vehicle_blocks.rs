use std::sync::Arc;

use tourops_core::domain::{
    entities::audit_logs::InsertAuditLogEntity,
    repositories::{audit_logs::AuditLogRepository, vehicle_blocks::VehicleBlockRepository},
    value_objects::{
        enums::block_reasons::BlockReason,
        vehicle_blocks::{
            AvailabilityModel, AvailabilityQuery, CalendarQuery, InsertManualBlockModel,
            ManualBlockOutcome, VehicleBlockModel, partition_availability,
        },
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    audit::AuditTrail,
    errors::{UseCaseError, UseCaseResult},
};

pub struct VehicleBlockUseCase<V, A>
where
    V: VehicleBlockRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    block_repo: Arc<V>,
    audit: AuditTrail<A>,
}

impl<V, A> VehicleBlockUseCase<V, A>
where
    V: VehicleBlockRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    pub fn new(block_repo: Arc<V>, audit_repo: Arc<A>) -> Self {
        Self {
            block_repo,
            audit: AuditTrail::new(audit_repo),
        }
    }

    pub async fn create_manual_block(
        &self,
        actor: &str,
        model: InsertManualBlockModel,
    ) -> UseCaseResult<VehicleBlockModel> {
        let vehicle_id = model.vehicle_id;
        let (range, insert) = model.into_entity().inspect_err(|violation| {
            warn!(%vehicle_id, field = violation.field, "vehicle_blocks: invalid block");
        })?;

        self.ensure_vehicle_exists(vehicle_id).await?;

        let outcome = self
            .block_repo
            .create_manual_block(insert)
            .await
            .map_err(|err| {
                error!(%vehicle_id, db_error = ?err, "vehicle_blocks: failed to create block");
                UseCaseError::Unavailable(err)
            })?;

        let block = match outcome {
            ManualBlockOutcome::Created(block) => block,
            ManualBlockOutcome::Conflict(conflicts) => {
                let conflicting_block_ids: Vec<Uuid> =
                    conflicts.iter().map(|block| block.id).collect();
                warn!(
                    %vehicle_id,
                    from = %range.from(),
                    to = %range.to(),
                    conflicts = ?conflicting_block_ids,
                    "vehicle_blocks: block overlaps existing blocks"
                );
                return Err(UseCaseError::Conflict {
                    conflicting_block_ids,
                });
            }
            ManualBlockOutcome::MissingBooking(booking_id) => {
                warn!(%vehicle_id, %booking_id, "vehicle_blocks: block names an unknown booking");
                return Err(UseCaseError::not_found("booking", booking_id));
            }
        };

        info!(
            %vehicle_id,
            block_id = %block.id,
            reason = %block.reason,
            "vehicle_blocks: block created"
        );

        self.audit
            .record(InsertAuditLogEntity::new(
                actor,
                "vehicle_block.created",
                "vehicle_block",
                block.id,
                serde_json::json!({
                    "vehicleId": vehicle_id,
                    "from": block.from_date,
                    "to": block.to_date,
                    "reason": block.reason,
                    "bookingId": block.booking_id,
                }),
            ))
            .await;

        Ok(VehicleBlockModel::try_from(block)?)
    }

    /// Deleting a `BOOKING` block is allowed and leaves the booking as it is.
    pub async fn delete_block(&self, actor: &str, block_id: Uuid) -> UseCaseResult<VehicleBlockModel> {
        let block = self
            .block_repo
            .delete_block(block_id)
            .await
            .map_err(|err| {
                error!(%block_id, db_error = ?err, "vehicle_blocks: failed to delete block");
                UseCaseError::Unavailable(err)
            })?
            .ok_or_else(|| UseCaseError::not_found("vehicle block", block_id))?;

        if block.block_reason()? == BlockReason::Booking {
            warn!(
                %block_id,
                booking_id = ?block.booking_id,
                "vehicle_blocks: booking block deleted by hand, booking left unchanged"
            );
        } else {
            info!(%block_id, vehicle_id = %block.vehicle_id, "vehicle_blocks: block deleted");
        }

        self.audit
            .record(InsertAuditLogEntity::new(
                actor,
                "vehicle_block.deleted",
                "vehicle_block",
                block_id,
                serde_json::json!({
                    "vehicleId": block.vehicle_id,
                    "reason": block.reason,
                    "bookingId": block.booking_id,
                }),
            ))
            .await;

        Ok(VehicleBlockModel::try_from(block)?)
    }

    pub async fn list_for_vehicle(
        &self,
        vehicle_id: Uuid,
        query: CalendarQuery,
    ) -> UseCaseResult<Vec<VehicleBlockModel>> {
        let range = query.range()?;
        self.ensure_vehicle_exists(vehicle_id).await?;

        let blocks = self
            .block_repo
            .list_for_vehicle(vehicle_id, range)
            .await
            .map_err(|err| {
                error!(%vehicle_id, db_error = ?err, "vehicle_blocks: failed to list blocks");
                UseCaseError::Unavailable(err)
            })?;

        let models = blocks
            .into_iter()
            .map(VehicleBlockModel::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(models)
    }

    pub async fn check_availability(&self, query: AvailabilityQuery) -> UseCaseResult<AvailabilityModel> {
        let (vehicle_ids, range) = query.parse()?;

        let blocks = self
            .block_repo
            .list_overlapping(vehicle_ids.clone(), range)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "vehicle_blocks: failed to load blocks for availability");
                UseCaseError::Unavailable(err)
            })?;

        Ok(partition_availability(&vehicle_ids, &range, &blocks))
    }

    async fn ensure_vehicle_exists(&self, vehicle_id: Uuid) -> UseCaseResult<()> {
        let exists = self
            .block_repo
            .vehicle_exists(vehicle_id)
            .await
            .map_err(|err| {
                error!(%vehicle_id, db_error = ?err, "vehicle_blocks: failed to look up vehicle");
                UseCaseError::Unavailable(err)
            })?;

        if !exists {
            warn!(%vehicle_id, "vehicle_blocks: unknown vehicle");
            return Err(UseCaseError::not_found("vehicle", vehicle_id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use mockall::predicate::eq;
    use tourops_core::domain::{
        entities::vehicle_blocks::VehicleBlockEntity,
        repositories::{
            audit_logs::MockAuditLogRepository, vehicle_blocks::MockVehicleBlockRepository,
        },
        value_objects::date_ranges::DateRange,
    };

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn block(vehicle_id: Uuid, from: u32, to: u32, reason: BlockReason) -> VehicleBlockEntity {
        VehicleBlockEntity {
            id: Uuid::new_v4(),
            vehicle_id,
            from_date: day(from),
            to_date: day(to),
            reason: reason.as_str().to_string(),
            booking_id: (reason == BlockReason::Booking).then(Uuid::new_v4),
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn manual(vehicle_id: Uuid, from: u32, to: u32) -> InsertManualBlockModel {
        InsertManualBlockModel {
            vehicle_id,
            from: day(from),
            to: day(to),
            reason: BlockReason::Maintenance,
            booking_id: None,
            notes: Some("service".to_string()),
        }
    }

    fn audit_ok() -> MockAuditLogRepository {
        let mut audit_repo = MockAuditLogRepository::new();
        audit_repo.expect_record().returning(|_| Ok(()));
        audit_repo
    }

    #[tokio::test]
    async fn overlapping_manual_block_conflicts_and_adjacent_one_succeeds() {
        let vehicle_id = Uuid::new_v4();
        let existing = block(vehicle_id, 10, 15, BlockReason::Maintenance);
        let existing_id = existing.id;

        let mut block_repo = MockVehicleBlockRepository::new();
        block_repo.expect_vehicle_exists().returning(|_| Ok(true));
        block_repo
            .expect_create_manual_block()
            .returning(move |insert| {
                let requested = DateRange::new(insert.from_date, insert.to_date).unwrap();
                if existing.overlaps(&requested) {
                    Ok(ManualBlockOutcome::Conflict(vec![existing.clone()]))
                } else {
                    Ok(ManualBlockOutcome::Created(VehicleBlockEntity {
                        id: Uuid::new_v4(),
                        vehicle_id: insert.vehicle_id,
                        from_date: insert.from_date,
                        to_date: insert.to_date,
                        reason: insert.reason,
                        booking_id: insert.booking_id,
                        notes: insert.notes,
                        created_at: Utc::now(),
                    }))
                }
            });

        let usecase = VehicleBlockUseCase::new(Arc::new(block_repo), Arc::new(audit_ok()));

        let err = usecase
            .create_manual_block("staff-1", manual(vehicle_id, 14, 20))
            .await
            .unwrap_err();
        match err {
            UseCaseError::Conflict {
                conflicting_block_ids,
            } => assert_eq!(conflicting_block_ids, vec![existing_id]),
            other => panic!("unexpected error: {other:?}"),
        }

        let created = usecase
            .create_manual_block("staff-1", manual(vehicle_id, 16, 20))
            .await
            .unwrap();
        assert_eq!(created.from, day(16));
        assert_eq!(created.reason, BlockReason::Maintenance);
    }

    #[tokio::test]
    async fn manual_block_for_unknown_vehicle_is_not_found() {
        let mut block_repo = MockVehicleBlockRepository::new();
        block_repo.expect_vehicle_exists().returning(|_| Ok(false));
        block_repo.expect_create_manual_block().never();

        let usecase = VehicleBlockUseCase::new(
            Arc::new(block_repo),
            Arc::new(MockAuditLogRepository::new()),
        );

        let err = usecase
            .create_manual_block("staff-1", manual(Uuid::new_v4(), 1, 2))
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::NotFound { entity: "vehicle", .. }));
    }

    #[tokio::test]
    async fn booking_block_for_unknown_booking_is_not_found() {
        let booking_id = Uuid::new_v4();

        let mut block_repo = MockVehicleBlockRepository::new();
        block_repo.expect_vehicle_exists().returning(|_| Ok(true));
        block_repo
            .expect_create_manual_block()
            .times(1)
            .returning(|insert| {
                Ok(ManualBlockOutcome::MissingBooking(
                    insert.booking_id.unwrap(),
                ))
            });

        let usecase = VehicleBlockUseCase::new(
            Arc::new(block_repo),
            Arc::new(MockAuditLogRepository::new()),
        );

        let mut model = manual(Uuid::new_v4(), 1, 2);
        model.reason = BlockReason::Booking;
        model.booking_id = Some(booking_id);
        let err = usecase.create_manual_block("staff-1", model).await.unwrap_err();

        match err {
            UseCaseError::NotFound { entity, id } => {
                assert_eq!(entity, "booking");
                assert_eq!(id, booking_id.to_string());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            UseCaseError::not_found("booking", booking_id).status_code(),
            axum::http::StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn booking_reason_without_booking_id_is_invalid() {
        let mut block_repo = MockVehicleBlockRepository::new();
        block_repo.expect_vehicle_exists().never();

        let usecase = VehicleBlockUseCase::new(
            Arc::new(block_repo),
            Arc::new(MockAuditLogRepository::new()),
        );

        let mut model = manual(Uuid::new_v4(), 1, 2);
        model.reason = BlockReason::Booking;
        let err = usecase.create_manual_block("staff-1", model).await.unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidArgument { field: "bookingId", .. }));
    }

    #[tokio::test]
    async fn deleting_booking_block_is_allowed() {
        let removed = block(Uuid::new_v4(), 10, 15, BlockReason::Booking);
        let block_id = removed.id;

        let mut block_repo = MockVehicleBlockRepository::new();
        block_repo
            .expect_delete_block()
            .with(eq(block_id))
            .times(1)
            .returning(move |_| Ok(Some(removed.clone())));

        let usecase = VehicleBlockUseCase::new(Arc::new(block_repo), Arc::new(audit_ok()));

        let deleted = usecase.delete_block("staff-1", block_id).await.unwrap();

        assert_eq!(deleted.id, block_id);
        assert_eq!(deleted.reason, BlockReason::Booking);
    }

    #[tokio::test]
    async fn deleting_unknown_block_is_not_found() {
        let mut block_repo = MockVehicleBlockRepository::new();
        block_repo.expect_delete_block().returning(|_| Ok(None));

        let usecase = VehicleBlockUseCase::new(
            Arc::new(block_repo),
            Arc::new(MockAuditLogRepository::new()),
        );

        let err = usecase.delete_block("staff-1", Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, UseCaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn lists_calendar_within_window() {
        let vehicle_id = Uuid::new_v4();
        let window = DateRange::new(day(1), day(30)).unwrap();

        let mut block_repo = MockVehicleBlockRepository::new();
        block_repo.expect_vehicle_exists().returning(|_| Ok(true));
        block_repo
            .expect_list_for_vehicle()
            .with(eq(vehicle_id), eq(Some(window)))
            .times(1)
            .returning(move |vehicle_id, _| {
                Ok(vec![
                    block(vehicle_id, 2, 4, BlockReason::Personal),
                    block(vehicle_id, 10, 15, BlockReason::Booking),
                ])
            });

        let usecase = VehicleBlockUseCase::new(
            Arc::new(block_repo),
            Arc::new(MockAuditLogRepository::new()),
        );

        let blocks = usecase
            .list_for_vehicle(
                vehicle_id,
                CalendarQuery {
                    from: Some(day(1)),
                    to: Some(day(30)),
                },
            )
            .await
            .unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].reason, BlockReason::Booking);
    }

    #[tokio::test]
    async fn availability_reports_blocked_vehicles() {
        let free = Uuid::new_v4();
        let busy = Uuid::new_v4();
        let range = DateRange::new(day(10), day(15)).unwrap();

        let mut block_repo = MockVehicleBlockRepository::new();
        block_repo
            .expect_list_overlapping()
            .with(eq(vec![busy, free]), eq(range))
            .times(1)
            .returning(move |_, _| Ok(vec![block(busy, 15, 18, BlockReason::Other)]));

        let usecase = VehicleBlockUseCase::new(
            Arc::new(block_repo),
            Arc::new(MockAuditLogRepository::new()),
        );

        let availability = usecase
            .check_availability(AvailabilityQuery {
                from: Some(day(10)),
                to: Some(day(15)),
                vehicle_ids: Some(format!("{busy},{free}")),
            })
            .await
            .unwrap();

        assert_eq!(availability.available, vec![free]);
        assert_eq!(availability.unavailable, vec![busy]);
    }
}
