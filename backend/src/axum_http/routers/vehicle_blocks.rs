use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use tourops_core::{
    domain::{
        repositories::{audit_logs::AuditLogRepository, vehicle_blocks::VehicleBlockRepository},
        value_objects::vehicle_blocks::{AvailabilityQuery, CalendarQuery, InsertManualBlockModel},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{audit_logs::AuditLogPostgres, vehicle_blocks::VehicleBlockPostgres},
    },
};
use uuid::Uuid;

use crate::{
    axum_http::{auth::StaffUser, error_responses::json_error},
    usecases::vehicle_blocks::VehicleBlockUseCase,
};

/// The availability check is public, the rest is staff only.
pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let vehicle_block_usecase = VehicleBlockUseCase::new(
        Arc::new(VehicleBlockPostgres::new(Arc::clone(&db_pool))),
        Arc::new(AuditLogPostgres::new(Arc::clone(&db_pool))),
    );

    Router::new()
        .route("/api/v1/vehicles/availability", get(check_availability))
        .route("/api/v1/admin/vehicles/:vehicle_id/blocks", get(list_vehicle_blocks))
        .route("/api/v1/admin/vehicle-blocks", post(create_manual_block))
        .route("/api/v1/admin/vehicle-blocks/:id", delete(delete_block))
        .with_state(Arc::new(vehicle_block_usecase))
}

pub async fn check_availability<V, A>(
    State(vehicle_block_usecase): State<Arc<VehicleBlockUseCase<V, A>>>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Response
where
    V: VehicleBlockRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return json_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match vehicle_block_usecase.check_availability(query).await {
        Ok(availability) => (StatusCode::OK, Json(availability)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_vehicle_blocks<V, A>(
    State(vehicle_block_usecase): State<Arc<VehicleBlockUseCase<V, A>>>,
    _staff: StaffUser,
    Path(vehicle_id): Path<Uuid>,
    query: Result<Query<CalendarQuery>, QueryRejection>,
) -> Response
where
    V: VehicleBlockRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return json_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match vehicle_block_usecase.list_for_vehicle(vehicle_id, query).await {
        Ok(blocks) => (StatusCode::OK, Json(blocks)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_manual_block<V, A>(
    State(vehicle_block_usecase): State<Arc<VehicleBlockUseCase<V, A>>>,
    staff: StaffUser,
    payload: Result<Json<InsertManualBlockModel>, JsonRejection>,
) -> Response
where
    V: VehicleBlockRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    let Json(insert_block_model) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match vehicle_block_usecase
        .create_manual_block(&staff.subject, insert_block_model)
        .await
    {
        Ok(block) => (StatusCode::CREATED, Json(block)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn delete_block<V, A>(
    State(vehicle_block_usecase): State<Arc<VehicleBlockUseCase<V, A>>>,
    staff: StaffUser,
    Path(block_id): Path<Uuid>,
) -> Response
where
    V: VehicleBlockRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    match vehicle_block_usecase
        .delete_block(&staff.subject, block_id)
        .await
    {
        Ok(block) => (StatusCode::OK, Json(block)).into_response(),
        Err(err) => err.into_response(),
    }
}
