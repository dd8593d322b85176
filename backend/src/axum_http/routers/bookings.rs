use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tourops_core::{
    domain::{
        repositories::{
            audit_logs::AuditLogRepository, bookings::BookingRepository,
            vehicle_blocks::VehicleBlockRepository,
        },
        value_objects::bookings::{BookingPatch, InsertBookingModel},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            audit_logs::AuditLogPostgres, bookings::BookingPostgres,
            vehicle_blocks::VehicleBlockPostgres,
        },
    },
};
use uuid::Uuid;

use crate::{
    axum_http::{auth::StaffUser, error_responses::json_error},
    usecases::bookings::BookingUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let booking_usecase = BookingUseCase::new(
        Arc::new(BookingPostgres::new(Arc::clone(&db_pool))),
        Arc::new(VehicleBlockPostgres::new(Arc::clone(&db_pool))),
        Arc::new(AuditLogPostgres::new(Arc::clone(&db_pool))),
    );

    Router::new()
        .route("/", post(create_booking))
        .route("/:id", get(get_booking).patch(update_booking))
        .with_state(Arc::new(booking_usecase))
}

pub async fn create_booking<B, V, A>(
    State(booking_usecase): State<Arc<BookingUseCase<B, V, A>>>,
    staff: StaffUser,
    payload: Result<Json<InsertBookingModel>, JsonRejection>,
) -> Response
where
    B: BookingRepository + Send + Sync + 'static,
    V: VehicleBlockRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    let Json(insert_booking_model) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match booking_usecase
        .create_booking(&staff.subject, insert_booking_model)
        .await
    {
        Ok(booking) => (StatusCode::CREATED, Json(booking)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_booking<B, V, A>(
    State(booking_usecase): State<Arc<BookingUseCase<B, V, A>>>,
    _staff: StaffUser,
    Path(booking_id): Path<Uuid>,
) -> Response
where
    B: BookingRepository + Send + Sync + 'static,
    V: VehicleBlockRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    match booking_usecase.get_booking(booking_id).await {
        Ok(booking) => (StatusCode::OK, Json(booking)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_booking<B, V, A>(
    State(booking_usecase): State<Arc<BookingUseCase<B, V, A>>>,
    staff: StaffUser,
    Path(booking_id): Path<Uuid>,
    payload: Result<Json<BookingPatch>, JsonRejection>,
) -> Response
where
    B: BookingRepository + Send + Sync + 'static,
    V: VehicleBlockRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    let Json(patch) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match booking_usecase
        .update_booking(&staff.subject, booking_id, patch)
        .await
    {
        Ok(booking) => (StatusCode::OK, Json(booking)).into_response(),
        Err(err) => err.into_response(),
    }
}
