use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tourops_core::{
    domain::{
        repositories::{
            audit_logs::AuditLogRepository, bookings::BookingRepository,
            payments::PaymentRepository,
        },
        value_objects::payments::CreateCheckoutModel,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            audit_logs::AuditLogPostgres, bookings::BookingPostgres, payments::PaymentPostgres,
        },
    },
    payments::payhere::{OrderIdGenerator, PayHereCheckout, RandomOrderIds},
};

use crate::{
    axum_http::error_responses::json_error,
    usecases::{checkout::CheckoutUseCase, payment_status::PaymentStatusUseCase},
};

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    payhere: Arc<PayHereCheckout>,
    order_prefix: &str,
) -> Router {
    let payment_repository = Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));
    let checkout_usecase = CheckoutUseCase::new(
        Arc::new(BookingPostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&payment_repository),
        Arc::new(AuditLogPostgres::new(Arc::clone(&db_pool))),
        Arc::new(RandomOrderIds::new(order_prefix)),
        payhere,
    );
    let payment_status_usecase = PaymentStatusUseCase::new(payment_repository);

    Router::new()
        .route("/checkout", post(create_checkout))
        .with_state(Arc::new(checkout_usecase))
        .merge(
            Router::new()
                .route("/status", get(payment_status))
                .with_state(Arc::new(payment_status_usecase)),
        )
}

pub async fn create_checkout<B, P, A, G>(
    State(checkout_usecase): State<Arc<CheckoutUseCase<B, P, A, G>>>,
    payload: Result<Json<CreateCheckoutModel>, JsonRejection>,
) -> Response
where
    B: BookingRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
    G: OrderIdGenerator + Send + Sync + 'static,
{
    let Json(create_checkout_model) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match checkout_usecase.create_checkout(create_checkout_model).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusQuery {
    pub order_id: Option<String>,
}

pub async fn payment_status<P>(
    State(payment_status_usecase): State<Arc<PaymentStatusUseCase<P>>>,
    query: Result<Query<PaymentStatusQuery>, QueryRejection>,
) -> Response
where
    P: PaymentRepository + Send + Sync + 'static,
{
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return json_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match payment_status_usecase.get_status(query.order_id).await {
        Ok(envelope) => (StatusCode::OK, Json(envelope)).into_response(),
        Err(err) => err.into_response(),
    }
}
