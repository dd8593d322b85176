use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
};
use tourops_core::{
    domain::{
        repositories::{
            audit_logs::AuditLogRepository, bookings::BookingRepository,
            payments::PaymentRepository, vehicle_blocks::VehicleBlockRepository,
        },
        value_objects::payments::RawNotifyPayload,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            audit_logs::AuditLogPostgres, bookings::BookingPostgres, payments::PaymentPostgres,
            vehicle_blocks::VehicleBlockPostgres,
        },
    },
    payments::payhere::PayHereSigner,
};
use tracing::warn;

use crate::usecases::{
    errors::{UseCaseError, UseCaseResult},
    payhere_webhook::{PayHereWebhookUseCase, WebhookAck},
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub fn routes(db_pool: Arc<PgPoolSquad>, signer: Arc<PayHereSigner>) -> Router {
    let webhook_usecase = PayHereWebhookUseCase::new(
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
        Arc::new(BookingPostgres::new(Arc::clone(&db_pool))),
        Arc::new(VehicleBlockPostgres::new(Arc::clone(&db_pool))),
        Arc::new(AuditLogPostgres::new(Arc::clone(&db_pool))),
        signer,
    );

    Router::new()
        .route("/notify", post(notify))
        .with_state(Arc::new(webhook_usecase))
}

/// PayHere retries anything that is not a 200, so every outcome maps to a status here.
pub async fn notify<P, B, V, A>(
    State(webhook_usecase): State<Arc<PayHereWebhookUseCase<P, B, V, A>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    V: VehicleBlockRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    if !is_form_encoded(&headers) {
        warn!(
            content_type = ?headers.get(CONTENT_TYPE),
            "payhere_webhook: rejected non-form notification"
        );
        return (StatusCode::BAD_REQUEST, "expected a form-encoded body").into_response();
    }

    let payload = match RawNotifyPayload::from_form(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "payhere_webhook: unreadable form body");
            return (StatusCode::BAD_REQUEST, "malformed form body").into_response();
        }
    };

    webhook_response(webhook_usecase.handle_notification(payload).await)
}

fn is_form_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

fn webhook_response(result: UseCaseResult<WebhookAck>) -> Response {
    match result {
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(UseCaseError::SignatureInvalid { .. }) => {
            (StatusCode::BAD_REQUEST, "invalid signature").into_response()
        }
        Err(err @ UseCaseError::InvalidArgument { .. }) => {
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        Err(err @ UseCaseError::NotFound { .. }) => err.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response(),
    }
}
