use std::sync::Arc;

use chrono::Utc;
use tourops_core::{
    domain::{
        entities::{audit_logs::InsertAuditLogEntity, payments::PaymentEntity},
        repositories::{
            audit_logs::AuditLogRepository, bookings::BookingRepository,
            payments::PaymentRepository, vehicle_blocks::VehicleBlockRepository,
        },
        value_objects::{
            enums::{booking_statuses::BookingStatus, payment_statuses::PaymentStatus},
            payments::{
                NotifyDecision, PayHereNotification, RawNotifyPayload, decide_notification,
                notification_changeset,
            },
        },
    },
    payments::payhere::PayHereSigner,
};
use tracing::{error, info, warn};

use super::{
    audit::AuditTrail,
    booking_side_effects::BookingBlockReconciler,
    errors::{UseCaseError, UseCaseResult},
};

const MAX_APPLY_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAck {
    Applied,
    Unchanged,
}

pub struct PayHereWebhookUseCase<P, B, V, A>
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    V: VehicleBlockRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    payment_repo: Arc<P>,
    booking_repo: Arc<B>,
    reconciler: BookingBlockReconciler<V>,
    audit: AuditTrail<A>,
    signer: Arc<PayHereSigner>,
}

impl<P, B, V, A> PayHereWebhookUseCase<P, B, V, A>
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    V: VehicleBlockRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
{
    pub fn new(
        payment_repo: Arc<P>,
        booking_repo: Arc<B>,
        block_repo: Arc<V>,
        audit_repo: Arc<A>,
        signer: Arc<PayHereSigner>,
    ) -> Self {
        Self {
            payment_repo,
            booking_repo,
            reconciler: BookingBlockReconciler::new(block_repo),
            audit: AuditTrail::new(audit_repo),
            signer,
        }
    }

    pub async fn handle_notification(&self, payload: RawNotifyPayload) -> UseCaseResult<WebhookAck> {
        let notification = PayHereNotification::from_payload(&payload).inspect_err(|_| {
            warn!(fields = payload.len(), "payhere_webhook: notification without order_id");
        })?;
        let order_id = notification.order_id.clone();
        let incoming_status = notification.mapped_status();
        let verified = self.signer.verify(&notification);

        if notification.merchant_id != self.signer.merchant_id() {
            warn!(
                %order_id,
                merchant_id = %notification.merchant_id,
                "payhere_webhook: notification for another merchant id"
            );
        }

        info!(
            %order_id,
            status_code = %notification.status_code,
            status = %incoming_status,
            verified,
            "payhere_webhook: notification received"
        );

        let payment = self.load_payment(&order_id).await?;
        let (payment, ack) = self
            .apply_notification(payment, &notification, &payload, verified)
            .await?;

        if ack == WebhookAck::Applied {
            self.audit
                .record(InsertAuditLogEntity::new(
                    "payhere",
                    "payment.notification_applied",
                    "payment",
                    payment.id,
                    serde_json::json!({
                        "orderId": order_id,
                        "statusCode": notification.status_code,
                        "status": payment.status,
                        "signatureVerified": payment.signature_verified,
                    }),
                ))
                .await;
        }

        if !verified {
            warn!(%order_id, "payhere_webhook: signature verification failed");
            return Err(UseCaseError::SignatureInvalid { order_id });
        }

        if incoming_status == PaymentStatus::Success
            && payment.signature_verified
            && payment.payment_status()? == PaymentStatus::Success
        {
            self.confirm_booking(&payment, &order_id).await?;
        }

        Ok(ack)
    }

    async fn load_payment(&self, order_id: &str) -> UseCaseResult<PaymentEntity> {
        self.payment_repo
            .find_by_order_id(order_id.to_string())
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "payhere_webhook: failed to load payment");
                UseCaseError::Unavailable(err)
            })?
            .ok_or_else(|| {
                warn!(%order_id, "payhere_webhook: unknown order");
                UseCaseError::not_found("payment", order_id)
            })
    }

    /// Compare-and-set against the stored `(status, signature_verified)`. A lost race reloads
    /// the row and decides again.
    async fn apply_notification(
        &self,
        mut payment: PaymentEntity,
        notification: &PayHereNotification,
        payload: &RawNotifyPayload,
        verified: bool,
    ) -> UseCaseResult<(PaymentEntity, WebhookAck)> {
        let order_id = notification.order_id.as_str();

        for attempt in 1..=MAX_APPLY_ATTEMPTS {
            let current_status = payment.payment_status()?;
            let current_verified = payment.signature_verified;

            let (status, signature_verified) = match decide_notification(
                current_status,
                current_verified,
                notification.mapped_status(),
                verified,
            ) {
                NotifyDecision::NoChange => {
                    info!(%order_id, status = %current_status, "payhere_webhook: no change");
                    return Ok((payment, WebhookAck::Unchanged));
                }
                NotifyDecision::Apply {
                    status,
                    signature_verified,
                } => (status, signature_verified),
            };

            let changes =
                notification_changeset(status, signature_verified, notification, payload, Utc::now());

            let updated = self
                .payment_repo
                .update_from_notification(payment.id, current_status, current_verified, changes)
                .await
                .map_err(|err| {
                    error!(%order_id, db_error = ?err, "payhere_webhook: failed to update payment");
                    UseCaseError::Unavailable(err)
                })?;

            match updated {
                Some(updated) => {
                    info!(
                        %order_id,
                        from = %current_status,
                        to = %status,
                        signature_verified,
                        "payhere_webhook: payment updated"
                    );
                    return Ok((updated, WebhookAck::Applied));
                }
                None => {
                    warn!(%order_id, attempt, "payhere_webhook: payment changed concurrently, reloading");
                    payment = self.load_payment(order_id).await?;
                }
            }
        }

        error!(%order_id, "payhere_webhook: payment kept changing, giving up");
        Err(UseCaseError::Unavailable(anyhow::anyhow!(
            "payment {order_id} changed on every one of {MAX_APPLY_ATTEMPTS} attempts"
        )))
    }

    async fn confirm_booking(&self, payment: &PaymentEntity, order_id: &str) -> UseCaseResult<()> {
        let booking_id = payment.booking_id;

        let advanced = self
            .booking_repo
            .advance_status_if(booking_id, BookingStatus::New, BookingStatus::Confirmed)
            .await
            .map_err(|err| {
                error!(%order_id, %booking_id, db_error = ?err, "payhere_webhook: failed to confirm booking");
                UseCaseError::Unavailable(err)
            })?;

        let booking = match advanced {
            Some(booking) => {
                info!(%order_id, %booking_id, "payhere_webhook: booking confirmed");
                self.audit
                    .record(InsertAuditLogEntity::new(
                        "payhere",
                        "booking.confirmed_by_payment",
                        "booking",
                        booking_id,
                        serde_json::json!({ "orderId": order_id }),
                    ))
                    .await;
                booking
            }
            None => self
                .booking_repo
                .find_by_id(booking_id)
                .await
                .map_err(|err| {
                    error!(%order_id, %booking_id, db_error = ?err, "payhere_webhook: failed to load booking");
                    UseCaseError::Unavailable(err)
                })?
                .ok_or_else(|| UseCaseError::not_found("booking", booking_id))?,
        };

        if booking.booking_status()? != BookingStatus::Confirmed {
            return Ok(());
        }

        self.reconciler.reconcile(&booking).await.map_err(|err| {
            error!(%order_id, %booking_id, db_error = ?err, "payhere_webhook: failed to reconcile vehicle block");
            UseCaseError::Unavailable(err)
        })?;

        Ok(())
    }
}
