use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tourops_core::{
    domain::{
        entities::{
            audit_logs::InsertAuditLogEntity,
            payments::{InsertPaymentEntity, PaymentEntity},
        },
        repositories::{
            audit_logs::AuditLogRepository,
            bookings::BookingRepository,
            payments::{DuplicateOrderId, PaymentRepository},
        },
        value_objects::{
            enums::{
                booking_statuses::BookingStatus, payment_providers::PaymentProvider,
                payment_statuses::PaymentStatus, payment_types::PaymentType,
            },
            payments::{CheckoutCustomerModel, CreateCheckoutModel},
            validation::FieldViolation,
        },
    },
    payments::payhere::{CheckoutCustomer, OrderIdGenerator, PayHereCheckout, PayHereCheckoutFields},
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    audit::AuditTrail,
    errors::{UseCaseError, UseCaseResult},
};

const MAX_ORDER_ID_ATTEMPTS: usize = 3;
const DEFAULT_COUNTRY: &str = "Sri Lanka";

/// Largest amount a `NUMERIC(12,2)` column holds.
fn max_amount() -> Decimal {
    Decimal::new(9_999_999_999_99, 2)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionModel {
    pub action_url: String,
    pub order_id: String,
    pub fields: PayHereCheckoutFields,
}

fn validate_amount(amount: Option<Decimal>) -> Result<Decimal, FieldViolation> {
    let amount = amount.ok_or_else(|| FieldViolation::new("amount", "is required"))?;
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded <= Decimal::ZERO {
        return Err(FieldViolation::new("amount", "must be greater than 0"));
    }
    if rounded > max_amount() {
        return Err(FieldViolation::new("amount", "is too large"));
    }
    Ok(rounded)
}

fn validate_customer(customer: CheckoutCustomerModel) -> Result<CheckoutCustomer, FieldViolation> {
    let required = |field: &'static str, value: Option<String>| {
        value
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| FieldViolation::new(field, "is required"))
    };

    Ok(CheckoutCustomer {
        first_name: required("customer.firstName", customer.first_name)?,
        last_name: required("customer.lastName", customer.last_name)?,
        email: required("customer.email", customer.email)?,
        phone: required("customer.phone", customer.phone)?,
        address: required("customer.address", customer.address)?,
        city: required("customer.city", customer.city)?,
        country: customer
            .country
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
    })
}

pub struct CheckoutUseCase<B, P, A, G>
where
    B: BookingRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
    G: OrderIdGenerator + Send + Sync + 'static,
{
    booking_repo: Arc<B>,
    payment_repo: Arc<P>,
    audit: AuditTrail<A>,
    order_ids: Arc<G>,
    payhere: Arc<PayHereCheckout>,
}

impl<B, P, A, G> CheckoutUseCase<B, P, A, G>
where
    B: BookingRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    A: AuditLogRepository + Send + Sync + 'static,
    G: OrderIdGenerator + Send + Sync + 'static,
{
    pub fn new(
        booking_repo: Arc<B>,
        payment_repo: Arc<P>,
        audit_repo: Arc<A>,
        order_ids: Arc<G>,
        payhere: Arc<PayHereCheckout>,
    ) -> Self {
        Self {
            booking_repo,
            payment_repo,
            audit: AuditTrail::new(audit_repo),
            order_ids,
            payhere,
        }
    }

    pub async fn create_checkout(
        &self,
        model: CreateCheckoutModel,
    ) -> UseCaseResult<CheckoutSessionModel> {
        let booking_id = model.booking_id;
        info!(%booking_id, "checkout: session requested");

        let amount = validate_amount(model.amount).inspect_err(|violation| {
            warn!(%booking_id, field = violation.field, "checkout: invalid amount");
        })?;
        let customer = validate_customer(model.customer).inspect_err(|violation| {
            warn!(%booking_id, field = violation.field, "checkout: invalid customer");
        })?;

        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await
            .map_err(|err| {
                error!(%booking_id, db_error = ?err, "checkout: failed to load booking");
                UseCaseError::Unavailable(err)
            })?
            .ok_or_else(|| {
                warn!(%booking_id, "checkout: booking not found");
                UseCaseError::not_found("booking", booking_id)
            })?;

        if booking.booking_status()? == BookingStatus::Cancelled {
            warn!(%booking_id, "checkout: booking is cancelled");
            return Err(UseCaseError::invalid("bookingId", "booking is cancelled"));
        }

        let payment = self.insert_initiated_payment(booking_id, amount).await?;
        let order_id = payment.order_id.clone().unwrap_or_default();

        let items = model
            .items
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| format!("Booking {}", booking.reference()));

        let fields = self
            .payhere
            .build_fields(&order_id, amount, &items, customer)
            .map_err(|err| {
                error!(%booking_id, %order_id, error = ?err, "checkout: failed to build checkout fields");
                UseCaseError::Unavailable(err)
            })?;

        self.audit
            .record(InsertAuditLogEntity::new(
                "customer",
                "payment.checkout_created",
                "payment",
                payment.id,
                serde_json::json!({
                    "bookingId": booking_id,
                    "orderId": order_id,
                    "amount": fields.amount,
                    "currency": fields.currency,
                }),
            ))
            .await;

        info!(%booking_id, %order_id, amount = %fields.amount, "checkout: session created");

        Ok(CheckoutSessionModel {
            action_url: self.payhere.action_url().to_string(),
            order_id,
            fields,
        })
    }

    async fn insert_initiated_payment(
        &self,
        booking_id: Uuid,
        amount: Decimal,
    ) -> UseCaseResult<PaymentEntity> {
        for attempt in 1..=MAX_ORDER_ID_ATTEMPTS {
            let order_id = self.order_ids.next_order_id();

            let insert = InsertPaymentEntity {
                booking_id,
                order_id: Some(order_id.clone()),
                amount,
                currency: self.payhere.currency().to_string(),
                provider: PaymentProvider::PayHere.as_str().to_string(),
                status: PaymentStatus::Initiated.as_str().to_string(),
                payment_type: PaymentType::Payment.as_str().to_string(),
                method: None,
                signature_verified: false,
            };

            match self.payment_repo.create_payment(insert).await {
                Ok(payment) => return Ok(payment),
                Err(err) if err.downcast_ref::<DuplicateOrderId>().is_some() => {
                    warn!(%booking_id, %order_id, attempt, "checkout: order id collision, regenerating");
                }
                Err(err) => {
                    error!(%booking_id, %order_id, db_error = ?err, "checkout: failed to create payment");
                    return Err(UseCaseError::Unavailable(err));
                }
            }
        }

        error!(%booking_id, "checkout: could not allocate a unique order id");
        Err(UseCaseError::Unavailable(anyhow::anyhow!(
            "could not allocate a unique order id after {MAX_ORDER_ID_ATTEMPTS} attempts"
        )))
    }
}
