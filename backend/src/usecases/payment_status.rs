use std::sync::Arc;

use tourops_core::domain::{
    repositories::payments::PaymentRepository,
    value_objects::payments::{PaymentStatusEnvelope, PaymentStatusModel},
};
use tracing::{debug, error, warn};

use super::errors::{UseCaseError, UseCaseResult};

pub struct PaymentStatusUseCase<P>
where
    P: PaymentRepository + Send + Sync + 'static,
{
    payment_repo: Arc<P>,
}

impl<P> PaymentStatusUseCase<P>
where
    P: PaymentRepository + Send + Sync + 'static,
{
    pub fn new(payment_repo: Arc<P>) -> Self {
        Self { payment_repo }
    }

    pub async fn get_status(&self, order_id: Option<String>) -> UseCaseResult<PaymentStatusEnvelope> {
        let order_id = order_id
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| UseCaseError::invalid("orderId", "is required"))?;

        let payment = self
            .payment_repo
            .find_by_order_id(order_id.clone())
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "payment_status: failed to load payment");
                UseCaseError::Unavailable(err)
            })?
            .ok_or_else(|| {
                warn!(%order_id, "payment_status: unknown order");
                UseCaseError::not_found("payment", &order_id)
            })?;

        let payment = PaymentStatusModel::try_from(&payment)?;
        debug!(%order_id, status = %payment.status, "payment_status: served");

        Ok(PaymentStatusEnvelope { payment })
    }
}
