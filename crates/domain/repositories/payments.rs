use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::payments::{
    InsertPaymentEntity, PaymentEntity, PaymentNotificationChangeset,
};
use crate::domain::value_objects::enums::payment_statuses::PaymentStatus;

/// Raised inside the `anyhow::Error` of [`PaymentRepository::create_payment`] when the
/// order id is already taken. Callers recover it with `downcast_ref`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("order id {0} is already in use")]
pub struct DuplicateOrderId(pub String);

#[automock]
#[async_trait]
pub trait PaymentRepository {
    async fn create_payment(&self, payment: InsertPaymentEntity) -> Result<PaymentEntity>;

    async fn find_by_order_id(&self, order_id: String) -> Result<Option<PaymentEntity>>;

    /// Writes `changes` only if the row still holds `(expected_status, expected_verified)`.
    /// Returns `None` when another writer got there first.
    async fn update_from_notification(
        &self,
        payment_id: Uuid,
        expected_status: PaymentStatus,
        expected_verified: bool,
        changes: PaymentNotificationChangeset,
    ) -> Result<Option<PaymentEntity>>;
}
