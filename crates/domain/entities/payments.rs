use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::value_objects::enums::payment_statuses::PaymentStatus;
use crate::infra::db::postgres::schema::payments;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub order_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub provider: String,
    pub status: String,
    pub payment_type: String,
    pub method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub provider_payment_id: Option<String>,
    pub signature_verified: bool,
    pub raw_notify_payload: Option<serde_json::Value>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentEntity {
    pub fn payment_status(&self) -> Result<PaymentStatus> {
        PaymentStatus::from_str(&self.status)
            .ok_or_else(|| anyhow!("payment {} has unknown status {:?}", self.id, self.status))
    }
}

#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub booking_id: Uuid,
    pub order_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub provider: String,
    pub status: String,
    pub payment_type: String,
    pub method: Option<String>,
    pub signature_verified: bool,
}

/// Fields written when a provider notification is applied. `None` fields are left untouched,
/// so an earlier `paid_at` survives later notifications.
#[derive(Debug, Clone, Default, AsChangeset, PartialEq)]
#[diesel(table_name = payments)]
pub struct PaymentNotificationChangeset {
    pub status: Option<String>,
    pub signature_verified: Option<bool>,
    pub provider_payment_id: Option<String>,
    pub method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub raw_notify_payload: Option<serde_json::Value>,
    pub updated_at: Option<DateTime<Utc>>,
}
