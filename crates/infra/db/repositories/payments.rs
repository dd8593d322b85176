use anyhow::Result;
use async_trait::async_trait;
use diesel::{
    RunQueryDsl, insert_into,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    update,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::payments},
};
use domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity, PaymentNotificationChangeset},
    repositories::payments::{DuplicateOrderId, PaymentRepository},
    value_objects::enums::payment_statuses::PaymentStatus,
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn create_payment(&self, payment: InsertPaymentEntity) -> Result<PaymentEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let inserted = insert_into(payments::table)
            .values(&payment)
            .returning(PaymentEntity::as_select())
            .get_result::<PaymentEntity>(&mut conn);

        match inserted {
            Ok(entity) => Ok(entity),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                match payment.order_id {
                    Some(order_id) => Err(DuplicateOrderId(order_id).into()),
                    None => Err(anyhow::anyhow!("unique violation inserting payment")),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_order_id(&self, order_id: String) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::order_id.eq(order_id))
            .filter(payments::is_deleted.eq(false))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn update_from_notification(
        &self,
        payment_id: Uuid,
        expected_status: PaymentStatus,
        expected_verified: bool,
        changes: PaymentNotificationChangeset,
    ) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(payments::table.find(payment_id))
            .filter(payments::status.eq(expected_status.as_str()))
            .filter(payments::signature_verified.eq(expected_verified))
            .set(&changes)
            .returning(PaymentEntity::as_select())
            .get_result::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
