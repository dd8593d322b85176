use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::value_objects::{
    date_ranges::DateRange,
    enums::booking_statuses::BookingStatus,
    vehicle_blocks::BookingBlockTarget,
};
use crate::infra::db::postgres::schema::bookings;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = bookings)]
pub struct BookingEntity {
    pub id: Uuid,
    pub booking_no: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub booking_type: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub pax: i32,
    pub status: String,
    pub assigned_vehicle_id: Option<Uuid>,
    pub total_cost: Decimal,
    pub paid_amount: Decimal,
    pub remaining_balance: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingEntity {
    pub fn booking_status(&self) -> Result<BookingStatus> {
        BookingStatus::from_str(&self.status)
            .ok_or_else(|| anyhow!("booking {} has unknown status {:?}", self.id, self.status))
    }

    pub fn date_range(&self) -> Result<DateRange> {
        Ok(DateRange::new(self.from_date, self.to_date)?)
    }

    /// `CONFIRMED` with a vehicle holds one block. `CANCELLED`, or `CONFIRMED` without a
    /// vehicle, holds none. Other statuses leave the ledger as it is.
    pub fn block_target(&self) -> Result<BookingBlockTarget> {
        let target = match (self.booking_status()?, self.assigned_vehicle_id) {
            (BookingStatus::Confirmed, Some(vehicle_id)) => BookingBlockTarget::Hold {
                vehicle_id,
                range: self.date_range()?,
            },
            (BookingStatus::Confirmed, None) | (BookingStatus::Cancelled, _) => {
                BookingBlockTarget::Release
            }
            _ => BookingBlockTarget::Leave,
        };
        Ok(target)
    }

    /// Human-facing booking reference, e.g. `BK-000042`.
    pub fn reference(&self) -> String {
        format!("BK-{:06}", self.booking_no)
    }
}

#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = bookings)]
pub struct InsertBookingEntity {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub booking_type: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub pax: i32,
    pub status: String,
    pub assigned_vehicle_id: Option<Uuid>,
    pub total_cost: Decimal,
    pub paid_amount: Decimal,
    pub remaining_balance: Decimal,
    pub notes: Option<String>,
}

/// Full write-back of the mutable booking columns. `booking_no` is never written.
#[derive(Debug, Clone, AsChangeset, PartialEq)]
#[diesel(table_name = bookings, treat_none_as_null = true)]
pub struct UpdateBookingEntity {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub booking_type: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub pax: i32,
    pub status: String,
    pub assigned_vehicle_id: Option<Uuid>,
    pub total_cost: Decimal,
    pub paid_amount: Decimal,
    pub remaining_balance: Decimal,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&BookingEntity> for UpdateBookingEntity {
    fn from(value: &BookingEntity) -> Self {
        Self {
            customer_name: value.customer_name.clone(),
            customer_email: value.customer_email.clone(),
            customer_phone: value.customer_phone.clone(),
            booking_type: value.booking_type.clone(),
            from_date: value.from_date,
            to_date: value.to_date,
            pax: value.pax,
            status: value.status.clone(),
            assigned_vehicle_id: value.assigned_vehicle_id,
            total_cost: value.total_cost,
            paid_amount: value.paid_amount,
            remaining_balance: value.remaining_balance,
            notes: value.notes.clone(),
            updated_at: value.updated_at,
        }
    }
}
