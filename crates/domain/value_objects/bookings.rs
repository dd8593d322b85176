use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::domain::entities::bookings::{BookingEntity, InsertBookingEntity};
use crate::domain::value_objects::enums::{
    booking_statuses::BookingStatus, booking_types::BookingType,
};
use crate::domain::value_objects::validation::{FieldViolation, required_text};

pub fn remaining_balance(total_cost: Decimal, paid_amount: Decimal) -> Decimal {
    total_cost - paid_amount
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsertBookingModel {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub booking_type: BookingType,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub pax: i32,
    #[serde(default)]
    pub assigned_vehicle_id: Option<Uuid>,
    #[serde(default)]
    pub total_cost: Decimal,
    #[serde(default)]
    pub paid_amount: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

impl InsertBookingModel {
    /// New bookings always start as `NEW`; the booking number is assigned by the database.
    pub fn into_entity(self) -> Result<InsertBookingEntity, FieldViolation> {
        let customer_name = required_text("customerName", self.customer_name.as_deref())?;
        let customer_email = required_text("customerEmail", self.customer_email.as_deref())?;
        validate_dates(self.from, self.to)?;
        validate_pax(self.pax)?;
        validate_money("totalCost", self.total_cost)?;
        validate_money("paidAmount", self.paid_amount)?;

        Ok(InsertBookingEntity {
            customer_name,
            customer_email,
            customer_phone: self.customer_phone,
            booking_type: self.booking_type.as_str().to_string(),
            from_date: self.from,
            to_date: self.to,
            pax: self.pax,
            status: BookingStatus::New.as_str().to_string(),
            assigned_vehicle_id: self.assigned_vehicle_id,
            total_cost: self.total_cost,
            paid_amount: self.paid_amount,
            remaining_balance: remaining_balance(self.total_cost, self.paid_amount),
            notes: self.notes,
        })
    }
}

/// Partial staff update. Nullable columns use `Option<Option<_>>` so an explicit `null`
/// clears the value while an absent key leaves it alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub customer_phone: Option<Option<String>>,
    #[serde(default)]
    pub booking_type: Option<BookingType>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub pax: Option<i32>,
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_vehicle_id: Option<Option<Uuid>>,
    #[serde(default)]
    pub total_cost: Option<Decimal>,
    #[serde(default)]
    pub paid_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl BookingPatch {
    /// Applies the patch in place and recomputes `remaining_balance`.
    /// On error the booking is left untouched.
    pub fn apply_to(&self, booking: &mut BookingEntity, now: DateTime<Utc>) -> Result<(), FieldViolation> {
        let mut next = booking.clone();

        if let Some(name) = &self.customer_name {
            next.customer_name = required_text("customerName", Some(name.as_str()))?;
        }
        if let Some(email) = &self.customer_email {
            next.customer_email = required_text("customerEmail", Some(email.as_str()))?;
        }
        if let Some(phone) = &self.customer_phone {
            next.customer_phone = phone.clone();
        }
        if let Some(booking_type) = self.booking_type {
            next.booking_type = booking_type.as_str().to_string();
        }
        if let Some(from) = self.from {
            next.from_date = from;
        }
        if let Some(to) = self.to {
            next.to_date = to;
        }
        if let Some(pax) = self.pax {
            validate_pax(pax)?;
            next.pax = pax;
        }
        if let Some(status) = self.status {
            next.status = status.as_str().to_string();
        }
        if let Some(vehicle_id) = self.assigned_vehicle_id {
            next.assigned_vehicle_id = vehicle_id;
        }
        if let Some(total_cost) = self.total_cost {
            validate_money("totalCost", total_cost)?;
            next.total_cost = total_cost;
        }
        if let Some(paid_amount) = self.paid_amount {
            validate_money("paidAmount", paid_amount)?;
            next.paid_amount = paid_amount;
        }
        if let Some(notes) = &self.notes {
            next.notes = notes.clone();
        }

        validate_dates(next.from_date, next.to_date)?;
        next.remaining_balance = remaining_balance(next.total_cost, next.paid_amount);
        next.updated_at = now;

        *booking = next;
        Ok(())
    }
}

fn validate_dates(from: NaiveDate, to: NaiveDate) -> Result<(), FieldViolation> {
    if from > to {
        return Err(FieldViolation::new("to", "must not be before from"));
    }
    Ok(())
}

fn validate_pax(pax: i32) -> Result<(), FieldViolation> {
    if pax < 1 {
        return Err(FieldViolation::new("pax", "must be at least 1"));
    }
    Ok(())
}

fn validate_money(field: &'static str, amount: Decimal) -> Result<(), FieldViolation> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(FieldViolation::new(field, "must not be negative"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingModel {
    pub id: Uuid,
    pub booking_no: i64,
    pub reference: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub booking_type: BookingType,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub pax: i32,
    pub status: BookingStatus,
    pub assigned_vehicle_id: Option<Uuid>,
    pub total_cost: Decimal,
    pub paid_amount: Decimal,
    pub remaining_balance: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingEntity> for BookingModel {
    type Error = anyhow::Error;

    fn try_from(value: BookingEntity) -> Result<Self, Self::Error> {
        let status = value.booking_status()?;
        let booking_type = BookingType::from_str(&value.booking_type).ok_or_else(|| {
            anyhow::anyhow!(
                "booking {} has unknown type {:?}",
                value.id,
                value.booking_type
            )
        })?;

        Ok(Self {
            id: value.id,
            booking_no: value.booking_no,
            reference: value.reference(),
            customer_name: value.customer_name,
            customer_email: value.customer_email,
            customer_phone: value.customer_phone,
            booking_type,
            from: value.from_date,
            to: value.to_date,
            pax: value.pax,
            status,
            assigned_vehicle_id: value.assigned_vehicle_id,
            total_cost: value.total_cost,
            paid_amount: value.paid_amount,
            remaining_balance: value.remaining_balance,
            notes: value.notes,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}
