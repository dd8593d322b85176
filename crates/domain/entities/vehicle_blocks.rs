use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::{date_ranges::DateRange, enums::block_reasons::BlockReason};
use crate::infra::db::postgres::schema::vehicle_blocks;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = vehicle_blocks)]
pub struct VehicleBlockEntity {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: String,
    pub booking_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl VehicleBlockEntity {
    pub fn block_reason(&self) -> Result<BlockReason> {
        BlockReason::from_str(&self.reason)
            .ok_or_else(|| anyhow!("vehicle block {} has unknown reason {:?}", self.id, self.reason))
    }

    pub fn date_range(&self) -> Result<DateRange> {
        Ok(DateRange::new(self.from_date, self.to_date)?)
    }

    pub fn overlaps(&self, range: &DateRange) -> bool {
        self.from_date <= range.to() && self.to_date >= range.from()
    }
}

#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = vehicle_blocks)]
pub struct InsertVehicleBlockEntity {
    pub vehicle_id: Uuid,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: String,
    pub booking_id: Option<Uuid>,
    pub notes: Option<String>,
}
