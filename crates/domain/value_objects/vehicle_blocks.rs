use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::vehicle_blocks::{InsertVehicleBlockEntity, VehicleBlockEntity};
use crate::domain::value_objects::{
    date_ranges::DateRange, enums::block_reasons::BlockReason, validation::FieldViolation,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsertManualBlockModel {
    pub vehicle_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub reason: BlockReason,
    #[serde(default)]
    pub booking_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl InsertManualBlockModel {
    /// `BOOKING` blocks must name their booking and no other reason may.
    pub fn into_entity(self) -> Result<(DateRange, InsertVehicleBlockEntity), FieldViolation> {
        let range = DateRange::new(self.from, self.to)
            .map_err(|_| FieldViolation::new("to", "must not be before from"))?;

        match (self.reason, self.booking_id) {
            (BlockReason::Booking, None) => {
                return Err(FieldViolation::new(
                    "bookingId",
                    "is required when reason is BOOKING",
                ));
            }
            (reason, Some(_)) if reason != BlockReason::Booking => {
                return Err(FieldViolation::new(
                    "bookingId",
                    "is only allowed when reason is BOOKING",
                ));
            }
            _ => {}
        }

        Ok((
            range,
            InsertVehicleBlockEntity {
                vehicle_id: self.vehicle_id,
                from_date: range.from(),
                to_date: range.to(),
                reason: self.reason.as_str().to_string(),
                booking_id: self.booking_id,
                notes: self.notes,
            },
        ))
    }
}

/// Result of a manual block insert, decided under the per-vehicle lock.
#[derive(Debug, Clone, PartialEq)]
pub enum ManualBlockOutcome {
    Created(VehicleBlockEntity),
    Conflict(Vec<VehicleBlockEntity>),
    MissingBooking(Uuid),
}

/// What the ledger must hold for one booking, read from the booking row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingBlockTarget {
    /// Exactly one `BOOKING` block on this vehicle over these dates.
    Hold { vehicle_id: Uuid, range: DateRange },
    /// No block at all.
    Release,
    /// Whatever is there stays.
    Leave,
}

/// Result of syncing a booking's block against the locked booking row.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingBlockOutcome {
    Created(VehicleBlockEntity),
    Unchanged(VehicleBlockEntity),
    Resynced(VehicleBlockEntity),
    /// The booking no longer holds a block by the time the lock was taken.
    Released(usize),
    /// The booking is gone or its status leaves the ledger alone.
    Untouched,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleBlockModel {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub reason: BlockReason,
    pub booking_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<VehicleBlockEntity> for VehicleBlockModel {
    type Error = anyhow::Error;

    fn try_from(value: VehicleBlockEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            reason: value.block_reason()?,
            id: value.id,
            vehicle_id: value.vehicle_id,
            from: value.from_date,
            to: value.to_date,
            booking_id: value.booking_id,
            notes: value.notes,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityModel {
    pub available: Vec<Uuid>,
    pub unavailable: Vec<Uuid>,
}

/// Splits the requested vehicles by whether any block overlaps `range`.
/// Request order is kept and repeated ids are reported once.
pub fn partition_availability(
    vehicle_ids: &[Uuid],
    range: &DateRange,
    blocks: &[VehicleBlockEntity],
) -> AvailabilityModel {
    let mut result = AvailabilityModel::default();

    for vehicle_id in vehicle_ids {
        if result.available.contains(vehicle_id) || result.unavailable.contains(vehicle_id) {
            continue;
        }
        let blocked = blocks
            .iter()
            .any(|block| block.vehicle_id == *vehicle_id && block.overlaps(range));
        if blocked {
            result.unavailable.push(*vehicle_id);
        } else {
            result.available.push(*vehicle_id);
        }
    }

    result
}

/// Query string of the public availability check, e.g.
/// `?from=2025-06-10&to=2025-06-15&vehicleIds=<uuid>,<uuid>`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub vehicle_ids: Option<String>,
}

impl AvailabilityQuery {
    pub fn parse(&self) -> Result<(Vec<Uuid>, DateRange), FieldViolation> {
        let range = required_range(self.from, self.to)?;

        let vehicle_ids = self
            .vehicle_ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                Uuid::parse_str(id)
                    .map_err(|_| FieldViolation::new("vehicleIds", format!("{id:?} is not a valid id")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if vehicle_ids.is_empty() {
            return Err(FieldViolation::new("vehicleIds", "is required"));
        }

        Ok((vehicle_ids, range))
    }
}

/// Optional window for a vehicle's block calendar. Both ends or neither.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
pub struct CalendarQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl CalendarQuery {
    pub fn range(&self) -> Result<Option<DateRange>, FieldViolation> {
        match (self.from, self.to) {
            (None, None) => Ok(None),
            (from, to) => required_range(from, to).map(Some),
        }
    }
}

fn required_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<DateRange, FieldViolation> {
    let from = from.ok_or_else(|| FieldViolation::new("from", "is required"))?;
    let to = to.ok_or_else(|| FieldViolation::new("to", "is required"))?;
    DateRange::new(from, to).map_err(|_| FieldViolation::new("to", "must not be before from"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn block(vehicle_id: Uuid, from: &str, to: &str) -> VehicleBlockEntity {
        VehicleBlockEntity {
            id: Uuid::new_v4(),
            vehicle_id,
            from_date: day(from),
            to_date: day(to),
            reason: "MAINTENANCE".to_string(),
            booking_id: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn manual(reason: BlockReason, booking_id: Option<Uuid>) -> InsertManualBlockModel {
        InsertManualBlockModel {
            vehicle_id: Uuid::new_v4(),
            from: day("2025-06-10"),
            to: day("2025-06-15"),
            reason,
            booking_id,
            notes: None,
        }
    }

    #[test]
    fn booking_reason_requires_booking_id() {
        let err = manual(BlockReason::Booking, None).into_entity().unwrap_err();
        assert_eq!(err.field, "bookingId");

        let (_, entity) = manual(BlockReason::Booking, Some(Uuid::new_v4()))
            .into_entity()
            .unwrap();
        assert_eq!(entity.reason, "BOOKING");
    }

    #[test]
    fn other_reasons_forbid_booking_id() {
        let err = manual(BlockReason::Maintenance, Some(Uuid::new_v4()))
            .into_entity()
            .unwrap_err();
        assert_eq!(err.field, "bookingId");

        assert!(manual(BlockReason::Personal, None).into_entity().is_ok());
    }

    #[test]
    fn inverted_manual_range_is_rejected() {
        let mut model = manual(BlockReason::Other, None);
        model.to = day("2025-06-01");
        assert_eq!(model.into_entity().unwrap_err().field, "to");
    }

    #[test]
    fn availability_splits_by_overlap() {
        let busy = Uuid::new_v4();
        let free = Uuid::new_v4();
        let adjacent = Uuid::new_v4();
        let blocks = vec![
            block(busy, "2025-06-10", "2025-06-15"),
            block(adjacent, "2025-06-01", "2025-06-13"),
        ];
        let range = DateRange::new(day("2025-06-14"), day("2025-06-20")).unwrap();

        let result = partition_availability(&[busy, free, adjacent, busy], &range, &blocks);

        assert_eq!(result.available, vec![free, adjacent]);
        assert_eq!(result.unavailable, vec![busy]);
    }

    #[test]
    fn parses_availability_query() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let query = AvailabilityQuery {
            from: Some(day("2025-06-10")),
            to: Some(day("2025-06-15")),
            vehicle_ids: Some(format!("{first}, {second},")),
        };

        let (ids, range) = query.parse().unwrap();

        assert_eq!(ids, vec![first, second]);
        assert_eq!(range.from(), day("2025-06-10"));
        assert_eq!(range.to(), day("2025-06-15"));
    }

    #[test]
    fn availability_query_rejects_missing_or_bad_input() {
        let base = AvailabilityQuery {
            from: Some(day("2025-06-10")),
            to: Some(day("2025-06-15")),
            vehicle_ids: Some(Uuid::new_v4().to_string()),
        };

        let mut no_ids = base.clone();
        no_ids.vehicle_ids = Some(" , ".to_string());
        assert_eq!(no_ids.parse().unwrap_err().field, "vehicleIds");

        let mut bad_id = base.clone();
        bad_id.vehicle_ids = Some("van-1".to_string());
        assert_eq!(bad_id.parse().unwrap_err().field, "vehicleIds");

        let mut no_from = base.clone();
        no_from.from = None;
        assert_eq!(no_from.parse().unwrap_err().field, "from");

        let mut inverted = base;
        inverted.to = Some(day("2025-06-01"));
        assert_eq!(inverted.parse().unwrap_err().field, "to");
    }

    #[test]
    fn calendar_window_is_both_ends_or_neither() {
        assert_eq!(CalendarQuery::default().range().unwrap(), None);

        let window = CalendarQuery {
            from: Some(day("2025-06-01")),
            to: Some(day("2025-06-30")),
        };
        assert!(window.range().unwrap().is_some());

        let half = CalendarQuery {
            from: Some(day("2025-06-01")),
            to: None,
        };
        assert_eq!(half.range().unwrap_err().field, "to");
    }
}
