pub mod bookings;
pub mod date_ranges;
pub mod enums;
pub mod payments;
pub mod validation;
pub mod vehicle_blocks;
