pub mod audit_logs;
pub mod bookings;
pub mod payments;
pub mod vehicle_blocks;
