pub mod bookings;
pub mod payhere_webhook;
pub mod payments;
pub mod vehicle_blocks;
