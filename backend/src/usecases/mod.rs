pub mod audit;
pub mod booking_side_effects;
pub mod bookings;
pub mod checkout;
pub mod errors;
pub mod payhere_webhook;
pub mod payment_status;
pub mod vehicle_blocks;
