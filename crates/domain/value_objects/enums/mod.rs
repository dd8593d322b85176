pub mod block_reasons;
pub mod booking_statuses;
pub mod booking_types;
pub mod payment_methods;
pub mod payment_providers;
pub mod payment_statuses;
pub mod payment_types;
