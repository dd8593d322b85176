pub mod payhere;
pub mod status_poller;
