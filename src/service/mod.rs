pub mod error;
pub mod events;
pub mod gateway;
pub mod scoring;
pub mod settlement;
pub mod socket;
