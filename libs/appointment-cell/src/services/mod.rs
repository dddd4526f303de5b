pub mod booking;
pub mod recorder;
pub mod scheduling;
pub mod store;
pub mod telemedicine;
