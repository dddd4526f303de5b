pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use services::booking::{BookingOptions, BookingService};
pub use services::recorder::AppointmentRecorder;
pub use services::store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
