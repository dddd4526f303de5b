//! # Notification Cell
//!
//! Email delivery for booked telehealth visits: a confirmation to the patient
//! and an alert to the doctor on call. Delivery goes through SendGrid or
//! Resend, or is only logged when sandbox mode is on.
//!
//! Failures are reported to the caller and never undo a booking; see
//! `appointment-cell` for how partial delivery is surfaced.

pub mod models;
pub mod services;
pub mod test_utils;

pub use models::{AppointmentNotice, DeliveryReport, NotificationError, NotificationMessage};
pub use services::{EmailNotifier, EmailTransport, Notifier};
