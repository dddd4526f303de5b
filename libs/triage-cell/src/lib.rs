//! Chat intake for telehealth visits.
//!
//! A patient's messages drive a fixed sequence of stages (symptoms, history,
//! name, email, preferred time, confirmation). Emergency keywords stop the
//! flow at any point. Confirming the summary books the visit through
//! `appointment_cell::BookingService`.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use services::ai::{OpenAiReplyGenerator, ReplyGenerator};
pub use services::conversation::TriageService;
pub use services::session_store::{InMemorySessionStore, SessionStore, SupabaseSessionStore};
pub use services::stage_machine::{advance, TriageSettings, Transition};
