pub mod email;
pub mod templates;

pub use email::{EmailNotifier, EmailTransport, Notifier};
