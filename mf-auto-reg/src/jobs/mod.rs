pub mod registration_manager;

pub use registration_manager::{resolve_source, IngestOutcome, RegistrationManager};
