pub mod config;
pub mod database;
pub mod error;
pub mod helpers;
pub mod jobs;

pub use database::{Database, TransactionStore};
pub use error::{StatementError, StoreClientError};
pub use jobs::{IngestOutcome, RegistrationManager};
