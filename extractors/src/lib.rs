//! Extractors Crate
//!
//! Turns the plain-text bodies of payment notification emails into
//! [`CanonicalTransaction`](shared_types::CanonicalTransaction) records.
//!
//! # Architecture
//!
//! - **Types**: the record, the extractor trait and the diagnostic sink live in `shared-types`
//! - **Grammars**: each provider declares its labeled fields as regex patterns
//! - **Builder**: one normalization path shared by every provider
//!
//! # Available Extractors
//!
//! - ANA Pay (`ご利用のお知らせ`)
//! - Rakuten Pay (`ご利用明細`)
//!
//! # Example
//!
//! ```rust,ignore
//! use extractors::extract;
//! use shared_types::PaymentSource;
//!
//! if let Some(txn) = extract(PaymentSource::AnaPay, &body) {
//!     println!("{} at {}", txn.formatted_amount(), txn.store_name());
//! }
//! ```

pub mod diagnostics;
pub mod payment_notifications;

pub use diagnostics::TracingSink;
pub use payment_notifications::{
    extract, extract_with, FieldPattern, NotificationExtractor, PaymentNotificationExtractor,
    SourceGrammar,
};

// Re-export the extractor trait from shared-types for convenience
pub use shared_types::PaymentExtractor;
