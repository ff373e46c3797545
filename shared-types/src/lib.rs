pub mod extraction;
pub mod financial;

pub use extraction::{
    DiagnosticSink, Extraction, ExtractionEvent, NoopSink, NotificationField, PaymentExtractor,
};
pub use financial::{
    CanonicalTransaction, MfStatus, NewTransactionData, PaymentSource, PersistedTransaction,
    RecordError, DEFAULT_CURRENCY,
};
