use crate::financial::{CanonicalTransaction, PaymentSource};
use std::fmt;

/// Core trait that every payment notification extractor implements
pub trait PaymentExtractor: Send + Sync {
    /// Provider whose notification layout this extractor understands
    fn source(&self) -> PaymentSource;

    /// Extract a transaction from the raw email body.
    ///
    /// Failing to find a transaction is a normal outcome and is reported as
    /// [`Extraction::NotMatched`]; the reason goes to `sink`.
    fn extract(&self, raw_text: &str, sink: &dyn DiagnosticSink) -> Extraction;

    /// Get extractor version for tracking
    fn version(&self) -> String {
        "1.0.0".to_string()
    }
}

/// Outcome of one extraction attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Matched(CanonicalTransaction),
    NotMatched,
}

impl Extraction {
    pub fn is_matched(&self) -> bool {
        matches!(self, Extraction::Matched(_))
    }

    pub fn into_option(self) -> Option<CanonicalTransaction> {
        match self {
            Extraction::Matched(txn) => Some(txn),
            Extraction::NotMatched => None,
        }
    }
}

impl From<Extraction> for Option<CanonicalTransaction> {
    fn from(extraction: Extraction) -> Self {
        extraction.into_option()
    }
}

/// Labeled fields every notification has to provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationField {
    TransactionDate,
    Amount,
    StoreName,
}

impl NotificationField {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationField::TransactionDate => "transaction_date",
            NotificationField::Amount => "amount",
            NotificationField::StoreName => "store_name",
        }
    }
}

impl fmt::Display for NotificationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic emitted while extracting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionEvent {
    Attempted {
        source: PaymentSource,
    },
    /// The labeled field was not present in the text
    FieldMissing {
        source: PaymentSource,
        field: NotificationField,
    },
    /// The field was captured but its value could not be normalized
    FieldInvalid {
        source: PaymentSource,
        field: NotificationField,
        raw: String,
        reason: String,
    },
    /// All fields normalized but the record itself failed validation
    RecordRejected {
        source: PaymentSource,
        reason: String,
    },
    Matched {
        source: PaymentSource,
    },
}

/// Receiver for extraction diagnostics, passed in by the caller
pub trait DiagnosticSink {
    fn record(&self, event: ExtractionEvent);
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn record(&self, _event: ExtractionEvent) {}
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &S {
    fn record(&self, event: ExtractionEvent) {
        (**self).record(event)
    }
}
