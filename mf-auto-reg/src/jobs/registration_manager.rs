use crate::database::TransactionStore;
use crate::error::StoreClientError;
use extractors::{extract_with, TracingSink};
use shared_types::{DiagnosticSink, Extraction, MfStatus, NewTransactionData, PaymentSource};
use std::sync::Arc;
use uuid::Uuid;

/// Result of feeding one notification email through the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Registered { id: Uuid },
    /// A row for this email already exists
    Duplicate,
    NotMatched,
}

/// Glue between extraction and the transaction store.
///
/// Holds no state of its own; racing ingests of the same email are settled by
/// the store's uniqueness constraint.
pub struct RegistrationManager {
    store: TransactionStore,
    sink: Arc<dyn DiagnosticSink + Send + Sync>,
}

impl RegistrationManager {
    pub fn new(store: TransactionStore) -> Self {
        Self::with_sink(store, Arc::new(TracingSink))
    }

    pub fn with_sink(store: TransactionStore, sink: Arc<dyn DiagnosticSink + Send + Sync>) -> Self {
        Self { store, sink }
    }

    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    pub async fn ingest(
        &self,
        source_email_id: &str,
        source: PaymentSource,
        body: &str,
    ) -> Result<IngestOutcome, StoreClientError> {
        if self.store.check_duplicate(source_email_id).await? {
            tracing::debug!("Skipping already registered email: {}", source_email_id);
            return Ok(IngestOutcome::Duplicate);
        }

        let transaction = match extract_with(source, body, self.sink.as_ref()) {
            Extraction::Matched(transaction) => transaction,
            Extraction::NotMatched => {
                tracing::info!(source_email_id, %source, "Email did not match the notification layout");
                return Ok(IngestOutcome::NotMatched);
            }
        };

        let data = NewTransactionData::from_canonical(source_email_id, &transaction)
            .map_err(StoreClientError::InvalidPayload)?;

        match self.store.register_transaction(&data).await {
            Ok(id) => {
                tracing::info!(
                    %id,
                    amount = %transaction.formatted_amount(),
                    store = transaction.store_name(),
                    "Ingested {} notification",
                    source.display_name()
                );
                Ok(IngestOutcome::Registered { id })
            }
            // Lost a race with another ingest of the same email
            Err(e) if e.is_already_exists() => Ok(IngestOutcome::Duplicate),
            Err(e) => Err(e),
        }
    }

    pub async fn mark_status(&self, id: Uuid, status: MfStatus) -> Result<(), StoreClientError> {
        self.store.update_transaction_status(id, status).await
    }
}

/// Pick the provider for an email: explicit choice, then the subject line,
/// then the configured fallback
pub fn resolve_source(
    explicit: Option<PaymentSource>,
    subject: Option<&str>,
    fallback: Option<PaymentSource>,
) -> Option<PaymentSource> {
    explicit
        .or_else(|| subject.and_then(PaymentSource::detect_from_subject))
        .or(fallback)
}
