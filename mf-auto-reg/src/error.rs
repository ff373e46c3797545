//! Error types for the transaction store.

use uuid::Uuid;

/// Failure reported by the statement collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatementError {
    /// A UNIQUE constraint rejected the write
    #[error("UNIQUE constraint failed: {0}")]
    UniqueViolation(String),

    #[error("{0}")]
    Connection(String),

    #[error("{0}")]
    Query(String),

    /// A returned row did not have the expected shape
    #[error("Unexpected row data: {0}")]
    Decode(String),
}

/// Errors surfaced by [`TransactionStore`](crate::database::transactions::TransactionStore)
#[derive(Debug, thiserror::Error)]
pub enum StoreClientError {
    #[error("Failed to check duplicate transaction: {0}")]
    DuplicateCheckFailed(#[source] StatementError),

    #[error("Transaction with source_email_id '{source_email_id}' already exists.")]
    AlreadyExists {
        source_email_id: String,
        #[source]
        cause: StatementError,
    },

    #[error("Failed to register transaction: {0}")]
    RegistrationFailed(#[source] StatementError),

    #[error("Failed to serialize parsed_data: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    #[error("Transaction with ID '{0}' not found for status update.")]
    NotFound(Uuid),

    #[error("Failed to update transaction status: {0}")]
    UpdateFailed(#[source] StatementError),

    #[error("Failed to read transactions: {0}")]
    ReadFailed(#[source] StatementError),
}

impl StoreClientError {
    /// `true` when the caller should skip the email instead of retrying
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreClientError::AlreadyExists { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_keep_underlying_cause() {
        let err = StoreClientError::DuplicateCheckFailed(StatementError::Connection(
            "Database connection error".to_string(),
        ));
        assert_eq!(
            err.to_string(),
            "Failed to check duplicate transaction: Database connection error"
        );

        let err = StoreClientError::UpdateFailed(StatementError::Query("Network timeout".to_string()));
        assert_eq!(
            err.to_string(),
            "Failed to update transaction status: Network timeout"
        );
    }

    #[test]
    fn test_already_exists_message() {
        let err = StoreClientError::AlreadyExists {
            source_email_id: "new-email-id".to_string(),
            cause: StatementError::UniqueViolation("transactions.source_email_id".to_string()),
        };
        assert!(err.is_already_exists());
        assert_eq!(
            err.to_string(),
            "Transaction with source_email_id 'new-email-id' already exists."
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
