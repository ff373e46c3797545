use super::{Row, SqlValue, StatementExecutor};
use crate::error::{StatementError, StoreClientError};
use chrono::NaiveDateTime;
use shared_types::{MfStatus, NewTransactionData, PersistedTransaction};
use std::sync::Arc;
use uuid::Uuid;

const CHECK_DUPLICATE_SQL: &str = "SELECT 1 FROM transactions WHERE source_email_id = ? LIMIT 1";

const INSERT_SQL: &str =
    "INSERT INTO transactions (id, source_email_id, parsed_data, mf_status) VALUES (?, ?, ?, ?)";

const UPDATE_STATUS_SQL: &str = "UPDATE transactions SET mf_status = ?, updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now') WHERE id = ?";

const SELECT_BY_ID_SQL: &str = "SELECT id, source_email_id, parsed_data, mf_status, updated_at
     FROM transactions WHERE id = ?";

const SELECT_BY_STATUS_SQL: &str = "SELECT id, source_email_id, parsed_data, mf_status, updated_at
     FROM transactions WHERE mf_status = ? ORDER BY updated_at, id LIMIT ?";

/// Store `updated_at` layout, e.g. `2025-03-29 14:05:52.123`
const UPDATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Client for the `transactions` table.
///
/// Every method is a single statement on the executor. Nothing is retried
/// and no state is kept between calls, so clones can be shared freely.
#[derive(Clone)]
pub struct TransactionStore {
    executor: Arc<dyn StatementExecutor>,
}

impl TransactionStore {
    pub fn new(executor: Arc<dyn StatementExecutor>) -> Self {
        Self { executor }
    }

    /// Whether a row already exists for `source_email_id`
    pub async fn check_duplicate(&self, source_email_id: &str) -> Result<bool, StoreClientError> {
        let row = self
            .executor
            .query_first(CHECK_DUPLICATE_SQL, &[SqlValue::from(source_email_id)])
            .await
            .map_err(|e| {
                tracing::error!(source_email_id, "Duplicate check failed: {}", e);
                StoreClientError::DuplicateCheckFailed(e)
            })?;

        Ok(row.is_some())
    }

    /// Insert a new `pending` row and return its generated id
    pub async fn register_transaction(
        &self,
        data: &NewTransactionData,
    ) -> Result<Uuid, StoreClientError> {
        let id = Uuid::new_v4();
        let parsed_data =
            serde_json::to_string(&data.parsed_data).map_err(StoreClientError::InvalidPayload)?;

        let params = [
            SqlValue::from(id),
            SqlValue::from(data.source_email_id.as_str()),
            SqlValue::from(parsed_data),
            SqlValue::from(MfStatus::Pending.as_str()),
        ];

        match self.executor.execute(INSERT_SQL, &params).await {
            Ok(_) => {
                tracing::info!(%id, source_email_id = %data.source_email_id, "Registered transaction");
                Ok(id)
            }
            Err(cause @ StatementError::UniqueViolation(_)) => {
                tracing::warn!(
                    source_email_id = %data.source_email_id,
                    "Transaction already registered"
                );
                Err(StoreClientError::AlreadyExists {
                    source_email_id: data.source_email_id.clone(),
                    cause,
                })
            }
            Err(e) => {
                tracing::error!(source_email_id = %data.source_email_id, "Registration failed: {}", e);
                Err(StoreClientError::RegistrationFailed(e))
            }
        }
    }

    /// Set `mf_status` and bump `updated_at` to the store clock.
    ///
    /// The status is stored as given; see [`MfStatus`] for the known values.
    pub async fn update_transaction_status(
        &self,
        id: Uuid,
        status: impl AsRef<str>,
    ) -> Result<(), StoreClientError> {
        let status = status.as_ref();
        let changes = self
            .executor
            .execute(UPDATE_STATUS_SQL, &[SqlValue::from(status), SqlValue::from(id)])
            .await
            .map_err(|e| {
                tracing::error!(%id, "Status update failed: {}", e);
                StoreClientError::UpdateFailed(e)
            })?;

        if changes == 0 {
            return Err(StoreClientError::NotFound(id));
        }

        tracing::info!(%id, status, "Updated transaction status");
        Ok(())
    }

    pub async fn get_transaction(
        &self,
        id: Uuid,
    ) -> Result<Option<PersistedTransaction>, StoreClientError> {
        let row = self
            .executor
            .query_first(SELECT_BY_ID_SQL, &[SqlValue::from(id)])
            .await
            .map_err(StoreClientError::ReadFailed)?;

        row.as_ref()
            .map(row_to_transaction)
            .transpose()
            .map_err(StoreClientError::ReadFailed)
    }

    /// Rows in `status`, least recently updated first
    pub async fn list_transactions_by_status(
        &self,
        status: impl AsRef<str>,
        limit: i64,
    ) -> Result<Vec<PersistedTransaction>, StoreClientError> {
        let rows = self
            .executor
            .query_all(
                SELECT_BY_STATUS_SQL,
                &[SqlValue::from(status.as_ref()), SqlValue::Integer(limit)],
            )
            .await
            .map_err(StoreClientError::ReadFailed)?;

        rows.iter()
            .map(row_to_transaction)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreClientError::ReadFailed)
    }
}

fn row_to_transaction(row: &Row) -> Result<PersistedTransaction, StatementError> {
    let id = row.text("id")?;
    let id = Uuid::parse_str(id)
        .map_err(|e| StatementError::Decode(format!("invalid id '{id}': {e}")))?;

    let updated_at = row.text("updated_at")?;
    let updated_at = NaiveDateTime::parse_from_str(updated_at, UPDATED_AT_FORMAT)
        .map_err(|e| StatementError::Decode(format!("invalid updated_at '{updated_at}': {e}")))?;

    Ok(PersistedTransaction {
        id,
        source_email_id: row.text("source_email_id")?.to_string(),
        parsed_data: row.text("parsed_data")?.to_string(),
        mf_status: row.text("mf_status")?.to_string(),
        updated_at,
    })
}
