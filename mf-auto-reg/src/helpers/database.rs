use crate::config::DatabaseConfig;
use crate::database::Database;
use std::path::PathBuf;
use std::sync::Arc;

/// Returns the default path of the transactions database
///
/// # Platform-specific paths
///
/// - **macOS**: `~/Library/Application Support/mf-auto-reg/transactions.db`
/// - **Linux**: `~/.local/share/mf-auto-reg/transactions.db`
/// - **Windows**: `%LOCALAPPDATA%\mf-auto-reg\transactions.db`
pub fn get_db_path() -> anyhow::Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(data_dir.join("mf-auto-reg").join("transactions.db"))
}

/// `database.path` when configured, the platform default otherwise
pub fn resolve_db_path(config: &DatabaseConfig) -> anyhow::Result<PathBuf> {
    match &config.path {
        Some(path) => Ok(path.clone()),
        None => get_db_path(),
    }
}

/// Open the database, creating the file and schema when missing
pub fn initialize_database(config: &DatabaseConfig) -> anyhow::Result<Arc<Database>> {
    let db_path = resolve_db_path(config)?;
    let db = Database::new(&db_path, config)?;
    tracing::debug!("Database initialized at: {:?}", db_path);
    Ok(Arc::new(db))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: Some(dir.path().join("data").join("tx.db")),
            ..DatabaseConfig::default()
        };

        assert_eq!(resolve_db_path(&config).unwrap(), dir.path().join("data").join("tx.db"));
        initialize_database(&config).unwrap();
        assert!(dir.path().join("data").join("tx.db").exists());
    }

    #[test]
    fn test_existing_database_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: Some(dir.path().join("tx.db")),
            ..DatabaseConfig::default()
        };

        let db = initialize_database(&config).unwrap();
        db.async_connection
            .get()
            .unwrap()
            .execute(
                "INSERT INTO transactions (id, source_email_id, parsed_data) VALUES ('a', 'm1', '{}')",
                [],
            )
            .unwrap();
        drop(db);

        let db = initialize_database(&config).unwrap();
        let count: i64 = db
            .async_connection
            .get()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_default_path_is_under_app_directory() {
        if let Ok(path) = get_db_path() {
            assert!(path.ends_with("mf-auto-reg/transactions.db"));
        }
    }
}
