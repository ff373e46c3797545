use anyhow::Context;
use clap::{Parser, Subcommand};
use mf_auto_reg::config::AppConfig;
use mf_auto_reg::helpers::database::{initialize_database, resolve_db_path};
use mf_auto_reg::jobs::{resolve_source, IngestOutcome, RegistrationManager};
use shared_types::{MfStatus, PaymentSource};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about = "Register payment notification emails as transactions", long_about = None)]
struct Args {
    #[arg(long, global = true)]
    log_file_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a transaction from an email body and register it as pending
    Ingest {
        /// Message id used to detect duplicates
        #[arg(long)]
        email_id: String,
        /// File holding the plain-text email body
        #[arg(long)]
        file: PathBuf,
        /// ana-pay or rakuten-pay; detected from --subject when omitted
        #[arg(long)]
        source: Option<PaymentSource>,
        #[arg(long)]
        subject: Option<String>,
    },
    /// Set the mf_status of a transaction
    Status { id: Uuid, status: MfStatus },
    /// Print one transaction as JSON
    Show { id: Uuid },
    /// List transactions in a status, least recently updated first
    List {
        #[arg(long, default_value = "pending")]
        status: String,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

fn init_tracing(log_file_path: Option<&str>) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if let Some(log_path) = log_file_path {
        let log_path = std::path::Path::new(log_path);
        let file_appender = tracing_appender::rolling::never(
            log_path.parent().unwrap_or(std::path::Path::new(".")),
            log_path
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("mf-auto-reg.log")),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file_path.as_deref());

    let (config, config_path) = AppConfig::load().context("Failed to load config")?;
    tracing::debug!("Config loaded from: {:?}", config_path);

    let db_config = config.database();
    let db = initialize_database(&db_config).context("Failed to initialize database")?;
    tracing::info!("Database initialized at: {:?}", resolve_db_path(&db_config)?);

    let manager = RegistrationManager::new(db.transaction_store());

    match args.command {
        Command::Ingest {
            email_id,
            file,
            source,
            subject,
        } => {
            let body = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read email body from {}", file.display()))?;
            let source = resolve_source(source, subject.as_deref(), config.default_source()?)
                .context("Could not determine the payment source; pass --source")?;

            match manager.ingest(&email_id, source, &body).await? {
                IngestOutcome::Registered { id } => println!("registered {id}"),
                IngestOutcome::Duplicate => println!("duplicate {email_id}"),
                IngestOutcome::NotMatched => println!("not matched {email_id}"),
            }
        }
        Command::Status { id, status } => {
            manager.mark_status(id, status).await?;
            println!("{id} {status}");
        }
        Command::Show { id } => {
            let transaction = manager
                .store()
                .get_transaction(id)
                .await?
                .with_context(|| format!("Transaction with ID '{id}' not found"))?;
            println!("{}", serde_json::to_string_pretty(&transaction)?);
        }
        Command::List { status, limit } => {
            let transactions = manager
                .store()
                .list_transactions_by_status(&status, limit)
                .await?;
            for transaction in transactions {
                let summary = transaction
                    .canonical()
                    .map(|txn| format!("{} {} {}", txn.transaction_date(), txn.formatted_amount(), txn.store_name()))
                    .unwrap_or_else(|e| format!("<unreadable parsed_data: {e}>"));
                println!(
                    "{}\t{}\t{}\t{}",
                    transaction.id, transaction.source_email_id, transaction.updated_at, summary
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest() {
        let args = Args::parse_from([
            "mf-auto-reg",
            "ingest",
            "--email-id",
            "msg-001",
            "--file",
            "body.txt",
            "--source",
            "ana-pay",
        ]);
        match args.command {
            Command::Ingest { email_id, source, subject, .. } => {
                assert_eq!(email_id, "msg-001");
                assert_eq!(source, Some(PaymentSource::AnaPay));
                assert!(subject.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_status() {
        let id = Uuid::new_v4();
        let id_arg = id.to_string();
        let args = Args::parse_from(["mf-auto-reg", "status", id_arg.as_str(), "registered"]);
        match args.command {
            Command::Status { id: parsed, status } => {
                assert_eq!(parsed, id);
                assert_eq!(status, MfStatus::Registered);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Args::try_parse_from(["mf-auto-reg", "status", id_arg.as_str(), "done"]).is_err());
    }
}
