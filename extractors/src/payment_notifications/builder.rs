use super::RawCaptures;
use chrono::{NaiveDateTime, Timelike};
use shared_types::{
    CanonicalTransaction, DiagnosticSink, ExtractionEvent, NotificationField, PaymentSource,
};
use std::num::ParseIntError;

/// Turn the three raw captures into a validated record.
///
/// Returns `None` when any value fails to normalize; the failing field is
/// reported to `sink`.
pub(crate) fn build_transaction(
    source: PaymentSource,
    date_format: &str,
    captures: &RawCaptures,
    sink: &dyn DiagnosticSink,
) -> Option<CanonicalTransaction> {
    let transaction_date = match parse_transaction_date(&captures.transaction_date, date_format) {
        Ok(date) => Some(date),
        Err(e) => {
            sink.record(ExtractionEvent::FieldInvalid {
                source,
                field: NotificationField::TransactionDate,
                raw: captures.transaction_date.clone(),
                reason: e.to_string(),
            });
            None
        }
    };

    let amount = match parse_amount(&captures.amount) {
        Ok(amount) => Some(amount),
        Err(e) => {
            sink.record(ExtractionEvent::FieldInvalid {
                source,
                field: NotificationField::Amount,
                raw: captures.amount.clone(),
                reason: e.to_string(),
            });
            None
        }
    };

    let store_name = normalize_store_name(&captures.store_name);
    if store_name.is_none() {
        sink.record(ExtractionEvent::FieldInvalid {
            source,
            field: NotificationField::StoreName,
            raw: captures.store_name.clone(),
            reason: "empty after trimming".to_string(),
        });
    }

    let (transaction_date, amount, store_name) = (transaction_date?, amount?, store_name?);

    match CanonicalTransaction::new(transaction_date, amount, store_name, source) {
        Ok(txn) => Some(txn),
        Err(e) => {
            sink.record(ExtractionEvent::RecordRejected {
                source,
                reason: e.to_string(),
            });
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error(transparent)]
    Parse(#[from] chrono::ParseError),

    /// chrono reads `:60` as a leap second; notifications never carry one
    #[error("seconds out of range in '{0}'")]
    LeapSecond(String),
}

/// Parse a captured date/time with the source's format.
///
/// Runs of whitespace are collapsed to a single space first, so a tab or a
/// doubled space between date and time still parses.
pub fn parse_transaction_date(raw: &str, format: &str) -> Result<NaiveDateTime, DateError> {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let date = NaiveDateTime::parse_from_str(&normalized, format)?;
    if date.nanosecond() >= 1_000_000_000 {
        return Err(DateError::LeapSecond(normalized));
    }
    Ok(date)
}

/// Parse an amount such as `8,250` into whole currency units
pub fn parse_amount(raw: &str) -> Result<u64, ParseIntError> {
    raw.replace(&[',', '，'][..], "").trim().parse()
}

fn normalize_store_name(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
