use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Currency of every notification handled so far
pub const DEFAULT_CURRENCY: &str = "JPY";

/// Errors raised when a record or one of its enums cannot be constructed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("Store name must not be empty")]
    EmptyStoreName,

    #[error("Currency must be a 3-letter code, got '{0}'")]
    InvalidCurrency(String),

    #[error("Transaction time {0} is not a valid wall-clock time")]
    LeapSecond(NaiveDateTime),

    #[error("Unknown payment source: {0}")]
    UnknownSource(String),

    #[error("Unknown transaction status: {0}")]
    UnknownStatus(String),
}

/// Payment providers whose notification emails can be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentSource {
    AnaPay,
    RakutenPay,
}

impl PaymentSource {
    pub const ALL: [PaymentSource; 2] = [PaymentSource::AnaPay, PaymentSource::RakutenPay];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentSource::AnaPay => "ANA_PAY",
            PaymentSource::RakutenPay => "RAKUTEN_PAY",
        }
    }

    /// Human readable provider name, as printed in the notification itself
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentSource::AnaPay => "ANA Pay",
            PaymentSource::RakutenPay => "Rakuten Pay",
        }
    }

    /// Guess the provider from an email subject line.
    ///
    /// ANA Pay sends `[ANA Pay] ご利用のお知らせ`; Rakuten Pay subjects carry `楽天ペイ`.
    pub fn detect_from_subject(subject: &str) -> Option<Self> {
        if subject.contains("ANA Pay") {
            Some(PaymentSource::AnaPay)
        } else if subject.contains("楽天ペイ") || subject.contains("Rakuten Pay") {
            Some(PaymentSource::RakutenPay)
        } else {
            None
        }
    }
}

impl fmt::Display for PaymentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentSource {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(&['-', ' '][..], "_");
        match normalized.as_str() {
            "ana_pay" | "anapay" => Ok(PaymentSource::AnaPay),
            "rakuten_pay" | "rakutenpay" => Ok(PaymentSource::RakutenPay),
            _ => Err(RecordError::UnknownSource(s.to_string())),
        }
    }
}

/// Normalized transaction extracted from a payment notification.
///
/// Construction goes through [`CanonicalTransaction::new`] (or deserialization,
/// which runs the same checks), so a value of this type always satisfies:
/// a trimmed non-empty store name, a 3-letter currency, and a timestamp with
/// whole-second precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CanonicalTransactionFields")]
pub struct CanonicalTransaction {
    transaction_date: NaiveDateTime,
    amount: u64,
    currency: String,
    store_name: String,
    source: PaymentSource,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalTransactionFields {
    transaction_date: NaiveDateTime,
    amount: u64,
    currency: String,
    store_name: String,
    source: PaymentSource,
}

impl TryFrom<CanonicalTransactionFields> for CanonicalTransaction {
    type Error = RecordError;

    fn try_from(fields: CanonicalTransactionFields) -> Result<Self, Self::Error> {
        CanonicalTransaction::with_currency(
            fields.transaction_date,
            fields.amount,
            &fields.currency,
            &fields.store_name,
            fields.source,
        )
    }
}

impl CanonicalTransaction {
    pub fn new(
        transaction_date: NaiveDateTime,
        amount: u64,
        store_name: &str,
        source: PaymentSource,
    ) -> Result<Self, RecordError> {
        Self::with_currency(transaction_date, amount, DEFAULT_CURRENCY, store_name, source)
    }

    pub fn with_currency(
        transaction_date: NaiveDateTime,
        amount: u64,
        currency: &str,
        store_name: &str,
        source: PaymentSource,
    ) -> Result<Self, RecordError> {
        let store_name = store_name.trim();
        if store_name.is_empty() {
            return Err(RecordError::EmptyStoreName);
        }

        if transaction_date.nanosecond() >= 1_000_000_000 {
            return Err(RecordError::LeapSecond(transaction_date));
        }

        if currency.chars().count() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(RecordError::InvalidCurrency(currency.to_string()));
        }

        Ok(Self {
            transaction_date: transaction_date
                .with_nanosecond(0)
                .unwrap_or(transaction_date),
            amount,
            currency: currency.to_string(),
            store_name: store_name.to_string(),
            source,
        })
    }

    pub fn transaction_date(&self) -> NaiveDateTime {
        self.transaction_date
    }

    /// Amount in whole currency units
    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn source(&self) -> PaymentSource {
        self.source
    }

    /// Amount with yen sign and thousands separators, e.g. `¥1,234,567`
    pub fn formatted_amount(&self) -> String {
        let digits = self.amount.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
        out.push('¥');
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(ch);
        }
        out
    }
}

/// Processing status of a persisted transaction.
///
/// The store keeps `mf_status` as free text; this enum is the vocabulary the
/// registration pipeline itself writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MfStatus {
    Pending,
    Registered,
    Error,
}

impl MfStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MfStatus::Pending => "pending",
            MfStatus::Registered => "registered",
            MfStatus::Error => "error",
        }
    }
}

impl AsRef<str> for MfStatus {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for MfStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MfStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(MfStatus::Pending),
            "registered" => Ok(MfStatus::Registered),
            "error" => Ok(MfStatus::Error),
            other => Err(RecordError::UnknownStatus(other.to_string())),
        }
    }
}

/// Payload for registering a new transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransactionData {
    /// External correlation key, usually the email message id
    pub source_email_id: String,
    pub parsed_data: serde_json::Value,
}

impl NewTransactionData {
    pub fn new(source_email_id: impl Into<String>, parsed_data: serde_json::Value) -> Self {
        Self {
            source_email_id: source_email_id.into(),
            parsed_data,
        }
    }

    pub fn from_canonical(
        source_email_id: impl Into<String>,
        transaction: &CanonicalTransaction,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(source_email_id, serde_json::to_value(transaction)?))
    }
}

/// Row of the `transactions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTransaction {
    pub id: Uuid,
    pub source_email_id: String,
    /// JSON text as stored
    pub parsed_data: String,
    pub mf_status: String,
    pub updated_at: NaiveDateTime,
}

impl PersistedTransaction {
    /// Status as a known variant, `None` when a caller stored something else
    pub fn status(&self) -> Option<MfStatus> {
        self.mf_status.parse().ok()
    }

    pub fn canonical(&self) -> Result<CanonicalTransaction, serde_json::Error> {
        serde_json::from_str(&self.parsed_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 29)
            .unwrap()
            .and_hms_opt(14, 5, 52)
            .unwrap()
    }

    #[test]
    fn test_new_trims_store_name() {
        let txn =
            CanonicalTransaction::new(sample_date(), 8250, "  yyy \n", PaymentSource::AnaPay)
                .unwrap();
        assert_eq!(txn.store_name(), "yyy");
        assert_eq!(txn.currency(), "JPY");
        assert_eq!(txn.amount(), 8250);
        assert_eq!(txn.source(), PaymentSource::AnaPay);
    }

    #[test]
    fn test_blank_store_name_rejected() {
        let err = CanonicalTransaction::new(sample_date(), 100, " \u{3000}\t", PaymentSource::RakutenPay)
            .unwrap_err();
        assert_eq!(err, RecordError::EmptyStoreName);
    }

    #[test]
    fn test_currency_must_be_three_letters() {
        for bad in ["JP", "JPYY", "jpy", "¥¥¥"] {
            let result = CanonicalTransaction::with_currency(
                sample_date(),
                100,
                bad,
                "store",
                PaymentSource::AnaPay,
            );
            assert!(matches!(result, Err(RecordError::InvalidCurrency(_))), "{bad}");
        }
    }

    #[test]
    fn test_sub_second_precision_dropped() {
        let precise = sample_date().with_nanosecond(750_000_000).unwrap();
        let txn = CanonicalTransaction::new(precise, 1, "a", PaymentSource::AnaPay).unwrap();
        assert_eq!(txn.transaction_date(), sample_date());
    }

    #[test]
    fn test_leap_second_rejected() {
        let leap = NaiveDate::from_ymd_opt(2025, 3, 29)
            .unwrap()
            .and_hms_nano_opt(23, 59, 59, 1_000_000_000)
            .unwrap();
        let result = CanonicalTransaction::new(leap, 1, "a", PaymentSource::AnaPay);
        assert!(matches!(result, Err(RecordError::LeapSecond(_))));
    }

    #[test]
    fn test_formatted_amount() {
        let cases = [(0, "¥0"), (999, "¥999"), (1000, "¥1,000"), (1234567, "¥1,234,567")];
        for (amount, expected) in cases {
            let txn = CanonicalTransaction::new(sample_date(), amount, "a", PaymentSource::AnaPay)
                .unwrap();
            assert_eq!(txn.formatted_amount(), expected);
        }
    }

    #[test]
    fn test_json_shape() {
        let txn =
            CanonicalTransaction::new(sample_date(), 8250, "yyy", PaymentSource::AnaPay).unwrap();
        let value = serde_json::to_value(&txn).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "transactionDate": "2025-03-29T14:05:52",
                "amount": 8250,
                "currency": "JPY",
                "storeName": "yyy",
                "source": "ANA_PAY",
            })
        );
    }

    #[test]
    fn test_deserialize_enforces_invariants() {
        let json = r#"{"transactionDate":"2025-03-29T14:05:52","amount":1,"currency":"JPY","storeName":"   ","source":"RAKUTEN_PAY"}"#;
        assert!(serde_json::from_str::<CanonicalTransaction>(json).is_err());

        let negative = r#"{"transactionDate":"2025-03-29T14:05:52","amount":-5,"currency":"JPY","storeName":"a","source":"ANA_PAY"}"#;
        assert!(serde_json::from_str::<CanonicalTransaction>(negative).is_err());
    }

    #[test]
    fn test_source_parsing_and_detection() {
        assert_eq!("ana-pay".parse::<PaymentSource>().unwrap(), PaymentSource::AnaPay);
        assert_eq!("RAKUTEN_PAY".parse::<PaymentSource>().unwrap(), PaymentSource::RakutenPay);
        assert!("paypay".parse::<PaymentSource>().is_err());

        assert_eq!(
            PaymentSource::detect_from_subject("[ANA Pay] ご利用のお知らせ"),
            Some(PaymentSource::AnaPay)
        );
        assert_eq!(
            PaymentSource::detect_from_subject("【楽天ペイ】お支払い完了のお知らせ"),
            Some(PaymentSource::RakutenPay)
        );
        assert_eq!(PaymentSource::detect_from_subject("Weekly newsletter"), None);
    }

    #[test]
    fn test_status_vocabulary() {
        for status in [MfStatus::Pending, MfStatus::Registered, MfStatus::Error] {
            assert_eq!(status.as_str().parse::<MfStatus>().unwrap(), status);
        }
        assert!(matches!(
            "notified".parse::<MfStatus>(),
            Err(RecordError::UnknownStatus(_))
        ));
    }

    #[test]
    fn test_persisted_status_is_open() {
        let row = PersistedTransaction {
            id: Uuid::new_v4(),
            source_email_id: "msg-1".to_string(),
            parsed_data: "{}".to_string(),
            mf_status: "skipped".to_string(),
            updated_at: sample_date(),
        };
        assert_eq!(row.status(), None);
        assert!(row.canonical().is_err());
    }
}
