mod ana_pay;
mod builder;
mod rakuten_pay;

pub use builder::{parse_amount, parse_transaction_date, DateError};

use crate::diagnostics::TracingSink;
use regex::Regex;
use shared_types::{
    CanonicalTransaction, DiagnosticSink, Extraction, ExtractionEvent, NotificationField,
    PaymentExtractor, PaymentSource,
};
use std::sync::OnceLock;

/// One labeled field of a notification and how to capture it.
///
/// When several capture groups are listed their values are joined with a
/// single space, in order.
pub struct FieldPattern {
    field: NotificationField,
    regex: Regex,
    groups: Vec<usize>,
}

impl FieldPattern {
    pub fn new(field: NotificationField, regex: Regex, groups: &[usize]) -> Self {
        Self {
            field,
            regex,
            groups: groups.to_vec(),
        }
    }

    pub fn field(&self) -> NotificationField {
        self.field
    }

    /// Raw value of the field, `None` if the pattern or any group is absent
    pub fn capture(&self, text: &str) -> Option<String> {
        let caps = self.regex.captures(text)?;
        let parts = self
            .groups
            .iter()
            .map(|&g| caps.get(g).map(|m| m.as_str()))
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join(" "))
    }
}

/// Raw, not yet normalized, field values
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawCaptures {
    pub transaction_date: String,
    pub amount: String,
    pub store_name: String,
}

/// Text layout of one provider's notification
pub struct SourceGrammar {
    source: PaymentSource,
    date_format: &'static str,
    fields: Vec<FieldPattern>,
}

impl SourceGrammar {
    pub fn new(source: PaymentSource, date_format: &'static str, fields: Vec<FieldPattern>) -> Self {
        Self {
            source,
            date_format,
            fields,
        }
    }

    pub fn source(&self) -> PaymentSource {
        self.source
    }

    fn capture_field(&self, field: NotificationField, text: &str) -> Option<String> {
        self.fields
            .iter()
            .find(|p| p.field() == field)
            .and_then(|p| p.capture(text))
    }

    /// Capture every required field. Each missing one is reported, not just the first.
    fn captures(&self, text: &str, sink: &dyn DiagnosticSink) -> Option<RawCaptures> {
        let capture = |field: NotificationField| {
            let value = self.capture_field(field, text);
            if value.is_none() {
                sink.record(ExtractionEvent::FieldMissing {
                    source: self.source,
                    field,
                });
            }
            value
        };

        let transaction_date = capture(NotificationField::TransactionDate);
        let amount = capture(NotificationField::Amount);
        let store_name = capture(NotificationField::StoreName);

        Some(RawCaptures {
            transaction_date: transaction_date?,
            amount: amount?,
            store_name: store_name?,
        })
    }
}

/// Extractor driven by a [`SourceGrammar`]
pub struct NotificationExtractor {
    grammar: SourceGrammar,
}

impl NotificationExtractor {
    pub fn new(grammar: SourceGrammar) -> Self {
        Self { grammar }
    }

    pub fn ana_pay() -> Self {
        Self::new(ana_pay::grammar())
    }

    pub fn rakuten_pay() -> Self {
        Self::new(rakuten_pay::grammar())
    }

    pub fn for_source(source: PaymentSource) -> Self {
        match source {
            PaymentSource::AnaPay => Self::ana_pay(),
            PaymentSource::RakutenPay => Self::rakuten_pay(),
        }
    }
}

impl PaymentExtractor for NotificationExtractor {
    fn source(&self) -> PaymentSource {
        self.grammar.source()
    }

    fn extract(&self, raw_text: &str, sink: &dyn DiagnosticSink) -> Extraction {
        let source = self.grammar.source();
        sink.record(ExtractionEvent::Attempted { source });

        let Some(captures) = self.grammar.captures(raw_text, sink) else {
            return Extraction::NotMatched;
        };

        match builder::build_transaction(source, self.grammar.date_format, &captures, sink) {
            Some(txn) => {
                sink.record(ExtractionEvent::Matched { source });
                Extraction::Matched(txn)
            }
            None => Extraction::NotMatched,
        }
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}

/// Holds one compiled extractor per supported provider
pub struct PaymentNotificationExtractor {
    ana_pay: NotificationExtractor,
    rakuten_pay: NotificationExtractor,
}

impl PaymentNotificationExtractor {
    pub fn new() -> Self {
        Self {
            ana_pay: NotificationExtractor::ana_pay(),
            rakuten_pay: NotificationExtractor::rakuten_pay(),
        }
    }

    pub fn extractor(&self, source: PaymentSource) -> &NotificationExtractor {
        match source {
            PaymentSource::AnaPay => &self.ana_pay,
            PaymentSource::RakutenPay => &self.rakuten_pay,
        }
    }

    pub fn extract(
        &self,
        source: PaymentSource,
        raw_text: &str,
        sink: &dyn DiagnosticSink,
    ) -> Extraction {
        self.extractor(source).extract(raw_text, sink)
    }
}

impl Default for PaymentNotificationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn shared_extractor() -> &'static PaymentNotificationExtractor {
    static EXTRACTOR: OnceLock<PaymentNotificationExtractor> = OnceLock::new();
    EXTRACTOR.get_or_init(PaymentNotificationExtractor::new)
}

/// Extract a transaction from `raw_text`, logging diagnostics through `tracing`
pub fn extract(source: PaymentSource, raw_text: &str) -> Option<CanonicalTransaction> {
    extract_with(source, raw_text, &TracingSink).into_option()
}

/// Same as [`extract`] with diagnostics sent to `sink`
pub fn extract_with(
    source: PaymentSource,
    raw_text: &str,
    sink: &dyn DiagnosticSink,
) -> Extraction {
    shared_extractor().extract(source, raw_text, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<ExtractionEvent>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<ExtractionEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl DiagnosticSink for RecordingSink {
        fn record(&self, event: ExtractionEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    const ANA_PAY_BODY: &str = "ご利用日時：2025-03-29 14:05:52\nご利用金額：8,250円\nご利用店舗：yyy\n";

    #[test]
    fn test_field_pattern_joins_groups() {
        let pattern = FieldPattern::new(
            NotificationField::TransactionDate,
            Regex::new(r"(\d+)-(\d+)").unwrap(),
            &[1, 2],
        );
        assert_eq!(pattern.capture("x 12-34 y").as_deref(), Some("12 34"));
        assert_eq!(pattern.capture("nothing here"), None);
    }

    #[test]
    fn test_dispatch_by_source() {
        let extractor = PaymentNotificationExtractor::new();
        assert_eq!(
            extractor.extractor(PaymentSource::AnaPay).source(),
            PaymentSource::AnaPay
        );
        assert_eq!(
            extractor.extractor(PaymentSource::RakutenPay).source(),
            PaymentSource::RakutenPay
        );

        // An ANA Pay body does not fit the Rakuten Pay layout
        assert!(extractor
            .extract(PaymentSource::AnaPay, ANA_PAY_BODY, &shared_types::NoopSink)
            .is_matched());
        assert!(!extractor
            .extract(PaymentSource::RakutenPay, ANA_PAY_BODY, &shared_types::NoopSink)
            .is_matched());
    }

    #[test]
    fn test_every_missing_field_is_reported() {
        let sink = RecordingSink::default();
        let result = extract_with(PaymentSource::AnaPay, "unrelated text", &sink);
        assert_eq!(result, Extraction::NotMatched);

        let missing: Vec<_> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ExtractionEvent::FieldMissing { field, .. } => Some(field),
                _ => None,
            })
            .collect();
        assert_eq!(
            missing,
            vec![
                NotificationField::TransactionDate,
                NotificationField::Amount,
                NotificationField::StoreName,
            ]
        );
    }

    #[test]
    fn test_invalid_value_reported_separately_from_missing() {
        let sink = RecordingSink::default();
        let body = "ご利用日時：2025-02-31 10:00:00\nご利用金額：100円\nご利用店舗：shop\n";
        assert_eq!(
            extract_with(PaymentSource::AnaPay, body, &sink),
            Extraction::NotMatched
        );

        let events = sink.events();
        assert!(!events
            .iter()
            .any(|e| matches!(e, ExtractionEvent::FieldMissing { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            ExtractionEvent::FieldInvalid {
                field: NotificationField::TransactionDate,
                ..
            }
        )));
        assert!(!events
            .iter()
            .any(|e| matches!(e, ExtractionEvent::Matched { .. })));
    }

    #[test]
    fn test_success_emits_matched_event() {
        let sink = RecordingSink::default();
        assert!(extract_with(PaymentSource::AnaPay, ANA_PAY_BODY, &sink).is_matched());
        assert_eq!(
            sink.events(),
            vec![
                ExtractionEvent::Attempted {
                    source: PaymentSource::AnaPay
                },
                ExtractionEvent::Matched {
                    source: PaymentSource::AnaPay
                },
            ]
        );
    }

    #[test]
    fn test_parallel_extraction() {
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| extract(PaymentSource::AnaPay, ANA_PAY_BODY)))
                .collect();
            for handle in handles {
                let txn = handle.join().unwrap().unwrap();
                assert_eq!(txn.amount(), 8250);
            }
        });
    }
}
