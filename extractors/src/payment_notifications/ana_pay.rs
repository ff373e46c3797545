use super::{FieldPattern, SourceGrammar};
use regex::Regex;
use shared_types::{NotificationField, PaymentSource};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// ANA Pay "ご利用のお知らせ" layout:
///
/// ```text
/// ご利用日時：2025-03-29 14:05:52
/// ご利用金額：8,250円
/// ご利用店舗：yyy
/// ```
pub(super) fn grammar() -> SourceGrammar {
    SourceGrammar::new(
        PaymentSource::AnaPay,
        DATE_FORMAT,
        vec![
            FieldPattern::new(
                NotificationField::TransactionDate,
                Regex::new(r"ご利用日時：([0-9]{4}-[0-9]{2}-[0-9]{2}\s[0-9]{2}:[0-9]{2}:[0-9]{2})")
                    .unwrap(),
                &[1],
            ),
            FieldPattern::new(
                NotificationField::Amount,
                Regex::new(r"ご利用金額：([0-9,]+)円").unwrap(),
                &[1],
            ),
            FieldPattern::new(
                NotificationField::StoreName,
                Regex::new(r"ご利用店舗：([^\r\n]+)").unwrap(),
                &[1],
            ),
        ],
    )
}
