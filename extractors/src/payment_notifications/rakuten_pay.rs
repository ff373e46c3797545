use super::{FieldPattern, SourceGrammar};
use regex::Regex;
use shared_types::{NotificationField, PaymentSource};

const DATE_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Rakuten Pay "ご利用明細" layout. Labels and values are tab separated and the
/// store block ends at the `電話番号` line:
///
/// ```text
/// ご利用日時	2025/03/13(木) 14:52
/// ご利用店舗	パティスリー　シェ・シシ
/// 電話番号	092-791-3617
/// 決済総額	¥6,770
/// ```
pub(super) fn grammar() -> SourceGrammar {
    SourceGrammar::new(
        PaymentSource::RakutenPay,
        DATE_FORMAT,
        vec![
            // weekday between the groups is dropped
            FieldPattern::new(
                NotificationField::TransactionDate,
                Regex::new(r"ご利用日時\s+([0-9]{4}/[0-9]{2}/[0-9]{2})\(\S\)\s([0-9]{2}:[0-9]{2})")
                    .unwrap(),
                &[1, 2],
            ),
            FieldPattern::new(
                NotificationField::Amount,
                Regex::new(r"決済総額\s+[¥￥]([0-9,]+)").unwrap(),
                &[1],
            ),
            FieldPattern::new(
                NotificationField::StoreName,
                Regex::new(r"ご利用店舗\s+([\s\S]+?)(?:\r\n|\n|\r)\s*電話番号").unwrap(),
                &[1],
            ),
        ],
    )
}
