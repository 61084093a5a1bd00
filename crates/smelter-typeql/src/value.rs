//! Scalar value encoding: one typed scalar to one TypeQL literal token.

use chrono::{NaiveDateTime, Timelike};
use smelter_core::ScalarValue;

/// Encode one coerced scalar as a TypeQL literal.
pub fn encode_scalar(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Text(text) => quote_text(text),
        ScalarValue::Bool(b) => b.to_string(),
        ScalarValue::Int(i) => i.to_string(),
        ScalarValue::Real(f) => format!("{f:?}"),
        ScalarValue::Timestamp(dt) => format_timestamp(dt),
    }
}

/// Quote text for TypeQL.
///
/// Internal double quotes are replaced by apostrophes and backslashes are
/// doubled. The quote replacement is lossy: the original text is not
/// recoverable from the literal. The consuming query engine is
/// syntax-sensitive, so this exact escaping is part of the contract.
pub fn quote_text(text: &str) -> String {
    let cleaned = text.replace('"', "'").replace('\\', "\\\\");
    format!("\"{cleaned}\"")
}

/// Fixed timestamp pattern with exactly three fractional-second digits,
/// truncated rather than rounded. Unquoted: TypeQL datetimes are bare
/// literals.
pub fn format_timestamp(dt: &NaiveDateTime) -> String {
    let millis = (dt.nanosecond() % 1_000_000_000) / 1_000_000;
    format!("{}.{:03}", dt.format("%Y-%m-%dT%H:%M:%S"), millis)
}
