use crate::value::{FALSE_TEXT, TRUE_TEXT, Value, ValueType, round_half_up};
use std::sync::OnceLock;
use time::{
    Date, OffsetDateTime, PrimitiveDateTime,
    format_description::{self, FormatItem, well_known::Rfc3339},
};

// `/yyyy-mm-dd/`
const DATE_LITERAL_LEN: usize = 12;
const DATE_LITERAL_DELIMITER: char = '/';

const DATE_FORMAT: &str = "[year]-[month]-[day]";

const DATE_TIME_FORMATS: [&str; 4] = [
    "[year]-[month]-[day]T[hour]:[minute]:[second]",
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]",
    "[year]-[month]-[day] [hour]:[minute]:[second]",
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]",
];

pub(super) fn parse_typed(value_type: ValueType, text: &str) -> Value {
    let text = text.trim();
    if text.is_empty() {
        return Value::unknown(value_type);
    }

    let parsed = match value_type {
        ValueType::Text => Some(Value::text(text)),
        ValueType::LargeText => Some(Value::large_text(text)),
        ValueType::LargeBinary => Some(Value::large_binary(text)),
        ValueType::Integer => parse_integer(text).map(Value::integer),
        ValueType::Decimal => parse_decimal(text).map(Value::decimal),
        ValueType::Boolean => parse_boolean(text).map(Value::boolean),
        ValueType::Date => parse_date_millis(text).map(Value::date_millis),
    };

    parsed.unwrap_or(Value::unknown(value_type))
}

fn parse_integer(text: &str) -> Option<i64> {
    if let Ok(v) = text.parse::<i64>() {
        return Some(v);
    }

    parse_decimal(text)
        .filter(|d| d.is_finite())
        .map(round_half_up)
}

fn parse_decimal(text: &str) -> Option<f64> {
    text.parse::<f64>().ok()
}

fn parse_boolean(text: &str) -> Option<bool> {
    if text == TRUE_TEXT {
        return Some(true);
    }
    if text == FALSE_TEXT {
        return Some(false);
    }

    match text.to_ascii_lowercase().as_str() {
        "true" | "y" | "yes" => Some(true),
        "false" | "n" | "no" => Some(false),
        _ => None,
    }
}

/// Dates accept epoch millis, an ISO date, or an ISO date-time.
/// Date-times without an offset are taken as UTC.
pub(super) fn parse_date_millis(text: &str) -> Option<i64> {
    if let Ok(millis) = text.parse::<i64>() {
        return Some(millis);
    }

    if let Some(format) = date_format()
        && let Ok(date) = Date::parse(text, format)
    {
        return epoch_millis(date.midnight().assume_utc());
    }

    if let Ok(dt) = OffsetDateTime::parse(text, &Rfc3339) {
        return epoch_millis(dt);
    }

    date_time_formats().iter().find_map(|format| {
        PrimitiveDateTime::parse(text, format)
            .ok()
            .and_then(|dt| epoch_millis(dt.assume_utc()))
    })
}

fn epoch_millis(dt: OffsetDateTime) -> Option<i64> {
    i64::try_from(dt.unix_timestamp_nanos() / 1_000_000).ok()
}

fn date_format() -> Option<&'static [FormatItem<'static>]> {
    static FORMAT: OnceLock<Option<Vec<FormatItem<'static>>>> = OnceLock::new();

    FORMAT
        .get_or_init(|| format_description::parse(DATE_FORMAT).ok())
        .as_deref()
}

fn date_time_formats() -> &'static [Vec<FormatItem<'static>>] {
    static FORMATS: OnceLock<Vec<Vec<FormatItem<'static>>>> = OnceLock::new();

    FORMATS.get_or_init(|| {
        DATE_TIME_FORMATS
            .iter()
            .filter_map(|description| format_description::parse(description).ok())
            .collect()
    })
}

pub(super) fn infer(text: &str) -> Value {
    if text.is_empty() {
        return Value::text("");
    }

    if text.len() == DATE_LITERAL_LEN
        && text.starts_with(DATE_LITERAL_DELIMITER)
        && text.ends_with(DATE_LITERAL_DELIMITER)
    {
        let inner = &text[1..DATE_LITERAL_LEN - 1];
        if let Some(millis) = parse_date_millis(inner) {
            return Value::date_millis(millis);
        }
    }

    match text {
        "true" => return Value::boolean(true),
        "false" => return Value::boolean(false),
        _ => {}
    }

    let starts_numeric = text
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '-');
    if starts_numeric {
        if !text.contains('.') {
            if let Ok(v) = text.parse::<i64>() {
                return Value::integer(v);
            }
        } else if let Ok(v) = text.parse::<f64>() {
            return Value::decimal(v);
        }
    }

    Value::text(text)
}
