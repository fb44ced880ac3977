use crate::value::{DECIMAL_FRACTION_DIGITS, FALSE_TEXT, TRUE_TEXT, Value};

pub(super) fn format_value(value: &Value) -> String {
    match value {
        Value::Text(Some(s)) | Value::LargeText(Some(s)) | Value::LargeBinary(Some(s)) => s.clone(),
        Value::Integer(Some(i)) | Value::Date(Some(i)) => i.to_string(),
        Value::Decimal(Some(d)) => format_decimal(*d),
        Value::Boolean(Some(true)) => TRUE_TEXT.to_string(),
        Value::Boolean(Some(false)) => FALSE_TEXT.to_string(),
        _ => String::new(),
    }
}

// Truncates (never rounds) to the fraction digit limit, then drops trailing
// zeros and a dangling point. Works on the shortest round-trip text so the
// result reparses to a decimal that formats identically.
fn format_decimal(d: f64) -> String {
    let shortest = d.to_string();
    let Some((int_part, frac_part)) = shortest.split_once('.') else {
        return normalize_negative_zero(shortest);
    };

    let kept = &frac_part[..frac_part.len().min(DECIMAL_FRACTION_DIGITS)];
    let kept = kept.trim_end_matches('0');

    let text = if kept.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{kept}")
    };

    normalize_negative_zero(text)
}

fn normalize_negative_zero(text: String) -> String {
    if text == "-0" { "0".to_string() } else { text }
}
