use crate::value::Value;

///
/// GroupKey
///
/// Hashable projection of a `Value` used to match rows by key.
///
/// Text folds to lowercase and integral decimals key as integers, so `2` and
/// `2.0` share a key. Fractional decimals key by their exact bits; grouping
/// never truncates. Unknown values all share the `Unknown` key.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum GroupKey {
    Unknown,
    Boolean(bool),
    Integer(i64),
    /// Raw bits of a non-integral decimal.
    Fraction(u64),
    Date(i64),
    Text(String),
    Handle(String),
}

#[allow(clippy::float_cmp)]
pub(super) fn compare_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(Some(a)), Value::Integer(Some(b)))
        | (Value::Date(Some(a)), Value::Date(Some(b))) => a == b,

        (Value::Decimal(Some(a)), Value::Decimal(Some(b))) => a == b,

        (Value::Integer(Some(i)), Value::Decimal(Some(d)))
        | (Value::Decimal(Some(d)), Value::Integer(Some(i))) => truncated(*d) == Some(*i),

        (Value::Boolean(Some(a)), Value::Boolean(Some(b))) => a == b,

        (Value::Text(Some(a)), Value::Text(Some(b))) => a.to_lowercase() == b.to_lowercase(),

        (Value::LargeText(Some(a)), Value::LargeText(Some(b)))
        | (Value::LargeBinary(Some(a)), Value::LargeBinary(Some(b))) => a == b,

        _ => false,
    }
}

pub(super) fn group_key(value: &Value) -> GroupKey {
    match value {
        Value::Boolean(Some(b)) => GroupKey::Boolean(*b),
        Value::Integer(Some(i)) => GroupKey::Integer(*i),
        Value::Decimal(Some(d)) => match integral(*d) {
            Some(i) => GroupKey::Integer(i),
            None => GroupKey::Fraction(d.to_bits()),
        },
        Value::Date(Some(ms)) => GroupKey::Date(*ms),
        Value::Text(Some(s)) => GroupKey::Text(s.to_lowercase()),
        Value::LargeText(Some(s)) | Value::LargeBinary(Some(s)) => GroupKey::Handle(s.clone()),
        _ => GroupKey::Unknown,
    }
}

// Truncation toward zero, `None` outside the i64 range or for NaN.
#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn truncated(d: f64) -> Option<i64> {
    let t = d.trunc();
    if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}

#[expect(clippy::float_cmp)]
fn integral(d: f64) -> Option<i64> {
    if d.trunc() == d {
        truncated(d)
    } else {
        None
    }
}
