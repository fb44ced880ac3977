//! JSON bridge for scalar values.
//!
//! Values serialize as bare JSON scalars with `null` for unknown. The value
//! type is carried out of band (see the sheet JSON layout), so decoding is
//! always driven by a known `ValueType`.

use crate::value::{Value, ValueType, round_half_up};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(Some(s)) | Self::LargeText(Some(s)) | Self::LargeBinary(Some(s)) => {
                serializer.serialize_str(s)
            }
            Self::Integer(Some(i)) | Self::Date(Some(i)) => serializer.serialize_i64(*i),
            Self::Decimal(Some(d)) => serializer.serialize_f64(*d),
            Self::Boolean(Some(b)) => serializer.serialize_bool(*b),
            _ => serializer.serialize_none(),
        }
    }
}

pub(super) fn value_from_json(value_type: ValueType, json: &JsonValue) -> Value {
    let decoded = match (value_type, json) {
        (_, JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_)) => None,

        // Strings always go through the typed text grammar.
        (_, JsonValue::String(s)) => Some(value_type.parse(s)),

        (ValueType::Integer, JsonValue::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(round_half_up))
            .map(Value::integer),
        (ValueType::Date, JsonValue::Number(n)) => n.as_i64().map(Value::date_millis),
        (ValueType::Decimal, JsonValue::Number(n)) => n.as_f64().map(Value::decimal),
        (ValueType::Boolean, JsonValue::Number(n)) => n.as_i64().and_then(|i| match i {
            1 => Some(Value::boolean(true)),
            0 => Some(Value::boolean(false)),
            _ => None,
        }),
        (ValueType::Boolean, JsonValue::Bool(b)) => Some(Value::boolean(*b)),

        (ValueType::Text | ValueType::LargeText | ValueType::LargeBinary, other) => {
            Some(value_type.parse(&other.to_string()))
        }

        _ => None,
    };

    decoded.unwrap_or(Value::unknown(value_type))
}
