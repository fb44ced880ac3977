//! Module: value
//! Responsibility: the closed scalar value model every field and cell carries.
//! Does not own: tabular layout (see `sheet`) or per-request state.
//! Boundary: everything above this module operates on `Value`, never on raw
//! primitives.

mod coercion;
mod compare;
mod error;
mod format;
mod json;
mod parse;


use serde::{Deserialize, Serialize};
use std::fmt;

// re-exports
pub use coercion::{StorageAffinity, can_coerce};
pub use compare::GroupKey;
pub use error::ValueError;

///
/// CONSTANTS
///

/// Canonical text for boolean `true`.
pub const TRUE_TEXT: &str = "1";

/// Canonical text for boolean `false`.
pub const FALSE_TEXT: &str = "0";

/// Maximum number of fractional digits kept by decimal formatting.
pub const DECIMAL_FRACTION_DIGITS: usize = 6;

///
/// ValueType
///
/// Closed set of scalar kinds a [`Value`] can carry.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    LargeText,
    LargeBinary,
}

impl ValueType {
    /// Every value type, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Text,
        Self::Integer,
        Self::Decimal,
        Self::Boolean,
        Self::Date,
        Self::LargeText,
        Self::LargeBinary,
    ];

    /// Stable human-readable label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::LargeText => "largeText",
            Self::LargeBinary => "largeBinary",
        }
    }

    /// Returns true for the kinds numeric reducers accept.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Decimal)
    }

    /// Underlying storage affinity, consumed by database binding layers.
    #[must_use]
    pub const fn storage_affinity(self) -> StorageAffinity {
        coercion::storage_affinity(self)
    }

    /// Parse text into a value of this type.
    ///
    /// Empty or unparsable text yields the unknown value of this type; callers
    /// must check [`Value::is_unknown`] explicitly.
    #[must_use]
    pub fn parse(self, text: &str) -> Value {
        parse::parse_typed(self, text)
    }

    /// Build a typed value from a JSON scalar. `null` and mismatched JSON
    /// shapes both produce the unknown value.
    #[must_use]
    pub fn from_json(self, json: &serde_json::Value) -> Value {
        json::value_from_json(self, json)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// Value
///
/// Immutable typed scalar. `None` payloads are the *unknown* (null) state of
/// that type; a value always knows its [`ValueType`].
///
/// The derived `PartialEq` is structural. Engine semantics (case-insensitive
/// text, integer/decimal cross equality, unknown never equal) live in
/// [`Value::compare_equal`].
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Text(Option<String>),
    Integer(Option<i64>),
    Decimal(Option<f64>),
    Boolean(Option<bool>),
    /// Epoch milliseconds.
    Date(Option<i64>),
    /// Opaque handle to externally stored character data.
    LargeText(Option<String>),
    /// Opaque handle to externally stored binary data.
    LargeBinary(Option<String>),
}

impl Value {
    ///
    /// CONSTRUCTION
    ///

    /// The unknown value of the given type.
    #[must_use]
    pub const fn unknown(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Text => Self::Text(None),
            ValueType::Integer => Self::Integer(None),
            ValueType::Decimal => Self::Decimal(None),
            ValueType::Boolean => Self::Boolean(None),
            ValueType::Date => Self::Date(None),
            ValueType::LargeText => Self::LargeText(None),
            ValueType::LargeBinary => Self::LargeBinary(None),
        }
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(Some(text.into()))
    }

    #[must_use]
    pub const fn integer(value: i64) -> Self {
        Self::Integer(Some(value))
    }

    #[must_use]
    pub const fn decimal(value: f64) -> Self {
        Self::Decimal(Some(value))
    }

    #[must_use]
    pub const fn boolean(value: bool) -> Self {
        Self::Boolean(Some(value))
    }

    #[must_use]
    pub const fn date_millis(millis: i64) -> Self {
        Self::Date(Some(millis))
    }

    #[must_use]
    pub fn large_text(handle: impl Into<String>) -> Self {
        Self::LargeText(Some(handle.into()))
    }

    #[must_use]
    pub fn large_binary(handle: impl Into<String>) -> Self {
        Self::LargeBinary(Some(handle.into()))
    }

    /// Infer a value from untyped literal text.
    ///
    /// Recognizes `/yyyy-mm-dd/` date literals, `true`/`false`, integer and
    /// decimal literals; everything else is text. Empty text is the empty
    /// (known) text value.
    #[must_use]
    pub fn infer(text: &str) -> Self {
        parse::infer(text)
    }

    ///
    /// TYPES
    ///

    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Text(_) => ValueType::Text,
            Self::Integer(_) => ValueType::Integer,
            Self::Decimal(_) => ValueType::Decimal,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Date(_) => ValueType::Date,
            Self::LargeText(_) => ValueType::LargeText,
            Self::LargeBinary(_) => ValueType::LargeBinary,
        }
    }

    /// Returns true when this is the unknown (null) state of its type.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        match self {
            Self::Text(v) | Self::LargeText(v) | Self::LargeBinary(v) => v.is_none(),
            Self::Integer(v) | Self::Date(v) => v.is_none(),
            Self::Decimal(v) => v.is_none(),
            Self::Boolean(v) => v.is_none(),
        }
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.value_type().is_numeric()
    }

    ///
    /// CONVERSION
    ///

    /// Narrow to an integer. Decimals round half-up; NaN and infinities fail.
    pub fn to_integer(&self) -> Result<i64, ValueError> {
        self.ensure_coercible(ValueType::Integer)?;
        match self {
            Self::Integer(Some(v)) => Ok(*v),
            Self::Decimal(Some(v)) if !v.is_finite() => Err(ValueError::NonFinite),
            Self::Decimal(Some(v)) => Ok(round_half_up(*v)),
            _ => Err(self.unknown_error()),
        }
    }

    /// Narrow to a decimal. Integers widen.
    #[expect(clippy::cast_precision_loss)]
    pub fn to_decimal(&self) -> Result<f64, ValueError> {
        self.ensure_coercible(ValueType::Decimal)?;
        match self {
            Self::Decimal(Some(v)) => Ok(*v),
            Self::Integer(Some(v)) => Ok(*v as f64),
            _ => Err(self.unknown_error()),
        }
    }

    pub fn to_boolean(&self) -> Result<bool, ValueError> {
        self.ensure_coercible(ValueType::Boolean)?;
        match self {
            Self::Boolean(Some(v)) => Ok(*v),
            _ => Err(self.unknown_error()),
        }
    }

    /// Narrow to epoch milliseconds.
    pub fn to_date(&self) -> Result<i64, ValueError> {
        self.ensure_coercible(ValueType::Date)?;
        match self {
            Self::Date(Some(v)) => Ok(*v),
            _ => Err(self.unknown_error()),
        }
    }

    /// Borrow the text payload of text-like values.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) | Self::LargeText(v) | Self::LargeBinary(v) => v.as_deref(),
            _ => None,
        }
    }

    /// Convert into `target`, keeping the value when kinds already match.
    ///
    /// Coercible kinds narrow through the accessors above; any other pair
    /// goes through canonical text and yields unknown when unparsable.
    #[must_use]
    pub fn cast(self, target: ValueType) -> Self {
        if self.value_type() == target {
            return self;
        }
        if self.is_unknown() {
            return Self::unknown(target);
        }

        match target {
            ValueType::Integer if can_coerce(self.value_type(), target) => {
                self.to_integer().map_or(Self::unknown(target), Self::integer)
            }
            ValueType::Decimal if can_coerce(self.value_type(), target) => {
                self.to_decimal().map_or(Self::unknown(target), Self::decimal)
            }
            _ => target.parse(&self.format()),
        }
    }

    fn ensure_coercible(&self, target: ValueType) -> Result<(), ValueError> {
        let source = self.value_type();
        if can_coerce(source, target) {
            Ok(())
        } else {
            Err(ValueError::TypeMismatch {
                expected: target,
                found: source,
            })
        }
    }

    const fn unknown_error(&self) -> ValueError {
        ValueError::UnknownValue {
            value_type: self.value_type(),
        }
    }

    /// Truthiness used by run-conditions.
    ///
    /// Unknown is false; numbers are true when positive; dates are always
    /// true; text is true when non-empty.
    #[must_use]
    pub fn interpret_as_boolean(&self) -> bool {
        match self {
            Self::Boolean(Some(b)) => *b,
            Self::Integer(Some(i)) => *i > 0,
            Self::Decimal(Some(d)) => *d > 0.0,
            Self::Date(Some(_)) => true,
            Self::Text(Some(s)) | Self::LargeText(Some(s)) | Self::LargeBinary(Some(s)) => {
                !s.is_empty()
            }
            _ => false,
        }
    }

    ///
    /// TEXT
    ///

    /// Canonical text form. Unknown formats as the empty string.
    #[must_use]
    pub fn format(&self) -> String {
        format::format_value(self)
    }

    ///
    /// COMPARISON
    ///

    /// Engine equality rule.
    ///
    /// - unknown is never equal to anything
    /// - integer/decimal compare after truncating the decimal side
    /// - text is case-insensitive
    /// - other differing kinds are never equal
    #[must_use]
    pub fn compare_equal(&self, other: &Self) -> bool {
        compare::compare_equal(self, other)
    }

    /// Hashable grouping key for link and group-run matching.
    #[must_use]
    pub fn group_key(&self) -> GroupKey {
        compare::group_key(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// Round half-up (towards positive infinity on ties), saturating at the
/// `i64` bounds. Callers reject non-finite input first.
#[must_use]
#[expect(clippy::cast_possible_truncation)]
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[macro_export]
macro_rules! impl_value_from {
    ( $( $type:ty => $ctor:ident($target:ty) ),* $(,)? ) => {
        $(
            impl From<$type> for $crate::value::Value {
                fn from(v: $type) -> Self {
                    Self::$ctor(<$target>::from(v))
                }
            }
        )*
    };
}

impl_value_from! {
    bool   => boolean(bool),
    i8     => integer(i64),
    i16    => integer(i64),
    i32    => integer(i64),
    i64    => integer(i64),
    u8     => integer(i64),
    u16    => integer(i64),
    u32    => integer(i64),
    f32    => decimal(f64),
    f64    => decimal(f64),
    &str   => text(String),
    String => text(String),
}
