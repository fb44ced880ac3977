//! Coercion and storage-affinity tables for `ValueType`.
//!
//! All cross-kind narrowing decisions route through `COERCION_TABLE`; nothing
//! else in the crate may special-case kind pairs.

use crate::value::ValueType;
use serde::{Deserialize, Serialize};

///
/// StorageAffinity
///
/// Underlying column storage a value type binds to. Only consumed by the
/// database-binding layer, but the mapping is part of the value model.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum StorageAffinity {
    VarChar,
    BigInt,
    Double,
    Boolean,
    Date,
    Clob,
    Blob,
}

impl StorageAffinity {
    /// SQL type name for this affinity.
    #[must_use]
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::VarChar => "VARCHAR",
            Self::BigInt => "BIGINT",
            Self::Double => "DOUBLE",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Clob => "CLOB",
            Self::Blob => "BLOB",
        }
    }
}

pub(super) const fn storage_affinity(value_type: ValueType) -> StorageAffinity {
    match value_type {
        ValueType::Text => StorageAffinity::VarChar,
        ValueType::Integer => StorageAffinity::BigInt,
        ValueType::Decimal => StorageAffinity::Double,
        ValueType::Boolean => StorageAffinity::Boolean,
        ValueType::Date => StorageAffinity::Date,
        ValueType::LargeText => StorageAffinity::Clob,
        ValueType::LargeBinary => StorageAffinity::Blob,
    }
}

// Rows: source kind. Columns: target kind. Order follows `ValueType::ALL`.
//
//                 text   int    dec    bool   date   ltext  lbin
const COERCION_TABLE: [[bool; 7]; 7] = [
    /* text  */ [true, false, false, false, false, false, false],
    /* int   */ [false, true, true, false, false, false, false],
    /* dec   */ [false, true, true, false, false, false, false],
    /* bool  */ [false, false, false, true, false, false, false],
    /* date  */ [false, false, false, false, true, false, false],
    /* ltext */ [false, false, false, false, false, true, false],
    /* lbin  */ [false, false, false, false, false, false, true],
];

const fn table_index(value_type: ValueType) -> usize {
    match value_type {
        ValueType::Text => 0,
        ValueType::Integer => 1,
        ValueType::Decimal => 2,
        ValueType::Boolean => 3,
        ValueType::Date => 4,
        ValueType::LargeText => 5,
        ValueType::LargeBinary => 6,
    }
}

/// Returns true when a value of kind `from` may be narrowed to kind `to`.
#[must_use]
pub const fn can_coerce(from: ValueType, to: ValueType) -> bool {
    COERCION_TABLE[table_index(from)][table_index(to)]
}
