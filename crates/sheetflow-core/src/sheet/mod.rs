//! Module: sheet
//! Responsibility: the ordered, fixed-column table of typed values.
//! Does not own: value parsing/formatting rules or per-request naming.
//! Boundary: rows are appended whole; cells change only through `RowViewMut`.

mod error;
mod fields;
mod json;
mod link;
mod row;


use crate::value::{GroupKey, Value, ValueType, can_coerce};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, ops::Range};

// re-exports
pub use error::SheetError;
pub use fields::{Fields, FieldsMut};
pub use link::{ChildSheets, DataSheetLink};
pub use row::{RowView, RowViewMut};

///
/// Column
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub value_type: ValueType,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

///
/// DataSheet
///
/// Ordered unique columns with parallel value types, and rows aligned to
/// them. Every row has exactly `width()` cells.
///
/// A sheet with zero columns is the *no-data* marker; it is distinct from a
/// sheet that has columns but no rows.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataSheet {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl DataSheet {
    /// Build an empty sheet over `columns`.
    pub fn new(columns: Vec<Column>) -> Result<Self, SheetError> {
        Self::with_capacity(columns, 0)
    }

    /// Build an empty sheet with room for `rows` rows.
    pub fn with_capacity(columns: Vec<Column>, rows: usize) -> Result<Self, SheetError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(SheetError::DuplicateColumn {
                    name: column.name.clone(),
                });
            }
        }

        Ok(Self {
            columns,
            rows: Vec::with_capacity(rows),
        })
    }

    /// Convenience constructor from `(name, type)` pairs.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, ValueType)>,
    ) -> Result<Self, SheetError> {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, ty)| Column::new(name, ty))
                .collect(),
        )
    }

    /// The zero-column no-data marker.
    #[must_use]
    pub const fn no_data() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    ///
    /// SHAPE
    ///

    #[must_use]
    pub const fn width(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub const fn length(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub const fn is_no_data(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column_types(&self) -> impl Iterator<Item = ValueType> + '_ {
        self.columns.iter().map(|c| c.value_type)
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        column_position(&self.columns, name)
    }

    /// Resolve several column names, failing on the first missing one.
    pub fn column_indexes<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>, SheetError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.column_index(name)
                    .ok_or_else(|| SheetError::UnknownColumn {
                        name: name.to_string(),
                    })
            })
            .collect()
    }

    ///
    /// READ
    ///

    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Values of one column, in row order.
    pub fn column_values<'a>(
        &'a self,
        name: &str,
    ) -> Result<impl Iterator<Item = &'a Value> + use<'a>, SheetError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| SheetError::UnknownColumn {
                name: name.to_string(),
            })?;

        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    ///
    /// APPEND
    ///

    /// Append one row. Unknown and numeric cells are cast to their column
    /// type; any other kind mismatch is a `ColumnTypeMismatch`.
    pub fn append_row(&mut self, values: Vec<Value>) -> Result<(), SheetError> {
        if values.len() != self.width() {
            return Err(SheetError::ColumnCountMismatch {
                expected: self.width(),
                found: values.len(),
            });
        }

        let row = values
            .into_iter()
            .zip(&self.columns)
            .enumerate()
            .map(|(index, (value, column))| {
                let found = value.value_type();
                if value.is_unknown() || can_coerce(found, column.value_type) {
                    Ok(value.cast(column.value_type))
                } else {
                    Err(SheetError::ColumnTypeMismatch {
                        index,
                        expected: column.value_type,
                        found,
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.rows.push(row);

        Ok(())
    }

    /// Append every row of `other`. Both sheets must have identical column
    /// types in the same order; names are not compared.
    pub fn append_rows(&mut self, other: &Self) -> Result<(), SheetError> {
        if other.width() != self.width() {
            return Err(SheetError::ColumnCountMismatch {
                expected: self.width(),
                found: other.width(),
            });
        }

        let mismatch = self
            .column_types()
            .zip(other.column_types())
            .enumerate()
            .find(|(_, (mine, theirs))| mine != theirs);
        if let Some((index, (expected, found))) = mismatch {
            return Err(SheetError::ColumnTypeMismatch {
                index,
                expected,
                found,
            });
        }

        self.rows.extend(other.rows.iter().cloned());

        Ok(())
    }

    /// Append a row built from named fields. Missing fields become unknown;
    /// present values are cast to the column type.
    pub fn append_record(&mut self, fields: &impl Fields) {
        let row = self
            .columns
            .iter()
            .map(|column| match fields.field(&column.name) {
                Some(value) => value.clone().cast(column.value_type),
                None => Value::unknown(column.value_type),
            })
            .collect();
        self.rows.push(row);
    }

    ///
    /// GROUPING
    ///

    /// Contiguous runs of rows that share the same key over `key_columns`.
    ///
    /// The sheet is expected to be sorted on those keys; unsorted input just
    /// yields more, shorter runs. With no key columns the whole sheet is one
    /// run (or none when the sheet is empty).
    pub fn group_runs(&self, key_columns: &[usize]) -> Result<Vec<Range<usize>>, SheetError> {
        if let Some(&index) = key_columns.iter().find(|&&c| c >= self.width()) {
            return Err(SheetError::ColumnIndexOutOfRange {
                index,
                width: self.width(),
            });
        }

        let mut runs = Vec::new();
        let mut start = 0;
        let mut current: Option<Vec<GroupKey>> = None;

        for (idx, row) in self.rows.iter().enumerate() {
            let key: Vec<GroupKey> = key_columns.iter().map(|&c| row[c].group_key()).collect();
            match &current {
                Some(prev) if *prev == key => {}
                Some(_) => {
                    runs.push(start..idx);
                    start = idx;
                    current = Some(key);
                }
                None => current = Some(key),
            }
        }
        if current.is_some() {
            runs.push(start..self.rows.len());
        }

        Ok(runs)
    }
}

pub(crate) fn column_position(columns: &[Column], name: &str) -> Option<usize> {
    columns.iter().position(|c| c.name == name)
}
