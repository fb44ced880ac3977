//! JSON layout for data sheets.
//!
//! ```json
//! { "columns": [{ "name": "id", "valueType": "integer" }], "rows": [[1], [null]] }
//! ```
//!
//! Column order is the array order; unknown cells are explicit `null`.

use crate::{
    sheet::{Column, DataSheet, SheetError},
    value::Value,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use serde_json::Value as JsonValue;

#[derive(Serialize)]
struct SheetJsonRef<'a> {
    columns: &'a [Column],
    rows: &'a [Vec<Value>],
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SheetJson {
    columns: Vec<Column>,
    #[serde(default)]
    rows: Vec<Vec<JsonValue>>,
}

impl Serialize for DataSheet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SheetJsonRef {
            columns: &self.columns,
            rows: &self.rows,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DataSheet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = SheetJson::deserialize(deserializer)?;
        raw.into_sheet().map_err(D::Error::custom)
    }
}

impl SheetJson {
    fn into_sheet(self) -> Result<DataSheet, SheetError> {
        let mut sheet = DataSheet::with_capacity(self.columns, self.rows.len())?;
        for cells in self.rows {
            if cells.len() != sheet.width() {
                return Err(SheetError::ColumnCountMismatch {
                    expected: sheet.width(),
                    found: cells.len(),
                });
            }
            let row = sheet
                .column_types()
                .zip(&cells)
                .map(|(ty, json)| ty.from_json(json))
                .collect();
            sheet.rows.push(row);
        }

        Ok(sheet)
    }
}

impl DataSheet {
    /// Serialize to a JSON document value.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    /// Serialize to compact JSON text.
    pub fn to_json_string(&self) -> Result<String, SheetError> {
        serde_json::to_string(self).map_err(|err| SheetError::InvalidJson {
            message: err.to_string(),
        })
    }

    /// Decode a sheet from a JSON document value.
    pub fn from_json(json: &JsonValue) -> Result<Self, SheetError> {
        let raw = SheetJson::deserialize(json).map_err(|err| SheetError::InvalidJson {
            message: err.to_string(),
        })?;

        raw.into_sheet()
    }

    /// Decode a sheet from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, SheetError> {
        let raw: SheetJson =
            serde_json::from_str(text).map_err(|err| SheetError::InvalidJson {
                message: err.to_string(),
            })?;

        raw.into_sheet()
    }
}
