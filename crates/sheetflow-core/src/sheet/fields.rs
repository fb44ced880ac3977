use crate::{sheet::SheetError, value::Value};
use std::collections::{BTreeMap, HashMap};

///
/// Fields
///
/// Read access to named values. Implemented by sheet row views, the service
/// context, and plain maps so aggregation can read any of them as a row.
///

pub trait Fields {
    fn field(&self, name: &str) -> Option<&Value>;
}

///
/// FieldsMut
///
/// Write access to named values. Targets with a fixed layout (row views)
/// reject names they do not carry with `SheetError::UnknownColumn`.
///

pub trait FieldsMut: Fields {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), SheetError>;
}

impl Fields for BTreeMap<String, Value> {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl FieldsMut for BTreeMap<String, Value> {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), SheetError> {
        self.insert(name.to_string(), value);
        Ok(())
    }
}

impl Fields for HashMap<String, Value> {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl FieldsMut for HashMap<String, Value> {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), SheetError> {
        self.insert(name.to_string(), value);
        Ok(())
    }
}
