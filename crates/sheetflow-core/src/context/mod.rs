//! Module: context
//! Responsibility: per-request scope of named fields, named sheets, and
//! accumulated user-visible messages.
//! Does not own: how the scope is populated (transport) or what the caller
//! does with `has_errors()` afterwards.
//! Boundary: one instance per logical request; never shared across threads.

mod message;


use crate::{
    error::InternalError,
    sheet::{ChildSheets, DataSheet, DataSheetLink, Fields, FieldsMut, SheetError},
    value::{Value, ValueType},
};
use std::collections::HashMap;

// re-exports
pub use message::{Message, MessageKind};

///
/// ServiceContext
///
/// Working set for one execution. Actions read and write fields and sheets
/// here; business failures land in `messages` rather than as errors.
///

#[derive(Clone, Debug)]
pub struct ServiceContext {
    service_name: String,
    user_id: Value,
    fields: HashMap<String, Value>,
    sheets: HashMap<String, DataSheet>,
    messages: Vec<Message>,
    error_count: usize,
    links: HashMap<String, DataSheetLink>,
    child_sheets: HashMap<String, ChildSheets>,
}

impl ServiceContext {
    #[must_use]
    pub fn new(service_name: impl Into<String>, user_id: Value) -> Self {
        Self {
            service_name: service_name.into(),
            user_id,
            fields: HashMap::new(),
            sheets: HashMap::new(),
            messages: Vec::new(),
            error_count: 0,
            links: HashMap::new(),
            child_sheets: HashMap::new(),
        }
    }

    /// Context with an unknown text user id.
    #[must_use]
    pub fn anonymous(service_name: impl Into<String>) -> Self {
        Self::new(service_name, Value::unknown(ValueType::Text))
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    #[must_use]
    pub const fn user_id(&self) -> &Value {
        &self.user_id
    }

    ///
    /// FIELDS
    ///

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn remove_value(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    #[must_use]
    pub fn has_value(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    ///
    /// SHEETS
    ///

    #[must_use]
    pub fn sheet(&self, name: &str) -> Option<&DataSheet> {
        self.sheets.get(name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut DataSheet> {
        self.sheets.get_mut(name)
    }

    /// Store `sheet` under `name`, returning any sheet it replaced.
    pub fn put_sheet(&mut self, name: impl Into<String>, sheet: DataSheet) -> Option<DataSheet> {
        let name = name.into();
        self.child_sheets.remove(&name);
        self.sheets.insert(name, sheet)
    }

    pub fn remove_sheet(&mut self, name: &str) -> Option<DataSheet> {
        self.child_sheets.remove(name);
        self.sheets.remove(name)
    }

    /// Row count of a sheet; zero when the sheet is absent.
    #[must_use]
    pub fn nbr_rows_in_sheet(&self, name: &str) -> usize {
        self.sheets.get(name).map_or(0, DataSheet::length)
    }

    ///
    /// LINKS
    ///

    /// Register a parent/child link, keyed by the child sheet name.
    pub fn add_sheet_link(&mut self, link: DataSheetLink) {
        self.child_sheets.remove(&link.child_sheet);
        self.links.insert(link.child_sheet.clone(), link);
    }

    #[must_use]
    pub fn sheet_link(&self, child_sheet: &str) -> Option<&DataSheetLink> {
        self.links.get(child_sheet)
    }

    /// Split the linked child sheet by its key so parent rows can look up
    /// their children. Must be called again after either sheet changes.
    pub fn prepare_child_sheets(&mut self, child_sheet: &str) -> Result<(), InternalError> {
        let link = self.links.get(child_sheet).ok_or_else(|| {
            InternalError::context_not_found(format!(
                "no sheet link is registered for child sheet '{child_sheet}'"
            ))
        })?;
        let parent = self.sheet_or_not_found(&link.parent_sheet)?;
        let child = self.sheet_or_not_found(&link.child_sheet)?;

        let split = ChildSheets::new(link, parent, child)?;
        self.child_sheets.insert(child_sheet.to_string(), split);

        Ok(())
    }

    /// Child rows of `child_sheet` that belong to `parent_row`. `None` when
    /// child sheets were not prepared or the parent row has no children.
    #[must_use]
    pub fn child_sheet(&self, child_sheet: &str, parent_row: &[Value]) -> Option<&DataSheet> {
        self.child_sheets.get(child_sheet)?.child_sheet(parent_row)
    }

    fn sheet_or_not_found(&self, name: &str) -> Result<&DataSheet, InternalError> {
        self.sheets
            .get(name)
            .ok_or_else(|| InternalError::context_not_found(format!("sheet '{name}' is not in context")))
    }

    ///
    /// MESSAGES
    ///

    pub fn add_message(&mut self, kind: MessageKind, text: impl Into<String>) {
        if kind.is_error() {
            self.error_count = self.error_count.saturating_add(1);
        }
        self.messages.push(Message::new(kind, text));
    }

    #[must_use]
    pub const fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.error_count
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn reset_messages(&mut self) {
        self.messages.clear();
        self.error_count = 0;
    }
}

impl Fields for ServiceContext {
    fn field(&self, name: &str) -> Option<&Value> {
        self.value(name)
    }
}

impl FieldsMut for ServiceContext {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), SheetError> {
        self.set_value(name, value);
        Ok(())
    }
}
