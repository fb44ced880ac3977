use crate::{
    sheet::{DataSheet, SheetError},
    value::{GroupKey, Value},
};
use std::collections::{HashMap, hash_map::Entry};

///
/// DataSheetLink
///
/// Parent/child relationship between two named sheets: the child rows whose
/// key columns match a parent row's key columns belong to that parent row.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DataSheetLink {
    pub parent_sheet: String,
    pub child_sheet: String,
    pub parent_indexes: Vec<usize>,
    pub child_indexes: Vec<usize>,
}

impl DataSheetLink {
    pub fn new(
        parent_sheet: impl Into<String>,
        child_sheet: impl Into<String>,
        parent_indexes: Vec<usize>,
        child_indexes: Vec<usize>,
    ) -> Result<Self, SheetError> {
        if parent_indexes.len() != child_indexes.len() || parent_indexes.is_empty() {
            return Err(SheetError::LinkKeyMismatch {
                parent: parent_indexes.len(),
                child: child_indexes.len(),
            });
        }

        Ok(Self {
            parent_sheet: parent_sheet.into(),
            child_sheet: child_sheet.into(),
            parent_indexes,
            child_indexes,
        })
    }

    /// Build a link by resolving key column names against both sheets.
    pub fn resolve(
        parent_sheet: impl Into<String>,
        child_sheet: impl Into<String>,
        parent: &DataSheet,
        child: &DataSheet,
        parent_keys: &[&str],
        child_keys: &[&str],
    ) -> Result<Self, SheetError> {
        Self::new(
            parent_sheet,
            child_sheet,
            parent.column_indexes(parent_keys)?,
            child.column_indexes(child_keys)?,
        )
    }
}

///
/// ChildSheets
///
/// A child sheet split by its link key, answering "which child rows belong
/// to this parent row". Child rows keep their relative order.
///
/// Rows with an unknown key cell never pair: unknown is never equal to
/// anything, so they are dropped from the split.
///

#[derive(Clone, Debug)]
pub struct ChildSheets {
    parent_indexes: Vec<usize>,
    children: HashMap<Vec<GroupKey>, DataSheet>,
}

impl ChildSheets {
    pub fn new(
        link: &DataSheetLink,
        parent: &DataSheet,
        child: &DataSheet,
    ) -> Result<Self, SheetError> {
        check_in_range(&link.parent_indexes, parent)?;
        check_in_range(&link.child_indexes, child)?;

        let mut children: HashMap<Vec<GroupKey>, DataSheet> = HashMap::new();
        for idx in 0..child.length() {
            let Some(cells) = child.row(idx) else {
                continue;
            };
            let Some(key) = link_key(cells, &link.child_indexes) else {
                continue;
            };

            let sheet = match children.entry(key) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(DataSheet::new(child.columns().to_vec())?),
            };
            sheet.append_row(cells.to_vec())?;
        }

        Ok(Self {
            parent_indexes: link.parent_indexes.clone(),
            children,
        })
    }

    /// Child rows belonging to `parent_row`, if any.
    #[must_use]
    pub fn child_sheet(&self, parent_row: &[Value]) -> Option<&DataSheet> {
        let key = link_key(parent_row, &self.parent_indexes)?;
        self.children.get(&key)
    }

    /// Number of distinct parent keys that have at least one child row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

fn link_key(cells: &[Value], indexes: &[usize]) -> Option<Vec<GroupKey>> {
    indexes
        .iter()
        .map(|&idx| {
            let value = cells.get(idx)?;
            if value.is_unknown() {
                None
            } else {
                Some(value.group_key())
            }
        })
        .collect()
}

fn check_in_range(indexes: &[usize], sheet: &DataSheet) -> Result<(), SheetError> {
    match indexes.iter().find(|&&idx| idx >= sheet.width()) {
        Some(&index) => Err(SheetError::ColumnIndexOutOfRange {
            index,
            width: sheet.width(),
        }),
        None => Ok(()),
    }
}
