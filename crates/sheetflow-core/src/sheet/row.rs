use crate::{
    sheet::{Column, DataSheet, Fields, FieldsMut, SheetError, column_position},
    value::Value,
};

///
/// RowView
///
/// Borrowed, read-only view of one sheet row addressable by column name.
///

#[derive(Clone, Copy, Debug)]
pub struct RowView<'a> {
    columns: &'a [Column],
    cells: &'a [Value],
}

impl<'a> RowView<'a> {
    pub(crate) const fn new(columns: &'a [Column], cells: &'a [Value]) -> Self {
        Self { columns, cells }
    }

    #[must_use]
    pub const fn cells(&self) -> &'a [Value] {
        self.cells
    }
}

impl Fields for RowView<'_> {
    fn field(&self, name: &str) -> Option<&Value> {
        column_position(self.columns, name).map(|idx| &self.cells[idx])
    }
}

///
/// RowViewMut
///
/// Mutable view of one sheet row. The only path through which existing
/// cells change; writes are cast to the column's declared type.
///

#[derive(Debug)]
pub struct RowViewMut<'a> {
    columns: &'a [Column],
    cells: &'a mut [Value],
}

impl<'a> RowViewMut<'a> {
    pub(crate) const fn new(columns: &'a [Column], cells: &'a mut [Value]) -> Self {
        Self { columns, cells }
    }

    #[must_use]
    pub const fn cells(&self) -> &[Value] {
        self.cells
    }
}

impl Fields for RowViewMut<'_> {
    fn field(&self, name: &str) -> Option<&Value> {
        column_position(self.columns, name).map(|idx| &self.cells[idx])
    }
}

impl FieldsMut for RowViewMut<'_> {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), SheetError> {
        let idx = column_position(self.columns, name).ok_or_else(|| SheetError::UnknownColumn {
            name: name.to_string(),
        })?;
        self.cells[idx] = value.cast(self.columns[idx].value_type);

        Ok(())
    }
}

impl DataSheet {
    /// Read-only view of row `index`.
    #[must_use]
    pub fn row_view(&self, index: usize) -> Option<RowView<'_>> {
        self.rows
            .get(index)
            .map(|cells| RowView::new(&self.columns, cells))
    }

    /// Mutable view of row `index`.
    pub fn row_view_mut(&mut self, index: usize) -> Option<RowViewMut<'_>> {
        let Self { columns, rows } = self;
        let columns: &[Column] = columns;
        rows.get_mut(index)
            .map(|cells| RowViewMut::new(columns, cells))
    }

    /// Iterate all rows as views, in row order.
    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows
            .iter()
            .map(|cells| RowView::new(&self.columns, cells))
    }

    /// Append a row of unknown cells and return a mutable view of it.
    pub fn append_unknown_row(&mut self) -> RowViewMut<'_> {
        let cells = self
            .columns
            .iter()
            .map(|c| Value::unknown(c.value_type))
            .collect();
        self.rows.push(cells);

        let Self { columns, rows } = self;
        let columns: &[Column] = columns;
        let last = rows.len() - 1;
        RowViewMut::new(columns, &mut rows[last])
    }
}
