//! The ordered column collection of a data grid.

use std::sync::Arc;

use horizon_items_core::logging::targets;

use super::column::{DataGridColumn, DataGridSettings};
use super::error::{DataGridError, Result};

/// The columns of a data grid.
///
/// Columns keep their collection order; their display order is tracked
/// separately through display indices, which always form a permutation of
/// `0..len`. Reordering one column shifts the ones between its old and new
/// display index, as dragging a header would.
///
/// # Example
///
/// ```
/// use horizon_items::data_grid::{DataGridColumn, DataGridColumns};
///
/// let mut columns = DataGridColumns::new();
/// columns.push(DataGridColumn::new("Id"));
/// columns.push(DataGridColumn::new("Name"));
/// columns.push(DataGridColumn::new("Age"));
///
/// columns.set_display_index(2, 0).unwrap();
/// let headers: Vec<String> = columns.in_display_order().iter().map(|c| c.header()).collect();
/// assert_eq!(headers, ["Age", "Id", "Name"]);
/// ```
#[derive(Debug, Default)]
pub struct DataGridColumns {
    columns: Vec<Arc<DataGridColumn>>,
    settings: DataGridSettings,
}

impl DataGridColumns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(mut self, settings: DataGridSettings) -> Self {
        self.set_settings(settings);
        self
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column at collection `index`.
    pub fn get(&self, index: usize) -> Option<&Arc<DataGridColumn>> {
        self.columns.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DataGridColumn>> {
        self.columns.iter()
    }

    /// Collection index of `column`.
    pub fn index_of(&self, column: &Arc<DataGridColumn>) -> Option<usize> {
        self.columns.iter().position(|candidate| Arc::ptr_eq(candidate, column))
    }

    // =========================================================================
    // Membership
    // =========================================================================

    /// Appends `column` at the end of both collection and display order.
    pub fn push(&mut self, column: DataGridColumn) -> Arc<DataGridColumn> {
        let column = Arc::new(column);
        column.apply_settings(self.settings.clone());
        column.set_display_index(Some(self.columns.len()));
        self.columns.push(column.clone());
        self.refresh_frozen();
        column
    }

    /// Inserts `column` at collection `index`, also at display index `index`.
    ///
    /// Columns displayed at or after `index` move one place right.
    ///
    /// # Errors
    ///
    /// [`DataGridError::ColumnOutOfRange`] if `index > len`.
    pub fn insert(&mut self, index: usize, column: DataGridColumn) -> Result<Arc<DataGridColumn>> {
        if index > self.columns.len() {
            return Err(DataGridError::ColumnOutOfRange {
                index,
                count: self.columns.len(),
            });
        }
        for existing in &self.columns {
            if let Some(display) = existing.display_index().filter(|&display| display >= index) {
                existing.set_display_index(Some(display + 1));
            }
        }
        let column = Arc::new(column);
        column.apply_settings(self.settings.clone());
        column.set_display_index(Some(index));
        self.columns.insert(index, column.clone());
        self.refresh_frozen();
        Ok(column)
    }

    /// Removes the column at collection `index`.
    ///
    /// Columns displayed after it move one place left. The removed column
    /// goes back to the default settings and loses its display index.
    pub fn remove(&mut self, index: usize) -> Result<Arc<DataGridColumn>> {
        if index >= self.columns.len() {
            return Err(DataGridError::ColumnOutOfRange {
                index,
                count: self.columns.len(),
            });
        }
        let column = self.columns.remove(index);
        if let Some(removed) = column.display_index() {
            for existing in &self.columns {
                if let Some(display) = existing.display_index().filter(|&display| display > removed) {
                    existing.set_display_index(Some(display - 1));
                }
            }
        }
        column.set_display_index(None);
        column.set_frozen(false);
        column.apply_settings(DataGridSettings::default());
        self.refresh_frozen();
        Ok(column)
    }

    // =========================================================================
    // Display Order
    // =========================================================================

    /// Moves the column at collection `column_index` to `display_index`.
    ///
    /// # Errors
    ///
    /// - [`DataGridError::ColumnOutOfRange`] for an unknown column
    /// - [`DataGridError::DisplayIndexOutOfRange`] if `display_index >= len`
    pub fn set_display_index(&mut self, column_index: usize, display_index: usize) -> Result<()> {
        let count = self.columns.len();
        let column = self
            .columns
            .get(column_index)
            .cloned()
            .ok_or(DataGridError::ColumnOutOfRange {
                index: column_index,
                count,
            })?;
        if display_index >= count {
            tracing::warn!(
                target: targets::DATA_GRID,
                display_index,
                count,
                "display index out of range"
            );
            return Err(DataGridError::DisplayIndexOutOfRange {
                index: display_index,
                count,
            });
        }
        let Some(old) = column.display_index() else {
            return Ok(());
        };
        if old == display_index {
            return Ok(());
        }

        for other in &self.columns {
            if Arc::ptr_eq(other, &column) {
                continue;
            }
            let Some(current) = other.display_index() else {
                continue;
            };
            let shifted = if display_index < old && (display_index..old).contains(&current) {
                current + 1
            } else if display_index > old && (old + 1..=display_index).contains(&current) {
                current - 1
            } else {
                continue;
            };
            other.set_display_index(Some(shifted));
        }
        column.set_display_index(Some(display_index));
        tracing::debug!(
            target: targets::DATA_GRID,
            header = %column.header(),
            from = old,
            to = display_index,
            "column moved"
        );
        self.refresh_frozen();
        Ok(())
    }

    /// The column shown at `display_index`.
    pub fn column_at_display_index(&self, display_index: usize) -> Option<&Arc<DataGridColumn>> {
        self.columns
            .iter()
            .find(|column| column.display_index() == Some(display_index))
    }

    /// Columns sorted by display index.
    pub fn in_display_order(&self) -> Vec<Arc<DataGridColumn>> {
        let mut ordered = self.columns.clone();
        ordered.sort_by_key(|column| column.display_index());
        ordered
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn settings(&self) -> &DataGridSettings {
        &self.settings
    }

    /// Replaces the grid settings and re-coerces every column.
    pub fn set_settings(&mut self, settings: DataGridSettings) {
        if self.settings == settings {
            return;
        }
        self.settings = settings;
        for column in &self.columns {
            column.apply_settings(self.settings.clone());
        }
        self.refresh_frozen();
    }

    fn refresh_frozen(&self) {
        let frozen_count = self.settings.frozen_column_count;
        for column in &self.columns {
            let frozen = column.display_index().is_some_and(|display| display < frozen_count);
            column.set_frozen(frozen);
        }
    }
}
