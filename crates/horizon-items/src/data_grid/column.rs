//! A single data grid column.

use horizon_items_core::logging::targets;
use horizon_items_core::{Property, Signal};

use super::error::Result;
use super::length::DataGridLength;

const DEFAULT_MIN_COLUMN_WIDTH: f32 = 20.0;

/// Sort direction shown by a column header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Grid-level defaults and permissions applied to every column.
#[derive(Debug, Clone, PartialEq)]
pub struct DataGridSettings {
    /// Width of columns without a width of their own.
    pub column_width: DataGridLength,
    pub min_column_width: f32,
    pub max_column_width: f32,
    pub can_user_sort_columns: bool,
    pub can_user_resize_columns: bool,
    pub can_user_reorder_columns: bool,
    pub is_read_only: bool,
    /// Number of leading columns, in display order, that do not scroll.
    pub frozen_column_count: usize,
}

impl DataGridSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column_width(mut self, width: DataGridLength) -> Self {
        self.column_width = width;
        self
    }

    pub fn with_min_column_width(mut self, width: f32) -> Self {
        self.min_column_width = width;
        self
    }

    pub fn with_max_column_width(mut self, width: f32) -> Self {
        self.max_column_width = width;
        self
    }

    pub fn with_can_user_sort_columns(mut self, can_sort: bool) -> Self {
        self.can_user_sort_columns = can_sort;
        self
    }

    pub fn with_can_user_resize_columns(mut self, can_resize: bool) -> Self {
        self.can_user_resize_columns = can_resize;
        self
    }

    pub fn with_can_user_reorder_columns(mut self, can_reorder: bool) -> Self {
        self.can_user_reorder_columns = can_reorder;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.is_read_only = read_only;
        self
    }

    pub fn with_frozen_column_count(mut self, count: usize) -> Self {
        self.frozen_column_count = count;
        self
    }
}

impl Default for DataGridSettings {
    fn default() -> Self {
        Self {
            column_width: DataGridLength::size_to_header(),
            min_column_width: DEFAULT_MIN_COLUMN_WIDTH,
            max_column_width: f32::INFINITY,
            can_user_sort_columns: true,
            can_user_resize_columns: true,
            can_user_reorder_columns: true,
            is_read_only: false,
            frozen_column_count: 0,
        }
    }
}

/// Describes one column of a data grid.
///
/// Width, minimum and maximum width and the user permissions have a local
/// value that falls back to the owning grid's [`DataGridSettings`]. A column
/// that is not part of a [`DataGridColumns`](super::DataGridColumns)
/// collection uses the default settings.
///
/// # Signals
///
/// - `width_changed(f32)`: Emitted when the actual width changes
/// - `display_index_changed(Option<usize>)`: Emitted when the display index changes
/// - `sort_direction_changed(Option<SortDirection>)`: Emitted when the sort direction changes
/// - `visibility_changed(bool)`: Emitted when the column is shown or hidden
///
/// # Example
///
/// ```
/// use horizon_items::data_grid::{DataGridColumn, DataGridLength};
///
/// let column = DataGridColumn::new("Name")
///     .with_width(DataGridLength::pixel(500.0))
///     .with_max_width(Some(300.0));
/// assert_eq!(column.actual_width(), 300.0);
/// ```
pub struct DataGridColumn {
    header: Property<String>,
    width: Property<Option<DataGridLength>>,
    min_width: Property<Option<f32>>,
    max_width: Property<Option<f32>>,
    desired_width: Property<Option<f32>>,
    /// Effective width with its display value filled in.
    coerced_width: Property<DataGridLength>,
    actual_width: Property<f32>,
    display_index: Property<Option<usize>>,
    is_visible: Property<bool>,
    sort_direction: Property<Option<SortDirection>>,
    sort_member_path: Property<Option<String>>,
    is_read_only: Property<bool>,
    can_user_sort: Property<Option<bool>>,
    can_user_resize: Property<Option<bool>>,
    can_user_reorder: Property<Option<bool>>,
    is_frozen: Property<bool>,
    settings: Property<DataGridSettings>,

    /// Emitted when the actual width changes.
    pub width_changed: Signal<f32>,

    /// Emitted when the display index changes.
    pub display_index_changed: Signal<Option<usize>>,

    /// Emitted when the sort direction changes.
    pub sort_direction_changed: Signal<Option<SortDirection>>,

    /// Emitted when the column is shown or hidden.
    pub visibility_changed: Signal<bool>,
}

impl DataGridColumn {
    /// Creates a column with the given header.
    pub fn new(header: impl Into<String>) -> Self {
        let settings = DataGridSettings::default();
        let column = Self {
            header: Property::new(header.into()),
            width: Property::new(None),
            min_width: Property::new(None),
            max_width: Property::new(None),
            desired_width: Property::new(None),
            coerced_width: Property::new(settings.column_width),
            actual_width: Property::new(0.0),
            display_index: Property::new(None),
            is_visible: Property::new(true),
            sort_direction: Property::new(None),
            sort_member_path: Property::new(None),
            is_read_only: Property::new(false),
            can_user_sort: Property::new(None),
            can_user_resize: Property::new(None),
            can_user_reorder: Property::new(None),
            is_frozen: Property::new(false),
            settings: Property::new(settings),
            width_changed: Signal::new(),
            display_index_changed: Signal::new(),
            sort_direction_changed: Signal::new(),
            visibility_changed: Signal::new(),
        };
        column.coerce_width();
        column
    }

    // =========================================================================
    // Builder Pattern Methods
    // =========================================================================

    /// Set the width. Invalid widths are ignored.
    pub fn with_width(self, width: DataGridLength) -> Self {
        if let Err(err) = self.set_width(width) {
            tracing::warn!(target: targets::DATA_GRID, %err, "ignoring column width");
        }
        self
    }

    /// Set the minimum width. Invalid widths are ignored.
    pub fn with_min_width(self, width: Option<f32>) -> Self {
        if let Err(err) = self.set_min_width(width) {
            tracing::warn!(target: targets::DATA_GRID, %err, "ignoring minimum column width");
        }
        self
    }

    /// Set the maximum width. Invalid widths are ignored.
    pub fn with_max_width(self, width: Option<f32>) -> Self {
        if let Err(err) = self.set_max_width(width) {
            tracing::warn!(target: targets::DATA_GRID, %err, "ignoring maximum column width");
        }
        self
    }

    pub fn with_sort_member_path(self, path: impl Into<String>) -> Self {
        self.set_sort_member_path(Some(path.into()));
        self
    }

    pub fn with_read_only(self, read_only: bool) -> Self {
        self.set_read_only(read_only);
        self
    }

    pub fn with_can_user_sort(self, can_sort: bool) -> Self {
        self.set_can_user_sort(Some(can_sort));
        self
    }

    pub fn with_can_user_resize(self, can_resize: bool) -> Self {
        self.set_can_user_resize(Some(can_resize));
        self
    }

    pub fn with_can_user_reorder(self, can_reorder: bool) -> Self {
        self.set_can_user_reorder(Some(can_reorder));
        self
    }

    pub fn with_visible(self, visible: bool) -> Self {
        self.set_visible(visible);
        self
    }

    // =========================================================================
    // Header
    // =========================================================================

    pub fn header(&self) -> String {
        self.header.get()
    }

    pub fn set_header(&self, header: impl Into<String>) {
        self.header.set(header.into());
    }

    // =========================================================================
    // Width
    // =========================================================================

    /// The effective width: the column's own width or the grid default, with
    /// its display value coerced into `[min_width, max_width]`.
    pub fn width(&self) -> DataGridLength {
        self.coerced_width.get()
    }

    /// The width set on the column itself.
    pub fn local_width(&self) -> Option<DataGridLength> {
        self.width.get()
    }

    /// Set the column's own width.
    ///
    /// # Errors
    ///
    /// [`DataGridError::InvalidWidth`](super::DataGridError::InvalidWidth)
    /// for negative or non-finite pixel widths and non-positive star weights.
    pub fn set_width(&self, width: DataGridLength) -> Result<()> {
        width.validate()?;
        if self.width.set(Some(width)) {
            self.coerce_width();
        }
        Ok(())
    }

    /// Fall back to the grid's column width.
    pub fn clear_width(&self) {
        if self.width.set(None) {
            self.coerce_width();
        }
    }

    /// Effective minimum width.
    pub fn min_width(&self) -> f32 {
        self.min_width
            .get()
            .unwrap_or_else(|| self.settings.with(|settings| settings.min_column_width))
            .max(0.0)
    }

    /// Set the column's own minimum width, or `None` for the grid's.
    pub fn set_min_width(&self, width: Option<f32>) -> Result<()> {
        validate_bound(width)?;
        if self.min_width.set(width) {
            self.coerce_width();
        }
        Ok(())
    }

    /// Effective maximum width, never below the minimum.
    pub fn max_width(&self) -> f32 {
        self.max_width
            .get()
            .unwrap_or_else(|| self.settings.with(|settings| settings.max_column_width))
            .max(self.min_width())
    }

    /// Set the column's own maximum width, or `None` for the grid's.
    pub fn set_max_width(&self, width: Option<f32>) -> Result<()> {
        validate_bound(width)?;
        if self.max_width.set(width) {
            self.coerce_width();
        }
        Ok(())
    }

    /// The width the column is shown at.
    pub fn actual_width(&self) -> f32 {
        self.actual_width.get()
    }

    /// Reports the width measured for the column's content.
    ///
    /// Content-sized columns only grow: a smaller measurement than the one
    /// already recorded is ignored until [`reset_desired_width`](Self::reset_desired_width).
    pub fn update_desired_width(&self, desired: f32) {
        if !desired.is_finite() || desired < 0.0 {
            return;
        }
        let grown = self.desired_width.get().map_or(desired, |current| current.max(desired));
        if self.desired_width.set(Some(grown)) {
            self.coerce_width();
        }
    }

    /// Forgets the measured content width.
    pub fn reset_desired_width(&self) {
        if self.desired_width.set(None) {
            self.coerce_width();
        }
    }

    fn coerce_width(&self) {
        let settings = self.settings.get();
        let min = self.min_width();
        let max = self.max_width();
        let width = self.width.get().unwrap_or(settings.column_width);
        let desired = width.desired_value().or(self.desired_width.get());
        let width_px = if width.is_absolute() {
            width.value()
        } else {
            width.display_value().or(desired).unwrap_or(min)
        }
        .clamp(min, max);

        self.coerced_width.set(
            width
                .with_desired_value(desired)
                .with_display_value(Some(width_px)),
        );
        if self.actual_width.set(width_px) {
            tracing::trace!(target: targets::DATA_GRID, header = %self.header.get(), width = width_px, "column width changed");
            self.width_changed.emit(width_px);
        }
    }

    // =========================================================================
    // Display Index and Visibility
    // =========================================================================

    /// Position in display order; `None` until added to a collection.
    pub fn display_index(&self) -> Option<usize> {
        self.display_index.get()
    }

    pub(crate) fn set_display_index(&self, index: Option<usize>) {
        if self.display_index.set(index) {
            self.display_index_changed.emit(index);
        }
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible.get()
    }

    pub fn set_visible(&self, visible: bool) {
        if self.is_visible.set(visible) {
            self.visibility_changed.emit(visible);
        }
    }

    /// Whether the column stays in place while the grid scrolls horizontally.
    pub fn is_frozen(&self) -> bool {
        self.is_frozen.get()
    }

    pub(crate) fn set_frozen(&self, frozen: bool) {
        self.is_frozen.set(frozen);
    }

    // =========================================================================
    // Sorting
    // =========================================================================

    pub fn sort_direction(&self) -> Option<SortDirection> {
        self.sort_direction.get()
    }

    pub fn set_sort_direction(&self, direction: Option<SortDirection>) {
        if self.sort_direction.set(direction) {
            self.sort_direction_changed.emit(direction);
        }
    }

    /// Property path the column sorts by.
    pub fn sort_member_path(&self) -> Option<String> {
        self.sort_member_path.get()
    }

    pub fn set_sort_member_path(&self, path: Option<String>) {
        self.sort_member_path.set(path);
    }

    // =========================================================================
    // Permissions
    // =========================================================================

    /// Read-only when either the column or the grid is.
    pub fn is_read_only(&self) -> bool {
        self.is_read_only.get() || self.settings.with(|settings| settings.is_read_only)
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.is_read_only.set(read_only);
    }

    /// The column's own setting, unless the grid forbids sorting.
    pub fn can_user_sort(&self) -> bool {
        self.settings.with(|settings| settings.can_user_sort_columns)
            && self.can_user_sort.get().unwrap_or(true)
    }

    pub fn set_can_user_sort(&self, can_sort: Option<bool>) {
        self.can_user_sort.set(can_sort);
    }

    /// The column's own setting, unless the grid forbids resizing.
    pub fn can_user_resize(&self) -> bool {
        self.settings.with(|settings| settings.can_user_resize_columns)
            && self.can_user_resize.get().unwrap_or(true)
    }

    pub fn set_can_user_resize(&self, can_resize: Option<bool>) {
        self.can_user_resize.set(can_resize);
    }

    /// The column's own setting, unless the grid forbids reordering.
    pub fn can_user_reorder(&self) -> bool {
        self.settings.with(|settings| settings.can_user_reorder_columns)
            && self.can_user_reorder.get().unwrap_or(true)
    }

    pub fn set_can_user_reorder(&self, can_reorder: Option<bool>) {
        self.can_user_reorder.set(can_reorder);
    }

    // =========================================================================
    // Owning Grid
    // =========================================================================

    /// The grid settings this column falls back to.
    pub fn settings(&self) -> DataGridSettings {
        self.settings.get()
    }

    /// Adopts new grid settings and re-coerces the width.
    pub(crate) fn apply_settings(&self, settings: DataGridSettings) {
        self.settings.set(settings);
        self.coerce_width();
    }
}

impl std::fmt::Debug for DataGridColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataGridColumn")
            .field("header", &self.header.get())
            .field("width", &self.width())
            .field("actual_width", &self.actual_width())
            .field("display_index", &self.display_index())
            .field("is_visible", &self.is_visible())
            .field("sort_direction", &self.sort_direction())
            .finish_non_exhaustive()
    }
}

fn validate_bound(width: Option<f32>) -> Result<()> {
    match width {
        Some(value) if value.is_nan() || value < 0.0 => Err(super::DataGridError::InvalidWidth { value }),
        _ => Ok(()),
    }
}

static_assertions::assert_impl_all!(DataGridColumn: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::data_grid::DataGridError;

    #[test]
    fn test_defaults_follow_settings() {
        let column = DataGridColumn::new("Name");
        assert_eq!(column.header(), "Name");
        assert_eq!(column.local_width(), None);
        assert!(column.width().same_length(&DataGridLength::size_to_header()));
        assert_eq!(column.min_width(), DEFAULT_MIN_COLUMN_WIDTH);
        assert_eq!(column.max_width(), f32::INFINITY);
        // Nothing measured yet: the minimum width.
        assert_eq!(column.actual_width(), DEFAULT_MIN_COLUMN_WIDTH);
        assert!(column.can_user_sort());
        assert!(!column.is_read_only());
        assert_eq!(column.display_index(), None);
    }

    #[test]
    fn test_pixel_width_is_clamped() {
        let column = DataGridColumn::new("Age").with_width(DataGridLength::pixel(5.0));
        assert_eq!(column.actual_width(), DEFAULT_MIN_COLUMN_WIDTH);
        assert_eq!(column.width().display_value(), Some(DEFAULT_MIN_COLUMN_WIDTH));

        column.set_max_width(Some(50.0)).unwrap();
        column.set_width(DataGridLength::pixel(80.0)).unwrap();
        assert_eq!(column.actual_width(), 50.0);

        // A maximum below the minimum yields to it.
        column.set_min_width(Some(60.0)).unwrap();
        assert_eq!(column.max_width(), 60.0);
        assert_eq!(column.actual_width(), 60.0);
    }

    #[test]
    fn test_invalid_widths_rejected() {
        let column = DataGridColumn::new("Age");
        assert_eq!(
            column.set_width(DataGridLength::pixel(-1.0)),
            Err(DataGridError::InvalidWidth { value: -1.0 })
        );
        assert!(column.set_width(DataGridLength::star(0.0)).is_err());
        assert!(column.set_min_width(Some(f32::NAN)).is_err());
        assert_eq!(column.local_width(), None);
    }

    #[test]
    fn test_content_sized_width_grows() {
        let column = DataGridColumn::new("Notes").with_width(DataGridLength::size_to_cells());
        column.update_desired_width(70.0);
        assert_eq!(column.actual_width(), 70.0);
        assert_eq!(column.width().desired_value(), Some(70.0));

        column.update_desired_width(40.0);
        assert_eq!(column.actual_width(), 70.0);

        column.reset_desired_width();
        column.update_desired_width(40.0);
        assert_eq!(column.actual_width(), 40.0);
    }

    #[test]
    fn test_width_changed_signal() {
        let column = DataGridColumn::new("Name");
        let widths = Arc::new(Mutex::new(Vec::new()));
        let widths_clone = widths.clone();
        column.width_changed.connect(move |&width| {
            widths_clone.lock().unwrap().push(width);
        });

        column.set_width(DataGridLength::pixel(100.0)).unwrap();
        column.set_width(DataGridLength::pixel(100.0)).unwrap();
        column.set_width(DataGridLength::pixel(120.0)).unwrap();
        assert_eq!(*widths.lock().unwrap(), vec![100.0, 120.0]);
    }

    #[test]
    fn test_sort_and_visibility_signals() {
        let column = DataGridColumn::new("Name").with_sort_member_path("name");
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();
        column.sort_direction_changed.connect(move |&direction| {
            events_clone.lock().unwrap().push(format!("sort {direction:?}"));
        });
        let events_clone = events.clone();
        column.visibility_changed.connect(move |&visible| {
            events_clone.lock().unwrap().push(format!("visible {visible}"));
        });

        column.set_sort_direction(Some(SortDirection::Ascending));
        column.set_sort_direction(Some(SortDirection::Ascending));
        column.set_visible(false);
        column.set_sort_direction(None);
        assert_eq!(
            *events.lock().unwrap(),
            vec!["sort Some(Ascending)", "visible false", "sort None"]
        );
        assert_eq!(column.sort_member_path().as_deref(), Some("name"));
    }

    #[test]
    fn test_permissions_coerced_with_settings() {
        let column = DataGridColumn::new("Id")
            .with_can_user_sort(true)
            .with_can_user_resize(false);
        assert!(column.can_user_sort());
        assert!(!column.can_user_resize());
        assert!(column.can_user_reorder());

        column.apply_settings(
            DataGridSettings::new()
                .with_can_user_sort_columns(false)
                .with_read_only(true),
        );
        assert!(!column.can_user_sort());
        assert!(column.is_read_only());
        assert!(column.can_user_reorder());
    }
}
