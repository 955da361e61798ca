//! Error types for data grid columns.

/// Result type alias for data grid operations.
pub type Result<T> = std::result::Result<T, DataGridError>;

/// Errors raised when configuring data grid columns.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataGridError {
    /// A display index past the last column.
    #[error("display index {index} is out of range for {count} columns")]
    DisplayIndexOutOfRange { index: usize, count: usize },

    /// A column index past the end of the collection.
    #[error("column index {index} is out of range for {count} columns")]
    ColumnOutOfRange { index: usize, count: usize },

    /// A width that is negative or not a number.
    #[error("invalid column width {value}")]
    InvalidWidth { value: f32 },

    /// Text that does not parse as a column length.
    #[error("cannot parse '{0}' as a column length")]
    InvalidLength(String),
}
