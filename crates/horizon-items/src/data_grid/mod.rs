//! Data grid column descriptors.
//!
//! A [`DataGridColumn`] carries the per-column state a data grid needs
//! besides its cells: header, width and its coercion into the column's
//! bounds, display order, sorting, visibility and what the user may do with
//! it. Columns live in a [`DataGridColumns`] collection, which keeps display
//! indices consistent and applies the grid-wide [`DataGridSettings`].
//!
//! Star widths are carried but not distributed; laying out star columns is
//! left to the grid's layout pass.

mod column;
mod columns;
mod error;
mod length;

pub use column::{DataGridColumn, DataGridSettings, SortDirection};
pub use columns::DataGridColumns;
pub use error::{DataGridError, Result};
pub use length::{DataGridLength, DataGridLengthUnit};
