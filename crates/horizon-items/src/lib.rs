//! Horizon Items - virtualizing item controls for Horizon.
//!
//! This crate holds the headless control layer behind list-like widgets:
//!
//! - [`collection`]: observable item sources and grouped views
//! - [`generator`]: the container generator that realizes containers for
//!   the visible part of a collection and keeps them in step with changes
//! - [`items_control`]: the control hosting a generator
//! - [`scroll_viewer`]: scroll offsets, queued scroll commands and panning
//! - [`data_grid`]: data grid column descriptors
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_items::prelude::*;
//!
//! let items = Arc::new(ObservableCollection::new(vec!["alpha", "beta", "gamma"]));
//! let control = ItemsControl::new(items.clone()).with_alternation_count(2);
//!
//! let generator = control.generator();
//! let mut cursor = generator
//!     .start_at(GeneratorPosition::start(), GeneratorDirection::Forward, false)
//!     .unwrap();
//! let first = cursor.generate_next(false).unwrap().unwrap();
//! drop(cursor);
//!
//! assert_eq!(control.alternation_index(first.container), Some(0));
//! items.insert(0, "zero");
//! assert_eq!(control.index_from_container(first.container), Some(1));
//! ```

pub use horizon_items_core::*;

pub mod collection;
pub mod data_grid;
pub mod generator;
pub mod items_control;
pub mod prelude;
pub mod scroll_viewer;
