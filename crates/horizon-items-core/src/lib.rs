//! Core systems for Horizon Items.
//!
//! This crate provides the foundational components shared by the items layer:
//!
//! - **Signal/Slot System**: Type-safe, reentrancy-tolerant notification
//! - **Property System**: Reactive properties with change detection and coercion
//! - **Logging**: Tracing targets, span names and performance spans
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_items_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```
//!
//! # Property Example
//!
//! ```
//! use horizon_items_core::{Property, Signal};
//!
//! struct Counter {
//!     value: Property<i32>,
//!     value_changed: Signal<i32>,
//! }
//!
//! impl Counter {
//!     fn increment(&self) {
//!         let new_value = self.value.get() + 1;
//!         if self.value.set(new_value) {
//!             self.value_changed.emit(new_value);
//!         }
//!     }
//! }
//! ```

pub mod logging;
pub mod property;
pub mod signal;

pub use logging::PerfSpan;
pub use property::Property;
pub use signal::{ConnectionId, Signal};
