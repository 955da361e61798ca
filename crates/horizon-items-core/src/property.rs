//! Property system for Horizon Items.
//!
//! Properties are the data backbone of the signal/slot system: a control
//! stores its configurable state in [`Property<T>`] values and emits a
//! signal when `set()` reports a change.
//!
//! # Example
//!
//! ```
//! use horizon_items_core::{Property, Signal};
//!
//! struct Column {
//!     width: Property<f32>,
//!     width_changed: Signal<f32>,
//! }
//!
//! impl Column {
//!     fn set_width(&self, width: f32) {
//!         // Coerce into [20, 400] before storing.
//!         if self.width.set(width.clamp(20.0, 400.0)) {
//!             self.width_changed.emit(self.width.get());
//!         }
//!     }
//! }
//!
//! let column = Column { width: Property::new(100.0), width_changed: Signal::new() };
//! column.set_width(1000.0);
//! assert_eq!(column.width.get(), 400.0);
//! ```

use std::fmt;

use parking_lot::RwLock;

/// A reactive property that tracks changes.
///
/// `Property<T>` wraps a value and provides change detection. When `set()` is
/// called, it compares the new value with the current one and returns whether
/// the value actually changed.
///
/// # Thread Safety
///
/// `Property<T>` uses interior mutability with `RwLock` and is `Send + Sync`
/// when `T` is.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get the current value.
    ///
    /// This clones the value. For large types, consider using `with()` instead.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if the value changed.
    ///
    /// The caller should emit the associated notification signal when this
    /// returns `true`.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }
}

impl<T: Clone> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}

static_assertions::assert_impl_all!(Property<usize>: Send, Sync);
