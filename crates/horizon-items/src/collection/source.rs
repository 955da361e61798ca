//! The items source trait consumed by container generators.

use horizon_items_core::Signal;

use super::change::{CollectionChange, ItemValue, ViewItem};

/// A read-only, observable, indexable sequence of items.
///
/// Container generators bind to an `ItemsSource` and keep their block chain
/// in sync with it by listening to [`collection_changed`](Self::collection_changed).
/// Implementations must emit exactly one notification per structural change,
/// after the change is visible through [`len`](Self::len) and [`get`](Self::get),
/// and must not hold internal locks while emitting.
pub trait ItemsSource<T: ItemValue>: Send + Sync {
    /// Number of items.
    fn len(&self) -> usize;

    /// Returns `true` when there are no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at `index`, or `None` when out of range.
    fn get(&self, index: usize) -> Option<ViewItem<T>>;

    /// Signal raised after every change to the sequence.
    fn collection_changed(&self) -> &Signal<CollectionChange<T>>;

    /// Index of the first entry equal to `item`.
    fn index_of(&self, item: &ViewItem<T>) -> Option<usize> {
        (0..self.len()).find(|&index| self.get(index).as_ref() == Some(item))
    }

    /// Whether the entries of this source are groups.
    fn is_grouped(&self) -> bool {
        false
    }

    /// Name reported in inconsistency diagnostics.
    fn source_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
