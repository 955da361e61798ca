//! Vector-backed observable collection.

use parking_lot::RwLock;

use horizon_items_core::Signal;
use horizon_items_core::logging::targets;

use super::change::{CollectionChange, ItemValue, ViewItem};
use super::source::ItemsSource;

/// A list of items that reports every mutation through
/// [`collection_changed`](ItemsSource::collection_changed).
///
/// Single-item mutations emit single-item notifications. `clear` and
/// `set_items` emit `Reset`. [`extend_at`](Self::extend_at) and
/// [`remove_range`](Self::remove_range) emit one multi-item notification,
/// which container generators do not accept incrementally.
///
/// # Example
///
/// ```
/// use horizon_items::collection::{ItemsSource, ObservableCollection};
///
/// let fruits = ObservableCollection::new(vec!["apple", "pear"]);
/// fruits.collection_changed().connect(|change| println!("{change:?}"));
/// fruits.insert(1, "fig");
/// assert_eq!(fruits.to_vec(), vec!["apple", "fig", "pear"]);
/// ```
pub struct ObservableCollection<T> {
    items: RwLock<Vec<T>>,
    collection_changed: Signal<CollectionChange<T>>,
}

impl<T: ItemValue> ObservableCollection<T> {
    /// Creates a collection holding `items`.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            collection_changed: Signal::new(),
        }
    }

    /// Creates an empty collection.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns `true` if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Returns a clone of the item at `index`.
    pub fn item(&self, index: usize) -> Option<T> {
        self.items.read().get(index).cloned()
    }

    /// Returns read-only access to the items.
    ///
    /// Do not mutate the collection while holding the returned guard.
    pub fn items(&self) -> impl std::ops::Deref<Target = Vec<T>> + '_ {
        self.items.read()
    }

    /// Returns a snapshot of the items.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.read().clone()
    }

    /// Appends an item.
    pub fn push(&self, item: T) {
        let index = {
            let mut items = self.items.write();
            items.push(item.clone());
            items.len() - 1
        };
        self.notify(CollectionChange::add(ViewItem::Item(item), index));
    }

    /// Inserts an item at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&self, index: usize, item: T) {
        self.items.write().insert(index, item.clone());
        self.notify(CollectionChange::add(ViewItem::Item(item), index));
    }

    /// Removes and returns the item at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove(&self, index: usize) -> T {
        let removed = self.items.write().remove(index);
        self.notify(CollectionChange::remove(
            ViewItem::Item(removed.clone()),
            index,
        ));
        removed
    }

    /// Replaces the item at `index`, returning the old one.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn set(&self, index: usize, item: T) -> T {
        let old = std::mem::replace(&mut self.items.write()[index], item.clone());
        self.notify(CollectionChange::replace(
            ViewItem::Item(old.clone()),
            ViewItem::Item(item),
            index,
        ));
        old
    }

    /// Moves the item at `old_index` so that it ends up at `new_index`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn move_item(&self, old_index: usize, new_index: usize) {
        let item = {
            let mut items = self.items.write();
            let item = items.remove(old_index);
            items.insert(new_index, item.clone());
            item
        };
        if old_index != new_index {
            self.notify(CollectionChange::move_item(
                ViewItem::Item(item),
                old_index,
                new_index,
            ));
        }
    }

    /// Inserts several items at `index` with a single notification.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn extend_at(&self, index: usize, new_items: Vec<T>) {
        if new_items.is_empty() {
            return;
        }
        {
            let mut items = self.items.write();
            let tail = items.split_off(index);
            items.extend(new_items.iter().cloned());
            items.extend(tail);
        }
        self.notify(CollectionChange::Add {
            items: new_items.into_iter().map(ViewItem::Item).collect(),
            index,
        });
    }

    /// Removes `count` items starting at `index` with a single notification.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn remove_range(&self, index: usize, count: usize) -> Vec<T> {
        if count == 0 {
            return Vec::new();
        }
        let removed: Vec<T> = self.items.write().drain(index..index + count).collect();
        self.notify(CollectionChange::Remove {
            items: removed.iter().cloned().map(ViewItem::Item).collect(),
            index,
        });
        removed
    }

    /// Removes all items.
    pub fn clear(&self) {
        self.items.write().clear();
        self.notify(CollectionChange::Reset);
    }

    /// Replaces all items.
    pub fn set_items(&self, items: Vec<T>) {
        *self.items.write() = items;
        self.notify(CollectionChange::Reset);
    }

    fn notify(&self, change: CollectionChange<T>) {
        tracing::trace!(target: targets::COLLECTION, ?change, "collection changed");
        self.collection_changed.emit(change);
    }
}

impl<T: ItemValue> Default for ObservableCollection<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ItemValue> ItemsSource<T> for ObservableCollection<T> {
    fn len(&self) -> usize {
        ObservableCollection::len(self)
    }

    fn get(&self, index: usize) -> Option<ViewItem<T>> {
        self.item(index).map(ViewItem::Item)
    }

    fn collection_changed(&self) -> &Signal<CollectionChange<T>> {
        &self.collection_changed
    }

    fn index_of(&self, item: &ViewItem<T>) -> Option<usize> {
        let ViewItem::Item(item) = item else {
            return None;
        };
        self.items.read().iter().position(|candidate| candidate == item)
    }
}

impl<T: ItemValue> std::fmt::Debug for ObservableCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableCollection")
            .field("items", &*self.items.read())
            .finish()
    }
}

static_assertions::assert_impl_all!(ObservableCollection<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recorder(collection: &ObservableCollection<i32>) -> Arc<Mutex<Vec<CollectionChange<i32>>>> {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let changes_clone = changes.clone();
        collection.collection_changed().connect(move |change| {
            changes_clone.lock().push(change.clone());
        });
        changes
    }

    #[test]
    fn test_single_item_notifications() {
        let collection = ObservableCollection::new(vec![1, 2, 3]);
        let changes = recorder(&collection);

        collection.push(4);
        collection.insert(0, 0);
        assert_eq!(collection.remove(2), 2);
        assert_eq!(collection.set(0, 10), 0);

        assert_eq!(collection.to_vec(), vec![10, 1, 3, 4]);
        assert_eq!(
            *changes.lock(),
            vec![
                CollectionChange::add(ViewItem::Item(4), 3),
                CollectionChange::add(ViewItem::Item(0), 0),
                CollectionChange::remove(ViewItem::Item(2), 2),
                CollectionChange::replace(ViewItem::Item(0), ViewItem::Item(10), 0),
            ]
        );
    }

    #[test]
    fn test_move_item() {
        let collection = ObservableCollection::new(vec![1, 2, 3, 4]);
        let changes = recorder(&collection);

        collection.move_item(0, 2);
        collection.move_item(1, 1);

        assert_eq!(collection.to_vec(), vec![2, 3, 1, 4]);
        assert_eq!(
            *changes.lock(),
            vec![CollectionChange::move_item(ViewItem::Item(1), 0, 2)]
        );
    }

    #[test]
    fn test_range_operations_emit_once() {
        let collection = ObservableCollection::new(vec![1, 5]);
        let changes = recorder(&collection);

        collection.extend_at(1, vec![2, 3, 4]);
        assert_eq!(collection.to_vec(), vec![1, 2, 3, 4, 5]);
        assert_eq!(collection.remove_range(0, 2), vec![1, 2]);
        collection.clear();

        let changes = changes.lock();
        assert_eq!(changes.len(), 3);
        assert!(changes[0].is_range());
        assert!(changes[1].is_range());
        assert_eq!(changes[2], CollectionChange::Reset);
    }

    #[test]
    fn test_slot_can_read_collection() {
        let collection = Arc::new(ObservableCollection::new(vec![1]));
        let seen = Arc::new(Mutex::new(0));
        let weak = Arc::downgrade(&collection);
        let seen_clone = seen.clone();
        collection.collection_changed().connect(move |_| {
            if let Some(collection) = weak.upgrade() {
                *seen_clone.lock() = collection.len();
            }
        });
        collection.push(2);
        assert_eq!(*seen.lock(), 2);
    }

    #[test]
    fn test_index_of() {
        let collection = ObservableCollection::new(vec![3, 4, 5]);
        assert_eq!(collection.index_of(&ViewItem::Item(5)), Some(2));
        assert_eq!(collection.index_of(&ViewItem::Item(9)), None);
    }
}
