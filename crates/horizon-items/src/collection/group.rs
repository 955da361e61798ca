//! Grouped views over an observable collection.
//!
//! A [`GroupedView`] partitions the items of an [`ObservableCollection`] into
//! a tree of [`CollectionGroup`]s, one tree level per [`GroupDescription`].
//! Each group is itself an [`ItemsSource`] whose entries are either subgroups
//! or, at the bottom level, the data items, so every level of the tree can be
//! bound to its own container generator.
//!
//! The tree is maintained incrementally: a source change produces the
//! minimal sequence of single-item group notifications (new groups are
//! appended, emptied groups are pruned unless they were predefined).

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use horizon_items_core::logging::{span_names, targets};
use horizon_items_core::{ConnectionId, PerfSpan, Signal};

use super::change::{CollectionChange, ItemValue, ViewItem};
use super::observable::ObservableCollection;
use super::source::ItemsSource;

/// Key extractor used by a [`GroupDescription`].
pub type GroupKeyFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Describes how to partition items at one grouping level.
pub struct GroupDescription<T> {
    key: GroupKeyFn<T>,
    group_names: Vec<String>,
}

impl<T> GroupDescription<T> {
    /// Groups items by the string returned from `key`.
    pub fn new<F>(key: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            key: Arc::new(key),
            group_names: Vec::new(),
        }
    }

    /// Predefined groups, created up front in this order and kept while empty.
    pub fn with_group_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// The group name for `item`.
    pub fn key_for(&self, item: &T) -> String {
        (self.key)(item)
    }

    /// Predefined group names.
    pub fn group_names(&self) -> &[String] {
        &self.group_names
    }
}

impl<T> Clone for GroupDescription<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            group_names: self.group_names.clone(),
        }
    }
}

impl<T> fmt::Debug for GroupDescription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupDescription")
            .field("group_names", &self.group_names)
            .finish_non_exhaustive()
    }
}

/// A named group of items at one level of a grouped view.
pub struct CollectionGroup<T> {
    name: String,
    level: usize,
    bottom_level: bool,
    persistent: bool,
    items: RwLock<Vec<ViewItem<T>>>,
    collection_changed: Signal<CollectionChange<T>>,
}

impl<T: 'static> CollectionGroup<T> {
    fn create(name: impl Into<String>, level: usize, bottom_level: bool, persistent: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            level,
            bottom_level,
            persistent,
            items: RwLock::new(Vec::new()),
            collection_changed: Signal::new(),
        })
    }

    /// A standalone, empty bottom-level group not attached to any view.
    pub fn detached(name: impl Into<String>) -> Arc<Self> {
        Self::create(name, 1, true, false)
    }
}

impl<T> CollectionGroup<T> {
    /// Group name (the key shared by its items).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Depth in the group tree; the root of a view is level 0.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Whether the entries of this group are data items rather than subgroups.
    pub fn is_bottom_level(&self) -> bool {
        self.bottom_level
    }

    /// Whether this group was predefined and survives becoming empty.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Number of direct entries.
    pub fn item_count(&self) -> usize {
        self.items.read().len()
    }

    /// Number of data items below this group, counted through all subgroups.
    pub fn leaf_count(&self) -> usize {
        let items = self.items.read();
        if self.bottom_level {
            return items.len();
        }
        items
            .iter()
            .map(|entry| entry.as_group().map_or(0, |group| group.leaf_count()))
            .sum()
    }

    fn find_subgroup(&self, name: &str) -> Option<(usize, Arc<CollectionGroup<T>>)> {
        self.items
            .read()
            .iter()
            .enumerate()
            .find_map(|(index, entry)| match entry {
                ViewItem::Group(group) if group.name == name => Some((index, group.clone())),
                _ => None,
            })
    }

    fn position_of_group(&self, group: &Arc<CollectionGroup<T>>) -> Option<usize> {
        self.items.read().iter().position(|entry| {
            entry
                .as_group()
                .is_some_and(|candidate| Arc::ptr_eq(candidate, group))
        })
    }
}

impl<T: ItemValue> CollectionGroup<T> {
    /// Snapshot of the direct entries.
    pub fn entries(&self) -> Vec<ViewItem<T>> {
        self.items.read().clone()
    }

    fn insert_entry(&self, index: usize, entry: ViewItem<T>) {
        self.items.write().insert(index, entry.clone());
        self.collection_changed
            .emit(CollectionChange::add(entry, index));
    }

    fn remove_entry(&self, index: usize) {
        let removed = self.items.write().remove(index);
        self.collection_changed
            .emit(CollectionChange::remove(removed, index));
    }

    fn move_entry(&self, old_index: usize, new_index: usize) {
        let moved = {
            let mut items = self.items.write();
            let entry = items.remove(old_index);
            items.insert(new_index, entry.clone());
            entry
        };
        self.collection_changed
            .emit(CollectionChange::move_item(moved, old_index, new_index));
    }

    fn reset_entries(&self, entries: Vec<ViewItem<T>>) {
        *self.items.write() = entries;
        self.collection_changed.emit(CollectionChange::Reset);
    }
}

impl<T: ItemValue> ItemsSource<T> for CollectionGroup<T> {
    fn len(&self) -> usize {
        self.item_count()
    }

    fn get(&self, index: usize) -> Option<ViewItem<T>> {
        self.items.read().get(index).cloned()
    }

    fn collection_changed(&self) -> &Signal<CollectionChange<T>> {
        &self.collection_changed
    }

    fn is_grouped(&self) -> bool {
        !self.bottom_level
    }

    fn source_name(&self) -> &'static str {
        "CollectionGroup"
    }
}

impl<T> fmt::Debug for CollectionGroup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionGroup")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("bottom_level", &self.bottom_level)
            .field("len", &self.items.read().len())
            .finish()
    }
}

/// A grouped, observable view over an [`ObservableCollection`].
///
/// Bind [`root`](Self::root) to a container generator. With no group
/// descriptions the root is a bottom-level group mirroring the source.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use horizon_items::collection::{GroupDescription, GroupedView, ObservableCollection};
///
/// let words = Arc::new(ObservableCollection::new(vec!["ant", "bee", "asp"]));
/// let view = GroupedView::new(
///     words.clone(),
///     vec![GroupDescription::new(|w: &&str| w[..1].to_string())],
/// );
/// assert_eq!(view.root().item_count(), 2);
/// words.push("cat");
/// assert_eq!(view.root().item_count(), 3);
/// ```
pub struct GroupedView<T: ItemValue> {
    source: Arc<ObservableCollection<T>>,
    descriptions: Vec<GroupDescription<T>>,
    root: Arc<CollectionGroup<T>>,
    connection: Mutex<Option<ConnectionId>>,
}

impl<T: ItemValue> GroupedView<T> {
    /// Builds the group tree and starts tracking `source`.
    pub fn new(
        source: Arc<ObservableCollection<T>>,
        descriptions: Vec<GroupDescription<T>>,
    ) -> Arc<Self> {
        let root = CollectionGroup::create("", 0, descriptions.is_empty(), true);
        let view = Arc::new(Self {
            source,
            descriptions,
            root,
            connection: Mutex::new(None),
        });
        *view.root.items.write() = view.build_entries();

        let weak: Weak<Self> = Arc::downgrade(&view);
        let id = view.source.collection_changed().connect(move |change| {
            if let Some(view) = weak.upgrade() {
                view.on_source_changed(change);
            }
        });
        *view.connection.lock() = Some(id);
        view
    }

    /// The top of the group tree.
    pub fn root(&self) -> &Arc<CollectionGroup<T>> {
        &self.root
    }

    /// The grouped collection.
    pub fn source(&self) -> &Arc<ObservableCollection<T>> {
        &self.source
    }

    /// The grouping levels.
    pub fn descriptions(&self) -> &[GroupDescription<T>] {
        &self.descriptions
    }

    /// Looks up a group by its names from the top level down.
    pub fn find_group(&self, path: &[&str]) -> Option<Arc<CollectionGroup<T>>> {
        let mut group = self.root.clone();
        for name in path {
            group = group.find_subgroup(name)?.1;
        }
        Some(group)
    }

    fn key_path(&self, item: &T) -> Vec<String> {
        self.descriptions
            .iter()
            .map(|description| description.key_for(item))
            .collect()
    }

    fn new_group(&self, name: &str, level: usize, persistent: bool) -> Arc<CollectionGroup<T>> {
        let group = CollectionGroup::create(name, level, level >= self.descriptions.len(), persistent);
        if let Some(description) = self.descriptions.get(level) {
            let predefined = description
                .group_names()
                .iter()
                .map(|name| ViewItem::Group(self.new_group(name, level + 1, true)))
                .collect();
            *group.items.write() = predefined;
        }
        group
    }

    /// Builds the root entries from scratch, without emitting anything.
    fn build_entries(&self) -> Vec<ViewItem<T>> {
        let _span = PerfSpan::new(span_names::REGROUP);
        let scratch = self.new_group("", 0, true);
        let items = self.source.to_vec();
        for item in items {
            let path = self.key_path(&item);
            let mut group = scratch.clone();
            for (depth, name) in path.iter().enumerate() {
                group = match group.find_subgroup(name) {
                    Some((_, existing)) => existing,
                    None => {
                        let created = self.new_group(name, depth + 1, false);
                        group.items.write().push(ViewItem::Group(created.clone()));
                        created
                    }
                };
            }
            group.items.write().push(ViewItem::Item(item));
        }
        scratch.entries()
    }

    /// Number of items in `items` sharing `path`.
    fn count_on_path<'a>(&self, items: impl Iterator<Item = &'a T>, path: &[String]) -> usize {
        items.filter(|item| self.key_path(item) == path).count()
    }

    /// The group chain from the root down to the bottom group for `path`.
    fn chain_for(&self, path: &[String]) -> Option<Vec<Arc<CollectionGroup<T>>>> {
        let mut chain = vec![self.root.clone()];
        for name in path {
            let (_, next) = chain.last()?.find_subgroup(name)?;
            chain.push(next);
        }
        Some(chain)
    }

    fn on_source_changed(&self, change: &CollectionChange<T>) {
        tracing::trace!(target: targets::COLLECTION, ?change, "regrouping");
        match change {
            CollectionChange::Add { items, index } => {
                for (offset, entry) in items.iter().enumerate() {
                    if let Some(item) = entry.as_item() {
                        self.add_item(item, index + offset);
                    }
                }
            }
            CollectionChange::Remove { items, index } => {
                for entry in items {
                    if let Some(item) = entry.as_item() {
                        self.remove_item(item, *index);
                    }
                }
            }
            CollectionChange::Replace {
                old_items,
                new_items,
                index,
            } => {
                for entry in old_items {
                    if let Some(item) = entry.as_item() {
                        self.remove_item(item, *index);
                    }
                }
                for (offset, entry) in new_items.iter().enumerate() {
                    if let Some(item) = entry.as_item() {
                        self.add_item(item, index + offset);
                    }
                }
            }
            CollectionChange::Move {
                items,
                old_index,
                new_index,
            } => match items.as_slice() {
                [ViewItem::Item(item)] => self.move_item(item, *old_index, *new_index),
                _ => self.rebuild(),
            },
            CollectionChange::Reset => self.rebuild(),
        }
    }

    fn add_item(&self, item: &T, index: usize) {
        let path = self.key_path(item);
        let mut group = self.root.clone();
        for (depth, name) in path.iter().enumerate() {
            group = match group.find_subgroup(name) {
                Some((_, existing)) => existing,
                None => {
                    let created = self.new_group(name, depth + 1, false);
                    group.insert_entry(group.item_count(), ViewItem::Group(created.clone()));
                    created
                }
            };
        }
        let position = {
            let items = self.source.items();
            self.count_on_path(items.iter().take(index), &path)
        };
        group.insert_entry(position, ViewItem::Item(item.clone()));
    }

    fn remove_item(&self, item: &T, index: usize) {
        let path = self.key_path(item);
        let Some(chain) = self.chain_for(&path) else {
            tracing::warn!(target: targets::COLLECTION, ?item, "removed item has no group, regrouping");
            self.rebuild();
            return;
        };
        let position = {
            let items = self.source.items();
            self.count_on_path(items.iter().take(index), &path)
        };
        let Some(bottom) = chain.last() else {
            return;
        };
        if position >= bottom.item_count() {
            tracing::warn!(target: targets::COLLECTION, position, "removed item out of group range, regrouping");
            self.rebuild();
            return;
        }
        bottom.remove_entry(position);

        for pair in chain.windows(2).rev() {
            let (parent, group) = (&pair[0], &pair[1]);
            if group.item_count() > 0 || group.persistent {
                break;
            }
            if let Some(position) = parent.position_of_group(group) {
                parent.remove_entry(position);
            }
        }
    }

    fn move_item(&self, item: &T, old_index: usize, new_index: usize) {
        let path = self.key_path(item);
        let Some(group) = self.chain_for(&path).and_then(|chain| chain.last().cloned()) else {
            self.rebuild();
            return;
        };
        let (old_position, new_position) = {
            let items = self.source.items();
            // Rebuild the pre-move order by skipping the moved item.
            let before_old = self.count_on_path(
                items
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != new_index)
                    .map(|(_, item)| item)
                    .take(old_index),
                &path,
            );
            let before_new = self.count_on_path(items.iter().take(new_index), &path);
            (before_old, before_new)
        };
        if old_position != new_position {
            group.move_entry(old_position, new_position);
        }
    }

    fn rebuild(&self) {
        let entries = self.build_entries();
        self.root.reset_entries(entries);
    }
}

impl<T: ItemValue> Drop for GroupedView<T> {
    fn drop(&mut self) {
        if let Some(id) = self.connection.lock().take() {
            self.source.collection_changed().disconnect(id);
        }
    }
}

static_assertions::assert_impl_all!(CollectionGroup<String>: Send, Sync);
static_assertions::assert_impl_all!(GroupedView<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn names(group: &CollectionGroup<&'static str>) -> Vec<String> {
        group
            .entries()
            .iter()
            .map(|entry| match entry {
                ViewItem::Group(group) => format!("[{}]", group.name()),
                ViewItem::Item(item) => item.to_string(),
            })
            .collect()
    }

    fn by_initial() -> GroupDescription<&'static str> {
        GroupDescription::new(|word: &&'static str| word[..1].to_string())
    }

    #[test]
    fn test_initial_grouping() {
        let source = Arc::new(ObservableCollection::new(vec!["ant", "bee", "asp", "bat"]));
        let view = GroupedView::new(source, vec![by_initial()]);

        assert_eq!(names(view.root()), vec!["[a]", "[b]"]);
        let a = view.find_group(&["a"]).unwrap();
        assert!(a.is_bottom_level());
        assert_eq!(names(&a), vec!["ant", "asp"]);
        assert_eq!(view.root().leaf_count(), 4);
        assert!(view.root().is_grouped());
    }

    #[test]
    fn test_incremental_add_and_prune() {
        let source = Arc::new(ObservableCollection::new(vec!["ant", "bee"]));
        let view = GroupedView::new(source.clone(), vec![by_initial()]);
        let root_changes = Arc::new(Mutex::new(Vec::new()));
        let root_changes_clone = root_changes.clone();
        view.root().collection_changed().connect(move |change| {
            root_changes_clone.lock().push(change.action());
        });

        source.insert(1, "axe");
        assert_eq!(names(&view.find_group(&["a"]).unwrap()), vec!["ant", "axe"]);

        source.push("cow");
        assert_eq!(names(view.root()), vec!["[a]", "[b]", "[c]"]);

        source.remove(2);
        assert_eq!(names(view.root()), vec!["[a]", "[c]"]);
        assert_eq!(root_changes.lock().len(), 2);
    }

    #[test]
    fn test_predefined_groups_persist() {
        let source = Arc::new(ObservableCollection::new(vec!["bee"]));
        let view = GroupedView::new(
            source.clone(),
            vec![by_initial().with_group_names(["a", "b"])],
        );
        assert_eq!(names(view.root()), vec!["[a]", "[b]"]);
        source.remove(0);
        assert_eq!(names(view.root()), vec!["[a]", "[b]"]);
        assert!(view.find_group(&["b"]).unwrap().is_persistent());
    }

    #[test]
    fn test_move_within_group() {
        let source = Arc::new(ObservableCollection::new(vec!["ant", "bee", "asp", "axe"]));
        let view = GroupedView::new(source.clone(), vec![by_initial()]);
        let a = view.find_group(&["a"]).unwrap();

        source.move_item(3, 0);
        assert_eq!(names(&a), vec!["axe", "ant", "asp"]);
        source.move_item(0, 3);
        assert_eq!(names(&a), vec!["ant", "asp", "axe"]);
    }

    #[test]
    fn test_replace_moves_between_groups() {
        let source = Arc::new(ObservableCollection::new(vec!["ant", "bee"]));
        let view = GroupedView::new(source.clone(), vec![by_initial()]);

        source.set(0, "bat");
        assert_eq!(names(view.root()), vec!["[b]"]);
        assert_eq!(names(&view.find_group(&["b"]).unwrap()), vec!["bat", "bee"]);
    }

    #[test]
    fn test_nested_levels() {
        let source = Arc::new(ObservableCollection::new(vec!["ant", "asp", "ash", "bee"]));
        let view = GroupedView::new(
            source.clone(),
            vec![
                by_initial(),
                GroupDescription::new(|word: &&'static str| word[1..2].to_string()),
            ],
        );
        let a = view.find_group(&["a"]).unwrap();
        assert!(!a.is_bottom_level());
        assert_eq!(names(&a), vec!["[n]", "[s]"]);
        assert_eq!(a.leaf_count(), 3);
        assert_eq!(names(&view.find_group(&["a", "s"]).unwrap()), vec!["asp", "ash"]);

        source.remove(0);
        assert_eq!(names(&a), vec!["[s]"]);
    }

    #[test]
    fn test_range_add_and_reset() {
        let source = Arc::new(ObservableCollection::new(vec!["ant"]));
        let view = GroupedView::new(source.clone(), vec![by_initial()]);

        source.extend_at(0, vec!["bee", "arc"]);
        assert_eq!(names(view.root()), vec!["[a]", "[b]"]);
        assert_eq!(names(&view.find_group(&["a"]).unwrap()), vec!["arc", "ant"]);

        source.set_items(vec!["cow"]);
        assert_eq!(names(view.root()), vec!["[c]"]);
    }
}
