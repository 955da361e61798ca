//! ItemsControl: the headless control that hosts a container generator.
//!
//! [`ItemsControl`] owns the [`ContainerStore`] shared by all of its
//! grouping levels, the root [`ItemContainerGenerator`] and an [`ItemsHost`]
//! that answers the generator's callbacks from the control's configuration.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_items::collection::ObservableCollection;
//! use horizon_items::generator::ContainerType;
//! use horizon_items::items_control::ItemsControl;
//!
//! let items = Arc::new(ObservableCollection::new(vec![1, 2, 3]));
//! let control = ItemsControl::new(items)
//!     .with_item_container_type(ContainerType::new("ListBoxItem"))
//!     .with_alternation_count(3);
//!
//! control.container_prepared().connect(|(container, item)| {
//!     println!("prepared {container:?} for {item}");
//! });
//! assert_eq!(control.alternation_count(), 3);
//! assert!(!control.is_grouping());
//! ```

use std::fmt;
use std::sync::Arc;

use horizon_items_core::Signal;
use horizon_items_core::logging::targets;
use parking_lot::RwLock;

use crate::collection::{CollectionGroup, ItemValue, ItemsSource, ViewItem};
use crate::generator::{
    ContainerHost, ContainerId, ContainerStore, ContainerType, GeneratorOptions, GroupStyle,
    ItemContainerGenerator, Result,
};

/// Decides whether an item is used as its own container.
pub type OwnContainerPredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

struct HostConfig<T> {
    item_container_type: ContainerType,
    own_container: Option<OwnContainerPredicate<T>>,
    group_styles: Vec<GroupStyle>,
    alternation_count: usize,
    is_grouping: bool,
}

/// The [`ContainerHost`] of an [`ItemsControl`].
///
/// Prepare and clear callbacks are re-raised through
/// [`container_prepared`](Self::container_prepared) and
/// [`container_cleared`](Self::container_cleared).
pub struct ItemsHost<T: ItemValue> {
    config: RwLock<HostConfig<T>>,
    /// Emitted when a generated container was prepared for its item.
    pub container_prepared: Signal<(ContainerId, T)>,
    /// Emitted when a container was cleared, with the item it showed.
    pub container_cleared: Signal<(ContainerId, Option<T>)>,
}

impl<T: ItemValue> ItemsHost<T> {
    fn new() -> Self {
        Self {
            config: RwLock::new(HostConfig {
                item_container_type: ContainerType::ITEM,
                own_container: None,
                group_styles: Vec::new(),
                alternation_count: 0,
                is_grouping: false,
            }),
            container_prepared: Signal::new(),
            container_cleared: Signal::new(),
        }
    }

    /// Style for groups at `level`.
    ///
    /// Levels past the configured styles reuse the last one; with no styles
    /// configured every level gets `None` and the generator's default.
    pub fn group_style_for_level(&self, level: usize) -> Option<GroupStyle> {
        let config = self.config.read();
        config
            .group_styles
            .get(level)
            .or_else(|| config.group_styles.last())
            .copied()
    }

    /// Whether the bound source yields groups.
    pub fn is_grouping(&self) -> bool {
        self.config.read().is_grouping
    }
}

impl<T: ItemValue> ContainerHost<T> for ItemsHost<T> {
    fn is_item_its_own_container(&self, item: &T) -> bool {
        let predicate = self.config.read().own_container.clone();
        predicate.is_some_and(|predicate| predicate(item))
    }

    fn container_type_for_item(&self, _item: &T) -> ContainerType {
        self.config.read().item_container_type
    }

    fn prepare_item_container(&self, container: ContainerId, item: &T) {
        self.container_prepared.emit((container, item.clone()));
    }

    fn clear_container_for_item(&self, container: ContainerId, item: Option<&T>) {
        self.container_cleared.emit((container, item.cloned()));
    }

    fn group_style(&self, _group: &CollectionGroup<T>, level: usize) -> Option<GroupStyle> {
        self.group_style_for_level(level)
    }

    fn set_is_grouping(&self, is_grouping: bool) {
        let changed = {
            let mut config = self.config.write();
            std::mem::replace(&mut config.is_grouping, is_grouping) != is_grouping
        };
        if changed {
            tracing::debug!(target: targets::ITEMS_CONTROL, is_grouping, "grouping changed");
        }
    }

    fn alternation_count(&self) -> usize {
        self.config.read().alternation_count
    }

    fn group_alternation_count(&self, level: usize) -> usize {
        self.group_style_for_level(level)
            .map_or(0, |style| style.alternation_count)
    }
}

/// A control presenting the items of an [`ItemsSource`] through generated
/// containers.
///
/// # Signals
///
/// - `items_source_changed(())`: emitted after [`set_items_source`](Self::set_items_source)
/// - `container_prepared((ContainerId, T))`: see [`ItemsHost`]
/// - `container_cleared((ContainerId, Option<T>))`: see [`ItemsHost`]
pub struct ItemsControl<T: ItemValue> {
    store: Arc<ContainerStore<T>>,
    host: Arc<ItemsHost<T>>,
    generator: Arc<ItemContainerGenerator<T>>,

    /// Emitted after the items source was replaced.
    pub items_source_changed: Signal<()>,
}

impl<T: ItemValue> ItemsControl<T> {
    /// Creates a control presenting `source`.
    pub fn new(source: Arc<dyn ItemsSource<T>>) -> Self {
        Self::build(source, Arc::new(ItemsHost::new()), GeneratorOptions::default())
    }

    fn build(
        source: Arc<dyn ItemsSource<T>>,
        host: Arc<ItemsHost<T>>,
        options: GeneratorOptions,
    ) -> Self {
        let store = ContainerStore::new();
        let generator = ItemContainerGenerator::with_options(
            store.clone(),
            host.clone() as Arc<dyn ContainerHost<T>>,
            source,
            options,
        );
        Self {
            store,
            host,
            generator,
            items_source_changed: Signal::new(),
        }
    }

    // =========================================================================
    // Builder Pattern Methods
    // =========================================================================

    /// Set the container type generated for items.
    pub fn with_item_container_type(self, container_type: ContainerType) -> Self {
        self.host.config.write().item_container_type = container_type;
        self
    }

    /// Use items matching `predicate` as their own containers.
    pub fn with_own_container_predicate<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.host.config.write().own_container = Some(Arc::new(predicate));
        self
    }

    /// Append the style for the next grouping level.
    pub fn with_group_style(self, style: GroupStyle) -> Self {
        self.host.config.write().group_styles.push(style);
        self.generator.change_alternation_count();
        self
    }

    /// Set the alternation count of item containers.
    pub fn with_alternation_count(self, count: usize) -> Self {
        self.set_alternation_count(count);
        self
    }

    /// Recreate the generator with `options`.
    ///
    /// Containers generated so far are discarded.
    pub fn with_generator_options(self, options: GeneratorOptions) -> Self {
        let source = self.generator.source();
        self.generator.release();
        Self::build(source, self.host.clone(), options)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The generator of the top level.
    pub fn generator(&self) -> &Arc<ItemContainerGenerator<T>> {
        &self.generator
    }

    /// The container store shared by every grouping level.
    pub fn store(&self) -> &Arc<ContainerStore<T>> {
        &self.store
    }

    pub fn host(&self) -> &Arc<ItemsHost<T>> {
        &self.host
    }

    /// Emitted when a container was prepared for its item.
    pub fn container_prepared(&self) -> &Signal<(ContainerId, T)> {
        &self.host.container_prepared
    }

    /// Emitted when a container was cleared.
    pub fn container_cleared(&self) -> &Signal<(ContainerId, Option<T>)> {
        &self.host.container_cleared
    }

    /// The presented items source.
    pub fn items_source(&self) -> Arc<dyn ItemsSource<T>> {
        self.generator.source()
    }

    /// Replace the items source.
    ///
    /// Every container is discarded and the generator announces a reset.
    pub fn set_items_source(&self, source: Arc<dyn ItemsSource<T>>) -> Result<()> {
        tracing::debug!(
            target: targets::ITEMS_CONTROL,
            source = source.source_name(),
            len = source.len(),
            "items source replaced"
        );
        self.generator.rebind(source)?;
        self.items_source_changed.emit(());
        Ok(())
    }

    /// Regenerate from the current source.
    pub fn refresh(&self) -> Result<()> {
        self.generator.refresh()
    }

    pub fn is_grouping(&self) -> bool {
        self.host.is_grouping()
    }

    pub fn item_container_type(&self) -> ContainerType {
        self.host.config.read().item_container_type
    }

    /// Change the item container type and regenerate.
    pub fn set_item_container_type(&self, container_type: ContainerType) -> Result<()> {
        let changed = {
            let mut config = self.host.config.write();
            std::mem::replace(&mut config.item_container_type, container_type) != container_type
        };
        if changed { self.refresh() } else { Ok(()) }
    }

    /// Group styles by level.
    pub fn group_styles(&self) -> Vec<GroupStyle> {
        self.host.config.read().group_styles.clone()
    }

    /// Replace the group styles and regenerate.
    pub fn set_group_styles(&self, styles: Vec<GroupStyle>) -> Result<()> {
        self.host.config.write().group_styles = styles;
        self.refresh()
    }

    pub fn alternation_count(&self) -> usize {
        self.host.config.read().alternation_count
    }

    /// Change the alternation count on every level.
    ///
    /// Zero clears the alternation index of every realized container.
    pub fn set_alternation_count(&self, count: usize) {
        let old = std::mem::replace(&mut self.host.config.write().alternation_count, count);
        if old != count {
            tracing::debug!(target: targets::ITEMS_CONTROL, old, count, "alternation count changed");
            self.generator.change_alternation_count();
        }
    }

    /// Whether `item` is used as its own container.
    pub fn is_item_its_own_container(&self, item: &T) -> bool {
        self.host.is_item_its_own_container(item)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// The realized container of `item` on any grouping level.
    pub fn container_from_item(&self, item: &T) -> Option<ContainerId> {
        self.generator.container_from_item(&ViewItem::Item(item.clone()))
    }

    /// The item or group shown by `container`.
    pub fn item_from_container(&self, container: ContainerId) -> Option<ViewItem<T>> {
        self.store
            .generator_for_container(container)
            .and_then(|generator| generator.item_from_container(container))
    }

    /// Index of `container`, flattened over the leaf items when grouping.
    pub fn index_from_container(&self, container: ContainerId) -> Option<usize> {
        self.generator.index_from_container(container)
    }

    /// Container of the item at `index`, flattened over the leaf items when
    /// grouping.
    pub fn container_from_index(&self, index: usize) -> Option<ContainerId> {
        self.generator.container_from_index(index)
    }

    /// The generator level that realized `container`.
    pub fn generator_for_container(&self, container: ContainerId) -> Option<Arc<ItemContainerGenerator<T>>> {
        self.store.generator_for_container(container)
    }

    /// Alternation index stamped on `container`.
    pub fn alternation_index(&self, container: ContainerId) -> Option<usize> {
        self.store.alternation_index(container)
    }
}

impl<T: ItemValue> Drop for ItemsControl<T> {
    fn drop(&mut self) {
        self.generator.release();
    }
}

impl<T: ItemValue> fmt::Debug for ItemsControl<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemsControl")
            .field("generator", &self.generator)
            .field("store", &self.store)
            .field("is_grouping", &self.is_grouping())
            .field("alternation_count", &self.alternation_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(ItemsControl<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::collection::{GroupDescription, GroupedView, ObservableCollection};
    use crate::generator::{GeneratorDirection, GeneratorPosition};

    fn realize_all<T: ItemValue>(generator: &ItemContainerGenerator<T>) -> Vec<ContainerId> {
        let cursor = generator
            .start_at(GeneratorPosition::start(), GeneratorDirection::Forward, false)
            .unwrap();
        cursor.map(|generated| generated.unwrap().container).collect()
    }

    #[test]
    fn test_group_style_for_level_repeats_last() {
        let items = Arc::new(ObservableCollection::new(vec![1]));
        let control = ItemsControl::new(items)
            .with_group_style(GroupStyle::new().with_alternation_count(2))
            .with_group_style(GroupStyle::new().with_hides_if_empty(true));

        assert_eq!(control.host().group_style_for_level(0).map(|s| s.alternation_count), Some(2));
        assert!(control.host().group_style_for_level(1).unwrap().hides_if_empty);
        assert!(control.host().group_style_for_level(5).unwrap().hides_if_empty);
        assert_eq!(control.group_styles().len(), 2);
    }

    #[test]
    fn test_no_group_styles_means_default() {
        let items = Arc::new(ObservableCollection::new(vec![1]));
        let control = ItemsControl::new(items);
        assert_eq!(control.host().group_style_for_level(0), None);
    }

    #[test]
    fn test_own_container_predicate() {
        let items = Arc::new(ObservableCollection::new(vec![1, 2, 3, 4]));
        let control = ItemsControl::new(items).with_own_container_predicate(|item: &i32| item % 2 == 0);

        let containers = realize_all(control.generator());
        let types: Vec<_> = containers
            .iter()
            .map(|&c| control.store().container_type(c).unwrap())
            .collect();
        assert_eq!(
            types,
            vec![ContainerType::ITEM, ContainerType::OWN, ContainerType::ITEM, ContainerType::OWN]
        );
        assert!(control.is_item_its_own_container(&2));
    }

    #[test]
    fn test_prepare_and_clear_signals() {
        let items = Arc::new(ObservableCollection::new(vec!["a", "b"]));
        let control = ItemsControl::new(items.clone());

        let prepared = Arc::new(Mutex::new(Vec::new()));
        let cleared = Arc::new(Mutex::new(Vec::new()));
        let prepared_clone = prepared.clone();
        control.container_prepared().connect(move |(_, item)| {
            prepared_clone.lock().unwrap().push(*item);
        });
        let cleared_clone = cleared.clone();
        control.container_cleared().connect(move |(_, item)| {
            cleared_clone.lock().unwrap().push(*item);
        });

        let containers = realize_all(control.generator());
        for &container in &containers {
            assert!(control.generator().prepare_item_container(container));
        }
        assert_eq!(*prepared.lock().unwrap(), vec!["a", "b"]);

        items.remove(0);
        assert_eq!(*cleared.lock().unwrap(), vec![Some("a")]);
        assert_eq!(control.index_from_container(containers[1]), Some(0));
    }

    #[test]
    fn test_set_items_source() {
        let first = Arc::new(ObservableCollection::new(vec![1, 2, 3]));
        let control = ItemsControl::new(first.clone());
        let containers = realize_all(control.generator());
        assert_eq!(containers.len(), 3);

        let changed = Arc::new(Mutex::new(0));
        let changed_clone = changed.clone();
        control.items_source_changed.connect(move |_| {
            *changed_clone.lock().unwrap() += 1;
        });

        let second = Arc::new(ObservableCollection::new(vec![10, 20]));
        control.set_items_source(second.clone()).unwrap();
        assert_eq!(*changed.lock().unwrap(), 1);
        assert_eq!(control.generator().realized_count(), 0);
        assert_eq!(control.generator().item_count(), 2);
        assert!(!control.store().contains(containers[0]));

        // The old source no longer drives the generator.
        first.push(4);
        assert_eq!(control.generator().item_count(), 2);
        second.push(30);
        assert_eq!(control.generator().item_count(), 3);
    }

    #[test]
    fn test_grouping_flag_follows_source() {
        let items = Arc::new(ObservableCollection::new(vec![1, 2, 3]));
        let control = ItemsControl::new(items.clone());
        assert!(!control.is_grouping());

        let view = Arc::new(GroupedView::new(
            items,
            vec![GroupDescription::new(|n: &i32| if n % 2 == 0 { "even" } else { "odd" }.to_string())],
        ));
        control.set_items_source(view.root().clone()).unwrap();
        assert!(control.is_grouping());
        assert_eq!(control.generator().item_count(), 2);
    }

    #[test]
    fn test_alternation_count_change() {
        let items = Arc::new(ObservableCollection::new(vec![1, 2, 3]));
        let control = ItemsControl::new(items);
        let containers = realize_all(control.generator());
        assert_eq!(control.alternation_index(containers[0]), None);

        control.set_alternation_count(2);
        let indices: Vec<_> = containers.iter().map(|&c| control.alternation_index(c)).collect();
        assert_eq!(indices, vec![Some(0), Some(1), Some(0)]);

        control.set_alternation_count(0);
        assert!(containers.iter().all(|&c| control.alternation_index(c).is_none()));
    }

    #[test]
    fn test_set_item_container_type_regenerates() {
        let items = Arc::new(ObservableCollection::new(vec![1, 2]));
        let control = ItemsControl::new(items);
        let before = realize_all(control.generator());

        control.set_item_container_type(ContainerType::new("Row")).unwrap();
        assert!(!control.store().contains(before[0]));
        let after = realize_all(control.generator());
        assert_eq!(control.store().container_type(after[0]), Some(ContainerType::new("Row")));
    }
}
