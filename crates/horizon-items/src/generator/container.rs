//! Containers and the shared container store.
//!
//! A container is the UI element generated for an item. The generator only
//! needs a handle to it plus a little attached state, so containers live in
//! a [`ContainerStore`] shared by every generator level of one items control:
//!
//! - the container type (recycling never mixes types)
//! - its role, decided once at creation
//! - the item it is linked to, for reverse lookup without scanning
//! - the owning generator level, the `(generator, index)` back-reference
//! - the alternation index and whether the host prepared it

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use slotmap::{SlotMap, new_key_type};

use crate::collection::{ItemValue, ViewItem};

use super::container_generator::ItemContainerGenerator;

new_key_type! {
    /// Handle of a generated container.
    pub struct ContainerId;

    /// Handle of a generator level registered in a [`ContainerStore`].
    pub struct GeneratorId;
}

/// Named container type.
///
/// Two containers with the same type are interchangeable for recycling.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerType(&'static str);

impl ContainerType {
    /// Default type for item containers.
    pub const ITEM: Self = Self("ItemContainer");
    /// Type used when an item is its own container.
    pub const OWN: Self = Self("OwnContainer");
    /// Default type for group containers.
    pub const GROUP: Self = Self("GroupItem");
    /// Type of the stand-in generated for a hidden empty group.
    pub const PLACEHOLDER: Self = Self("EmptyGroupPlaceholder");

    /// Creates a container type.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The type name.
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl Default for ContainerType {
    fn default() -> Self {
        Self::ITEM
    }
}

impl fmt::Debug for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainerType({})", self.0)
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// What a container stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerRole {
    /// A generated container wrapping a data item.
    Item,
    /// The item is its own container.
    OwnContainer,
    /// A group container with its own child generator.
    Group,
    /// Stand-in for a group hidden while empty.
    EmptyGroupPlaceholder,
}

impl ContainerRole {
    /// Only plain item containers go through the recycle queue.
    pub fn is_recyclable(self) -> bool {
        matches!(self, Self::Item)
    }
}

/// State attached to a container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRecord<T> {
    pub container_type: ContainerType,
    pub role: ContainerRole,
    pub item: Option<ViewItem<T>>,
    pub owner: Option<GeneratorId>,
    pub alternation_index: Option<usize>,
    pub prepared: bool,
}

/// Shared table of containers and generator levels.
pub struct ContainerStore<T: ItemValue> {
    containers: RwLock<SlotMap<ContainerId, ContainerRecord<T>>>,
    generators: RwLock<SlotMap<GeneratorId, Weak<ItemContainerGenerator<T>>>>,
}

impl<T: ItemValue> ContainerStore<T> {
    /// Creates an empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            containers: RwLock::new(SlotMap::with_key()),
            generators: RwLock::new(SlotMap::with_key()),
        })
    }

    /// Number of live containers.
    pub fn len(&self) -> usize {
        self.containers.read().len()
    }

    /// Whether no container is alive.
    pub fn is_empty(&self) -> bool {
        self.containers.read().is_empty()
    }

    /// Whether `container` is alive.
    pub fn contains(&self, container: ContainerId) -> bool {
        self.containers.read().contains_key(container)
    }

    /// Snapshot of a container's record.
    pub fn record(&self, container: ContainerId) -> Option<ContainerRecord<T>> {
        self.containers.read().get(container).cloned()
    }

    /// The item linked to `container`.
    pub fn item(&self, container: ContainerId) -> Option<ViewItem<T>> {
        self.containers
            .read()
            .get(container)
            .and_then(|record| record.item.clone())
    }

    /// The generator level owning `container`.
    pub fn owner(&self, container: ContainerId) -> Option<GeneratorId> {
        self.containers
            .read()
            .get(container)
            .and_then(|record| record.owner)
    }

    pub fn role(&self, container: ContainerId) -> Option<ContainerRole> {
        self.containers.read().get(container).map(|record| record.role)
    }

    pub fn container_type(&self, container: ContainerId) -> Option<ContainerType> {
        self.containers
            .read()
            .get(container)
            .map(|record| record.container_type)
    }

    pub fn alternation_index(&self, container: ContainerId) -> Option<usize> {
        self.containers
            .read()
            .get(container)
            .and_then(|record| record.alternation_index)
    }

    pub fn is_prepared(&self, container: ContainerId) -> bool {
        self.containers
            .read()
            .get(container)
            .is_some_and(|record| record.prepared)
    }

    pub(crate) fn create(&self, container_type: ContainerType, role: ContainerRole) -> ContainerId {
        self.containers.write().insert(ContainerRecord {
            container_type,
            role,
            item: None,
            owner: None,
            alternation_index: None,
            prepared: false,
        })
    }

    pub(crate) fn destroy(&self, container: ContainerId) -> bool {
        self.containers.write().remove(container).is_some()
    }

    pub(crate) fn link(&self, container: ContainerId, item: ViewItem<T>, owner: GeneratorId) {
        if let Some(record) = self.containers.write().get_mut(container) {
            record.item = Some(item);
            record.owner = Some(owner);
        }
    }

    /// Clears the item link and per-item state, keeping the container alive.
    pub(crate) fn unlink(&self, container: ContainerId) -> Option<ViewItem<T>> {
        let mut containers = self.containers.write();
        let record = containers.get_mut(container)?;
        record.owner = None;
        record.alternation_index = None;
        record.prepared = false;
        record.item.take()
    }

    /// Returns `true` if the stored index changed.
    pub(crate) fn set_alternation_index(&self, container: ContainerId, index: Option<usize>) -> bool {
        match self.containers.write().get_mut(container) {
            Some(record) if record.alternation_index != index => {
                record.alternation_index = index;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_prepared(&self, container: ContainerId, prepared: bool) {
        if let Some(record) = self.containers.write().get_mut(container) {
            record.prepared = prepared;
        }
    }

    pub(crate) fn register_generator(&self, generator: Weak<ItemContainerGenerator<T>>) -> GeneratorId {
        self.generators.write().insert(generator)
    }

    pub(crate) fn unregister_generator(&self, id: GeneratorId) {
        self.generators.write().remove(id);
    }

    /// Resolves a generator level by id.
    pub fn generator(&self, id: GeneratorId) -> Option<Arc<ItemContainerGenerator<T>>> {
        self.generators.read().get(id).and_then(Weak::upgrade)
    }

    /// The generator level that owns `container`.
    pub fn generator_for_container(
        &self,
        container: ContainerId,
    ) -> Option<Arc<ItemContainerGenerator<T>>> {
        self.owner(container).and_then(|id| self.generator(id))
    }

    /// Number of live generator levels.
    pub fn generator_count(&self) -> usize {
        self.generators
            .read()
            .values()
            .filter(|generator| generator.strong_count() > 0)
            .count()
    }
}

impl<T: ItemValue> fmt::Debug for ContainerStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerStore")
            .field("containers", &self.containers.read().len())
            .field("generators", &self.generators.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_lifecycle() {
        let store = ContainerStore::<&str>::new();
        let container = store.create(ContainerType::ITEM, ContainerRole::Item);
        assert!(store.contains(container));
        assert_eq!(store.item(container), None);
        assert_eq!(store.role(container), Some(ContainerRole::Item));

        assert!(store.set_alternation_index(container, Some(1)));
        assert!(!store.set_alternation_index(container, Some(1)));
        store.set_prepared(container, true);

        assert_eq!(store.unlink(container), None);
        assert_eq!(store.alternation_index(container), None);
        assert!(!store.is_prepared(container));

        assert!(store.destroy(container));
        assert!(!store.destroy(container));
        assert!(store.is_empty());
    }

    #[test]
    fn test_container_type_display() {
        assert_eq!(ContainerType::GROUP.to_string(), "GroupItem");
        assert_eq!(ContainerType::new("Row").name(), "Row");
        assert!(ContainerRole::Item.is_recyclable());
        assert!(!ContainerRole::Group.is_recyclable());
    }
}
