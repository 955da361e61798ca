//! The capability set a generator needs from the control hosting it.

use crate::collection::{CollectionGroup, ItemValue};

use super::container::{ContainerId, ContainerType};

/// How a group level presents its groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStyle {
    /// Type of the containers generated for groups at this level.
    pub container_type: ContainerType,
    /// Replace empty groups with a placeholder instead of a group container.
    pub hides_if_empty: bool,
    /// Alternation count applied to the group containers at this level.
    pub alternation_count: usize,
}

impl GroupStyle {
    /// Creates the default group style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the group container type.
    pub fn with_container_type(mut self, container_type: ContainerType) -> Self {
        self.container_type = container_type;
        self
    }

    /// Sets whether empty groups are hidden.
    pub fn with_hides_if_empty(mut self, hides_if_empty: bool) -> Self {
        self.hides_if_empty = hides_if_empty;
        self
    }

    /// Sets the alternation count of group containers.
    pub fn with_alternation_count(mut self, alternation_count: usize) -> Self {
        self.alternation_count = alternation_count;
        self
    }
}

impl Default for GroupStyle {
    fn default() -> Self {
        Self {
            container_type: ContainerType::GROUP,
            hides_if_empty: false,
            alternation_count: 0,
        }
    }
}

/// Callbacks a generator makes into its hosting control.
///
/// All methods are called synchronously and never while the generator holds
/// its internal lock, so implementations may query the generator. They must
/// not start a generation pass on the generator that called them.
pub trait ContainerHost<T: ItemValue>: Send + Sync {
    /// Whether `item` acts as its own container.
    fn is_item_its_own_container(&self, item: &T) -> bool {
        let _ = item;
        false
    }

    /// Type of the container to generate for `item`.
    fn container_type_for_item(&self, item: &T) -> ContainerType {
        let _ = item;
        ContainerType::ITEM
    }

    /// Finishes initializing a generated container.
    fn prepare_item_container(&self, container: ContainerId, item: &T) {
        let _ = (container, item);
    }

    /// Undoes [`prepare_item_container`](Self::prepare_item_container) before
    /// the container is discarded, recycled or relinked.
    fn clear_container_for_item(&self, container: ContainerId, item: Option<&T>) {
        let _ = (container, item);
    }

    /// Style for groups at `level`, or `None` for the default style.
    fn group_style(&self, group: &CollectionGroup<T>, level: usize) -> Option<GroupStyle> {
        let _ = (group, level);
        None
    }

    /// Told whether the bound source is grouped.
    fn set_is_grouping(&self, is_grouping: bool) {
        let _ = is_grouping;
    }

    /// Alternation count for item containers. Zero disables alternation.
    fn alternation_count(&self) -> usize {
        0
    }

    /// Alternation count for group containers at `level`.
    fn group_alternation_count(&self, level: usize) -> usize {
        let _ = level;
        0
    }
}

/// A host relying on every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContainerHost;

impl<T: ItemValue> ContainerHost<T> for DefaultContainerHost {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_style_builder() {
        let style = GroupStyle::new()
            .with_container_type(ContainerType::new("Header"))
            .with_hides_if_empty(true)
            .with_alternation_count(2);
        assert_eq!(style.container_type.name(), "Header");
        assert!(style.hides_if_empty);
        assert_eq!(style.alternation_count, 2);
        assert_eq!(GroupStyle::default().container_type, ContainerType::GROUP);
    }

    #[test]
    fn test_default_host() {
        let host = DefaultContainerHost;
        assert!(!ContainerHost::<i32>::is_item_its_own_container(&host, &1));
        assert_eq!(ContainerHost::<i32>::container_type_for_item(&host, &1), ContainerType::ITEM);
        assert_eq!(ContainerHost::<i32>::alternation_count(&host), 0);
    }
}
