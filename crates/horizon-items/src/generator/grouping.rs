//! Group levels: child generators, hidden empty groups and their watchers.
//!
//! A realized group entry owns the generator of the level below it. When
//! its [`GroupStyle`] hides empty groups, an empty group is realized as a
//! lightweight placeholder with no child generator, and a watcher on the
//! group swaps placeholder and group container whenever the group's
//! emptiness flips.

use std::sync::Arc;

use horizon_items_core::logging::targets;

use crate::collection::{CollectionGroup, ItemValue, ItemsSource, ViewItem};

use super::block::BlockEntry;
use super::container::{ContainerId, ContainerRole, ContainerType};
use super::container_generator::{
    Disposal, Effect, GeneratorInner, GroupLink, GroupSlot, ItemContainerGenerator, MapState,
};
use super::host::GroupStyle;
use super::position::ItemsChangedEvent;
use crate::collection::ChangeAction;

impl<T: ItemValue> GeneratorInner<T> {
    pub(super) fn take_group_link(&mut self, container: ContainerId) -> Option<GroupLink<T>> {
        let position = self
            .groups
            .iter()
            .position(|link| link.container == container)?;
        Some(self.groups.swap_remove(position))
    }

    /// Realized groups that own a child generator.
    pub(super) fn group_children(&self) -> Vec<(Arc<CollectionGroup<T>>, Arc<ItemContainerGenerator<T>>)> {
        self.groups
            .iter()
            .filter_map(|link| link.child.clone().map(|child| (link.group.clone(), child)))
            .collect()
    }
}

impl<T: ItemValue> GroupLink<T> {
    /// Disconnects the watcher and schedules the child level's release.
    pub(super) fn release(self, effects: &mut Vec<Effect<T>>) {
        if let Some(connection) = self.connection {
            self.group.collection_changed().disconnect(connection);
        }
        if let Some(child) = self.child {
            effects.push(Effect::ReleaseChild(child));
        }
    }
}

impl<T: ItemValue> ItemContainerGenerator<T> {
    /// Creates the container (and child level) for a group entry.
    pub(super) fn acquire_group_container(
        &self,
        group: &Arc<CollectionGroup<T>>,
        style: GroupStyle,
    ) -> (ContainerId, GroupSlot<T>) {
        let empty = group.item_count() == 0;
        if style.hides_if_empty && empty {
            let container = self
                .store()
                .create(ContainerType::PLACEHOLDER, ContainerRole::EmptyGroupPlaceholder);
            return (
                container,
                GroupSlot {
                    style,
                    child: None,
                    empty,
                },
            );
        }
        let container = self.store().create(style.container_type, ContainerRole::Group);
        let child = self.new_child(group.clone());
        (
            container,
            GroupSlot {
                style,
                child: Some(child),
                empty,
            },
        )
    }

    /// Records a realized group entry, watching it if empty groups hide.
    pub(super) fn link_group(
        &self,
        group: &Arc<CollectionGroup<T>>,
        container: ContainerId,
        slot: GroupSlot<T>,
    ) -> GroupLink<T> {
        let connection = slot.style.hides_if_empty.then(|| {
            let generator = self.self_weak();
            let watched = Arc::downgrade(group);
            group.collection_changed().connect(move |_| {
                if let (Some(generator), Some(group)) = (generator.upgrade(), watched.upgrade()) {
                    generator.on_subgroup_changed(&group);
                }
            })
        });
        GroupLink {
            group: group.clone(),
            container,
            style: slot.style,
            child: slot.child,
            connection,
            empty: slot.empty,
        }
    }

    /// Swaps placeholder and group container when `group` changed emptiness.
    fn on_subgroup_changed(&self, group: &Arc<CollectionGroup<T>>) {
        let now_empty = group.item_count() == 0;
        let style = {
            let inner = self.inner.lock();
            if inner.state == MapState::Released {
                return;
            }
            match inner
                .groups
                .iter()
                .find(|link| Arc::ptr_eq(&link.group, group))
            {
                Some(link) if link.style.hides_if_empty && link.empty != now_empty => link.style,
                _ => return,
            }
        };

        let (container, slot) = self.acquire_group_container(group, style);

        let mut effects = Vec::new();
        {
            let mut inner = self.inner.lock();
            let link_index = inner
                .groups
                .iter()
                .position(|link| Arc::ptr_eq(&link.group, group) && link.empty != now_empty);
            let old_container = link_index.map(|i| inner.groups[i].container);
            let realized_at = old_container.and_then(|old| {
                inner
                    .chain
                    .realized_from(0)
                    .find(|(_, entry)| entry.container == old)
                    .map(|(slot, _)| slot.index)
            });
            let (Some(link_index), Some(old_container), Some(index)) =
                (link_index, old_container, realized_at)
            else {
                drop(inner);
                self.store().destroy(container);
                if let Some(child) = slot.child {
                    child.release();
                }
                return;
            };

            let item = ViewItem::Group(group.clone());
            self.store().link(container, item.clone(), self.id());
            let alternation_index = self.store().alternation_index(old_container);
            self.store().set_alternation_index(container, alternation_index);
            inner.chain.replace_entry(
                index,
                BlockEntry {
                    item: item.clone(),
                    container,
                },
            );
            let position = inner.chain.position_from_index(index);

            let link = &mut inner.groups[link_index];
            link.container = container;
            link.empty = now_empty;
            if let Some(old_child) = std::mem::replace(&mut link.child, slot.child) {
                effects.push(Effect::ReleaseChild(old_child));
            }
            effects.push(Effect::Clear {
                container: old_container,
                item: Some(item),
                disposal: Disposal::Destroy,
            });
            effects.push(Effect::ItemsChanged(
                ItemsChangedEvent::new(ChangeAction::Replace, position, 1, 1).with_old_position(position),
            ));
            tracing::debug!(
                target: targets::GENERATOR,
                generator = ?self.id(),
                group = group.name(),
                empty = now_empty,
                "group emptiness changed"
            );
        }
        self.run_effects(effects);
    }

    /// Whether the bound source yields groups.
    pub fn is_grouping(&self) -> bool {
        self.source().is_grouped()
    }

    /// The generator of the group realized as `container` at this level.
    pub fn child_generator(&self, container: ContainerId) -> Option<Arc<Self>> {
        self.inner
            .lock()
            .groups
            .iter()
            .find(|link| link.container == container)
            .and_then(|link| link.child.clone())
    }

    /// Generators of all realized groups at this level.
    pub fn child_generators(&self) -> Vec<Arc<Self>> {
        self.inner
            .lock()
            .group_children()
            .into_iter()
            .map(|(_, child)| child)
            .collect()
    }
}
