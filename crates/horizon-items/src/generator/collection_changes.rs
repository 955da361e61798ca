//! Incremental maintenance of the map from single-item collection changes.

use horizon_items_core::logging::targets;

use crate::collection::{ChangeAction, CollectionChange, ItemValue, ViewItem};

use super::alternation;
use super::block::BlockEntry;
use super::container::{ContainerRole, ContainerType};
use super::container_generator::{Disposal, Effect, ItemContainerGenerator, MapState};
use super::error::{GeneratorError, Result};
use super::position::ItemsChangedEvent;

impl<T: ItemValue> ItemContainerGenerator<T> {
    /// Applies a collection change to the map and announces it through
    /// [`items_changed`](Self::items_changed).
    ///
    /// Changes arriving through the source's signal are routed here
    /// automatically. A released generator ignores every change.
    ///
    /// # Errors
    ///
    /// - [`GeneratorError::RangeActionsNotSupported`] for changes carrying
    ///   more or less than one item
    /// - [`GeneratorError::ChangeOutOfRange`] for indices the map does not have
    /// - [`GeneratorError::Inconsistent`] when verification after changes is
    ///   enabled and fails
    pub fn on_collection_changed(&self, change: &CollectionChange<T>) -> Result<()> {
        if self.inner.lock().state == MapState::Released {
            return Ok(());
        }
        if change.is_range() {
            tracing::warn!(
                target: targets::GENERATOR,
                generator = ?self.id(),
                action = ?change.action(),
                count = change.item_count(),
                "range actions are not supported"
            );
            return Err(GeneratorError::RangeActionsNotSupported {
                action: change.action(),
                count: change.item_count(),
            });
        }
        let _span = tracing::debug_span!(
            target: targets::GENERATOR,
            "collection_change",
            generator = ?self.id(),
            action = ?change.action()
        )
        .entered();

        let effects = match change {
            CollectionChange::Add { index, .. } => self.item_added(*index)?,
            CollectionChange::Remove { items, index } => {
                self.item_removed(single(items, change)?, *index)?
            }
            CollectionChange::Replace {
                old_items,
                new_items,
                index,
            } => self.item_replaced(single(old_items, change)?, single(new_items, change)?, *index)?,
            CollectionChange::Move {
                old_index,
                new_index,
                ..
            } => self.item_moved(*old_index, *new_index)?,
            CollectionChange::Reset => {
                self.teardown();
                vec![Effect::ItemsChanged(ItemsChangedEvent::reset())]
            }
        };
        self.inner.lock().last_change = Some(format!("{change:?}"));
        self.run_effects(effects);

        if self.options().verify_after_changes {
            self.verify()?;
        }
        Ok(())
    }

    fn item_added(&self, index: usize) -> Result<Vec<Effect<T>>> {
        let mut inner = self.inner.lock();
        let len = inner.chain.total_items();
        if index > len {
            return Err(GeneratorError::ChangeOutOfRange { index, len });
        }
        inner.chain.insert_item(index);
        if index <= inner.search_hint && len > 0 {
            inner.search_hint += 1;
        }
        let position = inner.chain.position_from_index(index);
        tracing::trace!(target: targets::GENERATOR, index, %position, "item added");
        Ok(vec![Effect::ItemsChanged(ItemsChangedEvent::new(
            ChangeAction::Add,
            position,
            1,
            0,
        ))])
    }

    fn item_removed(&self, item: &ViewItem<T>, index: usize) -> Result<Vec<Effect<T>>> {
        let mut inner = self.inner.lock();
        let len = inner.chain.total_items();
        if index >= len {
            return Err(GeneratorError::ChangeOutOfRange { index, len });
        }
        let position = inner.chain.position_from_index(index);
        let mut effects = Vec::new();
        let container_count = match inner.chain.remove_item(index) {
            Some(entry) => {
                if entry.item != *item {
                    tracing::warn!(
                        target: targets::GENERATOR,
                        index,
                        recorded = ?entry.item,
                        removed = ?item,
                        "removed item does not match the realized one"
                    );
                }
                if let Some(link) = inner.take_group_link(entry.container) {
                    link.release(&mut effects);
                }
                effects.push(Effect::Clear {
                    container: entry.container,
                    item: Some(entry.item),
                    disposal: Disposal::Destroy,
                });
                alternation::renumber_from(&inner.chain, self.store(), inner.alternation_count, index, None);
                1
            }
            None => 0,
        };
        if index < inner.search_hint {
            inner.search_hint -= 1;
        }
        tracing::trace!(target: targets::GENERATOR, index, %position, container_count, "item removed");
        effects.push(Effect::ItemsChanged(ItemsChangedEvent::new(
            ChangeAction::Remove,
            position,
            1,
            container_count,
        )));
        Ok(effects)
    }

    fn item_replaced(
        &self,
        old_item: &ViewItem<T>,
        new_item: &ViewItem<T>,
        index: usize,
    ) -> Result<Vec<Effect<T>>> {
        let value = match new_item {
            ViewItem::Item(value) if !old_item.is_group() => value,
            _ => {
                let mut effects = self.item_removed(old_item, index)?;
                effects.extend(self.item_added(index)?);
                return Ok(effects);
            }
        };
        let own_container = self.host().is_item_its_own_container(value);
        let container_type = self.host().container_type_for_item(value);

        let mut inner = self.inner.lock();
        let len = inner.chain.total_items();
        if index >= len {
            return Err(GeneratorError::ChangeOutOfRange { index, len });
        }
        let position = inner.chain.position_from_index(index);
        let event = ItemsChangedEvent::new(ChangeAction::Replace, position, 1, 1).with_old_position(position);
        let Some(old) = inner.chain.entry_at(index).cloned() else {
            return Ok(vec![Effect::ItemsChanged(ItemsChangedEvent {
                container_count: 0,
                ..event
            })]);
        };

        let store = self.store();
        let reusable = !own_container
            && store.role(old.container) == Some(ContainerRole::Item)
            && store.container_type(old.container) == Some(container_type);
        let mut effects = Vec::with_capacity(3);
        if reusable {
            inner.chain.replace_entry(
                index,
                BlockEntry {
                    item: new_item.clone(),
                    container: old.container,
                },
            );
            store.link(old.container, new_item.clone(), self.id());
            effects.push(Effect::Clear {
                container: old.container,
                item: Some(old.item),
                disposal: Disposal::Keep,
            });
            effects.push(Effect::Prepare(old.container));
        } else {
            let container = if own_container {
                store.create(ContainerType::OWN, ContainerRole::OwnContainer)
            } else {
                store.create(container_type, ContainerRole::Item)
            };
            store.link(container, new_item.clone(), self.id());
            store.set_alternation_index(container, store.alternation_index(old.container));
            inner.chain.replace_entry(
                index,
                BlockEntry {
                    item: new_item.clone(),
                    container,
                },
            );
            effects.push(Effect::Clear {
                container: old.container,
                item: Some(old.item),
                disposal: Disposal::Destroy,
            });
        }
        tracing::trace!(target: targets::GENERATOR, index, reusable, "item replaced");
        effects.push(Effect::ItemsChanged(event));
        Ok(effects)
    }

    fn item_moved(&self, old_index: usize, new_index: usize) -> Result<Vec<Effect<T>>> {
        let mut inner = self.inner.lock();
        let len = inner.chain.total_items();
        for index in [old_index, new_index] {
            if index >= len {
                return Err(GeneratorError::ChangeOutOfRange { index, len });
            }
        }
        if old_index == new_index {
            return Ok(Vec::new());
        }
        let old_position = inner.chain.position_from_index(old_index);
        let removed = inner.chain.remove_item(old_index);
        inner.chain.insert_item(new_index);

        let mut effects = Vec::new();
        let mut container_count = 0;
        if let Some(entry) = removed {
            match inner.chain.locate(new_index) {
                Some(location) => {
                    inner.chain.realize(location.block, location.offset, entry);
                    alternation::renumber_from(
                        &inner.chain,
                        self.store(),
                        inner.alternation_count,
                        old_index.min(new_index),
                        Some(old_index.max(new_index)),
                    );
                    container_count = 1;
                }
                None => {
                    if let Some(link) = inner.take_group_link(entry.container) {
                        link.release(&mut effects);
                    }
                    effects.push(Effect::Clear {
                        container: entry.container,
                        item: Some(entry.item),
                        disposal: Disposal::Destroy,
                    });
                }
            }
        }
        inner.search_hint = new_index;
        let position = inner.chain.position_from_index(new_index);
        tracing::trace!(
            target: targets::GENERATOR,
            old_index,
            new_index,
            container_count,
            "item moved"
        );
        effects.push(Effect::ItemsChanged(
            ItemsChangedEvent::new(ChangeAction::Move, position, 1, container_count)
                .with_old_position(old_position),
        ));
        Ok(effects)
    }
}

fn single<'a, T>(items: &'a [ViewItem<T>], change: &CollectionChange<T>) -> Result<&'a ViewItem<T>> {
    match items {
        [item] => Ok(item),
        _ => Err(GeneratorError::RangeActionsNotSupported {
            action: change.action(),
            count: items.len(),
        }),
    }
}
