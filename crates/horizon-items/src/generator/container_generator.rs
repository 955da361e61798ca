//! The container generator: keeps a block chain in step with an items source
//! and hands out containers for the items a panel asks for.
//!
//! # Locking
//!
//! All generator state sits behind one `parking_lot::Mutex`. The lock is
//! never held while calling into the host, the items source or the public
//! signals: operations mutate the chain under the lock, collect what must
//! happen afterwards as [`Effect`]s, release the lock and then run them.
//! Host callbacks may therefore query the generator, and even feed it
//! collection changes, without deadlocking.
//!
//! During [`remove_all`](ItemContainerGenerator::remove_all) the map is
//! taken offline ([`MapState::Offline`]); queries made from the clear
//! callbacks it triggers return `None` instead of half-torn-down answers.

use std::sync::{Arc, Weak};

use horizon_items_core::logging::{span_names, targets};
use horizon_items_core::{ConnectionId, PerfSpan, Signal};
use parking_lot::Mutex;

use crate::collection::{CollectionChange, CollectionGroup, ItemValue, ItemsSource, ViewItem};

use super::alternation;
use super::block::{BlockChain, BlockEntry, CursorId};
use super::container::{ContainerId, ContainerRole, ContainerStore, ContainerType, GeneratorId};
use super::cursor::{BatchGuard, GeneratedContainer, GeneratorCursor};
use super::error::{GeneratorError, Result};
use super::host::{ContainerHost, GroupStyle};
use super::position::{GeneratorDirection, GeneratorPosition, GeneratorStatus, ItemsChangedEvent};
use super::recycle::RecycleQueue;

/// How often `generate_next` retries when a host callback changed the
/// collection under the cursor.
const GENERATE_ATTEMPTS: usize = 3;

/// Generator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Run [`ItemContainerGenerator::verify`] after every collection change.
    pub verify_after_changes: bool,
    /// Start reverse lookups near the last hit instead of at the first item.
    pub search_hint: bool,
}

impl GeneratorOptions {
    /// Creates the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether every collection change is verified.
    pub fn with_verify_after_changes(mut self, verify: bool) -> Self {
        self.verify_after_changes = verify;
        self
    }

    /// Sets whether lookups use the search hint.
    pub fn with_search_hint(mut self, enabled: bool) -> Self {
        self.search_hint = enabled;
        self
    }
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            verify_after_changes: false,
            search_hint: true,
        }
    }
}

/// Availability of the map to queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MapState {
    Online,
    /// A teardown is running; nested teardowns bump the depth.
    Offline { depth: usize },
    Released,
}

/// What happens to a container once the host has cleared it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Disposal {
    Destroy,
    Recycle,
    /// The container stays linked (to a new item).
    Keep,
}

/// Work deferred until the generator lock is released.
pub(super) enum Effect<T: ItemValue> {
    Clear {
        container: ContainerId,
        item: Option<ViewItem<T>>,
        disposal: Disposal,
    },
    Prepare(ContainerId),
    ItemsChanged(ItemsChangedEvent),
    StatusChanged(GeneratorStatus),
    ReleaseChild(Arc<ItemContainerGenerator<T>>),
}

/// Bookkeeping for a realized group entry.
pub(super) struct GroupLink<T: ItemValue> {
    pub(super) group: Arc<CollectionGroup<T>>,
    pub(super) container: ContainerId,
    pub(super) style: GroupStyle,
    pub(super) child: Option<Arc<ItemContainerGenerator<T>>>,
    /// Emptiness watcher, only connected when the style hides empty groups.
    pub(super) connection: Option<ConnectionId>,
    pub(super) empty: bool,
}

pub(super) struct GeneratorInner<T: ItemValue> {
    pub(super) source: Arc<dyn ItemsSource<T>>,
    pub(super) source_connection: Option<ConnectionId>,
    pub(super) chain: BlockChain<T>,
    pub(super) state: MapState,
    pub(super) status: GeneratorStatus,
    pub(super) active_cursor: Option<CursorId>,
    pub(super) batch_depth: usize,
    pub(super) recycle: RecycleQueue,
    pub(super) alternation_count: usize,
    pub(super) search_hint: usize,
    pub(super) groups: Vec<GroupLink<T>>,
    pub(super) last_change: Option<String>,
}

impl<T: ItemValue> GeneratorInner<T> {
    pub(super) fn is_online(&self) -> bool {
        self.state == MapState::Online
    }

    pub(super) fn ensure_usable(&self) -> Result<()> {
        match self.state {
            MapState::Released => Err(GeneratorError::Released),
            _ => Ok(()),
        }
    }

    pub(super) fn set_status(&mut self, status: GeneratorStatus, effects: &mut Vec<Effect<T>>) {
        if self.status != status {
            self.status = status;
            effects.push(Effect::StatusChanged(status));
        }
    }

    fn enter_offline(&mut self) {
        self.state = match self.state {
            MapState::Online => MapState::Offline { depth: 1 },
            MapState::Offline { depth } => MapState::Offline { depth: depth + 1 },
            MapState::Released => MapState::Released,
        };
    }

    fn leave_offline(&mut self) {
        self.state = match self.state {
            MapState::Offline { depth } if depth > 1 => MapState::Offline { depth: depth - 1 },
            MapState::Offline { .. } => MapState::Online,
            other => other,
        };
    }
}

/// A container produced outside the lock, waiting to be linked.
struct Acquired<T: ItemValue> {
    container: ContainerId,
    is_new: bool,
    recycled: bool,
    group: Option<GroupSlot<T>>,
}

pub(super) struct GroupSlot<T: ItemValue> {
    pub(super) style: GroupStyle,
    pub(super) child: Option<Arc<ItemContainerGenerator<T>>>,
    pub(super) empty: bool,
}

/// Maps the items of one source (one grouping level) onto containers.
///
/// The generator owns a [`BlockChain`] mirroring the source, realizes
/// containers on demand through a [`GeneratorCursor`], follows single-item
/// collection changes incrementally and reports them to the panel through
/// [`items_changed`](Self::items_changed) in [`GeneratorPosition`] space.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use horizon_items::collection::ObservableCollection;
/// use horizon_items::generator::{
///     ContainerStore, DefaultContainerHost, GeneratorDirection, GeneratorPosition,
///     ItemContainerGenerator,
/// };
///
/// let items = Arc::new(ObservableCollection::new(vec!["a", "b", "c"]));
/// let generator = ItemContainerGenerator::new(
///     ContainerStore::<&str>::new(),
///     Arc::new(DefaultContainerHost),
///     items.clone(),
/// );
///
/// let mut cursor = generator
///     .start_at(GeneratorPosition::start(), GeneratorDirection::Forward, false)
///     .unwrap();
/// let first = cursor.generate_next(false).unwrap().unwrap();
/// assert!(first.is_newly_realized);
/// drop(cursor);
///
/// assert_eq!(generator.index_from_container(first.container), Some(0));
/// assert_eq!(generator.realized_count(), 1);
/// ```
pub struct ItemContainerGenerator<T: ItemValue> {
    id: GeneratorId,
    level: usize,
    store: Arc<ContainerStore<T>>,
    host: Arc<dyn ContainerHost<T>>,
    parent: Weak<ItemContainerGenerator<T>>,
    options: GeneratorOptions,
    self_ref: Weak<ItemContainerGenerator<T>>,
    pub(super) inner: Mutex<GeneratorInner<T>>,
    /// Raised after a collection change was applied to the map.
    pub items_changed: Signal<ItemsChangedEvent>,
    /// Raised when [`status`](Self::status) changes.
    pub status_changed: Signal<GeneratorStatus>,
}

impl<T: ItemValue> ItemContainerGenerator<T> {
    /// Creates a top-level generator bound to `source`.
    pub fn new(
        store: Arc<ContainerStore<T>>,
        host: Arc<dyn ContainerHost<T>>,
        source: Arc<dyn ItemsSource<T>>,
    ) -> Arc<Self> {
        Self::with_options(store, host, source, GeneratorOptions::default())
    }

    /// Creates a top-level generator with explicit options.
    pub fn with_options(
        store: Arc<ContainerStore<T>>,
        host: Arc<dyn ContainerHost<T>>,
        source: Arc<dyn ItemsSource<T>>,
        options: GeneratorOptions,
    ) -> Arc<Self> {
        host.set_is_grouping(source.is_grouped());
        Self::create(store, host, source, 0, Weak::new(), options)
    }

    /// Creates the generator for the entries of `group`, one level down.
    pub(super) fn new_child(&self, group: Arc<CollectionGroup<T>>) -> Arc<Self> {
        Self::create(
            self.store.clone(),
            self.host.clone(),
            group,
            self.level + 1,
            self.self_ref.clone(),
            self.options,
        )
    }

    fn create(
        store: Arc<ContainerStore<T>>,
        host: Arc<dyn ContainerHost<T>>,
        source: Arc<dyn ItemsSource<T>>,
        level: usize,
        parent: Weak<Self>,
        options: GeneratorOptions,
    ) -> Arc<Self> {
        let alternation_count = alternation_count_for(host.as_ref(), source.as_ref(), level);
        let len = source.len();
        let generator = Arc::new_cyclic(|weak: &Weak<Self>| {
            let id = store.register_generator(weak.clone());
            Self {
                id,
                level,
                store,
                host,
                parent,
                options,
                self_ref: weak.clone(),
                inner: Mutex::new(GeneratorInner {
                    source,
                    source_connection: None,
                    chain: BlockChain::new(len),
                    state: MapState::Online,
                    status: GeneratorStatus::NotStarted,
                    active_cursor: None,
                    batch_depth: 0,
                    recycle: RecycleQueue::new(),
                    alternation_count,
                    search_hint: 0,
                    groups: Vec::new(),
                    last_change: None,
                }),
                items_changed: Signal::new(),
                status_changed: Signal::new(),
            }
        });
        generator.connect_source();
        tracing::debug!(
            target: targets::GENERATOR,
            generator = ?generator.id,
            level,
            len,
            "generator created"
        );
        generator
    }

    fn connect_source(&self) {
        let source = self.inner.lock().source.clone();
        let weak = self.self_ref.clone();
        let connection = source.collection_changed().connect(move |change| {
            if let Some(generator) = weak.upgrade() {
                generator.handle_source_change(change);
            }
        });
        self.inner.lock().source_connection = Some(connection);
    }

    fn disconnect_source(&self) {
        let (source, connection) = {
            let mut inner = self.inner.lock();
            (inner.source.clone(), inner.source_connection.take())
        };
        if let Some(connection) = connection {
            source.collection_changed().disconnect(connection);
        }
    }

    /// Entry point for notifications arriving through the source signal.
    ///
    /// The source has already changed, so a change the map cannot apply
    /// leaves it stale; every failure resynchronises with a reset.
    fn handle_source_change(&self, change: &CollectionChange<T>) {
        let Err(err) = self.on_collection_changed(change) else {
            return;
        };
        tracing::error!(
            target: targets::GENERATOR,
            generator = ?self.id,
            %err,
            change = ?change,
            "resynchronising with the items source"
        );
        self.teardown();
        self.inner.lock().last_change = Some(format!("{change:?}"));
        self.items_changed.emit(ItemsChangedEvent::reset());
    }

    // ----- accessors ----------------------------------------------------

    /// Handle of this level in the container store.
    pub fn id(&self) -> GeneratorId {
        self.id
    }

    /// Grouping depth: `0` for the top-level generator.
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn store(&self) -> &Arc<ContainerStore<T>> {
        &self.store
    }

    /// The generator of the level above, for group levels.
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.upgrade()
    }

    pub(super) fn host(&self) -> &Arc<dyn ContainerHost<T>> {
        &self.host
    }

    pub(super) fn self_weak(&self) -> Weak<Self> {
        self.self_ref.clone()
    }

    pub fn options(&self) -> GeneratorOptions {
        self.options
    }

    pub fn status(&self) -> GeneratorStatus {
        self.inner.lock().status
    }

    /// The bound items source.
    pub fn source(&self) -> Arc<dyn ItemsSource<T>> {
        self.inner.lock().source.clone()
    }

    /// Number of items the map accounts for.
    pub fn item_count(&self) -> usize {
        self.inner.lock().chain.total_items()
    }

    /// Number of realized containers at this level.
    pub fn realized_count(&self) -> usize {
        self.inner.lock().chain.realized_count()
    }

    /// Number of containers waiting in the recycle queue.
    pub fn recycle_queue_len(&self) -> usize {
        self.inner.lock().recycle.len()
    }

    pub fn alternation_count(&self) -> usize {
        self.inner.lock().alternation_count
    }

    /// Whether [`release`](Self::release) was called.
    pub fn is_released(&self) -> bool {
        self.inner.lock().state == MapState::Released
    }

    // ----- generation ---------------------------------------------------

    /// Begins a generation pass at `position`.
    ///
    /// With `allow_start_at_realized_item` unset, a position naming a
    /// realized container starts at the item after it (before it, for
    /// backward passes).
    ///
    /// A generator in [`GeneratorStatus::Error`] still hands out cursors but
    /// keeps reporting `Error` until the map is rebuilt by
    /// [`remove_all`](Self::remove_all), a reset of the source or
    /// [`rebind`](Self::rebind).
    ///
    /// # Errors
    ///
    /// - [`GeneratorError::GenerationInProgress`] if a pass is already
    ///   active or the map is being torn down
    /// - [`GeneratorError::InvalidPosition`] if `position` names a container
    ///   that does not exist
    /// - [`GeneratorError::Released`] after [`release`](Self::release)
    pub fn start_at(
        &self,
        position: GeneratorPosition,
        direction: GeneratorDirection,
        allow_start_at_realized_item: bool,
    ) -> Result<GeneratorCursor<'_, T>> {
        let mut effects = Vec::new();
        let id = {
            let mut inner = self.inner.lock();
            inner.ensure_usable()?;
            if inner.active_cursor.is_some() || !inner.is_online() {
                tracing::warn!(
                    target: targets::GENERATOR,
                    generator = ?self.id,
                    "generation pass already in progress"
                );
                return Err(GeneratorError::GenerationInProgress);
            }
            let state = inner
                .chain
                .start_state(position, direction, allow_start_at_realized_item)
                .ok_or_else(|| GeneratorError::invalid_position(position))?;
            let id = inner.chain.add_cursor(state);
            inner.active_cursor = Some(id);
            if inner.status != GeneratorStatus::Error {
                inner.set_status(GeneratorStatus::GeneratingContainers, &mut effects);
            }
            tracing::trace!(
                target: targets::GENERATOR,
                generator = ?self.id,
                %position,
                ?direction,
                start_index = state.item_index,
                exhausted = state.exhausted,
                "generation pass started"
            );
            id
        };
        self.run_effects(effects);
        Ok(GeneratorCursor::new(self, id, direction))
    }

    /// Opens a batch: passes ending inside it leave the status at
    /// `GeneratingContainers` until the last batch guard drops.
    pub fn generate_batches(&self) -> BatchGuard<'_, T> {
        let mut effects = Vec::new();
        {
            let mut inner = self.inner.lock();
            inner.batch_depth += 1;
            if inner.state != MapState::Released && inner.status != GeneratorStatus::Error {
                inner.set_status(GeneratorStatus::GeneratingContainers, &mut effects);
            }
        }
        self.run_effects(effects);
        BatchGuard::new(self)
    }

    pub(super) fn end_batch(&self) {
        let mut effects = Vec::new();
        {
            let mut inner = self.inner.lock();
            inner.batch_depth = inner.batch_depth.saturating_sub(1);
            if inner.batch_depth == 0
                && inner.active_cursor.is_none()
                && inner.status != GeneratorStatus::Error
                && inner.state != MapState::Released
            {
                inner.set_status(GeneratorStatus::ContainersGenerated, &mut effects);
            }
        }
        self.run_effects(effects);
    }

    pub(super) fn end_generation(&self, id: CursorId) {
        let mut effects = Vec::new();
        {
            let mut inner = self.inner.lock();
            inner.chain.remove_cursor(id);
            if inner.active_cursor == Some(id) {
                inner.active_cursor = None;
                if inner.batch_depth == 0
                    && inner.status != GeneratorStatus::Error
                    && inner.state != MapState::Released
                {
                    inner.set_status(GeneratorStatus::ContainersGenerated, &mut effects);
                }
            }
            tracing::trace!(target: targets::GENERATOR, generator = ?self.id, "generation pass ended");
        }
        self.run_effects(effects);
    }

    pub(super) fn cursor_index(&self, id: CursorId) -> Option<usize> {
        self.inner
            .lock()
            .chain
            .cursor(id)
            .filter(|state| !state.exhausted)
            .map(|state| state.item_index)
    }

    pub(super) fn generate_next(
        &self,
        id: CursorId,
        stop_at_realized: bool,
    ) -> Result<Option<GeneratedContainer>> {
        let mut last_index = 0;
        for _ in 0..GENERATE_ATTEMPTS {
            let (index, source, direction) = {
                let mut inner = self.inner.lock();
                inner.ensure_usable()?;
                let Some(state) = inner.chain.cursor(id).filter(|state| !state.exhausted) else {
                    return Ok(None);
                };
                if let Some(entry) = inner.chain.entry_in_block(state.block, state.offset) {
                    if stop_at_realized {
                        return Ok(None);
                    }
                    let container = entry.container;
                    inner.chain.advance_cursor(id);
                    return Ok(Some(GeneratedContainer {
                        container,
                        is_newly_realized: false,
                    }));
                }
                (state.item_index, inner.source.clone(), state.direction)
            };
            last_index = index;

            let Some(item) = source.get(index) else {
                let mut effects = Vec::new();
                self.inner
                    .lock()
                    .set_status(GeneratorStatus::Error, &mut effects);
                tracing::error!(
                    target: targets::GENERATOR,
                    generator = ?self.id,
                    index,
                    source = source.source_name(),
                    "items source has no item where the generator expected one"
                );
                self.run_effects(effects);
                return Err(GeneratorError::MissingItem { index });
            };

            let acquired = self.acquire_container(&item);

            let mut inner = self.inner.lock();
            let target = inner.chain.cursor(id).filter(|state| {
                inner.state != MapState::Released
                    && !state.exhausted
                    && state.item_index == index
                    && inner.chain.entry_in_block(state.block, state.offset).is_none()
            });
            let Some(state) = target else {
                drop(inner);
                tracing::debug!(
                    target: targets::GENERATOR,
                    generator = ?self.id,
                    index,
                    "collection changed while acquiring a container, retrying"
                );
                self.discard_acquired(acquired);
                continue;
            };

            let container = acquired.container;
            self.store.link(container, item.clone(), self.id);
            let (block, offset) = inner.chain.realize(
                state.block,
                state.offset,
                BlockEntry {
                    item: item.clone(),
                    container,
                },
            );
            alternation::assign_realized(
                &inner.chain,
                &self.store,
                inner.alternation_count,
                block,
                offset,
                direction,
            );
            if let (ViewItem::Group(group), Some(slot)) = (&item, acquired.group) {
                let link = self.link_group(group, container, slot);
                inner.groups.push(link);
            }
            inner.chain.advance_cursor(id);
            tracing::trace!(
                target: targets::GENERATOR,
                generator = ?self.id,
                index,
                ?container,
                recycled = acquired.recycled,
                "realized item"
            );
            return Ok(Some(GeneratedContainer {
                container,
                is_newly_realized: acquired.is_new,
            }));
        }
        tracing::warn!(
            target: targets::GENERATOR,
            generator = ?self.id,
            index = last_index,
            "items source kept changing during generation, giving up"
        );
        Err(GeneratorError::SourceUnstable {
            index: last_index,
            attempts: GENERATE_ATTEMPTS,
        })
    }

    /// Gets a container for `item` without holding the generator lock.
    fn acquire_container(&self, item: &ViewItem<T>) -> Acquired<T> {
        match item {
            ViewItem::Item(value) => {
                if self.host.is_item_its_own_container(value) {
                    return Acquired {
                        container: self.store.create(ContainerType::OWN, ContainerRole::OwnContainer),
                        is_new: true,
                        recycled: false,
                        group: None,
                    };
                }
                let container_type = self.host.container_type_for_item(value);
                let recycled = self.inner.lock().recycle.pop(container_type);
                match recycled {
                    Some(container) => Acquired {
                        container,
                        is_new: false,
                        recycled: true,
                        group: None,
                    },
                    None => Acquired {
                        container: self.store.create(container_type, ContainerRole::Item),
                        is_new: true,
                        recycled: false,
                        group: None,
                    },
                }
            }
            ViewItem::Group(group) => {
                let style = self.host.group_style(group, self.level).unwrap_or_default();
                let (container, slot) = self.acquire_group_container(group, style);
                Acquired {
                    container,
                    is_new: true,
                    recycled: false,
                    group: Some(slot),
                }
            }
        }
    }

    fn discard_acquired(&self, acquired: Acquired<T>) {
        if acquired.recycled {
            let container_type = self.store.container_type(acquired.container);
            let pushed = container_type
                .map(|container_type| self.inner.lock().recycle.push(acquired.container, container_type));
            if !matches!(pushed, Some(Ok(()))) {
                self.store.destroy(acquired.container);
            }
        } else {
            self.store.destroy(acquired.container);
        }
        if let Some(child) = acquired.group.and_then(|slot| slot.child) {
            child.release();
        }
    }

    // ----- removal ------------------------------------------------------

    /// Discards `count` realized containers starting at `position`.
    ///
    /// The items become unrealized; no [`items_changed`](Self::items_changed)
    /// notification is raised since the panel asked for it.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::RemoveRequiresOffsetZero`] if `position` is not a
    /// container, [`GeneratorError::InvalidCount`] if `count` is zero and
    /// [`GeneratorError::RangeNotRealized`] if the range runs into an
    /// unrealized item.
    pub fn remove(&self, position: GeneratorPosition, count: usize) -> Result<()> {
        self.remove_range(position, count, false)
    }

    /// Like [`remove`](Self::remove), but keeps the containers for reuse.
    ///
    /// Group containers, placeholders and items that are their own container
    /// are discarded instead.
    ///
    /// # Errors
    ///
    /// Those of [`remove`](Self::remove), plus
    /// [`GeneratorError::HeterogeneousRecycle`] if the containers do not all
    /// share the type of the containers already queued.
    pub fn recycle(&self, position: GeneratorPosition, count: usize) -> Result<()> {
        self.remove_range(position, count, true)
    }

    fn remove_range(&self, position: GeneratorPosition, count: usize, recycle: bool) -> Result<()> {
        let effects = {
            let mut inner = self.inner.lock();
            inner.ensure_usable()?;
            if position.offset != 0 {
                tracing::warn!(target: targets::GENERATOR, %position, "remove requires a container position");
                return Err(GeneratorError::RemoveRequiresOffsetZero { position });
            }
            if count == 0 {
                return Err(GeneratorError::InvalidCount);
            }
            if position.index < 0 {
                return Err(GeneratorError::invalid_position(position));
            }
            let segments = inner
                .chain
                .realized_run(position.index as usize, count)
                .ok_or_else(|| GeneratorError::range_not_realized(position, count))?;

            if recycle {
                let mut queued = inner.recycle.container_type();
                for entry in inner.chain.run_entries(&segments) {
                    if self.store.role(entry.container) != Some(ContainerRole::Item) {
                        continue;
                    }
                    let Some(offered) = self.store.container_type(entry.container) else {
                        continue;
                    };
                    match queued {
                        Some(queued) if queued != offered => {
                            tracing::warn!(
                                target: targets::GENERATOR,
                                %queued,
                                %offered,
                                "refusing to mix container types in the recycle queue"
                            );
                            return Err(GeneratorError::HeterogeneousRecycle { queued, offered });
                        }
                        _ => queued = Some(offered),
                    }
                }
            }

            let removed = inner.chain.unrealize_run(&segments);
            let mut effects = Vec::with_capacity(removed.len());
            for entry in removed {
                let role = self.store.role(entry.container);
                if let Some(link) = inner.take_group_link(entry.container) {
                    link.release(&mut effects);
                }
                let disposal = if recycle && role.is_some_and(ContainerRole::is_recyclable) {
                    Disposal::Recycle
                } else {
                    Disposal::Destroy
                };
                effects.push(Effect::Clear {
                    container: entry.container,
                    item: Some(entry.item),
                    disposal,
                });
            }
            tracing::debug!(
                target: targets::GENERATOR,
                generator = ?self.id,
                %position,
                count,
                recycle,
                "unrealized containers"
            );
            effects
        };
        self.run_effects(effects);
        Ok(())
    }

    /// Discards every container and rebuilds the map as one unrealized run
    /// over the current source.
    pub fn remove_all(&self) {
        self.teardown();
    }

    pub(super) fn teardown(&self) {
        let _span = PerfSpan::new(span_names::REMOVE_ALL);
        let source = {
            let inner = self.inner.lock();
            if inner.state == MapState::Released {
                return;
            }
            inner.source.clone()
        };
        let len = source.len();

        let (effects, queued) = {
            let mut inner = self.inner.lock();
            if inner.state == MapState::Released {
                return;
            }
            inner.enter_offline();
            let drained = inner.chain.reset(len);
            let mut effects = Vec::with_capacity(drained.len() + 1);
            if inner.status == GeneratorStatus::Error {
                inner.set_status(GeneratorStatus::NotStarted, &mut effects);
            }
            for link in std::mem::take(&mut inner.groups) {
                link.release(&mut effects);
            }
            for entry in drained {
                effects.push(Effect::Clear {
                    container: entry.container,
                    item: Some(entry.item),
                    disposal: Disposal::Destroy,
                });
            }
            inner.search_hint = 0;
            (effects, inner.recycle.drain())
        };
        tracing::debug!(
            target: targets::GENERATOR,
            generator = ?self.id,
            len,
            cleared = effects.len(),
            "removing all containers"
        );

        for container in queued {
            self.store.destroy(container);
        }
        self.run_effects(effects);
        self.inner.lock().leave_offline();
    }

    /// Tears this level down for good.
    ///
    /// Every container is cleared and destroyed, the source and group
    /// watchers are disconnected and the level leaves the store. Later
    /// mutations fail with [`GeneratorError::Released`]; queries return
    /// `None`.
    pub fn release(&self) {
        if self.is_released() {
            return;
        }
        self.disconnect_source();
        self.teardown();
        self.inner.lock().state = MapState::Released;
        self.store.unregister_generator(self.id);
        tracing::debug!(target: targets::GENERATOR, generator = ?self.id, "generator released");
    }

    /// Rebinds to the current source from scratch and announces a reset.
    pub fn refresh(&self) -> Result<()> {
        let source = self.source();
        self.rebind(source)
    }

    /// Binds to `source`, discarding every container, and announces a reset.
    pub fn rebind(&self, source: Arc<dyn ItemsSource<T>>) -> Result<()> {
        self.inner.lock().ensure_usable()?;
        self.disconnect_source();
        {
            let mut inner = self.inner.lock();
            inner.source = source.clone();
            inner.last_change = None;
        }
        self.connect_source();
        self.teardown();
        if self.level == 0 {
            self.host.set_is_grouping(source.is_grouped());
        }
        self.change_alternation_count();
        tracing::debug!(
            target: targets::GENERATOR,
            generator = ?self.id,
            source = source.source_name(),
            len = source.len(),
            "generator rebound"
        );
        self.items_changed.emit(ItemsChangedEvent::reset());
        Ok(())
    }

    /// Rereads the alternation count from the host and restamps every
    /// realized container, then does the same for the subgroup levels.
    pub fn change_alternation_count(&self) {
        let source = self.source();
        let count = alternation_count_for(self.host.as_ref(), source.as_ref(), self.level);
        let children = {
            let mut inner = self.inner.lock();
            if inner.state == MapState::Released {
                return;
            }
            if inner.alternation_count != count {
                inner.alternation_count = count;
                alternation::reset_all(&inner.chain, &self.store, count);
            }
            inner.group_children()
        };
        for (_, child) in children {
            child.change_alternation_count();
        }
    }

    // ----- lookups ------------------------------------------------------

    /// Position of the item at `index`; `None` if out of range or offline.
    pub fn generator_position_from_index(&self, index: usize) -> Option<GeneratorPosition> {
        let inner = self.inner.lock();
        if !inner.is_online() || index >= inner.chain.total_items() {
            return None;
        }
        Some(inner.chain.position_from_index(index))
    }

    /// Item index designated by `position`; `None` if out of range or offline.
    pub fn index_from_generator_position(&self, position: GeneratorPosition) -> Option<usize> {
        let inner = self.inner.lock();
        if !inner.is_online() {
            return None;
        }
        inner.chain.index_from_position(position)
    }

    /// The item linked to `container`.
    pub fn item_from_container(&self, container: ContainerId) -> Option<ViewItem<T>> {
        if !self.inner.lock().is_online() {
            return None;
        }
        self.store.item(container)
    }

    /// The realized container of `item`, searching subgroup levels too.
    pub fn container_from_item(&self, item: &ViewItem<T>) -> Option<ContainerId> {
        let children = {
            let mut inner = self.inner.lock();
            if !inner.is_online() {
                return None;
            }
            if let Some((_, container)) = self.find_realized(&mut inner, |entry| entry.item == *item) {
                return Some(container);
            }
            inner.group_children()
        };
        children
            .into_iter()
            .find_map(|(_, child)| child.container_from_item(item))
    }

    /// Index of `container`: local when it belongs to this level, flattened
    /// over the leaf items when it belongs to a subgroup level.
    pub fn index_from_container(&self, container: ContainerId) -> Option<usize> {
        let (children, source) = {
            let mut inner = self.inner.lock();
            if !inner.is_online() {
                return None;
            }
            if let Some((index, _)) = self.find_realized(&mut inner, |entry| entry.container == container) {
                return Some(index);
            }
            (inner.group_children(), inner.source.clone())
        };
        for (group, child) in children {
            if let Some(local) = child.index_from_container(container) {
                return leaf_offset(source.as_ref(), &group).map(|offset| offset + local);
            }
        }
        None
    }

    /// Container of the item at `index`, a flattened leaf index when the
    /// source is grouped.
    pub fn container_from_index(&self, index: usize) -> Option<ContainerId> {
        let (source, children) = {
            let inner = self.inner.lock();
            if !inner.is_online() {
                return None;
            }
            if !inner.source.is_grouped() {
                return inner.chain.entry_at(index).map(|entry| entry.container);
            }
            (inner.source.clone(), inner.group_children())
        };
        let mut remaining = index;
        for position in 0..source.len() {
            match source.get(position)? {
                ViewItem::Group(group) => {
                    let leaves = group.leaf_count();
                    if remaining < leaves {
                        return children
                            .iter()
                            .find(|(candidate, _)| Arc::ptr_eq(candidate, &group))
                            .and_then(|(_, child)| child.container_from_index(remaining));
                    }
                    remaining -= leaves;
                }
                ViewItem::Item(_) => {
                    if remaining == 0 {
                        let inner = self.inner.lock();
                        return inner.chain.entry_at(position).map(|entry| entry.container);
                    }
                    remaining -= 1;
                }
            }
        }
        None
    }

    /// Searches realized entries starting near the last hit, wrapping around.
    fn find_realized(
        &self,
        inner: &mut GeneratorInner<T>,
        predicate: impl Fn(&BlockEntry<T>) -> bool,
    ) -> Option<(usize, ContainerId)> {
        let hint = if self.options.search_hint {
            inner.search_hint
        } else {
            0
        };
        let found = inner
            .chain
            .realized_from(hint)
            .find(|(_, entry)| predicate(*entry))
            .or_else(|| {
                inner
                    .chain
                    .realized_from(0)
                    .take_while(|(slot, _)| slot.index < hint)
                    .find(|(_, entry)| predicate(*entry))
            })
            .map(|(slot, entry)| (slot.index, entry.container));
        if let Some((index, _)) = found {
            inner.search_hint = index;
        }
        found
    }

    /// Lets the host finish a container after the panel attached it.
    ///
    /// Returns `false` if `container` is not linked to an item.
    pub fn prepare_item_container(&self, container: ContainerId) -> bool {
        let Some(item) = self.store.item(container) else {
            return false;
        };
        if let ViewItem::Item(value) = &item {
            self.host.prepare_item_container(container, value);
        }
        self.store.set_prepared(container, true);
        true
    }

    // ----- effects ------------------------------------------------------

    pub(super) fn run_effects(&self, effects: Vec<Effect<T>>) {
        for effect in effects {
            match effect {
                Effect::Clear {
                    container,
                    item,
                    disposal,
                } => {
                    self.host
                        .clear_container_for_item(container, item.as_ref().and_then(ViewItem::as_item));
                    match disposal {
                        Disposal::Destroy => {
                            self.store.destroy(container);
                        }
                        Disposal::Keep => self.store.set_prepared(container, false),
                        Disposal::Recycle => self.enqueue_recycled(container),
                    }
                }
                Effect::Prepare(container) => {
                    self.prepare_item_container(container);
                }
                Effect::ItemsChanged(event) => self.items_changed.emit(event),
                Effect::StatusChanged(status) => self.status_changed.emit(status),
                Effect::ReleaseChild(child) => child.release(),
            }
        }
    }

    fn enqueue_recycled(&self, container: ContainerId) {
        let container_type = self.store.container_type(container);
        self.store.unlink(container);
        let pushed = {
            let mut inner = self.inner.lock();
            match (inner.state, container_type) {
                (MapState::Released, _) | (_, None) => None,
                (_, Some(container_type)) => Some(inner.recycle.push(container, container_type)),
            }
        };
        match pushed {
            Some(Ok(())) => {}
            Some(Err(err)) => {
                tracing::warn!(target: targets::GENERATOR, %err, "discarding container instead of recycling it");
                self.store.destroy(container);
            }
            None => {
                self.store.destroy(container);
            }
        }
    }
}

impl<T: ItemValue> Drop for ItemContainerGenerator<T> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if let Some(connection) = inner.source_connection.take() {
            inner.source.collection_changed().disconnect(connection);
        }
        for link in inner.groups.drain(..) {
            if let Some(connection) = link.connection {
                link.group.collection_changed().disconnect(connection);
            }
        }
        self.store.unregister_generator(self.id);
    }
}

impl<T: ItemValue> std::fmt::Debug for ItemContainerGenerator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ItemContainerGenerator")
            .field("id", &self.id)
            .field("level", &self.level)
            .field("state", &inner.state)
            .field("status", &inner.status)
            .field("items", &inner.chain.total_items())
            .field("realized", &inner.chain.realized_count())
            .finish_non_exhaustive()
    }
}

fn alternation_count_for<T: ItemValue>(
    host: &dyn ContainerHost<T>,
    source: &dyn ItemsSource<T>,
    level: usize,
) -> usize {
    if source.is_grouped() {
        host.group_alternation_count(level)
    } else {
        host.alternation_count()
    }
}

/// Number of leaf items before `group` in `source`.
fn leaf_offset<T: ItemValue>(source: &dyn ItemsSource<T>, group: &Arc<CollectionGroup<T>>) -> Option<usize> {
    let mut offset = 0;
    for index in 0..source.len() {
        match source.get(index)? {
            ViewItem::Group(candidate) if Arc::ptr_eq(&candidate, group) => return Some(offset),
            ViewItem::Group(candidate) => offset += candidate.leaf_count(),
            ViewItem::Item(_) => offset += 1,
        }
    }
    None
}

static_assertions::assert_impl_all!(ItemContainerGenerator<String>: Send, Sync);
