//! The block chain: a run-length encoded map from item indices to containers.
//!
//! Blocks live in a slotmap arena and form a circular doubly linked list
//! anchored at a header sentinel. Each block is either an unrealized run
//! (just a count) or a realized block of up to [`BLOCK_SIZE`] item/container
//! entries.
//!
//! Cursors of active generation passes are stored next to the blocks. Every
//! structural edit reports what it did as a [`MapChange`] right after doing
//! it, and each cursor is adjusted on the spot:
//!
//! - `Moved`: entries changed block and/or offset but kept their item index
//! - `Inserted` / `Removed`: one item appeared or disappeared
//! - `Reset`: the chain was rebuilt from scratch
//!
//! Invariants kept by every operation:
//!
//! - block counts sum to the length of the bound collection
//! - no two unrealized blocks are adjacent
//! - every realized block holds between 1 and `BLOCK_SIZE` entries
//! - the header holds nothing

use std::fmt;

use slotmap::{SlotMap, new_key_type};

use crate::collection::ViewItem;

use super::container::ContainerId;
use super::position::{GeneratorDirection, GeneratorPosition};

/// Maximum number of entries in a realized block.
pub const BLOCK_SIZE: usize = 16;

new_key_type! {
    pub(crate) struct BlockId;
    pub(crate) struct CursorId;
}

/// A realized item and its container.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BlockEntry<T> {
    pub item: ViewItem<T>,
    pub container: ContainerId,
}

enum BlockKind<T> {
    Header,
    Unrealized { count: usize },
    Realized { entries: Vec<BlockEntry<T>> },
}

struct ItemBlock<T> {
    prev: BlockId,
    next: BlockId,
    kind: BlockKind<T>,
}

impl<T> ItemBlock<T> {
    fn item_count(&self) -> usize {
        match &self.kind {
            BlockKind::Header => 0,
            BlockKind::Unrealized { count } => *count,
            BlockKind::Realized { entries } => entries.len(),
        }
    }
}

/// Public summary of one block, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockSummary<T> {
    Unrealized(usize),
    Realized(Vec<ViewItem<T>>),
}

/// Cached walk state of a generation pass.
///
/// `count` is the number of items in the blocks before `block`, so
/// `item_index == count + offset` while the cursor is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CursorState {
    pub block: BlockId,
    pub offset: usize,
    pub count: usize,
    pub item_index: usize,
    pub direction: GeneratorDirection,
    pub exhausted: bool,
}

/// Structural edit report delivered to cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MapChange {
    Moved {
        from: BlockId,
        from_offset: usize,
        count: usize,
        to: BlockId,
        to_offset: usize,
        count_delta: isize,
    },
    Inserted {
        block: BlockId,
        index: usize,
    },
    Removed {
        block: BlockId,
        index: usize,
    },
    Reset,
}

impl MapChange {
    /// Entries keep their item index across a move, so the change in the
    /// number of items before the cursor's block follows from the offsets.
    fn moved(from: BlockId, from_offset: usize, count: usize, to: BlockId, to_offset: usize) -> Self {
        Self::Moved {
            from,
            from_offset,
            count,
            to,
            to_offset,
            count_delta: from_offset as isize - to_offset as isize,
        }
    }
}

/// Where an item index lands in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Location {
    pub block: BlockId,
    pub offset: usize,
    /// Items before `block`.
    pub count: usize,
}

/// A realized entry yielded by [`BlockChain::realized_from`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RealizedSlot {
    pub index: usize,
    pub ordinal: usize,
}

pub(crate) struct BlockChain<T> {
    blocks: SlotMap<BlockId, ItemBlock<T>>,
    header: BlockId,
    cursors: SlotMap<CursorId, CursorState>,
}

impl<T: Clone> BlockChain<T> {
    /// Creates a chain with one unrealized block of `len` items.
    pub fn new(len: usize) -> Self {
        let mut blocks = SlotMap::with_key();
        let header = blocks.insert_with_key(|key| ItemBlock {
            prev: key,
            next: key,
            kind: BlockKind::Header,
        });
        let mut chain = Self {
            blocks,
            header,
            cursors: SlotMap::with_key(),
        };
        if len > 0 {
            chain.link_after(header, BlockKind::Unrealized { count: len });
        }
        chain
    }

    // ----- links -------------------------------------------------------

    fn next(&self, block: BlockId) -> BlockId {
        self.blocks[block].next
    }

    fn prev(&self, block: BlockId) -> BlockId {
        self.blocks[block].prev
    }

    fn item_count(&self, block: BlockId) -> usize {
        self.blocks[block].item_count()
    }

    fn is_unrealized(&self, block: BlockId) -> bool {
        matches!(self.blocks[block].kind, BlockKind::Unrealized { .. })
    }

    /// Entry count of a realized block, `None` for other kinds.
    fn realized_len(&self, block: BlockId) -> Option<usize> {
        match &self.blocks[block].kind {
            BlockKind::Realized { entries } => Some(entries.len()),
            _ => None,
        }
    }

    fn entries_mut(&mut self, block: BlockId) -> &mut Vec<BlockEntry<T>> {
        match &mut self.blocks[block].kind {
            BlockKind::Realized { entries } => entries,
            _ => unreachable!("block is not realized"),
        }
    }

    fn set_unrealized_count(&mut self, block: BlockId, value: usize) {
        if let BlockKind::Unrealized { count } = &mut self.blocks[block].kind {
            *count = value;
        } else {
            debug_assert!(false, "block is not unrealized");
        }
    }

    fn link_after(&mut self, anchor: BlockId, kind: BlockKind<T>) -> BlockId {
        let next = self.next(anchor);
        let block = self.blocks.insert(ItemBlock {
            prev: anchor,
            next,
            kind,
        });
        self.blocks[anchor].next = block;
        self.blocks[next].prev = block;
        block
    }

    fn link_before(&mut self, anchor: BlockId, kind: BlockKind<T>) -> BlockId {
        let prev = self.prev(anchor);
        self.link_after(prev, kind)
    }

    fn unlink(&mut self, block: BlockId) {
        debug_assert_ne!(block, self.header);
        if let Some(removed) = self.blocks.remove(block) {
            self.blocks[removed.prev].next = removed.next;
            self.blocks[removed.next].prev = removed.prev;
        }
    }

    fn block_ids(&self) -> BlockIds<'_, T> {
        BlockIds {
            chain: self,
            block: self.next(self.header),
        }
    }

    // ----- queries -----------------------------------------------------

    /// Sum of all block counts.
    pub fn total_items(&self) -> usize {
        self.block_ids().map(|block| self.item_count(block)).sum()
    }

    /// Number of realized entries.
    pub fn realized_count(&self) -> usize {
        self.block_ids()
            .filter_map(|block| self.realized_len(block))
            .sum()
    }

    pub fn locate(&self, index: usize) -> Option<Location> {
        let mut count = 0;
        for block in self.block_ids() {
            let len = self.item_count(block);
            if index < count + len {
                return Some(Location {
                    block,
                    offset: index - count,
                    count,
                });
            }
            count += len;
        }
        None
    }

    pub fn entry_at(&self, index: usize) -> Option<&BlockEntry<T>> {
        let location = self.locate(index)?;
        match &self.blocks[location.block].kind {
            BlockKind::Realized { entries } => entries.get(location.offset),
            _ => None,
        }
    }

    pub fn entry_in_block(&self, block: BlockId, offset: usize) -> Option<&BlockEntry<T>> {
        match &self.blocks.get(block)?.kind {
            BlockKind::Realized { entries } => entries.get(offset),
            _ => None,
        }
    }

    /// Item index of the realized container with the given ordinal.
    pub fn index_of_ordinal(&self, ordinal: usize) -> Option<usize> {
        self.location_of_ordinal(ordinal)
            .map(|location| location.count + location.offset)
    }

    fn location_of_ordinal(&self, mut ordinal: usize) -> Option<Location> {
        let mut count = 0;
        for block in self.block_ids() {
            let len = self.item_count(block);
            if let Some(realized) = self.realized_len(block) {
                if ordinal < realized {
                    return Some(Location {
                        block,
                        offset: ordinal,
                        count,
                    });
                }
                ordinal -= realized;
            }
            count += len;
        }
        None
    }

    pub fn position_from_index(&self, index: usize) -> GeneratorPosition {
        let mut ordinal: isize = -1;
        let mut last_realized: isize = -1;
        let mut count = 0;
        for block in self.block_ids() {
            let len = self.item_count(block);
            let realized = self.realized_len(block).is_some();
            if index < count + len {
                let offset = (index - count) as isize;
                return if realized {
                    GeneratorPosition::new(ordinal + 1 + offset, 0)
                } else {
                    GeneratorPosition::new(ordinal, index as isize - last_realized)
                };
            }
            if realized {
                ordinal += len as isize;
                last_realized = (count + len) as isize - 1;
            }
            count += len;
        }
        GeneratorPosition::new(ordinal, index as isize - last_realized)
    }

    /// Item index designated by `position`, without range checks.
    ///
    /// `None` when `position.index` names a container that does not exist.
    pub fn raw_index_from_position(&self, position: GeneratorPosition) -> Option<isize> {
        match position.index {
            -1 if position.offset >= 0 => Some(position.offset - 1),
            -1 => Some(self.total_items() as isize + position.offset),
            ordinal if ordinal >= 0 => self
                .index_of_ordinal(ordinal as usize)
                .map(|index| index as isize + position.offset),
            _ => None,
        }
    }

    pub fn index_from_position(&self, position: GeneratorPosition) -> Option<usize> {
        let raw = self.raw_index_from_position(position)?;
        (raw >= 0 && (raw as usize) < self.total_items()).then_some(raw as usize)
    }

    /// Realized entries in index order, starting with the block holding `index`.
    pub fn realized_from(&self, index: usize) -> RealizedEntries<'_, T> {
        let mut walk = RealizedEntries {
            chain: self,
            block: self.next(self.header),
            offset: 0,
            count: 0,
            ordinal: 0,
        };
        while walk.block != self.header {
            let len = self.item_count(walk.block);
            if index < walk.count + len {
                break;
            }
            walk.count += len;
            walk.ordinal += self.realized_len(walk.block).unwrap_or(0);
            walk.block = self.next(walk.block);
        }
        walk
    }

    /// Nearest realized container strictly before `(block, offset)`.
    pub fn realized_before(&self, block: BlockId, offset: usize) -> Option<ContainerId> {
        if offset > 0 {
            if let Some(entry) = self.entry_in_block(block, offset - 1) {
                return Some(entry.container);
            }
        }
        let mut current = self.prev(block);
        while current != self.header {
            if let BlockKind::Realized { entries } = &self.blocks[current].kind {
                if let Some(entry) = entries.last() {
                    return Some(entry.container);
                }
            }
            current = self.prev(current);
        }
        None
    }

    /// Realized containers strictly after `(block, offset)`, in index order.
    pub fn realized_after(&self, block: BlockId, offset: usize) -> RealizedNeighbours<'_, T> {
        let entries = self.realized_slice(block);
        RealizedNeighbours {
            chain: self,
            block,
            entries: entries.get(offset + 1..).unwrap_or_default().iter(),
            direction: GeneratorDirection::Forward,
        }
    }

    /// Realized containers strictly before `(block, offset)`, nearest first.
    pub fn realized_preceding(&self, block: BlockId, offset: usize) -> RealizedNeighbours<'_, T> {
        let entries = self.realized_slice(block);
        RealizedNeighbours {
            chain: self,
            block,
            entries: entries[..offset.min(entries.len())].iter(),
            direction: GeneratorDirection::Backward,
        }
    }

    fn realized_slice(&self, block: BlockId) -> &[BlockEntry<T>] {
        match &self.blocks[block].kind {
            BlockKind::Realized { entries } => entries,
            _ => &[],
        }
    }

    pub fn summary(&self) -> Vec<BlockSummary<T>> {
        self.block_ids()
            .map(|block| match &self.blocks[block].kind {
                BlockKind::Realized { entries } => {
                    BlockSummary::Realized(entries.iter().map(|entry| entry.item.clone()).collect())
                }
                _ => BlockSummary::Unrealized(self.item_count(block)),
            })
            .collect()
    }

    /// Violations of the chain invariants, as human-readable descriptions.
    pub fn structural_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut previous_unrealized = false;
        for (position, block) in self.block_ids().enumerate() {
            let node = &self.blocks[block];
            if self.blocks[node.next].prev != block || self.blocks[node.prev].next != block {
                problems.push(format!("block {position} has broken links"));
            }
            match &node.kind {
                BlockKind::Header => problems.push(format!("block {position} is a second header")),
                BlockKind::Unrealized { count } => {
                    if *count == 0 {
                        problems.push(format!("unrealized block {position} is empty"));
                    }
                    if previous_unrealized {
                        problems.push(format!("unrealized block {position} follows another one"));
                    }
                }
                BlockKind::Realized { entries } => {
                    if entries.is_empty() || entries.len() > BLOCK_SIZE {
                        problems.push(format!(
                            "realized block {position} holds {} entries",
                            entries.len()
                        ));
                    }
                }
            }
            previous_unrealized = self.is_unrealized(block);
        }
        problems
    }

    // ----- cursors -----------------------------------------------------

    pub fn add_cursor(&mut self, state: CursorState) -> CursorId {
        self.cursors.insert(state)
    }

    pub fn remove_cursor(&mut self, id: CursorId) {
        self.cursors.remove(id);
    }

    pub fn cursor(&self, id: CursorId) -> Option<CursorState> {
        self.cursors.get(id).copied()
    }

    /// Initial cursor state for a pass starting at `position`.
    ///
    /// `None` when `position` names a container that does not exist.
    pub fn start_state(
        &self,
        position: GeneratorPosition,
        direction: GeneratorDirection,
        allow_start_at_realized: bool,
    ) -> Option<CursorState> {
        let total = self.total_items() as isize;
        let target = if position == GeneratorPosition::start() {
            match direction {
                GeneratorDirection::Forward => 0,
                GeneratorDirection::Backward => total - 1,
            }
        } else {
            let mut adjusted = position;
            if adjusted.offset == 0 && !allow_start_at_realized {
                adjusted.offset += direction.step();
            }
            self.raw_index_from_position(adjusted)?
        };

        let exhausted = CursorState {
            block: self.header,
            offset: 0,
            count: 0,
            item_index: 0,
            direction,
            exhausted: true,
        };
        if target < 0 || target >= total {
            return Some(exhausted);
        }
        let index = target as usize;
        Some(match self.locate(index) {
            Some(location) => CursorState {
                block: location.block,
                offset: location.offset,
                count: location.count,
                item_index: index,
                direction,
                exhausted: false,
            },
            None => exhausted,
        })
    }

    /// Steps a cursor one item in its direction.
    pub fn advance_cursor(&mut self, id: CursorId) {
        let Some(mut state) = self.cursor(id) else {
            return;
        };
        if state.exhausted {
            return;
        }
        match state.direction {
            GeneratorDirection::Forward => {
                state.offset += 1;
                state.item_index += 1;
                self.normalize_forward(&mut state);
            }
            GeneratorDirection::Backward => self.step_back(&mut state),
        }
        self.cursors[id] = state;
    }

    /// Moves a cursor whose offset ran past its block to the next item.
    fn normalize_forward(&self, state: &mut CursorState) {
        while state.block != self.header && state.offset >= self.item_count(state.block) {
            let len = self.item_count(state.block);
            state.offset -= len;
            state.count += len;
            state.block = self.next(state.block);
        }
        if state.block == self.header {
            state.exhausted = true;
        }
    }

    /// Moves a cursor to the previous item.
    fn step_back(&self, state: &mut CursorState) {
        if state.item_index == 0 {
            state.exhausted = true;
            return;
        }
        state.item_index -= 1;
        if state.offset > 0 {
            state.offset -= 1;
            return;
        }
        let mut block = self.prev(state.block);
        while block != self.header && self.item_count(block) == 0 {
            block = self.prev(block);
        }
        if block == self.header {
            state.exhausted = true;
            return;
        }
        let len = self.item_count(block);
        state.block = block;
        state.count -= len;
        state.offset = len - 1;
    }

    fn notify(&mut self, change: MapChange) {
        let ids: Vec<CursorId> = self.cursors.keys().collect();
        for id in ids {
            let mut state = self.cursors[id];
            self.adjust_cursor(&mut state, change);
            self.cursors[id] = state;
        }
    }

    fn adjust_cursor(&self, state: &mut CursorState, change: MapChange) {
        if state.exhausted {
            return;
        }
        match change {
            MapChange::Moved {
                from,
                from_offset,
                count,
                to,
                to_offset,
                count_delta,
            } => {
                if state.block == from
                    && state.offset >= from_offset
                    && state.offset < from_offset + count
                {
                    state.block = to;
                    state.offset = state.offset - from_offset + to_offset;
                    state.count = (state.count as isize + count_delta) as usize;
                }
            }
            MapChange::Inserted { block, index } => {
                if index <= state.item_index {
                    state.item_index += 1;
                    if block == state.block {
                        state.offset += 1;
                    } else {
                        state.count += 1;
                    }
                }
            }
            MapChange::Removed { block, index } => {
                if index < state.item_index {
                    state.item_index -= 1;
                    if block == state.block {
                        state.offset -= 1;
                    } else {
                        state.count -= 1;
                    }
                } else if index == state.item_index {
                    match state.direction {
                        GeneratorDirection::Forward => self.normalize_forward(state),
                        GeneratorDirection::Backward => self.step_back(state),
                    }
                }
            }
            MapChange::Reset => {
                let total = self.total_items();
                let target = match state.direction {
                    GeneratorDirection::Forward => {
                        (state.item_index < total).then_some(state.item_index)
                    }
                    GeneratorDirection::Backward => {
                        (total > 0).then(|| state.item_index.min(total - 1))
                    }
                };
                match target.and_then(|index| self.locate(index).map(|loc| (index, loc))) {
                    Some((index, location)) => {
                        state.block = location.block;
                        state.offset = location.offset;
                        state.count = location.count;
                        state.item_index = index;
                    }
                    None => {
                        state.block = self.header;
                        state.offset = 0;
                        state.exhausted = true;
                    }
                }
            }
        }
    }

    // ----- structural edits -------------------------------------------

    /// Turns the unrealized item at `(block, offset)` into a realized entry.
    ///
    /// Prefers appending to the previous realized block when the item is the
    /// first of its run, then prepending to the next realized block when it
    /// is the last, and otherwise allocates a single-entry realized block.
    /// Returns where the entry ended up.
    pub fn realize(&mut self, block: BlockId, offset: usize, entry: BlockEntry<T>) -> (BlockId, usize) {
        let count = self.item_count(block);
        debug_assert!(self.is_unrealized(block) && offset < count);
        let prev = self.prev(block);
        let next = self.next(block);

        if offset == 0 {
            if let Some(len) = self.realized_len(prev).filter(|&len| len < BLOCK_SIZE) {
                self.entries_mut(prev).push(entry);
                self.set_unrealized_count(block, count - 1);
                self.notify(MapChange::moved(block, 0, 1, prev, len));
                self.shift_run_left(block, count);
                return (prev, len);
            }
        }

        if offset == count - 1 {
            if let Some(len) = self.realized_len(next).filter(|&len| len < BLOCK_SIZE) {
                self.entries_mut(next).insert(0, entry);
                self.set_unrealized_count(block, count - 1);
                self.notify(MapChange::moved(next, 0, len, next, 1));
                self.notify(MapChange::moved(block, offset, 1, next, 0));
                if count == 1 {
                    self.unlink(block);
                }
                return (next, 0);
            }
        }

        let entries = vec![entry];
        if offset == 0 {
            let realized = self.link_before(block, BlockKind::Realized { entries });
            self.set_unrealized_count(block, count - 1);
            self.notify(MapChange::moved(block, 0, 1, realized, 0));
            self.shift_run_left(block, count);
            (realized, 0)
        } else if offset == count - 1 {
            let realized = self.link_after(block, BlockKind::Realized { entries });
            self.set_unrealized_count(block, count - 1);
            self.notify(MapChange::moved(block, offset, 1, realized, 0));
            (realized, 0)
        } else {
            let realized = self.link_after(block, BlockKind::Realized { entries });
            let rest = count - offset - 1;
            let tail = self.link_after(realized, BlockKind::Unrealized { count: rest });
            self.set_unrealized_count(block, offset);
            self.notify(MapChange::moved(block, offset + 1, rest, tail, 0));
            self.notify(MapChange::moved(block, offset, 1, realized, 0));
            (realized, 0)
        }
    }

    /// After the first item of an unrealized run left it, renumber the rest
    /// of the run or drop the emptied block.
    fn shift_run_left(&mut self, block: BlockId, old_count: usize) {
        if old_count > 1 {
            self.notify(MapChange::moved(block, 1, old_count - 1, block, 0));
        } else {
            self.unlink(block);
        }
    }

    /// Merges `block` with unrealized neighbors. Returns the surviving block.
    fn coalesce(&mut self, block: BlockId) -> BlockId {
        let mut block = block;
        let prev = self.prev(block);
        if self.is_unrealized(block) && self.is_unrealized(prev) {
            let prev_count = self.item_count(prev);
            let count = self.item_count(block);
            self.set_unrealized_count(prev, prev_count + count);
            self.notify(MapChange::moved(block, 0, count, prev, prev_count));
            self.unlink(block);
            block = prev;
        }
        let next = self.next(block);
        if self.is_unrealized(block) && self.is_unrealized(next) {
            let count = self.item_count(block);
            let next_count = self.item_count(next);
            self.set_unrealized_count(block, count + next_count);
            self.notify(MapChange::moved(next, 0, next_count, block, count));
            self.unlink(next);
        }
        block
    }

    /// Turns `count` entries of a realized block back into unrealized items.
    fn unrealize_in_block(&mut self, block: BlockId, offset: usize, count: usize) -> Vec<BlockEntry<T>> {
        let len = self.realized_len(block).unwrap_or(0);
        debug_assert!(count > 0 && offset + count <= len);

        if offset + count < len {
            let tail = self.entries_mut(block).split_off(offset + count);
            let tail_block = self.link_after(block, BlockKind::Realized { entries: tail });
            self.notify(MapChange::moved(block, offset + count, len - offset - count, tail_block, 0));
        }
        let target = if offset > 0 {
            let middle = self.entries_mut(block).split_off(offset);
            let middle_block = self.link_after(block, BlockKind::Realized { entries: middle });
            self.notify(MapChange::moved(block, offset, count, middle_block, 0));
            middle_block
        } else {
            block
        };

        let kind = std::mem::replace(
            &mut self.blocks[target].kind,
            BlockKind::Unrealized { count },
        );
        self.coalesce(target);
        match kind {
            BlockKind::Realized { entries } => entries,
            _ => Vec::new(),
        }
    }

    /// Blocks and offsets covering `count` realized containers starting at
    /// the `ordinal`-th one, or `None` if the run is interrupted by an
    /// unrealized item or the end of the chain.
    pub fn realized_run(&self, ordinal: usize, count: usize) -> Option<Vec<(BlockId, usize, usize)>> {
        let start = self.location_of_ordinal(ordinal)?;
        let mut segments = Vec::new();
        let mut remaining = count;
        let mut block = start.block;
        let mut offset = start.offset;
        while remaining > 0 {
            let len = self.realized_len(block)?;
            let take = remaining.min(len - offset);
            segments.push((block, offset, take));
            remaining -= take;
            block = self.next(block);
            offset = 0;
        }
        Some(segments)
    }

    /// Entries covered by a run from [`realized_run`](Self::realized_run).
    pub fn run_entries(&self, segments: &[(BlockId, usize, usize)]) -> Vec<BlockEntry<T>> {
        segments
            .iter()
            .flat_map(|&(block, offset, count)| {
                (offset..offset + count).filter_map(move |i| self.entry_in_block(block, i).cloned())
            })
            .collect()
    }

    /// Unrealizes a run previously validated with [`realized_run`](Self::realized_run).
    /// Returns the removed entries in index order.
    pub fn unrealize_run(&mut self, segments: &[(BlockId, usize, usize)]) -> Vec<BlockEntry<T>> {
        let mut removed = Vec::new();
        for &(block, offset, count) in segments.iter().rev() {
            let mut entries = self.unrealize_in_block(block, offset, count);
            entries.reverse();
            removed.extend(entries);
        }
        removed.reverse();
        removed
    }

    /// Accounts for an item inserted into the collection at `index`.
    pub fn insert_item(&mut self, index: usize) {
        let Some(location) = self.locate(index) else {
            let last = self.prev(self.header);
            if self.is_unrealized(last) {
                let count = self.item_count(last);
                self.set_unrealized_count(last, count + 1);
                self.notify(MapChange::Inserted { block: last, index });
            } else {
                let block = self.link_before(self.header, BlockKind::Unrealized { count: 1 });
                self.notify(MapChange::Inserted { block, index });
            }
            return;
        };

        let Location { block, offset, .. } = location;
        if self.is_unrealized(block) {
            let count = self.item_count(block);
            self.set_unrealized_count(block, count + 1);
            self.notify(MapChange::Inserted { block, index });
        } else if offset == 0 {
            let prev = self.prev(block);
            if self.is_unrealized(prev) {
                let count = self.item_count(prev);
                self.set_unrealized_count(prev, count + 1);
                self.notify(MapChange::Inserted { block: prev, index });
            } else {
                let inserted = self.link_before(block, BlockKind::Unrealized { count: 1 });
                self.notify(MapChange::Inserted { block: inserted, index });
            }
        } else {
            let len = self.item_count(block);
            let tail = self.entries_mut(block).split_off(offset);
            let tail_block = self.link_after(block, BlockKind::Realized { entries: tail });
            self.notify(MapChange::moved(block, offset, len - offset, tail_block, 0));
            let inserted = self.link_after(block, BlockKind::Unrealized { count: 1 });
            self.notify(MapChange::Inserted { block: inserted, index });
        }
    }

    /// Accounts for the item at `index` leaving the collection.
    ///
    /// Returns the entry if the item was realized.
    pub fn remove_item(&mut self, index: usize) -> Option<BlockEntry<T>> {
        let Location { block, offset, .. } = self.locate(index)?;
        let removed = match &mut self.blocks[block].kind {
            BlockKind::Unrealized { count } => {
                *count -= 1;
                None
            }
            BlockKind::Realized { entries } => Some(entries.remove(offset)),
            BlockKind::Header => None,
        };
        self.notify(MapChange::Removed { block, index });
        if self.item_count(block) == 0 {
            let prev = self.prev(block);
            self.unlink(block);
            self.coalesce(prev);
        }
        removed
    }

    /// Swaps the realized entry at `index` in place.
    pub fn replace_entry(&mut self, index: usize, entry: BlockEntry<T>) -> Option<BlockEntry<T>> {
        let Location { block, offset, .. } = self.locate(index)?;
        match &mut self.blocks[block].kind {
            BlockKind::Realized { entries } => Some(std::mem::replace(&mut entries[offset], entry)),
            _ => None,
        }
    }

    /// Rebuilds the chain as one unrealized block of `len` items.
    ///
    /// Returns the realized entries that were dropped, in index order.
    pub fn reset(&mut self, len: usize) -> Vec<BlockEntry<T>> {
        let mut drained = Vec::new();
        let ids: Vec<BlockId> = self.block_ids().collect();
        for block in ids {
            if let Some(node) = self.blocks.remove(block) {
                if let BlockKind::Realized { entries } = node.kind {
                    drained.extend(entries);
                }
            }
        }
        let header = self.header;
        self.blocks[header].next = header;
        self.blocks[header].prev = header;
        if len > 0 {
            self.link_after(header, BlockKind::Unrealized { count: len });
        }
        self.notify(MapChange::Reset);
        drained
    }
}

struct BlockIds<'a, T> {
    chain: &'a BlockChain<T>,
    block: BlockId,
}

impl<T> Iterator for BlockIds<'_, T> {
    type Item = BlockId;

    fn next(&mut self) -> Option<BlockId> {
        if self.block == self.chain.header {
            return None;
        }
        let current = self.block;
        self.block = self.chain.blocks[current].next;
        Some(current)
    }
}

/// Walk over realized entries in index order.
pub(crate) struct RealizedEntries<'a, T> {
    chain: &'a BlockChain<T>,
    block: BlockId,
    offset: usize,
    count: usize,
    ordinal: usize,
}

impl<'a, T> Iterator for RealizedEntries<'a, T> {
    type Item = (RealizedSlot, &'a BlockEntry<T>);

    fn next(&mut self) -> Option<Self::Item> {
        let chain = self.chain;
        while self.block != chain.header {
            let node = &chain.blocks[self.block];
            match &node.kind {
                BlockKind::Realized { entries } if self.offset < entries.len() => {
                    let slot = RealizedSlot {
                        index: self.count + self.offset,
                        ordinal: self.ordinal,
                    };
                    let entry = &entries[self.offset];
                    self.offset += 1;
                    self.ordinal += 1;
                    return Some((slot, entry));
                }
                _ => {
                    self.count += node.item_count();
                    self.offset = 0;
                    self.block = node.next;
                }
            }
        }
        None
    }
}

/// Lazy walk over the realized containers on one side of a position.
pub(crate) struct RealizedNeighbours<'a, T> {
    chain: &'a BlockChain<T>,
    block: BlockId,
    entries: std::slice::Iter<'a, BlockEntry<T>>,
    direction: GeneratorDirection,
}

impl<T: Clone> Iterator for RealizedNeighbours<'_, T> {
    type Item = ContainerId;

    fn next(&mut self) -> Option<ContainerId> {
        loop {
            let entry = match self.direction {
                GeneratorDirection::Forward => self.entries.next(),
                GeneratorDirection::Backward => self.entries.next_back(),
            };
            if let Some(entry) = entry {
                return Some(entry.container);
            }
            let chain = self.chain;
            if self.block == chain.header {
                return None;
            }
            self.block = match self.direction {
                GeneratorDirection::Forward => chain.next(self.block),
                GeneratorDirection::Backward => chain.prev(self.block),
            };
            self.entries = chain.realized_slice(self.block).iter();
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Display for BlockChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        let mut block = self.blocks[self.header].next;
        let mut first = true;
        while block != self.header {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            let node = &self.blocks[block];
            match &node.kind {
                BlockKind::Unrealized { count } => write!(f, "Unrealized{{{count}}}")?,
                BlockKind::Realized { entries } => {
                    f.write_str("Realized{")?;
                    for (i, entry) in entries.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        match &entry.item {
                            ViewItem::Item(item) => write!(f, "{item:?}")?,
                            ViewItem::Group(group) => write!(f, "<{}>", group.name())?,
                        }
                    }
                    f.write_str("}")?;
                }
                BlockKind::Header => f.write_str("Header")?,
            }
            block = node.next;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn container(n: u64) -> ContainerId {
        ContainerId::from(KeyData::from_ffi((1 << 32) | n))
    }

    fn entry(name: &'static str, n: u64) -> BlockEntry<&'static str> {
        BlockEntry {
            item: ViewItem::Item(name),
            container: container(n),
        }
    }

    fn realize_index(chain: &mut BlockChain<&'static str>, index: usize, name: &'static str) {
        let location = chain.locate(index).unwrap();
        chain.realize(location.block, location.offset, entry(name, index as u64));
    }

    #[test]
    fn test_new_chain() {
        let chain = BlockChain::<&str>::new(5);
        assert_eq!(chain.to_string(), "[Unrealized{5}]");
        assert_eq!(chain.total_items(), 5);
        assert!(BlockChain::<&str>::new(0).to_string() == "[]");
    }

    #[test]
    fn test_sequential_realization_extends_block() {
        let mut chain = BlockChain::<&str>::new(5);
        realize_index(&mut chain, 0, "A");
        assert_eq!(chain.to_string(), r#"[Realized{"A"}, Unrealized{4}]"#);
        realize_index(&mut chain, 1, "B");
        realize_index(&mut chain, 2, "C");
        assert_eq!(chain.to_string(), r#"[Realized{"A", "B", "C"}, Unrealized{2}]"#);
        assert!(chain.structural_problems().is_empty());
    }

    #[test]
    fn test_backward_realization_prepends() {
        let mut chain = BlockChain::<&str>::new(5);
        realize_index(&mut chain, 4, "E");
        realize_index(&mut chain, 3, "D");
        assert_eq!(chain.to_string(), r#"[Unrealized{3}, Realized{"D", "E"}]"#);
    }

    #[test]
    fn test_middle_realization_splits_run() {
        let mut chain = BlockChain::<&str>::new(5);
        realize_index(&mut chain, 2, "C");
        assert_eq!(
            chain.to_string(),
            r#"[Unrealized{2}, Realized{"C"}, Unrealized{2}]"#
        );
        realize_index(&mut chain, 3, "D");
        realize_index(&mut chain, 1, "B");
        assert_eq!(
            chain.to_string(),
            r#"[Unrealized{1}, Realized{"B", "C", "D"}, Unrealized{1}]"#
        );
    }

    #[test]
    fn test_full_block_starts_new_one() {
        let mut chain = BlockChain::<&str>::new(BLOCK_SIZE + 2);
        for i in 0..=BLOCK_SIZE {
            realize_index(&mut chain, i, "x");
        }
        let summary = chain.summary();
        assert_eq!(summary.len(), 3);
        assert!(matches!(&summary[0], BlockSummary::Realized(items) if items.len() == BLOCK_SIZE));
        assert!(matches!(&summary[1], BlockSummary::Realized(items) if items.len() == 1));
        assert_eq!(summary[2], BlockSummary::Unrealized(1));
    }

    #[test]
    fn test_remove_and_insert_scenario() {
        let mut chain = BlockChain::<&str>::new(5);
        realize_index(&mut chain, 0, "A");
        realize_index(&mut chain, 1, "B");
        realize_index(&mut chain, 2, "C");

        let removed = chain.remove_item(1).unwrap();
        assert_eq!(removed.item, ViewItem::Item("B"));
        assert_eq!(chain.to_string(), r#"[Realized{"A", "C"}, Unrealized{2}]"#);

        chain.insert_item(1);
        assert_eq!(
            chain.to_string(),
            r#"[Realized{"A"}, Unrealized{1}, Realized{"C"}, Unrealized{2}]"#
        );
        assert_eq!(chain.total_items(), 5);
        assert!(chain.structural_problems().is_empty());
    }

    #[test]
    fn test_remove_last_unrealized_coalesces() {
        let mut chain = BlockChain::<&str>::new(3);
        realize_index(&mut chain, 1, "B");
        assert_eq!(chain.remove_item(1).unwrap().item, ViewItem::Item("B"));
        assert_eq!(chain.to_string(), "[Unrealized{2}]");
    }

    #[test]
    fn test_positions() {
        let mut chain = BlockChain::<&str>::new(6);
        realize_index(&mut chain, 1, "B");
        realize_index(&mut chain, 2, "C");
        realize_index(&mut chain, 4, "E");

        assert_eq!(chain.position_from_index(0), GeneratorPosition::new(-1, 1));
        assert_eq!(chain.position_from_index(1), GeneratorPosition::new(0, 0));
        assert_eq!(chain.position_from_index(2), GeneratorPosition::new(1, 0));
        assert_eq!(chain.position_from_index(3), GeneratorPosition::new(1, 1));
        assert_eq!(chain.position_from_index(4), GeneratorPosition::new(2, 0));
        assert_eq!(chain.position_from_index(5), GeneratorPosition::new(2, 1));

        for index in 0..6 {
            let position = chain.position_from_index(index);
            assert_eq!(chain.index_from_position(position), Some(index));
        }
        assert_eq!(chain.index_from_position(GeneratorPosition::new(-1, -1)), Some(5));
        assert_eq!(chain.index_from_position(GeneratorPosition::new(-1, 0)), None);
        assert_eq!(chain.index_from_position(GeneratorPosition::new(3, 0)), None);
    }

    #[test]
    fn test_unrealize_middle_of_block() {
        let mut chain = BlockChain::<&str>::new(5);
        for (i, name) in ["A", "B", "C", "D", "E"].into_iter().enumerate() {
            realize_index(&mut chain, i, name);
        }
        let segments = chain.realized_run(1, 2).unwrap();
        let removed = chain.unrealize_run(&segments);
        assert_eq!(
            removed.iter().map(|e| e.item.clone()).collect::<Vec<_>>(),
            vec![ViewItem::Item("B"), ViewItem::Item("C")]
        );
        assert_eq!(
            chain.to_string(),
            r#"[Realized{"A"}, Unrealized{2}, Realized{"D", "E"}]"#
        );
    }

    #[test]
    fn test_unrealize_across_blocks_merges_runs() {
        let mut chain = BlockChain::<&str>::new(5);
        realize_index(&mut chain, 1, "B");
        realize_index(&mut chain, 3, "D");
        realize_index(&mut chain, 2, "C");
        assert!(chain.realized_run(0, 4).is_none());

        let segments = chain.realized_run(0, 3).unwrap();
        assert_eq!(chain.unrealize_run(&segments).len(), 3);
        assert_eq!(chain.to_string(), "[Unrealized{5}]");
    }

    #[test]
    fn test_realized_neighbours_skip_gaps() {
        let mut chain = BlockChain::<&str>::new(10);
        for (index, name) in [(1, "B"), (2, "C"), (5, "F"), (8, "I")] {
            realize_index(&mut chain, index, name);
        }
        assert_eq!(
            chain.to_string(),
            r#"[Unrealized{1}, Realized{"B", "C"}, Unrealized{2}, Realized{"F"}, Unrealized{2}, Realized{"I"}, Unrealized{1}]"#
        );

        let at_f = chain.locate(5).unwrap();
        let after: Vec<_> = chain.realized_after(at_f.block, at_f.offset).collect();
        assert_eq!(after, vec![container(8)]);
        let before: Vec<_> = chain.realized_preceding(at_f.block, at_f.offset).collect();
        assert_eq!(before, vec![container(2), container(1)]);

        let at_b = chain.locate(1).unwrap();
        let mut after = chain.realized_after(at_b.block, at_b.offset);
        assert_eq!(after.next(), Some(container(2)));
        assert_eq!(after.next(), Some(container(5)));
        assert_eq!(after.next(), Some(container(8)));
        assert_eq!(after.next(), None);
        assert_eq!(after.next(), None);
        assert_eq!(chain.realized_preceding(at_b.block, at_b.offset).next(), None);
    }

    #[test]
    fn test_cursor_follows_realization() {
        let mut chain = BlockChain::<&str>::new(5);
        let state = chain
            .start_state(GeneratorPosition::start(), GeneratorDirection::Forward, false)
            .unwrap();
        let cursor = chain.add_cursor(state);

        for (i, name) in ["A", "B", "C"].into_iter().enumerate() {
            let state = chain.cursor(cursor).unwrap();
            assert_eq!(state.item_index, i);
            chain.realize(state.block, state.offset, entry(name, i as u64));
            let state = chain.cursor(cursor).unwrap();
            assert_eq!(chain.entry_in_block(state.block, state.offset).unwrap().item, ViewItem::Item(name));
            chain.advance_cursor(cursor);
        }
        let state = chain.cursor(cursor).unwrap();
        assert_eq!(state.item_index, 3);
        assert_eq!(state.count + state.offset, 3);
    }

    #[test]
    fn test_cursor_survives_insert_and_remove() {
        let mut chain = BlockChain::<&str>::new(6);
        realize_index(&mut chain, 2, "C");
        let state = chain
            .start_state(GeneratorPosition::new(0, 0), GeneratorDirection::Forward, true)
            .unwrap();
        assert_eq!(state.item_index, 2);
        let cursor = chain.add_cursor(state);

        chain.insert_item(0);
        let state = chain.cursor(cursor).unwrap();
        assert_eq!(state.item_index, 3);
        assert_eq!(chain.entry_in_block(state.block, state.offset).unwrap().item, ViewItem::Item("C"));

        chain.remove_item(3);
        let state = chain.cursor(cursor).unwrap();
        assert_eq!(state.item_index, 3);
        assert!(chain.is_unrealized(state.block));
        assert_eq!(state.count + state.offset, 3);
    }

    #[test]
    fn test_backward_cursor_steps_back_on_removal() {
        let mut chain = BlockChain::<&str>::new(4);
        let state = chain
            .start_state(GeneratorPosition::start(), GeneratorDirection::Backward, false)
            .unwrap();
        assert_eq!(state.item_index, 3);
        let cursor = chain.add_cursor(state);

        chain.remove_item(3);
        let state = chain.cursor(cursor).unwrap();
        assert!(!state.exhausted);
        assert_eq!(state.item_index, 2);
        assert_eq!(state.count + state.offset, 2);
    }

    #[test]
    fn test_reset_rebinds_cursor() {
        let mut chain = BlockChain::<&str>::new(10);
        realize_index(&mut chain, 3, "D");
        let state = chain
            .start_state(GeneratorPosition::new(-1, 8), GeneratorDirection::Forward, false)
            .unwrap();
        let cursor = chain.add_cursor(state);

        let drained = chain.reset(4);
        assert_eq!(drained.len(), 1);
        assert!(chain.cursor(cursor).unwrap().exhausted);
        assert_eq!(chain.to_string(), "[Unrealized{4}]");
    }
}
