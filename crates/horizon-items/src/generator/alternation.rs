//! Alternation index maintenance.
//!
//! Realized containers carry an index in `0..count` that advances by one
//! from each realized container to the next, unrealized gaps skipped.
//! Edits only propagate from the touched container until the stored
//! indices agree again.

use crate::collection::ItemValue;

use super::block::{BlockChain, BlockId};
use super::container::ContainerStore;
use super::position::GeneratorDirection;

/// Stamps the container just realized at `(block, offset)`.
///
/// Forward passes continue the sequence of the previous realized container
/// and push the change forward; backward passes count down from the next
/// one and push the change backward.
pub(super) fn assign_realized<T: ItemValue>(
    chain: &BlockChain<T>,
    store: &ContainerStore<T>,
    count: usize,
    block: BlockId,
    offset: usize,
    direction: GeneratorDirection,
) {
    if count == 0 {
        return;
    }
    let Some(container) = chain.entry_in_block(block, offset).map(|entry| entry.container) else {
        return;
    };
    match direction {
        GeneratorDirection::Forward => {
            let mut index = chain
                .realized_before(block, offset)
                .and_then(|prev| store.alternation_index(prev))
                .map_or(0, |prev| (prev + 1) % count);
            store.set_alternation_index(container, Some(index));
            for next in chain.realized_after(block, offset) {
                index = (index + 1) % count;
                if !store.set_alternation_index(next, Some(index)) {
                    break;
                }
            }
        }
        GeneratorDirection::Backward => {
            let mut index = chain
                .realized_after(block, offset)
                .next()
                .and_then(|next| store.alternation_index(next))
                .map_or(0, |next| (next + count - 1) % count);
            store.set_alternation_index(container, Some(index));
            for prev in chain.realized_preceding(block, offset) {
                index = (index + count - 1) % count;
                if !store.set_alternation_index(prev, Some(index)) {
                    break;
                }
            }
        }
    }
}

/// Renumbers realized containers at item indices `from..`, continuing from
/// the nearest realized container before `from`.
///
/// Containers up to `through` are always rewritten; after that the walk
/// stops at the first container whose index was already right. A first
/// container with nothing realized before it keeps its index.
pub(super) fn renumber_from<T: ItemValue>(
    chain: &BlockChain<T>,
    store: &ContainerStore<T>,
    count: usize,
    from: usize,
    through: Option<usize>,
) {
    if count == 0 {
        return;
    }
    let mut previous: Option<usize> = None;
    for (slot, entry) in chain.realized_from(0) {
        if slot.index < from {
            previous = store.alternation_index(entry.container);
            continue;
        }
        let expected = match previous {
            Some(prev) => (prev + 1) % count,
            None => store.alternation_index(entry.container).unwrap_or(0) % count,
        };
        let changed = store.set_alternation_index(entry.container, Some(expected));
        let forced = through.is_some_and(|through| slot.index <= through);
        if !changed && !forced {
            break;
        }
        previous = Some(expected);
    }
}

/// Rewrites every realized container: `0, 1, .., count - 1, 0, ..` in index
/// order, or no index at all when `count` is zero.
pub(super) fn reset_all<T: ItemValue>(chain: &BlockChain<T>, store: &ContainerStore<T>, count: usize) {
    for (slot, entry) in chain.realized_from(0) {
        let index = (count > 0).then(|| slot.ordinal % count);
        store.set_alternation_index(entry.container, index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ViewItem;
    use crate::generator::block::BlockEntry;
    use crate::generator::container::{ContainerRole, ContainerType};

    fn realize(
        chain: &mut BlockChain<&'static str>,
        store: &ContainerStore<&'static str>,
        index: usize,
        name: &'static str,
        direction: GeneratorDirection,
    ) {
        let container = store.create(ContainerType::ITEM, ContainerRole::Item);
        let location = chain.locate(index).unwrap();
        let (block, offset) = chain.realize(
            location.block,
            location.offset,
            BlockEntry {
                item: ViewItem::Item(name),
                container,
            },
        );
        assign_realized(chain, store, 2, block, offset, direction);
    }

    fn indices(chain: &BlockChain<&'static str>, store: &ContainerStore<&'static str>) -> Vec<Option<usize>> {
        chain
            .realized_from(0)
            .map(|(_, entry)| store.alternation_index(entry.container))
            .collect()
    }

    #[test]
    fn test_forward_realization_skips_gaps() {
        let store = ContainerStore::new();
        let mut chain = BlockChain::new(5);
        realize(&mut chain, &store, 0, "A", GeneratorDirection::Forward);
        realize(&mut chain, &store, 2, "C", GeneratorDirection::Forward);
        assert_eq!(indices(&chain, &store), vec![Some(0), Some(1)]);

        realize(&mut chain, &store, 1, "X", GeneratorDirection::Forward);
        assert_eq!(indices(&chain, &store), vec![Some(0), Some(1), Some(0)]);
    }

    #[test]
    fn test_backward_realization_counts_down() {
        let store = ContainerStore::new();
        let mut chain = BlockChain::new(3);
        realize(&mut chain, &store, 2, "C", GeneratorDirection::Backward);
        realize(&mut chain, &store, 1, "B", GeneratorDirection::Backward);
        realize(&mut chain, &store, 0, "A", GeneratorDirection::Backward);
        assert_eq!(indices(&chain, &store), vec![Some(0), Some(1), Some(0)]);
    }

    #[test]
    fn test_renumber_after_removal() {
        let store = ContainerStore::new();
        let mut chain = BlockChain::new(4);
        for (i, name) in ["A", "B", "C", "D"].into_iter().enumerate() {
            realize(&mut chain, &store, i, name, GeneratorDirection::Forward);
        }
        chain.remove_item(1);
        renumber_from(&chain, &store, 2, 1, None);
        assert_eq!(indices(&chain, &store), vec![Some(0), Some(1), Some(0)]);

        reset_all(&chain, &store, 0);
        assert_eq!(indices(&chain, &store), vec![None, None, None]);
    }
}
