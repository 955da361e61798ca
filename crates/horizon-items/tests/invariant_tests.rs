//! Property tests: random collection edits and generation passes must keep
//! the generator consistent with its source.

use std::sync::Arc;

use horizon_items::generator::{BLOCK_SIZE, BlockSummary, ContainerStore, DefaultContainerHost, GeneratorCursor};
use horizon_items::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert(usize),
    Remove(usize),
    Replace(usize),
    Move(usize, usize),
    Generate {
        start: usize,
        count: usize,
        backward: bool,
    },
    Discard {
        ordinal: usize,
        count: usize,
        recycle: bool,
    },
    RemoveAll,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<usize>().prop_map(Op::Insert),
        3 => any::<usize>().prop_map(Op::Remove),
        1 => any::<usize>().prop_map(Op::Replace),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(from, to)| Op::Move(from, to)),
        4 => (any::<usize>(), 1..24usize, any::<bool>())
            .prop_map(|(start, count, backward)| Op::Generate { start, count, backward }),
        2 => (any::<usize>(), 1..6usize, any::<bool>())
            .prop_map(|(ordinal, count, recycle)| Op::Discard { ordinal, count, recycle }),
        1 => Just(Op::RemoveAll),
    ]
}

/// Collection edits made while a generation pass stays open, plus steps of
/// that pass.
#[derive(Debug, Clone)]
enum Edit {
    Change(Op),
    Step,
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => any::<usize>().prop_map(|index| Edit::Change(Op::Insert(index))),
        3 => any::<usize>().prop_map(|index| Edit::Change(Op::Remove(index))),
        1 => any::<usize>().prop_map(|index| Edit::Change(Op::Replace(index))),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(from, to)| Edit::Change(Op::Move(from, to))),
        3 => Just(Edit::Step),
    ]
}

struct Harness {
    items: Arc<ObservableCollection<u32>>,
    generator: Arc<ItemContainerGenerator<u32>>,
    next_value: u32,
}

impl Harness {
    fn new(len: usize) -> Self {
        let items = Arc::new(ObservableCollection::new((0..len as u32).collect()));
        let generator = ItemContainerGenerator::new(
            ContainerStore::new(),
            Arc::new(DefaultContainerHost),
            items.clone(),
        );
        Self {
            items,
            generator,
            next_value: len as u32,
        }
    }

    fn fresh_value(&mut self) -> u32 {
        self.next_value += 1;
        self.next_value
    }

    fn apply(&mut self, op: &Op) -> Result<(), TestCaseError> {
        let len = self.items.len();
        match *op {
            Op::Insert(index) => {
                let value = self.fresh_value();
                self.items.insert(index % (len + 1), value);
            }
            Op::Remove(index) if len > 0 => {
                self.items.remove(index % len);
            }
            Op::Replace(index) if len > 0 => {
                let value = self.fresh_value();
                self.items.set(index % len, value);
            }
            Op::Move(from, to) if len > 0 => self.items.move_item(from % len, to % len),
            Op::Generate {
                start,
                count,
                backward,
            } if len > 0 => {
                let position = self
                    .generator
                    .generator_position_from_index(start % len)
                    .ok_or_else(|| TestCaseError::fail("index in range has no position"))?;
                let direction = if backward {
                    GeneratorDirection::Backward
                } else {
                    GeneratorDirection::Forward
                };
                let mut cursor = self
                    .generator
                    .start_at(position, direction, true)
                    .map_err(|err| TestCaseError::fail(err.to_string()))?;
                for _ in 0..count {
                    match cursor.generate_next(false) {
                        Ok(Some(_)) => {}
                        Ok(None) => break,
                        Err(err) => return Err(TestCaseError::fail(err.to_string())),
                    }
                }
            }
            Op::Discard {
                ordinal,
                count,
                recycle,
            } => {
                let realized = self.generator.realized_count();
                if realized > 0 {
                    let position = GeneratorPosition::new((ordinal % realized) as isize, 0);
                    let result = if recycle {
                        self.generator.recycle(position, count)
                    } else {
                        self.generator.remove(position, count)
                    };
                    if let Err(err) = result {
                        prop_assert!(err.is_invalid_operation(), "unexpected error {err}");
                    }
                }
            }
            Op::RemoveAll => self.generator.remove_all(),
            _ => {}
        }
        Ok(())
    }

    fn check(&self) -> Result<(), TestCaseError> {
        let generator = &self.generator;
        if let Err(err) = generator.verify() {
            return Err(TestCaseError::fail(err.to_string()));
        }
        let len = self.items.len();
        prop_assert_eq!(generator.item_count(), len);

        let layout = generator.block_layout();
        let total: usize = layout
            .iter()
            .map(|block| match block {
                BlockSummary::Unrealized(count) => *count,
                BlockSummary::Realized(items) => items.len(),
            })
            .sum();
        prop_assert_eq!(total, len);
        for pair in layout.windows(2) {
            prop_assert!(
                !matches!(pair, [BlockSummary::Unrealized(_), BlockSummary::Unrealized(_)]),
                "adjacent unrealized blocks in {}",
                generator.chain_debug()
            );
        }
        for block in &layout {
            if let BlockSummary::Realized(items) = block {
                prop_assert!(!items.is_empty() && items.len() <= BLOCK_SIZE);
            }
            if let BlockSummary::Unrealized(count) = block {
                prop_assert!(*count > 0);
            }
        }

        let mut realized = 0;
        for index in 0..len {
            let position = generator
                .generator_position_from_index(index)
                .ok_or_else(|| TestCaseError::fail("index in range has no position"))?;
            prop_assert_eq!(generator.index_from_generator_position(position), Some(index));

            let Some(container) = generator.container_from_index(index) else {
                continue;
            };
            realized += 1;
            prop_assert!(position.is_container());
            let item = ViewItem::Item(self.items.item(index).unwrap_or_default());
            prop_assert_eq!(generator.item_from_container(container), Some(item.clone()));
            prop_assert_eq!(generator.container_from_item(&item), Some(container));
            prop_assert_eq!(generator.index_from_container(container), Some(index));
        }
        prop_assert_eq!(realized, generator.realized_count());
        Ok(())
    }
}

/// Advances `cursor` once and checks it produced the item it pointed at.
fn step_cursor(
    cursor: &mut GeneratorCursor<'_, u32>,
    harness: &Harness,
) -> Result<(), TestCaseError> {
    let expected = cursor.item_index();
    let generated = cursor
        .generate_next(false)
        .map_err(|err| TestCaseError::fail(err.to_string()))?;
    match (expected, generated) {
        (None, None) => {}
        (Some(index), Some(generated)) => {
            let item = harness
                .items
                .item(index)
                .ok_or_else(|| TestCaseError::fail("cursor points past the end"))?;
            prop_assert_eq!(
                harness.generator.item_from_container(generated.container),
                Some(ViewItem::Item(item))
            );
        }
        (expected, generated) => {
            return Err(TestCaseError::fail(format!(
                "cursor expected {expected:?} but generated {generated:?}"
            )));
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn test_generator_tracks_random_edits(
        len in 0..48usize,
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let mut harness = Harness::new(len);
        for op in &ops {
            harness.apply(op)?;
            harness.check()?;
        }
    }

    #[test]
    fn test_remove_all_leaves_single_unrealized_block(
        len in 1..48usize,
        ops in prop::collection::vec(op(), 1..20),
    ) {
        let mut harness = Harness::new(len);
        for op in &ops {
            harness.apply(op)?;
        }
        harness.generator.remove_all();
        let expected = if harness.items.is_empty() {
            Vec::new()
        } else {
            vec![BlockSummary::Unrealized(harness.items.len())]
        };
        prop_assert_eq!(harness.generator.block_layout(), expected);
        prop_assert_eq!(harness.generator.recycle_queue_len(), 0);
        prop_assert!(harness.generator.store().is_empty());
    }

    #[test]
    fn test_live_cursor_follows_random_edits(
        len in 1..40usize,
        start in any::<usize>(),
        backward in any::<bool>(),
        warmup in 0..6usize,
        edits in prop::collection::vec(edit(), 1..40),
    ) {
        let mut harness = Harness::new(len);
        let generator = harness.generator.clone();
        let position = generator
            .generator_position_from_index(start % len)
            .ok_or_else(|| TestCaseError::fail("index in range has no position"))?;
        let direction = if backward {
            GeneratorDirection::Backward
        } else {
            GeneratorDirection::Forward
        };
        let mut cursor = generator
            .start_at(position, direction, true)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        for _ in 0..warmup {
            step_cursor(&mut cursor, &harness)?;
        }

        for edit in &edits {
            match edit {
                Edit::Change(op) => harness.apply(op)?,
                Edit::Step => step_cursor(&mut cursor, &harness)?,
            }
            harness.check()?;
            if let Some(index) = cursor.item_index() {
                prop_assert!(index < harness.items.len());
            }
        }
        step_cursor(&mut cursor, &harness)?;
    }
}
