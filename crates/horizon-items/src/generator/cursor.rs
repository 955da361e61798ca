//! Scoped handles for generation passes.

use crate::collection::ItemValue;

use super::block::CursorId;
use super::container::ContainerId;
use super::container_generator::ItemContainerGenerator;
use super::error::Result;
use super::position::GeneratorDirection;

/// A container handed out by [`GeneratorCursor::generate_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedContainer {
    pub container: ContainerId,
    /// `false` when the item already had a container or the container came
    /// from the recycle queue.
    pub is_newly_realized: bool,
}

/// An active generation pass.
///
/// Created by [`ItemContainerGenerator::start_at`]. Only one pass may be
/// active per generator; dropping the cursor ends it.
pub struct GeneratorCursor<'a, T: ItemValue> {
    generator: &'a ItemContainerGenerator<T>,
    id: CursorId,
    direction: GeneratorDirection,
}

impl<'a, T: ItemValue> GeneratorCursor<'a, T> {
    pub(super) fn new(
        generator: &'a ItemContainerGenerator<T>,
        id: CursorId,
        direction: GeneratorDirection,
    ) -> Self {
        Self {
            generator,
            id,
            direction,
        }
    }

    /// Walk direction of this pass.
    pub fn direction(&self) -> GeneratorDirection {
        self.direction
    }

    /// Item index the next call will generate, or `None` once exhausted.
    pub fn item_index(&self) -> Option<usize> {
        self.generator.cursor_index(self.id)
    }

    /// Produces the container for the next item in the walk.
    ///
    /// Returns `Ok(None)` at the end of the collection, or when the next item
    /// is already realized and `stop_at_realized` is set. In the latter case
    /// the cursor stays put.
    ///
    /// # Errors
    ///
    /// - [`MissingItem`](super::GeneratorError::MissingItem) when the source
    ///   has no item where the map expects one; the status becomes `Error`
    /// - [`SourceUnstable`](super::GeneratorError::SourceUnstable) when host
    ///   callbacks keep changing the source under the cursor
    /// - [`Released`](super::GeneratorError::Released) after the generator
    ///   was released
    pub fn generate_next(&mut self, stop_at_realized: bool) -> Result<Option<GeneratedContainer>> {
        self.generator.generate_next(self.id, stop_at_realized)
    }
}

impl<T: ItemValue> Iterator for GeneratorCursor<'_, T> {
    type Item = Result<GeneratedContainer>;

    fn next(&mut self) -> Option<Self::Item> {
        self.generate_next(false).transpose()
    }
}

impl<T: ItemValue> Drop for GeneratorCursor<'_, T> {
    fn drop(&mut self) {
        self.generator.end_generation(self.id);
    }
}

/// Keeps the generator in `GeneratingContainers` across several passes.
///
/// Created by [`ItemContainerGenerator::generate_batches`].
pub struct BatchGuard<'a, T: ItemValue> {
    generator: &'a ItemContainerGenerator<T>,
}

impl<'a, T: ItemValue> BatchGuard<'a, T> {
    pub(super) fn new(generator: &'a ItemContainerGenerator<T>) -> Self {
        Self { generator }
    }
}

impl<T: ItemValue> Drop for BatchGuard<'_, T> {
    fn drop(&mut self) {
        self.generator.end_batch();
    }
}
