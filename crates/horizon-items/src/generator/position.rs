//! Public coordinates, statuses and notifications of a container generator.

use std::fmt;

use crate::collection::ChangeAction;

/// A reference to an item relative to the realized containers.
///
/// `index` is the ordinal of a realized container (`-1` meaning "before the
/// first realized container") and `offset` counts unrealized items from that
/// anchor. `(k, 0)` is the `k`-th realized container itself; `(k, 2)` is the
/// second unrealized item after it; `(-1, 1)` is the first item of the
/// collection when nothing before it is realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeneratorPosition {
    pub index: isize,
    pub offset: isize,
}

impl GeneratorPosition {
    /// Creates a position.
    pub const fn new(index: isize, offset: isize) -> Self {
        Self { index, offset }
    }

    /// The position before the first item: `(-1, 0)`.
    pub const fn start() -> Self {
        Self::new(-1, 0)
    }

    /// Whether this position designates a realized container.
    pub fn is_container(&self) -> bool {
        self.index >= 0 && self.offset == 0
    }
}

impl Default for GeneratorPosition {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for GeneratorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.index, self.offset)
    }
}

/// Direction of a generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeneratorDirection {
    #[default]
    Forward,
    Backward,
}

impl GeneratorDirection {
    /// `+1` for forward, `-1` for backward.
    pub fn step(self) -> isize {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

/// Overall status of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeneratorStatus {
    /// No generation pass has run yet.
    #[default]
    NotStarted,
    /// A generation pass (or batch) is in progress.
    GeneratingContainers,
    /// The last pass finished.
    ContainersGenerated,
    /// The last pass failed because the source misreported its items.
    Error,
}

/// Notification raised after the generator applied a collection change.
///
/// Positions are expressed in [`GeneratorPosition`] space so layout code can
/// map them to its own child indices. `position` is where the change
/// happened (for `Move`, the destination) and `old_position` is the origin
/// of a `Move` or the replaced slot of a `Replace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemsChangedEvent {
    pub action: ChangeAction,
    pub position: GeneratorPosition,
    pub old_position: Option<GeneratorPosition>,
    pub item_count: usize,
    pub container_count: usize,
}

impl ItemsChangedEvent {
    pub(crate) fn new(
        action: ChangeAction,
        position: GeneratorPosition,
        item_count: usize,
        container_count: usize,
    ) -> Self {
        Self {
            action,
            position,
            old_position: None,
            item_count,
            container_count,
        }
    }

    pub(crate) fn with_old_position(mut self, old_position: GeneratorPosition) -> Self {
        self.old_position = Some(old_position);
        self
    }

    pub(crate) fn reset() -> Self {
        Self::new(ChangeAction::Reset, GeneratorPosition::start(), 0, 0)
    }
}
