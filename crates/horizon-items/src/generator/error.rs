//! Error types for the container generator.

use std::fmt;

use crate::collection::ChangeAction;

use super::container::ContainerType;
use super::position::GeneratorPosition;

/// Result type alias for generator operations.
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Errors that can occur while generating or maintaining containers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeneratorError {
    /// A generation pass is already active on this generator.
    #[error("cannot start a generation pass while another one is in progress")]
    GenerationInProgress,

    /// The position does not designate an item of this generator.
    #[error("invalid generator position {position}")]
    InvalidPosition { position: GeneratorPosition },

    /// Remove and recycle must start at a realized container.
    #[error("remove requires offset zero, got position {position}")]
    RemoveRequiresOffsetZero { position: GeneratorPosition },

    /// Remove and recycle need a positive count.
    #[error("count must be positive")]
    InvalidCount,

    /// The range to remove or recycle touches an unrealized item.
    #[error("cannot remove {count} containers at {position}: the range includes unrealized items")]
    RangeNotRealized {
        position: GeneratorPosition,
        count: usize,
    },

    /// Containers of different types cannot share the recycle queue.
    #[error("cannot recycle a '{offered}' container into a queue of '{queued}' containers")]
    HeterogeneousRecycle {
        queued: ContainerType,
        offered: ContainerType,
    },

    /// The source reported a change touching more than one item.
    #[error("range actions are not supported: {action:?} of {count} items")]
    RangeActionsNotSupported { action: ChangeAction, count: usize },

    /// A change notification referenced an index outside the source.
    #[error("collection change at index {index} is out of range for {len} items")]
    ChangeOutOfRange { index: usize, len: usize },

    /// The source had no item where the generator expected one.
    #[error("items source returned no item at index {index}")]
    MissingItem { index: usize },

    /// Host callbacks kept changing the source under the cursor.
    #[error("items source changed {attempts} times while generating the container for index {index}")]
    SourceUnstable { index: usize, attempts: usize },

    /// The block chain no longer matches the source.
    #[error("generator is inconsistent with its items source: {0}")]
    Inconsistent(Box<InconsistencyReport>),

    /// The generator was released and cannot be used anymore.
    #[error("generator has been released")]
    Released,
}

impl GeneratorError {
    /// Create an invalid position error.
    pub fn invalid_position(position: GeneratorPosition) -> Self {
        Self::InvalidPosition { position }
    }

    /// Create a range-not-realized error.
    pub fn range_not_realized(position: GeneratorPosition, count: usize) -> Self {
        Self::RangeNotRealized { position, count }
    }

    /// Whether this error reports a caller contract violation.
    pub fn is_invalid_operation(&self) -> bool {
        matches!(
            self,
            Self::GenerationInProgress
                | Self::InvalidPosition { .. }
                | Self::RemoveRequiresOffsetZero { .. }
                | Self::InvalidCount
                | Self::RangeNotRealized { .. }
                | Self::HeterogeneousRecycle { .. }
        )
    }
}

/// A realized entry whose recorded item differs from the live source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMismatch {
    pub index: usize,
    pub recorded: String,
    pub actual: String,
}

/// Diagnostic bundle produced by `verify`.
///
/// Meant for developers chasing a collection that raised the wrong change
/// notifications; `source_name` and `last_change` point at the likely culprit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InconsistencyReport {
    pub source_name: String,
    pub source_len: usize,
    pub recorded_len: usize,
    pub mismatches: Vec<EntryMismatch>,
    pub structural: Vec<String>,
    pub last_change: Option<String>,
}

impl InconsistencyReport {
    /// Whether anything was found.
    pub fn is_empty(&self) -> bool {
        self.source_len == self.recorded_len
            && self.mismatches.is_empty()
            && self.structural.is_empty()
    }
}

impl fmt::Display for InconsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "source '{}' has {} items, generator recorded {}",
            self.source_name, self.source_len, self.recorded_len
        )?;
        for mismatch in &self.mismatches {
            write!(
                f,
                "; item {} is {} but the generator holds {}",
                mismatch.index, mismatch.actual, mismatch.recorded
            )?;
        }
        for problem in &self.structural {
            write!(f, "; {problem}")?;
        }
        match &self.last_change {
            Some(change) => write!(f, "; last change processed: {change}"),
            None => write!(f, "; no change processed since the last reset"),
        }
    }
}
