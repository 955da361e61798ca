//! Item payloads and collection change notifications.

use std::fmt;
use std::sync::Arc;

use super::group::CollectionGroup;

/// Bound required of item payloads carried by collections and generators.
///
/// Blanket-implemented for every type that satisfies it.
pub trait ItemValue: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T> ItemValue for T where T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

/// An entry as seen by one generator level.
///
/// Flat sources only produce [`ViewItem::Item`]. Grouped sources produce
/// [`ViewItem::Group`] at every level above the bottom one.
pub enum ViewItem<T> {
    /// A data item.
    Item(T),
    /// A group of items (compared by identity).
    Group(Arc<CollectionGroup<T>>),
}

impl<T> ViewItem<T> {
    /// Returns the data item, if this is not a group.
    pub fn as_item(&self) -> Option<&T> {
        match self {
            Self::Item(item) => Some(item),
            Self::Group(_) => None,
        }
    }

    /// Returns the group, if this is one.
    pub fn as_group(&self) -> Option<&Arc<CollectionGroup<T>>> {
        match self {
            Self::Item(_) => None,
            Self::Group(group) => Some(group),
        }
    }

    /// Returns `true` for group entries.
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

impl<T: Clone> Clone for ViewItem<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Item(item) => Self::Item(item.clone()),
            Self::Group(group) => Self::Group(group.clone()),
        }
    }
}

impl<T: PartialEq> PartialEq for ViewItem<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Item(a), Self::Item(b)) => a == b,
            (Self::Group(a), Self::Group(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ViewItem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item(item) => f.debug_tuple("Item").field(item).finish(),
            Self::Group(group) => f.debug_tuple("Group").field(&group.name()).finish(),
        }
    }
}

impl<T> From<T> for ViewItem<T> {
    fn from(item: T) -> Self {
        Self::Item(item)
    }
}

/// The kind of a collection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    Add,
    Remove,
    Replace,
    Move,
    Reset,
}

/// A change notification raised by an items source.
///
/// Indices refer to the source after the change for `Add`, `Replace` and the
/// destination of `Move`; `Remove` and the origin of `Move` refer to the
/// source before the change.
#[derive(Clone, PartialEq)]
pub enum CollectionChange<T> {
    /// `items` were inserted starting at `index`.
    Add { items: Vec<ViewItem<T>>, index: usize },
    /// `items` were removed starting at `index`.
    Remove { items: Vec<ViewItem<T>>, index: usize },
    /// `old_items` at `index` were replaced by `new_items`.
    Replace {
        old_items: Vec<ViewItem<T>>,
        new_items: Vec<ViewItem<T>>,
        index: usize,
    },
    /// `items` moved from `old_index` to `new_index`.
    Move {
        items: Vec<ViewItem<T>>,
        old_index: usize,
        new_index: usize,
    },
    /// The source changed so much that observers must start over.
    Reset,
}

impl<T> CollectionChange<T> {
    /// Single-item addition.
    pub fn add(item: ViewItem<T>, index: usize) -> Self {
        Self::Add {
            items: vec![item],
            index,
        }
    }

    /// Single-item removal.
    pub fn remove(item: ViewItem<T>, index: usize) -> Self {
        Self::Remove {
            items: vec![item],
            index,
        }
    }

    /// Single-item replacement.
    pub fn replace(old_item: ViewItem<T>, new_item: ViewItem<T>, index: usize) -> Self {
        Self::Replace {
            old_items: vec![old_item],
            new_items: vec![new_item],
            index,
        }
    }

    /// Single-item move.
    pub fn move_item(item: ViewItem<T>, old_index: usize, new_index: usize) -> Self {
        Self::Move {
            items: vec![item],
            old_index,
            new_index,
        }
    }

    /// The kind of this change.
    pub fn action(&self) -> ChangeAction {
        match self {
            Self::Add { .. } => ChangeAction::Add,
            Self::Remove { .. } => ChangeAction::Remove,
            Self::Replace { .. } => ChangeAction::Replace,
            Self::Move { .. } => ChangeAction::Move,
            Self::Reset => ChangeAction::Reset,
        }
    }

    /// Number of items the change carries (`0` for `Reset`).
    pub fn item_count(&self) -> usize {
        match self {
            Self::Add { items, .. } | Self::Remove { items, .. } | Self::Move { items, .. } => {
                items.len()
            }
            Self::Replace {
                old_items,
                new_items,
                ..
            } => old_items.len().max(new_items.len()),
            Self::Reset => 0,
        }
    }

    /// Whether this change touches more than one item at once.
    ///
    /// The container generator only understands single-item changes.
    pub fn is_range(&self) -> bool {
        match self {
            Self::Replace {
                old_items,
                new_items,
                ..
            } => old_items.len() != 1 || new_items.len() != 1,
            Self::Reset => false,
            _ => self.item_count() != 1,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CollectionChange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { items, index } => write!(f, "Add({items:?} at {index})"),
            Self::Remove { items, index } => write!(f, "Remove({items:?} at {index})"),
            Self::Replace {
                old_items,
                new_items,
                index,
            } => write!(f, "Replace({old_items:?} with {new_items:?} at {index})"),
            Self::Move {
                items,
                old_index,
                new_index,
            } => write!(f, "Move({items:?} from {old_index} to {new_index})"),
            Self::Reset => f.write_str("Reset"),
        }
    }
}
