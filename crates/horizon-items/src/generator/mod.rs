//! Item container generation and virtualization.
//!
//! An [`ItemContainerGenerator`] maps the items of an [`ItemsSource`] onto a
//! much smaller set of realized containers. Panels ask for containers
//! through a [`GeneratorCursor`] and hand them back with
//! [`remove`](ItemContainerGenerator::remove) or
//! [`recycle`](ItemContainerGenerator::recycle); collection changes are
//! followed incrementally and re-announced as [`ItemsChangedEvent`]s.
//!
//! # Coordinates
//!
//! Item indices count every item of the source. A [`GeneratorPosition`]
//! counts realized containers instead, plus an offset into the unrealized
//! run after one, so a panel can address items it never generated.
//!
//! ```text
//! items:      A    B    C    D    E    F
//! realized:        [0]  [1]            [2]
//! position: (-1,1)(0,0)(1,0)(1,1)(1,2)(2,0)
//! ```
//!
//! # Grouping
//!
//! When the source yields [`CollectionGroup`]s, each realized group gets a
//! child generator bound to the group, so every grouping level is a full
//! generator of its own. See [`GroupStyle`] for hiding empty groups.
//!
//! [`ItemsSource`]: crate::collection::ItemsSource
//! [`CollectionGroup`]: crate::collection::CollectionGroup

mod alternation;
mod block;
mod collection_changes;
mod container;
mod container_generator;
mod cursor;
mod error;
mod grouping;
mod host;
mod position;
mod recycle;
mod verify;

pub use block::{BLOCK_SIZE, BlockSummary};
pub use container::{ContainerId, ContainerRecord, ContainerRole, ContainerStore, ContainerType, GeneratorId};
pub use container_generator::{GeneratorOptions, ItemContainerGenerator};
pub use cursor::{BatchGuard, GeneratedContainer, GeneratorCursor};
pub use error::{EntryMismatch, GeneratorError, InconsistencyReport, Result};
pub use host::{ContainerHost, DefaultContainerHost, GroupStyle};
pub use position::{GeneratorDirection, GeneratorPosition, GeneratorStatus, ItemsChangedEvent};
