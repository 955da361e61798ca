//! Observable item sources.
//!
//! Container generators consume items through the [`ItemsSource`] trait and
//! stay in sync through its [`CollectionChange`] notifications.
//!
//! # Sources
//!
//! - [`ObservableCollection`]: a flat, vector-backed list
//! - [`GroupedView`]: a tree of [`CollectionGroup`]s over an observable
//!   collection, one level per [`GroupDescription`]
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐  CollectionChange  ┌─────────────────────────┐
//! │ ObservableCollection │───────────────────>│       GroupedView       │
//! └──────────────────────┘                    │ root ─┬─ group "a" ...  │
//!            │                                │       └─ group "b" ...  │
//!            │ ItemsSource                    └─────────────────────────┘
//!            v                                             │ ItemsSource
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                      ItemContainerGenerator                        │
//! └───────────────────────────────────────────────────────────────────┘
//! ```

mod change;
mod group;
mod observable;
mod source;

pub use change::{ChangeAction, CollectionChange, ItemValue, ViewItem};
pub use group::{CollectionGroup, GroupDescription, GroupKeyFn, GroupedView};
pub use observable::ObservableCollection;
pub use source::ItemsSource;
