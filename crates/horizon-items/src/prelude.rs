//! Prelude module for Horizon Items.
//!
//! ```ignore
//! use horizon_items::prelude::*;
//! ```

// ============================================================================
// Signal/Slot and Property System
// ============================================================================

pub use horizon_items_core::{ConnectionId, Property, Signal};

// ============================================================================
// Item Sources
// ============================================================================

pub use crate::collection::{
    ChangeAction, CollectionChange, CollectionGroup, GroupDescription, GroupedView, ItemValue,
    ItemsSource, ObservableCollection, ViewItem,
};

// ============================================================================
// Container Generation
// ============================================================================

pub use crate::generator::{
    ContainerHost, ContainerId, ContainerType, GeneratedContainer, GeneratorDirection,
    GeneratorError, GeneratorOptions, GeneratorPosition, GeneratorStatus, GroupStyle,
    ItemContainerGenerator, ItemsChangedEvent,
};

// ============================================================================
// Controls
// ============================================================================

pub use crate::data_grid::{
    DataGridColumn, DataGridColumns, DataGridError, DataGridLength, DataGridLengthUnit,
    DataGridSettings, SortDirection,
};
pub use crate::items_control::{ItemsControl, ItemsHost};
pub use crate::scroll_viewer::{
    PanningMode, ScrollBarVisibility, ScrollChangedEvent, ScrollCommand, ScrollViewer,
};
