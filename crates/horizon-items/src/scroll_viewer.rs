//! ScrollViewer: headless scroll state for items panels.
//!
//! [`ScrollViewer`] tracks extent, viewport and offset on both axes. Scroll
//! requests are queued as [`ScrollCommand`]s and applied in order, with
//! clamping, when the layout pass calls
//! [`execute_queued_commands`](ScrollViewer::execute_queued_commands). One
//! [`ScrollChangedEvent`] is emitted per pass that changed anything.
//!
//! Touch panning is supported through [`begin_pan`](ScrollViewer::begin_pan),
//! [`pan_delta`](ScrollViewer::pan_delta) and [`end_pan`](ScrollViewer::end_pan),
//! followed by inertial scrolling stepped with
//! [`update_inertia`](ScrollViewer::update_inertia).
//!
//! # Example
//!
//! ```
//! use horizon_items::scroll_viewer::{ScrollBarVisibility, ScrollViewer};
//!
//! let mut viewer = ScrollViewer::new()
//!     .with_vertical_scroll_bar_visibility(ScrollBarVisibility::Auto)
//!     .with_extent(400.0, 2000.0)
//!     .with_viewport(400.0, 300.0);
//!
//! viewer.scroll_changed.connect(|event| {
//!     println!("scrolled to {}", event.vertical_offset);
//! });
//!
//! viewer.page_down();
//! viewer.line_down();
//! viewer.execute_queued_commands();
//! assert_eq!(viewer.vertical_offset(), 316.0);
//! ```

use std::collections::VecDeque;

use horizon_items_core::Signal;
use horizon_items_core::logging::targets;

/// Line size of physical scrolling, in pixels.
pub const DEFAULT_LINE_SIZE: f64 = 16.0;

/// Line size of logical scrolling: one item.
pub const LOGICAL_LINE_SIZE: f64 = 1.0;

/// Default panning deceleration, in offset units per second squared.
pub const DEFAULT_PANNING_DECELERATION: f64 = 1000.0;

/// Inertia stops below this speed (offset units per second).
const MIN_INERTIA_SPEED: f64 = 1.0;

/// Policy for scroll bar visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBarVisibility {
    /// No scroll bar and no scrolling along the axis.
    Disabled,
    /// Scroll bar is shown when the extent exceeds the viewport (default).
    #[default]
    Auto,
    /// No scroll bar, but the axis still scrolls.
    Hidden,
    /// Scroll bar is always shown.
    Visible,
}

/// Whether a scroll bar is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedVisibility {
    Visible,
    Collapsed,
}

/// Which axes a touch pan may scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanningMode {
    /// Panning is off.
    #[default]
    None,
    HorizontalOnly,
    VerticalOnly,
    Both,
    /// Locks to the horizontal axis when the pan starts mostly horizontal.
    HorizontalFirst,
    /// Locks to the vertical axis when the pan starts mostly vertical.
    VerticalFirst,
}

/// A rectangle in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContentRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ContentRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// A queued scroll request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollCommand {
    LineUp,
    LineDown,
    LineLeft,
    LineRight,
    PageUp,
    PageDown,
    PageLeft,
    PageRight,
    ScrollToTop,
    ScrollToBottom,
    ScrollToLeftEnd,
    ScrollToRightEnd,
    /// Top left corner.
    ScrollToHome,
    /// Bottom of the content, left edge.
    ScrollToEnd,
    SetHorizontalOffset(f64),
    SetVerticalOffset(f64),
    /// Scroll the least amount that brings the rectangle into view.
    MakeVisible(ContentRect),
}

/// Payload of [`ScrollViewer::scroll_changed`].
///
/// Changes are relative to the previous event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollChangedEvent {
    pub horizontal_offset: f64,
    pub vertical_offset: f64,
    pub extent_width: f64,
    pub extent_height: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub horizontal_change: f64,
    pub vertical_change: f64,
    pub extent_width_change: f64,
    pub extent_height_change: f64,
    pub viewport_width_change: f64,
    pub viewport_height_change: f64,
}

impl ScrollChangedEvent {
    fn between(previous: &Snapshot, current: &Snapshot) -> Self {
        Self {
            horizontal_offset: current.horizontal.offset,
            vertical_offset: current.vertical.offset,
            extent_width: current.horizontal.extent,
            extent_height: current.vertical.extent,
            viewport_width: current.horizontal.viewport,
            viewport_height: current.vertical.viewport,
            horizontal_change: current.horizontal.offset - previous.horizontal.offset,
            vertical_change: current.vertical.offset - previous.vertical.offset,
            extent_width_change: current.horizontal.extent - previous.horizontal.extent,
            extent_height_change: current.vertical.extent - previous.vertical.extent,
            viewport_width_change: current.horizontal.viewport - previous.horizontal.viewport,
            viewport_height_change: current.vertical.viewport - previous.vertical.viewport,
        }
    }
}

/// Extent, viewport and offset along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Axis {
    extent: f64,
    viewport: f64,
    offset: f64,
}

impl Axis {
    fn scrollable(&self) -> f64 {
        (self.extent - self.viewport).max(0.0)
    }

    /// Moves to `offset` clamped into range; returns the distance moved.
    fn scroll_to(&mut self, offset: f64) -> f64 {
        let old = self.offset;
        self.offset = if offset.is_nan() {
            old
        } else {
            offset.clamp(0.0, self.scrollable())
        };
        self.offset - old
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Snapshot {
    horizontal: Axis,
    vertical: Axis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanAxis {
    Horizontal,
    Vertical,
}

/// States of the pan tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PanState {
    Idle,
    /// Following the finger. `lock` is decided by the first movement.
    Panning { lock: Option<PanAxis>, moved: bool },
    /// Decelerating after release.
    Inertia { velocity: (f64, f64) },
}

/// Headless scroll state.
///
/// # Signals
///
/// - `scroll_changed(ScrollChangedEvent)`: Emitted after a command pass, a
///   pan step or an inertia step changed offsets, extent or viewport
pub struct ScrollViewer {
    horizontal: Axis,
    vertical: Axis,

    horizontal_visibility: ScrollBarVisibility,
    vertical_visibility: ScrollBarVisibility,

    /// Whether the content scrolls by items instead of pixels.
    can_content_scroll: bool,

    /// Line size when scrolling physically.
    line_size: f64,

    commands: VecDeque<ScrollCommand>,

    /// State as of the last `scroll_changed` emission.
    reported: Snapshot,

    panning_mode: PanningMode,
    panning_ratio: f64,
    panning_deceleration: f64,
    pan: PanState,

    /// Signal for scroll state changes.
    pub scroll_changed: Signal<ScrollChangedEvent>,
}

impl Default for ScrollViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollViewer {
    /// Create a scroll viewer with empty extent and viewport.
    pub fn new() -> Self {
        Self {
            horizontal: Axis::default(),
            vertical: Axis::default(),
            horizontal_visibility: ScrollBarVisibility::Auto,
            vertical_visibility: ScrollBarVisibility::Auto,
            can_content_scroll: false,
            line_size: DEFAULT_LINE_SIZE,
            commands: VecDeque::new(),
            reported: Snapshot::default(),
            panning_mode: PanningMode::None,
            panning_ratio: 1.0,
            panning_deceleration: DEFAULT_PANNING_DECELERATION,
            pan: PanState::Idle,
            scroll_changed: Signal::new(),
        }
    }

    // =========================================================================
    // Builder Pattern Methods
    // =========================================================================

    pub fn with_horizontal_scroll_bar_visibility(mut self, visibility: ScrollBarVisibility) -> Self {
        self.set_horizontal_scroll_bar_visibility(visibility);
        self
    }

    pub fn with_vertical_scroll_bar_visibility(mut self, visibility: ScrollBarVisibility) -> Self {
        self.set_vertical_scroll_bar_visibility(visibility);
        self
    }

    /// Set whether the content scrolls by items.
    pub fn with_can_content_scroll(mut self, can_content_scroll: bool) -> Self {
        self.can_content_scroll = can_content_scroll;
        self
    }

    /// Set the physical line size.
    pub fn with_line_size(mut self, line_size: f64) -> Self {
        self.set_line_size(line_size);
        self
    }

    pub fn with_panning_mode(mut self, mode: PanningMode) -> Self {
        self.panning_mode = mode;
        self
    }

    pub fn with_panning_ratio(mut self, ratio: f64) -> Self {
        self.set_panning_ratio(ratio);
        self
    }

    pub fn with_panning_deceleration(mut self, deceleration: f64) -> Self {
        self.set_panning_deceleration(deceleration);
        self
    }

    pub fn with_extent(mut self, width: f64, height: f64) -> Self {
        self.set_extent(width, height);
        self
    }

    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.set_viewport(width, height);
        self
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    pub fn horizontal_offset(&self) -> f64 {
        self.horizontal.offset
    }

    pub fn vertical_offset(&self) -> f64 {
        self.vertical.offset
    }

    pub fn extent_width(&self) -> f64 {
        self.horizontal.extent
    }

    pub fn extent_height(&self) -> f64 {
        self.vertical.extent
    }

    pub fn viewport_width(&self) -> f64 {
        self.horizontal.viewport
    }

    pub fn viewport_height(&self) -> f64 {
        self.vertical.viewport
    }

    /// Horizontal distance that can be scrolled; zero when disabled.
    pub fn scrollable_width(&self) -> f64 {
        self.axis(PanAxis::Horizontal).map_or(0.0, |axis| axis.scrollable())
    }

    /// Vertical distance that can be scrolled; zero when disabled.
    pub fn scrollable_height(&self) -> f64 {
        self.axis(PanAxis::Vertical).map_or(0.0, |axis| axis.scrollable())
    }

    /// Set the content extent reported by the layout pass.
    ///
    /// Offsets are clamped into the new range. The change is reported by the
    /// next [`execute_queued_commands`](Self::execute_queued_commands).
    pub fn set_extent(&mut self, width: f64, height: f64) {
        self.horizontal.extent = width.max(0.0);
        self.vertical.extent = height.max(0.0);
        self.clamp_offsets();
    }

    /// Set the viewport size reported by the layout pass.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.horizontal.viewport = width.max(0.0);
        self.vertical.viewport = height.max(0.0);
        self.clamp_offsets();
    }

    fn clamp_offsets(&mut self) {
        let horizontal = if self.horizontal_visibility == ScrollBarVisibility::Disabled {
            0.0
        } else {
            self.horizontal.offset
        };
        self.horizontal.scroll_to(horizontal);
        let vertical = if self.vertical_visibility == ScrollBarVisibility::Disabled {
            0.0
        } else {
            self.vertical.offset
        };
        self.vertical.scroll_to(vertical);
    }

    /// The axis, or `None` when scrolling along it is disabled.
    fn axis(&self, axis: PanAxis) -> Option<&Axis> {
        match axis {
            PanAxis::Horizontal => {
                (self.horizontal_visibility != ScrollBarVisibility::Disabled).then_some(&self.horizontal)
            }
            PanAxis::Vertical => {
                (self.vertical_visibility != ScrollBarVisibility::Disabled).then_some(&self.vertical)
            }
        }
    }

    fn axis_mut(&mut self, axis: PanAxis) -> Option<&mut Axis> {
        match axis {
            PanAxis::Horizontal => (self.horizontal_visibility != ScrollBarVisibility::Disabled)
                .then_some(&mut self.horizontal),
            PanAxis::Vertical => (self.vertical_visibility != ScrollBarVisibility::Disabled)
                .then_some(&mut self.vertical),
        }
    }

    // =========================================================================
    // Scroll Bar Visibility
    // =========================================================================

    pub fn horizontal_scroll_bar_visibility(&self) -> ScrollBarVisibility {
        self.horizontal_visibility
    }

    pub fn set_horizontal_scroll_bar_visibility(&mut self, visibility: ScrollBarVisibility) {
        self.horizontal_visibility = visibility;
        self.clamp_offsets();
    }

    pub fn vertical_scroll_bar_visibility(&self) -> ScrollBarVisibility {
        self.vertical_visibility
    }

    pub fn set_vertical_scroll_bar_visibility(&mut self, visibility: ScrollBarVisibility) {
        self.vertical_visibility = visibility;
        self.clamp_offsets();
    }

    pub fn computed_horizontal_scroll_bar_visibility(&self) -> ComputedVisibility {
        computed_visibility(self.horizontal_visibility, &self.horizontal)
    }

    pub fn computed_vertical_scroll_bar_visibility(&self) -> ComputedVisibility {
        computed_visibility(self.vertical_visibility, &self.vertical)
    }

    // =========================================================================
    // Line Size
    // =========================================================================

    pub fn can_content_scroll(&self) -> bool {
        self.can_content_scroll
    }

    pub fn set_can_content_scroll(&mut self, can_content_scroll: bool) {
        self.can_content_scroll = can_content_scroll;
    }

    /// Distance of one line: one item when the content scrolls logically.
    pub fn line_size(&self) -> f64 {
        if self.can_content_scroll {
            LOGICAL_LINE_SIZE
        } else {
            self.line_size
        }
    }

    /// Set the physical line size. Non-positive sizes are ignored.
    pub fn set_line_size(&mut self, line_size: f64) {
        if line_size.is_finite() && line_size > 0.0 {
            self.line_size = line_size;
        } else {
            tracing::warn!(target: targets::SCROLL, line_size, "ignoring invalid line size");
        }
    }

    // =========================================================================
    // Scroll Commands
    // =========================================================================

    /// Queue a command for the next [`execute_queued_commands`](Self::execute_queued_commands).
    pub fn queue_command(&mut self, command: ScrollCommand) {
        self.commands.push_back(command);
    }

    /// Number of commands waiting to run.
    pub fn queued_command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn line_up(&mut self) {
        self.queue_command(ScrollCommand::LineUp);
    }

    pub fn line_down(&mut self) {
        self.queue_command(ScrollCommand::LineDown);
    }

    pub fn line_left(&mut self) {
        self.queue_command(ScrollCommand::LineLeft);
    }

    pub fn line_right(&mut self) {
        self.queue_command(ScrollCommand::LineRight);
    }

    pub fn page_up(&mut self) {
        self.queue_command(ScrollCommand::PageUp);
    }

    pub fn page_down(&mut self) {
        self.queue_command(ScrollCommand::PageDown);
    }

    pub fn page_left(&mut self) {
        self.queue_command(ScrollCommand::PageLeft);
    }

    pub fn page_right(&mut self) {
        self.queue_command(ScrollCommand::PageRight);
    }

    pub fn scroll_to_top(&mut self) {
        self.queue_command(ScrollCommand::ScrollToTop);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.queue_command(ScrollCommand::ScrollToBottom);
    }

    pub fn scroll_to_left_end(&mut self) {
        self.queue_command(ScrollCommand::ScrollToLeftEnd);
    }

    pub fn scroll_to_right_end(&mut self) {
        self.queue_command(ScrollCommand::ScrollToRightEnd);
    }

    pub fn scroll_to_home(&mut self) {
        self.queue_command(ScrollCommand::ScrollToHome);
    }

    pub fn scroll_to_end(&mut self) {
        self.queue_command(ScrollCommand::ScrollToEnd);
    }

    pub fn scroll_to_horizontal_offset(&mut self, offset: f64) {
        self.queue_command(ScrollCommand::SetHorizontalOffset(offset));
    }

    pub fn scroll_to_vertical_offset(&mut self, offset: f64) {
        self.queue_command(ScrollCommand::SetVerticalOffset(offset));
    }

    pub fn make_visible(&mut self, rect: ContentRect) {
        self.queue_command(ScrollCommand::MakeVisible(rect));
    }

    /// Runs every queued command in order.
    ///
    /// Returns `true` if a [`scroll_changed`](Self::scroll_changed) event was
    /// emitted.
    pub fn execute_queued_commands(&mut self) -> bool {
        let count = self.commands.len();
        while let Some(command) = self.commands.pop_front() {
            self.execute(command);
        }
        if count > 0 {
            tracing::trace!(
                target: targets::SCROLL,
                count,
                horizontal_offset = self.horizontal.offset,
                vertical_offset = self.vertical.offset,
                "executed scroll commands"
            );
        }
        self.notify_scroll_changed()
    }

    fn execute(&mut self, command: ScrollCommand) {
        let line = self.line_size();
        match command {
            ScrollCommand::LineUp => self.scroll_by(PanAxis::Vertical, -line),
            ScrollCommand::LineDown => self.scroll_by(PanAxis::Vertical, line),
            ScrollCommand::LineLeft => self.scroll_by(PanAxis::Horizontal, -line),
            ScrollCommand::LineRight => self.scroll_by(PanAxis::Horizontal, line),
            ScrollCommand::PageUp => self.scroll_by(PanAxis::Vertical, -self.vertical.viewport),
            ScrollCommand::PageDown => self.scroll_by(PanAxis::Vertical, self.vertical.viewport),
            ScrollCommand::PageLeft => self.scroll_by(PanAxis::Horizontal, -self.horizontal.viewport),
            ScrollCommand::PageRight => self.scroll_by(PanAxis::Horizontal, self.horizontal.viewport),
            ScrollCommand::ScrollToTop => self.scroll_to(PanAxis::Vertical, f64::NEG_INFINITY),
            ScrollCommand::ScrollToBottom => self.scroll_to(PanAxis::Vertical, f64::INFINITY),
            ScrollCommand::ScrollToLeftEnd => self.scroll_to(PanAxis::Horizontal, f64::NEG_INFINITY),
            ScrollCommand::ScrollToRightEnd => self.scroll_to(PanAxis::Horizontal, f64::INFINITY),
            ScrollCommand::ScrollToHome => {
                self.scroll_to(PanAxis::Horizontal, f64::NEG_INFINITY);
                self.scroll_to(PanAxis::Vertical, f64::NEG_INFINITY);
            }
            ScrollCommand::ScrollToEnd => {
                self.scroll_to(PanAxis::Horizontal, f64::NEG_INFINITY);
                self.scroll_to(PanAxis::Vertical, f64::INFINITY);
            }
            ScrollCommand::SetHorizontalOffset(offset) => self.scroll_to(PanAxis::Horizontal, offset),
            ScrollCommand::SetVerticalOffset(offset) => self.scroll_to(PanAxis::Vertical, offset),
            ScrollCommand::MakeVisible(rect) => {
                self.make_range_visible(PanAxis::Horizontal, rect.x, rect.width);
                self.make_range_visible(PanAxis::Vertical, rect.y, rect.height);
            }
        }
    }

    fn scroll_to(&mut self, axis: PanAxis, offset: f64) {
        if offset.is_nan() {
            tracing::warn!(target: targets::SCROLL, ?axis, "ignoring NaN scroll offset");
            return;
        }
        if let Some(axis) = self.axis_mut(axis) {
            axis.scroll_to(offset);
        }
    }

    fn scroll_by(&mut self, axis: PanAxis, delta: f64) {
        if let Some(axis) = self.axis_mut(axis) {
            let target = axis.offset + delta;
            axis.scroll_to(target);
        }
    }

    /// Brings `[start, start + length)` into view along `axis`.
    fn make_range_visible(&mut self, axis: PanAxis, start: f64, length: f64) {
        let Some(current) = self.axis(axis).copied() else {
            return;
        };
        let end = start + length;
        let view_end = current.offset + current.viewport;
        if start < current.offset {
            self.scroll_to(axis, start);
        } else if end > view_end {
            // Show the whole range if it fits, its start otherwise.
            if length <= current.viewport {
                self.scroll_to(axis, end - current.viewport);
            } else {
                self.scroll_to(axis, start);
            }
        }
    }

    /// Emits `scroll_changed` if anything moved since the last emission.
    fn notify_scroll_changed(&mut self) -> bool {
        let current = Snapshot {
            horizontal: self.horizontal,
            vertical: self.vertical,
        };
        if current == self.reported {
            return false;
        }
        let event = ScrollChangedEvent::between(&self.reported, &current);
        self.reported = current;
        self.scroll_changed.emit(event);
        true
    }

    // =========================================================================
    // Panning
    // =========================================================================

    pub fn panning_mode(&self) -> PanningMode {
        self.panning_mode
    }

    pub fn set_panning_mode(&mut self, mode: PanningMode) {
        self.panning_mode = mode;
    }

    /// Offset units moved per unit of finger translation.
    pub fn panning_ratio(&self) -> f64 {
        self.panning_ratio
    }

    /// Negative or non-finite ratios are ignored.
    pub fn set_panning_ratio(&mut self, ratio: f64) {
        if ratio.is_finite() && ratio >= 0.0 {
            self.panning_ratio = ratio;
        } else {
            tracing::warn!(target: targets::SCROLL, ratio, "ignoring invalid panning ratio");
        }
    }

    /// Inertia deceleration, in offset units per second squared.
    pub fn panning_deceleration(&self) -> f64 {
        self.panning_deceleration
    }

    /// Negative or non-finite decelerations are ignored.
    pub fn set_panning_deceleration(&mut self, deceleration: f64) {
        if deceleration.is_finite() && deceleration >= 0.0 {
            self.panning_deceleration = deceleration;
        } else {
            tracing::warn!(
                target: targets::SCROLL,
                deceleration,
                "ignoring invalid panning deceleration"
            );
        }
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.pan, PanState::Panning { .. })
    }

    pub fn is_inertia_active(&self) -> bool {
        matches!(self.pan, PanState::Inertia { .. })
    }

    /// Starts a pan. Returns `false` when the panning mode is `None`.
    ///
    /// A running inertia animation is stopped.
    pub fn begin_pan(&mut self) -> bool {
        if self.panning_mode == PanningMode::None {
            self.pan = PanState::Idle;
            return false;
        }
        self.pan = PanState::Panning {
            lock: None,
            moved: false,
        };
        true
    }

    /// Applies a finger translation of `(dx, dy)`.
    ///
    /// Content follows the finger, so the offsets move by
    /// `-delta * panning_ratio`. Returns the translation that could not be
    /// applied because an axis is locked, disabled or at its boundary.
    pub fn pan_delta(&mut self, dx: f64, dy: f64) -> (f64, f64) {
        let PanState::Panning { lock, moved } = self.pan else {
            return (dx, dy);
        };
        let lock = if moved { lock } else { self.initial_lock(dx, dy) };
        if dx != 0.0 || dy != 0.0 {
            self.pan = PanState::Panning { lock, moved: true };
        }

        let unused_x = self.pan_axis(PanAxis::Horizontal, dx, lock);
        let unused_y = self.pan_axis(PanAxis::Vertical, dy, lock);
        self.notify_scroll_changed();
        (unused_x, unused_y)
    }

    fn initial_lock(&self, dx: f64, dy: f64) -> Option<PanAxis> {
        match self.panning_mode {
            PanningMode::HorizontalFirst if dx.abs() >= dy.abs() => Some(PanAxis::Horizontal),
            PanningMode::VerticalFirst if dy.abs() >= dx.abs() => Some(PanAxis::Vertical),
            _ => None,
        }
    }

    fn pans(&self, axis: PanAxis, lock: Option<PanAxis>) -> bool {
        let allowed = match self.panning_mode {
            PanningMode::None => false,
            PanningMode::HorizontalOnly => axis == PanAxis::Horizontal,
            PanningMode::VerticalOnly => axis == PanAxis::Vertical,
            PanningMode::Both | PanningMode::HorizontalFirst | PanningMode::VerticalFirst => true,
        };
        allowed && lock.is_none_or(|locked| locked == axis)
    }

    /// Pans one axis; returns the unused translation.
    fn pan_axis(&mut self, axis: PanAxis, delta: f64, lock: Option<PanAxis>) -> f64 {
        if delta == 0.0 || !self.pans(axis, lock) || self.panning_ratio == 0.0 {
            return delta;
        }
        let ratio = self.panning_ratio;
        let Some(state) = self.axis_mut(axis) else {
            return delta;
        };
        let target = state.offset - delta * ratio;
        let applied = state.scroll_to(target);
        delta + applied / ratio
    }

    /// Ends a pan released with a finger velocity of `(vx, vy)` per second.
    ///
    /// Returns `true` if inertial scrolling started.
    pub fn end_pan(&mut self, vx: f64, vy: f64) -> bool {
        let PanState::Panning { lock, .. } = self.pan else {
            return false;
        };
        let velocity_for = |viewer: &Self, axis: PanAxis, v: f64| {
            if viewer.pans(axis, lock) && viewer.axis(axis).is_some() {
                -v * viewer.panning_ratio
            } else {
                0.0
            }
        };
        let velocity = (
            velocity_for(self, PanAxis::Horizontal, vx),
            velocity_for(self, PanAxis::Vertical, vy),
        );
        if speed(velocity) < MIN_INERTIA_SPEED || self.panning_deceleration == 0.0 {
            self.pan = PanState::Idle;
            return false;
        }
        tracing::trace!(target: targets::SCROLL, vx = velocity.0, vy = velocity.1, "inertia started");
        self.pan = PanState::Inertia { velocity };
        true
    }

    /// Advances inertial scrolling by `dt` seconds.
    ///
    /// Returns `true` while the animation should continue.
    pub fn update_inertia(&mut self, dt: f64) -> bool {
        let PanState::Inertia { velocity } = self.pan else {
            return false;
        };
        if dt.is_nan() || dt <= 0.0 {
            return true;
        }

        let current = speed(velocity);
        let factor = ((current - self.panning_deceleration * dt) / current).max(0.0);
        let mut velocity = (velocity.0 * factor, velocity.1 * factor);

        let step_x = velocity.0 * dt;
        let step_y = velocity.1 * dt;
        if self.inertia_step(PanAxis::Horizontal, step_x) {
            velocity.0 = 0.0;
        }
        if self.inertia_step(PanAxis::Vertical, step_y) {
            velocity.1 = 0.0;
        }
        self.notify_scroll_changed();

        if speed(velocity) < MIN_INERTIA_SPEED {
            tracing::trace!(target: targets::SCROLL, "inertia finished");
            self.pan = PanState::Idle;
            return false;
        }
        self.pan = PanState::Inertia { velocity };
        true
    }

    /// Moves one axis; returns `true` if it hit a boundary.
    fn inertia_step(&mut self, axis: PanAxis, step: f64) -> bool {
        if step == 0.0 {
            return false;
        }
        let Some(state) = self.axis_mut(axis) else {
            return true;
        };
        let target = state.offset + step;
        let applied = state.scroll_to(target);
        applied != step
    }

    /// Stops panning and inertia immediately.
    pub fn stop_panning(&mut self) {
        self.pan = PanState::Idle;
    }
}

impl std::fmt::Debug for ScrollViewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollViewer")
            .field("horizontal", &self.horizontal)
            .field("vertical", &self.vertical)
            .field("horizontal_visibility", &self.horizontal_visibility)
            .field("vertical_visibility", &self.vertical_visibility)
            .field("can_content_scroll", &self.can_content_scroll)
            .field("queued_commands", &self.commands.len())
            .field("pan", &self.pan)
            .finish()
    }
}

fn computed_visibility(visibility: ScrollBarVisibility, axis: &Axis) -> ComputedVisibility {
    match visibility {
        ScrollBarVisibility::Visible => ComputedVisibility::Visible,
        ScrollBarVisibility::Auto if axis.extent > axis.viewport => ComputedVisibility::Visible,
        _ => ComputedVisibility::Collapsed,
    }
}

fn speed(velocity: (f64, f64)) -> f64 {
    velocity.0.hypot(velocity.1)
}

static_assertions::assert_impl_all!(ScrollViewer: Send, Sync);
