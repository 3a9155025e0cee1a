use std::collections::VecDeque;

use super::layout::{ChartSize, OFF_X};
use super::range::RangeControl;

/// Zoom factor of the zoom in/out actions
pub const ZOOM_INCREMENT: f64 = 1.25;

/// Zoom factor of one Ctrl+wheel step
pub const WHEEL_ZOOM_INCREMENT: f64 = 1.1;

/// Keyboard pan distance, in screen pixels
pub const POS_INCREMENT: f64 = 100.0;

/// Factor of the expand/contract timeline actions
pub const XSCALE_INCREMENT: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Notifications produced by a viewport, delivered in the order they happened
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewEvent {
    /// The visible area must be drawn again
    Repaint,
    /// The pan offset moved (logical coordinates)
    PositionChanged { x: f64, y: f64 },
    /// Best-fit mode was switched on or off
    BestFitChanged(bool),
    /// The host changed a range control value
    RangeValueChanged(Axis),
}

/// Zoom, pan and scrollbar state of one view
///
/// Pan offsets are in logical canvas units. Range control values are in
/// screen pixels: `value = pan * zoom`.
#[derive(Debug, Clone)]
pub struct Viewport {
    zoom: f64,
    xscale: f64,
    pan_x: f64,
    pan_y: f64,
    best_fit: bool,
    chart: ChartSize,
    visible_width: f64,
    visible_height: f64,
    hadj: RangeControl,
    vadj: RangeControl,
    events: VecDeque<ViewEvent>,
    drag_from: Option<(f64, f64)>,
}

fn check_positive(what: &str, value: f64) {
    assert!(
        value > 0.0 && value.is_finite(),
        "{} must be positive and finite, got {}",
        what,
        value
    );
}

impl Viewport {
    /// Create a viewport over a canvas of `chart` size drawn at `xscale`
    ///
    /// Until the host reports its real size, the visible area is the whole
    /// canvas.
    pub fn new(chart: ChartSize, xscale: f64) -> Self {
        check_positive("xscale", xscale);

        let mut viewport = Self {
            zoom: 1.0,
            xscale,
            pan_x: 0.0,
            pan_y: 0.0,
            best_fit: true,
            chart,
            visible_width: chart.width,
            visible_height: chart.height,
            hadj: RangeControl::default(),
            vadj: RangeControl::default(),
            events: VecDeque::new(),
            drag_from: None,
        };
        viewport.reconfigure_ranges();
        viewport
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn xscale(&self) -> f64 {
        self.xscale
    }

    pub fn pan(&self) -> (f64, f64) {
        (self.pan_x, self.pan_y)
    }

    pub fn best_fit(&self) -> bool {
        self.best_fit
    }

    pub fn chart_size(&self) -> ChartSize {
        self.chart
    }

    pub fn visible_size(&self) -> (f64, f64) {
        (self.visible_width, self.visible_height)
    }

    pub fn range(&self, axis: Axis) -> &RangeControl {
        match axis {
            Axis::Horizontal => &self.hadj,
            Axis::Vertical => &self.vadj,
        }
    }

    fn range_mut(&mut self, axis: Axis) -> &mut RangeControl {
        match axis {
            Axis::Horizontal => &mut self.hadj,
            Axis::Vertical => &mut self.vadj,
        }
    }

    /// Logical canvas coordinates to screen pixels
    pub fn to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.pan_x) * self.zoom, (y - self.pan_y) * self.zoom)
    }

    /// Screen pixels to logical canvas coordinates
    pub fn to_logical(&self, x: f64, y: f64) -> (f64, f64) {
        (x / self.zoom + self.pan_x, y / self.zoom + self.pan_y)
    }

    /// Logical rectangle currently on screen: (x, y, width, height)
    pub fn visible_logical_rect(&self) -> (f64, f64, f64, f64) {
        (
            self.pan_x,
            self.pan_y,
            self.visible_width / self.zoom,
            self.visible_height / self.zoom,
        )
    }

    /// Set the zoom ratio. An explicit zoom (`auto_fit == false`) turns
    /// best-fit mode off.
    pub fn set_zoom(&mut self, ratio: f64, auto_fit: bool) {
        check_positive("zoom ratio", ratio);

        if !auto_fit && self.best_fit {
            self.set_best_fit_flag(false);
        }

        log::debug!("zoom {:.3} -> {:.3}", self.zoom, ratio);
        self.zoom = ratio;
        self.reconfigure_ranges();
        self.events.push_back(ViewEvent::Repaint);
    }

    /// Zoom so that the canvas width fills `visible_width`, scrolled to the left edge
    pub fn zoom_to_rect(&mut self, visible_width: f64) {
        if visible_width <= 0.0 || self.chart.width <= 0.0 {
            return;
        }

        self.zoom = visible_width / self.chart.width;
        self.hadj.set_value_silently(0.0);
        self.reconfigure_ranges();
        self.events.push_back(ViewEvent::Repaint);
        self.position_changed();
    }

    /// Fit the canvas width and scroll to the top left corner; ignored while
    /// the host reports a zero-area window
    pub fn zoom_to_best_fit(&mut self, visible_width: f64, visible_height: f64) {
        if visible_width <= 0.0 || visible_height <= 0.0 || self.chart.width <= 0.0 {
            return;
        }

        self.zoom = visible_width / self.chart.width;
        self.hadj.set_value_silently(0.0);
        self.vadj.set_value_silently(0.0);
        self.reconfigure_ranges();
        self.events.push_back(ViewEvent::Repaint);
        self.position_changed();
    }

    /// Change the horizontal time scale
    ///
    /// `extents` maps an xscale to the canvas size. The zoom ratio is kept
    /// and the horizontal center stays on the same point in time; best-fit
    /// mode is left as it was and re-applied if on.
    pub fn set_xscale<F>(&mut self, xscale: f64, extents: F)
    where
        F: FnOnce(f64) -> ChartSize,
    {
        check_positive("xscale", xscale);

        // Time grows from the left margin, so only the part past it scales
        let half_page = self.visible_width / self.zoom / 2.0;
        let center = OFF_X + (self.pan_x + half_page - OFF_X) * xscale / self.xscale;

        self.xscale = xscale;
        self.chart = extents(xscale);
        self.reconfigure_ranges();
        self.hadj.set_value_silently((center - half_page) * self.zoom);
        self.pan_x = self.hadj.value() / self.zoom;

        if self.best_fit {
            self.zoom_to_best_fit(self.visible_width, self.visible_height);
        }
        self.events.push_back(ViewEvent::Repaint);
    }

    /// Replace the canvas size after an options change
    pub fn set_chart_size(&mut self, chart: ChartSize) {
        if chart == self.chart {
            return;
        }

        self.chart = chart;
        self.reconfigure_ranges();
        self.events.push_back(ViewEvent::Repaint);
    }

    /// Pan by a distance in screen pixels
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx / self.zoom;
        self.pan_y += dy / self.zoom;
        self.clamp_pan();
        self.events.push_back(ViewEvent::Repaint);
        self.position_changed();
    }

    /// The host window changed size
    pub fn on_resize(&mut self, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        if width == self.visible_width && height == self.visible_height {
            return;
        }

        log::debug!("resize {}x{}", width, height);
        self.visible_width = width;
        self.visible_height = height;

        if self.best_fit {
            self.zoom_to_best_fit(width, height);
        }

        // The range controls are the source of truth for pan after a resize
        self.reconfigure_ranges();
        self.events.push_back(ViewEvent::Repaint);
    }

    /// Pick up a range control value written by the host
    pub fn sync_from_range_control(&mut self, axis: Axis) {
        let value = self.range(axis).value();
        match axis {
            Axis::Horizontal => self.pan_x = value / self.zoom,
            Axis::Vertical => self.pan_y = value / self.zoom,
        }
        self.events.push_back(ViewEvent::Repaint);
    }

    /// Host-initiated range control write (scrollbar drag, wheel scroll)
    pub fn scroll_range(&mut self, axis: Axis, value: f64) {
        let range = self.range_mut(axis);
        range.set_value(value);
        if range.take_notification() {
            self.events.push_back(ViewEvent::RangeValueChanged(axis));
        }
    }

    /// Scroll so that logical `y` sits in the middle of the window
    pub fn center_on_logical_y(&mut self, y: f64) {
        let page = self.vadj.page_size();
        let value = (y * self.zoom - page / 2.0).min(self.vadj.upper() - page).max(0.0);
        self.vadj.set_value_silently(value);
        self.pan_y = self.vadj.value() / self.zoom;
        self.events.push_back(ViewEvent::Repaint);
        self.position_changed();
    }

    /// Deliver queued notifications in arrival order
    ///
    /// Range control notifications are consumed here and update the pan
    /// offset; everything else is returned for the host.
    pub fn dispatch(&mut self) -> Vec<ViewEvent> {
        let mut out = Vec::new();
        while let Some(event) = self.events.pop_front() {
            match event {
                ViewEvent::RangeValueChanged(axis) => self.sync_from_range_control(axis),
                other => out.push(other),
            }
        }
        out
    }

    /// Ask for a redraw without moving anything (highlight or label changes)
    pub fn request_repaint(&mut self) {
        self.events.push_back(ViewEvent::Repaint);
    }

    /// Whether any notification is waiting
    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * ZOOM_INCREMENT, false);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / ZOOM_INCREMENT, false);
    }

    /// Fit width once; best-fit mode is turned off
    pub fn zoom_fit(&mut self) {
        if self.best_fit {
            self.set_best_fit_flag(false);
        }
        self.zoom_to_rect(self.visible_width);
    }

    /// Reset to 1:1 zoom and unit time scale
    pub fn zoom_100<F>(&mut self, extents: F)
    where
        F: FnOnce(f64) -> ChartSize,
    {
        self.set_zoom(1.0, false);
        self.set_xscale(1.0, extents);
    }

    pub fn expand<F>(&mut self, extents: F)
    where
        F: FnOnce(f64) -> ChartSize,
    {
        self.set_xscale(self.xscale * XSCALE_INCREMENT, extents);
    }

    pub fn contract<F>(&mut self, extents: F)
    where
        F: FnOnce(f64) -> ChartSize,
    {
        self.set_xscale(self.xscale / XSCALE_INCREMENT, extents);
    }

    /// Switch best-fit mode; turning it on fits immediately
    pub fn set_best_fit(&mut self, on: bool) {
        if on == self.best_fit {
            return;
        }
        self.set_best_fit_flag(on);
        if on {
            self.zoom_to_best_fit(self.visible_width, self.visible_height);
        }
    }

    pub fn pointer_press(&mut self, x: f64, y: f64) {
        self.drag_from = Some((x, y));
    }

    /// Drag-pan while the pointer is held
    pub fn pointer_motion(&mut self, x: f64, y: f64) {
        if let Some((prev_x, prev_y)) = self.drag_from {
            self.pan_by(prev_x - x, prev_y - y);
            self.drag_from = Some((x, y));
        }
    }

    pub fn pointer_release(&mut self) {
        self.drag_from = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_from.is_some()
    }

    /// Wheel input: zooms with Ctrl held, otherwise scrolls one step
    pub fn scroll(&mut self, direction: ScrollDirection, ctrl: bool) {
        if ctrl {
            match direction {
                ScrollDirection::Up => self.set_zoom(self.zoom * WHEEL_ZOOM_INCREMENT, false),
                ScrollDirection::Down => self.set_zoom(self.zoom / WHEEL_ZOOM_INCREMENT, false),
                ScrollDirection::Left | ScrollDirection::Right => {}
            }
            return;
        }

        let (axis, sign) = match direction {
            ScrollDirection::Up => (Axis::Vertical, -1.0),
            ScrollDirection::Down => (Axis::Vertical, 1.0),
            ScrollDirection::Left => (Axis::Horizontal, -1.0),
            ScrollDirection::Right => (Axis::Horizontal, 1.0),
        };
        let range = self.range(axis);
        let value = range.value() + sign * range.step_increment();
        self.scroll_range(axis, value);
    }

    /// Keyboard pan by [`POS_INCREMENT`] pixels
    pub fn pan_step(&mut self, direction: ScrollDirection) {
        match direction {
            ScrollDirection::Up => self.pan_by(0.0, -POS_INCREMENT),
            ScrollDirection::Down => self.pan_by(0.0, POS_INCREMENT),
            ScrollDirection::Left => self.pan_by(-POS_INCREMENT, 0.0),
            ScrollDirection::Right => self.pan_by(POS_INCREMENT, 0.0),
        }
    }

    /// Scroll one page up or down
    pub fn page(&mut self, down: bool) {
        let step = self.vadj.page_increment();
        let value = self.vadj.value() + if down { step } else { -step };
        self.scroll_range(Axis::Vertical, value);
    }

    fn set_best_fit_flag(&mut self, on: bool) {
        log::debug!("best fit {}", if on { "on" } else { "off" });
        self.best_fit = on;
        self.events.push_back(ViewEvent::BestFitChanged(on));
    }

    fn position_changed(&mut self) {
        self.events.push_back(ViewEvent::PositionChanged {
            x: self.pan_x,
            y: self.pan_y,
        });
    }

    /// Recompute both range controls from zoom, canvas and window size,
    /// then derive pan from the (possibly clamped) values. Never notifies.
    fn reconfigure_ranges(&mut self) {
        self.hadj
            .configure(self.zoom * self.chart.width, self.visible_width);
        self.vadj
            .configure(self.zoom * self.chart.height, self.visible_height);
        self.pan_x = self.hadj.value() / self.zoom;
        self.pan_y = self.vadj.value() / self.zoom;
    }

    /// Apply the clamp rule to the pan offset and mirror it into the ranges
    fn clamp_pan(&mut self) {
        let max_x = (self.chart.width - self.visible_width / self.zoom).max(0.0);
        let max_y = (self.chart.height - self.visible_height / self.zoom).max(0.0);
        self.pan_x = self.pan_x.clamp(0.0, max_x);
        self.pan_y = self.pan_y.clamp(0.0, max_y);
        self.hadj.set_value_silently(self.pan_x * self.zoom);
        self.vadj.set_value_silently(self.pan_y * self.zoom);
    }
}
