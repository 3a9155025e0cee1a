use std::path::{Path, PathBuf};

use super::layout::{ChartSize, extents, header_offset};
use super::options::{DisplayOption, DisplayOptions, RenderOptions, SortOrder, ViewVariant};
use super::search::{Direction, Navigator};
use super::viewport::{ViewEvent, Viewport};
use crate::parser::{ExportSnapshot, ParseResult, Trace};

pub const FULL_TREE_NAME: &str = "Full tree";
pub const KERNEL_BOOT_NAME: &str = "Kernel boot";

/// Initial time scale of the full process tree
pub const FULL_TREE_XSCALE: f64 = 3.0;

/// Initial time scale of the kernel view; initcalls are short
pub const KERNEL_BOOT_XSCALE: f64 = 5.0;

/// The kernel view needs more than this many kernel samples
const MIN_KERNEL_SAMPLES: usize = 2;

/// Something that can (re)load a trace with a given set of options
pub trait TraceSource {
    fn load(&self, options: &DisplayOptions, path: &Path) -> ParseResult<Trace>;
}

impl<F> TraceSource for F
where
    F: Fn(&DisplayOptions, &Path) -> ParseResult<Trace>,
{
    fn load(&self, options: &DisplayOptions, path: &Path) -> ParseResult<Trace> {
        self(options, path)
    }
}

/// One tab: a viewport and a find bar over the session's trace
#[derive(Debug, Clone)]
pub struct View {
    name: String,
    variant: ViewVariant,
    options: RenderOptions,
    viewport: Viewport,
    navigator: Navigator,
    generation: u64,
}

impl View {
    fn new(
        name: &str,
        variant: ViewVariant,
        shared: &DisplayOptions,
        xscale: f64,
        trace: &Trace,
        generation: u64,
    ) -> Self {
        let options = RenderOptions::derive(shared, variant);
        let chart = extents(&options, xscale, trace);

        Self {
            name: name.to_string(),
            variant,
            options,
            viewport: Viewport::new(chart, xscale),
            navigator: Navigator::new(),
            generation,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variant(&self) -> ViewVariant {
        self.variant
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Trace generation this view was built for
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Canvas size of this view at `xscale`
    pub fn extents(&self, trace: &Trace, xscale: f64) -> ChartSize {
        extents(&self.options, xscale, trace)
    }

    /// Start a new search and scroll the first match into view
    pub fn search(&mut self, trace: &Trace, query: &str) {
        let roots = trace.proc_tree(&self.options);
        let top = header_offset(&self.options);
        let first = self
            .navigator
            .set_query(query, roots, top, self.generation);

        // The renderer highlights whatever the options carry
        self.options.search_query = self.navigator.query().map(str::to_string);

        if let Some(y) = first {
            self.viewport.center_on_logical_y(y);
        }
        self.viewport.request_repaint();
    }

    /// Jump to the next or previous match
    pub fn find_step(&mut self, direction: Direction) {
        if let Some(y) = self.navigator.step(direction, self.generation) {
            self.viewport.center_on_logical_y(y);
        }
    }

    /// Drop the query, the matches and the highlight
    pub fn clear_search(&mut self) {
        if self.navigator.query().is_none() {
            return;
        }
        self.navigator.clear();
        self.options.search_query = None;
        self.viewport.request_repaint();
    }

    pub fn expand(&mut self, trace: &Trace) {
        let options = &self.options;
        self.viewport.expand(|xscale| extents(options, xscale, trace));
    }

    pub fn contract(&mut self, trace: &Trace) {
        let options = &self.options;
        self.viewport.contract(|xscale| extents(options, xscale, trace));
    }

    pub fn zoom_100(&mut self, trace: &Trace) {
        let options = &self.options;
        self.viewport.zoom_100(|xscale| extents(options, xscale, trace));
    }

    /// Re-derive options from the shared ones after a change that does not
    /// need a reload; recomputes extents and match positions
    fn rederive(&mut self, shared: &DisplayOptions, trace: &Trace) {
        let mut options = RenderOptions::derive(shared, self.variant);
        options.search_query = self.options.search_query.take();
        self.options = options;

        let chart = extents(&self.options, self.viewport.xscale(), trace);
        self.viewport.set_chart_size(chart);
        self.navigator.refresh(
            trace.proc_tree(&self.options),
            header_offset(&self.options),
            self.generation,
        );
        self.viewport.request_repaint();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    Reloading,
}

/// All views over one trace, plus the options they share
pub struct Session<S: TraceSource> {
    source: S,
    path: PathBuf,
    trace: Trace,
    options: DisplayOptions,
    views: Vec<View>,
    active: usize,
    generation: u64,
    state: SessionState,
    viewport_size: Option<(f64, f64)>,
}

impl<S: TraceSource> Session<S> {
    /// Load the trace at `path` and build the default views
    pub fn open(source: S, path: impl Into<PathBuf>, options: DisplayOptions) -> ParseResult<Self> {
        let path = path.into();
        let trace = source.load(&options, &path)?;
        Ok(Self::from_trace(source, path, options, trace))
    }

    /// Build a session around an already loaded trace
    pub fn from_trace(
        source: S,
        path: impl Into<PathBuf>,
        options: DisplayOptions,
        trace: Trace,
    ) -> Self {
        let mut session = Self {
            source,
            path: path.into(),
            trace,
            options,
            views: Vec::new(),
            active: 0,
            generation: 0,
            state: SessionState::Ready,
            viewport_size: None,
        };
        session.build_views();
        session
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn options(&self) -> &DisplayOptions {
        &self.options
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Add a view over the current trace. A kernel view is only added when
    /// the trace has enough kernel samples; returns whether it was added.
    pub fn add_view(&mut self, name: &str, variant: ViewVariant, xscale: f64) -> bool {
        if variant == ViewVariant::KernelBoot
            && self.trace.kernel_sample_count() <= MIN_KERNEL_SAMPLES
        {
            return false;
        }

        let mut view = View::new(
            name,
            variant,
            &self.options,
            xscale,
            &self.trace,
            self.generation,
        );
        if let Some((width, height)) = self.viewport_size {
            view.viewport.on_resize(width, height);
        }
        self.views.push(view);
        true
    }

    fn build_views(&mut self) {
        self.views.clear();
        self.add_view(FULL_TREE_NAME, ViewVariant::FullTree, FULL_TREE_XSCALE);
        self.add_view(KERNEL_BOOT_NAME, ViewVariant::KernelBoot, KERNEL_BOOT_XSCALE);
        log::debug!("Built {} views", self.views.len());
    }

    pub fn current_view(&self) -> &View {
        &self.views[self.active]
    }

    pub fn current_view_mut(&mut self) -> &mut View {
        &mut self.views[self.active]
    }

    /// The active view together with the trace it shows
    pub fn current_view_and_trace(&mut self) -> (&mut View, &Trace) {
        (&mut self.views[self.active], &self.trace)
    }

    pub fn select_view(&mut self, index: usize) {
        if index < self.views.len() {
            self.active = index;
            self.views[index].viewport.request_repaint();
        }
    }

    pub fn next_view(&mut self) {
        self.select_view((self.active + 1) % self.views.len());
    }

    /// Change a shared display option
    ///
    /// Options that change the tree shape reload the trace; if that fails
    /// the option is restored and the error returned. Other options only
    /// refresh the geometry of the views that follow the shared value.
    pub fn toggle_option(&mut self, option: DisplayOption, value: bool) -> ParseResult<()> {
        let old = option.get(&self.options);
        if old == value {
            return Ok(());
        }

        log::debug!("{} -> {}", option.label(), value);
        option.set(&mut self.options, value);

        if option.requires_reload() {
            if let Err(e) = self.reload() {
                option.set(&mut self.options, old);
                return Err(e);
            }
            return Ok(());
        }

        for view in self
            .views
            .iter_mut()
            .filter(|v| !v.variant.overrides(option))
        {
            view.rederive(&self.options, &self.trace);
        }
        Ok(())
    }

    /// Change the sibling order; the tree is loaded again
    pub fn set_sort_order(&mut self, sort: SortOrder) -> ParseResult<()> {
        let old = self.options.sort;
        if old == sort {
            return Ok(());
        }

        self.options.sort = sort;
        if let Err(e) = self.reload() {
            self.options.sort = old;
            return Err(e);
        }
        Ok(())
    }

    /// Run the trace source for `path`; nothing is replaced here
    fn load_trace(&mut self, path: &Path) -> ParseResult<Trace> {
        self.state = SessionState::Reloading;
        let result = self.source.load(&self.options, path);
        self.state = SessionState::Ready;

        if let Err(e) = &result {
            log::warn!("Loading {} failed: {}", path.display(), e);
        }
        result
    }

    /// Load the trace again with the current options and rebuild every view
    ///
    /// On failure the previous trace and views are left untouched.
    pub fn reload(&mut self) -> ParseResult<()> {
        log::debug!("Reloading {}", self.path.display());
        let path = self.path.clone();
        let trace = self.load_trace(&path)?;

        let active_name = self.current_view().name.clone();
        let active_index = self.active;

        self.trace = trace;
        self.generation += 1;
        self.build_views();

        self.active = self
            .views
            .iter()
            .position(|v| v.name == active_name)
            .or_else(|| (active_index < self.views.len()).then_some(active_index))
            .unwrap_or(0);

        log::info!(
            "Reloaded {} (generation {})",
            self.trace.filename,
            self.generation
        );
        Ok(())
    }

    /// Switch to another trace with the current options
    ///
    /// On failure the session keeps showing the current trace.
    pub fn open_path(&mut self, path: impl Into<PathBuf>) -> ParseResult<()> {
        let path = path.into();
        log::debug!("Opening {}", path.display());
        let trace = self.load_trace(&path)?;

        self.path = path;
        self.trace = trace;
        self.generation += 1;
        self.build_views();
        self.active = 0;

        log::info!(
            "Opened {} (generation {})",
            self.trace.filename,
            self.generation
        );
        Ok(())
    }

    /// Forward the host window size to every view
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport_size = Some((width, height));
        for view in &mut self.views {
            view.viewport.on_resize(width, height);
        }
    }

    /// Deliver the queued notifications of every view; returns those of the
    /// active one
    pub fn dispatch_events(&mut self) -> Vec<ViewEvent> {
        let mut active = Vec::new();
        for (index, view) in self.views.iter_mut().enumerate() {
            let events = view.viewport.dispatch();
            if index == self.active {
                active = events;
            }
        }
        active
    }

    /// Trace and current view options for export, sized at unit time scale
    pub fn export_snapshot(&self) -> ExportSnapshot<'_> {
        let options = self.current_view().options.clone();
        let extents = extents(&options, 1.0, &self.trace);
        ExportSnapshot {
            trace: &self.trace,
            options,
            extents,
        }
    }

    pub fn title(&self) -> String {
        format!("Bootchart {}", self.trace.filename)
    }

    pub fn status(&self) -> String {
        format!("Boot time: {}", self.trace.boot_time_label())
    }
}
