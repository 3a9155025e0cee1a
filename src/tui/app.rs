use super::chart::{CELL_H, CELL_W};
use super::events::AppEvent;
use crate::parser::BootchartLoader;
use crate::view::options::DisplayOption;
use crate::view::search::Direction;
use crate::view::session::{Session, TraceSource};
use crate::view::viewport::{Axis, ScrollDirection, ViewEvent};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

/// One-line text prompt at the bottom of the screen
pub struct SearchBar {
    pub active: bool,
    pub input: String,
}

impl SearchBar {
    fn new() -> Self {
        Self {
            active: false,
            input: String::new(),
        }
    }
}

pub struct App<S: TraceSource = BootchartLoader> {
    pub session: Session<S>,

    // UI State
    pub search: SearchBar,
    pub open: SearchBar,
    pub status: Option<String>,
    pub chart_area: Rect,

    // Flags
    pub should_quit: bool,
    pub show_help: bool,
}

impl<S: TraceSource> App<S> {
    pub fn new(session: Session<S>) -> Self {
        Self {
            session,
            search: SearchBar::new(),
            open: SearchBar::new(),
            status: None,
            chart_area: Rect::default(),
            should_quit: false,
            show_help: false,
        }
    }

    /// Record where the chart is drawn and forward its size in pixels
    pub fn set_chart_area(&mut self, area: Rect) {
        if area == self.chart_area {
            return;
        }
        self.chart_area = area;
        self.session.resize(
            area.width as f64 * CELL_W,
            area.height as f64 * CELL_H,
        );
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Mouse(mouse) => self.handle_mouse(mouse),
            // The chart area is measured again on the next draw
            AppEvent::Resize(..) => {}
        }
        self.process_view_events();
    }

    /// Deliver the queued viewport notifications of every view
    pub fn process_view_events(&mut self) {
        for event in self.session.dispatch_events() {
            if let ViewEvent::BestFitChanged(on) = event {
                self.status = Some(format!("Best fit {}", if on { "on" } else { "off" }));
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        // Priority 1: Open prompt
        if self.open.active {
            self.handle_open_key(key);
            return;
        }

        // Priority 2: Find bar
        if self.search.active {
            self.handle_search_key(key);
            return;
        }

        // Priority 3: Help screen
        if self.show_help {
            if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
                self.show_help = false;
            }
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            // Quit
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            KeyCode::Char('c') if ctrl => {
                self.should_quit = true;
            }

            // Help
            KeyCode::Char('?') => {
                self.show_help = true;
            }

            // Zoom
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.session.current_view_mut().viewport_mut().zoom_in();
            }
            KeyCode::Char('-') => {
                self.session.current_view_mut().viewport_mut().zoom_out();
            }
            KeyCode::Char('0') => {
                let (view, trace) = self.session.current_view_and_trace();
                view.zoom_100(trace);
            }
            KeyCode::Char('f') => {
                self.session.current_view_mut().viewport_mut().zoom_fit();
            }
            KeyCode::Char('b') => {
                let viewport = self.session.current_view_mut().viewport_mut();
                let on = !viewport.best_fit();
                viewport.set_best_fit(on);
            }
            KeyCode::Char(']') | KeyCode::Char('>') => {
                let (view, trace) = self.session.current_view_and_trace();
                view.expand(trace);
            }
            KeyCode::Char('[') | KeyCode::Char('<') => {
                let (view, trace) = self.session.current_view_and_trace();
                view.contract(trace);
            }

            // Navigation
            KeyCode::Up | KeyCode::Char('k') => self.pan(ScrollDirection::Up),
            KeyCode::Down | KeyCode::Char('j') => self.pan(ScrollDirection::Down),
            KeyCode::Left | KeyCode::Char('h') => self.pan(ScrollDirection::Left),
            KeyCode::Right | KeyCode::Char('l') => self.pan(ScrollDirection::Right),
            KeyCode::PageUp => {
                self.session.current_view_mut().viewport_mut().page(false);
            }
            KeyCode::PageDown => {
                self.session.current_view_mut().viewport_mut().page(true);
            }
            KeyCode::Home | KeyCode::Char('g') => {
                let viewport = self.session.current_view_mut().viewport_mut();
                viewport.scroll_range(Axis::Horizontal, 0.0);
                viewport.scroll_range(Axis::Vertical, 0.0);
            }
            KeyCode::End | KeyCode::Char('G') => {
                let viewport = self.session.current_view_mut().viewport_mut();
                let bottom = viewport.range(Axis::Vertical).max_value();
                viewport.scroll_range(Axis::Vertical, bottom);
            }

            // Tabs
            KeyCode::Tab => {
                self.session.next_view();
            }
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                self.session.select_view(index);
            }

            // Display options
            KeyCode::Char('p') => self.toggle(DisplayOption::ShowPid),
            KeyCode::Char('a') => self.toggle(DisplayOption::ShowAll),
            KeyCode::Char('P') => self.toggle(DisplayOption::Prune),
            KeyCode::Char('K') => self.toggle(DisplayOption::ShowKernel),
            KeyCode::Char('c') => self.toggle(DisplayOption::Charts),
            KeyCode::Char('C') => self.toggle(DisplayOption::Cumulative),
            KeyCode::Char('s') => {
                let sort = self.session.options().sort.next();
                match self.session.set_sort_order(sort) {
                    Ok(()) => self.status = Some(format!("Sorted by {}", sort.label())),
                    Err(e) => self.status = Some(format!("Reload failed: {}", e)),
                }
            }
            KeyCode::Char('r') => match self.session.reload() {
                Ok(()) => self.status = Some("Reloaded".to_string()),
                Err(e) => self.status = Some(format!("Reload failed: {}", e)),
            },

            KeyCode::Char('o') => {
                self.open.active = true;
                self.open.input = self.session.path().display().to_string();
            }

            // Search controls
            KeyCode::Char('/') => {
                self.search.active = true;
                self.search.input = self
                    .session
                    .current_view()
                    .navigator()
                    .query()
                    .unwrap_or_default()
                    .to_string();
            }
            KeyCode::Char('n') | KeyCode::F(3) if !key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.session.current_view_mut().find_step(Direction::Next);
            }
            KeyCode::Char('N') | KeyCode::F(3) => {
                self.session.current_view_mut().find_step(Direction::Previous);
            }

            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search.input.push(c);
                self.update_search();
            }
            KeyCode::Backspace => {
                self.search.input.pop();
                self.update_search();
            }
            KeyCode::F(3) if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.session.current_view_mut().find_step(Direction::Previous);
            }
            KeyCode::Enter | KeyCode::F(3) => {
                self.session.current_view_mut().find_step(Direction::Next);
            }
            KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.session.current_view_mut().find_step(Direction::Previous);
            }
            KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.session.current_view_mut().find_step(Direction::Next);
            }
            KeyCode::Esc => {
                // Close the bar and drop the highlight
                self.search.active = false;
                self.search.input.clear();
                self.session.current_view_mut().clear_search();
            }
            _ => {}
        }
    }

    fn handle_open_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.open.input.push(c);
            }
            KeyCode::Backspace => {
                self.open.input.pop();
            }
            KeyCode::Enter => {
                self.open.active = false;
                let path = std::mem::take(&mut self.open.input);
                self.status = match self.session.open_path(&path) {
                    Ok(()) => {
                        // A new trace starts with an empty find bar
                        self.search.input.clear();
                        Some(format!("Opened {}", path))
                    }
                    Err(e) => Some(format!("Open failed: {}", e)),
                };
            }
            KeyCode::Esc => {
                self.open.active = false;
                self.open.input.clear();
            }
            _ => {}
        }
    }

    fn update_search(&mut self) {
        let (view, trace) = self.session.current_view_and_trace();
        view.search(trace, &self.search.input);
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let area = self.chart_area;
        let inside = mouse.column >= area.x
            && mouse.column < area.x + area.width
            && mouse.row >= area.y
            && mouse.row < area.y + area.height;
        let x = (mouse.column.saturating_sub(area.x)) as f64 * CELL_W;
        let y = (mouse.row.saturating_sub(area.y)) as f64 * CELL_H;
        let ctrl = mouse.modifiers.contains(KeyModifiers::CONTROL);

        let viewport = self.session.current_view_mut().viewport_mut();
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if inside => viewport.pointer_press(x, y),
            MouseEventKind::Drag(MouseButton::Left) => viewport.pointer_motion(x, y),
            MouseEventKind::Up(MouseButton::Left) => viewport.pointer_release(),
            MouseEventKind::ScrollUp if inside => viewport.scroll(ScrollDirection::Up, ctrl),
            MouseEventKind::ScrollDown if inside => viewport.scroll(ScrollDirection::Down, ctrl),
            MouseEventKind::ScrollLeft if inside => viewport.scroll(ScrollDirection::Left, ctrl),
            MouseEventKind::ScrollRight if inside => viewport.scroll(ScrollDirection::Right, ctrl),
            _ => {}
        }
    }

    fn pan(&mut self, direction: ScrollDirection) {
        self.session
            .current_view_mut()
            .viewport_mut()
            .pan_step(direction);
    }

    fn toggle(&mut self, option: DisplayOption) {
        let value = !option.get(self.session.options());
        self.status = match self.session.toggle_option(option, value) {
            Ok(()) => Some(format!(
                "{}: {}",
                option.label(),
                if value { "on" } else { "off" }
            )),
            Err(e) => Some(format!("Reload failed: {}", e)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseError, ProcessNode, Trace};
    use crate::view::options::DisplayOptions;
    use std::cell::Cell;
    use std::path::Path;
    use std::rc::Rc;

    fn trace() -> Trace {
        let mut init = ProcessNode::new(1, 0, "init", 0.0, 1000.0);
        for pid in 2..40 {
            let mut child = ProcessNode::new(pid, 1, format!("worker{}", pid), 10.0, 500.0);
            child.args = vec![format!("--id={}", pid)];
            init.children.push(child);
        }

        Trace {
            filename: "boot".to_string(),
            headers: Vec::new(),
            processes: vec![init],
            kernel: None,
            kernel_tree: Vec::new(),
            start_time: 0.0,
            end_time: 1000.0,
            sample_period: 20.0,
            idle: None,
        }
    }

    fn app() -> (
        App<impl Fn(&DisplayOptions, &Path) -> Result<Trace, ParseError>>,
        Rc<Cell<bool>>,
    ) {
        let fail = Rc::new(Cell::new(false));
        let flag = fail.clone();
        let source = move |_: &DisplayOptions, _: &Path| {
            if flag.get() {
                Err(ParseError::Io("gone".to_string()))
            } else {
                Ok(trace())
            }
        };
        let session = Session::open(source, "boot", DisplayOptions::default()).unwrap();
        let mut app = App::new(session);
        app.set_chart_area(Rect::new(0, 2, 80, 20));
        (app, fail)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App<impl TraceSource>, text: &str) {
        for c in text.chars() {
            app.handle_event(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_chart_area_resizes_views() {
        let (app, _) = app();
        let viewport = app.session.current_view().viewport();
        assert_eq!(viewport.visible_size(), (640.0, 320.0));
        // Best fit: the canvas width fills the window
        assert!((viewport.zoom() * viewport.chart_size().width - 640.0).abs() < 1e-9);
    }

    #[test]
    fn test_search_bar_flow() {
        let (mut app, _) = app();

        app.handle_event(key(KeyCode::Char('/')));
        assert!(app.search.active);

        type_text(&mut app, "worker3");
        let view = app.session.current_view();
        // worker3 and worker30..worker39
        assert_eq!(view.navigator().label(), "1/11");
        assert_eq!(view.options().search_query.as_deref(), Some("worker3"));

        app.handle_event(key(KeyCode::Enter));
        assert_eq!(app.session.current_view().navigator().label(), "2/11");

        app.handle_event(AppEvent::Key(KeyEvent::new(KeyCode::F(3), KeyModifiers::SHIFT)));
        assert_eq!(app.session.current_view().navigator().label(), "1/11");

        app.handle_event(key(KeyCode::Esc));
        assert!(!app.search.active);
        assert_eq!(app.session.current_view().navigator().label(), "");
        assert_eq!(app.session.current_view().options().search_query, None);
    }

    #[test]
    fn test_search_scrolls_to_match() {
        let (mut app, _) = app();
        app.handle_event(key(KeyCode::Char('/')));
        type_text(&mut app, "--id=39");

        let (_, pan_y) = app.session.current_view().viewport().pan();
        assert!(pan_y > 0.0);
    }

    #[test]
    fn test_failed_reload_reports_status() {
        let (mut app, fail) = app();
        fail.set(true);

        app.handle_event(key(KeyCode::Char('P')));
        assert!(app.session.options().prune);
        assert!(
            app.status
                .as_deref()
                .is_some_and(|s| s.starts_with("Reload failed"))
        );
    }

    #[test]
    fn test_zoom_keys_turn_best_fit_off() {
        let (mut app, _) = app();
        assert!(app.session.current_view().viewport().best_fit());

        app.handle_event(key(KeyCode::Char('+')));
        assert!(!app.session.current_view().viewport().best_fit());
        assert_eq!(app.status.as_deref(), Some("Best fit off"));
    }

    #[test]
    fn test_open_prompt() {
        let (mut app, fail) = app();
        app.handle_event(key(KeyCode::Char('o')));
        assert!(app.open.active);
        assert_eq!(app.open.input, "boot");

        // Keys go to the prompt, not to the chart
        type_text(&mut app, "2q");
        assert!(!app.should_quit);

        fail.set(true);
        app.handle_event(key(KeyCode::Enter));
        assert!(!app.open.active);
        assert_eq!(app.session.path(), Path::new("boot"));
        assert!(
            app.status
                .as_deref()
                .is_some_and(|s| s.starts_with("Open failed"))
        );

        fail.set(false);
        app.handle_event(key(KeyCode::Char('o')));
        type_text(&mut app, "2");
        app.handle_event(key(KeyCode::Enter));
        assert_eq!(app.session.path(), Path::new("boot2"));
        assert_eq!(app.session.generation(), 1);
        assert_eq!(app.status.as_deref(), Some("Opened boot2"));
        // The new views keep the chart size
        assert_eq!(
            app.session.current_view().viewport().visible_size(),
            (640.0, 320.0)
        );
    }

    #[test]
    fn test_quit() {
        let (mut app, _) = app();
        app.handle_event(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }
}
