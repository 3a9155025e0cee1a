use super::process_colors::process_category_color;
use crate::parser::{ProcessNode, Trace};
use crate::view::View;
use crate::view::layout::{
    CHARTS_HEIGHT, ROW_HEIGHT, TITLE_HEIGHT, TimeSpan, header_offset, walk_rows,
};
use crate::view::options::RenderOptions;
use crate::view::viewport::Viewport;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

/// Screen pixels covered by one terminal cell
pub const CELL_W: f64 = 8.0;
pub const CELL_H: f64 = 16.0;

/// Minimum distance between time axis labels, in cells
const TICK_SPACING: f64 = 8.0;

/// Text shown next to a process bar
pub fn process_label(node: &ProcessNode, options: &RenderOptions) -> String {
    let base = if options.show_all && !node.args.is_empty() {
        node.args.join(" ")
    } else {
        node.cmd.clone()
    };

    if options.show_pid {
        format!("{} [{}]", base, node.pid)
    } else {
        base
    }
}

/// Draws the logical canvas of one view, as seen through its viewport
pub struct ChartWidget<'a> {
    trace: &'a Trace,
    view: &'a View,
}

impl<'a> ChartWidget<'a> {
    pub fn new(trace: &'a Trace, view: &'a View) -> Self {
        Self { trace, view }
    }
}

/// Maps logical canvas coordinates to cells of `area`
struct CellMapper<'a> {
    viewport: &'a Viewport,
    area: Rect,
}

impl CellMapper<'_> {
    fn col(&self, x: f64) -> i64 {
        (self.viewport.to_screen(x, 0.0).0 / CELL_W).floor() as i64
    }

    fn row(&self, y: f64) -> i64 {
        (self.viewport.to_screen(0.0, y).1 / CELL_H).floor() as i64
    }

    fn visible_row(&self, row: i64) -> bool {
        row >= 0 && row < self.area.height as i64
    }

    /// Write `text` at a cell position, clipped to the area
    fn put(&self, buf: &mut Buffer, col: i64, row: i64, text: &str, style: Style) {
        let width = self.area.width as i64;
        if !self.visible_row(row) || col >= width {
            return;
        }

        let skip = (-col).max(0) as usize;
        let text: String = text.chars().skip(skip).collect();
        let col = col.max(0);
        buf.set_stringn(
            self.area.x + col as u16,
            self.area.y + row as u16,
            text,
            (width - col) as usize,
            style,
        );
    }

    /// Style the cells `[col0, col1)` of a row, clipped to the area
    fn fill(&self, buf: &mut Buffer, col0: i64, col1: i64, row: i64, style: Style) {
        if !self.visible_row(row) {
            return;
        }
        let col0 = col0.max(0);
        let col1 = col1.min(self.area.width as i64);
        if col0 >= col1 {
            return;
        }

        let rect = Rect::new(
            self.area.x + col0 as u16,
            self.area.y + row as u16,
            (col1 - col0) as u16,
            1,
        );
        buf.set_style(rect, style);
    }
}

impl Widget for ChartWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let viewport = self.view.viewport();
        let options = self.view.options();
        let span = TimeSpan::of(self.trace, options);
        let mapper = CellMapper { viewport, area };

        self.render_title(&mapper, buf);
        self.render_time_axis(&mapper, buf, &span);
        if options.charts {
            self.render_activity(&mapper, buf, &span);
        }
        self.render_processes(&mapper, buf, &span);
    }
}

impl ChartWidget<'_> {
    fn render_title(&self, mapper: &CellMapper, buf: &mut Buffer) {
        let title = self
            .trace
            .header("title")
            .map(str::to_string)
            .unwrap_or_else(|| format!("Bootchart for {}", self.trace.filename));

        let col = mapper.col(0.0);
        mapper.put(
            buf,
            col,
            mapper.row(0.0),
            &title,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

        if let Some(kernel) = self.trace.header("system.kernel") {
            mapper.put(
                buf,
                col,
                mapper.row(ROW_HEIGHT),
                &format!("kernel: {}", kernel),
                Style::default().fg(Color::DarkGray),
            );
        }
        mapper.put(
            buf,
            col,
            mapper.row(2.0 * ROW_HEIGHT),
            &format!("time: {}", self.trace.boot_time_label()),
            Style::default().fg(Color::DarkGray),
        );
    }

    fn render_time_axis(&self, mapper: &CellMapper, buf: &mut Buffer, span: &TimeSpan) {
        let xscale = mapper.viewport.xscale();
        let row = mapper.row(TITLE_HEIGHT - ROW_HEIGHT);
        if !mapper.visible_row(row) {
            return;
        }

        // Label every n seconds so that labels don't collide
        let cells_per_second =
            (span.time_to_x(span.start + 100.0, xscale) - span.time_to_x(span.start, xscale))
                * mapper.viewport.zoom()
                / CELL_W;
        let every = (TICK_SPACING / cells_per_second.max(f64::EPSILON)).ceil().max(1.0) as u64;
        let seconds = (span.duration() / 100.0).ceil() as u64;

        let style = Style::default().fg(Color::DarkGray);
        for second in (0..=seconds).step_by(every as usize) {
            let x = span.time_to_x(span.start + second as f64 * 100.0, xscale);
            let col = mapper.col(x);
            if col >= mapper.area.width as i64 {
                break;
            }
            mapper.put(buf, col, row, &format!("|{}s", second), style);
        }
    }

    /// Number of running (or, in cumulative mode, started) processes over time
    fn render_activity(&self, mapper: &CellMapper, buf: &mut Buffer, span: &TimeSpan) {
        let options = self.view.options();
        let xscale = mapper.viewport.xscale();

        let mut lifetimes = Vec::new();
        walk_rows(self.trace.proc_tree(options), 0.0, &mut |node, _, _| {
            lifetimes.push((node.start_time, node.end_time()));
        });
        if lifetimes.is_empty() {
            return;
        }

        let count_at = |t: f64| -> usize {
            lifetimes
                .iter()
                .filter(|(start, end)| {
                    *start <= t && (options.cumulative || t < *end)
                })
                .count()
        };
        // The running count peaks right when some process starts
        let peak = if options.cumulative {
            lifetimes.len()
        } else {
            lifetimes
                .iter()
                .map(|(start, _)| count_at(*start))
                .max()
                .unwrap_or(1)
        };
        let max = peak.max(1);

        let label = if options.cumulative {
            "Started processes"
        } else {
            "Running processes"
        };
        mapper.put(
            buf,
            mapper.col(0.0),
            mapper.row(TITLE_HEIGHT),
            label,
            Style::default().fg(Color::Green),
        );

        let top = mapper.row(TITLE_HEIGHT + ROW_HEIGHT);
        let bottom = mapper.row(TITLE_HEIGHT + CHARTS_HEIGHT - ROW_HEIGHT);
        let height = (bottom - top).max(1) as f64;
        let first_col = mapper.col(span.time_to_x(span.start, xscale)).max(0);
        let last_col = mapper
            .col(span.time_to_x(span.end, xscale))
            .min(mapper.area.width as i64 - 1);

        for col in first_col..=last_col {
            let screen_x = (col as f64 + 0.5) * CELL_W;
            let (x, _) = mapper.viewport.to_logical(screen_x, 0.0);
            let count = count_at(span.x_to_time(x, xscale));
            let bar = (count as f64 / max as f64 * height).round() as i64;
            for row in (bottom - bar + 1)..=bottom {
                mapper.put(buf, col, row, "█", Style::default().fg(Color::Green));
            }
        }
    }

    fn render_processes(&self, mapper: &CellMapper, buf: &mut Buffer, span: &TimeSpan) {
        let options = self.view.options();
        let xscale = mapper.viewport.xscale();
        let query = options.search_query.as_deref().map(str::to_lowercase);
        let (_, top, _, height) = mapper.viewport.visible_logical_rect();

        walk_rows(
            self.trace.proc_tree(options),
            header_offset(options),
            &mut |node, _, y| {
                if y + ROW_HEIGHT <= top || y >= top + height {
                    return;
                }
                let row = mapper.row(y);
                if !mapper.visible_row(row) {
                    return;
                }

                let color = process_category_color(node);
                let col0 = mapper.col(span.time_to_x(node.start_time, xscale));
                let col1 = mapper
                    .col(span.time_to_x(node.end_time(), xscale))
                    .max(col0 + 1);
                mapper.fill(buf, col0, col1, row, Style::default().bg(color));

                let is_match = query.as_deref().is_some_and(|q| node.matches(q));
                let style = if is_match {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                mapper.put(buf, col1 + 1, row, &process_label(node, options), style);
            },
        );
    }
}
