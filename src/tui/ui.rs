use super::app::App;
use super::chart::{CELL_H, ChartWidget};
use crate::view::session::TraceSource;
use crate::view::viewport::Axis;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Tabs,
        Wrap,
    },
};

pub fn draw<S: TraceSource>(f: &mut Frame, app: &mut App<S>) {
    let show_tabs = app.session.views().len() > 1;

    let mut constraints = vec![Constraint::Length(1)]; // Header line
    if show_tabs {
        constraints.push(Constraint::Length(1)); // Tabs
    }
    constraints.extend([
        Constraint::Length(1), // Divider
        Constraint::Min(0),    // Chart
        Constraint::Length(1), // Find bar or divider
        Constraint::Length(1), // Footer line
    ]);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.area());

    let mut next = 0;
    let mut take = || {
        next += 1;
        chunks[next - 1]
    };

    draw_header(f, app, take());
    if show_tabs {
        draw_tabs(f, app, take());
    }
    draw_divider(f, take());
    draw_chart(f, app, take());

    let bottom = take();
    if app.open.active {
        draw_open_bar(f, app, bottom);
    } else if app.search.active {
        draw_search_bar(f, app, bottom);
    } else {
        draw_divider(f, bottom);
    }
    draw_footer(f, app, take());

    // Draw help modal on top if active
    if app.show_help {
        draw_help(f);
    }
}

fn draw_header<S: TraceSource>(f: &mut Frame, app: &App<S>, area: Rect) {
    let viewport = app.session.current_view().viewport();

    let mut header_text = format!(
        "{} | {} | Zoom: {:.0}% | Scale: {:.2}",
        app.session.title(),
        app.session.status(),
        viewport.zoom() * 100.0,
        viewport.xscale(),
    );
    if viewport.best_fit() {
        header_text.push_str(" | Best fit");
    }

    let header = Paragraph::new(header_text).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    f.render_widget(header, area);
}

fn draw_tabs<S: TraceSource>(f: &mut Frame, app: &App<S>, area: Rect) {
    let titles: Vec<Line> = app
        .session
        .views()
        .iter()
        .enumerate()
        .map(|(i, view)| Line::from(format!("{}:{}", i + 1, view.name())))
        .collect();

    let tabs = Tabs::new(titles)
        .select(app.session.active_index())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_divider(f: &mut Frame, area: Rect) {
    let divider = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray));

    f.render_widget(divider, area);
}

fn draw_chart<S: TraceSource>(f: &mut Frame, app: &mut App<S>, area: Rect) {
    // Last column is the vertical scrollbar
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    // Resizing may queue a refit that has to land before this frame
    app.set_chart_area(chunks[0]);
    app.process_view_events();

    let view = app.session.current_view();
    f.render_widget(ChartWidget::new(app.session.trace(), view), chunks[0]);

    let vadj = view.viewport().range(Axis::Vertical);
    let rows = (vadj.max_value() / CELL_H).ceil() as usize;
    if rows == 0 {
        return;
    }
    let mut state = ScrollbarState::new(rows)
        .position((vadj.value() / CELL_H).round() as usize)
        .viewport_content_length((vadj.page_size() / CELL_H) as usize);
    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(None)
        .end_symbol(None)
        .style(Style::default().fg(Color::DarkGray));

    f.render_stateful_widget(scrollbar, chunks[1], &mut state);
}

fn draw_footer<S: TraceSource>(f: &mut Frame, app: &App<S>, area: Rect) {
    let mut footer_text = String::from(
        "+/-: Zoom | f: Fit | b: Best fit | [/]: Scale | ←↑↓→: Pan | /: Find | Tab: View | o: Open | q: Quit | ?: Help",
    );

    if let Some(status) = &app.status {
        footer_text = format!("{} | {}", status, footer_text);
    }

    let footer = Paragraph::new(footer_text).style(Style::default().fg(Color::DarkGray));
    f.render_widget(footer, area);
}

fn draw_open_bar<S: TraceSource>(f: &mut Frame, app: &App<S>, area: Rect) {
    let text = format!("Open: {}█  Enter:load Esc:cancel", app.open.input);
    let paragraph =
        Paragraph::new(text).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(paragraph, area);
}

fn draw_search_bar<S: TraceSource>(f: &mut Frame, app: &App<S>, area: Rect) {
    let navigator = app.session.current_view().navigator();
    let match_info = if app.search.input.is_empty() {
        String::new()
    } else if navigator.matches().is_empty() {
        "No matches".to_string()
    } else {
        navigator.label()
    };

    let text = if match_info.is_empty() {
        format!(
            "Find: {}█  Enter/F3:next Shift+F3:prev Esc:close",
            app.search.input
        )
    } else {
        format!(
            "Find: {}█  [{}]  Enter/F3:next Shift+F3:prev Esc:close",
            app.search.input, match_info
        )
    };

    let paragraph =
        Paragraph::new(text).style(Style::default().bg(Color::DarkGray).fg(Color::White));

    f.render_widget(paragraph, area);
}

fn draw_help(f: &mut Frame) {
    let section = |title: &'static str| {
        Line::from(Span::styled(
            title,
            Style::default().add_modifier(Modifier::UNDERLINED),
        ))
    };

    let help_text = vec![
        Line::from(Span::styled(
            "bootchart-tui Help",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        section("Zoom:"),
        Line::from("  +/=         Zoom in"),
        Line::from("  -           Zoom out"),
        Line::from("  0           Reset zoom and time scale"),
        Line::from("  f           Fit width once"),
        Line::from("  b           Toggle best fit"),
        Line::from("  ]/>         Expand time scale"),
        Line::from("  [/<         Contract time scale"),
        Line::from("  Ctrl+Wheel  Zoom"),
        Line::from(""),
        section("Navigation:"),
        Line::from("  ←↑↓→/hjkl   Pan"),
        Line::from("  PageUp      Scroll up one page"),
        Line::from("  PageDown    Scroll down one page"),
        Line::from("  Home/g      Jump to top left"),
        Line::from("  End/G       Jump to bottom"),
        Line::from("  Drag        Pan with the mouse"),
        Line::from("  Tab/1-9     Switch view"),
        Line::from(""),
        section("Display:"),
        Line::from("  p           Show PIDs"),
        Line::from("  a           Show full command lines"),
        Line::from("  P           Prune uninteresting processes"),
        Line::from("  K           Show kernel threads"),
        Line::from("  c           Show resource charts"),
        Line::from("  C           Cumulative activity"),
        Line::from("  s           Cycle sort order"),
        Line::from("  r           Reload"),
        Line::from("  o           Open another trace"),
        Line::from(""),
        section("Find:"),
        Line::from("  /           Open find bar"),
        Line::from("  n/F3        Next match"),
        Line::from("  N/Shift+F3  Previous match"),
        Line::from("  Esc         Close find bar"),
        Line::from(""),
        section("Other:"),
        Line::from("  q/Q         Quit"),
        Line::from("  ?           Toggle this help"),
        Line::from("  Ctrl+C      Force quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press ? or Esc to close help",
            Style::default().fg(Color::Yellow),
        )),
    ];

    let help = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: true });

    let area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, area);
    f.render_widget(help, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
