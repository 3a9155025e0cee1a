use bootchart_tui::tui::{App, AppEvent};
use bootchart_tui::view::{
    DisplayOption, DisplayOptions, ROW_HEIGHT, Session, SessionState, ViewVariant,
};
use bootchart_tui::{BootchartLoader, ParseError, ParseResult, Trace};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

const PROC_PS: &str = "\
100
1 (init) S 0 1 1 0 -1 0 0 0 0 0 10 5 0 0 20 0 1 0 1 0 0
2 (kthreadd) S 0 0 0 0 -1 0 0 0 0 0 0 0 0 0 20 0 1 0 1 0 0
3 (ksoftirqd/0) S 2 0 0 0 -1 0 0 0 0 0 0 1 0 0 20 0 1 0 2 0 0

200
1 (init) S 0 1 1 0 -1 0 0 0 0 0 20 6 0 0 20 0 1 0 1 0 0
2 (kthreadd) S 0 0 0 0 -1 0 0 0 0 0 0 0 0 0 20 0 1 0 1 0 0
3 (ksoftirqd/0) S 2 0 0 0 -1 0 0 0 0 0 0 1 0 0 20 0 1 0 2 0 0
40 (sh) R 1 40 40 0 -1 0 0 0 0 0 3 1 0 0 20 0 1 0 150 0 0

300
1 (init) S 0 1 1 0 -1 0 0 0 0 0 30 7 0 0 20 0 1 0 1 0 0
2 (kthreadd) S 0 0 0 0 -1 0 0 0 0 0 0 0 0 0 20 0 1 0 1 0 0
3 (ksoftirqd/0) S 2 0 0 0 -1 0 0 0 0 0 0 1 0 0 20 0 1 0 2 0 0
40 (udevd) R 1 40 40 0 -1 0 0 0 0 0 9 2 0 0 20 0 1 0 150 0 0
";

const DMESG: &str = "\
[    0.100000] calling  pci_init+0x0/0x1 @ 1
[    0.150000] initcall pci_init+0x0/0x1 returned 0 after 40 usecs
[    0.200000] calling  net_init+0x0/0x1 @ 1
[    0.300000] initcall net_init+0x0/0x1 returned 0 after 90 usecs
[    0.500000] Freeing unused kernel memory: 100K
";

fn write_logs(dir: &Path, with_dmesg: bool) {
    fs::write(dir.join("proc_ps.log"), PROC_PS).unwrap();
    fs::write(
        dir.join("header"),
        "title = Boot chart for test\nsystem.kernel = 6.1.0\n",
    )
    .unwrap();
    fs::write(
        dir.join("cmdline2.log"),
        "40\n:/sbin/udevd\n:/sbin/udevd\0--daemon\0\n\n",
    )
    .unwrap();
    if with_dmesg {
        fs::write(dir.join("dmesg"), DMESG).unwrap();
    }
}

fn keep_all() -> DisplayOptions {
    DisplayOptions {
        prune: false,
        charts: false,
        ..DisplayOptions::default()
    }
}

fn has_pid(trace: &Trace, pid: u32) -> bool {
    let mut stack: Vec<_> = trace.processes.iter().collect();
    while let Some(node) = stack.pop() {
        if node.pid == pid {
            return true;
        }
        stack.extend(node.children.iter());
    }
    false
}

#[test]
fn test_open_log_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(dir.path(), true);

    let session = Session::open(BootchartLoader, dir.path(), keep_all()).unwrap();

    assert!(session.title().starts_with("Bootchart "));
    assert_eq!(session.status(), "Boot time: 00:02.00");
    assert_eq!(session.views().len(), 2);
    assert_eq!(session.views()[0].variant(), ViewVariant::FullTree);
    assert_eq!(session.views()[1].variant(), ViewVariant::KernelBoot);
    assert!(has_pid(session.trace(), 40));
}

#[test]
fn test_no_kernel_view_without_dmesg() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(dir.path(), false);

    let session = Session::open(BootchartLoader, dir.path(), keep_all()).unwrap();
    assert_eq!(session.views().len(), 1);
}

#[test]
fn test_prune_toggle_reloads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(dir.path(), false);

    let mut session = Session::open(BootchartLoader, dir.path(), keep_all()).unwrap();
    let height = session.current_view().viewport().chart_size().height;

    // udevd lives for 150cs with a 100cs sample period: short-lived
    session.toggle_option(DisplayOption::Prune, true).unwrap();
    assert_eq!(session.generation(), 1);
    assert!(!has_pid(session.trace(), 40));
    assert_eq!(
        session.current_view().viewport().chart_size().height,
        height - ROW_HEIGHT
    );
}

#[test]
fn test_failed_reload_leaves_session_untouched() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(dir.path(), false);

    let fail = Rc::new(Cell::new(false));
    let flag = fail.clone();
    let source = move |options: &DisplayOptions, path: &Path| -> ParseResult<Trace> {
        if flag.get() {
            Err(ParseError::Io("disk went away".to_string()))
        } else {
            bootchart_tui::parser::load(options, path)
        }
    };

    let mut session = Session::open(source, dir.path(), keep_all()).unwrap();
    let (view, trace) = session.current_view_and_trace();
    view.search(trace, "udev");
    let positions = session.current_view().navigator().matches().positions().to_vec();

    fail.set(true);
    assert!(session.toggle_option(DisplayOption::Prune, true).is_err());

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.generation(), 0);
    assert!(!session.options().prune);
    assert!(has_pid(session.trace(), 40));
    assert_eq!(
        session.current_view().navigator().matches().positions(),
        positions.as_slice()
    );
}

#[test]
fn test_search_walks_matches_in_row_order() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(dir.path(), false);

    let mut session = Session::open(BootchartLoader, dir.path(), keep_all()).unwrap();
    let (view, trace) = session.current_view_and_trace();

    // Rows: init, udevd, kthreadd, ksoftirqd/0
    view.search(trace, "D");
    assert_eq!(
        view.navigator().matches().positions(),
        &[136.0, 152.0, 168.0]
    );
    assert_eq!(view.navigator().label(), "1/3");

    view.find_step(bootchart_tui::view::Direction::Previous);
    assert_eq!(view.navigator().label(), "3/3");

    view.search(trace, "no such process");
    assert_eq!(view.navigator().label(), "0 matches");
}

#[test]
fn test_exported_snapshot_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(dir.path(), true);

    let session = Session::open(BootchartLoader, dir.path(), keep_all()).unwrap();
    let snapshot = session.export_snapshot();
    assert_eq!(snapshot.options.search_query, None);

    let path = dir.path().join("snapshot.json");
    fs::write(&path, serde_json::to_string_pretty(&snapshot).unwrap()).unwrap();

    let reloaded = Session::open(BootchartLoader, &path, keep_all()).unwrap();
    assert_eq!(reloaded.trace().processes, session.trace().processes);
    assert_eq!(reloaded.trace().kernel_sample_count(), 3);
    assert_eq!(reloaded.views().len(), 2);
}

#[test]
fn test_app_drives_session() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(dir.path(), true);

    let session = Session::open(BootchartLoader, dir.path(), keep_all()).unwrap();
    let mut app = App::new(session);
    let key = |c| AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));

    app.handle_event(key('p'));
    assert!(app.session.options().show_pid);
    assert!(app.session.views().iter().all(|v| v.options().show_pid));

    app.handle_event(AppEvent::Key(KeyEvent::new(
        KeyCode::Tab,
        KeyModifiers::NONE,
    )));
    assert_eq!(app.session.active_index(), 1);

    app.handle_event(key('r'));
    assert_eq!(app.session.active_index(), 1);
    assert_eq!(app.status.as_deref(), Some("Reloaded"));
}

#[test]
fn test_open_another_trace() {
    let first = tempfile::tempdir().unwrap();
    write_logs(first.path(), false);
    let second = tempfile::tempdir().unwrap();
    write_logs(second.path(), true);

    let mut session = Session::open(BootchartLoader, first.path(), keep_all()).unwrap();
    assert_eq!(session.views().len(), 1);

    let missing = first.path().join("missing");
    assert!(session.open_path(&missing).is_err());
    assert_eq!(session.path(), first.path());
    assert_eq!(session.generation(), 0);

    session.open_path(second.path()).unwrap();
    assert_eq!(session.path(), second.path());
    assert_eq!(session.generation(), 1);
    assert_eq!(session.views().len(), 2);
    assert_eq!(session.trace().kernel_sample_count(), 3);
}
