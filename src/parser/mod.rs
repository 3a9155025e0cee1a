mod kernel_parser;
mod line_parser;
mod tree;
mod types;

pub use kernel_parser::{KERNEL_BOOT_NAME, parse_dmesg};
pub use line_parser::{CmdlineRecord, StatRecord, parse_cmdline_block, parse_stat_line};
pub use tree::{build_kernel_tree, build_tree, shape_tree};
pub use types::*;

use crate::view::options::DisplayOptions;
use crate::view::session::TraceSource;
use line_parser::{parse_header_line, parse_timed_blocks};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Errors that can occur while loading a bootchart trace
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid line format: {0}")]
    InvalidFormat(String),

    #[error("Invalid process line: {0}")]
    InvalidProcess(String),

    #[error("Invalid kernel log line: {0}")]
    InvalidKernel(String),

    #[error("Missing required log: {0}")]
    MissingLog(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid trace file: {0}")]
    Json(String),
}

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

const HEADER_LOG: &str = "header";
const PROC_PS_LOG: &str = "proc_ps.log";
const CMDLINE_LOG: &str = "cmdline2.log";
const DMESG_LOG: &str = "dmesg";

/// Trace source reading bootchart logs from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct BootchartLoader;

impl TraceSource for BootchartLoader {
    fn load(&self, options: &DisplayOptions, path: &Path) -> ParseResult<Trace> {
        load(options, path)
    }
}

/// Load a trace from a bootchart log directory or a JSON dump
///
/// Tree-shaping options (kernel threads, pruning, sort order) are applied
/// here, so changing any of them requires loading again.
pub fn load(options: &DisplayOptions, path: &Path) -> ParseResult<Trace> {
    log::debug!("Loading trace from {}", path.display());

    let mut trace = if path.is_dir() {
        load_log_dir(path)?
    } else if path.extension().is_some_and(|ext| ext == "json") {
        load_json(path)?
    } else {
        return Err(ParseError::InvalidFormat(format!(
            "{} is neither a bootchart log directory nor a .json trace",
            path.display()
        )));
    };

    let processes = std::mem::take(&mut trace.processes);
    trace.processes = shape_tree(
        processes,
        options,
        trace.start_time,
        trace.duration(),
        trace.sample_period,
    );
    trace.rebuild_kernel_tree();

    if trace.processes.is_empty() {
        return Err(ParseError::InvalidFormat(format!(
            "No processes found in {}",
            path.display()
        )));
    }

    log::info!(
        "Loaded {} ({} root processes, {} kernel samples)",
        trace.filename,
        trace.processes.len(),
        trace.kernel_sample_count()
    );

    Ok(trace)
}

fn read_log(path: &Path) -> ParseResult<String> {
    fs::read_to_string(path)
        .map_err(|e| ParseError::Io(format!("Failed to read {}: {}", path.display(), e)))
}

fn read_optional_log(dir: &Path, name: &str) -> ParseResult<Option<String>> {
    let path = dir.join(name);
    if path.is_file() {
        read_log(&path).map(Some)
    } else {
        Ok(None)
    }
}

/// Either a bare trace or an exported snapshot wrapping one
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum JsonTrace {
    Snapshot { trace: Trace },
    Trace(Trace),
}

fn load_json(path: &Path) -> ParseResult<Trace> {
    let content = read_log(path)?;
    let parsed: JsonTrace = serde_json::from_str(&content)
        .map_err(|e| ParseError::Json(format!("{}: {}", path.display(), e)))?;
    Ok(match parsed {
        JsonTrace::Snapshot { trace } | JsonTrace::Trace(trace) => trace,
    })
}

/// Per-pid accumulation over the samples of proc_ps.log
#[derive(Debug)]
struct ProcessSamples {
    ppid: u32,
    comm: String,
    stat_start: u64,
    first_seen: u64,
    last_seen: u64,
    cpu_time: u64,
}

fn load_log_dir(dir: &Path) -> ParseResult<Trace> {
    let mut headers = Vec::new();
    if let Some(content) = read_optional_log(dir, HEADER_LOG)? {
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match parse_header_line(line) {
                Ok(pair) => headers.push(pair),
                Err(e) => log::warn!("{}: {}", HEADER_LOG, e),
            }
        }
    }

    let proc_ps = dir.join(PROC_PS_LOG);
    if !proc_ps.is_file() {
        return Err(ParseError::MissingLog(format!(
            "{} not found in {}",
            PROC_PS_LOG,
            dir.display()
        )));
    }
    let content = read_log(&proc_ps)?;
    let (blocks, errors) = parse_timed_blocks(&content);
    for (line, e) in &errors {
        log::warn!("{}:{}: {}", PROC_PS_LOG, line, e);
    }

    let (Some(first), Some(last)) = (blocks.first(), blocks.last()) else {
        return Err(ParseError::InvalidFormat(format!(
            "{} contains no samples",
            PROC_PS_LOG
        )));
    };
    let start_time = first.time as f64;
    let end_time = last.time as f64;
    let sample_period = if blocks.len() > 1 {
        (end_time - start_time) / (blocks.len() - 1) as f64
    } else {
        0.0
    };

    let mut samples: HashMap<u32, ProcessSamples> = HashMap::new();
    for block in &blocks {
        for line in &block.lines {
            let record = match parse_stat_line(line) {
                Ok(record) => record,
                Err(e) => {
                    log::debug!("{}: skipping line: {}", PROC_PS_LOG, e);
                    continue;
                }
            };

            let entry = samples.entry(record.pid).or_insert_with(|| ProcessSamples {
                ppid: record.ppid,
                comm: record.comm.clone(),
                stat_start: record.start_time,
                first_seen: block.time,
                last_seen: block.time,
                cpu_time: 0,
            });
            // Processes that exec keep their pid but change their name
            entry.comm = record.comm;
            entry.ppid = record.ppid;
            entry.last_seen = block.time;
            entry.cpu_time = record.utime + record.stime;
        }
    }

    let mut cmdlines: HashMap<u32, CmdlineRecord> = HashMap::new();
    if let Some(content) = read_optional_log(dir, CMDLINE_LOG)? {
        for block in content.split("\n\n").filter(|b| !b.trim().is_empty()) {
            match parse_cmdline_block(block.trim_start_matches('\n')) {
                Ok(record) => {
                    cmdlines.insert(record.pid, record);
                }
                Err(e) => log::warn!("{}: {}", CMDLINE_LOG, e),
            }
        }
    }

    let records = samples
        .into_iter()
        .map(|(pid, s)| {
            let start = (s.stat_start.min(s.first_seen)) as f64;
            let mut node = ProcessNode::new(pid, s.ppid, s.comm, start, s.last_seen as f64 - start);
            node.cpu_time = s.cpu_time;
            if let Some(cmdline) = cmdlines.remove(&pid) {
                node.exe = Some(cmdline.exe).filter(|exe| !exe.is_empty());
                node.args = cmdline.args;
            }
            node
        })
        .collect();

    let kernel = match read_optional_log(dir, DMESG_LOG)? {
        Some(content) => {
            let (samples, errors) = parse_dmesg(&content);
            for (line, e) in &errors {
                log::warn!("{}:{}: {}", DMESG_LOG, line, e);
            }
            Some(samples).filter(|s| !s.is_empty())
        }
        None => None,
    };

    Ok(Trace {
        filename: dir.display().to_string(),
        headers,
        processes: build_tree(records),
        kernel,
        kernel_tree: Vec::new(),
        start_time,
        end_time,
        sample_period,
        idle: None,
    })
}
