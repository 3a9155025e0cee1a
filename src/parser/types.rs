use serde::{Deserialize, Serialize};

use crate::view::layout::ChartSize;
use crate::view::options::RenderOptions;

/// A single process in the boot process tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessNode {
    /// Process ID
    pub pid: u32,

    /// Parent process ID (0 for roots)
    pub ppid: u32,

    /// Command name (from /proc/<pid>/stat, without parentheses)
    pub cmd: String,

    /// Executable path (from cmdline2.log, if collected)
    #[serde(default)]
    pub exe: Option<String>,

    /// Command line arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Start time in centiseconds
    pub start_time: f64,

    /// Lifetime in centiseconds
    pub duration: f64,

    /// Accumulated user + system CPU time in clock ticks
    #[serde(default)]
    pub cpu_time: u64,

    /// Child processes, in display order
    #[serde(default)]
    pub children: Vec<ProcessNode>,
}

impl ProcessNode {
    /// Create a leaf process with no command line information
    pub fn new(pid: u32, ppid: u32, cmd: impl Into<String>, start_time: f64, duration: f64) -> Self {
        Self {
            pid,
            ppid,
            cmd: cmd.into(),
            exe: None,
            args: Vec::new(),
            start_time,
            duration,
            cpu_time: 0,
            children: Vec::new(),
        }
    }

    /// Time at which the process was last seen
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Whether `query_lower` (already lowercased) occurs in the command,
    /// the executable path, or any single argument.
    pub fn matches(&self, query_lower: &str) -> bool {
        if self.cmd.to_lowercase().contains(query_lower) {
            return true;
        }
        if let Some(exe) = &self.exe
            && exe.to_lowercase().contains(query_lower)
        {
            return true;
        }
        self.args
            .iter()
            .any(|arg| arg.to_lowercase().contains(query_lower))
    }
}

/// A kernel initcall recorded in dmesg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSample {
    /// Initcall function name (e.g. "pci_init")
    pub name: String,

    /// Start time in centiseconds since kernel boot
    pub start_time: f64,

    /// Duration in centiseconds
    pub duration: f64,
}

/// A fully loaded bootchart trace
///
/// Immutable once produced by the loader: a reload replaces the whole value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    /// File or directory the trace was read from
    pub filename: String,

    /// Header key/value pairs (title, kernel version, ...)
    #[serde(default)]
    pub headers: Vec<(String, String)>,

    /// Root processes of the user-space process tree
    pub processes: Vec<ProcessNode>,

    /// Kernel boot samples (only present when dmesg was collected)
    #[serde(default)]
    pub kernel: Option<Vec<KernelSample>>,

    /// Kernel boot samples arranged as a tree under a `k-boot` root
    #[serde(default)]
    pub kernel_tree: Vec<ProcessNode>,

    /// First sample time in centiseconds
    pub start_time: f64,

    /// Last sample time in centiseconds
    pub end_time: f64,

    /// Average interval between process samples, in centiseconds
    pub sample_period: f64,

    /// Time at which the system went idle, if known (centiseconds)
    #[serde(default)]
    pub idle: Option<f64>,
}

impl Trace {
    /// Total duration of the trace in centiseconds
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }

    /// Header value by key
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The process tree a view with `options` displays
    pub fn proc_tree(&self, options: &RenderOptions) -> &[ProcessNode] {
        if options.kernel_only {
            &self.kernel_tree
        } else {
            &self.processes
        }
    }

    /// Number of kernel samples (0 without dmesg)
    pub fn kernel_sample_count(&self) -> usize {
        self.kernel.as_ref().map_or(0, Vec::len)
    }

    /// Boot time as `mm:ss.ss`, preferring the idle time when it is known
    pub fn boot_time_label(&self) -> String {
        let centis = self.idle.unwrap_or_else(|| self.duration());
        let secs = centis / 100.0;
        let minutes = (secs / 60.0).floor();
        format!("{:02}:{:05.2}", minutes as u64, secs - 60.0 * minutes)
    }

    /// Rebuild the kernel tree from the kernel samples
    pub fn rebuild_kernel_tree(&mut self) {
        self.kernel_tree = match &self.kernel {
            Some(samples) => super::tree::build_kernel_tree(samples),
            None => Vec::new(),
        };
    }
}

/// Read-only snapshot handed to export backends
#[derive(Debug, Serialize)]
pub struct ExportSnapshot<'a> {
    /// The trace being displayed
    pub trace: &'a Trace,

    /// Options of the view being exported
    pub options: RenderOptions,

    /// Canvas size at unit horizontal scale
    pub extents: ChartSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace_with(duration: f64, idle: Option<f64>) -> Trace {
        Trace {
            filename: "test".to_string(),
            headers: vec![("title".to_string(), "Boot chart".to_string())],
            processes: Vec::new(),
            kernel: None,
            kernel_tree: Vec::new(),
            start_time: 100.0,
            end_time: 100.0 + duration,
            sample_period: 20.0,
            idle,
        }
    }

    #[test]
    fn test_matches_command_exe_and_args() {
        let mut node = ProcessNode::new(1, 0, "Init", 0.0, 10.0);
        node.exe = Some("/sbin/INIT".to_string());
        node.args = vec!["--Foo".to_string(), "bar".to_string()];

        assert!(node.matches("init"));
        assert!(node.matches("/sbin"));
        assert!(node.matches("foo"));
        assert!(!node.matches("foo bar"));
        assert!(!node.matches("systemd"));
    }

    #[test]
    fn test_boot_time_label_uses_idle() {
        assert_eq!(trace_with(1234.0, None).boot_time_label(), "00:12.34");
        assert_eq!(trace_with(1234.0, Some(7550.0)).boot_time_label(), "01:15.50");
    }

    #[test]
    fn test_header_lookup() {
        let trace = trace_with(10.0, None);
        assert_eq!(trace.header("title"), Some("Boot chart"));
        assert_eq!(trace.header("missing"), None);
        assert_eq!(trace.kernel_sample_count(), 0);
    }
}
