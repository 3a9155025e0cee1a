use serde::{Deserialize, Serialize};

/// How siblings are ordered in the process tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Ascending process ID
    #[default]
    Pid,
    /// Earliest start first
    StartTime,
    /// Most CPU time first
    CpuTime,
    /// Earliest exit first
    EndTime,
}

impl SortOrder {
    pub fn next(self) -> Self {
        match self {
            SortOrder::Pid => SortOrder::StartTime,
            SortOrder::StartTime => SortOrder::CpuTime,
            SortOrder::CpuTime => SortOrder::EndTime,
            SortOrder::EndTime => SortOrder::Pid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Pid => "pid",
            SortOrder::StartTime => "start time",
            SortOrder::CpuTime => "cpu time",
            SortOrder::EndTime => "end time",
        }
    }
}

/// Display options shared by every view of a session
///
/// Owned by the session; views only ever hold a derived [`RenderOptions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayOptions {
    /// Append the PID to process labels
    pub show_pid: bool,
    /// Show the full command line instead of the command name
    pub show_all: bool,
    /// Remove short-lived and idle processes
    pub prune: bool,
    /// Keep kernel threads (kthreadd subtree)
    pub show_kernel: bool,
    /// Sibling order of the process tree
    pub sort: SortOrder,
    /// Draw the summary charts above the process rows
    pub charts: bool,
    /// Cumulative CPU mode
    pub cumulative: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_pid: false,
            show_all: false,
            prune: true,
            show_kernel: true,
            sort: SortOrder::Pid,
            charts: true,
            cumulative: false,
        }
    }
}

/// A boolean display option that can be toggled from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOption {
    ShowPid,
    ShowAll,
    Prune,
    ShowKernel,
    Charts,
    Cumulative,
}

impl DisplayOption {
    /// Options that change the shape of the process tree and therefore
    /// need the trace to be loaded again
    pub fn requires_reload(self) -> bool {
        matches!(self, DisplayOption::Prune | DisplayOption::ShowKernel)
    }

    pub fn get(self, options: &DisplayOptions) -> bool {
        match self {
            DisplayOption::ShowPid => options.show_pid,
            DisplayOption::ShowAll => options.show_all,
            DisplayOption::Prune => options.prune,
            DisplayOption::ShowKernel => options.show_kernel,
            DisplayOption::Charts => options.charts,
            DisplayOption::Cumulative => options.cumulative,
        }
    }

    pub fn set(self, options: &mut DisplayOptions, value: bool) {
        let field = match self {
            DisplayOption::ShowPid => &mut options.show_pid,
            DisplayOption::ShowAll => &mut options.show_all,
            DisplayOption::Prune => &mut options.prune,
            DisplayOption::ShowKernel => &mut options.show_kernel,
            DisplayOption::Charts => &mut options.charts,
            DisplayOption::Cumulative => &mut options.cumulative,
        };
        *field = value;
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayOption::ShowPid => "show pid",
            DisplayOption::ShowAll => "full command line",
            DisplayOption::Prune => "prune",
            DisplayOption::ShowKernel => "kernel threads",
            DisplayOption::Charts => "charts",
            DisplayOption::Cumulative => "cumulative",
        }
    }
}

/// Which slice of the trace a view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewVariant {
    /// All user-space processes with the summary charts
    FullTree,
    /// Kernel initcalls only
    KernelBoot,
}

impl ViewVariant {
    /// Whether this variant pins `option` to its own value, so changes to
    /// the shared options don't affect it
    pub fn overrides(self, option: DisplayOption) -> bool {
        match self {
            ViewVariant::FullTree => false,
            ViewVariant::KernelBoot => {
                matches!(option, DisplayOption::Charts | DisplayOption::Cumulative)
            }
        }
    }
}

/// Options one view renders with: the shared options plus the view's overrides
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOptions {
    pub show_pid: bool,
    pub show_all: bool,
    pub prune: bool,
    pub show_kernel: bool,
    pub sort: SortOrder,
    pub charts: bool,
    pub cumulative: bool,
    pub kernel_only: bool,
    /// Active highlight filter, if a search is in progress
    pub search_query: Option<String>,
}

impl RenderOptions {
    /// Derive a view's options; the search query is carried over by the caller
    pub fn derive(shared: &DisplayOptions, variant: ViewVariant) -> Self {
        let mut options = Self {
            show_pid: shared.show_pid,
            show_all: shared.show_all,
            prune: shared.prune,
            show_kernel: shared.show_kernel,
            sort: shared.sort,
            charts: shared.charts,
            cumulative: shared.cumulative,
            kernel_only: false,
            search_query: None,
        };

        if variant == ViewVariant::KernelBoot {
            options.cumulative = false;
            options.charts = false;
            options.kernel_only = true;
        }

        options
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::derive(&DisplayOptions::default(), ViewVariant::FullTree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_variant_overrides() {
        let shared = DisplayOptions {
            charts: true,
            cumulative: true,
            show_pid: true,
            ..DisplayOptions::default()
        };

        let full = RenderOptions::derive(&shared, ViewVariant::FullTree);
        assert!(full.charts);
        assert!(full.cumulative);
        assert!(!full.kernel_only);

        let kernel = RenderOptions::derive(&shared, ViewVariant::KernelBoot);
        assert!(!kernel.charts);
        assert!(!kernel.cumulative);
        assert!(kernel.kernel_only);
        assert!(kernel.show_pid);
    }

    #[test]
    fn test_option_get_set() {
        let mut options = DisplayOptions::default();
        assert!(DisplayOption::Prune.get(&options));

        DisplayOption::Prune.set(&mut options, false);
        assert!(!options.prune);

        DisplayOption::ShowPid.set(&mut options, true);
        assert!(options.show_pid);
    }

    #[test]
    fn test_requires_reload() {
        assert!(DisplayOption::Prune.requires_reload());
        assert!(DisplayOption::ShowKernel.requires_reload());
        assert!(!DisplayOption::Charts.requires_reload());
        assert!(!DisplayOption::ShowPid.requires_reload());
    }

    #[test]
    fn test_sort_order_cycles() {
        let mut order = SortOrder::default();
        for _ in 0..4 {
            order = order.next();
        }
        assert_eq!(order, SortOrder::Pid);
    }
}
