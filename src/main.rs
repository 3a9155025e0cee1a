use bootchart_tui::BootchartLoader;
use bootchart_tui::view::{DisplayOptions, Session, SortOrder, ViewVariant};
use clap::{Args, Parser as ClapParser, Subcommand};
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(name = "bootchart-tui")]
#[command(about = "Explore bootchart boot traces in the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a trace in the interactive viewer
    View {
        /// Bootchart log directory or JSON trace
        #[arg(value_name = "PATH")]
        path: PathBuf,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Load a trace and write the export snapshot as JSON
    Dump {
        /// Bootchart log directory or JSON trace
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Pretty print JSON output
        #[arg(short, long)]
        pretty: bool,

        /// Export the kernel boot view instead of the full tree
        #[arg(short, long)]
        kernel: bool,

        #[command(flatten)]
        display: DisplayArgs,
    },
}

#[derive(Args)]
struct DisplayArgs {
    /// Append the PID to process labels
    #[arg(long)]
    show_pid: bool,

    /// Show full command lines
    #[arg(long)]
    show_all: bool,

    /// Keep short-lived and idle processes
    #[arg(long)]
    no_prune: bool,

    /// Hide kernel threads
    #[arg(long)]
    hide_kernel_threads: bool,

    /// Sibling order of the process tree
    #[arg(long, value_enum, default_value_t = SortOrder::Pid)]
    sort: SortOrder,

    /// Do not draw the activity chart above the process rows
    #[arg(long)]
    no_charts: bool,

    /// Cumulative activity chart
    #[arg(long)]
    cumulative: bool,
}

impl DisplayArgs {
    fn options(&self) -> DisplayOptions {
        DisplayOptions {
            show_pid: self.show_pid,
            show_all: self.show_all,
            prune: !self.no_prune,
            show_kernel: !self.hide_kernel_threads,
            sort: self.sort,
            charts: !self.no_charts,
            cumulative: self.cumulative,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::View { path, display } => {
            view_trace(path, display.options());
        }
        Commands::Dump {
            path,
            output,
            pretty,
            kernel,
            display,
        } => {
            env_logger::Builder::new().parse_default_env().init();
            dump_trace(path, output, pretty, kernel, display.options());
        }
    }
}

fn open_session(path: PathBuf, options: DisplayOptions) -> Session<BootchartLoader> {
    match Session::open(BootchartLoader, path.clone(), options) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("Error loading {}: {}", path.display(), err);
            std::process::exit(1);
        }
    }
}

fn view_trace(path: PathBuf, options: DisplayOptions) {
    let session = open_session(path, options);

    if let Err(err) = bootchart_tui::tui::run_tui(session) {
        eprintln!("TUI error: {}", err);
        std::process::exit(1);
    }
}

fn dump_trace(
    path: PathBuf,
    output: Option<PathBuf>,
    pretty: bool,
    kernel: bool,
    options: DisplayOptions,
) {
    let mut session = open_session(path, options);

    if kernel {
        match session
            .views()
            .iter()
            .position(|v| v.variant() == ViewVariant::KernelBoot)
        {
            Some(index) => session.select_view(index),
            None => {
                eprintln!("Error: trace has no kernel boot samples");
                std::process::exit(1);
            }
        }
    }

    let snapshot = session.export_snapshot();
    let json = if pretty {
        serde_json::to_string_pretty(&snapshot)
    } else {
        serde_json::to_string(&snapshot)
    };

    let json = match json {
        Ok(j) => j,
        Err(err) => {
            eprintln!("Error serializing to JSON: {}", err);
            std::process::exit(1);
        }
    };

    // Write output
    if let Some(output_path) = output {
        if let Err(err) = std::fs::write(&output_path, json) {
            eprintln!("Error writing to {}: {}", output_path.display(), err);
            std::process::exit(1);
        }
        eprintln!("Output written to {}", output_path.display());
    } else {
        println!("{}", json);
    }
}
