//! Geometry of the logical chart canvas.
//!
//! The renderer and the search navigator both place process rows through
//! [`walk_rows`], so a match's predicted position is always the row the
//! renderer draws.

use serde::Serialize;

use super::options::RenderOptions;
use crate::parser::{ProcessNode, Trace};

/// Height of one process row, in logical units
pub const ROW_HEIGHT: f64 = 16.0;

/// Horizontal margin on each side of the timeline
pub const OFF_X: f64 = 10.0;

/// Margin below the last process row
pub const OFF_Y: f64 = 10.0;

/// Width of one second of trace time at xscale 1.0
pub const SEC_W: f64 = 50.0;

/// Title and process-chart header, always present
pub const TITLE_HEIGHT: f64 = 120.0;

/// Summary charts (CPU, I/O) drawn between the title and the process rows
pub const CHARTS_HEIGHT: f64 = 230.0;

/// Size of the logical canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChartSize {
    pub width: f64,
    pub height: f64,
}

/// Vertical space above the first process row
pub fn header_offset(options: &RenderOptions) -> f64 {
    if options.charts {
        TITLE_HEIGHT + CHARTS_HEIGHT
    } else {
        TITLE_HEIGHT
    }
}

/// Number of rows a node occupies: itself plus all its descendants
pub fn subtree_row_count(node: &ProcessNode) -> usize {
    1 + node.children.iter().map(subtree_row_count).sum::<usize>()
}

/// Visit every row in drawing order (pre-order), with its depth and logical y
///
/// A node's first child sits one row below it; the next sibling is placed
/// after the node's whole subtree.
pub fn walk_rows<'a, F>(roots: &'a [ProcessNode], top: f64, visit: &mut F)
where
    F: FnMut(&'a ProcessNode, usize, f64),
{
    /// Returns the number of rows visited
    fn walk<'a, F>(nodes: &'a [ProcessNode], depth: usize, top: f64, visit: &mut F) -> usize
    where
        F: FnMut(&'a ProcessNode, usize, f64),
    {
        let mut rows = 0;
        for node in nodes {
            let y = top + ROW_HEIGHT * rows as f64;
            visit(node, depth, y);
            rows += 1 + walk(&node.children, depth + 1, y + ROW_HEIGHT, visit);
        }
        rows
    }

    walk(roots, 0, top, visit);
}

/// Time range covered by a view, in centiseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl TimeSpan {
    pub fn of(trace: &Trace, options: &RenderOptions) -> Self {
        if options.kernel_only {
            let end = trace
                .kernel_tree
                .iter()
                .map(ProcessNode::end_time)
                .fold(0.0, f64::max);
            Self { start: 0.0, end }
        } else {
            Self {
                start: trace.start_time,
                end: trace.end_time.max(trace.start_time),
            }
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Logical x of trace time `t`
    pub fn time_to_x(&self, t: f64, xscale: f64) -> f64 {
        OFF_X + (t - self.start) / 100.0 * SEC_W * xscale
    }

    /// Trace time at logical x (inverse of [`TimeSpan::time_to_x`])
    pub fn x_to_time(&self, x: f64, xscale: f64) -> f64 {
        self.start + (x - OFF_X) * 100.0 / (SEC_W * xscale)
    }
}

/// Total logical canvas size for a view
pub fn extents(options: &RenderOptions, xscale: f64, trace: &Trace) -> ChartSize {
    let span = TimeSpan::of(trace, options);
    let rows: usize = trace
        .proc_tree(options)
        .iter()
        .map(subtree_row_count)
        .sum();

    ChartSize {
        width: 2.0 * OFF_X + span.duration() / 100.0 * SEC_W * xscale,
        height: header_offset(options) + rows as f64 * ROW_HEIGHT + OFF_Y,
    }
}
