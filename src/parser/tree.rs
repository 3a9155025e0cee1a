use super::kernel_parser::KERNEL_BOOT_NAME;
use super::{KernelSample, ProcessNode};
use crate::view::options::{DisplayOptions, SortOrder};
use std::collections::HashMap;

/// PID of kthreadd, parent of every kernel thread
const KTHREADD_PID: u32 = 2;

/// Assemble flat process records into a forest, linking children by ppid
///
/// Records whose parent is unknown become roots. Children keep the order of
/// the input.
pub fn build_tree(mut records: Vec<ProcessNode>) -> Vec<ProcessNode> {
    records.sort_by_key(|p| p.pid);

    let known: HashMap<u32, usize> = records
        .iter()
        .enumerate()
        .map(|(idx, p)| (p.pid, idx))
        .collect();

    // children lists by index, then assemble bottom-up
    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut roots = Vec::new();
    for (idx, p) in records.iter().enumerate() {
        match known.get(&p.ppid) {
            Some(&parent) if parent != idx => children_of[parent].push(idx),
            _ => roots.push(idx),
        }
    }

    let mut slots: Vec<Option<ProcessNode>> = records.into_iter().map(Some).collect();

    fn assemble(
        idx: usize,
        slots: &mut [Option<ProcessNode>],
        children_of: &[Vec<usize>],
    ) -> Option<ProcessNode> {
        let mut node = slots[idx].take()?;
        node.children = children_of[idx]
            .iter()
            .filter_map(|&child| assemble(child, slots, children_of))
            .collect();
        Some(node)
    }

    roots
        .into_iter()
        .filter_map(|idx| assemble(idx, &mut slots, &children_of))
        .collect()
}

/// Apply the tree-shaping options to a freshly built process tree
pub fn shape_tree(
    mut roots: Vec<ProcessNode>,
    options: &DisplayOptions,
    trace_start: f64,
    trace_duration: f64,
    sample_period: f64,
) -> Vec<ProcessNode> {
    if !options.show_kernel {
        roots = remove_kernel_threads(roots);
    }

    if options.prune {
        let pruner = Pruner {
            trace_start,
            trace_duration,
            sample_period,
        };
        let removed = pruner.prune(&mut roots, None);
        log::debug!("Pruned {} processes", removed);
    }

    sort_tree(&mut roots, options.sort);
    roots
}

/// Drop kthreadd and every kernel thread below it
pub fn remove_kernel_threads(roots: Vec<ProcessNode>) -> Vec<ProcessNode> {
    roots
        .into_iter()
        .filter(|p| p.pid != KTHREADD_PID && p.ppid != KTHREADD_PID)
        .map(|mut p| {
            let children = std::mem::take(&mut p.children);
            p.children = remove_kernel_threads(children);
            p
        })
        .collect()
}

struct Pruner {
    trace_start: f64,
    trace_duration: f64,
    sample_period: f64,
}

impl Pruner {
    /// Background daemon that slept through the whole boot and has no children
    fn is_idle_background(&self, p: &ProcessNode) -> bool {
        p.cpu_time == 0
            && p.end_time() >= self.trace_start + self.trace_duration
            && p.start_time > self.trace_start
            && p.duration > 0.9 * self.trace_duration
            && p.children.is_empty()
    }

    fn is_short_lived(&self, p: &ProcessNode) -> bool {
        p.duration <= 2.0 * self.sample_period
    }

    /// Remove uninteresting processes in place, splicing their children into
    /// the parent's list. A root that still has children is never removed.
    fn prune(&self, list: &mut Vec<ProcessNode>, parent: Option<u32>) -> usize {
        let mut removed = 0;
        let mut idx = 0;

        while idx < list.len() {
            let candidate = parent.is_some() || list[idx].children.is_empty();
            if candidate && (self.is_idle_background(&list[idx]) || self.is_short_lived(&list[idx]))
            {
                let mut pruned = list.remove(idx);
                let orphans = std::mem::take(&mut pruned.children);
                for (offset, child) in orphans.into_iter().enumerate() {
                    list.insert(idx + offset, child);
                }
                removed += 1;
                continue;
            }

            let pid = list[idx].pid;
            removed += self.prune(&mut list[idx].children, Some(pid));
            idx += 1;
        }

        removed
    }
}

/// Sort siblings at every level
pub fn sort_tree(list: &mut [ProcessNode], order: SortOrder) {
    match order {
        SortOrder::Pid => list.sort_by_key(|p| p.pid),
        SortOrder::StartTime => list.sort_by(|a, b| a.start_time.total_cmp(&b.start_time)),
        SortOrder::CpuTime => list.sort_by(|a, b| b.cpu_time.cmp(&a.cpu_time)),
        SortOrder::EndTime => list.sort_by(|a, b| a.end_time().total_cmp(&b.end_time())),
    }

    for p in list.iter_mut() {
        sort_tree(&mut p.children, order);
    }
}

/// Arrange kernel samples under a single `k-boot` root
pub fn build_kernel_tree(samples: &[KernelSample]) -> Vec<ProcessNode> {
    let Some(boot) = samples.iter().find(|s| s.name == KERNEL_BOOT_NAME) else {
        return Vec::new();
    };

    let mut root = ProcessNode::new(0, 0, &boot.name, boot.start_time, boot.duration);

    let mut calls: Vec<&KernelSample> = samples
        .iter()
        .filter(|s| s.name != KERNEL_BOOT_NAME)
        .collect();
    calls.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    root.children = calls
        .into_iter()
        .enumerate()
        .map(|(idx, s)| ProcessNode::new(idx as u32 + 1, 0, &s.name, s.start_time, s.duration))
        .collect();

    vec![root]
}
