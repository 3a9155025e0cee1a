use super::layout::walk_rows;
use crate::parser::ProcessNode;

/// Direction to step through matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Logical y of every process row matching `query`, top to bottom
///
/// Matching is a case-insensitive substring test against the command, the
/// executable path and each argument. Rows are placed exactly as the
/// renderer places them, starting at `header_offset`.
pub fn find_matches(roots: &[ProcessNode], query: &str, header_offset: f64) -> Vec<f64> {
    if query.is_empty() {
        return Vec::new();
    }

    let query = query.to_lowercase();
    let mut positions = Vec::new();
    walk_rows(roots, header_offset, &mut |node, _, y| {
        if node.matches(&query) {
            positions.push(y);
        }
    });
    positions
}

/// "i/total" with a 1-based index, or "0 matches"
pub fn current_match_label(index: usize, total: usize) -> String {
    if total == 0 {
        "0 matches".to_string()
    } else {
        format!("{}/{}", index + 1, total)
    }
}

/// Move `index` one step with wraparound; unchanged when there are no matches
pub fn advance(index: usize, total: usize, direction: Direction) -> usize {
    if total == 0 {
        return index;
    }
    match direction {
        Direction::Next => (index + 1) % total,
        Direction::Previous => (index + total - 1) % total,
    }
}

/// Match positions from one search, tagged with the session generation
/// they were computed for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchSet {
    generation: u64,
    positions: Vec<f64>,
    current: usize,
}

impl MatchSet {
    pub fn new(generation: u64, positions: Vec<f64>) -> Self {
        Self {
            generation,
            positions,
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Position of the current match, unless the set is from an older trace
    pub fn current_position(&self, generation: u64) -> Option<f64> {
        if generation != self.generation {
            return None;
        }
        self.positions.get(self.current).copied()
    }

    pub fn advance(&mut self, direction: Direction) {
        self.current = advance(self.current, self.positions.len(), direction);
    }

    pub fn label(&self) -> String {
        current_match_label(self.current, self.positions.len())
    }
}

/// Find-bar state of one view
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    query: Option<String>,
    matches: MatchSet,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn matches(&self) -> &MatchSet {
        &self.matches
    }

    /// Replace the query and search again from scratch
    ///
    /// Returns the logical y of the first match, which the caller should
    /// center. An empty query clears the search.
    pub fn set_query(
        &mut self,
        query: &str,
        roots: &[ProcessNode],
        header_offset: f64,
        generation: u64,
    ) -> Option<f64> {
        if query.is_empty() {
            self.clear();
            return None;
        }

        self.query = Some(query.to_string());
        self.matches = MatchSet::new(generation, find_matches(roots, query, header_offset));
        log::debug!("search {:?}: {} matches", query, self.matches.len());

        self.matches.current_position(generation)
    }

    /// Recompute positions for the current query, keeping the current index
    /// where possible (rows moved but the query did not change)
    pub fn refresh(&mut self, roots: &[ProcessNode], header_offset: f64, generation: u64) {
        let Some(query) = &self.query else {
            return;
        };

        let current = self.matches.current;
        self.matches = MatchSet::new(generation, find_matches(roots, query, header_offset));
        if current < self.matches.len() {
            self.matches.current = current;
        }
    }

    pub fn clear(&mut self) {
        self.query = None;
        self.matches = MatchSet::default();
    }

    /// Stepping is only useful with more than one match
    pub fn can_step(&self) -> bool {
        self.matches.len() > 1
    }

    /// Move to the next/previous match and return its position
    pub fn step(&mut self, direction: Direction, generation: u64) -> Option<f64> {
        if !self.can_step() {
            return None;
        }
        self.matches.advance(direction);
        self.matches.current_position(generation)
    }

    /// Label for the find bar; empty while no search is active
    pub fn label(&self) -> String {
        match self.query {
            Some(_) => self.matches.label(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::layout::ROW_HEIGHT;

    fn node(cmd: &str, args: &[&str], children: Vec<ProcessNode>) -> ProcessNode {
        let mut n = ProcessNode::new(0, 0, cmd, 0.0, 10.0);
        n.args = args.iter().map(|a| a.to_string()).collect();
        n.children = children;
        n
    }

    fn sample_tree() -> Vec<ProcessNode> {
        vec![
            node("init", &["--foo"], vec![]),
            node("bash", &[], vec![node("grep foo", &[], vec![])]),
        ]
    }

    #[test]
    fn test_find_matches_preorder_positions() {
        let positions = find_matches(&sample_tree(), "foo", 120.0);
        assert_eq!(positions, vec![120.0, 120.0 + 2.0 * ROW_HEIGHT]);
        assert_eq!(positions, vec![120.0, 152.0]);
    }

    #[test]
    fn test_find_matches_is_idempotent() {
        let tree = sample_tree();
        assert_eq!(
            find_matches(&tree, "foo", 120.0),
            find_matches(&tree, "foo", 120.0)
        );
    }

    #[test]
    fn test_find_matches_case_insensitive_exe() {
        let mut tree = sample_tree();
        tree[1].exe = Some("/bin/BASH".to_string());
        assert_eq!(find_matches(&tree, "/bin/bash", 0.0), vec![ROW_HEIGHT]);
        assert_eq!(find_matches(&tree, "INIT", 0.0), vec![0.0]);
    }

    #[test]
    fn test_find_matches_empty_inputs() {
        assert!(find_matches(&sample_tree(), "", 120.0).is_empty());
        assert!(find_matches(&[], "foo", 120.0).is_empty());
        assert!(find_matches(&sample_tree(), "nothing", 120.0).is_empty());
    }

    #[test]
    fn test_match_label() {
        assert_eq!(current_match_label(0, 0), "0 matches");
        assert_eq!(current_match_label(0, 3), "1/3");
        assert_eq!(current_match_label(2, 3), "3/3");
    }

    #[test]
    fn test_advance_wraps() {
        assert_eq!(advance(2, 3, Direction::Next), 0);
        assert_eq!(advance(0, 3, Direction::Previous), 2);
        assert_eq!(advance(1, 3, Direction::Next), 2);
        assert_eq!(advance(0, 0, Direction::Next), 0);
    }

    #[test]
    fn test_navigator_set_query() {
        let mut nav = Navigator::new();
        assert_eq!(nav.label(), "");

        let first = nav.set_query("foo", &sample_tree(), 120.0, 1);
        assert_eq!(first, Some(120.0));
        assert_eq!(nav.label(), "1/2");
        assert!(nav.can_step());

        assert_eq!(nav.step(Direction::Next, 1), Some(152.0));
        assert_eq!(nav.label(), "2/2");
        assert_eq!(nav.step(Direction::Next, 1), Some(120.0));

        // A new query resets the index
        nav.step(Direction::Next, 1);
        nav.set_query("fo", &sample_tree(), 120.0, 1);
        assert_eq!(nav.matches().current_index(), 0);
    }

    #[test]
    fn test_navigator_no_match_disables_stepping() {
        let mut nav = Navigator::new();
        assert_eq!(nav.set_query("zzz", &sample_tree(), 120.0, 1), None);
        assert_eq!(nav.label(), "0 matches");
        assert!(!nav.can_step());
        assert_eq!(nav.step(Direction::Next, 1), None);

        nav.set_query("init", &sample_tree(), 120.0, 1);
        assert_eq!(nav.label(), "1/1");
        assert!(!nav.can_step());
    }

    #[test]
    fn test_navigator_clear() {
        let mut nav = Navigator::new();
        nav.set_query("foo", &sample_tree(), 120.0, 1);
        nav.set_query("", &sample_tree(), 120.0, 1);

        assert_eq!(nav.query(), None);
        assert!(nav.matches().is_empty());
        assert_eq!(nav.label(), "");
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let mut nav = Navigator::new();
        nav.set_query("foo", &sample_tree(), 120.0, 1);
        assert_eq!(nav.matches().current_position(2), None);
        assert_eq!(nav.step(Direction::Next, 2), None);
    }

    #[test]
    fn test_refresh_moves_positions() {
        let mut nav = Navigator::new();
        nav.set_query("foo", &sample_tree(), 120.0, 1);
        nav.step(Direction::Next, 1);

        nav.refresh(&sample_tree(), 350.0, 1);
        assert_eq!(nav.matches().positions(), &[350.0, 382.0]);
        assert_eq!(nav.matches().current_index(), 1);
    }
}
