pub mod layout;
pub mod options;
pub mod range;
pub mod search;
pub mod session;
pub mod viewport;

pub use layout::{ChartSize, ROW_HEIGHT, extents, header_offset, subtree_row_count, walk_rows};
pub use options::{DisplayOption, DisplayOptions, RenderOptions, SortOrder, ViewVariant};
pub use range::RangeControl;
pub use search::{Direction, MatchSet, Navigator, current_match_label, find_matches};
pub use session::{Session, SessionState, TraceSource, View};
pub use viewport::{Axis, ScrollDirection, ViewEvent, Viewport};
