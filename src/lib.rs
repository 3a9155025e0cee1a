pub mod parser;
pub mod tui;
pub mod view;

pub use parser::{BootchartLoader, ParseError, ParseResult, Trace};
pub use view::{DisplayOptions, Session};
