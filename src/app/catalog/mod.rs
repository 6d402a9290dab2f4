pub mod format;
pub mod store;

pub use format::{format_entry, parse_line, parse_line_bytes, ParsedLine, SkipReason};
pub use store::CatalogStore;
