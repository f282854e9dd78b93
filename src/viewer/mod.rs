//! Prompt result viewer.
//!
//! [`parse`] turns whatever the database tool sent back into [`Record`]s;
//! [`format`] renders those records as Markdown.

pub mod format;
pub mod parse;

pub use format::{dashboard_view, detail_view, list_view, prompt_detail, NO_RESULTS};
pub use parse::{parse_results, RawResult, Record};
