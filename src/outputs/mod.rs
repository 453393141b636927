//! Report generation for a finished search.
//!
//! # Submodules
//!
//! - [`xlsx`]: Writes one spreadsheet row per article (the report proper)
//! - [`json`]: Writes the same data as JSON for programmatic use
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── FreshNews[coffee] 2024-06-30-2024-07-02.xlsx
//! ├── FreshNews[coffee] 2024-06-30-2024-07-02.json
//! └── output.log
//! ```

use crate::models::{Article, SearchFilters};
use std::error::Error;

pub mod json;
pub mod xlsx;

/// Column headings of the report, in row order.
pub const REPORT_COLUMNS: [&str; 12] = [
    "ID",
    "News URL",
    "Title",
    "Headline",
    "Description",
    "Publish Date",
    "Last Update Date",
    "Image URL",
    "Thumb URL",
    "Image Description",
    "Count Phrase",
    "Contains Money",
];

/// Persists the articles of a run.
pub trait ReportWriter {
    /// Write one row per article and return how many rows were written.
    async fn write_report(
        &self,
        filters: &SearchFilters,
        articles: &[Article],
    ) -> Result<usize, Box<dyn Error>>;
}
