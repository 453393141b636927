//! Spreadsheet report writer.
//!
//! Produces `FreshNews[<phrase>] <start>-<end>.xlsx` with a bold header row
//! followed by one row per article in provider order. An empty search still
//! yields a header-only sheet.

use super::{REPORT_COLUMNS, ReportWriter, json};
use crate::models::{Article, SearchFilters};
use crate::utils::report_stem;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

const SHEET_NAME: &str = "FreshNews";

/// Writes reports into `output_dir`, optionally with a JSON copy.
#[derive(Debug, Clone)]
pub struct SpreadsheetReport {
    output_dir: PathBuf,
    json_copy: bool,
}

impl SpreadsheetReport {
    pub fn new(output_dir: impl Into<PathBuf>, json_copy: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            json_copy,
        }
    }

    /// Spreadsheet path for `filters`.
    pub fn path_for(&self, filters: &SearchFilters) -> PathBuf {
        self.output_dir.join(format!("{}.xlsx", report_stem(filters)))
    }
}

impl ReportWriter for SpreadsheetReport {
    #[instrument(level = "info", skip_all, fields(count = articles.len()))]
    async fn write_report(
        &self,
        filters: &SearchFilters,
        articles: &[Article],
    ) -> Result<usize, Box<dyn Error>> {
        let path = self.path_for(filters);
        info!(path = %path.display(), "Creating the report");
        let rows = write_workbook(&path, articles)?;
        info!(path = %path.display(), rows, "Report saved");

        // The spreadsheet is the report; a failed JSON copy does not undo it.
        if self.json_copy {
            if let Err(e) = json::write_report_json(&path.with_extension("json"), filters, articles).await {
                warn!(error = %e, "JSON copy not written");
            }
        }
        Ok(rows)
    }
}

/// Save `articles` as a workbook at `path`, returning the number of data rows.
pub fn write_workbook(path: &Path, articles: &[Article]) -> Result<usize, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, title) in REPORT_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    let mut rows = 0usize;
    for (i, article) in articles.iter().enumerate() {
        let row = (i + 1) as u32;
        let text = [
            &article.id,
            &article.url,
            &article.title,
            &article.headline,
            &article.description,
            &article.published_at,
            &article.updated_at,
            &article.image_url,
            &article.thumbnail_url,
            &article.image_caption,
        ];
        for (col, value) in text.into_iter().enumerate() {
            sheet.write_string(row, col as u16, value.as_str())?;
        }
        sheet.write_number(row, 10, article.phrase_count as f64)?;
        sheet.write_boolean(row, 11, article.contains_money)?;
        rows += 1;
    }

    sheet.autofit();
    workbook.save(path)?;
    Ok(rows)
}
