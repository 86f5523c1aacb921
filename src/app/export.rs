use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use tracing::info;

use crate::app::error::AppResult;
use crate::app::models::SearchResult;

pub const CSV_HEADER: [&str; 5] = ["Schema", "Table", "Column", "Data Type", "Infinity Rows"];

pub struct CsvExporter;

impl CsvExporter {
    /// `infinity_search_results_YYYYMMDD_HHMMSS.csv`
    pub fn default_file_name(now: DateTime<Local>) -> PathBuf {
        PathBuf::from(format!(
            "infinity_search_results_{}.csv",
            now.format("%Y%m%d_%H%M%S")
        ))
    }

    /// Header bare, the four text fields always quoted, counts bare.
    pub fn write<W: Write>(results: &[SearchResult], out: W) -> AppResult<W> {
        let mut header = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(out);
        header.write_record(CSV_HEADER)?;
        let mut out = header.into_inner().map_err(|e| e.into_error())?;

        for result in results {
            // Text fields end on the ',' terminator; the count follows unquoted.
            {
                let mut fields = WriterBuilder::new()
                    .quote_style(QuoteStyle::Always)
                    .terminator(Terminator::Any(b','))
                    .from_writer(&mut out);
                fields.write_record([
                    result.schema_name.as_str(),
                    result.table_name.as_str(),
                    result.column_name.as_str(),
                    result.data_type.as_str(),
                ])?;
                fields.flush()?;
            }
            writeln!(out, "{}", result.infinity_rows)?;
        }

        Ok(out)
    }

    pub fn export_to_path(results: &[SearchResult], path: &Path) -> AppResult<()> {
        let file = File::create(path)?;
        let mut file = Self::write(results, file)?;
        file.flush()?;

        info!(path = %path.display(), rows = results.len(), "results exported");
        Ok(())
    }
}
