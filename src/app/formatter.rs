use std::fmt::Write;

use crate::app::models::{ScanResults, ScanSummary};

pub struct OutputGenerator;

impl OutputGenerator {
    pub fn generate_markdown(
        db_name: &str,
        results: &ScanResults,
        summary: &ScanSummary,
    ) -> Result<String, std::fmt::Error> {
        let mut output = String::new();

        writeln!(output, "Infinity search for: {} (schema {})\n", db_name, summary.schema)?;

        if !results.is_empty() {
            writeln!(output, "| Schema | Table | Column | Data Type | Infinity Rows |")?;
            writeln!(output, "|---|---|---|---|---|")?;
            for result in results {
                // Columns holding sentinels are bolded.
                let count = if result.has_infinity() {
                    format!("**{}**", result.infinity_rows)
                } else {
                    result.infinity_rows.to_string()
                };
                writeln!(
                    output,
                    "| {} | {} | {} | {} | {} |",
                    result.schema_name, result.table_name, result.column_name, result.data_type, count
                )?;
            }
            writeln!(output)?;
        }

        writeln!(
            output,
            "Search completed. Found {} timestamp columns.",
            summary.columns_examined
        )?;

        if summary.flagged_columns > 0 {
            writeln!(
                output,
                "{} column(s) contain infinity values.",
                summary.flagged_columns
            )?;
        }

        for failure in &summary.failures {
            writeln!(output, "Error checking {}: {}", failure.target, failure.message)?;
        }

        Ok(output)
    }

    pub fn generate_json(results: &ScanResults) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(results.as_slice())
    }

    pub fn generate_rows(target: &str, rows: &[String]) -> Result<String, std::fmt::Error> {
        let mut output = String::new();

        writeln!(output, "## Details: {}", target)?;
        if rows.is_empty() {
            writeln!(output, "\nNo rows hold infinity values.")?;
            return Ok(output);
        }

        writeln!(output, "\n**Rows holding infinity ({}):**", rows.len())?;
        for row in rows {
            writeln!(output, "- `{}`", row)?;
        }

        Ok(output)
    }
}
