//! CSV export functionality

use crate::metrics::ResultSet;
use anyhow::{Context, Result};
use csv::Writer;
use std::fs::File;
use std::path::Path;

pub struct CsvExporter;

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl CsvExporter {
    /// Export ranked per-model results to a CSV file
    pub fn export(results: &ResultSet, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut wtr = Writer::from_writer(file);

        // Write headers
        wtr.write_record([
            "rank",
            "model",
            "model_id",
            "success",
            "elapsed_seconds",
            "token_in",
            "token_out",
            "token_total",
            "error_kind",
            "error_message",
        ])?;

        // Write data rows
        for (idx, r) in results.sorted().iter().enumerate() {
            wtr.write_record([
                (idx + 1).to_string(),
                r.model_name.clone(),
                r.model_id.clone(),
                r.is_success().to_string(),
                format!("{:.3}", r.elapsed_seconds()),
                opt(r.token_in()),
                opt(r.token_out()),
                opt(r.token_total()),
                opt(r.error_kind()),
                r.error_message().unwrap_or_default(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Export summary statistics to CSV
    pub fn export_summary(results: &ResultSet, path: &Path) -> Result<()> {
        let summary = results.summary();
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut wtr = Writer::from_writer(file);

        wtr.write_record(["metric", "value"])?;

        wtr.write_record(["total_models", summary.total.to_string().as_str()])?;
        wtr.write_record(["successful", summary.succeeded.to_string().as_str()])?;
        wtr.write_record(["failed", summary.failed.to_string().as_str()])?;

        if let Some((ref name, elapsed)) = summary.fastest {
            wtr.write_record(["fastest_model", name.as_str()])?;
            let seconds = format!("{:.2}", elapsed.as_secs_f64());
            wtr.write_record(["fastest_seconds", seconds.as_str()])?;
        }
        if let Some((ref name, elapsed)) = summary.slowest {
            wtr.write_record(["slowest_model", name.as_str()])?;
            let seconds = format!("{:.2}", elapsed.as_secs_f64());
            wtr.write_record(["slowest_seconds", seconds.as_str()])?;
        }
        if let Some(avg) = summary.average_seconds {
            wtr.write_record(["average_seconds", format!("{:.2}", avg).as_str()])?;
        }
        wtr.write_record(["total_tokens", summary.total_tokens.to_string().as_str()])?;

        wtr.flush()?;
        Ok(())
    }
}
