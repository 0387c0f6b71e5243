//! JSON export functionality

use crate::metrics::ResultSet;
use anyhow::{Context, Result};
use serde_json::json;
use std::fs::File;
use std::path::Path;

pub struct JsonExporter;

impl JsonExporter {
    /// Build the JSON document: run metadata, summary, and ranked results
    pub fn to_value(results: &ResultSet, prompt: &str) -> serde_json::Value {
        let sorted = results.sorted();
        let summary = sorted.summary();

        let records: Vec<_> = sorted
            .iter()
            .enumerate()
            .map(|(idx, r)| {
                json!({
                    "rank": idx + 1,
                    "model": r.model_name,
                    "model_id": r.model_id,
                    "success": r.is_success(),
                    "elapsed_seconds": r.elapsed_seconds(),
                    "response": r.response_text(),
                    "error_kind": r.error_kind(),
                    "error_message": r.error_message(),
                    "tokens": {
                        "input": r.token_in(),
                        "output": r.token_out(),
                        "total": r.token_total(),
                    },
                })
            })
            .collect();

        json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "prompt": prompt,
            "summary": {
                "total_models": summary.total,
                "successful": summary.succeeded,
                "failed": summary.failed,
                "fastest": summary.fastest.as_ref().map(|(name, t)| json!({
                    "model": name,
                    "elapsed_seconds": t.as_secs_f64(),
                })),
                "slowest": summary.slowest.as_ref().map(|(name, t)| json!({
                    "model": name,
                    "elapsed_seconds": t.as_secs_f64(),
                })),
                "average_seconds": summary.average_seconds,
                "total_tokens": summary.total_tokens,
            },
            "results": records,
        })
    }

    /// Export results to a JSON file
    pub fn export(results: &ResultSet, prompt: &str, path: &Path) -> Result<()> {
        let output = Self::to_value(results, prompt);

        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &output)?;

        Ok(())
    }
}
