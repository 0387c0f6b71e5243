//! Console report rendering
//!
//! Pure formatting over a finished [`ResultSet`]: rank, tabulate, summarise,
//! list failures. Nothing here can fail.

use crate::metrics::{InvocationResult, ResultSet};
use std::fmt;

const WIDE: usize = 80;
const TABLE: usize = 96;

/// Placeholder for values the endpoint did not report
pub const ABSENT: &str = "-";

/// Report rendering options
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Append each successful model's response text
    pub show_responses: bool,
}

/// A ranked report over a result set
pub struct Report {
    sorted: ResultSet,
    options: ReportOptions,
}

impl Report {
    /// Build a report; the results are ranked here, the input is untouched
    pub fn new(results: &ResultSet, options: ReportOptions) -> Self {
        Self {
            sorted: results.sorted(),
            options,
        }
    }

    /// Results in report order
    pub fn rows(&self) -> impl Iterator<Item = &InvocationResult> {
        self.sorted.iter()
    }
}

/// Render the report to a string
pub fn render(results: &ResultSet, options: ReportOptions) -> String {
    Report::new(results, options).to_string()
}

/// Print the opening banner for a run
pub fn run_header(model_count: usize, prompt: &str) -> String {
    format!(
        "{rule}\nTesting {} models with prompt: {}\n{rule}\n\nPrompt: \"{}\"\n",
        model_count,
        prompt,
        prompt,
        rule = "=".repeat(WIDE)
    )
}

fn status_label(result: &InvocationResult) -> &'static str {
    if result.is_success() {
        "✓ Success"
    } else {
        "✗ Failed"
    }
}

fn count(value: Option<u32>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |v| v.to_string())
}

fn header(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{}", "=".repeat(WIDE))?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "=".repeat(WIDE))
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        header(f, "PERFORMANCE SUMMARY")?;

        writeln!(f)?;
        writeln!(
            f,
            "{:<45} {:<12} {:>8} {:>8} {:>8} {:>8}",
            "Model", "Status", "Time (s)", "In", "Out", "Total"
        )?;
        writeln!(f, "{}", "-".repeat(TABLE))?;

        for result in self.sorted.iter() {
            writeln!(
                f,
                "{:<45} {:<12} {:>8.2} {:>8} {:>8} {:>8}",
                result.model_name,
                status_label(result),
                result.elapsed_seconds(),
                count(result.token_in()),
                count(result.token_out()),
                count(result.token_total()),
            )?;
        }

        let summary = self.sorted.summary();

        writeln!(f)?;
        writeln!(f, "{}", "-".repeat(TABLE))?;
        writeln!(
            f,
            "Total Models: {} | Successful: {} | Failed: {}",
            summary.total, summary.succeeded, summary.failed
        )?;

        if let (Some((fastest, fastest_time)), Some((slowest, slowest_time)), Some(avg)) =
            (&summary.fastest, &summary.slowest, summary.average_seconds)
        {
            writeln!(f)?;
            writeln!(
                f,
                "🏆 Fastest Model: {} ({:.2}s)",
                fastest,
                fastest_time.as_secs_f64()
            )?;
            writeln!(
                f,
                "🐌 Slowest Model: {} ({:.2}s)",
                slowest,
                slowest_time.as_secs_f64()
            )?;
            writeln!(f, "📊 Average Time: {:.2}s", avg)?;
            if summary.total_tokens > 0 {
                writeln!(f, "🔢 Total Tokens: {}", summary.total_tokens)?;
            }
        }

        if self.options.show_responses && summary.succeeded > 0 {
            header(f, "RESPONSES")?;
            for result in self.sorted.successes() {
                writeln!(f)?;
                writeln!(
                    f,
                    "▶ {} ({:.2}s)",
                    result.model_name,
                    result.elapsed_seconds()
                )?;
                writeln!(f, "{}", "─".repeat(WIDE))?;
                writeln!(f, "{}", result.response_text().unwrap_or_default())?;
            }
        }

        if summary.failed > 0 {
            header(f, "FAILED MODELS")?;
            for result in self.sorted.failures() {
                writeln!(f)?;
                writeln!(f, "❌ {}", result.model_name)?;
                writeln!(f, "   Model ID: {}", result.model_id)?;
                writeln!(
                    f,
                    "   Error: {}",
                    result.error_message().unwrap_or_default()
                )?;
            }
        }

        writeln!(f)?;
        writeln!(f, "{}", "=".repeat(WIDE))
    }
}
