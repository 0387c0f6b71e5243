//! tokens-bench - compare LLM endpoints on a single prompt
//!
//! Sends the same prompt to every configured model through an
//! OpenAI-compatible `chat/completions` endpoint, times each call, and
//! ranks the results.
//!
//! # Architecture
//!
//! - **Config**: models file loading and `${VAR}` resolution
//! - **Providers**: HTTP client for OpenAI-compatible APIs
//! - **Runner**: invokes each model and records one result per model
//! - **Metrics**: result records and summary statistics
//! - **Report**: ranked console report
//! - **Output**: JSON and CSV export
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tokens_bench::config::{Environment, ModelDescriptor};
//! use tokens_bench::providers::openai::OpenAIProvider;
//! use tokens_bench::report::{render, ReportOptions};
//! use tokens_bench::runner::{BenchmarkRunner, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let models = vec![ModelDescriptor::new(
//!         "GPT-4o mini",
//!         "gpt-4o-mini",
//!         "https://api.openai.com/v1",
//!         "${OPENAI_API_KEY}",
//!     )];
//!
//!     let provider = OpenAIProvider::new(Duration::from_secs(30))?;
//!     let runner = BenchmarkRunner::new(provider, Environment::from_process(), RunConfig::default());
//!     let results = runner.run(&models).await;
//!
//!     print!("{}", render(&results, ReportOptions::default()));
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod output;
pub mod providers;
pub mod report;
pub mod runner;

// Re-export commonly used types
pub use config::{ConfigProvider, Environment, ModelDescriptor};
pub use error::{ConfigError, ErrorKind, InvokeError};
pub use metrics::{InvocationResult, ResultSet, RunSummary};
pub use output::{CsvExporter, JsonExporter};
pub use providers::Provider;
pub use runner::{BenchmarkRunner, RunConfig};
