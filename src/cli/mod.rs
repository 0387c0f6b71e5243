//! CLI argument parsing and command handling

use crate::config::{
    ConfigProvider, Environment, ModelDescriptor, DEFAULT_CONFIG_PATH, DEFAULT_PROMPT,
    DEFAULT_SYSTEM_PROMPT,
};
use crate::metrics::ResultSet;
use crate::output::{CsvExporter, JsonExporter};
use crate::providers::openai::{OpenAIProvider, DEFAULT_TEMPERATURE};
use crate::providers::Prompt;
use crate::report::{self, ReportOptions};
use crate::runner::{BenchmarkRunner, RunConfig};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// tokens-bench - compare LLM endpoints on one prompt
#[derive(Parser, Debug)]
#[command(name = "tokens-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the models file (YAML)
    #[arg(short = 'f', long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Prompt sent to every model (overrides the models file)
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// System message sent before the prompt
    #[arg(long, conflicts_with = "no_system_prompt")]
    pub system_prompt: Option<String>,

    /// Send only the user prompt, without a system message
    #[arg(long)]
    pub no_system_prompt: bool,

    /// Temperature for sampling (0.0-2.0)
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Per-request timeout in seconds
    #[arg(short, long, default_value = "30")]
    pub timeout: u64,

    /// Concurrency level (1 runs models one after another)
    #[arg(short, long, default_value = "1")]
    pub concurrency: usize,

    /// Benchmark every model listed at <URL>/models instead of reading the models file
    #[arg(long, value_name = "URL")]
    pub discover: Option<String>,

    /// API key used with --discover
    #[arg(short = 'k', long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output directory for results
    #[arg(long, default_value = "results")]
    pub output_dir: PathBuf,

    /// Export results to JSON
    #[arg(long)]
    pub json: bool,

    /// Export results to CSV
    #[arg(long)]
    pub csv: bool,

    /// Include each model's response text in the report
    #[arg(long)]
    pub show_responses: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Models plus the prompt settings that came with them
struct Plan {
    models: Vec<ModelDescriptor>,
    prompt: Option<String>,
    system_prompt: Option<String>,
}

impl Cli {
    /// Run the benchmark based on CLI arguments
    pub async fn run(&self) -> Result<()> {
        self.validate()?;

        let env = Environment::from_process();
        let timeout = Duration::from_secs(self.timeout);
        let provider = OpenAIProvider::new(timeout)?.with_temperature(self.temperature);

        // 1. Load models
        let plan = match self.discover {
            Some(ref url) => self.discover_models(&provider, url).await?,
            None => self.load_models(env.clone())?,
        };

        // 2. Build prompt
        let prompt = Prompt::new(
            self.prompt
                .clone()
                .or(plan.prompt)
                .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
        )
        .with_system(self.system_message(plan.system_prompt));

        tracing::info!("Models: {}", plan.models.len());
        tracing::info!("Timeout: {}s", self.timeout);
        tracing::info!("Concurrency: {}", self.concurrency);

        println!("{}", report::run_header(plan.models.len(), &prompt.text));

        // 3. Run
        let config = RunConfig {
            prompt: prompt.clone(),
            timeout,
            concurrency: self.concurrency,
            show_progress: true,
        };
        let runner = BenchmarkRunner::new(provider, env, config);
        let results = runner.run(&plan.models).await;

        // 4. Report
        let options = ReportOptions {
            show_responses: self.show_responses,
        };
        print!("{}", report::render(&results, options));

        // 5. Export results if requested
        self.export(&results, &prompt.text)?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.timeout == 0 {
            anyhow::bail!("--timeout must be at least 1 second");
        }
        if self.concurrency == 0 {
            anyhow::bail!("--concurrency must be at least 1");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "--temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            );
        }
        Ok(())
    }

    /// System message after CLI overrides: flag, then file, then default
    fn system_message(&self, from_file: Option<String>) -> Option<String> {
        if self.no_system_prompt {
            None
        } else if let Some(ref system) = self.system_prompt {
            Some(system.clone())
        } else {
            from_file
        }
    }

    fn load_models(&self, env: Environment) -> Result<Plan> {
        let provider = ConfigProvider::new(&self.config, env);
        let config = provider
            .load()
            .context("Error loading models configuration")?;
        let models = config
            .descriptors()
            .context("Error loading models configuration")?;

        tracing::info!("Loaded {} models from {}", models.len(), self.config.display());

        Ok(Plan {
            models,
            prompt: config.prompt,
            system_prompt: config.system_prompt,
        })
    }

    async fn discover_models(&self, provider: &OpenAIProvider, url: &str) -> Result<Plan> {
        let api_key = self.api_key.clone().unwrap_or_default();

        println!("Fetching model list from {}/models ...", url.trim_end_matches('/'));
        let ids = provider
            .list_models(url, &api_key)
            .await
            .context("Error fetching model list")?;

        if ids.is_empty() {
            anyhow::bail!("No models found at {}", url);
        }
        println!("Found {} models to test via proxy.", ids.len());

        let models = ids
            .into_iter()
            .map(|id| ModelDescriptor::new(id.clone(), id, url, api_key.clone()))
            .collect();

        Ok(Plan {
            models,
            prompt: None,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
        })
    }

    fn export(&self, results: &ResultSet, prompt: &str) -> Result<()> {
        if !self.json && !self.csv {
            return Ok(());
        }

        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                self.output_dir.display()
            )
        })?;

        println!("\n{}", "=".repeat(70));
        println!("   Exporting Results");
        println!("{}", "=".repeat(70));

        if self.json {
            let path = self.output_path("results.json");
            JsonExporter::export(results, prompt, &path)
                .with_context(|| format!("Failed to export JSON to: {}", path.display()))?;
            println!("✓ JSON exported to: {}", path.display());
        }

        if self.csv {
            let path = self.output_path("results.csv");
            CsvExporter::export(results, &path)
                .with_context(|| format!("Failed to export CSV to: {}", path.display()))?;
            println!("✓ CSV exported to: {}", path.display());

            // Also export summary
            let summary_path = self.output_path("summary.csv");
            CsvExporter::export_summary(results, &summary_path).with_context(|| {
                format!(
                    "Failed to export CSV summary to: {}",
                    summary_path.display()
                )
            })?;
            println!("✓ CSV summary exported to: {}", summary_path.display());
        }

        Ok(())
    }

    fn output_path(&self, file: &str) -> PathBuf {
        self.output_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["tokens-bench"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(cli.timeout, 30);
        assert_eq!(cli.concurrency, 1);
        assert!((cli.temperature - 0.7).abs() < f32::EPSILON);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_system_message_precedence() {
        let cli = Cli::try_parse_from(["tokens-bench"]).unwrap();
        assert_eq!(
            cli.system_message(Some("from file".to_string())).as_deref(),
            Some("from file")
        );
        assert_eq!(cli.system_message(None), None);

        let cli = Cli::try_parse_from(["tokens-bench", "--system-prompt", "Be brief."]).unwrap();
        assert_eq!(
            cli.system_message(Some("from file".to_string())).as_deref(),
            Some("Be brief.")
        );

        let cli = Cli::try_parse_from(["tokens-bench", "--no-system-prompt"]).unwrap();
        assert_eq!(cli.system_message(Some("from file".to_string())), None);
    }

    #[test]
    fn test_conflicting_system_flags() {
        assert!(Cli::try_parse_from([
            "tokens-bench",
            "--no-system-prompt",
            "--system-prompt",
            "x"
        ])
        .is_err());
    }

    #[test]
    fn test_validation() {
        let cli = Cli::try_parse_from(["tokens-bench", "--timeout", "0"]).unwrap();
        assert!(cli.validate().is_err());

        let cli = Cli::try_parse_from(["tokens-bench", "--concurrency", "0"]).unwrap();
        assert!(cli.validate().is_err());

        let cli = Cli::try_parse_from(["tokens-bench", "--temperature", "3.5"]).unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_missing_config_is_fatal() {
        let cli = Cli::try_parse_from(["tokens-bench", "-f", "/nonexistent/models.yaml"]).unwrap();
        let err = cli.load_models(Environment::default()).err().unwrap();
        assert!(format!("{:#}", err).contains("config file not found"));
    }

    #[test]
    fn test_export_writes_requested_files() {
        use crate::metrics::InvocationResult;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let cli = Cli::try_parse_from([
            "tokens-bench",
            "--json",
            "--csv",
            "--output-dir",
            out.to_str().unwrap(),
        ])
        .unwrap();

        let results: ResultSet = vec![InvocationResult::success(
            "A",
            "a",
            Duration::from_millis(10),
            "ok",
            None,
        )]
        .into();
        cli.export(&results, "hi").unwrap();

        assert!(out.join("results.json").exists());
        assert!(out.join("results.csv").exists());
        assert!(out.join("summary.csv").exists());
    }
}
