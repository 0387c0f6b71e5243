//! Benchmark runner orchestration
//!
//! The runner walks the configured models and, for each one:
//! - resolves its endpoint settings against the environment snapshot
//! - sends the prompt through the [`Provider`] under a per-request timeout
//! - records one [`InvocationResult`], success or failure
//!
//! A failure never stops the loop. Every model ends up in the result set
//! exactly once, in input order; ranking happens later in the report.

use crate::config::{Environment, ModelDescriptor, DEFAULT_PROMPT};
use crate::error::InvokeError;
use crate::metrics::{InvocationResult, ResultSet};
use crate::providers::openai::DEFAULT_TIMEOUT;
use crate::providers::{Completion, Message, Prompt, Provider};
use futures::FutureExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Configuration for a benchmark run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Prompt sent to every model
    pub prompt: Prompt,
    /// Per-request timeout
    pub timeout: Duration,
    /// Maximum in-flight requests; 1 runs models one after another
    pub concurrency: usize,
    /// Draw a progress bar and per-model status lines
    pub show_progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            prompt: Prompt::new(DEFAULT_PROMPT),
            timeout: DEFAULT_TIMEOUT,
            concurrency: 1,
            show_progress: false,
        }
    }
}

/// Runner for executing benchmarks
pub struct BenchmarkRunner<P: Provider> {
    provider: Arc<P>,
    env: Arc<Environment>,
    config: RunConfig,
}

impl<P: Provider + 'static> BenchmarkRunner<P> {
    /// Create a new benchmark runner
    pub fn new(provider: P, env: Environment, config: RunConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            env: Arc::new(env),
            config,
        }
    }

    /// Get the run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every model, sequentially or concurrently per the configuration
    pub async fn run(&self, models: &[ModelDescriptor]) -> ResultSet {
        if self.config.concurrency > 1 {
            self.run_concurrent(models, self.config.concurrency).await
        } else {
            self.run_sequential(models).await
        }
    }

    /// Run the models one at a time, in input order
    pub async fn run_sequential(&self, models: &[ModelDescriptor]) -> ResultSet {
        let mut results = ResultSet::new();
        let messages = self.config.prompt.messages();
        let pb = self.progress_bar(models.len());
        let total = models.len();

        for (idx, descriptor) in models.iter().enumerate() {
            pb.println(format!(
                "[{}/{}] Testing Model: {} ({})",
                idx + 1,
                total,
                descriptor.name,
                descriptor.model_id
            ));
            pb.set_message(descriptor.name.clone());

            let result = invoke_model(
                self.provider.as_ref(),
                &self.env,
                descriptor,
                &messages,
                self.config.timeout,
            )
            .await;

            pb.println(status_line(&result));
            pb.inc(1);
            results.add(result);
        }

        pb.finish_and_clear();
        results
    }

    /// Run all models at once, at most `concurrency` in flight
    ///
    /// Results are collected by model position, not completion order.
    pub async fn run_concurrent(&self, models: &[ModelDescriptor], concurrency: usize) -> ResultSet {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let messages: Arc<[Message]> = self.config.prompt.messages().into();
        let pb = self.progress_bar(models.len());

        let mut tasks = Vec::with_capacity(models.len());

        for descriptor in models.iter().cloned() {
            let provider = self.provider.clone();
            let env = self.env.clone();
            let messages = messages.clone();
            let semaphore = semaphore.clone();
            let pb = pb.clone();
            let timeout = self.config.timeout;

            let task = tokio::spawn(async move {
                // A closed semaphore only means no limit is left to enforce
                let _permit = semaphore.acquire_owned().await.ok();

                let result =
                    invoke_model(provider.as_ref(), &env, &descriptor, &messages, timeout).await;

                pb.println(format!("{}: {}", descriptor.name, status_line(&result).trim()));
                pb.inc(1);
                result
            });

            tasks.push(task);
        }

        // Wait for all tasks to complete
        let mut results = ResultSet::new();
        for (task, descriptor) in tasks.into_iter().zip(models) {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Task for {} did not complete: {}", descriptor.name, e);
                    InvocationResult::failure(
                        &descriptor.name,
                        &descriptor.model_id,
                        Duration::ZERO,
                        InvokeError::Unknown(e.to_string()),
                    )
                }
            };
            results.add(result);
        }

        pb.finish_and_clear();
        results
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::with_template(PROGRESS_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}

/// Invoke one model and time it
///
/// The clock starts before endpoint resolution so that every result,
/// including configuration failures, carries a measured time.
async fn invoke_model<P: Provider + ?Sized>(
    provider: &P,
    env: &Environment,
    descriptor: &ModelDescriptor,
    messages: &[Message],
    timeout: Duration,
) -> InvocationResult {
    tracing::debug!("Testing model {} ({})", descriptor.name, descriptor.model_id);

    let start = Instant::now();
    let outcome = attempt(provider, env, descriptor, messages, timeout).await;
    let elapsed = start.elapsed();

    match outcome {
        Ok(completion) => {
            tracing::debug!("{} completed in {:.2}s", descriptor.name, elapsed.as_secs_f64());
            InvocationResult::success(
                &descriptor.name,
                &descriptor.model_id,
                elapsed,
                completion.text,
                completion.usage,
            )
        }
        Err(e) => {
            tracing::warn!(
                "{} failed after {:.2}s ({}): {}",
                descriptor.name,
                elapsed.as_secs_f64(),
                e.kind(),
                e
            );
            InvocationResult::failure(&descriptor.name, &descriptor.model_id, elapsed, e)
        }
    }
}

async fn attempt<P: Provider + ?Sized>(
    provider: &P,
    env: &Environment,
    descriptor: &ModelDescriptor,
    messages: &[Message],
    timeout: Duration,
) -> Result<Completion, InvokeError> {
    let endpoint = descriptor.resolve(env)?;

    let call = AssertUnwindSafe(provider.chat(&endpoint, messages)).catch_unwind();
    match tokio::time::timeout(timeout, call).await {
        Err(_) => Err(InvokeError::Timeout(timeout)),
        Ok(Err(panic)) => Err(InvokeError::Unknown(panic_message(panic))),
        Ok(Ok(outcome)) => outcome,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic with non-string payload".to_string()
    }
}

fn status_line(result: &InvocationResult) -> String {
    match result.error() {
        None => format!("  ✓ Completed in {:.2}s", result.elapsed_seconds()),
        Some(e) => format!("  ✗ Failed after {:.2}s: {}", result.elapsed_seconds(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoint;
    use crate::error::ErrorKind;
    use crate::metrics::TokenUsage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::sleep;

    /// Scripted behaviour per model id
    #[derive(Clone)]
    enum Script {
        Reply(&'static str, Duration),
        Fail(InvokeError, Duration),
        Hang,
        Panic,
    }

    struct MockProvider {
        scripts: HashMap<&'static str, Script>,
        seen: Mutex<Vec<(String, usize)>>,
    }

    impl MockProvider {
        fn new(scripts: Vec<(&'static str, Script)>) -> Self {
            Self {
                scripts: scripts.into_iter().collect(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        async fn chat(
            &self,
            endpoint: &Endpoint,
            messages: &[Message],
        ) -> Result<Completion, InvokeError> {
            self.seen
                .lock()
                .unwrap()
                .push((endpoint.api_key.clone(), messages.len()));

            match self.scripts.get(endpoint.model_id.as_str()).cloned() {
                Some(Script::Reply(text, delay)) => {
                    sleep(delay).await;
                    Ok(Completion {
                        text: text.to_string(),
                        usage: Some(TokenUsage {
                            prompt: Some(5),
                            completion: Some(7),
                            total: Some(12),
                        }),
                    })
                }
                Some(Script::Fail(err, delay)) => {
                    sleep(delay).await;
                    Err(err)
                }
                Some(Script::Hang) => {
                    sleep(Duration::from_secs(3600)).await;
                    Err(InvokeError::Unknown("unreachable".to_string()))
                }
                Some(Script::Panic) => panic!("provider exploded"),
                None => Err(InvokeError::Unknown("no script".to_string())),
            }
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn model(name: &str, id: &str) -> ModelDescriptor {
        ModelDescriptor::new(name, id, "http://mock", "${KEY}")
    }

    fn env() -> Environment {
        Environment::from_pairs([("KEY", "sk-test")])
    }

    fn runner(provider: MockProvider, timeout: Duration) -> BenchmarkRunner<MockProvider> {
        let config = RunConfig {
            timeout,
            ..RunConfig::default()
        };
        BenchmarkRunner::new(provider, env(), config)
    }

    #[tokio::test]
    async fn test_runner_sequential() {
        let provider = MockProvider::new(vec![
            ("a", Script::Reply("hello", Duration::from_millis(20))),
            (
                "b",
                Script::Fail(
                    InvokeError::from_status(500, "boom".to_string()),
                    Duration::from_millis(5),
                ),
            ),
            ("c", Script::Reply("world", Duration::from_millis(1))),
        ]);
        let models = vec![model("A", "a"), model("B", "b"), model("C", "c")];

        let runner = runner(provider, Duration::from_secs(5));
        let results = runner.run_sequential(&models).await;

        assert_eq!(results.len(), 3);
        let names: Vec<_> = results.iter().map(|r| r.model_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        let a = results.iter().next().unwrap();
        assert_eq!(a.response_text(), Some("hello"));
        assert_eq!(a.token_total(), Some(12));
        assert!(a.elapsed >= Duration::from_millis(20));

        let b = results.iter().nth(1).unwrap();
        assert_eq!(b.error_kind(), Some(ErrorKind::Api));
        assert!(b.token_in().is_none());

        // Placeholders resolved before reaching the provider
        let seen = runner.provider.seen.lock().unwrap().clone();
        assert!(seen.iter().all(|(key, n)| key == "sk-test" && *n == 2));
    }

    #[tokio::test]
    async fn test_unset_variable_fails_only_that_model() {
        let provider = MockProvider::new(vec![
            ("a", Script::Reply("ok", Duration::ZERO)),
            ("b", Script::Reply("ok", Duration::ZERO)),
        ]);
        let models = vec![
            ModelDescriptor::new("A", "a", "${MISSING_BASE}", "key"),
            model("B", "b"),
        ];

        let results = runner(provider, Duration::from_secs(5))
            .run_sequential(&models)
            .await;

        let all: Vec<_> = results.iter().collect();
        assert_eq!(all[0].error_kind(), Some(ErrorKind::Config));
        assert!(all[0].error_message().unwrap().contains("MISSING_BASE"));
        assert!(all[1].is_success());
    }

    #[tokio::test]
    async fn test_timeout_is_recorded_not_hung() {
        let provider = MockProvider::new(vec![
            ("slow", Script::Hang),
            ("fast", Script::Reply("ok", Duration::ZERO)),
        ]);
        let models = vec![model("Slow", "slow"), model("Fast", "fast")];

        let results = runner(provider, Duration::from_millis(100))
            .run_sequential(&models)
            .await;

        let all: Vec<_> = results.iter().collect();
        assert_eq!(all[0].error_kind(), Some(ErrorKind::Timeout));
        assert!(all[0].elapsed < Duration::from_secs(5));
        assert!(all[1].is_success());
    }

    #[tokio::test]
    async fn test_panic_is_recorded_as_unknown() {
        let provider = MockProvider::new(vec![
            ("boom", Script::Panic),
            ("fine", Script::Reply("ok", Duration::ZERO)),
        ]);
        let models = vec![model("Boom", "boom"), model("Fine", "fine")];

        let results = runner(provider, Duration::from_secs(5))
            .run_sequential(&models)
            .await;

        let all: Vec<_> = results.iter().collect();
        assert_eq!(all[0].error_kind(), Some(ErrorKind::Unknown));
        assert!(all[0].error_message().unwrap().contains("provider exploded"));
        assert!(all[1].is_success());
    }

    #[tokio::test]
    async fn test_runner_concurrent_keeps_input_order() {
        let provider = MockProvider::new(vec![
            ("a", Script::Reply("slow", Duration::from_millis(80))),
            ("b", Script::Reply("fast", Duration::from_millis(1))),
            (
                "c",
                Script::Fail(
                    InvokeError::Network("refused".to_string()),
                    Duration::from_millis(10),
                ),
            ),
            ("d", Script::Panic),
        ]);
        let models = vec![
            model("A", "a"),
            model("B", "b"),
            model("C", "c"),
            model("D", "d"),
        ];

        let results = runner(provider, Duration::from_secs(5))
            .run_concurrent(&models, 4)
            .await;

        let names: Vec<_> = results.iter().map(|r| r.model_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);

        let summary = results.summary();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.fastest.unwrap().0, "B");
        assert_eq!(summary.slowest.unwrap().0, "A");
    }

    /// Counts how many calls are in flight at once
    #[derive(Default)]
    struct GaugeProvider {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Provider for GaugeProvider {
        async fn chat(
            &self,
            endpoint: &Endpoint,
            _messages: &[Message],
        ) -> Result<Completion, InvokeError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(Completion {
                text: endpoint.model_id.clone(),
                usage: None,
            })
        }

        fn name(&self) -> &str {
            "gauge"
        }
    }

    #[tokio::test]
    async fn test_concurrency_limit_is_respected() {
        let models: Vec<_> = (0..8)
            .map(|i| model(&format!("M{}", i), &format!("m{}", i)))
            .collect();
        let config = RunConfig {
            timeout: Duration::from_secs(5),
            concurrency: 3,
            ..RunConfig::default()
        };
        let runner = BenchmarkRunner::new(GaugeProvider::default(), env(), config);

        let results = runner.run(&models).await;

        let peak = runner.provider.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight was {}", peak);
        assert!(peak > 1);

        assert_eq!(results.len(), 8);
        let names: Vec<_> = results.iter().map(|r| r.model_name.as_str()).collect();
        let expected: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, expected);
        assert!(results.iter().all(|r| r.is_success()));
        assert_eq!(runner.provider.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_dispatches_on_concurrency() {
        let provider = MockProvider::new(vec![("a", Script::Reply("ok", Duration::ZERO))]);
        let config = RunConfig {
            concurrency: 3,
            prompt: Prompt::new("hi").with_system(None),
            ..RunConfig::default()
        };
        let runner = BenchmarkRunner::new(provider, env(), config);

        let results = runner.run(&[model("A", "a")]).await;
        assert_eq!(results.len(), 1);
        assert!(results.iter().all(|r| r.is_success()));

        let seen = runner.provider.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![("sk-test".to_string(), 1)]);
    }

    #[test]
    fn test_status_line() {
        let ok = InvocationResult::success("A", "a", Duration::from_millis(1500), "x", None);
        assert_eq!(status_line(&ok), "  ✓ Completed in 1.50s");

        let failed = InvocationResult::failure(
            "B",
            "b",
            Duration::from_millis(250),
            InvokeError::Network("refused".to_string()),
        );
        assert!(status_line(&failed).starts_with("  ✗ Failed after 0.25s"));
    }
}
