//! Per-model results and run-level aggregation

use crate::error::{ErrorKind, InvokeError};
use std::time::Duration;

/// Token counts reported by an endpoint
///
/// Each count is optional: a proxy may report some fields and not others,
/// and an unreported count is different from zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Prompt (input) tokens
    pub prompt: Option<u32>,
    /// Completion (output) tokens
    pub completion: Option<u32>,
    /// Total tokens
    pub total: Option<u32>,
}

/// What happened when a model was invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The model answered
    Success {
        /// Response text, trimmed
        response: String,
        /// Usage, if reported
        usage: Option<TokenUsage>,
    },
    /// The invocation failed
    Failure(InvokeError),
}

/// Result of benchmarking one model
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult {
    /// Display name from the models file
    pub model_name: String,
    /// Identifier sent to the endpoint
    pub model_id: String,
    /// Wall-clock time of the attempt
    pub elapsed: Duration,
    /// Success or classified failure
    pub outcome: Outcome,
}

impl InvocationResult {
    /// Record a successful invocation
    pub fn success(
        model_name: impl Into<String>,
        model_id: impl Into<String>,
        elapsed: Duration,
        response: impl Into<String>,
        usage: Option<TokenUsage>,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            model_id: model_id.into(),
            elapsed,
            outcome: Outcome::Success {
                response: response.into(),
                usage,
            },
        }
    }

    /// Record a failed invocation
    pub fn failure(
        model_name: impl Into<String>,
        model_id: impl Into<String>,
        elapsed: Duration,
        error: InvokeError,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            model_id: model_id.into(),
            elapsed,
            outcome: Outcome::Failure(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Response text; present iff the invocation succeeded
    pub fn response_text(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { response, .. } => Some(response),
            Outcome::Failure(_) => None,
        }
    }

    /// The error; present iff the invocation failed
    pub fn error(&self) -> Option<&InvokeError> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure(err) => Some(err),
        }
    }

    /// Human-readable error message; present iff the invocation failed
    pub fn error_message(&self) -> Option<String> {
        self.error().map(|e| e.to_string())
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(|e| e.kind())
    }

    /// Token usage; only successful invocations that reported usage have it
    pub fn usage(&self) -> Option<TokenUsage> {
        match &self.outcome {
            Outcome::Success { usage, .. } => *usage,
            Outcome::Failure(_) => None,
        }
    }

    pub fn token_in(&self) -> Option<u32> {
        self.usage().and_then(|u| u.prompt)
    }

    pub fn token_out(&self) -> Option<u32> {
        self.usage().and_then(|u| u.completion)
    }

    pub fn token_total(&self) -> Option<u32> {
        self.usage().and_then(|u| u.total)
    }

    /// Sort key: successes first, then ascending elapsed time
    fn rank_key(&self) -> (bool, Duration) {
        (!self.is_success(), self.elapsed)
    }
}

/// Summary statistics over a set of results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Fastest successful model and its time
    pub fastest: Option<(String, Duration)>,
    /// Slowest successful model and its time
    pub slowest: Option<(String, Duration)>,
    /// Mean elapsed seconds over successes
    pub average_seconds: Option<f64>,
    /// Sum of reported total tokens over successes
    pub total_tokens: u64,
}

/// Ordered collection of results, one per configured model
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    results: Vec<InvocationResult>,
}

impl ResultSet {
    /// Create an empty result set
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    /// Append a result
    pub fn add(&mut self, result: InvocationResult) {
        self.results.push(result);
    }

    /// Get the number of results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterate in current order
    pub fn iter(&self) -> impl Iterator<Item = &InvocationResult> {
        self.results.iter()
    }

    /// Successful results in current order
    pub fn successes(&self) -> impl Iterator<Item = &InvocationResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    /// Failed results in current order
    pub fn failures(&self) -> impl Iterator<Item = &InvocationResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Reorder: successes first, each group by ascending elapsed time
    ///
    /// The sort is stable, so equal keys keep discovery order.
    pub fn sort(&mut self) {
        self.results.sort_by_key(InvocationResult::rank_key);
    }

    /// Return a sorted copy
    pub fn sorted(&self) -> Self {
        let mut copy = self.clone();
        copy.sort();
        copy
    }

    /// Compute summary statistics
    ///
    /// Fastest and slowest are taken by elapsed time among successes. Ties
    /// resolve the same way a stable sort would: first minimum, last maximum.
    pub fn summary(&self) -> RunSummary {
        let total = self.results.len();
        let succeeded = self.successes().count();

        let fastest = self
            .successes()
            .min_by_key(|r| r.elapsed)
            .map(|r| (r.model_name.clone(), r.elapsed));
        let slowest = self
            .successes()
            .max_by_key(|r| r.elapsed)
            .map(|r| (r.model_name.clone(), r.elapsed));

        let average_seconds = if succeeded > 0 {
            Some(self.successes().map(|r| r.elapsed_seconds()).sum::<f64>() / succeeded as f64)
        } else {
            None
        };

        let total_tokens = self
            .successes()
            .filter_map(|r| r.token_total())
            .map(u64::from)
            .sum();

        RunSummary {
            total,
            succeeded,
            failed: total - succeeded,
            fastest,
            slowest,
            average_seconds,
            total_tokens,
        }
    }

    pub fn into_vec(self) -> Vec<InvocationResult> {
        self.results
    }
}

impl From<Vec<InvocationResult>> for ResultSet {
    fn from(results: Vec<InvocationResult>) -> Self {
        Self { results }
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a InvocationResult;
    type IntoIter = std::slice::Iter<'a, InvocationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
