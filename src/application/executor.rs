//! Retry, backoff and failure reporting around arbitrary async operations.
//!
//! Each call to [`ResilientExecutor::execute`] walks a small state machine:
//! attempt, then on failure either sleep and attempt again or give up.
//! Authentication, configuration and validation failures give up at once.
//! Nothing is shared between calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    application::diagnostics::DiagnosticLog,
    domain::{AppError, ErrorKind},
    ports::Sleeper,
};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

const BASE_DELAY_MS: u64 = 1_000;
const MAX_DELAY_MS: u64 = 5_000;
const RULE_WIDTH: usize = 60;

/// Delay to wait after failed attempt `attempt` (1-based): 1s, 2s, 4s, then 5s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let millis = BASE_DELAY_MS
        .saturating_mul(1u64 << exponent)
        .min(MAX_DELAY_MS);
    Duration::from_millis(millis)
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// What was being attempted when a failure happened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussion_id: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Self::default()
        }
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn with_discussion(mut self, discussion_id: impl Into<String>) -> Self {
        self.discussion_id = Some(discussion_id.into());
        self
    }
}

/// A classified failure enriched with its context, ready to be reported.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub error: AppError,
    pub context: ErrorContext,
    pub timestamp: DateTime<Utc>,
    pub attempts: u32,
}

impl FailureReport {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn exit_code(&self) -> i32 {
        self.error.kind().exit_code()
    }
}

pub struct ResilientExecutor {
    max_retries: u32,
    sleeper: Arc<dyn Sleeper>,
    diagnostics: Option<DiagnosticLog>,
    debug: bool,
}

impl Default for ResilientExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResilientExecutor {
    pub fn new() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            sleeper: Arc::new(TokioSleeper),
            diagnostics: None,
            debug: false,
        }
    }

    #[cfg(test)]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    #[cfg(test)]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticLog) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Include full internal details in printed reports.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable kind,
    /// or has been attempted `max_retries` times.
    pub async fn execute<T, E, F, Fut>(
        &self,
        mut operation: F,
        context: &ErrorContext,
    ) -> Result<T, FailureReport>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<AppError>,
    {
        let mut attempt = 1;
        loop {
            debug!(operation = %context.operation, attempt, "attempting operation");
            let error: AppError = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err.into(),
            };

            if !error.kind().is_retryable() || attempt >= self.max_retries {
                return Err(self.failure(error, context, attempt));
            }

            let delay = backoff_delay(attempt);
            warn!(
                operation = %context.operation,
                kind = ?error.kind(),
                error = %error,
                details = ?error.details(),
                "Attempt {} failed, retrying in {}ms",
                attempt,
                delay.as_millis()
            );
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }

    /// Like [`execute`](Self::execute), but reports and exits the process on failure.
    pub async fn run<T, E, F, Fut>(&self, operation: F, context: &ErrorContext) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<AppError>,
    {
        match self.execute(operation, context).await {
            Ok(value) => value,
            Err(report) => self.exit_with(&report),
        }
    }

    /// Builds the final report for `error`, keeping any suggestions or
    /// details it already carries.
    pub fn failure(&self, error: AppError, context: &ErrorContext, attempts: u32) -> FailureReport {
        let error = if error.suggestions().is_empty() {
            let suggestions = suggestions_for(&error);
            error.with_suggestions(suggestions)
        } else {
            error
        };

        FailureReport {
            error,
            context: context.clone(),
            timestamp: Utc::now(),
            attempts,
        }
    }

    /// Persists and prints `report`, returning the exit code to use.
    pub fn handle_failure<W: Write>(&self, report: &FailureReport, out: &mut W) -> i32 {
        if let Some(diagnostics) = &self.diagnostics {
            match diagnostics.record(report) {
                Ok(path) => debug!(path = %path.display(), "wrote diagnostic log"),
                Err(e) => warn!("Failed to write diagnostic log: {}", e),
            }
        }

        // Nowhere left to report a broken stderr.
        let _ = out.write_all(render_report(report, self.debug).as_bytes());
        let _ = out.flush();

        report.exit_code()
    }

    pub fn exit_with(&self, report: &FailureReport) -> ! {
        let code = self.handle_failure(report, &mut io::stderr());
        std::process::exit(code)
    }

    /// Reports a failure raised outside any retried operation and exits.
    pub fn abort(&self, error: AppError, context: &ErrorContext) -> ! {
        let report = self.failure(error, context, 1);
        self.exit_with(&report)
    }
}

pub fn suggestions_for(error: &AppError) -> Vec<String> {
    let lines: &[&str] = match error.kind() {
        ErrorKind::AuthenticationError => &[
            "Check your GitHub Personal Access Token",
            "Run: gh-discussions config set-token <new-token>",
            "Ensure token has required scopes (repo or public_repo)",
        ],
        ErrorKind::NetworkError => &[
            "Check your internet connection",
            "Verify GitHub API is accessible",
            "Try again with DEBUG=1 for more details",
            "Check if you're behind a proxy",
        ],
        ErrorKind::ApiError if looks_like_not_found(error.message()) => &[
            "Verify the repository exists and is accessible",
            "Check if Discussions are enabled for the repository",
            "Ensure the discussion number is correct",
        ],
        ErrorKind::ApiError => &[
            "Check GitHub API status at https://www.githubstatus.com/",
            "Verify your request parameters",
            "Try reducing the request size",
        ],
        ErrorKind::ConfigurationError | ErrorKind::ValidationError => &[
            "Check the error details above",
            "Run with DEBUG=1 for more information",
        ],
    };
    lines.iter().map(|s| s.to_string()).collect()
}

fn looks_like_not_found(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("404")
        || lowered.contains("not found")
        || lowered.contains("could not resolve")
}

pub fn render_report(report: &FailureReport, debug: bool) -> String {
    let rule = "━".repeat(RULE_WIDTH);
    let mut out = String::new();

    out.push('\n');
    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!("✗ {}\n", report.kind().label()));
    out.push_str(&format!("{}\n\n", rule));
    out.push_str(&format!("Error: {}\n", report.error.message()));

    let ctx = &report.context;
    out.push_str("\nContext:\n");
    out.push_str(&format!("  Operation: {}\n", ctx.operation));
    if let Some(repo) = &ctx.repository {
        out.push_str(&format!("  Repository: {}\n", repo));
    }
    if let Some(id) = &ctx.discussion_id {
        out.push_str(&format!("  Discussion: #{}\n", id));
    }

    let suggestions = report.error.suggestions();
    if !suggestions.is_empty() {
        out.push_str("\nSuggestions:\n");
        for suggestion in suggestions {
            out.push_str(&format!("  • {}\n", suggestion));
        }
    }

    if debug {
        out.push_str("\nDebug Information:\n");
        match serde_json::to_string_pretty(report) {
            Ok(json) => out.push_str(&json),
            Err(e) => out.push_str(&format!("<unserializable report: {}>", e)),
        }
        out.push('\n');
    } else {
        out.push_str("\nRun with DEBUG=1 for detailed error information\n");
    }

    if report.kind() == ErrorKind::NetworkError {
        out.push_str("\nTip: Network errors are often temporary.\n");
        out.push_str("   Failed requests are retried automatically.\n");
    }

    out.push('\n');
    out.push_str(&format!("{}\n", rule));
    out
}
