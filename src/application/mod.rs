use std::sync::Arc;

pub mod diagnostics;
pub mod executor;

pub use diagnostics::DiagnosticLog;
pub use executor::{ErrorContext, FailureReport, ResilientExecutor};

use crate::{
    domain::{AppError, Comment, Discussion, DiscussionDetail, ListOptions, OutputFormat},
    ports::{ConfigStore, CredentialStore, DiscussionsClient},
};

/// Upper bound the remote accepts for a single page of discussions.
pub const SEARCH_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub query: String,
    pub author: Option<String>,
    pub category: Option<String>,
    pub limit: Option<usize>,
}

impl SearchFilter {
    pub fn matches(&self, discussion: &Discussion) -> bool {
        let query = self.query.to_lowercase();
        let title_matches = discussion.title.to_lowercase().contains(&query);

        let author_matches = self
            .author
            .as_ref()
            .map(|a| discussion.author.login.eq_ignore_ascii_case(a))
            .unwrap_or(true);

        let category_matches = match &self.category {
            Some(wanted) => discussion
                .category
                .as_ref()
                .map(|c| c.name.eq_ignore_ascii_case(wanted))
                .unwrap_or(false),
            None => true,
        };

        title_matches && author_matches && category_matches
    }
}

/// The workflows behind each command: every remote call goes through the
/// executor so retries and reporting are uniform.
pub struct DiscussionService {
    client: Arc<dyn DiscussionsClient>,
    executor: Arc<ResilientExecutor>,
}

impl DiscussionService {
    pub fn new(client: Arc<dyn DiscussionsClient>, executor: Arc<ResilientExecutor>) -> Self {
        Self { client, executor }
    }

    pub async fn list(
        &self,
        repo: &str,
        options: ListOptions,
    ) -> Result<Vec<Discussion>, FailureReport> {
        let context = ErrorContext::new("list discussions").with_repository(repo);
        let client = &self.client;
        let options = &options;
        let discussions = self
            .executor
            .execute(move || client.list_discussions(repo, options), &context)
            .await?;

        tracing::info!(repo, count = discussions.len(), "listed discussions");
        Ok(discussions)
    }

    pub async fn show(&self, repo: &str, number: &str) -> Result<DiscussionDetail, FailureReport> {
        let context = ErrorContext::new("show discussion")
            .with_repository(repo)
            .with_discussion(number);
        let client = &self.client;
        self.executor
            .execute(move || client.get_discussion(repo, number), &context)
            .await
    }

    /// Resolves `number` to its node id, then posts the comment. The two
    /// calls are not atomic; the discussion may change in between.
    pub async fn comment(
        &self,
        repo: &str,
        number: &str,
        body: &str,
    ) -> Result<Comment, FailureReport> {
        let context = ErrorContext::new("add comment")
            .with_repository(repo)
            .with_discussion(number);

        let body = body.trim();
        if body.is_empty() {
            return Err(self
                .executor
                .failure(AppError::validation("Comment cannot be empty"), &context, 1));
        }

        let client = &self.client;
        let detail = self
            .executor
            .execute(move || client.get_discussion(repo, number), &context)
            .await?;

        let discussion_id = detail.discussion.id.as_str();
        let comment = self
            .executor
            .execute(
                move || client.create_comment(repo, discussion_id, body),
                &context,
            )
            .await?;

        tracing::info!(repo, number, url = %comment.url, "posted comment");
        Ok(comment)
    }

    pub async fn create(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        category_id: Option<&str>,
    ) -> Result<Discussion, FailureReport> {
        let context = ErrorContext::new("create discussion").with_repository(repo);

        if title.trim().is_empty() {
            return Err(self
                .executor
                .failure(AppError::validation("Title cannot be empty"), &context, 1));
        }

        let client = &self.client;
        let discussion = self
            .executor
            .execute(
                move || client.create_discussion(repo, title, body, category_id),
                &context,
            )
            .await?;

        tracing::info!(repo, url = %discussion.url, "created discussion");
        Ok(discussion)
    }

    /// Filters the most recently updated page of discussions locally; the
    /// remote offers no discussion search over this API.
    pub async fn search(
        &self,
        repo: &str,
        filter: &SearchFilter,
    ) -> Result<Vec<Discussion>, FailureReport> {
        let options = ListOptions {
            first: SEARCH_PAGE_SIZE,
            ..ListOptions::default()
        };
        let context = ErrorContext::new("search discussions").with_repository(repo);
        let client = &self.client;
        let options = &options;
        let discussions = self
            .executor
            .execute(move || client.list_discussions(repo, options), &context)
            .await?;

        let matches = discussions.into_iter().filter(|d| filter.matches(d));
        Ok(match filter.limit {
            Some(limit) => matches.take(limit).collect(),
            None => matches.collect(),
        })
    }
}

/// An explicit token (from the environment) wins over the stored one.
pub async fn resolve_token(
    explicit: Option<String>,
    store: &dyn CredentialStore,
) -> Result<String, AppError> {
    if let Some(token) = explicit.filter(|t| !t.trim().is_empty()) {
        return Ok(token.trim().to_string());
    }

    store.get_token().await?.ok_or_else(|| {
        AppError::configuration("No GitHub token found").with_suggestions([
            "Run: gh-discussions config set-token <token>",
            "Or export GITHUB_TOKEN in your environment",
        ])
    })
}

pub async fn resolve_repo(
    explicit: Option<String>,
    store: &dyn ConfigStore,
) -> Result<String, AppError> {
    if let Some(repo) = explicit {
        return Ok(repo);
    }

    store.get_default_repo().await?.ok_or_else(|| {
        AppError::validation("No repository specified").with_suggestions([
            "Provide a repository argument in owner/name form",
            "Or set a default: gh-discussions config set-repo <owner/name>",
        ])
    })
}

/// An explicit format wins without touching the config. Otherwise the
/// configured default is used, or the built-in one if the config is unreadable.
pub async fn resolve_format(
    explicit: Option<OutputFormat>,
    store: &dyn ConfigStore,
) -> OutputFormat {
    if let Some(format) = explicit {
        return format;
    }

    match store.get_config().await {
        Ok(config) => config.output_format.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "config unreadable, using default output format");
            OutputFormat::default()
        }
    }
}
