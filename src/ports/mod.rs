use crate::domain::{AppError, Comment, Config, Discussion, DiscussionDetail, ListOptions};
use async_trait::async_trait;
use std::time::Duration;

/// Remote discussion operations. Implementations never retry; every
/// failure comes back already classified.
#[async_trait]
pub trait DiscussionsClient: Send + Sync {
    async fn list_discussions(
        &self,
        repo: &str,
        options: &ListOptions,
    ) -> Result<Vec<Discussion>, AppError>;

    /// `number` is the ordinal shown in the discussion URL.
    async fn get_discussion(&self, repo: &str, number: &str) -> Result<DiscussionDetail, AppError>;

    /// `discussion_id` is the opaque node id from a prior fetch, not the ordinal number.
    async fn create_comment(
        &self,
        repo: &str,
        discussion_id: &str,
        body: &str,
    ) -> Result<Comment, AppError>;

    async fn create_discussion(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        category_id: Option<&str>,
    ) -> Result<Discussion, AppError>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_token(&self) -> Result<Option<String>, AppError>;
    async fn set_token(&self, token: &str) -> Result<(), AppError>;
    async fn clear_token(&self) -> Result<(), AppError>;
    async fn validate_token(&self, token: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_config(&self) -> Result<Config, AppError>;
    async fn update_config(&self, patch: Config) -> Result<(), AppError>;

    async fn get_default_repo(&self) -> Result<Option<String>, AppError> {
        Ok(self.get_config().await?.default_repo)
    }

    async fn set_default_repo(&self, repo: &str) -> Result<(), AppError>;
}

/// Suspension used between retry attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}
