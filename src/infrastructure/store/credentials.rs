use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::ensure_private_dir;
use crate::{
    domain::AppError, infrastructure::adapters::github::USER_AGENT_VALUE, ports::CredentialStore,
};

pub const GITHUB_USER_URL: &str = "https://api.github.com/user";

const TOKEN_FILE: &str = "token";

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: Option<String>,
}

fn token_error(message: &str, err: io::Error, dir: &Path) -> AppError {
    AppError::configuration(format!("{}: {}", message, err)).with_suggestions([
        format!("Check file permissions in {}", dir.display()),
        "Ensure you have write access to your home directory".to_string(),
    ])
}

pub struct FileCredentialStore {
    dir: PathBuf,
    user_url: String,
    client: reqwest::Client,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            user_url: GITHUB_USER_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    #[cfg(test)]
    pub fn with_user_url(mut self, url: impl Into<String>) -> Self {
        self.user_url = url.into();
        self
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get_token(&self) -> Result<Option<String>, AppError> {
        match fs::read_to_string(self.token_path()).await {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(token_error("Failed to read token file", e, &self.dir)),
        }
    }

    async fn set_token(&self, token: &str) -> Result<(), AppError> {
        ensure_private_dir(&self.dir)?;
        let path = self.token_path();

        fs::write(&path, token.trim())
            .await
            .map_err(|e| token_error("Failed to save token", e, &self.dir))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| token_error("Failed to restrict token file", e, &self.dir))?;
        }

        tracing::info!(path = %path.display(), "saved GitHub token");
        Ok(())
    }

    async fn clear_token(&self) -> Result<(), AppError> {
        match fs::remove_file(self.token_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(token_error("Failed to clear token", e, &self.dir)),
        }
    }

    /// Lightweight identity check: the token is valid if `/user` answers with a login.
    async fn validate_token(&self, token: &str) -> Result<bool, AppError> {
        let response = self
            .client
            .get(&self.user_url)
            .header(AUTHORIZATION, format!("token {}", token.trim()))
            .header(USER_AGENT, USER_AGENT_VALUE)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("token validation request failed: {}", e);
                AppError::network(Some(serde_json::Value::String(e.to_string())))
            })?;

        if response.status() != StatusCode::OK {
            tracing::debug!(status = %response.status(), "token rejected");
            return Ok(false);
        }

        let user: UserResponse = response.json().await?;
        Ok(user.login.is_some_and(|login| !login.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn token_round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("state"));

        assert_eq!(store.get_token().await.unwrap(), None);

        store.set_token("ghp_secret\n").await.unwrap();
        assert_eq!(store.get_token().await.unwrap().as_deref(), Some("ghp_secret"));

        store.clear_token().await.unwrap();
        assert_eq!(store.get_token().await.unwrap(), None);

        // Clearing twice is fine.
        store.clear_token().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        store.set_token("ghp_secret").await.unwrap();

        let mode = std::fs::metadata(dir.path().join(TOKEN_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn blank_token_file_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TOKEN_FILE), "   \n").unwrap();
        let store = FileCredentialStore::new(dir.path());

        assert_eq!(store.get_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreadable_token_path_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read as a string.
        std::fs::create_dir(dir.path().join(TOKEN_FILE)).unwrap();
        let store = FileCredentialStore::new(dir.path());

        let err = store.get_token().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }

    #[tokio::test]
    async fn validate_token_accepts_a_known_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("Authorization", "token good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "login": "octocat" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("Authorization", "token bad"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store =
            FileCredentialStore::new(dir.path()).with_user_url(format!("{}/user", server.uri()));

        assert!(store.validate_token("good").await.unwrap());
        assert!(!store.validate_token("bad").await.unwrap());
    }

    #[tokio::test]
    async fn validate_token_reports_transport_failures() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path()).with_user_url("http://127.0.0.1:1/user");

        let err = store.validate_token("any").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkError);
    }
}
