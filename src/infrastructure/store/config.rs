use async_trait::async_trait;
use serde_json::Value;
use std::io;
use std::path::PathBuf;
use tokio::fs;

use super::ensure_private_dir;
use crate::{
    domain::{AppError, Config, OutputFormat, RepoId},
    ports::ConfigStore,
};

const CONFIG_FILE: &str = "config.json";

pub struct FileConfigStore {
    dir: PathBuf,
}

impl FileConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    fn error(&self, message: impl Into<String>, details: Option<Value>) -> AppError {
        let err = AppError::configuration(message).with_suggestions([
            format!("Check the config file at {}", self.config_path().display()),
            "Ensure the JSON format is valid".to_string(),
            "Delete the config file to reset to defaults".to_string(),
        ]);
        match details {
            Some(details) => err.with_details(details),
            None => err,
        }
    }
}

fn default_config() -> Config {
    Config {
        output_format: Some(OutputFormat::Table),
        ..Config::default()
    }
}

/// Keeps only well-formed fields; anything unrecognized is dropped, not rejected.
fn validate_config(raw: &Value) -> Config {
    let string_field = |key: &str| raw.get(key).and_then(Value::as_str).filter(|s| !s.is_empty());

    Config {
        default_repo: string_field("defaultRepo")
            .filter(|repo| RepoId::is_well_formed(repo))
            .map(str::to_string),
        token: string_field("token").map(str::to_string),
        output_format: string_field("outputFormat").and_then(|f| f.parse().ok()),
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn get_config(&self) -> Result<Config, AppError> {
        let contents = match fs::read_to_string(self.config_path()).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(default_config()),
            Err(e) => {
                return Err(self.error(
                    "Failed to read config file",
                    Some(Value::String(e.to_string())),
                ))
            }
        };

        let raw: Value = serde_json::from_str(&contents).map_err(|e| {
            self.error("Invalid JSON in config file", Some(Value::String(e.to_string())))
        })?;

        Ok(validate_config(&raw))
    }

    async fn update_config(&self, patch: Config) -> Result<(), AppError> {
        let merged = self.get_config().await?.merge(patch);

        ensure_private_dir(&self.dir)?;
        let contents = serde_json::to_string_pretty(&merged)
            .map_err(|e| self.error("Failed to update config file", Some(Value::String(e.to_string()))))?;

        fs::write(self.config_path(), contents).await.map_err(|e| {
            self.error("Failed to update config file", Some(Value::String(e.to_string())))
        })?;

        tracing::debug!(path = %self.config_path().display(), "config updated");
        Ok(())
    }

    async fn set_default_repo(&self, repo: &str) -> Result<(), AppError> {
        if !RepoId::is_well_formed(repo) {
            return Err(AppError::validation(format!(
                "Invalid repository '{}': expected the form owner/name",
                repo
            )));
        }

        self.update_config(Config {
            default_repo: Some(repo.to_string()),
            ..Config::default()
        })
        .await
    }
}
