use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;

/// Closed classification driving retry policy, exit codes and messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    AuthenticationError,
    NetworkError,
    ApiError,
    ConfigurationError,
    ValidationError,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::AuthenticationError => "Authentication Error",
            ErrorKind::NetworkError => "Network Error",
            ErrorKind::ApiError => "API Error",
            ErrorKind::ConfigurationError => "Configuration Error",
            ErrorKind::ValidationError => "Validation Error",
        }
    }

    /// Process exit code. These values are relied on by scripts and must stay stable.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::AuthenticationError => 2,
            ErrorKind::NetworkError => 3,
            ErrorKind::ConfigurationError => 4,
            ErrorKind::ValidationError => 5,
            ErrorKind::ApiError => 1,
        }
    }

    /// Only transport and remote failures can change between attempts.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::NetworkError | ErrorKind::ApiError)
    }
}

/// The single error shape that leaves the client and executor.
///
/// An empty `suggestions` list means none were attached yet; the executor
/// fills one in before reporting.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "type")]
pub enum AppError {
    #[error("{message}")]
    #[serde(rename = "AUTHENTICATION_ERROR")]
    Authentication {
        message: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        suggestions: Vec<String>,
    },

    #[error("{message}")]
    #[serde(rename = "NETWORK_ERROR")]
    Network {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        suggestions: Vec<String>,
    },

    #[error("{message}")]
    #[serde(rename = "API_ERROR")]
    Api {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        suggestions: Vec<String>,
    },

    #[error("{message}")]
    #[serde(rename = "CONFIGURATION_ERROR")]
    Configuration {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        suggestions: Vec<String>,
    },

    #[error("{message}")]
    #[serde(rename = "VALIDATION_ERROR")]
    Validation {
        message: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        suggestions: Vec<String>,
    },
}

impl AppError {
    /// The remote rejected the credential.
    pub fn unauthorized() -> Self {
        AppError::Authentication {
            message: "Invalid or expired GitHub token".to_string(),
            suggestions: vec![
                "Check your GitHub Personal Access Token".to_string(),
                "Ensure the token has discussions scope".to_string(),
                "Run gh-discussions config set-token to update your token".to_string(),
            ],
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        AppError::Authentication {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn network(details: Option<Value>) -> Self {
        AppError::Network {
            message: "Network connection failed".to_string(),
            details,
            suggestions: vec![
                "Check your internet connection".to_string(),
                "Try again later".to_string(),
            ],
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        AppError::Api {
            message: message.into(),
            details: None,
            suggestions: Vec::new(),
        }
    }

    pub fn api_with_details(message: impl Into<String>, details: Value) -> Self {
        AppError::Api {
            message: message.into(),
            details: Some(details),
            suggestions: Vec::new(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        AppError::Configuration {
            message: message.into(),
            details: None,
            suggestions: Vec::new(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Authentication { .. } => ErrorKind::AuthenticationError,
            AppError::Network { .. } => ErrorKind::NetworkError,
            AppError::Api { .. } => ErrorKind::ApiError,
            AppError::Configuration { .. } => ErrorKind::ConfigurationError,
            AppError::Validation { .. } => ErrorKind::ValidationError,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Authentication { message, .. }
            | AppError::Network { message, .. }
            | AppError::Api { message, .. }
            | AppError::Configuration { message, .. }
            | AppError::Validation { message, .. } => message,
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            AppError::Network { details, .. }
            | AppError::Api { details, .. }
            | AppError::Configuration { details, .. } => details.as_ref(),
            AppError::Authentication { .. } | AppError::Validation { .. } => None,
        }
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            AppError::Authentication { suggestions, .. }
            | AppError::Network { suggestions, .. }
            | AppError::Api { suggestions, .. }
            | AppError::Configuration { suggestions, .. }
            | AppError::Validation { suggestions, .. } => suggestions,
        }
    }

    pub fn with_suggestions<I, S>(mut self, new: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match &mut self {
            AppError::Authentication { suggestions, .. }
            | AppError::Network { suggestions, .. }
            | AppError::Api { suggestions, .. }
            | AppError::Configuration { suggestions, .. }
            | AppError::Validation { suggestions, .. } => {
                *suggestions = new.into_iter().map(Into::into).collect();
            }
        }
        self
    }

    /// Attaches diagnostic detail. Kinds without a details slot are returned unchanged.
    pub fn with_details(mut self, value: Value) -> Self {
        match &mut self {
            AppError::Network { details, .. }
            | AppError::Api { details, .. }
            | AppError::Configuration { details, .. } => *details = Some(value),
            AppError::Authentication { .. } | AppError::Validation { .. } => {}
        }
        self
    }

    /// Classifies a failure known only by its message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if lowered.contains("401") || lowered.contains("credentials") {
            AppError::authentication(message)
        } else if message.is_empty() {
            AppError::api("Unknown error occurred")
        } else {
            AppError::api(message)
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            return AppError::network(Some(Value::String(err.to_string())));
        }
        if err.status() == Some(reqwest::StatusCode::UNAUTHORIZED) {
            return AppError::unauthorized();
        }
        if err.is_decode() {
            return AppError::api(format!("Failed to decode GitHub response: {}", err));
        }
        AppError::api(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::api(format!("Unexpected response shape from GitHub: {}", err))
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::TimedOut => AppError::network(Some(Value::String(err.to_string()))),
            _ => AppError::Configuration {
                message: err.to_string(),
                details: None,
                suggestions: Vec::new(),
            },
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<AppError>() {
            Ok(app) => return app,
            Err(err) => err,
        };
        let err = match err.downcast::<reqwest::Error>() {
            Ok(http) => return http.into(),
            Err(err) => err,
        };
        let err = match err.downcast::<io::Error>() {
            Ok(io) => return io.into(),
            Err(err) => err,
        };
        AppError::from_message(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_kind() {
        assert_eq!(ErrorKind::AuthenticationError.exit_code(), 2);
        assert_eq!(ErrorKind::NetworkError.exit_code(), 3);
        assert_eq!(ErrorKind::ConfigurationError.exit_code(), 4);
        assert_eq!(ErrorKind::ValidationError.exit_code(), 5);
        assert_eq!(ErrorKind::ApiError.exit_code(), 1);
    }

    #[test]
    fn only_network_and_api_errors_are_retryable() {
        assert!(ErrorKind::NetworkError.is_retryable());
        assert!(ErrorKind::ApiError.is_retryable());
        assert!(!ErrorKind::AuthenticationError.is_retryable());
        assert!(!ErrorKind::ConfigurationError.is_retryable());
        assert!(!ErrorKind::ValidationError.is_retryable());
    }

    #[test]
    fn serializes_with_type_tag() {
        let err = AppError::api_with_details("Not Found", serde_json::json!([{ "type": "NOT_FOUND" }]));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["type"], "API_ERROR");
        assert_eq!(value["message"], "Not Found");
        assert_eq!(value["details"][0]["type"], "NOT_FOUND");
        assert!(value.get("suggestions").is_none());
    }

    #[test]
    fn anyhow_keeps_app_errors_intact() {
        let original = AppError::validation("bad input");
        let converted: AppError = anyhow::Error::new(original.clone()).into();
        assert_eq!(converted, original);
    }

    #[test]
    fn anyhow_messages_are_classified() {
        let auth: AppError = anyhow::anyhow!("HTTP 401: Bad credentials").into();
        assert_eq!(auth.kind(), ErrorKind::AuthenticationError);

        let other: AppError = anyhow::anyhow!("something odd").into();
        assert_eq!(other.kind(), ErrorKind::ApiError);
        assert_eq!(other.message(), "something odd");
    }

    #[test]
    fn refused_connections_are_network_errors() {
        let err: AppError = io::Error::new(io::ErrorKind::ConnectionRefused, "refused").into();
        assert_eq!(err.kind(), ErrorKind::NetworkError);

        let err: AppError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }

    #[test]
    fn with_suggestions_replaces_list() {
        let err = AppError::api("boom").with_suggestions(["one", "two"]);
        assert_eq!(err.suggestions(), ["one".to_string(), "two".to_string()]);
    }
}
