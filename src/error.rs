use thiserror::Error;

/// Failure of a single exchange with the meal-planning backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established (backend down, DNS, refused).
    #[error("Failed to reach {url}: {message}")]
    Network { url: String, message: String },
    /// Non-2xx response. `detail` is the best-effort message from the body.
    #[error("{detail}")]
    Api { status: u16, detail: String },
    /// 2xx response whose body is not the expected JSON shape.
    #[error("Unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid API base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("API base URL '{0}' must use http or https")]
    UnsupportedScheme(String),
}

/// Known failure categories that get a friendlier rendering in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    MissingCredential,
    Unreachable,
    Generic,
}

impl ErrorCategory {
    pub fn classify(error: &TransportError) -> Self {
        let message = error.to_string();
        if message.contains("OPENAI_API_KEY") {
            ErrorCategory::MissingCredential
        } else if matches!(error, TransportError::Network { .. }) || message.contains("HTTP error") {
            ErrorCategory::Unreachable
        } else {
            ErrorCategory::Generic
        }
    }
}

/// The assistant-role text shown when an exchange fails.
pub fn user_facing_message(error: &TransportError) -> String {
    match ErrorCategory::classify(error) {
        ErrorCategory::MissingCredential => {
            "Error: OpenAI API key is not configured. Please check your backend setup.".to_string()
        }
        ErrorCategory::Unreachable => {
            "Error: Could not connect to the backend. Please make sure the backend server is running."
                .to_string()
        }
        ErrorCategory::Generic => format!("Error: {}", error),
    }
}
