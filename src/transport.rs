use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use url::{Host, Url};

use crate::error::{ConfigError, TransportError};

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Successful `POST /api/chat` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Where the backend lives relative to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Loopback base URL: the backend runs next to us on a fixed local address.
    Development,
    /// Anything else: routes are same-origin paths handled by the platform's routing layer.
    Deployed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub environment: Environment,
    pub base: Url,
    pub chat: Url,
    pub health: Url,
}

impl Endpoints {
    pub fn resolve(base_url: &str) -> Result<Self, ConfigError> {
        let mut base = Url::parse(base_url.trim()).map_err(|source| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(base_url.to_string()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let environment = if is_loopback(&base) {
            Environment::Development
        } else {
            Environment::Deployed
        };

        // Relative joins keep any path prefix of a local base; absolute joins
        // target the origin of a deployed one.
        let join = |path: &str| {
            base.join(path).map_err(|source| ConfigError::InvalidBaseUrl {
                url: base_url.to_string(),
                source,
            })
        };
        let (chat, health) = match environment {
            Environment::Development => (join("api/chat")?, base.clone()),
            Environment::Deployed => (join("/api/chat")?, join("/api/index/")?),
        };

        Ok(Self {
            environment,
            base,
            chat,
            health,
        })
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// Best-effort detail for a non-2xx response body.
///
/// A JSON object contributes its first non-empty string field among `detail`,
/// `message` and `error`. A JSON body without one, or an empty body, yields the
/// generic status message. Anything else is returned as raw text.
pub fn error_detail(status: u16, body: &str) -> String {
    let generic = format!("HTTP error! status: {}", status);
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => ["detail", "message", "error"]
            .iter()
            .find_map(|key| value.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty()))
            .map(str::to_string)
            .unwrap_or(generic),
        Err(_) => {
            let text = body.trim();
            if text.is_empty() {
                generic
            } else {
                text.to_string()
            }
        }
    }
}

/// One request, one response. Implemented by the HTTP client and by test doubles.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, message: &str) -> Result<ChatReply, TransportError>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn send(&self, message: &str) -> Result<ChatReply, TransportError> {
        (**self).send(message).await
    }
}

#[derive(Debug, Clone)]
pub struct HttpChatClient {
    client: Client,
    endpoints: Endpoints,
}

impl HttpChatClient {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            client: Client::new(),
            endpoints: Endpoints::resolve(base_url)?,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<HealthStatus, TransportError> {
        let url = self.endpoints.health.clone();
        debug!(%url, "Health check");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransportError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Api {
                status: status.as_u16(),
                detail: format!("Health check failed! status: {}", status.as_u16()),
            });
        }

        response
            .json::<HealthStatus>()
            .await
            .map_err(|e| TransportError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl ChatTransport for HttpChatClient {
    #[instrument(skip(self, message), fields(len = message.len()))]
    async fn send(&self, message: &str) -> Result<ChatReply, TransportError> {
        let url = self.endpoints.chat.clone();
        debug!(%url, environment = ?self.endpoints.environment, "API endpoint");

        let response = self
            .client
            .post(url.clone())
            .json(&ChatRequest {
                message: message.to_string(),
            })
            .send()
            .await
            .map_err(|e| TransportError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(status.as_u16(), &body);
            error!(%url, status = status.as_u16(), %detail, "API error");
            return Err(TransportError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json::<ChatReply>()
            .await
            .map_err(|e| TransportError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}
