use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::{DEFAULT_API_URL, DEFAULT_WEBSOCKET_URL};

/// Where the bearer credential travels when an authenticated connection is opened.
///
/// The backend accepts either form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialPlacement {
    /// Appended to the WebSocket URL as `?token=<id token>`.
    #[default]
    QueryParameter,
    /// Added to the outgoing request frame as `bearerToken`.
    PayloadField,
}

impl CredentialPlacement {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value.trim().to_ascii_lowercase().as_str() {
            "query" | "query_parameter" => Self::QueryParameter,
            "payload" | "payload_field" | "field" => Self::PayloadField,
            _ => return None,
        })
    }
}

/// Transport configuration shared by the streaming and lookup clients.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Duplex streaming endpoint (`ws://` or `wss://`; `http(s)` is rewritten).
    pub websocket_url: String,
    /// Base URL for request/response lookups.
    pub api_url: String,
    /// Value sent in `X-Api-Key` on lookups.
    pub api_key: Option<String>,
    pub credential_placement: CredentialPlacement,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into lookup request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional timeout for connecting and for lookups.
    pub timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            websocket_url: DEFAULT_WEBSOCKET_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            credential_placement: CredentialPlacement::default(),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
        }
    }
}

impl ApiConfig {
    pub fn new(websocket_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            websocket_url: websocket_url.into(),
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_credential_placement(mut self, placement: CredentialPlacement) -> Self {
        self.credential_placement = placement;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}
