//! Provider-neutral contract between the conversation core and whatever opens
//! streaming connections on its behalf.
//!
//! This crate defines connection lifecycle events, the session credential seam,
//! and the document-processed lookup. It excludes transport details and any
//! transcript state.

use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

use findiff_api::{
    tier_from_id_token, DocumentRef, Filing, Request, SessionTier, StreamEvent, TickerMatch,
};

/// Identifier for one short-lived connection.
pub type ConnectionId = u64;

/// Shared cancellation flag for a connection.
pub type CancelSignal = Arc<AtomicBool>;

/// Error returned while constructing/configuring a provider before any connection opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Failure to resolve a bearer credential from the session provider.
///
/// Callers treat this as "no credential" and continue anonymously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialError {
    message: String,
}

impl CredentialError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "credential unavailable: {}", self.message)
    }
}

impl std::error::Error for CredentialError {}

/// Input required to open one connection and send its single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub connection_id: ConnectionId,
    pub request: Request,
    /// Resolved credential; `None` connects anonymously.
    pub id_token: Option<String>,
}

/// Provider-emitted lifecycle event for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Opened {
        connection_id: ConnectionId,
    },
    Message {
        connection_id: ConnectionId,
        event: StreamEvent,
    },
    /// Connect or send failed, or the socket broke mid-stream.
    Failed {
        connection_id: ConnectionId,
        error: String,
    },
    Closed {
        connection_id: ConnectionId,
    },
}

impl ConnectionEvent {
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            Self::Opened { connection_id }
            | Self::Message { connection_id, .. }
            | Self::Failed { connection_id, .. }
            | Self::Closed { connection_id } => *connection_id,
        }
    }

    /// True when no further events follow for this connection.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Closed { .. })
    }
}

/// Immutable metadata describing a connection provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub endpoint: String,
}

/// Opens one connection per request and reports its lifecycle.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn profile(&self) -> ProviderProfile;

    /// Opens a connection, sends `req.request`, and emits events in arrival order.
    ///
    /// Blocks the calling worker thread until the connection ends. The last event
    /// emitted is always `Closed` or `Failed`.
    fn open(
        &self,
        req: OpenRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(ConnectionEvent),
    ) -> Result<(), String>;
}

/// Authentication state visible to the access gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub tier: SessionTier,
}

impl SessionSnapshot {
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            tier: SessionTier::Anonymous,
        }
    }

    #[must_use]
    pub fn authenticated(&self) -> bool {
        self.tier.is_authenticated()
    }
}

/// External session collaborator: who is signed in, and with what credential.
pub trait SessionProvider: Send + Sync + 'static {
    fn snapshot(&self) -> SessionSnapshot;

    fn id_token(&self) -> Result<Option<String>, CredentialError>;
}

/// Session fixed at startup from an optional id token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticSession {
    id_token: Option<String>,
    tier: SessionTier,
}

impl StaticSession {
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            id_token: None,
            tier: SessionTier::Anonymous,
        }
    }

    /// Derives the tier from the token's claims; blank tokens are anonymous.
    #[must_use]
    pub fn from_id_token(id_token: Option<String>) -> Self {
        let id_token = id_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        let tier = tier_from_id_token(id_token.as_deref());
        Self { id_token, tier }
    }
}

impl SessionProvider for StaticSession {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot { tier: self.tier }
    }

    fn id_token(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.id_token.clone())
    }
}

/// Filing lookups used while choosing documents.
pub trait DocumentCatalog: Send + Sync + 'static {
    /// Whether the backend already holds processed sections for this filing.
    fn is_document_processed(
        &self,
        document: &DocumentRef,
        id_token: Option<&str>,
    ) -> Result<bool, String>;

    /// Catalogs may return an error when ticker search is unsupported.
    fn search_tickers(&self, _query: &str) -> Result<Vec<TickerMatch>, String> {
        Err("Ticker search is not supported by this catalog".to_string())
    }

    /// Catalogs may return an error when filing listing is unsupported.
    fn available_filings(&self, _cik: &str) -> Result<Vec<Filing>, String> {
        Err("Filing listing is not supported by this catalog".to_string())
    }
}
