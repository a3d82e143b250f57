//! WebSocket-backed implementation of the shared `findiff_provider` contract.
//!
//! This adapter translates `findiff_api` connections into the deterministic
//! `ConnectionEvent` lifecycle expected by the conversation runtime, and
//! exposes the request/response lookups as a `DocumentCatalog`.

use std::future::Future;
use std::sync::Arc;

use findiff_api::{
    ApiConfig, ApiError, DocumentRef, Filing, LookupClient, Request, StreamClient, StreamEvent,
    StreamTerminal, TickerMatch,
};
use findiff_provider::{
    CancelSignal, ConnectionEvent, ConnectionProvider, DocumentCatalog, OpenRequest,
    ProviderInitError, ProviderProfile,
};
use tracing::{debug, warn};

/// Stable provider identifier used by startup selection.
pub const WS_PROVIDER_ID: &str = "ws";

/// What the transport reports while a connection is live.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TransportSignal {
    Opened,
    Event(StreamEvent),
}

trait StreamTransport: Send + Sync {
    /// Connects, signals `Opened` once the socket is up, then streams `request`.
    fn stream(
        &self,
        request: &Request,
        id_token: Option<&str>,
        cancel: &CancelSignal,
        on_signal: &mut dyn FnMut(TransportSignal),
    ) -> Result<StreamTerminal, ApiError>;
}

#[derive(Debug)]
struct DefaultStreamTransport {
    client: StreamClient,
}

impl StreamTransport for DefaultStreamTransport {
    fn stream(
        &self,
        request: &Request,
        id_token: Option<&str>,
        cancel: &CancelSignal,
        on_signal: &mut dyn FnMut(TransportSignal),
    ) -> Result<StreamTerminal, ApiError> {
        block_on(async {
            let mut connection = self.client.connect(id_token, Some(cancel)).await?;
            on_signal(TransportSignal::Opened);
            connection
                .run_request(request, Some(cancel), |event| {
                    on_signal(TransportSignal::Event(event))
                })
                .await
        })
    }
}

/// `ConnectionProvider` adapter backed by `findiff_api` WebSocket primitives.
pub struct WsConnectionProvider {
    endpoint: String,
    transport: Arc<dyn StreamTransport>,
}

impl WsConnectionProvider {
    pub fn new(config: ApiConfig) -> Result<Self, ProviderInitError> {
        let client = StreamClient::new(config).map_err(map_init_error)?;
        let endpoint = client.endpoint(None).to_string();

        Ok(Self {
            endpoint,
            transport: Arc::new(DefaultStreamTransport { client }),
        })
    }

    #[cfg(test)]
    fn with_transport_for_tests(transport: Arc<dyn StreamTransport>) -> Self {
        Self {
            endpoint: "ws://test".to_string(),
            transport,
        }
    }
}

impl ConnectionProvider for WsConnectionProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: WS_PROVIDER_ID.to_string(),
            endpoint: self.endpoint.clone(),
        }
    }

    fn open(
        &self,
        req: OpenRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(ConnectionEvent),
    ) -> Result<(), String> {
        let connection_id = req.connection_id;
        let mut opened = false;

        let result = self.transport.stream(
            &req.request,
            req.id_token.as_deref(),
            &cancel,
            &mut |signal| match signal {
                TransportSignal::Opened => {
                    opened = true;
                    emit(ConnectionEvent::Opened { connection_id });
                }
                TransportSignal::Event(event) => emit(ConnectionEvent::Message {
                    connection_id,
                    event,
                }),
            },
        );

        match result {
            Ok(terminal) => {
                debug!(connection_id, terminal = terminal.as_str(), "connection settled");
                emit(ConnectionEvent::Closed { connection_id });
            }
            Err(ApiError::ClosedBeforeTerminal | ApiError::Cancelled) => {
                emit(ConnectionEvent::Closed { connection_id });
            }
            Err(error) => {
                warn!(connection_id, opened, %error, "connection failed");
                emit(ConnectionEvent::Failed {
                    connection_id,
                    error: error.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// `DocumentCatalog` backed by the request/response lookup surface.
pub struct HttpDocumentCatalog {
    client: LookupClient,
}

impl HttpDocumentCatalog {
    pub fn new(config: ApiConfig) -> Result<Self, ProviderInitError> {
        Ok(Self {
            client: LookupClient::new(config).map_err(map_init_error)?,
        })
    }
}

impl DocumentCatalog for HttpDocumentCatalog {
    fn is_document_processed(
        &self,
        document: &DocumentRef,
        id_token: Option<&str>,
    ) -> Result<bool, String> {
        block_on(self.client.check_document_processed(document, id_token))
            .map_err(|error| format!("Document check failed: {error}"))
    }

    fn search_tickers(&self, query: &str) -> Result<Vec<TickerMatch>, String> {
        block_on(self.client.search_tickers(query, None))
            .map_err(|error| format!("Ticker search failed: {error}"))
    }

    fn available_filings(&self, cik: &str) -> Result<Vec<Filing>, String> {
        block_on(self.client.available_filings(cik, None))
            .map_err(|error| format!("Filing lookup failed: {error}"))
    }
}

/// Drive one future to completion on a throwaway current-thread runtime.
///
/// Provider calls already run on dedicated worker threads.
fn block_on<F, T>(future: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| ApiError::Unknown(format!("failed to initialize tokio runtime: {error}")))?;

    runtime.block_on(future)
}

fn map_init_error(error: ApiError) -> ProviderInitError {
    ProviderInitError::new(format!("Failed to initialize ws provider: {error}"))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::{Mutex, MutexGuard};

    use findiff_api::CredentialPlacement;

    use super::*;

    enum FakeOutcome {
        Terminal(StreamTerminal),
        Error(ApiError),
    }

    struct FakeTransport {
        open: bool,
        events: Vec<StreamEvent>,
        outcome: Mutex<Option<FakeOutcome>>,
        observed_token: Mutex<Option<Option<String>>>,
    }

    impl FakeTransport {
        fn new(open: bool, events: Vec<StreamEvent>, outcome: FakeOutcome) -> Arc<Self> {
            Arc::new(Self {
                open,
                events,
                outcome: Mutex::new(Some(outcome)),
                observed_token: Mutex::new(None),
            })
        }

        fn observed_token(&self) -> Option<Option<String>> {
            lock(&self.observed_token).clone()
        }
    }

    impl StreamTransport for FakeTransport {
        fn stream(
            &self,
            _request: &Request,
            id_token: Option<&str>,
            _cancel: &CancelSignal,
            on_signal: &mut dyn FnMut(TransportSignal),
        ) -> Result<StreamTerminal, ApiError> {
            *lock(&self.observed_token) = Some(id_token.map(ToString::to_string));
            if self.open {
                on_signal(TransportSignal::Opened);
            }
            for event in &self.events {
                on_signal(TransportSignal::Event(event.clone()));
            }

            match lock(&self.outcome).take() {
                Some(FakeOutcome::Terminal(terminal)) => Ok(terminal),
                Some(FakeOutcome::Error(error)) => Err(error),
                None => panic!("fake outcome should be consumed exactly once"),
            }
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn open_events(provider: &WsConnectionProvider, id_token: Option<&str>) -> Vec<ConnectionEvent> {
        let mut events = Vec::new();
        provider
            .open(
                OpenRequest {
                    connection_id: 5,
                    request: Request::generate_response(
                        DocumentRef::new("320193", "0000320193-23-000106", "aapl.htm"),
                        "hello",
                        None,
                    ),
                    id_token: id_token.map(ToString::to_string),
                },
                Arc::new(AtomicBool::new(false)),
                &mut |event| events.push(event),
            )
            .expect("open should not return provider-level failure");
        events
    }

    #[test]
    fn messages_are_forwarded_in_order_then_closed() {
        let transport = FakeTransport::new(
            true,
            vec![
                StreamEvent::chunk("Hello "),
                StreamEvent::chunk("world"),
                StreamEvent::Complete {
                    id: Some("conv-1".to_string()),
                },
            ],
            FakeOutcome::Terminal(StreamTerminal::Completed),
        );
        let provider = WsConnectionProvider::with_transport_for_tests(
            Arc::clone(&transport) as Arc<dyn StreamTransport>,
        );

        let events = open_events(&provider, Some("id-token"));

        assert_eq!(
            events,
            vec![
                ConnectionEvent::Opened { connection_id: 5 },
                ConnectionEvent::Message {
                    connection_id: 5,
                    event: StreamEvent::chunk("Hello "),
                },
                ConnectionEvent::Message {
                    connection_id: 5,
                    event: StreamEvent::chunk("world"),
                },
                ConnectionEvent::Message {
                    connection_id: 5,
                    event: StreamEvent::Complete {
                        id: Some("conv-1".to_string()),
                    },
                },
                ConnectionEvent::Closed { connection_id: 5 },
            ]
        );
        assert_eq!(transport.observed_token(), Some(Some("id-token".to_string())));
    }

    #[test]
    fn close_before_terminal_and_cancel_end_with_closed() {
        for error in [ApiError::ClosedBeforeTerminal, ApiError::Cancelled] {
            let provider = WsConnectionProvider::with_transport_for_tests(FakeTransport::new(
                true,
                Vec::new(),
                FakeOutcome::Error(error),
            ));
            let events = open_events(&provider, None);
            assert_eq!(events.last(), Some(&ConnectionEvent::Closed { connection_id: 5 }));
        }
    }

    #[test]
    fn connect_failure_maps_to_failed_without_open() {
        let provider = WsConnectionProvider::with_transport_for_tests(FakeTransport::new(
            false,
            Vec::new(),
            FakeOutcome::Error(ApiError::Connect("refused".to_string())),
        ));

        let events = open_events(&provider, None);

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ConnectionEvent::Failed { connection_id: 5, error } if error.contains("refused")
        ));
    }

    #[test]
    fn profile_reports_normalized_endpoint() {
        let config = ApiConfig::new("https://stream.example.com/prod", "https://api.example.com")
            .with_credential_placement(CredentialPlacement::PayloadField);
        let provider = WsConnectionProvider::new(config).expect("provider");

        let profile = provider.profile();
        assert_eq!(profile.provider_id, WS_PROVIDER_ID);
        assert_eq!(profile.endpoint, "wss://stream.example.com/prod");
    }

    #[test]
    fn invalid_endpoint_fails_initialization() {
        let error = WsConnectionProvider::new(ApiConfig::new("ftp://example.com", ""))
            .err()
            .expect("ftp endpoint rejected");
        assert!(error.message().starts_with("Failed to initialize ws provider"));
    }
}
