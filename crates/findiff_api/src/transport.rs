use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use url::Url;

use crate::codec::{encode_request, FrameDecoder};
use crate::config::{ApiConfig, CredentialPlacement};
use crate::error::ApiError;
use crate::events::{StreamEvent, StreamTerminal};
use crate::payload::Request;
use crate::url::{normalize_websocket_url, with_token_query};

/// Optional cancellation signal shared across connect and receive loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Factory for short-lived duplex connections to the job processor.
#[derive(Debug, Clone)]
pub struct StreamClient {
    config: ApiConfig,
    endpoint: Url,
}

#[derive(Debug, Clone)]
pub struct StreamResult {
    pub events: Vec<StreamEvent>,
    pub terminal: StreamTerminal,
}

impl StreamClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let endpoint = normalize_websocket_url(&config.websocket_url)?;
        Ok(Self { config, endpoint })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Endpoint to dial for the given credential.
    ///
    /// The token only lands in the URL when the placement is
    /// [`CredentialPlacement::QueryParameter`].
    pub fn endpoint(&self, id_token: Option<&str>) -> Url {
        match (self.config.credential_placement, non_empty(id_token)) {
            (CredentialPlacement::QueryParameter, Some(token)) => {
                with_token_query(self.endpoint.clone(), token)
            }
            _ => self.endpoint.clone(),
        }
    }

    /// Open a connection, attaching the credential according to the configured placement.
    ///
    /// `None` connects anonymously.
    pub async fn connect(
        &self,
        id_token: Option<&str>,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Connection, ApiError> {
        let url = self.endpoint(id_token);
        let connect = connect_async(url.as_str().to_owned());

        let connected = match self.config.timeout {
            Some(limit) => await_or_cancel(tokio::time::timeout(limit, connect), cancellation)
                .await?
                .map_err(|_| ApiError::Timeout)?,
            None => await_or_cancel(connect, cancellation).await?,
        };
        let (ws, _response) = connected.map_err(|error| ApiError::Connect(error.to_string()))?;
        info!(endpoint = %self.endpoint, authenticated = id_token.is_some(), "stream connection opened");

        let bearer_token = match self.config.credential_placement {
            CredentialPlacement::PayloadField => non_empty(id_token).map(ToString::to_string),
            CredentialPlacement::QueryParameter => None,
        };

        Ok(Connection {
            ws,
            bearer_token,
            decoder: FrameDecoder::default(),
        })
    }

    /// Run one request on a fresh connection, handing every event to `on_event`.
    ///
    /// Returns once a terminal event arrives. A server `error` event is a normal
    /// outcome (`StreamTerminal::Failed`), not an `Err`.
    pub async fn stream_with_handler<F>(
        &self,
        request: &Request,
        id_token: Option<&str>,
        cancellation: Option<&CancellationSignal>,
        on_event: F,
    ) -> Result<StreamTerminal, ApiError>
    where
        F: FnMut(StreamEvent),
    {
        let mut connection = self.connect(id_token, cancellation).await?;
        connection
            .run_request(request, cancellation, on_event)
            .await
    }

    pub async fn stream(
        &self,
        request: &Request,
        id_token: Option<&str>,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<StreamResult, ApiError> {
        let mut events = Vec::new();
        let terminal = self
            .stream_with_handler(request, id_token, cancellation, |event| {
                events.push(event);
            })
            .await?;

        Ok(StreamResult { events, terminal })
    }
}

/// One open duplex connection. Dropping it tears the socket down.
pub struct Connection {
    ws: WsStream,
    bearer_token: Option<String>,
    decoder: FrameDecoder,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("decoder", &self.decoder)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Send the request as one JSON text frame.
    pub async fn send(&mut self, request: &Request) -> Result<(), ApiError> {
        let frame = encode_request(request, self.bearer_token.as_deref())?;
        debug!(action = request.action(), "sending stream request");
        self.ws.send(Message::text(frame)).await?;
        Ok(())
    }

    /// Next decoded event, skipping control and unrecognized frames.
    ///
    /// `None` means the peer closed the connection.
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent, ApiError>> {
        loop {
            let message = match self.ws.next().await? {
                Ok(message) => message,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,
                Err(error) => return Some(Err(error.into())),
            };

            match message {
                Message::Text(text) => {
                    if let Some(event) = self.decoder.decode(text.as_str()) {
                        return Some(Ok(event));
                    }
                }
                Message::Close(frame) => {
                    debug!(?frame, "peer closed stream connection");
                    return None;
                }
                Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    /// Send `request` and read events until the first terminal one, then close.
    ///
    /// A server `error` event is a normal outcome (`StreamTerminal::Failed`), not an `Err`.
    pub async fn run_request<F>(
        &mut self,
        request: &Request,
        cancellation: Option<&CancellationSignal>,
        mut on_event: F,
    ) -> Result<StreamTerminal, ApiError>
    where
        F: FnMut(StreamEvent),
    {
        await_or_cancel(self.send(request), cancellation).await??;

        let mut terminal = None;
        loop {
            let Some(next) = await_or_cancel(self.next_event(), cancellation).await? else {
                break;
            };
            let event = next?;
            process_stream_event(event, &mut terminal, &mut on_event);
            if terminal.is_some() {
                break;
            }
        }

        // The peer may already be gone; the terminal outcome stands either way.
        let _ = self.close().await;

        terminal.ok_or(ApiError::ClosedBeforeTerminal)
    }

    pub async fn close(&mut self) -> Result<(), ApiError> {
        match self.ws.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

fn process_stream_event<F>(
    event: StreamEvent,
    terminal: &mut Option<StreamTerminal>,
    on_event: &mut F,
) where
    F: FnMut(StreamEvent),
{
    if terminal.is_none() {
        *terminal = event.terminal();
    }

    on_event(event);
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

pub(crate) async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, ApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
