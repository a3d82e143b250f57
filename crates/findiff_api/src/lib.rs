//! Wire contract and transport primitives for the FinDiff job processor.
//!
//! This crate owns everything that touches the network: outbound request
//! payloads, inbound stream events, the JSON text-frame codec, the duplex
//! WebSocket client, and the request/response lookup surface. It contains no
//! transcript state and no UI coupling.
//!
//! One request is sent per opened connection. Frames arrive in server order and
//! chunk boundaries carry no meaning; reassembly is the caller's concern.

pub mod claims;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod http;
pub mod payload;
pub mod retry;
pub mod transport;
pub mod url;

pub use claims::{tier_from_id_token, SessionTier};
pub use codec::{encode_request, FrameDecoder};
pub use config::{ApiConfig, CredentialPlacement};
pub use error::ApiError;
pub use events::{StreamEvent, StreamTerminal};
pub use http::{Filing, JobKind, LookupClient, TickerMatch};
pub use payload::{DocumentRef, Request, StockRef};
pub use transport::{CancellationSignal, Connection, StreamClient};
pub use url::{normalize_api_url, normalize_websocket_url};
