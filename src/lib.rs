//! FinDiff conversation client core.
//!
//! ## Provider bootstrap
//!
//! Backends are chosen with `FINDIFF_PROVIDER`:
//!
//! - `FINDIFF_PROVIDER=mock` (default) for deterministic local runs
//! - `FINDIFF_PROVIDER=ws` for the WebSocket job processor plus the HTTP lookup API
//!
//! The `ws` provider reads `FINDIFF_WEBSOCKET_URL`, `FINDIFF_API_URL`,
//! `FINDIFF_API_KEY` and `FINDIFF_TIMEOUT_SEC`. `FINDIFF_ID_TOKEN` signs the
//! session in; `FINDIFF_CREDENTIAL_PLACEMENT` (`query` or `payload`) picks
//! whether the token rides on the socket URL or in the request frame.
//!
//! ## Conversation contract
//!
//! Every chat turn or section action opens one short-lived connection and sends
//! exactly one request. Streamed chunks are revealed at a steady rate by the
//! [`accumulator`], and the send affordance stays disabled until the previous
//! response has fully drained and no filing is still being processed.
//! `complete` carries the conversation id reused by the next request;
//! `free_tier_limit` withdraws the whole exchange and asks for an upgrade.

pub mod accumulator;
pub mod app;
pub mod commands;
pub mod config;
pub mod documents;
pub mod error;
pub mod gate;
pub mod logging;
pub mod providers;
pub mod render;
pub mod request;
pub mod runtime;
pub mod sections;
pub mod upload;

pub use error::FindiffError;
