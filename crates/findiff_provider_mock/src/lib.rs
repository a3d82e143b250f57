//! Deterministic mock implementation of the shared `findiff_provider` contract.
//!
//! This crate contains no transport/protocol logic and is intended for local
//! development and contract-level integration testing.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use findiff_api::{DocumentRef, Filing, Request, StreamEvent, TickerMatch};
use findiff_provider::{
    CancelSignal, ConnectionEvent, ConnectionProvider, DocumentCatalog, OpenRequest,
    ProviderProfile,
};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// How a scripted chat stream ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEnding {
    /// `complete` with a generated conversation id.
    Complete,
    /// `error` whose message is rendered inline.
    Error(String),
    /// `free_tier_limit` before any content.
    FreeTierLimit,
    /// Socket drops without a terminal event.
    Drop,
    /// Transport failure before the socket opens.
    ConnectFailure(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Delays {
    open: Duration,
    token: Duration,
}

/// Deterministic provider used by core tests and local runs.
#[derive(Debug)]
pub struct MockConnectionProvider {
    chunks: Vec<String>,
    upload_steps: u64,
    ending: Mutex<MockEnding>,
    delays: Delays,
    conversations: AtomicU64,
    requests: Mutex<Vec<OpenRequest>>,
}

impl MockConnectionProvider {
    #[must_use]
    pub fn new(chunks: Vec<String>) -> Self {
        Self {
            chunks,
            upload_steps: 4,
            ending: Mutex::new(MockEnding::Complete),
            delays: Delays {
                open: Duration::from_millis(Self::OPEN_DELAY_MS),
                token: Duration::from_millis(Self::TOKEN_DELAY_MS),
            },
            conversations: AtomicU64::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Removes all artificial delays; used by tests.
    #[must_use]
    pub fn instant(mut self) -> Self {
        self.delays = Delays {
            open: Duration::ZERO,
            token: Duration::ZERO,
        };
        self
    }

    #[must_use]
    pub fn with_upload_steps(mut self, steps: u64) -> Self {
        self.upload_steps = steps.max(1);
        self
    }

    #[must_use]
    pub fn with_ending(self, ending: MockEnding) -> Self {
        *lock_unpoisoned(&self.ending) = ending;
        self
    }

    /// Changes how subsequent chat streams end.
    pub fn set_ending(&self, ending: MockEnding) {
        *lock_unpoisoned(&self.ending) = ending;
    }

    /// Every request opened so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<OpenRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    fn chat_events(&self, request: &Request) -> (Vec<StreamEvent>, MockEnding) {
        let ending = lock_unpoisoned(&self.ending).clone();
        if matches!(ending, MockEnding::FreeTierLimit) {
            return (vec![StreamEvent::FreeTierLimit], ending);
        }

        let mut events = Vec::new();
        if let Some(section) = request.section() {
            events.push(StreamEvent::chunk(format!("Section {section}: ")));
        }
        for chunk in &self.chunks {
            let mut pending_token = String::new();
            for ch in chunk.chars() {
                pending_token.push(ch);
                if matches!(ch, ' ' | '\n') {
                    events.push(StreamEvent::chunk(std::mem::take(&mut pending_token)));
                }
            }
            if !pending_token.is_empty() {
                events.push(StreamEvent::chunk(pending_token));
            }
        }

        match &ending {
            MockEnding::Complete => {
                let id = request
                    .conversation_id()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| {
                        let next = self.conversations.fetch_add(1, Ordering::SeqCst) + 1;
                        format!("mock-conversation-{next}")
                    });
                events.push(StreamEvent::Complete { id: Some(id) });
            }
            MockEnding::Error(message) => events.push(StreamEvent::error(message.clone())),
            MockEnding::FreeTierLimit | MockEnding::Drop | MockEnding::ConnectFailure(_) => {}
        }

        (events, ending)
    }

    fn upload_events(&self) -> Vec<StreamEvent> {
        let total = self.upload_steps;
        let mut events: Vec<StreamEvent> = (1..=total)
            .map(|completed| StreamEvent::Update { completed, total })
            .collect();
        events.push(StreamEvent::Complete { id: None });
        events
    }

    const OPEN_DELAY_MS: u64 = 150;
    const TOKEN_DELAY_MS: u64 = 40;
}

impl Default for MockConnectionProvider {
    fn default() -> Self {
        Self::new(vec![
            "The filing describes three reportable segments and notes that ".to_string(),
            "net sales grew year over year, driven mainly by services.\n".to_string(),
            "\n".to_string(),
            "Key risk factors include supply chain concentration, ".to_string(),
            "foreign exchange exposure, and ongoing regulatory scrutiny.\n".to_string(),
            "\n".to_string(),
            "Management expects capital expenditures to remain elevated.".to_string(),
        ])
    }
}

impl ConnectionProvider for MockConnectionProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            endpoint: "mock://findiff".to_string(),
        }
    }

    fn open(
        &self,
        req: OpenRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(ConnectionEvent),
    ) -> Result<(), String> {
        let connection_id = req.connection_id;
        lock_unpoisoned(&self.requests).push(req.clone());

        let (events, ending) = match &req.request {
            Request::UploadDocument { .. } => (self.upload_events(), MockEnding::Complete),
            request => self.chat_events(request),
        };

        if let MockEnding::ConnectFailure(error) = ending {
            emit(ConnectionEvent::Failed {
                connection_id,
                error,
            });
            return Ok(());
        }

        thread::sleep(self.delays.open);
        if cancel.load(Ordering::SeqCst) {
            emit(ConnectionEvent::Closed { connection_id });
            return Ok(());
        }
        emit(ConnectionEvent::Opened { connection_id });

        for event in events {
            if cancel.load(Ordering::SeqCst) {
                break;
            }
            emit(ConnectionEvent::Message {
                connection_id,
                event,
            });
            thread::sleep(self.delays.token);
        }

        emit(ConnectionEvent::Closed { connection_id });
        Ok(())
    }
}

/// In-memory filing catalog with a fixed set of companies.
#[derive(Debug)]
pub struct MockDocumentCatalog {
    processed: Mutex<HashSet<String>>,
    tickers: Vec<TickerMatch>,
    filings: Vec<(String, Filing)>,
    unavailable: bool,
}

impl MockDocumentCatalog {
    /// Catalog where no document has been processed yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            processed: Mutex::new(HashSet::new()),
            tickers: vec![
                ticker("320193", "AAPL", "Apple Inc."),
                ticker("789019", "MSFT", "MICROSOFT CORP"),
            ],
            filings: vec![
                filing("320193", "0000320193-23-000106", "2023-11-03", "aapl-20230930.htm"),
                filing("320193", "0000320193-22-000108", "2022-10-28", "aapl-20220924.htm"),
                filing("789019", "0000950170-23-035122", "2023-07-27", "msft-20230630.htm"),
                filing("789019", "0001564590-22-026876", "2022-07-28", "msft-10k_20220630.htm"),
            ],
            unavailable: false,
        }
    }

    /// Catalog whose processed check always fails.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    pub fn mark_processed(&self, document: &DocumentRef) {
        lock_unpoisoned(&self.processed).insert(document.document_id());
    }
}

impl Default for MockDocumentCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentCatalog for MockDocumentCatalog {
    fn is_document_processed(
        &self,
        document: &DocumentRef,
        _id_token: Option<&str>,
    ) -> Result<bool, String> {
        if self.unavailable {
            return Err("Document check failed: catalog unavailable".to_string());
        }
        Ok(lock_unpoisoned(&self.processed).contains(&document.document_id()))
    }

    fn search_tickers(&self, query: &str) -> Result<Vec<TickerMatch>, String> {
        let needle = query.trim().to_ascii_lowercase();
        Ok(self
            .tickers
            .iter()
            .filter(|hit| {
                hit.ticker.to_ascii_lowercase().contains(&needle)
                    || hit.title.to_ascii_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    fn available_filings(&self, cik: &str) -> Result<Vec<Filing>, String> {
        Ok(self
            .filings
            .iter()
            .filter(|(owner, _)| owner == cik)
            .map(|(_, filing)| filing.clone())
            .collect())
    }
}

fn ticker(cik: &str, symbol: &str, title: &str) -> TickerMatch {
    TickerMatch {
        cik_str: cik.to_string(),
        ticker: symbol.to_string(),
        title: title.to_string(),
    }
}

fn filing(cik: &str, accession: &str, date: &str, primary: &str) -> (String, Filing) {
    (
        cik.to_string(),
        Filing {
            accession_number: accession.to_string(),
            filing_date: date.to_string(),
            primary_document: primary.to_string(),
        },
    )
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
