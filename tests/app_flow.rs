use std::time::{Duration, Instant};

use findiff::app::{App, AppSettings, HostOps, Role, Turn};
use findiff::documents::{SelectedDocument, Stock, StockLookup};
use findiff_api::{DocumentRef, Request, SessionTier, StockRef, StreamEvent};
use findiff_provider::{ConnectionEvent, ConnectionId, SessionSnapshot};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct HostSpy {
    next_id: ConnectionId,
    opened: Vec<(ConnectionId, Request)>,
    closed: Vec<ConnectionId>,
    checks: Vec<(ConnectionId, DocumentRef)>,
    lookups: Vec<String>,
    fail_open: Option<String>,
    sign_in_requests: usize,
    upgrade_requests: usize,
    render_requests: usize,
    stop_requests: usize,
}

impl HostSpy {
    fn allocate(&mut self) -> ConnectionId {
        self.next_id += 1;
        self.next_id
    }

    fn last_connection(&self) -> ConnectionId {
        self.opened.last().expect("a connection was opened").0
    }

    fn last_request(&self) -> &Request {
        &self.opened.last().expect("a connection was opened").1
    }

    fn last_check(&self) -> ConnectionId {
        self.checks.last().expect("a check was started").0
    }
}

impl HostOps for HostSpy {
    fn open_connection(&mut self, request: Request) -> Result<ConnectionId, String> {
        if let Some(error) = &self.fail_open {
            return Err(error.clone());
        }
        let connection_id = self.allocate();
        self.opened.push((connection_id, request));
        Ok(connection_id)
    }

    fn close_connection(&mut self, connection_id: ConnectionId) {
        self.closed.push(connection_id);
    }

    fn check_document(&mut self, document: DocumentRef) -> Result<ConnectionId, String> {
        let check_id = self.allocate();
        self.checks.push((check_id, document));
        Ok(check_id)
    }

    fn lookup_stock(&mut self, query: &str) -> Result<(), String> {
        self.lookups.push(query.to_string());
        Ok(())
    }

    fn request_sign_in(&mut self) {
        self.sign_in_requests += 1;
    }

    fn request_upgrade(&mut self) {
        self.upgrade_requests += 1;
    }

    fn request_render(&mut self) {
        self.render_requests += 1;
    }

    fn request_stop(&mut self) {
        self.stop_requests += 1;
    }
}

fn settings(anonymous_quota: u32) -> AppSettings {
    AppSettings {
        reveal_chars: 4,
        commit_interval: Duration::ZERO,
        anonymous_quota,
        watchdog_timeout: Duration::from_secs(300),
    }
}

fn anonymous() -> SessionSnapshot {
    SessionSnapshot::anonymous()
}

fn signed_in() -> SessionSnapshot {
    SessionSnapshot {
        tier: SessionTier::Free,
    }
}

fn apple() -> StockLookup {
    StockLookup {
        stock: Stock {
            cik: "0000320193".to_string(),
            ticker: "AAPL".to_string(),
            title: "Apple Inc.".to_string(),
        },
        filings: vec![
            SelectedDocument::new("2023-11-03", "0000320193-23-000106", "aapl-20230930.htm"),
            SelectedDocument::new("2022-12-31", "0000320193-23-000001", "aapl-2022.htm"),
            SelectedDocument::new("2021-10-29", "0000320193-21-000105", "aapl-20210925.htm"),
        ],
    }
}

fn microsoft() -> StockLookup {
    StockLookup {
        stock: Stock {
            cik: "789019".to_string(),
            ticker: "MSFT".to_string(),
            title: "MICROSOFT CORP".to_string(),
        },
        filings: vec![SelectedDocument::new(
            "2023-07-27",
            "0000950170-23-035122",
            "msft-20230630.htm",
        )],
    }
}

/// App with AAPL selected and the given filings already verified as processed.
fn app_with_filings(
    session: SessionSnapshot,
    anonymous_quota: u32,
    filings: &[&str],
) -> (App, HostSpy) {
    let mut app = App::new(settings(anonymous_quota), session);
    let mut host = HostSpy::default();
    app.on_stock_resolved(Ok(apple()), &mut host);

    for filing in filings {
        app.on_add_document(filing, &mut host);
        let check_id = host.last_check();
        app.on_document_checked(check_id, Ok(true), &mut host);
    }
    app.take_notices();

    (app, host)
}

fn submit(app: &mut App, host: &mut HostSpy, prompt: &str) {
    app.on_input_replace(prompt.to_string());
    app.on_submit(host);
}

fn deliver(app: &mut App, host: &mut HostSpy, connection_id: ConnectionId, event: StreamEvent) {
    app.on_connection_event(
        ConnectionEvent::Message {
            connection_id,
            event,
        },
        host,
    );
}

fn run_frames(app: &mut App, host: &mut HostSpy, clock: &mut Instant, frames: usize) {
    for _ in 0..frames {
        *clock += Duration::from_millis(20);
        app.on_frame(*clock, host);
    }
}

fn has_notice(app: &App, needle: &str) -> bool {
    app.notices().iter().any(|notice| notice.contains(needle))
}

fn complete_exchange(
    app: &mut App,
    host: &mut HostSpy,
    clock: &mut Instant,
    prompt: &str,
    reply: &str,
    conversation_id: Option<&str>,
) {
    submit(app, host, prompt);
    let connection_id = host.last_connection();
    deliver(app, host, connection_id, StreamEvent::chunk(reply));
    deliver(
        app,
        host,
        connection_id,
        StreamEvent::Complete {
            id: conversation_id.map(ToString::to_string),
        },
    );
    run_frames(app, host, clock, 64);
    assert!(!app.is_streaming());
}

#[test]
fn submit_without_documents_opens_nothing_and_keeps_transcript() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &[]);

    submit(&mut app, &mut host, "Summarize risk factors");

    assert!(host.opened.is_empty());
    assert!(app.transcript.is_empty());
    assert_eq!(app.gate().anonymous_remaining(), 4);
    assert!(!app.is_streaming());
}

#[test]
fn single_filing_submission_sends_generate_response() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &["2022-12-31"]);

    submit(&mut app, &mut host, "Summarize risk factors");

    assert_eq!(
        host.last_request(),
        &Request::GenerateResponse {
            cik: "0000320193".to_string(),
            accession: "0000320193-23-000001".to_string(),
            primary_doc: "aapl-2022.htm".to_string(),
            prompt: "Summarize risk factors".to_string(),
            conversation_id: None,
        }
    );
    assert_eq!(
        serde_json::to_value(host.last_request()).expect("serializable"),
        serde_json::json!({
            "action": "generate_response",
            "cik": "0000320193",
            "accession": "0000320193-23-000001",
            "primaryDoc": "aapl-2022.htm",
            "prompt": "Summarize risk factors",
        })
    );

    assert_eq!(app.input, "");
    assert_eq!(
        app.transcript
            .iter()
            .map(|turn| (turn.role, turn.content.as_str()))
            .collect::<Vec<_>>(),
        vec![
            (Role::User, "Summarize risk factors"),
            (Role::Assistant, "")
        ]
    );
    assert!(app.is_streaming());
    assert_eq!(app.active_connection(), Some(host.last_connection()));
    assert_eq!(app.gate().anonymous_remaining(), 3);
}

#[test]
fn two_filings_are_sent_oldest_first() {
    let (mut app, mut host) = app_with_filings(signed_in(), 0, &["2023", "2022"]);

    submit(&mut app, &mut host, "What changed?");

    match host.last_request() {
        Request::GenerateMultiContextResponse {
            stocks,
            prompt,
            conversation_id,
        } => {
            let accessions: Vec<&str> = stocks.iter().map(|stock| stock.accession.as_str()).collect();
            assert_eq!(
                accessions,
                vec!["0000320193-23-000001", "0000320193-23-000106"]
            );
            assert_eq!(prompt, "What changed?");
            assert_eq!(conversation_id, &None);
        }
        other => panic!("unexpected request: {other:?}"),
    }
}

#[test]
fn chunks_render_in_order_and_settle_after_draining() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &["2022"]);
    let mut clock = Instant::now();

    submit(&mut app, &mut host, "Say hello");
    let connection_id = host.last_connection();
    app.on_connection_event(ConnectionEvent::Opened { connection_id }, &mut host);
    deliver(&mut app, &mut host, connection_id, StreamEvent::chunk("Hello "));
    deliver(&mut app, &mut host, connection_id, StreamEvent::chunk("world"));
    deliver(&mut app, &mut host, connection_id, StreamEvent::Complete { id: None });

    assert_eq!(app.transcript[1].content, "");
    assert!(app.is_streaming());
    assert_eq!(host.closed, vec![connection_id]);

    run_frames(&mut app, &mut host, &mut clock, 1);
    assert_eq!(app.transcript[1].content, "Hell");
    assert!(app.is_streaming());

    run_frames(&mut app, &mut host, &mut clock, 8);
    assert_eq!(app.transcript[1].content, "Hello world");
    assert!(!app.is_streaming());
    assert_eq!(app.conversation_id(), None);
}

#[test]
fn completion_id_is_sent_with_the_next_request() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &["2022"]);
    let mut clock = Instant::now();

    complete_exchange(&mut app, &mut host, &mut clock, "First", "Answer", Some("abc123"));
    assert_eq!(app.conversation_id(), Some("abc123"));

    submit(&mut app, &mut host, "Follow up");
    assert_eq!(host.last_request().conversation_id(), Some("abc123"));
}

#[test]
fn free_tier_limit_withdraws_the_exchange_and_prompts_once() {
    let (mut app, mut host) = app_with_filings(signed_in(), 4, &["2022"]);
    let mut clock = Instant::now();

    complete_exchange(&mut app, &mut host, &mut clock, "First", "Answer", Some("c1"));
    let before = app.transcript.clone();

    submit(&mut app, &mut host, "Second");
    let connection_id = host.last_connection();
    deliver(&mut app, &mut host, connection_id, StreamEvent::chunk("partial text"));
    run_frames(&mut app, &mut host, &mut clock, 1);
    assert_eq!(app.transcript.len(), 4);

    deliver(&mut app, &mut host, connection_id, StreamEvent::FreeTierLimit);
    assert_eq!(app.transcript, before);
    assert_eq!(host.upgrade_requests, 1);
    assert_eq!(app.gate().upgrade_prompts(), 1);
    assert!(host.closed.contains(&connection_id));
    assert!(!app.is_streaming());

    deliver(&mut app, &mut host, connection_id, StreamEvent::FreeTierLimit);
    deliver(&mut app, &mut host, connection_id, StreamEvent::chunk("late"));
    run_frames(&mut app, &mut host, &mut clock, 8);
    assert_eq!(host.upgrade_requests, 1);
    assert_eq!(app.transcript, before);
}

#[test]
fn exhausted_anonymous_quota_requests_sign_in_instead_of_connecting() {
    let (mut app, mut host) = app_with_filings(anonymous(), 0, &["2022"]);

    submit(&mut app, &mut host, "Anything");

    assert!(host.opened.is_empty());
    assert_eq!(host.sign_in_requests, 1);
    assert!(app.transcript.is_empty());
}

#[test]
fn anonymous_quota_counts_down_but_signed_in_sessions_are_not_counted() {
    let (mut app, mut host) = app_with_filings(anonymous(), 1, &["2022"]);
    let mut clock = Instant::now();
    complete_exchange(&mut app, &mut host, &mut clock, "One", "Reply", None);

    submit(&mut app, &mut host, "Two");
    assert_eq!(host.opened.len(), 1);
    assert_eq!(host.sign_in_requests, 1);

    let (mut app, mut host) = app_with_filings(signed_in(), 0, &["2022"]);
    submit(&mut app, &mut host, "One");
    assert_eq!(host.opened.len(), 1);
    assert_eq!(host.sign_in_requests, 0);
}

#[test]
fn error_event_renders_inline_and_clears_awaiting_immediately() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &["2022"]);
    let mut clock = Instant::now();

    submit(&mut app, &mut host, "Question");
    let connection_id = host.last_connection();
    deliver(&mut app, &mut host, connection_id, StreamEvent::chunk("Partial. "));
    deliver(&mut app, &mut host, connection_id, StreamEvent::error("Model overloaded"));

    assert_eq!(app.active_connection(), None);
    assert!(host.closed.contains(&connection_id));
    app.on_input_replace("next".to_string());
    assert!(!app.can_submit());

    run_frames(&mut app, &mut host, &mut clock, 16);
    assert_eq!(app.transcript[1].content, "Partial. Model overloaded");
    assert!(app.can_submit());
}

#[test]
fn close_without_terminal_keeps_partial_content() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &["2022"]);
    let mut clock = Instant::now();

    submit(&mut app, &mut host, "Question");
    let connection_id = host.last_connection();
    deliver(&mut app, &mut host, connection_id, StreamEvent::chunk("Half"));
    run_frames(&mut app, &mut host, &mut clock, 2);
    app.on_connection_event(ConnectionEvent::Closed { connection_id }, &mut host);

    assert!(!app.is_streaming());
    assert_eq!(app.transcript[1].content, "Half");
    assert!(has_notice(&app, "Connection closed before the response finished."));
}

#[test]
fn transport_failure_is_reported_without_retry() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &["2022"]);

    submit(&mut app, &mut host, "Question");
    let connection_id = host.last_connection();
    app.on_connection_event(
        ConnectionEvent::Failed {
            connection_id,
            error: "connection reset".to_string(),
        },
        &mut host,
    );

    assert!(!app.is_streaming());
    assert_eq!(host.opened.len(), 1);
    assert!(has_notice(&app, "Connection error: connection reset"));
}

#[test]
fn open_failure_writes_the_error_into_the_turn() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &["2022"]);
    host.fail_open = Some("refused".to_string());

    submit(&mut app, &mut host, "Question");

    assert_eq!(app.transcript.len(), 2);
    assert_eq!(app.transcript[1].content, "[Connection error: refused]");
    assert!(!app.is_streaming());
    assert!(app.active_connection().is_none());
}

#[test]
fn failed_opens_do_not_spend_anonymous_quota() {
    let (mut app, mut host) = app_with_filings(anonymous(), 2, &["2022"]);
    let mut clock = Instant::now();
    host.fail_open = Some("refused".to_string());

    submit(&mut app, &mut host, "Q1");
    submit(&mut app, &mut host, "Q2");
    assert_eq!(app.gate().anonymous_remaining(), 2);

    host.fail_open = None;
    complete_exchange(&mut app, &mut host, &mut clock, "Q3", "Answer", None);

    assert_eq!(host.opened.len(), 1);
    assert_eq!(host.sign_in_requests, 0);
    assert_eq!(app.gate().anonymous_remaining(), 1);
    assert_eq!(app.transcript.len(), 6);
}

#[test]
fn events_from_a_superseded_connection_are_ignored() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &["2022"]);
    let mut clock = Instant::now();

    submit(&mut app, &mut host, "First");
    let first = host.last_connection();
    deliver(&mut app, &mut host, first, StreamEvent::error("boom"));
    run_frames(&mut app, &mut host, &mut clock, 4);

    submit(&mut app, &mut host, "Second");
    let second = host.last_connection();
    assert_ne!(first, second);

    deliver(&mut app, &mut host, first, StreamEvent::chunk("stale text"));
    deliver(&mut app, &mut host, first, StreamEvent::Complete { id: Some("old".to_string()) });
    deliver(&mut app, &mut host, second, StreamEvent::chunk("fresh"));
    deliver(&mut app, &mut host, second, StreamEvent::Complete { id: None });
    run_frames(&mut app, &mut host, &mut clock, 8);

    assert_eq!(app.transcript[1].content, "boom");
    assert_eq!(app.transcript[3].content, "fresh");
    assert_eq!(app.conversation_id(), None);
}

#[test]
fn watchdog_settles_a_silent_submission() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &["2022"]);
    let start = Instant::now();

    submit(&mut app, &mut host, "Question");
    let connection_id = host.last_connection();

    app.on_frame(start, &mut host);
    app.on_frame(start + Duration::from_secs(200), &mut host);
    deliver(&mut app, &mut host, connection_id, StreamEvent::chunk("Hi"));
    app.on_frame(start + Duration::from_secs(200), &mut host);
    app.on_frame(start + Duration::from_secs(450), &mut host);
    assert_eq!(app.active_connection(), Some(connection_id));

    app.on_frame(start + Duration::from_secs(500), &mut host);
    assert_eq!(app.active_connection(), None);
    assert!(host.closed.contains(&connection_id));

    let mut clock = start + Duration::from_secs(500);
    run_frames(&mut app, &mut host, &mut clock, 32);
    assert_eq!(
        app.transcript[1].content,
        "Hi\n\n[No response from the server for 300 seconds.]"
    );
    assert!(!app.is_streaming());
}

#[test]
fn section_action_on_one_filing_adds_only_a_labelled_placeholder() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &["2022"]);

    app.on_section("risk factors", &mut host);

    assert_eq!(
        host.last_request(),
        &Request::Analyze10kSection {
            stock: StockRef {
                cik: "0000320193".to_string(),
                accession_number: "0000320193-23-000001".to_string(),
                primary_document: "aapl-2022.htm".to_string(),
            },
            section: "risk_factors".to_string(),
        }
    );
    assert_eq!(
        app.transcript,
        vec![Turn {
            role: Role::Assistant,
            content: String::new(),
            section: Some("Risk factors".to_string()),
            submission: app.transcript[0].submission,
        }]
    );
    assert!(app.is_streaming());
}

#[test]
fn section_action_on_two_filings_compares_oldest_first() {
    let (mut app, mut host) = app_with_filings(signed_in(), 0, &["2023", "2022"]);

    app.on_input_replace("/section 2".to_string());
    app.on_submit(&mut host);

    match host.last_request() {
        Request::Compare10kFilings {
            stock1,
            stock2,
            section,
        } => {
            assert_eq!(stock1.accession_number, "0000320193-23-000001");
            assert_eq!(stock2.accession_number, "0000320193-23-000106");
            assert_eq!(section, "risk_factors");
        }
        other => panic!("unexpected request: {other:?}"),
    }
}

#[test]
fn section_listing_and_unknown_sections_open_nothing() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &["2022"]);

    app.on_section("", &mut host);
    app.on_section("weather report", &mut host);

    assert!(host.opened.is_empty());
    assert!(has_notice(&app, "1. Business"));
    assert!(has_notice(&app, "unknown 10-K section 'weather report'"));
}

#[test]
fn new_chat_clears_transcript_and_conversation_but_not_while_streaming() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &["2022"]);
    let mut clock = Instant::now();
    complete_exchange(&mut app, &mut host, &mut clock, "First", "Answer", Some("c1"));

    submit(&mut app, &mut host, "Second");
    app.on_new_chat(&mut host);
    assert_eq!(app.transcript.len(), 4);
    assert_eq!(app.conversation_id(), Some("c1"));

    let connection_id = host.last_connection();
    deliver(&mut app, &mut host, connection_id, StreamEvent::Complete { id: Some("c2".to_string()) });
    run_frames(&mut app, &mut host, &mut clock, 2);

    app.on_input_replace("/new".to_string());
    app.on_submit(&mut host);
    assert!(app.transcript.is_empty());
    assert_eq!(app.conversation_id(), None);

    submit(&mut app, &mut host, "Fresh start");
    assert_eq!(host.last_request().conversation_id(), None);
}

#[test]
fn document_ceiling_and_duplicates_are_enforced_before_checking() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &["2022"]);

    app.on_add_document("2022-12-31", &mut host);
    assert!(has_notice(&app, "already selected"));
    app.on_add_document("2023", &mut host);
    assert!(has_notice(&app, "at most 1 filing(s)"));
    assert_eq!(host.checks.len(), 1);

    let (mut app, mut host) = app_with_filings(signed_in(), 0, &[]);
    app.on_add_document("2023", &mut host);
    app.on_add_document("2022", &mut host);
    app.on_add_document("2021", &mut host);
    assert_eq!(host.checks.len(), 2);
    assert!(has_notice(&app, "at most 2 filing(s)"));

    app.on_add_document("1999", &mut host);
    assert!(has_notice(&app, "no filing matches '1999'"));
}

#[test]
fn unprocessed_filing_is_uploaded_and_blocks_submission_until_done() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &[]);

    app.on_add_document("2023", &mut host);
    let check_id = host.last_check();
    assert!(app.uploads().in_flight());
    app.on_document_checked(check_id, Ok(false), &mut host);

    assert!(app.selection().contains("2023-11-03"));
    let upload_id = host.last_connection();
    assert_eq!(
        host.last_request(),
        &Request::UploadDocument {
            cik: "0000320193".to_string(),
            accession: "0000320193-23-000106".to_string(),
            primary_doc: "aapl-20230930.htm".to_string(),
        }
    );

    app.on_input_replace("Question".to_string());
    assert!(!app.can_submit());
    app.on_submit(&mut host);
    assert_eq!(host.opened.len(), 1);
    assert!(has_notice(&app, "still being processed"));
    assert_eq!(app.gate().anonymous_remaining(), 4);

    deliver(
        &mut app,
        &mut host,
        upload_id,
        StreamEvent::Update {
            completed: 2,
            total: 5,
        },
    );
    let progress = app
        .uploads()
        .progress_for("0000320193-23-000106")
        .expect("progress tracked");
    assert_eq!(progress.percent(), 40);
    submit(&mut app, &mut host, "/status");
    assert!(has_notice(&app, "filings: 2023-11-03 (processing 40%)"));

    deliver(&mut app, &mut host, upload_id, StreamEvent::Complete { id: None });
    assert!(!app.uploads().in_flight());
    assert!(has_notice(&app, "Filing 2023-11-03 processed."));
    app.on_input_replace("Question".to_string());
    assert!(app.can_submit());
}

#[test]
fn failed_upload_keeps_the_filing_selected() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &[]);

    app.on_add_document("2023", &mut host);
    let check_id = host.last_check();
    app.on_document_checked(check_id, Ok(false), &mut host);
    let upload_id = host.last_connection();

    deliver(&mut app, &mut host, upload_id, StreamEvent::error("extraction failed"));

    assert!(app.selection().contains("2023-11-03"));
    assert!(!app.uploads().in_flight());
    assert!(has_notice(&app, "Processing failed for filing 2023-11-03: extraction failed"));
}

#[test]
fn failed_processed_check_selects_nothing() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &[]);

    app.on_add_document("2023", &mut host);
    let check_id = host.last_check();
    app.on_document_checked(check_id, Err("Document check failed: 500".to_string()), &mut host);

    assert!(app.selection().is_empty());
    assert!(!app.uploads().in_flight());
    assert!(host.opened.is_empty());
    assert!(has_notice(&app, "Could not verify filing 2023-11-03"));
}

#[test]
fn switching_stock_resets_selection_and_chat_and_drops_stale_checks() {
    let (mut app, mut host) = app_with_filings(signed_in(), 0, &["2022"]);
    let mut clock = Instant::now();
    complete_exchange(&mut app, &mut host, &mut clock, "First", "Answer", Some("c1"));

    app.on_add_document("2023", &mut host);
    let stale_check = host.last_check();

    app.on_input_replace("/stock msft".to_string());
    app.on_submit(&mut host);
    assert_eq!(host.lookups, vec!["msft".to_string()]);
    assert_eq!(app.pending_lookup(), Some("msft"));

    app.on_stock_resolved(Ok(microsoft()), &mut host);
    assert_eq!(app.pending_lookup(), None);
    assert_eq!(app.stock().map(|stock| stock.ticker.as_str()), Some("MSFT"));
    assert!(app.selection().is_empty());
    assert!(app.transcript.is_empty());
    assert_eq!(app.conversation_id(), None);

    app.on_document_checked(stale_check, Ok(true), &mut host);
    assert!(app.selection().is_empty());
}

#[test]
fn removing_filings_is_refused_while_streaming() {
    let (mut app, mut host) = app_with_filings(anonymous(), 4, &["2022"]);

    submit(&mut app, &mut host, "Question");
    app.on_remove_document("2022", &mut host);
    assert!(app.selection().contains("2022-12-31"));

    let connection_id = host.last_connection();
    deliver(&mut app, &mut host, connection_id, StreamEvent::error("stop"));
    let mut clock = Instant::now();
    run_frames(&mut app, &mut host, &mut clock, 4);

    app.on_input_replace("/remove 2022".to_string());
    app.on_submit(&mut host);
    assert!(app.selection().is_empty());
}

#[test]
fn help_unknown_and_quit_commands() {
    let mut app = App::default();
    let mut host = HostSpy::default();

    app.on_input_replace("/help".to_string());
    app.on_submit(&mut host);
    assert!(has_notice(&app, "/stock <ticker>"));

    app.on_input_replace("/bogus arg".to_string());
    app.on_submit(&mut host);
    assert!(has_notice(&app, "Unknown command: /bogus"));

    app.on_input_replace("/quit".to_string());
    app.on_submit(&mut host);
    assert!(app.should_exit);
    assert_eq!(host.stop_requests, 1);
    assert!(host.render_requests >= 3);
    assert!(host.opened.is_empty());
}
