//! Conversation state machine.
//!
//! `App` owns the transcript, the filing selection and the in-flight
//! submission. It never touches the network: every side effect goes through
//! [`HostOps`], and every outcome comes back as a [`ConnectionEvent`], a
//! processed-check result or a stock lookup result.

use std::time::{Duration, Instant};

use findiff_api::{DocumentRef, Request, StreamEvent};
use findiff_provider::{ConnectionEvent, ConnectionId, SessionSnapshot};
use tracing::{debug, info, warn};

use crate::accumulator::{
    ChunkAccumulator, Commit, SubmissionId, DEFAULT_COMMIT_INTERVAL, DEFAULT_REVEAL_CHARS,
};
use crate::commands::{parse_slash_command, SlashCommand};
use crate::documents::{
    document_ceiling, find_filing, DocumentSelection, SelectedDocument, Stock, StockLookup,
};
use crate::error::FindiffError;
use crate::gate::{AccessGate, GateDecision, DEFAULT_ANONYMOUS_QUOTA};
use crate::request::{chat_request, section_request, upload_request};
use crate::sections::{find_section, SECTIONS};
use crate::upload::UploadTracker;

/// Silence tolerated from an open chat connection; matches the legacy
/// 150 x 2s poll budget.
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(300);

const HELP_TEXT: &str = "Commands: /stock <ticker>, /add <year|date>, /remove <year|date>, \
/section [name|number], /new, /status, /help, /quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Section label when the turn came from a section action.
    pub section: Option<String>,
    pub submission: Option<SubmissionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppSettings {
    pub reveal_chars: usize,
    pub commit_interval: Duration,
    pub anonymous_quota: u32,
    pub watchdog_timeout: Duration,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            reveal_chars: DEFAULT_REVEAL_CHARS,
            commit_interval: DEFAULT_COMMIT_INTERVAL,
            anonymous_quota: DEFAULT_ANONYMOUS_QUOTA,
            watchdog_timeout: DEFAULT_WATCHDOG_TIMEOUT,
        }
    }
}

pub trait HostOps {
    /// Open a connection whose only outbound frame is `request`.
    fn open_connection(&mut self, request: Request) -> Result<ConnectionId, String>;
    fn close_connection(&mut self, connection_id: ConnectionId);
    /// Start a processed check. The result arrives via [`App::on_document_checked`].
    fn check_document(&mut self, document: DocumentRef) -> Result<ConnectionId, String>;
    /// Start a stock lookup. The result arrives via [`App::on_stock_resolved`].
    fn lookup_stock(&mut self, query: &str) -> Result<(), String>;
    fn request_sign_in(&mut self);
    fn request_upgrade(&mut self);
    fn request_render(&mut self);
    fn request_stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Streaming,
    /// `complete` arrived; waiting for the accumulator to drain.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveSubmission {
    id: SubmissionId,
    connection_id: ConnectionId,
    transcript_len_before: usize,
    state: StreamState,
    last_activity: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct App {
    pub input: String,
    pub transcript: Vec<Turn>,
    pub should_exit: bool,
    notices: Vec<String>,
    session: SessionSnapshot,
    stock: Option<Stock>,
    filings: Vec<SelectedDocument>,
    selection: DocumentSelection,
    conversation_id: Option<String>,
    accumulator: ChunkAccumulator,
    active: Option<ActiveSubmission>,
    next_submission: SubmissionId,
    gate: AccessGate,
    uploads: UploadTracker,
    pending_lookup: Option<String>,
    watchdog_timeout: Duration,
}

impl Default for App {
    fn default() -> Self {
        Self::new(AppSettings::default(), SessionSnapshot::anonymous())
    }
}

impl App {
    pub fn new(settings: AppSettings, session: SessionSnapshot) -> Self {
        Self {
            input: String::new(),
            transcript: Vec::new(),
            should_exit: false,
            notices: Vec::new(),
            session,
            stock: None,
            filings: Vec::new(),
            selection: DocumentSelection::default(),
            conversation_id: None,
            accumulator: ChunkAccumulator::new(settings.reveal_chars, settings.commit_interval),
            active: None,
            next_submission: 1,
            gate: AccessGate::new(settings.anonymous_quota),
            uploads: UploadTracker::default(),
            pending_lookup: None,
            watchdog_timeout: settings.watchdog_timeout,
        }
    }

    pub fn session(&self) -> SessionSnapshot {
        self.session
    }

    pub fn set_session(&mut self, session: SessionSnapshot) {
        self.session = session;
    }

    pub fn stock(&self) -> Option<&Stock> {
        self.stock.as_ref()
    }

    /// Filings available for the current stock, newest first.
    pub fn filings(&self) -> &[SelectedDocument] {
        &self.filings
    }

    pub fn selection(&self) -> &DocumentSelection {
        &self.selection
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn uploads(&self) -> &UploadTracker {
        &self.uploads
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn pending_lookup(&self) -> Option<&str> {
        self.pending_lookup.as_deref()
    }

    /// A submission is open, or its text is still draining.
    pub fn is_streaming(&self) -> bool {
        self.active.is_some() || !self.accumulator.is_idle()
    }

    /// The connection tied to the in-flight submission, if any.
    pub fn active_connection(&self) -> Option<ConnectionId> {
        self.active.map(|active| active.connection_id)
    }

    /// Whether the send affordance is enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_streaming()
            && !self.uploads.in_flight()
            && self.stock.is_some()
            && !self.selection.is_empty()
            && !self.input.trim().is_empty()
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    pub fn status_summary(&self) -> String {
        let stock = self.stock.as_ref().map_or_else(
            || "no stock".to_string(),
            |stock| format!("{} ({})", stock.ticker, stock.title),
        );
        let filings: Vec<String> = self
            .selection
            .sorted_by_filing_date()
            .into_iter()
            .map(|document| self.filing_status(document))
            .collect();
        let filings = if filings.is_empty() {
            "none".to_string()
        } else {
            filings.join(", ")
        };
        let ceiling = document_ceiling(self.session.authenticated());
        let access = if self.session.authenticated() {
            format!("signed in ({})", self.session.tier.as_str())
        } else {
            format!("anonymous, {} questions left", self.gate.anonymous_remaining())
        };

        format!("{stock} | filings: {filings} (max {ceiling}) | {access}")
    }

    fn filing_status(&self, document: &SelectedDocument) -> String {
        let date = &document.filing_date;
        if !self.uploads.is_processing(&document.accession_number) {
            return date.clone();
        }
        match self.uploads.progress_for(&document.accession_number) {
            Some(progress) => format!("{date} (processing {}%)", progress.percent()),
            None => format!("{date} (processing)"),
        }
    }

    pub fn on_input_replace(&mut self, text: String) {
        self.input = text;
    }

    pub fn on_submit(&mut self, host: &mut dyn HostOps) {
        let submitted = self.input.trim().to_string();

        if submitted.is_empty() {
            self.input.clear();
            host.request_render();
            return;
        }

        if let Some(command) = parse_slash_command(&submitted) {
            self.input.clear();
            self.on_command(command, host);
            return;
        }

        self.submit_prompt(submitted, host);
    }

    fn on_command(&mut self, command: SlashCommand, host: &mut dyn HostOps) {
        match command {
            SlashCommand::Help => {
                self.notice(HELP_TEXT);
                host.request_render();
            }
            SlashCommand::New => self.on_new_chat(host),
            SlashCommand::Stock(query) => self.on_stock_query(&query, host),
            SlashCommand::Add(filing) => self.on_add_document(&filing, host),
            SlashCommand::Remove(filing) => self.on_remove_document(&filing, host),
            SlashCommand::Section(section) => self.on_section(&section, host),
            SlashCommand::Status => {
                let summary = self.status_summary();
                self.notice(summary);
                host.request_render();
            }
            SlashCommand::Quit => self.on_quit(host),
            SlashCommand::Unknown(command) => {
                self.notice(format!("Unknown command: {command}"));
                host.request_render();
            }
        }
    }

    fn submit_prompt(&mut self, prompt: String, host: &mut dyn HostOps) {
        let request = self.stock.as_ref().and_then(|stock| {
            chat_request(
                stock,
                &self.selection,
                &prompt,
                self.conversation_id.as_deref(),
            )
        });
        let Some(request) = request else {
            debug!("submission ignored: no filing selected");
            host.request_render();
            return;
        };

        if !self.ready_for_submission(host) {
            return;
        }

        let transcript_len_before = self.transcript.len();
        let submission = self.allocate_submission();
        self.transcript.push(Turn {
            role: Role::User,
            content: prompt,
            section: None,
            submission: Some(submission),
        });
        self.start_stream(submission, transcript_len_before, None, request, host);
    }

    /// View one section, or compare it across two filings.
    pub fn on_section(&mut self, input: &str, host: &mut dyn HostOps) {
        if input.trim().is_empty() {
            let listing: Vec<String> = SECTIONS
                .iter()
                .enumerate()
                .map(|(index, section)| format!("{:>2}. {}", index + 1, section.label))
                .collect();
            self.notice(format!("Sections:\n{}", listing.join("\n")));
            host.request_render();
            return;
        }

        let Some(section) = find_section(input) else {
            self.notice(FindiffError::UnknownSection(input.trim().to_string()).to_string());
            host.request_render();
            return;
        };

        let request = self
            .stock
            .as_ref()
            .and_then(|stock| section_request(stock, &self.selection, section));
        let Some(request) = request else {
            debug!(section = section.key, "section action ignored: no filing selected");
            host.request_render();
            return;
        };

        if !self.ready_for_submission(host) {
            return;
        }

        let transcript_len_before = self.transcript.len();
        let submission = self.allocate_submission();
        self.start_stream(
            submission,
            transcript_len_before,
            Some(section.label.to_string()),
            request,
            host,
        );
    }

    fn ready_for_submission(&mut self, host: &mut dyn HostOps) -> bool {
        if self.is_streaming() {
            self.notice("A response is still streaming; wait for it to finish.");
            host.request_render();
            return false;
        }

        if self.uploads.in_flight() {
            self.notice("Filings are still being processed; wait for processing to finish.");
            host.request_render();
            return false;
        }

        match self.gate.check_submission(self.session) {
            GateDecision::Allow { .. } => true,
            GateDecision::SignInRequired => {
                self.notice("You have used all free questions. Sign in to continue.");
                host.request_sign_in();
                host.request_render();
                false
            }
        }
    }

    fn allocate_submission(&mut self) -> SubmissionId {
        let submission = self.next_submission;
        self.next_submission += 1;
        submission
    }

    fn start_stream(
        &mut self,
        submission: SubmissionId,
        transcript_len_before: usize,
        section: Option<String>,
        request: Request,
        host: &mut dyn HostOps,
    ) {
        let turn_index = self.transcript.len();
        self.transcript.push(Turn {
            role: Role::Assistant,
            content: String::new(),
            section,
            submission: Some(submission),
        });
        self.input.clear();
        self.accumulator.bind(submission, turn_index);

        let action = request.action();
        match host.open_connection(request) {
            Ok(connection_id) => {
                info!(connection_id, submission, action, "submission opened");
                if let Some(remaining) = self.gate.consume(self.session) {
                    debug!(remaining, "anonymous quota consumed");
                }
                self.active = Some(ActiveSubmission {
                    id: submission,
                    connection_id,
                    transcript_len_before,
                    state: StreamState::Streaming,
                    last_activity: None,
                });
            }
            Err(error) => {
                warn!(submission, action, %error, "failed to open connection");
                self.accumulator.reset();
                self.transcript[turn_index].content = format!("[Connection error: {error}]");
            }
        }

        host.request_render();
    }

    /// Reset transcript and conversation id. Refused while a response streams.
    pub fn on_new_chat(&mut self, host: &mut dyn HostOps) {
        if self.is_streaming() {
            self.notice("Wait for the current response to finish before starting a new chat.");
        } else {
            self.reset_conversation();
            self.notice("Started a new chat.");
        }
        host.request_render();
    }

    fn reset_conversation(&mut self) {
        self.transcript.clear();
        self.conversation_id = None;
        self.accumulator.reset();
    }

    pub fn on_stock_query(&mut self, query: &str, host: &mut dyn HostOps) {
        if self.is_streaming() {
            self.notice("Wait for the current response to finish before switching stocks.");
            host.request_render();
            return;
        }

        match host.lookup_stock(query) {
            Ok(()) => self.pending_lookup = Some(query.trim().to_string()),
            Err(error) => self.notice(format!("Stock lookup failed: {error}")),
        }
        host.request_render();
    }

    /// Selecting a stock clears the selection and starts a new chat.
    pub fn on_stock_resolved(&mut self, result: Result<StockLookup, String>, host: &mut dyn HostOps) {
        self.pending_lookup = None;

        match result {
            Ok(_) if self.is_streaming() => {
                self.notice("Stock lookup finished while a response was streaming; ignored.");
            }
            Ok(lookup) => {
                let dates: Vec<&str> = lookup
                    .filings
                    .iter()
                    .map(|filing| filing.filing_date.as_str())
                    .collect();
                let summary = if dates.is_empty() {
                    "no 10-K filings available".to_string()
                } else {
                    format!("10-K filings: {}", dates.join(", "))
                };
                self.notice(format!(
                    "Selected {} ({}); {summary}",
                    lookup.stock.ticker, lookup.stock.title
                ));
                info!(cik = %lookup.stock.cik, ticker = %lookup.stock.ticker, "stock selected");

                self.stock = Some(lookup.stock);
                self.filings = lookup.filings;
                self.selection.clear();
                self.reset_conversation();
            }
            Err(error) => self.notice(format!("Stock lookup failed: {error}")),
        }

        host.request_render();
    }

    /// Verify the filing with the processed check before selecting it.
    pub fn on_add_document(&mut self, input: &str, host: &mut dyn HostOps) {
        if let Err(error) = self.try_add_document(input, host) {
            self.notice(error.to_string());
        }
        host.request_render();
    }

    fn try_add_document(&mut self, input: &str, host: &mut dyn HostOps) -> Result<(), FindiffError> {
        let stock = self.stock.clone().ok_or(FindiffError::NoStock)?;
        let document = find_filing(&self.filings, input)
            .cloned()
            .ok_or_else(|| FindiffError::UnknownFiling(input.trim().to_string()))?;

        if self.selection.contains(&document.filing_date)
            || self.uploads.is_checking(&stock.cik, &document.filing_date)
        {
            return Err(FindiffError::DuplicateDocument {
                filing_date: document.filing_date,
            });
        }

        let ceiling = document_ceiling(self.session.authenticated());
        if self.selection.len() + self.uploads.pending_checks(&stock.cik) >= ceiling {
            return Err(FindiffError::SelectionFull { ceiling });
        }

        match host.check_document(document.document_ref(&stock.cik)) {
            Ok(check_id) => {
                debug!(check_id, filing_date = %document.filing_date, "processed check started");
                self.uploads.begin_check(check_id, &stock.cik, document);
            }
            Err(error) => self.notice(format!("Could not verify filing: {error}")),
        }
        Ok(())
    }

    /// Result of a processed check: select the filing, uploading it first when
    /// the backend has not processed it yet. A failed check selects nothing.
    pub fn on_document_checked(
        &mut self,
        check_id: ConnectionId,
        result: Result<bool, String>,
        host: &mut dyn HostOps,
    ) {
        let Some(check) = self.uploads.finish_check(check_id) else {
            debug!(check_id, "ignoring unknown processed check");
            return;
        };

        let Some(stock) = self.stock.clone().filter(|stock| stock.cik == check.cik) else {
            debug!(check_id, cik = %check.cik, "dropping check for a previous stock");
            host.request_render();
            return;
        };

        let document = check.document;
        let processed = match result {
            Ok(processed) => processed,
            Err(error) => {
                warn!(filing_date = %document.filing_date, %error, "processed check failed");
                self.notice(format!(
                    "Could not verify filing {}: {error}",
                    document.filing_date
                ));
                host.request_render();
                return;
            }
        };

        if let Err(error) = self
            .selection
            .add(document.clone(), self.session.authenticated())
        {
            self.notice(error.to_string());
            host.request_render();
            return;
        }

        if processed {
            self.notice(format!("Added filing {}.", document.filing_date));
        } else {
            match host.open_connection(upload_request(&stock, &document)) {
                Ok(connection_id) => {
                    info!(connection_id, filing_date = %document.filing_date, "upload started");
                    self.notice(format!(
                        "Added filing {}; processing started.",
                        document.filing_date
                    ));
                    self.uploads.begin_upload(connection_id, document);
                }
                Err(error) => {
                    warn!(filing_date = %document.filing_date, %error, "upload could not start");
                    self.notice(format!(
                        "Added filing {}, but processing could not start: {error}",
                        document.filing_date
                    ));
                }
            }
        }

        host.request_render();
    }

    /// Deselect a filing. Refused while a response streams.
    pub fn on_remove_document(&mut self, input: &str, host: &mut dyn HostOps) {
        if self.is_streaming() {
            self.notice("Filings cannot be removed while a response is streaming.");
            host.request_render();
            return;
        }

        let filing_date = find_filing(self.selection.documents(), input)
            .map(|document| document.filing_date.clone());
        match filing_date.and_then(|date| self.selection.remove(&date)) {
            Some(removed) => self.notice(format!("Removed filing {}.", removed.filing_date)),
            None => self.notice(format!("No selected filing matches '{}'", input.trim())),
        }
        host.request_render();
    }

    pub fn on_quit(&mut self, host: &mut dyn HostOps) {
        self.should_exit = true;
        host.request_stop();
        host.request_render();
    }

    pub fn on_connection_event(&mut self, event: ConnectionEvent, host: &mut dyn HostOps) {
        let connection_id = event.connection_id();

        if self.uploads.is_upload(connection_id) {
            self.on_upload_event(event);
            host.request_render();
            return;
        }

        let Some(active) = self.active.as_mut().filter(|active| active.connection_id == connection_id)
        else {
            debug!(connection_id, "ignoring event from inactive connection");
            return;
        };
        active.last_activity = None;

        match event {
            ConnectionEvent::Opened { .. } => debug!(connection_id, "connection opened"),
            ConnectionEvent::Message { event, .. } => self.on_stream_event(event, host),
            ConnectionEvent::Failed { error, .. } => {
                warn!(connection_id, %error, "connection failed");
                if self.take_unsettled() {
                    self.notice(format!("Connection error: {error}"));
                }
            }
            ConnectionEvent::Closed { .. } => {
                if self.take_unsettled() {
                    warn!(connection_id, "connection closed before a terminal event");
                    self.notice("Connection closed before the response finished.");
                }
            }
        }

        host.request_render();
    }

    /// Clears the active submission if it has not seen `complete` yet.
    fn take_unsettled(&mut self) -> bool {
        match self.active {
            Some(active) if active.state == StreamState::Streaming => {
                self.active = None;
                true
            }
            _ => false,
        }
    }

    fn on_stream_event(&mut self, event: StreamEvent, host: &mut dyn HostOps) {
        let Some(active) = self.active else {
            return;
        };

        match event {
            StreamEvent::Chunk { data } => {
                self.accumulator.push(active.id, &data);
            }
            StreamEvent::Complete { id } => {
                if let Some(id) = id {
                    self.conversation_id = Some(id);
                }
                if let Some(active) = self.active.as_mut() {
                    active.state = StreamState::Completed;
                }
                host.close_connection(active.connection_id);
                self.settle_if_drained();
            }
            StreamEvent::Error { message } => {
                self.accumulator.push(active.id, &message);
                self.active = None;
                host.close_connection(active.connection_id);
            }
            StreamEvent::FreeTierLimit => {
                info!(submission = active.id, "free tier limit reached; rolling back");
                self.transcript.truncate(active.transcript_len_before);
                self.accumulator.reset();
                self.active = None;
                self.gate.record_tier_limit();
                self.notice("Free tier limit reached. Upgrade to continue.");
                host.request_upgrade();
                host.close_connection(active.connection_id);
            }
            StreamEvent::Update { completed, total } => {
                debug!(completed, total, "ignoring progress on a chat connection");
            }
        }
    }

    fn on_upload_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened { connection_id } => {
                debug!(connection_id, "upload connection opened");
            }
            ConnectionEvent::Message {
                connection_id,
                event,
            } => match event {
                StreamEvent::Update { completed, total } => {
                    debug!(connection_id, completed, total, "upload progress");
                    self.uploads.record_progress(connection_id, completed, total);
                }
                StreamEvent::Complete { .. } => {
                    if let Some(upload) = self.uploads.finish_upload(connection_id) {
                        info!(connection_id, filing_date = %upload.document.filing_date, "upload complete");
                        self.notice(format!(
                            "Filing {} processed.",
                            upload.document.filing_date
                        ));
                    }
                }
                StreamEvent::Error { message } => {
                    if let Some(upload) = self.uploads.finish_upload(connection_id) {
                        warn!(connection_id, filing_date = %upload.document.filing_date, %message, "upload failed");
                        self.notice(format!(
                            "Processing failed for filing {}: {message}",
                            upload.document.filing_date
                        ));
                    }
                }
                StreamEvent::Chunk { .. } | StreamEvent::FreeTierLimit => {
                    debug!(connection_id, "ignoring chat event on an upload connection");
                }
            },
            ConnectionEvent::Failed {
                connection_id,
                error,
            } => {
                if let Some(upload) = self.uploads.finish_upload(connection_id) {
                    warn!(connection_id, filing_date = %upload.document.filing_date, %error, "upload connection failed");
                    self.notice(format!(
                        "Processing failed for filing {}: {error}",
                        upload.document.filing_date
                    ));
                }
            }
            ConnectionEvent::Closed { connection_id } => {
                if let Some(upload) = self.uploads.finish_upload(connection_id) {
                    warn!(connection_id, filing_date = %upload.document.filing_date, "upload connection closed early");
                    self.notice(format!(
                        "Processing of filing {} stopped before completion.",
                        upload.document.filing_date
                    ));
                }
            }
        }
    }

    /// Advance the reveal animation and the watchdog by one frame.
    pub fn on_frame(&mut self, now: Instant, host: &mut dyn HostOps) {
        let mut changed = false;

        if let Some(commit) = self.accumulator.tick(now) {
            changed |= self.apply_commit(commit);
        }
        changed |= self.settle_if_drained();
        changed |= self.check_watchdog(now, host);

        if changed {
            host.request_render();
        }
    }

    fn apply_commit(&mut self, commit: Commit) -> bool {
        let binding = commit.binding;
        match self.transcript.get_mut(binding.turn_index) {
            Some(turn)
                if turn.role == Role::Assistant && turn.submission == Some(binding.submission) =>
            {
                turn.content.push_str(&commit.text);
                true
            }
            _ => {
                warn!(
                    submission = binding.submission,
                    turn_index = binding.turn_index,
                    "dropping revealed text for a turn that is gone"
                );
                false
            }
        }
    }

    fn settle_if_drained(&mut self) -> bool {
        match self.active {
            Some(active) if active.state == StreamState::Completed && self.accumulator.is_idle() => {
                debug!(submission = active.id, "submission settled");
                self.active = None;
                true
            }
            _ => false,
        }
    }

    fn check_watchdog(&mut self, now: Instant, host: &mut dyn HostOps) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if active.state != StreamState::Streaming {
            return false;
        }

        let Some(last_activity) = active.last_activity else {
            active.last_activity = Some(now);
            return false;
        };
        if now.saturating_duration_since(last_activity) < self.watchdog_timeout {
            return false;
        }

        let active = *active;
        self.active = None;
        warn!(
            connection_id = active.connection_id,
            submission = active.id,
            "no server activity; giving up on submission"
        );
        host.close_connection(active.connection_id);

        let has_content = !self.accumulator.is_idle()
            || self
                .transcript
                .last()
                .is_some_and(|turn| turn.submission == Some(active.id) && !turn.content.is_empty());
        let separator = if has_content { "\n\n" } else { "" };
        self.accumulator.push(
            active.id,
            &format!(
                "{separator}[No response from the server for {} seconds.]",
                self.watchdog_timeout.as_secs()
            ),
        );
        true
    }

    fn notice(&mut self, text: impl Into<String>) {
        self.notices.push(text.into());
    }
}
