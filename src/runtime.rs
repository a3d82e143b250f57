use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use findiff_api::{DocumentRef, Request};
use findiff_provider::{
    CancelSignal, ConnectionEvent, ConnectionId, ConnectionProvider, DocumentCatalog, OpenRequest,
    SessionProvider,
};
use tracing::{debug, warn};

use crate::app::{App, HostOps};
use crate::documents::{resolve_stock, StockLookup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    Connection(ConnectionEvent),
    DocumentChecked {
        check_id: ConnectionId,
        result: Result<bool, String>,
    },
    StockResolved {
        lookup_id: ConnectionId,
        result: Result<StockLookup, String>,
    },
}

impl RuntimeEvent {
    /// Worker whose job ends with this event, if any.
    fn finished_worker(&self) -> Option<ConnectionId> {
        match self {
            Self::Connection(event) if event.is_terminal() => Some(event.connection_id()),
            Self::Connection(_) => None,
            Self::DocumentChecked { check_id, .. } => Some(*check_id),
            Self::StockResolved { lookup_id, .. } => Some(*lookup_id),
        }
    }
}

/// Prompts the shell surfaces outside the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    SignInRequested,
    UpgradeRequested,
}

struct Worker {
    cancel: CancelSignal,
    join_handle: Option<JoinHandle<()>>,
}

/// Owns worker threads and the event queue between them and `App`.
///
/// Workers only enqueue. Events are applied to `App` on the thread that calls
/// [`RuntimeController::run_frame`], in the order they were enqueued.
pub struct RuntimeController {
    app: Arc<Mutex<App>>,
    pending_events: Mutex<VecDeque<RuntimeEvent>>,
    next_id: AtomicU64,
    workers: Mutex<HashMap<ConnectionId, Worker>>,
    signals: Mutex<Vec<HostSignal>>,
    render_requested: AtomicBool,
    stop_requested: AtomicBool,
    connections: Arc<dyn ConnectionProvider>,
    catalog: Arc<dyn DocumentCatalog>,
    session: Arc<dyn SessionProvider>,
}

impl RuntimeController {
    pub fn new(
        app: Arc<Mutex<App>>,
        connections: Arc<dyn ConnectionProvider>,
        catalog: Arc<dyn DocumentCatalog>,
        session: Arc<dyn SessionProvider>,
    ) -> Arc<Self> {
        Arc::new(Self {
            app,
            pending_events: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            workers: Mutex::new(HashMap::new()),
            signals: Mutex::new(Vec::new()),
            render_requested: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            connections,
            catalog,
            session,
        })
    }

    pub fn app(&self) -> Arc<Mutex<App>> {
        Arc::clone(&self.app)
    }

    /// Apply queued events, then advance the app by one frame.
    ///
    /// Returns how many queued events were applied.
    pub fn run_frame(self: &Arc<Self>, now: Instant) -> usize {
        let drained = self.drain_pending_events();
        let mut host = Arc::clone(self);
        lock_unpoisoned(&self.app).on_frame(now, &mut host);
        drained
    }

    /// Apply queued events without ticking the frame clock.
    pub fn flush_pending_events(self: &Arc<Self>) -> usize {
        let drained = self.drain_pending_events();
        if drained > 0 {
            self.render_requested.store(true, Ordering::SeqCst);
        }
        drained
    }

    pub fn take_render_request(&self) -> bool {
        self.render_requested.swap(false, Ordering::SeqCst)
    }

    pub fn take_signals(&self) -> Vec<HostSignal> {
        std::mem::take(&mut *lock_unpoisoned(&self.signals))
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// No worker running and nothing queued.
    pub fn is_idle(&self) -> bool {
        lock_unpoisoned(&self.workers).is_empty() && lock_unpoisoned(&self.pending_events).is_empty()
    }

    /// Signal every worker to stop. Workers still finish on their own threads.
    pub fn shutdown(&self) {
        for worker in lock_unpoisoned(&self.workers).values() {
            worker.cancel.store(true, Ordering::SeqCst);
        }
    }

    fn allocate_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn resolve_id_token(&self) -> Option<String> {
        match self.session.id_token() {
            Ok(id_token) => id_token,
            Err(error) => {
                warn!(%error, "credential resolution failed; continuing without a credential");
                None
            }
        }
    }

    fn spawn_worker<F>(self: &Arc<Self>, id: ConnectionId, kind: &str, job: F) -> Result<(), String>
    where
        F: FnOnce(Arc<Self>, CancelSignal) + Send + 'static,
    {
        let cancel: CancelSignal = Arc::new(AtomicBool::new(false));
        let controller = Arc::clone(self);
        let worker_cancel = Arc::clone(&cancel);

        let mut workers = lock_unpoisoned(&self.workers);
        let join_handle = thread::Builder::new()
            .name(format!("findiff-{kind}-{id}"))
            .spawn(move || job(controller, worker_cancel))
            .map_err(|error| format!("Failed to spawn {kind} worker: {error}"))?;
        workers.insert(
            id,
            Worker {
                cancel,
                join_handle: Some(join_handle),
            },
        );
        Ok(())
    }

    fn open_connection_internal(self: &Arc<Self>, request: Request) -> Result<ConnectionId, String> {
        let connection_id = self.allocate_id();
        let open = OpenRequest {
            connection_id,
            request,
            id_token: self.resolve_id_token(),
        };
        self.spawn_worker(connection_id, "conn", move |controller, cancel| {
            controller.run_connection(open, cancel);
        })?;
        Ok(connection_id)
    }

    fn run_connection(self: Arc<Self>, open: OpenRequest, cancel: CancelSignal) {
        let connection_id = open.connection_id;
        let terminal_emitted = Arc::new(AtomicBool::new(false));
        let terminal_emitted_for_emit = Arc::clone(&terminal_emitted);
        let controller = Arc::clone(&self);
        let provider = Arc::clone(&self.connections);

        let mut emit = move |event: ConnectionEvent| {
            if event.is_terminal() {
                terminal_emitted_for_emit.store(true, Ordering::SeqCst);
            }
            controller.enqueue_event(RuntimeEvent::Connection(event));
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| provider.open(open, cancel, &mut emit)));

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(error),
            Err(_) => Some("Connection provider panicked".to_string()),
        };

        if terminal_emitted.load(Ordering::SeqCst) {
            return;
        }

        let error = failure
            .unwrap_or_else(|| "Connection provider exited without a terminal event".to_string());
        emit(ConnectionEvent::Failed {
            connection_id,
            error,
        });
    }

    fn check_document_internal(self: &Arc<Self>, document: DocumentRef) -> Result<ConnectionId, String> {
        let check_id = self.allocate_id();
        let id_token = self.resolve_id_token();
        self.spawn_worker(check_id, "check", move |controller, _cancel| {
            let catalog = Arc::clone(&controller.catalog);
            let result = catch_unwind(AssertUnwindSafe(|| {
                catalog.is_document_processed(&document, id_token.as_deref())
            }))
            .unwrap_or_else(|_| Err("Document catalog panicked".to_string()));
            controller.enqueue_event(RuntimeEvent::DocumentChecked { check_id, result });
        })?;
        Ok(check_id)
    }

    fn lookup_stock_internal(self: &Arc<Self>, query: String) -> Result<(), String> {
        let lookup_id = self.allocate_id();
        self.spawn_worker(lookup_id, "lookup", move |controller, _cancel| {
            let catalog = Arc::clone(&controller.catalog);
            let result = catch_unwind(AssertUnwindSafe(|| resolve_stock(catalog.as_ref(), &query)))
                .unwrap_or_else(|_| Err("Document catalog panicked".to_string()));
            controller.enqueue_event(RuntimeEvent::StockResolved { lookup_id, result });
        })
    }

    fn enqueue_event(&self, event: RuntimeEvent) {
        lock_unpoisoned(&self.pending_events).push_back(event);
    }

    fn drain_pending_events(self: &Arc<Self>) -> usize {
        let mut drained = 0usize;

        loop {
            let event = {
                let mut pending_events = lock_unpoisoned(&self.pending_events);
                pending_events.pop_front()
            };

            match event {
                Some(event) => {
                    self.apply_event(event);
                    drained += 1;
                }
                None => break,
            }
        }

        drained
    }

    fn apply_event(self: &Arc<Self>, event: RuntimeEvent) {
        let finished = event.finished_worker();
        let mut host = Arc::clone(self);

        {
            let mut app = lock_unpoisoned(&self.app);
            match event {
                RuntimeEvent::Connection(event) => app.on_connection_event(event, &mut host),
                RuntimeEvent::DocumentChecked { check_id, result } => {
                    app.on_document_checked(check_id, result, &mut host);
                }
                RuntimeEvent::StockResolved { result, .. } => {
                    app.on_stock_resolved(result, &mut host);
                }
            }
        }

        if let Some(id) = finished {
            self.reap_worker(id);
        }
    }

    fn reap_worker(&self, id: ConnectionId) {
        let Some(mut worker) = lock_unpoisoned(&self.workers).remove(&id) else {
            return;
        };

        if let Some(join_handle) = worker.join_handle.take() {
            let is_current_thread = join_handle.thread().id() == thread::current().id();
            if !is_current_thread && join_handle.is_finished() {
                let _ = join_handle.join();
            }
        }
        debug!(id, "worker finished");
    }

    fn close_connection_internal(&self, connection_id: ConnectionId) {
        if let Some(worker) = lock_unpoisoned(&self.workers).get(&connection_id) {
            worker.cancel.store(true, Ordering::SeqCst);
        }
    }
}

impl HostOps for Arc<RuntimeController> {
    fn open_connection(&mut self, request: Request) -> Result<ConnectionId, String> {
        self.open_connection_internal(request)
    }

    fn close_connection(&mut self, connection_id: ConnectionId) {
        self.close_connection_internal(connection_id);
    }

    fn check_document(&mut self, document: DocumentRef) -> Result<ConnectionId, String> {
        self.check_document_internal(document)
    }

    fn lookup_stock(&mut self, query: &str) -> Result<(), String> {
        self.lookup_stock_internal(query.to_string())
    }

    fn request_sign_in(&mut self) {
        lock_unpoisoned(&self.signals).push(HostSignal::SignInRequested);
    }

    fn request_upgrade(&mut self) {
        lock_unpoisoned(&self.signals).push(HostSignal::UpgradeRequested);
    }

    fn request_render(&mut self) {
        self.render_requested.store(true, Ordering::SeqCst);
    }

    fn request_stop(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
