//! Side-channel bookkeeping for filings being checked or pushed through
//! server-side processing.
//!
//! Every check and every upload runs on its own connection id. While anything
//! here is in flight, new submissions are held back.

use std::collections::BTreeMap;

use findiff_provider::ConnectionId;

use crate::documents::SelectedDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub completed: u64,
    pub total: u64,
}

impl UploadProgress {
    /// Whole-number percentage, clamped to 0..=100.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let ratio = u128::from(self.completed.min(self.total)) * 100 / u128::from(self.total);
        u8::try_from(ratio).unwrap_or(100)
    }
}

/// A filing whose processed status is being looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCheck {
    pub cik: String,
    pub document: SelectedDocument,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUpload {
    pub connection_id: ConnectionId,
    pub document: SelectedDocument,
    pub progress: Option<UploadProgress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadTracker {
    checks: BTreeMap<ConnectionId, PendingCheck>,
    uploads: BTreeMap<ConnectionId, ActiveUpload>,
}

impl UploadTracker {
    pub fn begin_check(&mut self, check_id: ConnectionId, cik: &str, document: SelectedDocument) {
        self.checks.insert(
            check_id,
            PendingCheck {
                cik: cik.to_string(),
                document,
            },
        );
    }

    pub fn finish_check(&mut self, check_id: ConnectionId) -> Option<PendingCheck> {
        self.checks.remove(&check_id)
    }

    pub fn is_checking(&self, cik: &str, filing_date: &str) -> bool {
        self.checks
            .values()
            .any(|check| check.cik == cik && check.document.filing_date == filing_date)
    }

    /// Checks still running for one company.
    pub fn pending_checks(&self, cik: &str) -> usize {
        self.checks.values().filter(|check| check.cik == cik).count()
    }

    pub fn begin_upload(&mut self, connection_id: ConnectionId, document: SelectedDocument) {
        self.uploads.insert(
            connection_id,
            ActiveUpload {
                connection_id,
                document,
                progress: None,
            },
        );
    }

    pub fn is_upload(&self, connection_id: ConnectionId) -> bool {
        self.uploads.contains_key(&connection_id)
    }

    /// Returns false when the connection is not a tracked upload.
    pub fn record_progress(&mut self, connection_id: ConnectionId, completed: u64, total: u64) -> bool {
        match self.uploads.get_mut(&connection_id) {
            Some(upload) => {
                upload.progress = Some(UploadProgress { completed, total });
                true
            }
            None => false,
        }
    }

    pub fn finish_upload(&mut self, connection_id: ConnectionId) -> Option<ActiveUpload> {
        self.uploads.remove(&connection_id)
    }

    /// Whether a filing is still going through server-side processing.
    pub fn is_processing(&self, accession_number: &str) -> bool {
        self.uploads
            .values()
            .any(|upload| upload.document.accession_number == accession_number)
    }

    /// Progress for a filing, keyed by accession number.
    pub fn progress_for(&self, accession_number: &str) -> Option<UploadProgress> {
        self.uploads
            .values()
            .find(|upload| upload.document.accession_number == accession_number)
            .and_then(|upload| upload.progress)
    }

    pub fn uploads(&self) -> impl Iterator<Item = &ActiveUpload> {
        self.uploads.values()
    }

    /// Any check or upload still running.
    pub fn in_flight(&self) -> bool {
        !self.checks.is_empty() || !self.uploads.is_empty()
    }
}
