//! Stock and filing selection.

use findiff_api::{DocumentRef, Filing, TickerMatch};
use findiff_provider::DocumentCatalog;

use crate::error::FindiffError;

pub const ANONYMOUS_DOCUMENT_CEILING: usize = 1;
pub const AUTHENTICATED_DOCUMENT_CEILING: usize = 2;

/// Company whose filings are under discussion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stock {
    pub cik: String,
    pub ticker: String,
    pub title: String,
}

impl From<TickerMatch> for Stock {
    fn from(hit: TickerMatch) -> Self {
        Self {
            cik: hit.cik_str,
            ticker: hit.ticker,
            title: hit.title,
        }
    }
}

/// One filing picked for the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedDocument {
    pub filing_date: String,
    pub accession_number: String,
    pub primary_document: String,
}

impl SelectedDocument {
    pub fn new(
        filing_date: impl Into<String>,
        accession_number: impl Into<String>,
        primary_document: impl Into<String>,
    ) -> Self {
        Self {
            filing_date: filing_date.into(),
            accession_number: accession_number.into(),
            primary_document: primary_document.into(),
        }
    }

    /// Year of the filing date, when it starts with one.
    pub fn year(&self) -> Option<u16> {
        self.filing_date.get(..4)?.parse().ok()
    }

    pub fn document_ref(&self, cik: &str) -> DocumentRef {
        DocumentRef::new(cik, &self.accession_number, &self.primary_document)
    }
}

impl From<Filing> for SelectedDocument {
    fn from(filing: Filing) -> Self {
        Self {
            filing_date: filing.filing_date,
            accession_number: filing.accession_number,
            primary_document: filing.primary_document,
        }
    }
}

/// Selection ceiling keyed off authentication, not paid tier.
pub fn document_ceiling(authenticated: bool) -> usize {
    if authenticated {
        AUTHENTICATED_DOCUMENT_CEILING
    } else {
        ANONYMOUS_DOCUMENT_CEILING
    }
}

/// Active filing set: at most two members, unique by filing date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSelection {
    documents: Vec<SelectedDocument>,
}

impl DocumentSelection {
    pub fn add(
        &mut self,
        document: SelectedDocument,
        authenticated: bool,
    ) -> Result<(), FindiffError> {
        if self.contains(&document.filing_date) {
            return Err(FindiffError::DuplicateDocument {
                filing_date: document.filing_date,
            });
        }

        let ceiling = document_ceiling(authenticated);
        if self.documents.len() >= ceiling {
            return Err(FindiffError::SelectionFull { ceiling });
        }

        self.documents.push(document);
        Ok(())
    }

    pub fn remove(&mut self, filing_date: &str) -> Option<SelectedDocument> {
        let index = self
            .documents
            .iter()
            .position(|document| document.filing_date == filing_date)?;
        Some(self.documents.remove(index))
    }

    pub fn contains(&self, filing_date: &str) -> bool {
        self.documents
            .iter()
            .any(|document| document.filing_date == filing_date)
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Members in selection order.
    pub fn documents(&self) -> &[SelectedDocument] {
        &self.documents
    }

    /// Members ordered by filing date, oldest first.
    pub fn sorted_by_filing_date(&self) -> Vec<&SelectedDocument> {
        let mut sorted: Vec<&SelectedDocument> = self.documents.iter().collect();
        sorted.sort_by(|left, right| left.filing_date.cmp(&right.filing_date));
        sorted
    }
}

/// A resolved company together with the filings that can be added for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLookup {
    pub stock: Stock,
    /// Newest first.
    pub filings: Vec<SelectedDocument>,
}

/// Search the catalog and list filings for the best hit.
///
/// An exact ticker match wins over the first search hit.
pub fn resolve_stock(catalog: &dyn DocumentCatalog, query: &str) -> Result<StockLookup, String> {
    let query = query.trim();
    if query.is_empty() {
        return Err("Usage: /stock <ticker or company name>".to_string());
    }

    let hits = catalog.search_tickers(query)?;
    let hit = hits
        .iter()
        .find(|hit| hit.ticker.eq_ignore_ascii_case(query))
        .or_else(|| hits.first())
        .cloned()
        .ok_or_else(|| format!("No company matches '{query}'"))?;

    let stock = Stock::from(hit);
    let mut filings: Vec<SelectedDocument> = catalog
        .available_filings(&stock.cik)?
        .into_iter()
        .map(SelectedDocument::from)
        .collect();
    filings.sort_by(|left, right| right.filing_date.cmp(&left.filing_date));

    Ok(StockLookup { stock, filings })
}

/// Pick a filing by exact filing date, accession number, or year.
pub fn find_filing<'a>(filings: &'a [SelectedDocument], input: &str) -> Option<&'a SelectedDocument> {
    let needle = input.trim();
    if needle.is_empty() {
        return None;
    }

    filings
        .iter()
        .find(|filing| filing.filing_date == needle || filing.accession_number == needle)
        .or_else(|| {
            let year: u16 = needle.parse().ok()?;
            filings.iter().find(|filing| filing.year() == Some(year))
        })
}
