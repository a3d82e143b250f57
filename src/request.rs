//! Maps the current selection plus user intent onto exactly one outbound request.

use findiff_api::{Request, StockRef};

use crate::documents::{DocumentSelection, SelectedDocument, Stock};
use crate::sections::Section;

/// Freeform chat over the selected filings.
///
/// `None` when nothing is selected; that submission is a no-op. Two filings are
/// sent oldest first. A blank conversation id starts a fresh thread.
pub fn chat_request(
    stock: &Stock,
    selection: &DocumentSelection,
    prompt: &str,
    conversation_id: Option<&str>,
) -> Option<Request> {
    let conversation_id = conversation_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string);

    match selection.sorted_by_filing_date().as_slice() {
        [] => None,
        [document] => Some(Request::generate_response(
            document.document_ref(&stock.cik),
            prompt,
            conversation_id,
        )),
        documents => Some(Request::GenerateMultiContextResponse {
            stocks: documents
                .iter()
                .map(|document| document.document_ref(&stock.cik))
                .collect(),
            prompt: prompt.to_string(),
            conversation_id,
        }),
    }
}

/// View one section (one filing) or compare it across two filings.
pub fn section_request(
    stock: &Stock,
    selection: &DocumentSelection,
    section: &Section,
) -> Option<Request> {
    match selection.sorted_by_filing_date().as_slice() {
        [] => None,
        [document] => Some(Request::Analyze10kSection {
            stock: stock_ref(stock, document),
            section: section.key.to_string(),
        }),
        [older, newer, ..] => Some(Request::Compare10kFilings {
            stock1: stock_ref(stock, older),
            stock2: stock_ref(stock, newer),
            section: section.key.to_string(),
        }),
    }
}

pub fn upload_request(stock: &Stock, document: &SelectedDocument) -> Request {
    Request::upload_document(document.document_ref(&stock.cik))
}

fn stock_ref(stock: &Stock, document: &SelectedDocument) -> StockRef {
    StockRef::from(&document.document_ref(&stock.cik))
}
