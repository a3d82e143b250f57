use serde::{Deserialize, Serialize};

/// Filing reference used by chat and upload actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub cik: String,
    pub accession: String,
    #[serde(rename = "primaryDoc")]
    pub primary_doc: String,
}

impl DocumentRef {
    pub fn new(
        cik: impl Into<String>,
        accession: impl Into<String>,
        primary_doc: impl Into<String>,
    ) -> Self {
        Self {
            cik: cik.into(),
            accession: accession.into(),
            primary_doc: primary_doc.into(),
        }
    }

    /// Stable identity of the filing on the server side.
    pub fn document_id(&self) -> String {
        format!("{}_{}_{}", self.cik, self.accession, self.primary_doc)
    }
}

/// Filing reference shape used by section actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRef {
    pub cik: String,
    pub accession_number: String,
    pub primary_document: String,
}

impl From<&DocumentRef> for StockRef {
    fn from(document: &DocumentRef) -> Self {
        Self {
            cik: document.cik.clone(),
            accession_number: document.accession.clone(),
            primary_document: document.primary_doc.clone(),
        }
    }
}

/// Outbound request; one per opened connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    GenerateResponse {
        cik: String,
        accession: String,
        #[serde(rename = "primaryDoc")]
        primary_doc: String,
        prompt: String,
        #[serde(
            rename = "conversationId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        conversation_id: Option<String>,
    },
    GenerateMultiContextResponse {
        stocks: Vec<DocumentRef>,
        prompt: String,
        #[serde(
            rename = "conversationId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        conversation_id: Option<String>,
    },
    #[serde(rename = "analyze_10k_section")]
    Analyze10kSection { stock: StockRef, section: String },
    #[serde(rename = "compare_10k_filings")]
    Compare10kFilings {
        stock1: StockRef,
        stock2: StockRef,
        section: String,
    },
    UploadDocument {
        cik: String,
        accession: String,
        #[serde(rename = "primaryDoc")]
        primary_doc: String,
    },
}

impl Request {
    pub fn generate_response(
        document: DocumentRef,
        prompt: impl Into<String>,
        conversation_id: Option<String>,
    ) -> Self {
        Self::GenerateResponse {
            cik: document.cik,
            accession: document.accession,
            primary_doc: document.primary_doc,
            prompt: prompt.into(),
            conversation_id,
        }
    }

    pub fn upload_document(document: DocumentRef) -> Self {
        Self::UploadDocument {
            cik: document.cik,
            accession: document.accession,
            primary_doc: document.primary_doc,
        }
    }

    /// Wire `action` name.
    pub fn action(&self) -> &'static str {
        match self {
            Self::GenerateResponse { .. } => "generate_response",
            Self::GenerateMultiContextResponse { .. } => "generate_multi_context_response",
            Self::Analyze10kSection { .. } => "analyze_10k_section",
            Self::Compare10kFilings { .. } => "compare_10k_filings",
            Self::UploadDocument { .. } => "upload_document",
        }
    }

    /// Section label for section-targeted actions.
    pub fn section(&self) -> Option<&str> {
        match self {
            Self::Analyze10kSection { section, .. } | Self::Compare10kFilings { section, .. } => {
                Some(section)
            }
            _ => None,
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            Self::GenerateResponse {
                conversation_id, ..
            }
            | Self::GenerateMultiContextResponse {
                conversation_id, ..
            } => conversation_id.as_deref(),
            _ => None,
        }
    }
}
