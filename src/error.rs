use findiff_provider::ProviderInitError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FindiffError {
    #[error("filing dated {filing_date} is already selected")]
    DuplicateDocument { filing_date: String },

    #[error("at most {ceiling} filing(s) can be selected in this session")]
    SelectionFull { ceiling: usize },

    #[error("select a stock first")]
    NoStock,

    #[error("unknown 10-K section '{0}'")]
    UnknownSection(String),

    #[error("no filing matches '{0}'")]
    UnknownFiling(String),

    #[error("invalid value for {key}: {value}")]
    InvalidConfig { key: &'static str, value: String },

    #[error("unsupported provider '{0}'; available providers: mock, ws")]
    UnsupportedProvider(String),

    #[error("provider initialization failed: {0}")]
    Provider(#[from] ProviderInitError),
}
