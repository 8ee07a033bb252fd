use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckerError {
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Network timeout")]
    Timeout,

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API returned status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("Malformed API response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("Response too large ({0} bytes)")]
    ResponseTooLarge(usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Failed to read workbook: {0}")]
    WorkbookRead(#[from] calamine::Error),

    #[error("Failed to write workbook: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Input file must contain '{0}' column")]
    MissingColumn(String),

    #[error("No domains found in the input file.")]
    EmptyInput,

    #[error("Column '{name}' has {actual} values but the table has {expected} rows")]
    ColumnLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheckerError {
    /// Whether the failure happened on the wire (transport, timeout, HTTP
    /// status) rather than while handling a response that did arrive.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            CheckerError::Timeout | CheckerError::HttpError(_) | CheckerError::HttpStatus(_)
        )
    }
}
