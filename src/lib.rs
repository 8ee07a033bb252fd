//! # OpenTIP Checker
//!
//! Enriches a spreadsheet of domain names with reputation data from the
//! Kaspersky OpenTIP API.
//!
//! ## Features
//!
//! - Reads `.xlsx`/`.xls`/`.ods` workbooks and `.csv` files with a `Domain` column
//! - One paced lookup per domain, no retries, errors recorded per row
//! - Appends `Kaspersky_Zone`, `Kaspersky_Categories` and `API_Status` columns
//! - TLS certificate verification on unless explicitly disabled
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use opentip_checker::{BatchProcessor, Config, OpenTipClient};
//! use std::{path::Path, sync::Arc};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::load()?);
//!     let client = OpenTipClient::new(config.clone(), "my-api-key")?;
//!     let processor = BatchProcessor::new(client, config.show_progress);
//!
//!     let summary = processor.process(Path::new("domains.xlsx"), Path::new("results.xlsx")).await?;
//!     println!("{} lookups succeeded", summary.successful);
//!
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod errors;
pub mod opentip;
pub mod rate_limit;
pub mod table;

// Re-export main types for easy access
pub use batch::{BatchProcessor, BatchSummary};
pub use config::Config;
pub use errors::CheckerError;
pub use opentip::{DomainLookup, OpenTipClient, OpenTipResponse};
pub use table::{CellValue, Table};

/// Name of the input column holding the domains
pub const DOMAIN_COLUMN: &str = "Domain";
pub const ZONE_COLUMN: &str = "Kaspersky_Zone";
pub const CATEGORIES_COLUMN: &str = "Kaspersky_Categories";
pub const STATUS_COLUMN: &str = "API_Status";

pub const STATUS_SUCCESS: &str = "Success";
pub const STATUS_EMPTY_DOMAIN: &str = "Empty domain value";

/// Outcome of looking up one row's domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub zone: String,
    pub categories: String,
    pub status: String,
}

impl QueryResult {
    pub fn success(zone: impl Into<String>, categories: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            categories: categories.into(),
            status: STATUS_SUCCESS.to_string(),
        }
    }

    /// Result for a row whose domain cell is missing or blank
    pub fn invalid() -> Self {
        Self {
            zone: "Invalid".to_string(),
            categories: "Invalid".to_string(),
            status: STATUS_EMPTY_DOMAIN.to_string(),
        }
    }

    pub fn request_failed(details: impl std::fmt::Display) -> Self {
        Self::error(format!("Request failed: {}", details))
    }

    pub fn processing_error(details: impl std::fmt::Display) -> Self {
        Self::error(format!("Processing error: {}", details))
    }

    pub fn from_error(error: &CheckerError) -> Self {
        if error.is_request_failure() {
            Self::request_failed(error)
        } else {
            Self::processing_error(error)
        }
    }

    fn error(status: String) -> Self {
        Self {
            zone: "Error".to_string(),
            categories: "Error".to_string(),
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    pub fn is_invalid(&self) -> bool {
        self.status == STATUS_EMPTY_DOMAIN
    }
}
