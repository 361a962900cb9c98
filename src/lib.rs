// Enxergar Diagnostics - Core Library
// Exposes the checks and clients for use in the CLI and in tests

pub mod config;
pub mod logging;
pub mod report;     // Console report model
pub mod validation; // Findings with severities
pub mod cpf;        // CPF cleaning/masking/validation
pub mod phone;      // WhatsApp phone normalization
pub mod rest;       // REST/RPC client
pub mod db;         // Direct SQL catalog queries
pub mod checks;     // One module per diagnostic

// Re-export commonly used types
pub use config::Config;
pub use report::{Report, Status, truncate};
pub use validation::{Severity, ValidationResult};
pub use rest::{
    ApiResponse, Query, RestClient, RestError, TableApi,
    explain_pg_code,
};
pub use db::{Catalog, ColumnInfo, OrganizerRow, PolicyInfo};
#[cfg(feature = "postgres")]
pub use db::PgCatalog;
pub use checks::migration::Verdict;
pub use checks::n8n::WebhookPayload;
pub use checks::patients::PatientOptions;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
