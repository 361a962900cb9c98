// 🩺 Diagnostics - one module per check, each producing a Report
// REST checks take a `TableApi`, SQL checks take a `Catalog`.

pub mod connection;
pub mod cpf_conflict;
pub mod env;
pub mod migration;
pub mod n8n;
pub mod organizers;
pub mod patients;
pub mod rls;
pub mod smoke;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt::Display;

use crate::report::{truncate, Report};
use crate::rest::{explain_pg_code, RestError};

/// Error text limit used by the quick setup check
pub const SHORT_ERROR: usize = 80;
/// Error text limit used by the requirements check
pub const LONG_ERROR: usize = 100;

/// Error text, optionally cut to `max` characters
pub fn error_text(err: &impl Display, max: Option<usize>) -> String {
    let text = err.to_string();
    match max {
        Some(max) => truncate(&text, max),
        None => text,
    }
}

/// Details lines for a failed write: kind, code, details, hint, explanation
pub fn describe_rest_error(report: &mut Report, err: &RestError) {
    report.detail(format!("🔍 Error type: {}", err.kind()));
    if let Some(details) = err.details() {
        report.detail(format!("📋 Details: {}", details));
    }
    if let Some(hint) = err.hint() {
        report.detail(format!("💬 Hint: {}", hint));
    }
    if let Some(code) = err.code() {
        report.detail(format!("🔢 Code: {}", code));
        if let Some(explanation) = explain_pg_code(code) {
            report.detail(format!("💡 {}", explanation));
        }
    }
}
