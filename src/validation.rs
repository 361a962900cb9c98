// ✅ Validation results - findings produced by configuration and payload audits

use serde::{Deserialize, Serialize};

use crate::report::{Report, Status};

// ============================================================================
// SEVERITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // The diagnostics cannot run correctly
    Warning,  // Questionable but usable
    Info,     // Valid
}

impl Severity {
    pub fn status(&self) -> Status {
        match self {
            Severity::Critical => Status::Fail,
            Severity::Warning => Status::Warn,
            Severity::Info => Status::Pass,
        }
    }
}

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub rule_name: String,
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationResult {
    pub fn pass(rule_name: &str, field: &str, message: &str) -> Self {
        ValidationResult {
            passed: true,
            rule_name: rule_name.to_string(),
            field: field.to_string(),
            message: message.to_string(),
            severity: Severity::Info,
        }
    }

    pub fn fail(rule_name: &str, field: &str, message: &str, severity: Severity) -> Self {
        ValidationResult {
            passed: false,
            rule_name: rule_name.to_string(),
            field: field.to_string(),
            message: message.to_string(),
            severity,
        }
    }

    pub fn is_critical(&self) -> bool {
        !self.passed && self.severity == Severity::Critical
    }

    /// Append as a status line: `FIELD: message`
    pub fn write_to(&self, report: &mut Report) {
        report.status(
            self.severity.status(),
            format!("{}: {}", self.field, self.message),
        );
    }
}

/// Any critical failure in the batch
pub fn has_critical(results: &[ValidationResult]) -> bool {
    results.iter().any(|r| r.is_critical())
}
