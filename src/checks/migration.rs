// 🚦 Migration pre-check for registrations
// Safe to proceed only when the table has data, the new columns are absent
// and nothing failed along the way. Recent activity only changes the advice.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::report::Report;
use crate::rest::{Query, TableApi};

pub const TABLE: &str = "registrations";

/// Columns the pending migration adds
pub const DEFAULT_NEW_COLUMNS: &[&str] = &["attendance_confirmed"];

/// Window for "recent" registrations
pub const RECENT_HOURS: i64 = 24;

// ============================================================================
// VERDICT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Safe, and the table was quiet in the recent window
    Safe,
    /// Safe, but registrations are arriving; prefer a low-activity period
    SafeWithCaution { recent: i64 },
    /// Do not apply
    Blocked(String),
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        !matches!(self, Verdict::Blocked(_))
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Facts gathered from the database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationFacts {
    pub has_rows: bool,
    pub total: i64,
    pub recent: i64,
    /// New columns that already exist
    pub existing_columns: Vec<String>,
}

pub fn decide(facts: &MigrationFacts) -> Verdict {
    if !facts.has_rows {
        return Verdict::Blocked(format!("Table {} is empty or does not exist", TABLE));
    }
    if !facts.existing_columns.is_empty() {
        return Verdict::Blocked(format!(
            "Column(s) already exist: {}",
            facts.existing_columns.join(", ")
        ));
    }
    if facts.recent > 0 {
        Verdict::SafeWithCaution {
            recent: facts.recent,
        }
    } else {
        Verdict::Safe
    }
}

/// Cutoff timestamp for the recent window, RFC 3339 in UTC
pub fn recent_cutoff(now: DateTime<Utc>) -> String {
    (now - Duration::hours(RECENT_HOURS)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ============================================================================
// CHECK
// ============================================================================

/// Report when URL/key are not configured
pub fn missing_config(message: &str) -> (Report, Verdict) {
    let mut report = Report::new("Validating registrations table structure...");
    report.fail(message.to_string());
    report.detail("Configure the environment variables before running");
    (report, Verdict::Blocked(message.to_string()))
}

pub async fn validate(
    api: &dyn TableApi,
    new_columns: &[String],
    now: DateTime<Utc>,
) -> (Report, Verdict) {
    let mut report = Report::new("Validating registrations table structure...");

    match gather(api, new_columns, now, &mut report).await {
        Ok(facts) => {
            let verdict = decide(&facts);
            write_summary(&mut report, &facts, &verdict);
            (report, verdict)
        }
        Err(message) => {
            report.fail(format!("Error validating migration: {}", message));
            (report, Verdict::Blocked(message))
        }
    }
}

/// Collect facts; Err aborts the validation with the given message
async fn gather(
    api: &dyn TableApi,
    new_columns: &[String],
    now: DateTime<Utc>,
    report: &mut Report,
) -> Result<MigrationFacts, String> {
    let mut facts = MigrationFacts::default();

    let sample = api
        .select(&Query::from(TABLE).select("id").limit(1))
        .await
        .map_err(|e| e.to_string())?;
    if sample.is_empty() {
        report.warn(format!("Table {} is empty or does not exist", TABLE));
        return Ok(facts);
    }
    facts.has_rows = true;
    report.pass(format!("Table {} found", TABLE));

    let total = api
        .select(&Query::from(TABLE).select("id").count_exact())
        .await
        .map_err(|e| e.to_string())?;
    facts.total = total.count.unwrap_or(total.data.len() as i64);
    report.info(format!("📊 Total records: {}", facts.total));

    let cutoff = recent_cutoff(now);
    tracing::debug!(%cutoff, "counting recent registrations");
    let recent = api
        .select(
            &Query::from(TABLE)
                .select("id")
                .gte("created_at", &cutoff)
                .count_exact(),
        )
        .await
        .map_err(|e| e.to_string())?;
    facts.recent = recent.count.unwrap_or(recent.data.len() as i64);
    report.info(format!("📈 Records in the last {}h: {}", RECENT_HOURS, facts.recent));
    if facts.recent > 0 {
        report.warn("WARNING: there are recent records. Apply the migration with care!");
    }

    for column in new_columns {
        match api
            .select(&Query::from(TABLE).select(column).limit(1))
            .await
        {
            Ok(_) => {
                report.warn(format!("Column '{}' already exists in the table", column));
                facts.existing_columns.push(column.clone());
            }
            Err(e) if e.is_undefined_column() => {
                report.pass(format!("Column '{}' does not exist yet", column));
            }
            // Only a missing-column error proves absence
            Err(e) => {
                return Err(format!("could not probe column '{}': {}", column, e));
            }
        }
    }

    Ok(facts)
}

fn write_summary(report: &mut Report, facts: &MigrationFacts, verdict: &Verdict) {
    report.blank();
    report.info("🎯 VALIDATION SUMMARY:");
    report.detail(format!(
        "- Table {}: {}",
        TABLE,
        if facts.has_rows { "✅ Exists" } else { "❌ Empty or missing" }
    ));
    if facts.has_rows {
        report.detail(format!("- Total records: {}", facts.total));
        report.detail(format!("- Recent records: {}", facts.recent));
        report.detail(format!(
            "- New columns: {}",
            if facts.existing_columns.is_empty() {
                "✅ Do not exist yet".to_string()
            } else {
                format!("❌ Already present ({})", facts.existing_columns.join(", "))
            }
        ));
    }

    report.blank();
    match verdict {
        Verdict::Safe => {
            report.pass("SAFE: migration can be applied");
        }
        Verdict::SafeWithCaution { .. } => {
            report.warn("RECOMMENDATION: wait for a period of lower activity to apply the migration");
        }
        Verdict::Blocked(reason) => {
            report.fail(format!("Migration should NOT be applied: {}", reason));
        }
    }
}
