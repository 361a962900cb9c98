// 📡 Admin dashboard smoke test - REST root reachable, dashboard tables countable

use crate::report::Report;
use crate::rest::{Query, TableApi};

/// Tables the admin dashboard queries on load
pub const DASHBOARD_TABLES: [&str; 4] = ["patients", "events", "registrations", "event_dates"];

pub async fn run(api: &dyn TableApi) -> Report {
    let mut report = Report::new("ADMIN DASHBOARD SMOKE TEST");

    report.info("📡 Testing REST endpoint...");
    match api.ping().await {
        Ok(status) => {
            report.pass(format!("REST endpoint OK (HTTP {})", status));
        }
        Err(e) => {
            report.fail(format!("Connection error: {}", e));
            report.info("Skipping dashboard queries");
            return report;
        }
    }

    report.section("Dashboard queries");
    for table in DASHBOARD_TABLES {
        match api.select(&Query::from(table).select("id").limit(1).count_exact()).await {
            Ok(result) => {
                report.pass(format!(
                    "Query {} OK ({} rows)",
                    table,
                    result
                        .count
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "?".to_string())
                ));
            }
            Err(e) => {
                report.fail(format!("Query {} failed: {}", table, e));
            }
        }
    }

    report.blank();
    report.info("✅ Debug complete!");
    report
}
