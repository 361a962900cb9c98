// 🔌 Direct connection test - validates that the role/RLS migration landed

use super::rls::write_policy;
use crate::db::Catalog;
use crate::report::Report;

/// Tables whose policies and counts the app depends on
pub const APP_TABLES: [&str; 4] = ["patients", "organizers", "events", "registrations"];

pub async fn test(catalog: &dyn Catalog) -> Report {
    let mut report = Report::new("CONNECTION TEST");
    report.pass("Connection established!");

    // 1. role column
    report.section("Test 1: 'role' column in organizers");
    match catalog.column("organizers", "role").await {
        Ok(Some(column)) => {
            report.pass(format!(
                "Column 'role' found: {} ({}, nullable: {})",
                column.name, column.data_type, column.is_nullable
            ));
        }
        Ok(None) => {
            report.fail("Column 'role' not found - migration not applied");
        }
        Err(e) => {
            report.fail(format!("Error checking column: {}", e));
        }
    }

    // 2. policies
    report.section("Test 2: RLS policies");
    match catalog.policies(&APP_TABLES).await {
        Ok(policies) => {
            report.pass(format!("Found {} RLS policies:", policies.len()));
            for policy in &policies {
                report.detail(format!("- {}.{} ({})", policy.table, policy.name, policy.command));
            }
        }
        Err(e) => {
            report.fail(format!("Error listing policies: {}", e));
        }
    }

    // 3. Edge functions are not visible from SQL
    report.section("Test 3: Edge Functions");
    report.info("Edge Functions must be checked in the project dashboard");

    // 4. counts
    report.section("Test 4: Row counts");
    for table in APP_TABLES {
        match catalog.count_rows(table).await {
            Ok(count) => {
                report.detail(format!("- {}: {} records", table, count));
            }
            Err(e) => {
                report.fail(format!("{}: error counting - {}", table, e));
            }
        }
    }

    report.blank();
    report.pass("Tests finished!");
    report.blank();
    report.info("📋 Next steps:");
    report.detail("1. Check the admin panel in the browser");
    report.detail("2. Test the report export");
    report.detail("3. Confirm login works without a blank screen");

    report
}

/// Verbose policy listing for a single table
pub async fn policies_detail(catalog: &dyn Catalog, table: &str) -> Report {
    let mut report = Report::new(&format!("RLS POLICIES - {}", table));
    match catalog.policies(&[table]).await {
        Ok(policies) if policies.is_empty() => {
            report.warn(format!("No policies on {}", table));
        }
        Ok(policies) => {
            for policy in &policies {
                write_policy(&mut report, policy);
            }
        }
        Err(e) => {
            report.fail(format!("Error listing policies: {}", e));
        }
    }
    report
}

/// Report for a connection that could not be opened
pub fn failed(err: &anyhow::Error) -> Report {
    let mut report = Report::new("CONNECTION TEST");
    report.fail(format!("Connection error: {:#}", err));
    report.blank();
    report.info("💡 Tips:");
    report.detail("1. Check that DATABASE_URL is correct");
    report.detail("2. Confirm your IP is allowed by the database network restrictions");
    report.detail("3. Check that the credentials are correct");
    report
}
