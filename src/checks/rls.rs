// 🛡️ Row-level security diagnosis for a table (organizers by default)

use super::organizers::column_line;
use crate::db::{Catalog, OrganizerRow, PolicyInfo};
use crate::report::{or_na, Report};

pub const DEFAULT_TABLE: &str = "organizers";

fn organizer_line(row: &OrganizerRow) -> String {
    format!(
        "{} ({}) - Status: {} - Role: {}",
        or_na(row.name.as_deref()),
        or_na(row.email.as_deref()),
        or_na(row.status.as_deref()),
        or_na(row.role.as_deref())
    )
}

/// Policy block: name (command), then its attributes
pub fn write_policy(report: &mut Report, policy: &PolicyInfo) {
    report.info(format!("🛡️ {} ({})", policy.name, policy.command));
    report.detail(format!("   Permissive: {}", policy.permissive));
    report.detail(format!("   Roles: {{{}}}", policy.roles.join(",")));
    report.detail(format!("   Qual: {}", policy.qual.as_deref().unwrap_or("None")));
    report.detail(format!(
        "   With Check: {}",
        policy.with_check.as_deref().unwrap_or("None")
    ));
    report.blank();
}

pub async fn diagnose(catalog: &dyn Catalog, admin_email: Option<&str>) -> Report {
    let mut report = Report::new("RLS DIAGNOSIS - ORGANIZERS TABLE");

    if let Err(e) = run(catalog, admin_email, &mut report).await {
        report.fail(format!("Error during diagnosis: {}", e));
    }

    report
}

async fn run(
    catalog: &dyn Catalog,
    admin_email: Option<&str>,
    report: &mut Report,
) -> anyhow::Result<()> {
    let table = DEFAULT_TABLE;

    report.section("1️⃣ TABLE EXISTS");
    if !catalog.table_exists(table).await? {
        report.fail(format!("Table {} does not exist!", table));
        return Ok(());
    }
    report.pass(format!("Table {} exists: YES", table));

    report.section("2️⃣ TABLE COLUMNS");
    for column in catalog.columns(table).await? {
        report.detail(format!("📋 {}", column_line(&column)));
    }

    report.section("3️⃣ RLS STATUS");
    match catalog.rls_enabled(table).await? {
        Some(true) => {
            report.pass("RLS enabled: YES");
        }
        Some(false) => {
            report.warn("RLS enabled: NO");
        }
        None => {
            report.info(format!("{} not listed in pg_tables", table));
        }
    }

    report.section("4️⃣ ACTIVE RLS POLICIES");
    let policies = catalog.policies(&[table]).await?;
    if policies.is_empty() {
        report.fail("No RLS policy found!");
    }
    for policy in &policies {
        write_policy(report, policy);
    }

    report.section("5️⃣ TABLE DATA (latest 5 records)");
    match catalog.organizers(5, true).await {
        Ok(rows) => {
            if rows.is_empty() {
                report.info("No records");
            }
            for row in &rows {
                report.detail(format!("👤 {}", organizer_line(row)));
            }
        }
        Err(e) => {
            report.fail(format!("Error fetching data: {}", e));
        }
    }

    if let Some(email) = admin_email {
        report.section(&format!("6️⃣ CHECKING ADMIN {}", email));
        match catalog.organizer_by_email(email).await? {
            Some(row) => {
                report.pass(format!(
                    "Admin found: {} - Status: {} - Role: {}",
                    or_na(row.name.as_deref()),
                    or_na(row.status.as_deref()),
                    or_na(row.role.as_deref())
                ));
            }
            None => {
                report.fail(format!("Admin {} NOT found in the table!", email));
            }
        }
    }

    Ok(())
}
