// 👥 Organizers table structure, its link from events and a few sample rows

use crate::db::{Catalog, ColumnInfo};
use crate::report::{or_na, Report};

/// `name (type) - Nullable: YES - Default: None`
pub fn column_line(column: &ColumnInfo) -> String {
    format!(
        "{} ({}) - Nullable: {} - Default: {}",
        column.name,
        column.data_type,
        column.is_nullable,
        column.default.as_deref().unwrap_or("None")
    )
}

pub async fn structure(catalog: &dyn Catalog) -> Report {
    let mut report = Report::new("CHECKING ORGANIZERS TABLE STRUCTURE");

    if let Err(e) = run(catalog, &mut report).await {
        report.fail(format!("Error: {}", e));
    }

    report
}

async fn run(catalog: &dyn Catalog, report: &mut Report) -> anyhow::Result<()> {
    report.section("📋 ORGANIZERS COLUMNS");
    let columns = catalog.columns("organizers").await?;
    if columns.is_empty() {
        report.warn("No columns found - table organizers may not exist");
    }
    for column in &columns {
        report.detail(format!("• {}", column_line(column)));
    }

    report.section("📅 EVENTS TABLE");
    let events_exists = catalog.table_exists("events").await?;
    if events_exists {
        report.pass("Table events exists: YES");

        let linked = catalog.columns_like("events", "%organizer%").await?;
        report.info("Organizer-related columns in events:");
        if linked.is_empty() {
            report.warn("No organizer column in events");
        }
        for column in &linked {
            report.detail(format!("• {} ({})", column.name, column.data_type));
        }
    } else {
        report.fail("Table events exists: NO");
    }

    report.section("👥 SAMPLE DATA (first 3)");
    let rows = catalog.organizers(3, false).await?;
    if rows.is_empty() {
        report.info("No organizers found");
    }
    for row in &rows {
        report.detail(format!(
            "• ID: {} | Name: {} | Email: {}",
            row.id,
            or_na(row.name.as_deref()),
            or_na(row.email.as_deref())
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::{column, organizer, FakeCatalog};

    fn catalog() -> FakeCatalog {
        FakeCatalog::new()
            .table(
                "organizers",
                vec![column("id", "uuid"), column("name", "text"), column("email", "text")],
                2,
                true,
            )
            .table(
                "events",
                vec![column("id", "uuid"), column("organizer_id", "uuid"), column("title", "text")],
                5,
                true,
            )
            .organizer(organizer("Ana", "ana@example.com", None))
            .organizer(organizer("Bruno", "bruno@example.com", Some("admin")))
    }

    #[test]
    fn test_column_line() {
        let mut col = column("status", "text");
        col.default = Some("'active'::text".to_string());
        assert_eq!(
            column_line(&col),
            "status (text) - Nullable: YES - Default: 'active'::text"
        );
        assert!(column_line(&column("id", "uuid")).ends_with("Default: None"));
    }

    #[tokio::test]
    async fn test_structure_lists_columns_and_links() {
        let report = structure(&catalog()).await;
        let text = report.render();

        assert!(!report.has_failures(), "{}", text);
        assert!(text.contains("• email (text) - Nullable: YES - Default: None"));
        assert!(report.contains("Table events exists: YES"));
        assert!(text.contains("• organizer_id (uuid)"));
        assert!(text.contains("• ID: id-bruno | Name: Bruno | Email: bruno@example.com"));
    }

    #[tokio::test]
    async fn test_structure_without_events() {
        let catalog = FakeCatalog::new()
            .table("organizers", vec![column("id", "uuid")], 0, false);
        let report = structure(&catalog).await;

        assert!(report.contains("Table events exists: NO"));
        assert!(report.contains("No organizers found"));
    }

    #[tokio::test]
    async fn test_structure_reports_query_error() {
        // organizers() fails when the table is missing
        let report = structure(&FakeCatalog::new()).await;

        assert!(report.contains("No columns found"));
        assert!(report.contains("Error: relation \"public.organizers\" does not exist"));
    }
}
