// 🔔 Notification workflow readiness
// The registration webhook needs the notifications table, the details RPC,
// the delivery fields and a registration → patient → event join.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{error_text, LONG_ERROR, SHORT_ERROR};
use crate::phone;
use crate::report::Report;
use crate::rest::{field_text, row_columns, ApiResponse, Query, RestError, TableApi};

pub const NOTIFICATIONS_TABLE: &str = "registration_notifications";
pub const DETAILS_FUNCTION: &str = "get_registration_details";
pub const CORE_TABLES: [&str; 4] = ["patients", "registrations", "events", "event_dates"];
pub const DELIVERY_FIELDS: [&str; 2] = ["delivery_date", "delivery_status"];

/// Registration joined with its patient and event, as the webhook reads it
pub const REGISTRATION_EMBED: &str = "
    id,
    status,
    created_at,
    patients (
        nome,
        email,
        telefone,
        cpf
    ),
    event_dates (
        date,
        start_time,
        end_time,
        events (
            title,
            location,
            address
        )
    )
";

// ============================================================================
// WEBHOOK PAYLOAD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub registration_id: String,
    pub patient_name: String,
    pub phone: String,
    /// `phone` normalized to 55DDDNNNNNNNNN
    pub phone_international: String,
    pub date: String,
    pub start_time: String,
    pub event_title: String,
    pub event_location: String,
}

/// Embedded resource: object for to-one joins, first element for to-many
fn embedded<'a>(row: &'a Value, key: &str) -> Option<&'a Value> {
    match row.get(key)? {
        Value::Array(items) => items.first(),
        Value::Object(_) => row.get(key),
        _ => None,
    }
}

impl WebhookPayload {
    /// Build from a row selected with `REGISTRATION_EMBED`.
    /// Err lists every missing path.
    pub fn from_registration(row: &Value) -> Result<Self, Vec<String>> {
        let patient = embedded(row, "patients");
        let event_date = embedded(row, "event_dates");
        let event = event_date.and_then(|d| embedded(d, "events"));

        let mut missing = Vec::new();
        let mut take = |source: Option<&Value>, path: &str, field: &str| -> String {
            match source.and_then(|v| field_text(v, field)) {
                Some(text) => text,
                None => {
                    missing.push(path.to_string());
                    String::new()
                }
            }
        };

        let registration_id = take(Some(row), "id", "id");
        let patient_name = take(patient, "patients.nome", "nome");
        let phone = take(patient, "patients.telefone", "telefone");
        let date = take(event_date, "event_dates.date", "date");
        let start_time = take(event_date, "event_dates.start_time", "start_time");
        let event_title = take(event, "event_dates.events.title", "title");
        let event_location = take(event, "event_dates.events.location", "location");

        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(WebhookPayload {
            registration_id,
            phone_international: phone::to_international(&phone),
            patient_name,
            phone,
            date,
            start_time,
            event_title,
            event_location,
        })
    }
}

// ============================================================================
// CHECKLIST
// ============================================================================

/// Requirement outcomes: Some(true) present, Some(false) missing, None not verified
#[derive(Debug, Default)]
pub struct Checklist {
    pub items: Vec<(String, Option<bool>)>,
}

impl Checklist {
    pub fn record(&mut self, name: impl Into<String>, outcome: Option<bool>) {
        self.items.push((name.into(), outcome));
    }

    pub fn outcome(&self, name: &str) -> Option<bool> {
        self.items
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, o)| *o)
    }

    pub fn write_to(&self, report: &mut Report) {
        for (name, outcome) in &self.items {
            match outcome {
                Some(true) => report.pass(format!("{} - OK", name)),
                Some(false) => report.fail(format!("{} - MISSING", name)),
                None => report.info(format!("{} - not verified", name)),
            };
        }
    }
}

// ============================================================================
// SHARED STEPS
// ============================================================================

async fn sample_registration_id(api: &dyn TableApi) -> Result<Option<Value>, RestError> {
    let sample = api
        .select(&Query::from("registrations").select("id").limit(1))
        .await?;
    Ok(sample.first().and_then(|row| row.get("id")).cloned())
}

async fn call_details(api: &dyn TableApi, registration_id: &Value) -> Result<ApiResponse, RestError> {
    api.rpc(DETAILS_FUNCTION, &json!({ "reg_id": registration_id }))
        .await
}

/// Presence of each delivery field; None when registrations has no rows to inspect
async fn delivery_fields(api: &dyn TableApi) -> Result<Option<Vec<(&'static str, bool)>>, RestError> {
    let sample = api
        .select(&Query::from("registrations").limit(1))
        .await?;
    if sample.is_empty() {
        return Ok(None);
    }
    let columns = sample.columns();
    Ok(Some(
        DELIVERY_FIELDS
            .iter()
            .map(|field| (*field, columns.iter().any(|c| c == field)))
            .collect(),
    ))
}

/// Call the details function with a sampled id; None when there is nothing to sample
async fn probe_details(api: &dyn TableApi) -> Result<Option<ApiResponse>, RestError> {
    let Some(id) = sample_registration_id(api).await? else {
        return Ok(None);
    };
    call_details(api, &id).await.map(Some)
}

fn id_text(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// QUICK SETUP CHECK
// ============================================================================

pub async fn setup(api: &dyn TableApi) -> Report {
    let mut report = Report::new("Checking notification workflow setup...");

    // 1. Notifications table
    match api
        .select(&Query::from(NOTIFICATIONS_TABLE).limit(1))
        .await
    {
        Ok(result) => {
            report.pass(format!("Table {} exists", NOTIFICATIONS_TABLE));
            if !result.is_empty() {
                report.detail(format!("Columns: {:?}", result.columns()));
            }
        }
        Err(e) => {
            report.fail(format!(
                "{}: {}",
                NOTIFICATIONS_TABLE,
                error_text(&e, Some(SHORT_ERROR))
            ));
        }
    }

    // 2. Details function
    match probe_details(api).await {
        Ok(Some(result)) => {
            report.pass(format!("Function {} exists", DETAILS_FUNCTION));
            match result.first() {
                Some(row) if row.is_object() => {
                    report.detail(format!("Returns: {:?}", row_columns(row)));
                }
                Some(value) => {
                    report.detail(format!("Returns: {}", value));
                }
                None => {
                    report.detail("Returns: empty data");
                }
            }
        }
        Ok(None) => {
            report.warn(format!(
                "{}: no registration available to test with",
                DETAILS_FUNCTION
            ));
        }
        Err(e) => {
            report.fail(format!(
                "{}: {}",
                DETAILS_FUNCTION,
                error_text(&e, Some(SHORT_ERROR))
            ));
        }
    }

    // 3. Delivery fields
    match delivery_fields(api).await {
        Ok(Some(fields)) => {
            for (field, present) in fields {
                if present {
                    report.pass(format!("Field {} exists", field));
                } else {
                    report.fail(format!("Field {} does NOT exist", field));
                }
            }
        }
        Ok(None) => {
            report.warn("registrations is empty - delivery fields not verified");
        }
        Err(e) => {
            report.fail(format!(
                "Error checking fields: {}",
                error_text(&e, Some(SHORT_ERROR))
            ));
        }
    }

    report.blank();
    report.info("🎯 Verification complete!");
    report
}

// ============================================================================
// FULL REQUIREMENTS CHECK
// ============================================================================

pub async fn requirements(api: &dyn TableApi) -> Report {
    let mut report = Report::with_width("Checking notification integration requirements...", 70);
    let mut checklist = Checklist::default();

    // 1. Core tables
    report.section("CORE TABLES");
    for table in CORE_TABLES {
        let counted = api
            .select(&Query::from(table).count_exact())
            .await;
        match counted {
            Ok(result) => {
                report.pass(format!(
                    "Table '{}': {} records",
                    table,
                    result.count.unwrap_or(result.data.len() as i64)
                ));
                checklist.record(table, Some(true));

                if let Ok(sample) = api.select(&Query::from(table).limit(1)).await {
                    if !sample.is_empty() {
                        report.detail(format!("📋 Columns: {}", sample.columns().join(", ")));
                    }
                }
            }
            Err(e) => {
                report.fail(format!("Table '{}': {}", table, error_text(&e, Some(LONG_ERROR))));
                checklist.record(table, Some(false));
            }
        }
    }

    // 2. Notifications table
    report.section("REGISTRATION_NOTIFICATIONS TABLE");
    match api
        .select(&Query::from(NOTIFICATIONS_TABLE).count_exact())
        .await
    {
        Ok(result) => {
            report.pass(format!(
                "Table '{}': {} records",
                NOTIFICATIONS_TABLE,
                result.count.unwrap_or(result.data.len() as i64)
            ));
            if result.is_empty() {
                report.detail("📊 Table empty - columns not visible through the API");
            } else {
                report.detail(format!("📋 Columns: {}", result.columns().join(", ")));
            }
            checklist.record(NOTIFICATIONS_TABLE, Some(true));
        }
        Err(e) => {
            report.fail(format!(
                "Table '{}': {}",
                NOTIFICATIONS_TABLE,
                error_text(&e, Some(LONG_ERROR))
            ));
            report.detail("⚠️  Table may not exist - needs to be created");
            checklist.record(NOTIFICATIONS_TABLE, Some(false));
        }
    }

    // 3. Details function
    report.section("GET_REGISTRATION_DETAILS FUNCTION");
    let function_name = format!("{}()", DETAILS_FUNCTION);
    match sample_registration_id(api).await {
        Ok(Some(id)) => {
            report.detail(format!("🧪 Testing with registration_id: {}", id_text(&id)));
            match call_details(api, &id).await {
                Ok(result) if !result.is_empty() => {
                    report.pass(format!("Function '{}' exists and works", DETAILS_FUNCTION));
                    report.detail(format!("📊 Returned: {}", Value::Array(result.data)));
                    checklist.record(&function_name, Some(true));
                }
                Ok(_) => {
                    report.warn("Function exists but returned empty data");
                    checklist.record(&function_name, Some(true));
                }
                Err(e) => {
                    report.fail(format!(
                        "Function '{}': {}",
                        DETAILS_FUNCTION,
                        error_text(&e, Some(LONG_ERROR))
                    ));
                    report.detail("⚠️  Function may not exist - needs to be created");
                    checklist.record(&function_name, Some(false));
                }
            }
        }
        Ok(None) => {
            report.warn("No registration found to test with");
            checklist.record(&function_name, None);
        }
        Err(e) => {
            report.fail(format!(
                "Function '{}': {}",
                DETAILS_FUNCTION,
                error_text(&e, Some(LONG_ERROR))
            ));
            checklist.record(&function_name, None);
        }
    }

    // 4. Join the webhook reads
    report.section("FULL FLOW TEST");
    report.info("🧪 Simulating the webhook data flow...");
    match api
        .select(&Query::from("registrations").select(REGISTRATION_EMBED).limit(1))
        .await
    {
        Ok(result) => match result.first() {
            Some(row) => match WebhookPayload::from_registration(row) {
                Ok(payload) => {
                    report.pass("Full data query works");
                    report.detail("📊 Example of available data:");
                    report.detail(format!("- Patient: {}", payload.patient_name));
                    report.detail(format!("- Phone: {}", payload.phone));
                    report.detail(format!("- Event: {}", payload.event_title));
                    report.detail(format!("- Date: {}", payload.date));
                    report.detail(format!("- Time: {}", payload.start_time));
                    report.detail(format!("- Location: {}", payload.event_location));

                    if !phone::is_valid_brazilian(&payload.phone_international) {
                        report.warn(format!(
                            "Phone '{}' is not a valid WhatsApp number ({})",
                            payload.phone, payload.phone_international
                        ));
                    }

                    match serde_json::to_string_pretty(&payload) {
                        Ok(json) => {
                            report.detail("📤 Webhook payload:");
                            for line in json.lines() {
                                report.detail(line.to_string());
                            }
                        }
                        Err(e) => {
                            report.fail(format!("Could not serialize payload: {}", e));
                        }
                    }
                }
                Err(missing) => {
                    report.fail(format!(
                        "Registration is missing webhook fields: {}",
                        missing.join(", ")
                    ));
                }
            },
            None => {
                report.warn("No registration found to test with");
            }
        },
        Err(e) => {
            report.fail(format!("Error in flow test: {}", error_text(&e, Some(LONG_ERROR))));
        }
    }

    // 5. Delivery fields
    report.section("REQUIRED FIELDS");
    match delivery_fields(api).await {
        Ok(Some(fields)) => {
            for (field, present) in fields {
                if present {
                    report.pass(format!("Field '{}' exists in registrations", field));
                } else {
                    report.fail(format!("Field '{}' does NOT exist - needs to be added", field));
                }
                checklist.record(format!("registrations.{}", field), Some(present));
            }
        }
        Ok(None) => {
            report.warn("registrations is empty - fields not verified");
            for field in DELIVERY_FIELDS {
                checklist.record(format!("registrations.{}", field), None);
            }
        }
        Err(e) => {
            report.fail(format!("Error checking fields: {}", error_text(&e, Some(LONG_ERROR))));
            for field in DELIVERY_FIELDS {
                checklist.record(format!("registrations.{}", field), None);
            }
        }
    }

    // 6. Summary
    report.section("REQUIREMENTS SUMMARY");
    checklist.write_to(&mut report);
    report.blank();
    report.info("🎯 Frontend integration:");
    report.detail("- Call the webhook after a successful registration");
    report.detail("- Send the security token");
    report.detail("- Webhook failures must not block the registration");

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::FakeApi;

    fn registration_row() -> Value {
        json!({
            "id": "reg-1",
            "status": "confirmed",
            "created_at": "2026-10-01T12:00:00+00:00",
            "patients": {
                "nome": "Maria Silva",
                "email": "maria@example.com",
                "telefone": "(31) 98952-7170",
                "cpf": "52998224725"
            },
            "event_dates": {
                "date": "2026-11-05",
                "start_time": "08:00:00",
                "end_time": "12:00:00",
                "events": {
                    "title": "Mutirão de Visão",
                    "location": "Centro Comunitário",
                    "address": "Rua A, 100"
                }
            },
            "delivery_date": null,
            "delivery_status": "pending"
        })
    }

    fn healthy_api() -> FakeApi {
        FakeApi::new()
            .table("patients", vec![json!({"id": "p1", "nome": "Maria Silva"})])
            .table("registrations", vec![registration_row()])
            .table("events", vec![json!({"id": "e1", "title": "Mutirão"})])
            .table("event_dates", vec![json!({"id": "d1", "date": "2026-11-05"})])
            .table(NOTIFICATIONS_TABLE, vec![json!({"id": "n1", "registration_id": "reg-1", "sent_at": null})])
            .rpc(DETAILS_FUNCTION, json!([{"patient_name": "Maria Silva", "event_title": "Mutirão"}]))
    }

    #[test]
    fn test_payload_from_embedded_row() {
        let payload = WebhookPayload::from_registration(&registration_row()).unwrap();

        assert_eq!(payload.registration_id, "reg-1");
        assert_eq!(payload.patient_name, "Maria Silva");
        assert_eq!(payload.phone_international, "5531989527170");
        assert_eq!(payload.event_title, "Mutirão de Visão");
        assert_eq!(payload.start_time, "08:00:00");
    }

    #[test]
    fn test_payload_accepts_array_embeds() {
        let mut row = registration_row();
        let patient = row["patients"].clone();
        row["patients"] = json!([patient]);

        let payload = WebhookPayload::from_registration(&row).unwrap();
        assert_eq!(payload.patient_name, "Maria Silva");
    }

    #[test]
    fn test_payload_reports_missing_paths() {
        let mut row = registration_row();
        row["event_dates"] = Value::Null;

        let missing = WebhookPayload::from_registration(&row).unwrap_err();
        assert!(missing.contains(&"event_dates.date".to_string()));
        assert!(missing.contains(&"event_dates.events.title".to_string()));
        assert!(!missing.contains(&"patients.nome".to_string()));
    }

    #[tokio::test]
    async fn test_setup_healthy() {
        let api = healthy_api();
        let report = setup(&api).await;

        assert!(!report.has_failures(), "{}", report.render());
        assert!(report.contains("Table registration_notifications exists"));
        assert!(report.contains("Function get_registration_details exists"));
        assert!(report.contains("Field delivery_status exists"));
    }

    #[tokio::test]
    async fn test_setup_missing_pieces() {
        let api = FakeApi::new().table(
            "registrations",
            vec![json!({"id": "reg-1", "status": "confirmed"})],
        );
        let report = setup(&api).await;
        let text = report.render();

        assert!(report.contains("registration_notifications: HTTP 404"));
        assert!(report.contains("get_registration_details: HTTP 404"));
        assert!(report.contains("Field delivery_date does NOT exist"));
        assert_eq!(report.counts().1, 4);
        // Errors are cut to the short limit
        assert!(text.lines().all(|l| l.chars().count() < 120));
    }

    #[tokio::test]
    async fn test_requirements_healthy() {
        let api = healthy_api();
        let report = requirements(&api).await;
        let text = report.render();

        assert!(!report.has_failures(), "{}", text);
        assert!(report.contains("Table 'patients': 1 records"));
        assert!(report.contains("Function 'get_registration_details' exists and works"));
        assert!(report.contains("Full data query works"));
        assert!(text.contains("\"phone_international\": \"5531989527170\""));
        assert!(report.contains("registrations.delivery_date - OK"));
        assert!(report.contains("get_registration_details() - OK"));
    }

    #[tokio::test]
    async fn test_requirements_missing_notifications_table() {
        let api = FakeApi::new()
            .table("patients", vec![])
            .table("registrations", vec![])
            .table("events", vec![])
            .table("event_dates", vec![]);
        let report = requirements(&api).await;

        assert!(report.contains("Table 'registration_notifications': HTTP 404"));
        assert!(report.contains("registration_notifications - MISSING"));
        assert!(report.contains("get_registration_details() - not verified"));
        assert!(report.contains("registrations is empty - fields not verified"));
    }

    #[test]
    fn test_checklist_outcome_lookup() {
        let mut checklist = Checklist::default();
        checklist.record("patients", Some(true));
        checklist.record("rpc", None);

        assert_eq!(checklist.outcome("patients"), Some(true));
        assert_eq!(checklist.outcome("rpc"), None);
        assert_eq!(checklist.outcome("unknown"), None);
    }
}
