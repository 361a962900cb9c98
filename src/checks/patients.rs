// 🏥 Patients table diagnosis - why do registrations fail with a conflict?
// Structure, count, duplicate lookups, an insert/delete probe and the latest rows.

use serde_json::{json, Map, Value};

use super::describe_rest_error;
use crate::cpf;
use crate::report::Report;
use crate::rest::{field_or_na, field_text, Query, TableApi};

pub const TABLE: &str = "patients";

/// Probe rows are recognizable and removed by their unique e-mail
pub const PROBE_EMAIL_DOMAIN: &str = "example.com";

#[derive(Debug, Clone, Default)]
pub struct PatientOptions {
    /// CPF to look up as a possible duplicate
    pub cpf: Option<String>,
    /// E-mail to look up as a possible duplicate
    pub email: Option<String>,
    /// Insert a synthetic row and delete it again
    pub probe_insert: bool,
    /// Exact form data to insert; the row is kept
    pub replay: Option<Map<String, Value>>,
}

/// Valid CPF derived from the first nine base-36 digits of `tag`
pub fn synthetic_cpf(tag: &str) -> String {
    let mut seed: Vec<u32> = tag
        .chars()
        .filter_map(|c| c.to_digit(36))
        .map(|d| d % 10)
        .collect();
    if seed.is_empty() {
        seed.push(0);
    }

    let mut base: Vec<u32> = (0..9)
        .map(|i| (seed[i % seed.len()] + i as u32) % 10)
        .collect();
    // All-equal digits are rejected as invalid
    if base.iter().all(|d| *d == base[0]) {
        base[8] = (base[8] + 1) % 10;
    }

    let first_nine: String = base.iter().map(|d| d.to_string()).collect();
    cpf::with_check_digits(&first_nine).unwrap_or(first_nine)
}

/// Synthetic patient for the insert test; e-mail and CPF unique per tag
pub fn probe_row(tag: &str) -> Value {
    json!({
        "nome": "DIAGNOSTIC PROBE",
        "email": format!("diagnostic.probe.{}@{}", tag, PROBE_EMAIL_DOMAIN),
        "telefone": "11999999999",
        "cpf": synthetic_cpf(tag),
        "data_nascimento": "1990-01-01",
        "consentimento_lgpd": true
    })
}

/// Delete the test row by e-mail and report whether anything was removed
async fn remove_test_row(api: &dyn TableApi, email: &str, report: &mut Report) {
    match api.delete(&Query::from(TABLE).eq("email", email)).await {
        Ok(deleted) if !deleted.is_empty() => {
            report.info(format!("🧹 Test record removed ({} row(s))", deleted.data.len()));
        }
        Ok(_) => {
            // PostgREST answers 200 with no rows when no DELETE policy matches
            report.fail("Test record NOT removed (0 rows deleted; check DELETE policy)");
            report.detail(format!("Remove it manually: email = {}", email));
        }
        Err(e) => {
            report.fail(format!("Could not remove test record {}: {}", email, e));
        }
    }
}

pub async fn diagnose(api: &dyn TableApi, options: &PatientOptions) -> Report {
    let mut report = Report::new("Starting patients diagnosis...");

    // 1. Structure
    report.section("PATIENTS TABLE STRUCTURE");
    match api.select(&Query::from(TABLE).limit(1)).await {
        Ok(sample) => {
            report.pass(format!("Table '{}' exists", TABLE));
            if sample.is_empty() {
                report.info("📊 Table empty - structure not visible through the API");
            } else {
                report.info(format!("📊 Detected structure: {:?}", sample.columns()));
            }
        }
        Err(e) => {
            report.fail(format!("Error accessing table '{}': {}", TABLE, e));
            return report;
        }
    }

    // 2. Count
    report.section("RECORD COUNT");
    match api.select(&Query::from(TABLE).select("id").count_exact()).await {
        Ok(result) => {
            report.info(format!(
                "📊 Total patients: {}",
                result.count.unwrap_or(result.data.len() as i64)
            ));
        }
        Err(e) => {
            report.fail(format!("Error counting records: {}", e));
        }
    }

    // 3. Duplicates
    if options.cpf.is_some() || options.email.is_some() {
        report.section("DUPLICATE CHECK");
    }
    if let Some(cpf) = &options.cpf {
        match api.select(&Query::from(TABLE).eq("cpf", cpf)).await {
            Ok(found) if !found.is_empty() => {
                report.warn(format!("CPF {} ALREADY EXISTS:", cpf));
                for record in &found.data {
                    report.detail(format!("- ID: {}", field_or_na(record, "id")));
                    report.detail(format!("- Name: {}", field_or_na(record, "nome")));
                    report.detail(format!("- Email: {}", field_or_na(record, "email")));
                    report.detail(format!("- Created: {}", field_or_na(record, "created_at")));
                }
            }
            Ok(_) => {
                report.pass(format!("CPF {} does NOT exist in the database", cpf));
            }
            Err(e) => {
                report.fail(format!("Error checking CPF: {}", e));
            }
        }
    }
    if let Some(email) = &options.email {
        match api.select(&Query::from(TABLE).eq("email", email)).await {
            Ok(found) if !found.is_empty() => {
                report.warn(format!("Email {} ALREADY EXISTS:", email));
                for record in &found.data {
                    report.detail(format!("- ID: {}", field_or_na(record, "id")));
                    report.detail(format!("- Name: {}", field_or_na(record, "nome")));
                    report.detail(format!("- CPF: {}", field_or_na(record, "cpf")));
                    report.detail(format!("- Created: {}", field_or_na(record, "created_at")));
                }
            }
            Ok(_) => {
                report.pass(format!("Email {} does NOT exist in the database", email));
            }
            Err(e) => {
                report.fail(format!("Error checking email: {}", e));
            }
        }
    }

    // 4. Insert probe
    if options.probe_insert {
        report.section("DIRECT INSERT TEST");
        let row = probe_row(&uuid::Uuid::new_v4().simple().to_string());
        let email = field_text(&row, "email").unwrap_or_default();
        tracing::info!(%email, "inserting probe patient");

        report.info("🧪 Trying a test insert...");
        match api.insert(TABLE, &row).await {
            Ok(inserted) => {
                match inserted.first() {
                    Some(created) => {
                        report.pass("INSERT WORKED! The problem is NOT RLS or basic constraints");
                        report.detail(format!("📊 Record created: {}", field_or_na(created, "id")));
                    }
                    None => {
                        // RLS can allow the insert but hide the returned row
                        report.fail("Insert returned no data");
                    }
                }
                remove_test_row(api, &email, &mut report).await;
            }
            Err(e) => {
                report.fail(format!("INSERT ERROR: {}", e));
                describe_rest_error(&mut report, &e);
            }
        }
    }

    // 5. Exact form data
    if let Some(replay) = &options.replay {
        report.section("TEST WITH EXACT FORM DATA");
        report.info("🎯 Trying an insert with the EXACT form data...");
        tracing::warn!(fields = replay.len(), "replaying form data; the row will be kept");
        match api.insert(TABLE, &Value::Object(replay.clone())).await {
            Ok(inserted) if !inserted.is_empty() => {
                report.pass("INSERT WITH EXACT DATA WORKED!");
                if let Some(created) = inserted.first() {
                    report.detail(format!("📊 Record created: {}", field_or_na(created, "id")));
                }
                report.warn("Record kept for the form test");
            }
            Ok(_) => {
                report.fail("Insert with exact data returned no data");
            }
            Err(e) => {
                report.fail(format!("ERROR WITH EXACT DATA: {}", e));
                describe_rest_error(&mut report, &e);
                report.detail("🔍 This is most likely the same error the form gets!");
            }
        }
    }

    // 6. Latest rows
    report.section("LATEST RECORDS");
    match api
        .select(
            &Query::from(TABLE)
                .select("id, nome, email, cpf, created_at")
                .order("created_at", true)
                .limit(5),
        )
        .await
    {
        Ok(recent) if !recent.is_empty() => {
            report.info("📋 Latest 5 records:");
            for (i, record) in recent.data.iter().enumerate() {
                report.detail(format!(
                    "{}. {} ({}) - {}",
                    i + 1,
                    field_or_na(record, "nome"),
                    field_or_na(record, "email"),
                    field_or_na(record, "created_at")
                ));
            }
        }
        Ok(_) => {
            report.info("📋 No records found");
        }
        Err(e) => {
            report.fail(format!("Error listing records: {}", e));
        }
    }

    report.section("DIAGNOSIS COMPLETE");
    report.info("🎯 Check the results above to find the problem!");
    report
}
