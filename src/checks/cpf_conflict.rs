// 🪪 Look up a CPF that is rejected as a duplicate, in both stored forms

use crate::cpf;
use crate::report::Report;
use crate::rest::{field_or_na, field_text, Query, TableApi};

pub async fn check(api: &dyn TableApi, input: &str) -> Report {
    let digits = cpf::clean(input);
    let formatted = cpf::format(&digits);

    let mut report = Report::with_width(&format!("Checking CPF: {}", digits), 50);

    if cpf::is_valid(&digits) {
        report.pass(format!("CPF {} has valid check digits", formatted));
    } else {
        report.warn(format!(
            "CPF {} is not a valid CPF (length or check digits)",
            input
        ));
    }

    // Stored (digits only) form
    match api
        .select(&Query::from("patients").eq("cpf", &digits))
        .await
    {
        Ok(response) if !response.is_empty() => {
            report.warn(format!("CPF {} ALREADY EXISTS in the database!", digits));
            report.info("📋 Existing record data:");
            for record in &response.data {
                report.detail(format!("- ID: {}", field_or_na(record, "id")));
                report.detail(format!("- Name: {}", field_or_na(record, "nome")));
                report.detail(format!("- Email: {}", field_or_na(record, "email")));
                report.detail(format!("- CPF: {}", field_or_na(record, "cpf")));
                report.detail(format!("- Phone: {}", field_or_na(record, "telefone")));
                report.detail(format!("- Created at: {}", field_or_na(record, "created_at")));
                report.detail(format!("- Updated at: {}", field_or_na(record, "updated_at")));
                if let Some(diagnosis) = field_text(record, "diagnostico") {
                    report.detail(format!("- Diagnosis: {}", diagnosis));
                }
                report.detail("-".repeat(40));
            }
        }
        Ok(_) => {
            report.pass(format!("CPF {} does NOT exist in the database", digits));
        }
        Err(e) => {
            report.fail(format!("Error checking CPF: {}", e));
        }
    }

    // Masked form, in case some rows were stored unclean
    if formatted != digits {
        report.blank();
        report.info(format!("🔍 Checking formatted CPF: {}", formatted));
        match api
            .select(&Query::from("patients").eq("cpf", &formatted))
            .await
        {
            Ok(response) if !response.is_empty() => {
                report.warn(format!("Formatted CPF {} also exists!", formatted));
            }
            Ok(_) => {
                report.pass(format!("Formatted CPF {} does not exist", formatted));
            }
            Err(e) => {
                report.fail(format!("Error checking formatted CPF: {}", e));
            }
        }
    }

    report
}
