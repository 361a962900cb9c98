// In-memory stand-ins for the REST endpoint and the SQL catalog

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::db::{Catalog, ColumnInfo, OrganizerRow, PolicyInfo};
use crate::rest::{field_text, ApiResponse, FilterOp, Query, RestError, TableApi};

// ============================================================================
// FAKE REST API
// ============================================================================

#[derive(Default)]
pub struct FakeApi {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    rpcs: HashMap<String, Value>,
    insert_error: Option<(u16, String)>,
    ping_status: u16,
    /// DELETE answers 200 with no rows, like a table without a DELETE policy
    deny_deletes: bool,
    /// INSERT stores the row but returns nothing, like RLS hiding it
    hide_inserts: bool,
    pub inserted: Mutex<Vec<(String, Value)>>,
    pub deleted: Mutex<Vec<Query>>,
}

fn api_error(status: u16, code: &str, message: &str) -> RestError {
    RestError::from_body(
        status,
        &json!({"code": code, "message": message, "details": null, "hint": null}).to_string(),
    )
}

fn matches(row: &Value, query: &Query) -> bool {
    query.filters().iter().all(|f| {
        let value = field_text(row, &f.column);
        match f.op {
            FilterOp::Eq => value.as_deref() == Some(f.value.as_str()),
            FilterOp::Gte => value.map(|v| v >= f.value).unwrap_or(false),
        }
    })
}

impl FakeApi {
    pub fn new() -> Self {
        FakeApi {
            ping_status: 200,
            ..Default::default()
        }
    }

    pub fn table(self, name: &str, rows: Vec<Value>) -> Self {
        self.tables.lock().unwrap().insert(name.to_string(), rows);
        self
    }

    pub fn rpc(mut self, name: &str, result: Value) -> Self {
        self.rpcs.insert(name.to_string(), result);
        self
    }

    /// Every insert fails with this PostgREST error
    pub fn insert_error(mut self, status: u16, code: &str, message: &str) -> Self {
        self.insert_error = Some((
            status,
            json!({"code": code, "message": message, "details": "Key (cpf) already exists.", "hint": null})
                .to_string(),
        ));
        self
    }

    pub fn deny_deletes(mut self) -> Self {
        self.deny_deletes = true;
        self
    }

    pub fn hide_inserts(mut self) -> Self {
        self.hide_inserts = true;
        self
    }

    pub fn ping_status(mut self, status: u16) -> Self {
        self.ping_status = status;
        self
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl TableApi for FakeApi {
    async fn select(&self, query: &Query) -> Result<ApiResponse, RestError> {
        let tables = self.tables.lock().unwrap();
        let rows = tables.get(query.table()).ok_or_else(|| {
            api_error(
                404,
                "42P01",
                &format!("relation \"public.{}\" does not exist", query.table()),
            )
        })?;

        if let Some(first) = rows.first() {
            for column in query.plain_columns() {
                if first.get(column).is_none() {
                    return Err(api_error(
                        400,
                        "42703",
                        &format!("column {}.{} does not exist", query.table(), column),
                    ));
                }
            }
        }

        let mut selected: Vec<Value> = rows.iter().filter(|r| matches(r, query)).cloned().collect();
        let count = query.wants_count().then_some(selected.len() as i64);

        if let Some((column, desc)) = query.ordering() {
            selected.sort_by_key(|r| field_text(r, column).unwrap_or_default());
            if desc {
                selected.reverse();
            }
        }
        if let Some(limit) = query.row_limit() {
            selected.truncate(limit);
        }

        let plain = query.plain_columns();
        let embedded = query.columns().contains('(');
        if !plain.is_empty() && !embedded {
            selected = selected
                .into_iter()
                .map(|row| {
                    let projected: serde_json::Map<String, Value> = plain
                        .iter()
                        .map(|c| (c.to_string(), row.get(*c).cloned().unwrap_or(Value::Null)))
                        .collect();
                    Value::Object(projected)
                })
                .collect();
        }

        Ok(ApiResponse {
            data: selected,
            count,
        })
    }

    async fn insert(&self, table: &str, row: &Value) -> Result<ApiResponse, RestError> {
        if let Some((status, body)) = &self.insert_error {
            return Err(RestError::from_body(*status, body));
        }

        let mut stored = row.clone();
        if let Some(obj) = stored.as_object_mut() {
            obj.entry("id")
                .or_insert_with(|| json!(uuid::Uuid::new_v4().to_string()));
        }

        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        self.inserted
            .lock()
            .unwrap()
            .push((table.to_string(), row.clone()));

        if self.hide_inserts {
            return Ok(ApiResponse::default());
        }
        Ok(ApiResponse {
            data: vec![stored],
            count: None,
        })
    }

    async fn delete(&self, query: &Query) -> Result<ApiResponse, RestError> {
        if self.deny_deletes {
            self.deleted.lock().unwrap().push(query.clone());
            return Ok(ApiResponse::default());
        }
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(query.table().to_string()).or_default();
        let (removed, kept): (Vec<Value>, Vec<Value>) =
            rows.drain(..).partition(|r| matches(r, query));
        *rows = kept;
        self.deleted.lock().unwrap().push(query.clone());

        Ok(ApiResponse {
            data: removed,
            count: None,
        })
    }

    async fn rpc(&self, function: &str, _args: &Value) -> Result<ApiResponse, RestError> {
        match self.rpcs.get(function) {
            Some(Value::Array(rows)) => Ok(ApiResponse {
                data: rows.clone(),
                count: None,
            }),
            Some(Value::Null) => Ok(ApiResponse::default()),
            Some(other) => Ok(ApiResponse {
                data: vec![other.clone()],
                count: None,
            }),
            None => Err(api_error(
                404,
                "PGRST202",
                &format!("Could not find the function public.{} in the schema cache", function),
            )),
        }
    }

    async fn ping(&self) -> Result<u16, RestError> {
        if (200..300).contains(&self.ping_status) {
            Ok(self.ping_status)
        } else {
            Err(RestError::from_body(self.ping_status, "Service Unavailable"))
        }
    }
}

// ============================================================================
// FAKE CATALOG
// ============================================================================

#[derive(Default, Clone)]
pub struct FakeTable {
    pub columns: Vec<ColumnInfo>,
    pub rls: bool,
    pub rows: i64,
}

#[derive(Default)]
pub struct FakeCatalog {
    pub tables: HashMap<String, FakeTable>,
    pub policies: Vec<PolicyInfo>,
    pub organizers: Vec<OrganizerRow>,
    /// Tables whose COUNT(*) fails
    pub broken_counts: HashSet<String>,
}

pub fn column(name: &str, data_type: &str) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        data_type: data_type.to_string(),
        is_nullable: "YES".to_string(),
        default: None,
    }
}

pub fn policy(table: &str, name: &str, command: &str) -> PolicyInfo {
    PolicyInfo {
        table: table.to_string(),
        name: name.to_string(),
        command: command.to_string(),
        permissive: "PERMISSIVE".to_string(),
        roles: vec!["authenticated".to_string()],
        qual: Some("(auth.uid() IS NOT NULL)".to_string()),
        with_check: None,
    }
}

pub fn organizer(name: &str, email: &str, role: Option<&str>) -> OrganizerRow {
    OrganizerRow {
        id: format!("id-{}", name.to_lowercase()),
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        status: Some("active".to_string()),
        role: role.map(str::to_string),
    }
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, name: &str, columns: Vec<ColumnInfo>, rows: i64, rls: bool) -> Self {
        self.tables.insert(
            name.to_string(),
            FakeTable {
                columns,
                rls,
                rows,
            },
        );
        self
    }

    pub fn policy(mut self, policy: PolicyInfo) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn organizer(mut self, row: OrganizerRow) -> Self {
        self.organizers.push(row);
        self
    }

    pub fn broken_count(mut self, table: &str) -> Self {
        self.broken_counts.insert(table.to_string());
        self
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.tables.contains_key(table))
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn column(&self, table: &str, column: &str) -> Result<Option<ColumnInfo>> {
        Ok(self
            .columns(table)
            .await?
            .into_iter()
            .find(|c| c.name == column))
    }

    async fn columns_like(&self, table: &str, pattern: &str) -> Result<Vec<ColumnInfo>> {
        // Only `%needle%` patterns are used
        let needle = pattern.trim_matches('%');
        Ok(self
            .columns(table)
            .await?
            .into_iter()
            .filter(|c| c.name.contains(needle))
            .collect())
    }

    async fn rls_enabled(&self, table: &str) -> Result<Option<bool>> {
        Ok(self.tables.get(table).map(|t| t.rls))
    }

    async fn policies(&self, tables: &[&str]) -> Result<Vec<PolicyInfo>> {
        Ok(self
            .policies
            .iter()
            .filter(|p| tables.contains(&p.table.as_str()))
            .cloned()
            .collect())
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        if self.broken_counts.contains(table) {
            return Err(anyhow!("permission denied for table {}", table));
        }
        self.tables
            .get(table)
            .map(|t| t.rows)
            .ok_or_else(|| anyhow!("relation \"public.{}\" does not exist", table))
    }

    async fn organizers(&self, limit: i64, _recent_first: bool) -> Result<Vec<OrganizerRow>> {
        if !self.tables.contains_key("organizers") {
            return Err(anyhow!("relation \"public.organizers\" does not exist"));
        }
        Ok(self
            .organizers
            .iter()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn organizer_by_email(&self, email: &str) -> Result<Option<OrganizerRow>> {
        Ok(self
            .organizers
            .iter()
            .find(|o| o.email.as_deref() == Some(email))
            .cloned())
    }
}
