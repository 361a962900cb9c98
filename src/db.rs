use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(feature = "postgres")]
use anyhow::Context as _;
#[cfg(feature = "postgres")]
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
#[cfg(feature = "postgres")]
use std::{str::FromStr, time::Duration};

/// Application tables live in the public schema
pub const SCHEMA: &str = "public";

// ============================================================================
// CATALOG ROWS
// ============================================================================

/// One row of information_schema.columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    /// "YES" / "NO" as reported by information_schema
    pub is_nullable: String,
    pub default: Option<String>,
}

/// One row of pg_policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyInfo {
    pub table: String,
    pub name: String,
    /// SELECT / INSERT / UPDATE / DELETE / ALL
    pub command: String,
    /// PERMISSIVE / RESTRICTIVE
    pub permissive: String,
    pub roles: Vec<String>,
    pub qual: Option<String>,
    pub with_check: Option<String>,
}

/// Organizer row; status/role are None when the column is absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizerRow {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub role: Option<String>,
}

// ============================================================================
// CATALOG TRAIT
// ============================================================================

/// Read-only SQL queries used by the direct-connection diagnostics
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Columns in ordinal order
    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    async fn column(&self, table: &str, column: &str) -> Result<Option<ColumnInfo>>;

    /// Columns whose name matches a LIKE pattern
    async fn columns_like(&self, table: &str, pattern: &str) -> Result<Vec<ColumnInfo>>;

    /// None when the table is not in pg_tables
    async fn rls_enabled(&self, table: &str) -> Result<Option<bool>>;

    /// Policies of the given tables ordered by table, command, name
    async fn policies(&self, tables: &[&str]) -> Result<Vec<PolicyInfo>>;

    async fn count_rows(&self, table: &str) -> Result<i64>;

    /// Organizers, most recent first when `recent_first` and created_at exists
    async fn organizers(&self, limit: i64, recent_first: bool) -> Result<Vec<OrganizerRow>>;

    async fn organizer_by_email(&self, email: &str) -> Result<Option<OrganizerRow>>;
}

// ============================================================================
// SQL HELPERS
// ============================================================================

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quoted `public."table"` after identifier validation
pub fn qualified_table(table: &str) -> Result<String> {
    if !is_identifier(table) {
        bail!("invalid table name: {:?}", table);
    }
    Ok(format!("{}.\"{}\"", SCHEMA, table))
}

/// Which optional organizer columns exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrganizerShape {
    pub has_status: bool,
    pub has_role: bool,
    pub has_created_at: bool,
}

/// SELECT for organizer rows that only references columns known to exist.
/// With `by_email` the query takes `$1` = email, otherwise `$1` = limit.
pub fn organizer_select_sql(shape: OrganizerShape, by_email: bool, recent_first: bool) -> String {
    let status = if shape.has_status { "status::text" } else { "NULL::text" };
    let role = if shape.has_role { "role::text" } else { "NULL::text" };

    let mut sql = format!(
        "SELECT id::text, name::text, email::text, {} AS status, {} AS role FROM {}.organizers",
        status, role, SCHEMA
    );

    if by_email {
        sql.push_str(" WHERE email = $1");
    } else {
        if recent_first && shape.has_created_at {
            sql.push_str(" ORDER BY created_at DESC");
        }
        sql.push_str(" LIMIT $1");
    }

    sql
}

// ============================================================================
// POSTGRES IMPLEMENTATION
// ============================================================================

/// Open a small pool against the direct connection string.
/// Statement caching is off so transaction-mode poolers accept the queries.
#[cfg(feature = "postgres")]
pub async fn connect(database_url: &str) -> Result<PgPool> {
    let options = PgConnectOptions::from_str(database_url)
        .context("Invalid database URL")?
        .statement_cache_capacity(0);

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(15))
        .connect_with(options)
        .await
        .context("Could not connect to the database")?;

    Ok(pool)
}

/// SQLSTATE of a database error anywhere in the chain
#[cfg(feature = "postgres")]
pub fn sqlstate(err: &anyhow::Error) -> Option<String> {
    err.chain().find_map(|cause| match cause.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    })
}

#[cfg(feature = "postgres")]
pub struct PgCatalog {
    pool: PgPool,
}

#[cfg(feature = "postgres")]
impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        PgCatalog { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        Ok(PgCatalog::new(connect(database_url).await?))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn organizer_shape(&self) -> Result<OrganizerShape> {
        Ok(OrganizerShape {
            has_status: self.column("organizers", "status").await?.is_some(),
            has_role: self.column("organizers", "role").await?.is_some(),
            has_created_at: self.column("organizers", "created_at").await?.is_some(),
        })
    }
}

#[cfg(feature = "postgres")]
type ColumnTuple = (String, String, String, Option<String>);

#[cfg(feature = "postgres")]
type OrganizerTuple = (String, Option<String>, Option<String>, Option<String>, Option<String>);

#[cfg(feature = "postgres")]
fn to_column((name, data_type, is_nullable, default): ColumnTuple) -> ColumnInfo {
    ColumnInfo {
        name,
        data_type,
        is_nullable,
        default,
    }
}

#[cfg(feature = "postgres")]
fn to_organizer((id, name, email, status, role): OrganizerTuple) -> OrganizerRow {
    OrganizerRow {
        id,
        name,
        email,
        status,
        role,
    }
}

#[cfg(feature = "postgres")]
const COLUMNS_SQL: &str = "SELECT column_name::text, data_type::text, is_nullable::text, column_default::text \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2";

#[cfg(feature = "postgres")]
#[async_trait]
impl Catalog for PgCatalog {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2)",
        )
        .bind(SCHEMA)
        .bind(table)
        .persistent(false)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let rows = sqlx::query_as::<_, ColumnTuple>(&format!(
            "{} ORDER BY ordinal_position",
            COLUMNS_SQL
        ))
        .bind(SCHEMA)
        .bind(table)
        .persistent(false)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_column).collect())
    }

    async fn column(&self, table: &str, column: &str) -> Result<Option<ColumnInfo>> {
        let row = sqlx::query_as::<_, ColumnTuple>(&format!(
            "{} AND column_name = $3",
            COLUMNS_SQL
        ))
        .bind(SCHEMA)
        .bind(table)
        .bind(column)
        .persistent(false)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(to_column))
    }

    async fn columns_like(&self, table: &str, pattern: &str) -> Result<Vec<ColumnInfo>> {
        let rows = sqlx::query_as::<_, ColumnTuple>(&format!(
            "{} AND column_name LIKE $3 ORDER BY ordinal_position",
            COLUMNS_SQL
        ))
        .bind(SCHEMA)
        .bind(table)
        .bind(pattern)
        .persistent(false)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_column).collect())
    }

    async fn rls_enabled(&self, table: &str) -> Result<Option<bool>> {
        let enabled = sqlx::query_scalar::<_, bool>(
            "SELECT rowsecurity FROM pg_tables WHERE schemaname = $1 AND tablename = $2",
        )
        .bind(SCHEMA)
        .bind(table)
        .persistent(false)
        .fetch_optional(&self.pool)
        .await?;
        Ok(enabled)
    }

    async fn policies(&self, tables: &[&str]) -> Result<Vec<PolicyInfo>> {
        let names: Vec<String> = tables.iter().map(|t| t.to_string()).collect();
        let rows = sqlx::query_as::<
            _,
            (String, String, String, String, Vec<String>, Option<String>, Option<String>),
        >(
            "SELECT tablename::text, policyname::text, cmd::text, permissive::text, roles::text[], qual, with_check \
             FROM pg_policies \
             WHERE schemaname = $1 AND tablename = ANY($2) \
             ORDER BY tablename, cmd, policyname",
        )
        .bind(SCHEMA)
        .bind(names)
        .persistent(false)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(table, name, command, permissive, roles, qual, with_check)| PolicyInfo {
                    table,
                    name,
                    command,
                    permissive,
                    roles,
                    qual,
                    with_check,
                },
            )
            .collect())
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", qualified_table(table)?);
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .persistent(false)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn organizers(&self, limit: i64, recent_first: bool) -> Result<Vec<OrganizerRow>> {
        let shape = self.organizer_shape().await?;
        let sql = organizer_select_sql(shape, false, recent_first);
        let rows = sqlx::query_as::<_, OrganizerTuple>(&sql)
            .bind(limit)
            .persistent(false)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(to_organizer).collect())
    }

    async fn organizer_by_email(&self, email: &str) -> Result<Option<OrganizerRow>> {
        let shape = self.organizer_shape().await?;
        let sql = organizer_select_sql(shape, true, false);
        let row = sqlx::query_as::<_, OrganizerTuple>(&sql)
            .bind(email)
            .persistent(false)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(to_organizer))
    }
}
