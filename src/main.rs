// enxergar-diag - diagnostics for the events/patients backend
// REST checks need SUPABASE_URL + SUPABASE_ANON_KEY, SQL checks need DATABASE_URL

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use serde_json::{Map, Value};

use enxergar_diagnostics::checks::{cpf_conflict, env, migration, n8n, patients, smoke};
use enxergar_diagnostics::{logging, Config, PatientOptions, Report, RestClient};

#[derive(Parser, Debug)]
#[command(
    name = "enxergar-diag",
    version,
    about = "Diagnostics for the events, registrations and patients database"
)]
struct Cli {
    /// Direct Postgres connection string (overrides DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// REST project URL (overrides SUPABASE_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Anonymous API key (overrides SUPABASE_ANON_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// -v info, -vv debug
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tables, RPC function and payload shape for the n8n webhook
    N8nSetup,
    /// Everything the n8n workflow expects, with a checklist
    N8nRequirements,
    /// Structure and contents of the organizers table (SQL)
    Organizers,
    /// Row-level security on organizers and the admin role (SQL)
    Rls {
        /// Organizer e-mail to check for the admin role
        #[arg(long)]
        admin_email: Option<String>,
    },
    /// Full policy definitions for one table (SQL)
    Policies {
        #[arg(long, default_value = "organizers")]
        table: String,
    },
    /// Is this CPF already registered?
    Cpf {
        cpf: String,
    },
    /// Why do patient registrations fail?
    Patients {
        /// CPF to look up as a duplicate
        #[arg(long)]
        cpf: Option<String>,
        /// E-mail to look up as a duplicate
        #[arg(long)]
        email: Option<String>,
        /// Insert a synthetic patient and delete it again
        #[arg(long)]
        probe_insert: bool,
        /// JSON object with real form data to insert (the row is kept)
        #[arg(long)]
        replay_json: Option<String>,
    },
    /// Direct database connection, tables and policies (SQL)
    Connection,
    /// Is it safe to add the new registrations columns?
    Migration {
        /// Column the migration adds (repeatable)
        #[arg(long = "column", default_value = "attendance_confirmed")]
        columns: Vec<String>,
    },
    /// Admin dashboard smoke test
    Smoke,
    /// Audit the connection settings
    Env,
    /// Every read-only check the configuration allows
    All {
        #[arg(long)]
        admin_email: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let config = Config::from_env().with_overrides(cli.database_url, cli.api_url, cli.api_key);
    tracing::debug!(command = ?cli.command, "starting");

    let code = run(cli.command, &config).await?;
    std::process::exit(code);
}

async fn run(command: Command, config: &Config) -> Result<i32> {
    match command {
        Command::N8nSetup => {
            let api = rest_client(config)?;
            n8n::setup(&api).await.print();
            Ok(0)
        }
        Command::N8nRequirements => {
            let api = rest_client(config)?;
            n8n::requirements(&api).await.print();
            Ok(0)
        }
        Command::Cpf { cpf } => {
            let api = rest_client(config)?;
            cpf_conflict::check(&api, &cpf).await.print();
            Ok(0)
        }
        Command::Patients {
            cpf,
            email,
            probe_insert,
            replay_json,
        } => {
            let replay = replay_json.as_deref().map(parse_replay).transpose()?;
            let options = PatientOptions {
                cpf,
                email,
                probe_insert,
                replay,
            };
            let api = rest_client(config)?;
            patients::diagnose(&api, &options).await.print();
            Ok(0)
        }
        Command::Smoke => {
            let api = rest_client(config)?;
            smoke::run(&api).await.print();
            Ok(0)
        }
        Command::Migration { columns } => {
            let (report, verdict) = match config.require_api() {
                Ok((url, key)) => {
                    let api = RestClient::new(url, key)?;
                    migration::validate(&api, &columns, chrono::Utc::now()).await
                }
                Err(e) => migration::missing_config(&e.to_string()),
            };
            report.print();
            tracing::info!(?verdict, "migration pre-check finished");
            Ok(verdict.exit_code())
        }
        Command::Env => {
            let (report, ok) = env::audit(config);
            report.print();
            Ok(if ok { 0 } else { 1 })
        }
        Command::Organizers => sql::organizers(config).await,
        Command::Rls { admin_email } => sql::rls(config, admin_email.as_deref()).await,
        Command::Policies { table } => sql::policies(config, &table).await,
        Command::Connection => sql::connection(config).await,
        Command::All { admin_email } => run_all(config, admin_email.as_deref()).await,
    }
}

fn rest_client(config: &Config) -> Result<RestClient> {
    let (url, key) = config.require_api()?;
    Ok(RestClient::new(url, key)?)
}

fn parse_replay(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("--replay-json must be a JSON object, got: {}", other),
    }
}

/// Read-only checks only; nothing is inserted or deleted
async fn run_all(config: &Config, admin_email: Option<&str>) -> Result<i32> {
    let mut combined = Report::new("FULL DIAGNOSTIC RUN");

    let (env_report, _) = env::audit(config);
    combined.extend(env_report);

    match config.require_api() {
        Ok((url, key)) => {
            let api = RestClient::new(url, key)?;
            combined.extend(smoke::run(&api).await);
            combined.extend(n8n::requirements(&api).await);
            combined.extend(patients::diagnose(&api, &PatientOptions::default()).await);

            let columns: Vec<String> = migration::DEFAULT_NEW_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect();
            let (report, _) = migration::validate(&api, &columns, chrono::Utc::now()).await;
            combined.extend(report);
        }
        Err(e) => {
            tracing::warn!("skipping REST checks: {}", e);
            combined.section("REST CHECKS");
            combined.warn(format!("Skipped: {}", e));
        }
    }

    if config.database_url.is_some() {
        sql::all(config, admin_email, &mut combined).await;
    } else {
        combined.section("SQL CHECKS");
        combined.warn("Skipped: no database URL configured");
    }

    combined.print();
    println!();
    println!("📊 {}", combined.summary());
    Ok(0)
}

// ============================================================================
// SQL COMMANDS
// ============================================================================

#[cfg(feature = "postgres")]
mod sql {
    use std::io::{self, BufRead, Write};

    use anyhow::Result;
    use enxergar_diagnostics::checks::{connection, organizers, rls};
    use enxergar_diagnostics::{db, Config, PgCatalog, Report};

    async fn open(config: &Config) -> Result<PgCatalog> {
        let url = config.require_database_url()?;
        tracing::info!(database = %enxergar_diagnostics::config::redact_url(url), "connecting");
        PgCatalog::connect(url).await
    }

    pub async fn organizers(config: &Config) -> Result<i32> {
        let catalog = open(config).await?;
        organizers::structure(&catalog).await.print();
        catalog.close().await;
        Ok(0)
    }

    pub async fn rls(config: &Config, admin_email: Option<&str>) -> Result<i32> {
        let catalog = open(config).await?;
        rls::diagnose(&catalog, admin_email).await.print();
        catalog.close().await;
        Ok(0)
    }

    pub async fn policies(config: &Config, table: &str) -> Result<i32> {
        let catalog = open(config).await?;
        connection::policies_detail(&catalog, table).await.print();
        catalog.close().await;
        Ok(0)
    }

    /// Prompts for the URL when none is configured
    pub async fn connection(config: &Config) -> Result<i32> {
        let url = match config.database_url.clone() {
            Some(url) => url,
            None => prompt_database_url()?,
        };

        match PgCatalog::connect(&url).await {
            Ok(catalog) => {
                connection::test(&catalog).await.print();
                catalog.close().await;
                Ok(0)
            }
            Err(e) => {
                tracing::debug!(sqlstate = ?db::sqlstate(&e), "connection failed");
                connection::failed(&e).print();
                Ok(1)
            }
        }
    }

    pub async fn all(config: &Config, admin_email: Option<&str>, combined: &mut Report) {
        let catalog = match open(config).await {
            Ok(catalog) => catalog,
            Err(e) => {
                combined.extend(connection::failed(&e));
                return;
            }
        };
        combined.extend(connection::test(&catalog).await);
        combined.extend(organizers::structure(&catalog).await);
        combined.extend(rls::diagnose(&catalog, admin_email).await);
        catalog.close().await;
    }

    fn prompt_database_url() -> Result<String> {
        print!("Enter your DATABASE_URL: ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let url = line.trim().to_string();
        if url.is_empty() {
            anyhow::bail!("No database URL provided");
        }
        Ok(url)
    }
}

#[cfg(not(feature = "postgres"))]
mod sql {
    use anyhow::Result;
    use enxergar_diagnostics::{Config, Report};

    fn unavailable() -> Result<i32> {
        eprintln!("❌ SQL checks not available!");
        eprintln!("   Rebuild with: cargo build --features postgres");
        Ok(1)
    }

    pub async fn organizers(_config: &Config) -> Result<i32> {
        unavailable()
    }

    pub async fn rls(_config: &Config, _admin_email: Option<&str>) -> Result<i32> {
        unavailable()
    }

    pub async fn policies(_config: &Config, _table: &str) -> Result<i32> {
        unavailable()
    }

    pub async fn connection(_config: &Config) -> Result<i32> {
        unavailable()
    }

    pub async fn all(_config: &Config, _admin_email: Option<&str>, combined: &mut Report) {
        combined.section("SQL CHECKS");
        combined.warn("Skipped: built without the postgres feature");
    }
}
