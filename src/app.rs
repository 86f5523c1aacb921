pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod formatter;
pub mod inspector;
pub mod models;
pub mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use self::cli::{Cli, Command, OutputFormat, SettingsAction};
use self::config::{AppConfig, resolve_config};
use self::export::CsvExporter;
use self::formatter::OutputGenerator;
use self::inspector::{Inspector, PgCatalog};
use self::models::{ScanResults, ScanSummary};
use self::settings::{KeyringStore, SavedSettings, SecretStore, SettingsStore};

pub async fn connect(config: &AppConfig) -> Result<PgCatalog> {
    let options = config.connect_options()?;
    let catalog = PgCatalog::connect(&options, config.connect_timeout)
        .await
        .context("Failed to connect to database")?;
    info!(database = %config.db_name(), "connected");
    Ok(catalog)
}

async fn disconnect(catalog: PgCatalog) {
    if let Err(err) = catalog.close().await {
        warn!(error = %err, "failed to close connection cleanly");
    }
}

// Connects and scans in one go. `schema` defaults to the first user schema.
pub async fn generate_report(
    config: &AppConfig,
    schema: Option<&str>,
) -> Result<(ScanResults, ScanSummary)> {
    let mut catalog = connect(config).await?;
    let mut results = ScanResults::new();

    let outcome = {
        let mut inspector = Inspector::new(&mut catalog);
        match inspector.resolve_schema(schema).await {
            Ok(schema) => inspector.scan(&schema, &mut results).await,
            Err(err) => Err(err),
        }
    };
    disconnect(catalog).await;

    let summary = outcome.context("Search failed")?;
    Ok((results, summary))
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    let store = SettingsStore::user_default();
    let secrets = KeyringStore::default();
    let saved = match &store {
        Ok(store) => store.load_or_default(),
        Err(err) => {
            warn!(error = %err, "settings unavailable, using defaults");
            SavedSettings::default()
        }
    };
    let config = resolve_config(&args.connection, &saved, &secrets)?;

    match args.command {
        Command::Test => test_connection(&config).await,
        Command::Schemas => list_schemas(&config).await,
        Command::Scan {
            schema,
            export,
            format,
        } => scan(&config, schema.as_deref(), export, format).await,
        Command::Rows {
            schema,
            table,
            column,
            limit,
        } => show_rows(&config, &schema, &table, &column, limit).await,
        Command::Settings { action } => manage_settings(action, &config, &store?, &secrets),
    }
}

async fn test_connection(config: &AppConfig) -> Result<()> {
    match connect(config).await {
        Ok(catalog) => {
            disconnect(catalog).await;
            println!("Connection successful!");
            Ok(())
        }
        Err(err) => {
            println!("Connection failed: {err:#}");
            Err(err)
        }
    }
}

async fn list_schemas(config: &AppConfig) -> Result<()> {
    let mut catalog = connect(config).await?;
    let schemas = Inspector::new(&mut catalog).schemas().await;
    disconnect(catalog).await;

    for schema in schemas.context("Failed to load schemas")? {
        println!("{schema}");
    }
    Ok(())
}

async fn scan(
    config: &AppConfig,
    schema: Option<&str>,
    export: Option<Option<PathBuf>>,
    format: OutputFormat,
) -> Result<()> {
    let (results, summary) = generate_report(config, schema).await?;

    let output = match format {
        OutputFormat::Markdown => {
            OutputGenerator::generate_markdown(&config.db_name(), &results, &summary)?
        }
        OutputFormat::Json => OutputGenerator::generate_json(&results)?,
    };
    print!("{output}");
    if format == OutputFormat::Json {
        println!();
    }

    if let Some(path) = export {
        if results.is_empty() {
            eprintln!("No results to export.");
            return Ok(());
        }

        let path = path.unwrap_or_else(|| CsvExporter::default_file_name(chrono::Local::now()));
        CsvExporter::export_to_path(results.as_slice(), &path)
            .with_context(|| format!("Failed to export results to {}", path.display()))?;
        eprintln!("Results exported to {}", path.display());
    }

    Ok(())
}

async fn show_rows(
    config: &AppConfig,
    schema: &str,
    table: &str,
    column: &str,
    limit: i64,
) -> Result<()> {
    let mut catalog = connect(config).await?;
    let rows = Inspector::new(&mut catalog)
        .infinity_rows(schema, table, column, limit)
        .await;
    disconnect(catalog).await;

    let rows = rows.context("Failed to load data")?;
    let target = format!("{schema}.{table}.{column}");
    print!("{}", OutputGenerator::generate_rows(&target, &rows)?);
    Ok(())
}

fn manage_settings(
    action: SettingsAction,
    config: &AppConfig,
    store: &SettingsStore,
    secrets: &dyn SecretStore,
) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let saved = store.load()?;
            let username = saved.username.as_deref().unwrap_or(&config.username);
            let has_password = secrets.get(username)?.is_some();

            println!("file:     {}", store.path().display());
            println!("host:     {}", saved.host.as_deref().unwrap_or("-"));
            println!(
                "port:     {}",
                saved.port.map(|p| p.to_string()).unwrap_or_else(|| "-".into())
            );
            println!("database: {}", saved.database.as_deref().unwrap_or("-"));
            println!("username: {}", saved.username.as_deref().unwrap_or("-"));
            println!("password: {}", if has_password { "stored" } else { "-" });
        }
        SettingsAction::Save => {
            store.save(&config.to_saved())?;
            if let Ok(password) = std::env::var("DB_PASSWORD") {
                secrets
                    .set(&config.username, &password)
                    .context("Failed to store password")?;
                info!(username = %config.username, "password stored in keyring");
            }
            println!("Settings saved to {}", store.path().display());
        }
        SettingsAction::Clear => {
            clear_settings(config, store, secrets)?;
            println!("Settings cleared.");
        }
    }
    Ok(())
}

/// Removes the stored password and the settings file. A corrupt file is
/// still removed; the password key then falls back to the resolved username.
fn clear_settings(
    config: &AppConfig,
    store: &SettingsStore,
    secrets: &dyn SecretStore,
) -> Result<()> {
    let saved = store.load_or_default();
    let username = saved.username.as_deref().unwrap_or(&config.username);
    secrets.delete(username).context("Failed to delete password")?;
    store.clear()?;
    Ok(())
}
