use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection overrides. Anything left out falls back to the environment,
/// then saved settings. The password is only read from DB_PASSWORD or the
/// keyring.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Full connection string. Overrides the individual fields. Falls back to DB_URL.
    #[arg(short, long, global = true)]
    pub db_url: Option<String>,

    #[arg(long, global = true)]
    pub host: Option<String>,

    #[arg(long, global = true)]
    pub port: Option<u16>,

    #[arg(long, global = true)]
    pub database: Option<String>,

    #[arg(short, long, global = true)]
    pub username: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open and close a connection
    Test,

    /// List user schemas
    Schemas,

    /// Count infinity sentinels in every timestamp/date column of a schema
    Scan {
        /// Defaults to the first user schema
        #[arg(short, long)]
        schema: Option<String>,

        /// Write results as CSV. Without a path, a timestamped file name is used.
        #[arg(short, long)]
        export: Option<Option<PathBuf>>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },

    /// Show the rows of one column that hold infinity
    Rows {
        #[arg(short, long)]
        schema: String,

        #[arg(short, long)]
        table: String,

        #[arg(short, long)]
        column: String,

        #[arg(short, long, default_value_t = 100, value_parser = clap::value_parser!(i64).range(0..))]
        limit: i64,
    },

    /// Manage remembered connection settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum SettingsAction {
    Show,
    /// Remember the current connection fields, and DB_PASSWORD if set
    Save,
    Clear,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Markdown,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_export_without_value_is_some_none() {
        let cli = Cli::parse_from(["search-for-infinity", "scan", "--export"]);
        match cli.command {
            Command::Scan { export, schema, .. } => {
                assert_eq!(export, Some(None));
                assert_eq!(schema, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn connection_flags_are_global() {
        let cli = Cli::parse_from([
            "search-for-infinity",
            "scan",
            "--schema",
            "sales",
            "--host",
            "db",
            "--port",
            "6543",
        ]);
        assert_eq!(cli.connection.host.as_deref(), Some("db"));
        assert_eq!(cli.connection.port, Some(6543));
    }

    #[test]
    fn rows_limit_must_not_be_negative() {
        let args = |limit: &'static str| {
            [
                "search-for-infinity",
                "rows",
                "--schema",
                "public",
                "--table",
                "events",
                "--column",
                "ends_at",
                "--limit",
                limit,
            ]
        };

        assert!(Cli::try_parse_from(args("-1")).is_err());
        match Cli::try_parse_from(args("0")).unwrap().command {
            Command::Rows { limit, .. } => assert_eq!(limit, 0),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
