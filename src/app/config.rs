use std::env;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;
use tracing::warn;

use crate::app::cli::ConnectionArgs;
use crate::app::error::{AppError, AppResult};
use crate::app::settings::{SavedSettings, SecretStore};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_DATABASE: &str = "postgres";
pub const DEFAULT_USERNAME: &str = "postgres";

pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(300);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const KEEPALIVE: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppConfig {
    pub db_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: Option<String>,
    pub command_timeout: Duration,
    pub connect_timeout: Duration,
    pub keepalive: Duration,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("db_url", &self.db_url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AppConfig {
    /// Name shown in report headings.
    pub fn db_name(&self) -> String {
        match &self.db_url {
            Some(url) => url
                .rsplit('/')
                .next()
                .and_then(|tail| tail.split('?').next())
                .filter(|name| !name.is_empty())
                .unwrap_or("Unknown")
                .to_string(),
            None => self.database.clone(),
        }
    }

    pub fn connect_options(&self) -> AppResult<PgConnectOptions> {
        let options = match &self.db_url {
            Some(url) => PgConnectOptions::from_str(url)
                .map_err(|e| AppError::Config(format!("invalid database URL: {e}")))?,
            None => {
                let options = PgConnectOptions::new()
                    .host(&self.host)
                    .port(self.port)
                    .database(&self.database)
                    .username(&self.username);
                match &self.password {
                    Some(password) => options.password(password),
                    None => options,
                }
            }
        };

        Ok(options.options([
            (
                "statement_timeout",
                format!("{}", self.command_timeout.as_millis()),
            ),
            ("tcp_keepalives_idle", format!("{}", self.keepalive.as_secs())),
        ]))
    }

    pub fn to_saved(&self) -> SavedSettings {
        SavedSettings {
            host: Some(self.host.clone()),
            port: Some(self.port),
            database: Some(self.database.clone()),
            username: Some(self.username.clone()),
        }
    }
}

/// Resolves the connection from flags, process environment, `.env`, saved
/// settings and the secret store, in that order of precedence.
pub fn resolve_config(
    args: &ConnectionArgs,
    saved: &SavedSettings,
    secrets: &dyn SecretStore,
) -> AppResult<AppConfig> {
    dotenvy::dotenv().ok();
    resolve_with(args, saved, secrets, |key| env::var(key).ok())
}

pub fn resolve_with(
    args: &ConnectionArgs,
    saved: &SavedSettings,
    secrets: &dyn SecretStore,
    lookup: impl Fn(&str) -> Option<String>,
) -> AppResult<AppConfig> {
    let db_url = args.db_url.clone().or_else(|| lookup("DB_URL"));

    let host = args
        .host
        .clone()
        .or_else(|| lookup("DB_HOST"))
        .or_else(|| saved.host.clone())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = match (args.port, lookup("DB_PORT")) {
        (Some(port), _) => port,
        (None, Some(raw)) => raw
            .trim()
            .parse::<u16>()
            .map_err(|_| AppError::Config(format!("DB_PORT '{raw}' is not a valid port")))?,
        (None, None) => saved.port.unwrap_or(DEFAULT_PORT),
    };

    let database = args
        .database
        .clone()
        .or_else(|| lookup("DB_NAME"))
        .or_else(|| saved.database.clone())
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

    let username = args
        .username
        .clone()
        .or_else(|| lookup("DB_USER"))
        .or_else(|| saved.username.clone())
        .unwrap_or_else(|| DEFAULT_USERNAME.to_string());

    let password = match lookup("DB_PASSWORD") {
        Some(password) => Some(password),
        None => match secrets.get(&username) {
            Ok(password) => password,
            Err(err) => {
                warn!(error = %err, "could not read stored password");
                None
            }
        },
    };

    Ok(AppConfig {
        db_url,
        host,
        port,
        database,
        username,
        password,
        command_timeout: COMMAND_TIMEOUT,
        connect_timeout: CONNECT_TIMEOUT,
        keepalive: KEEPALIVE,
    })
}
