use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("failed to load {what}: {message}")]
    Listing { what: &'static str, message: String },

    #[error("error checking {target}: {message}")]
    Count { target: String, message: String },

    #[error("query failed: {0}")]
    Query(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("settings error: {0}")]
    Settings(String),

    #[error("secret store error: {0}")]
    Secret(String),

    #[error("export failed: {0}")]
    Export(String),
}

impl AppError {
    pub fn listing(what: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Listing {
            what,
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        Self::Export(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Export(err.to_string())
    }
}
