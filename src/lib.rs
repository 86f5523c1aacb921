pub mod app;

// Re-export useful types for library users
pub use app::config::AppConfig;
pub use app::error::{AppError, AppResult};
pub use app::export::CsvExporter;
pub use app::formatter::OutputGenerator;
pub use app::generate_report;
pub use app::inspector::{Catalog, Inspector, PgCatalog};
pub use app::models::{ColumnFailure, ColumnType, ScanResults, ScanSummary, SearchResult};
pub use app::settings::{KeyringStore, MemorySecretStore, SavedSettings, SecretStore, SettingsStore};
