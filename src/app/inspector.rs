use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::{debug, info, warn};

use crate::app::error::{AppError, AppResult};
use crate::app::models::{ColumnFailure, ScanResults, ScanSummary, SearchResult};

/// Catalog and data queries the scanner needs. Implemented for a live
/// PostgreSQL connection by [`PgCatalog`].
#[async_trait]
pub trait Catalog: Send {
    async fn list_schemas(&mut self) -> AppResult<Vec<String>>;

    /// Timestamp/date columns of `schema`, ordered by table then column.
    async fn timestamp_columns(&mut self, schema: &str) -> AppResult<Vec<SearchResult>>;

    /// The column's declared type, if it exists.
    async fn describe_column(
        &mut self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> AppResult<Option<SearchResult>>;

    async fn count_infinity(&mut self, column: &SearchResult) -> AppResult<i64>;

    /// Rows holding a sentinel in `column`, each serialized as JSON.
    async fn infinity_rows(&mut self, column: &SearchResult, limit: i64) -> AppResult<Vec<String>>;
}

pub struct PgCatalog {
    conn: PgConnection,
}

impl PgCatalog {
    pub async fn connect(options: &PgConnectOptions, connect_timeout: Duration) -> AppResult<Self> {
        let conn = tokio::time::timeout(connect_timeout, PgConnection::connect_with(options))
            .await
            .map_err(|_| {
                AppError::Connection(format!(
                    "timed out after {}s",
                    connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::Connection(e.to_string()))?;

        Ok(Self { conn })
    }

    pub async fn close(self) -> AppResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| AppError::Connection(e.to_string()))
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn list_schemas(&mut self) -> AppResult<Vec<String>> {
        let schemas: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT schema_name::text
            FROM information_schema.schemata
            WHERE schema_name NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
            ORDER BY schema_name
            "#,
        )
        .fetch_all(&mut self.conn)
        .await
        .map_err(|e| AppError::listing("schemas", e))?;

        Ok(schemas.into_iter().map(|(name,)| name).collect())
    }

    async fn timestamp_columns(&mut self, schema: &str) -> AppResult<Vec<SearchResult>> {
        sqlx::query_as::<_, SearchResult>(
            r#"
            SELECT
                table_schema::text AS schema_name,
                table_name::text AS table_name,
                column_name::text AS column_name,
                data_type::text AS data_type
            FROM information_schema.columns
            WHERE table_schema = $1
              AND data_type IN ('timestamp without time zone', 'timestamp with time zone', 'date')
            GROUP BY table_schema, table_name, column_name, data_type
            ORDER BY table_name, column_name
            "#,
        )
        .bind(schema)
        .fetch_all(&mut self.conn)
        .await
        .map_err(|e| AppError::listing("timestamp columns", e))
    }

    async fn describe_column(
        &mut self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> AppResult<Option<SearchResult>> {
        sqlx::query_as::<_, SearchResult>(
            r#"
            SELECT
                table_schema::text AS schema_name,
                table_name::text AS table_name,
                column_name::text AS column_name,
                data_type::text AS data_type
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2 AND column_name = $3
            "#,
        )
        .bind(schema)
        .bind(table)
        .bind(column)
        .fetch_optional(&mut self.conn)
        .await
        .map_err(|e| AppError::Query(e.to_string()))
    }

    async fn count_infinity(&mut self, column: &SearchResult) -> AppResult<i64> {
        let query = count_query(column)?;

        sqlx::query_scalar::<_, i64>(&query)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| AppError::Count {
                target: column.qualified_name(),
                message: e.to_string(),
            })
    }

    async fn infinity_rows(&mut self, column: &SearchResult, limit: i64) -> AppResult<Vec<String>> {
        let query = rows_query(column)?;

        sqlx::query_scalar::<_, String>(&query)
            .bind(limit)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| AppError::Query(e.to_string()))
    }
}

/// Quotes an identifier, doubling any embedded double quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn infinity_predicate(column: &SearchResult) -> AppResult<String> {
    let column_type = column.column_type().ok_or_else(|| AppError::Count {
        target: column.qualified_name(),
        message: format!("'{}' cannot hold infinity values", column.data_type),
    })?;
    let cast = column_type.sql_cast();
    let ident = quote_ident(&column.column_name);

    Ok(format!(
        "{ident} = 'infinity'::{cast} OR {ident} = '-infinity'::{cast}"
    ))
}

fn qualified_table(column: &SearchResult) -> String {
    format!(
        "{}.{}",
        quote_ident(&column.schema_name),
        quote_ident(&column.table_name)
    )
}

pub fn count_query(column: &SearchResult) -> AppResult<String> {
    Ok(format!(
        "SELECT COUNT(*) FROM {} WHERE {}",
        qualified_table(column),
        infinity_predicate(column)?
    ))
}

pub fn rows_query(column: &SearchResult) -> AppResult<String> {
    Ok(format!(
        "SELECT row_to_json(t)::text FROM (SELECT * FROM {} WHERE {} LIMIT $1) t",
        qualified_table(column),
        infinity_predicate(column)?
    ))
}

// Drives a scan over any catalog. Borrowing the catalog mutably keeps every
// query on the single connection strictly sequential.
pub struct Inspector<'a, C: Catalog> {
    catalog: &'a mut C,
}

impl<'a, C: Catalog> Inspector<'a, C> {
    pub fn new(catalog: &'a mut C) -> Self {
        Self { catalog }
    }

    pub async fn schemas(&mut self) -> AppResult<Vec<String>> {
        self.catalog.list_schemas().await
    }

    /// Picks `requested` if given, otherwise the first listed schema.
    pub async fn resolve_schema(&mut self, requested: Option<&str>) -> AppResult<String> {
        if let Some(schema) = requested {
            return Ok(schema.to_string());
        }

        self.schemas()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::listing("schemas", "database has no user schemas"))
    }

    /// Clears `results`, fills it with the schema's timestamp/date columns
    /// and counts sentinel rows column by column. A failed count is recorded
    /// in the summary and the scan moves on.
    pub async fn scan(&mut self, schema: &str, results: &mut ScanResults) -> AppResult<ScanSummary> {
        info!(schema, "searching for timestamp columns with infinity values");
        results.clear();

        for column in self.catalog.timestamp_columns(schema).await? {
            results.push(column);
        }

        let mut failures = Vec::new();
        for result in results.iter_mut() {
            match self.catalog.count_infinity(result).await {
                Ok(count) => {
                    debug!(column = %result.qualified_name(), count, "counted infinity rows");
                    result.infinity_rows = count;
                }
                Err(err) => {
                    warn!(column = %result.qualified_name(), error = %err, "count failed, continuing");
                    let message = match err {
                        AppError::Count { message, .. } => message,
                        other => other.to_string(),
                    };
                    failures.push(ColumnFailure {
                        target: result.qualified_name(),
                        message,
                    });
                }
            }
        }

        let summary = ScanSummary {
            schema: schema.to_string(),
            columns_examined: results.len(),
            flagged_columns: results.flagged().count(),
            failures,
        };
        info!(
            schema,
            columns = summary.columns_examined,
            flagged = summary.flagged_columns,
            failed = summary.failures.len(),
            "search completed"
        );

        Ok(summary)
    }

    pub async fn infinity_rows(
        &mut self,
        schema: &str,
        table: &str,
        column: &str,
        limit: i64,
    ) -> AppResult<Vec<String>> {
        let target = self
            .catalog
            .describe_column(schema, table, column)
            .await?
            .ok_or_else(|| AppError::Query(format!("column {schema}.{table}.{column} not found")))?;

        if target.column_type().is_none() {
            return Err(AppError::Query(format!(
                "{} is '{}', not a timestamp or date column",
                target.qualified_name(),
                target.data_type
            )));
        }

        self.catalog.infinity_rows(&target, limit).await
    }
}
