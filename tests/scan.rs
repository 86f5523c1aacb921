use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use search_for_infinity::{
    AppError, AppResult, Catalog, CsvExporter, Inspector, ScanResults, SearchResult,
};

/// In-memory catalog: columns per schema, counts per qualified column, and a
/// set of columns whose count query fails.
#[derive(Default)]
struct FakeCatalog {
    schemas: Vec<String>,
    columns: HashMap<String, Vec<SearchResult>>,
    counts: HashMap<String, i64>,
    failing: HashSet<String>,
    fail_listing: bool,
    count_calls: Vec<String>,
}

impl FakeCatalog {
    fn with_column(mut self, schema: &str, table: &str, column: &str, data_type: &str, count: i64) -> Self {
        let result = SearchResult::new(schema, table, column, data_type);
        self.counts.insert(result.qualified_name(), count);
        self.columns.entry(schema.to_string()).or_default().push(result);
        if !self.schemas.iter().any(|s| s == schema) {
            self.schemas.push(schema.to_string());
        }
        self
    }

    fn failing(mut self, qualified: &str) -> Self {
        self.failing.insert(qualified.to_string());
        self
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn list_schemas(&mut self) -> AppResult<Vec<String>> {
        Ok(self.schemas.clone())
    }

    async fn timestamp_columns(&mut self, schema: &str) -> AppResult<Vec<SearchResult>> {
        if self.fail_listing {
            return Err(AppError::listing("timestamp columns", "relation does not exist"));
        }
        Ok(self.columns.get(schema).cloned().unwrap_or_default())
    }

    async fn describe_column(
        &mut self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> AppResult<Option<SearchResult>> {
        Ok(self.columns.get(schema).and_then(|cols| {
            cols.iter()
                .find(|c| c.table_name == table && c.column_name == column)
                .cloned()
        }))
    }

    async fn count_infinity(&mut self, column: &SearchResult) -> AppResult<i64> {
        let key = column.qualified_name();
        self.count_calls.push(key.clone());
        if self.failing.contains(&key) {
            return Err(AppError::Count {
                target: key,
                message: "permission denied".to_string(),
            });
        }
        Ok(self.counts.get(&key).copied().unwrap_or(0))
    }

    async fn infinity_rows(&mut self, column: &SearchResult, limit: i64) -> AppResult<Vec<String>> {
        let count = self.counts.get(&column.qualified_name()).copied().unwrap_or(0);
        Ok((0..count.min(limit))
            .map(|i| format!("{{\"id\":{i},\"{}\":\"infinity\"}}", column.column_name))
            .collect())
    }
}

#[tokio::test]
async fn schema_without_temporal_columns_yields_empty_results() {
    let mut catalog = FakeCatalog {
        schemas: vec!["empty".to_string()],
        ..Default::default()
    };
    let mut results = ScanResults::new();

    let summary = Inspector::new(&mut catalog)
        .scan("empty", &mut results)
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(summary.columns_examined, 0);
    assert!(summary.failures.is_empty());
}

#[tokio::test]
async fn column_without_infinity_counts_exactly_zero() {
    let mut catalog = FakeCatalog::default()
        .with_column("public", "events", "ends_at", "date", 2)
        .with_column("public", "events", "starts_at", "timestamp with time zone", 0);
    let mut results = ScanResults::new();

    let summary = Inspector::new(&mut catalog)
        .scan("public", &mut results)
        .await
        .unwrap();

    let counts: Vec<_> = results
        .iter()
        .map(|r| (r.column_name.as_str(), r.infinity_rows))
        .collect();
    assert_eq!(counts, vec![("ends_at", 2), ("starts_at", 0)]);
    assert_eq!(summary.flagged_columns, 1);
}

#[tokio::test]
async fn failing_count_does_not_abort_remaining_columns() {
    let mut catalog = FakeCatalog::default()
        .with_column("public", "a", "created", "date", 1)
        .with_column("public", "b", "locked", "date", 9)
        .with_column("public", "c", "updated", "date", 5)
        .failing("public.b.locked");
    let mut results = ScanResults::new();

    let summary = Inspector::new(&mut catalog)
        .scan("public", &mut results)
        .await
        .unwrap();

    assert_eq!(
        catalog.count_calls,
        vec!["public.a.created", "public.b.locked", "public.c.updated"]
    );
    assert_eq!(results.len(), 3);
    let locked = results.iter().find(|r| r.table_name == "b").unwrap();
    assert_eq!(locked.infinity_rows, 0);
    let updated = results.iter().find(|r| r.table_name == "c").unwrap();
    assert_eq!(updated.infinity_rows, 5);

    assert_eq!(summary.columns_examined, 3);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].target, "public.b.locked");
    assert!(summary.failures[0].message.contains("permission denied"));
}

#[tokio::test]
async fn listing_failure_aborts_the_scan() {
    let mut catalog = FakeCatalog {
        fail_listing: true,
        ..Default::default()
    };
    let mut results = ScanResults::new();

    let outcome = Inspector::new(&mut catalog).scan("public", &mut results).await;

    assert!(matches!(outcome, Err(AppError::Listing { .. })));
    assert!(catalog.count_calls.is_empty());
}

#[tokio::test]
async fn rescan_clears_prior_results() {
    let mut catalog = FakeCatalog::default()
        .with_column("public", "events", "ends_at", "date", 1)
        .with_column("archive", "old", "closed_on", "date", 0);
    let mut results = ScanResults::new();

    let mut inspector = Inspector::new(&mut catalog);
    inspector.scan("public", &mut results).await.unwrap();
    inspector.scan("public", &mut results).await.unwrap();
    assert_eq!(results.len(), 1);

    inspector.scan("archive", &mut results).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results.as_slice()[0].schema_name, "archive");
}

#[tokio::test]
async fn missing_schema_defaults_to_first_listed() {
    let mut catalog = FakeCatalog::default()
        .with_column("alpha", "t", "c", "date", 0)
        .with_column("beta", "t", "c", "date", 0);

    let mut inspector = Inspector::new(&mut catalog);
    assert_eq!(inspector.resolve_schema(None).await.unwrap(), "alpha");
    assert_eq!(inspector.resolve_schema(Some("beta")).await.unwrap(), "beta");

    let mut empty = FakeCatalog::default();
    let outcome = Inspector::new(&mut empty).resolve_schema(None).await;
    assert!(matches!(outcome, Err(AppError::Listing { .. })));
}

#[tokio::test]
async fn infinity_rows_requires_a_known_temporal_column() {
    let mut catalog = FakeCatalog::default()
        .with_column("public", "events", "ends_at", "date", 3)
        .with_column("public", "events", "name", "text", 0);
    let mut inspector = Inspector::new(&mut catalog);

    let rows = inspector
        .infinity_rows("public", "events", "ends_at", 2)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let not_temporal = inspector.infinity_rows("public", "events", "name", 10).await;
    assert!(matches!(not_temporal, Err(AppError::Query(_))));

    let missing = inspector.infinity_rows("public", "events", "nope", 10).await;
    assert!(matches!(missing, Err(AppError::Query(_))));
}

#[tokio::test]
async fn export_has_header_plus_one_line_per_result() {
    let mut catalog = FakeCatalog::default()
        .with_column("public", "events", "ends_at", "date", 12)
        .with_column("public", "events", "starts_at", "timestamp without time zone", 0);
    let mut results = ScanResults::new();
    Inspector::new(&mut catalog)
        .scan("public", &mut results)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    CsvExporter::export_to_path(results.as_slice(), &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Schema,Table,Column,Data Type,Infinity Rows",
            "\"public\",\"events\",\"ends_at\",\"date\",12",
            "\"public\",\"events\",\"starts_at\",\"timestamp without time zone\",0",
        ]
    );
}
