use serde::Serialize;
use sqlx::FromRow;

/// Declared column types that can hold an `infinity` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Timestamp,
    TimestampTz,
    Date,
}

impl ColumnType {
    /// Maps an `information_schema.columns.data_type` value.
    pub fn from_data_type(data_type: &str) -> Option<Self> {
        match data_type {
            "timestamp without time zone" => Some(Self::Timestamp),
            "timestamp with time zone" => Some(Self::TimestampTz),
            "date" => Some(Self::Date),
            _ => None,
        }
    }

    /// The cast used for the sentinel literals, e.g. `'infinity'::date`.
    pub fn sql_cast(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamptz",
            Self::Date => "date",
        }
    }
}

// One row of the results list. `infinity_rows` stays 0 until counted.
#[derive(FromRow, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    #[sqlx(default)]
    pub infinity_rows: i64,
}

impl SearchResult {
    pub fn new(schema: &str, table: &str, column: &str, data_type: &str) -> Self {
        Self {
            schema_name: schema.to_string(),
            table_name: table.to_string(),
            column_name: column.to_string(),
            data_type: data_type.to_string(),
            infinity_rows: 0,
        }
    }

    pub fn column_type(&self) -> Option<ColumnType> {
        ColumnType::from_data_type(&self.data_type)
    }

    pub fn has_infinity(&self) -> bool {
        self.infinity_rows > 0
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.schema_name, self.table_name, self.column_name)
    }
}

/// The ordered, mutable list a scan writes into.
#[derive(Debug, Clone, Default)]
pub struct ScanResults {
    items: Vec<SearchResult>,
}

impl ScanResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn push(&mut self, result: SearchResult) {
        self.items.push(result);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchResult> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[SearchResult] {
        &self.items
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SearchResult> {
        self.items.iter_mut()
    }

    pub fn flagged(&self) -> impl Iterator<Item = &SearchResult> {
        self.items.iter().filter(|r| r.has_infinity())
    }
}

impl<'a> IntoIterator for &'a ScanResults {
    type Item = &'a SearchResult;
    type IntoIter = std::slice::Iter<'a, SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFailure {
    pub target: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    pub schema: String,
    pub columns_examined: usize,
    pub flagged_columns: usize,
    pub failures: Vec<ColumnFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_casts_match_declared_type() {
        assert_eq!(
            ColumnType::from_data_type("timestamp without time zone").map(ColumnType::sql_cast),
            Some("timestamp")
        );
        assert_eq!(
            ColumnType::from_data_type("timestamp with time zone").map(ColumnType::sql_cast),
            Some("timestamptz")
        );
        assert_eq!(
            ColumnType::from_data_type("date").map(ColumnType::sql_cast),
            Some("date")
        );
        assert_eq!(ColumnType::from_data_type("integer"), None);
    }

    #[test]
    fn flagged_only_returns_positive_counts() {
        let mut results = ScanResults::new();
        let mut hit = SearchResult::new("public", "events", "ends_at", "date");
        hit.infinity_rows = 3;
        results.push(hit);
        results.push(SearchResult::new("public", "events", "starts_at", "date"));

        let flagged: Vec<_> = results.flagged().map(|r| r.column_name.as_str()).collect();
        assert_eq!(flagged, vec!["ends_at"]);
    }
}
