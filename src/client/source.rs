//! Local data sources for clients.
//!
//! The client only needs a flat array of observations; how it is loaded
//! is up to the source.

use crate::core::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Provider of one client's numeric observations.
#[async_trait]
pub trait DataSource: Send + Sync + std::fmt::Debug {
    /// Load all observations.
    async fn load(&self) -> Result<Vec<f64>>;

    /// Human-readable description used in logs.
    fn describe(&self) -> String;
}

/// Observations already held in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    values: Vec<f64>,
}

impl InMemorySource {
    /// Wrap a vector of observations.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }
}

#[async_trait]
impl DataSource for InMemorySource {
    async fn load(&self) -> Result<Vec<f64>> {
        Ok(self.values.clone())
    }

    fn describe(&self) -> String {
        format!("memory[{}]", self.values.len())
    }
}

/// A named numeric column of a CSV file with a header row.
#[derive(Clone, Debug)]
pub struct CsvColumnSource {
    path: PathBuf,
    column: String,
}

impl CsvColumnSource {
    /// Create a source reading `column` from the file at `path`.
    pub fn new(path: impl Into<PathBuf>, column: &str) -> Self {
        Self {
            path: path.into(),
            column: column.to_string(),
        }
    }

    /// Path of the CSV file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Column name.
    pub fn column(&self) -> &str {
        &self.column
    }
}

#[async_trait]
impl DataSource for CsvColumnSource {
    async fn load(&self) -> Result<Vec<f64>> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::DataSourceUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        parse_csv_column(&text, &self.column)
    }

    fn describe(&self) -> String {
        format!("{}#{}", self.path.display(), self.column)
    }
}

/// Extract a numeric column from CSV text.
///
/// The first non-empty line is the header. Fields are comma separated and
/// may be wrapped in double quotes; blank lines are skipped.
pub fn parse_csv_column(text: &str, column: &str) -> Result<Vec<f64>> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| Error::ColumnNotFound(format!("{column} (empty file)")))?;

    let index = split_fields(header)
        .position(|name| name == column)
        .ok_or_else(|| Error::ColumnNotFound(column.to_string()))?;

    lines
        .map(|(line_no, line)| {
            let cell = split_fields(line).nth(index).unwrap_or("");
            cell.parse::<f64>().map_err(|_| Error::InvalidValue {
                row: line_no + 1,
                value: cell.to_string(),
            })
        })
        .collect()
}

fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(',').map(|f| f.trim().trim_matches('"'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_named_column() {
        let text = "id,value\n1,0.5\n2,-1.25\n\n3,4e2\n";
        let values = parse_csv_column(text, "value").unwrap();
        assert_eq!(values, vec![0.5, -1.25, 400.0]);
    }

    #[test]
    fn test_parse_quoted_header() {
        let values = parse_csv_column("\"value\"\n\"1.0\"\n2.0\n", "value").unwrap();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_missing_column() {
        let err = parse_csv_column("a,b\n1,2\n", "value").unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(_)));
    }

    #[test]
    fn test_invalid_cell_reports_row() {
        let err = parse_csv_column("value\n1.0\noops\n", "value").unwrap_err();
        match err {
            Error::InvalidValue { row, value } => {
                assert_eq!(row, 3);
                assert_eq!(value, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_in_memory_source() {
        let source = InMemorySource::new(vec![1.0, 2.0]);
        let values = tokio_test::block_on(source.load()).unwrap();
        assert_eq!(values, vec![1.0, 2.0]);
        assert_eq!(source.describe(), "memory[2]");
    }

    #[tokio::test]
    async fn test_csv_source_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "value").unwrap();
        writeln!(file, "1.5").unwrap();
        writeln!(file, "2.5").unwrap();

        let source = CsvColumnSource::new(file.path(), "value");
        assert_eq!(source.load().await.unwrap(), vec![1.5, 2.5]);
    }

    #[tokio::test]
    async fn test_csv_source_missing_file() {
        let source = CsvColumnSource::new("/nonexistent/partition_1.csv", "value");
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, Error::DataSourceUnavailable(_)));
        assert!(!err.is_configuration());
    }
}
