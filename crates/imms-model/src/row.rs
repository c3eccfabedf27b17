use std::sync::Arc;

/// One data line of a batch file: an ordered header → value mapping.
///
/// Headers are shared between all rows of a batch. Rows are immutable once
/// read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    index: usize,
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl CsvRow {
    /// Build a row. `index` is the 0-based position of the row in the file,
    /// excluding the header line.
    ///
    /// Missing trailing values read as empty; values beyond the header count
    /// are dropped. Structural checks happen at ingest time.
    pub fn new(index: usize, headers: Arc<[String]>, mut values: Vec<String>) -> Self {
        values.resize(headers.len(), String::new());
        Self {
            index,
            headers,
            values,
        }
    }

    /// Convenience constructor for building rows from `(header, value)` pairs.
    pub fn from_pairs<K, V>(index: usize, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let (headers, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .unzip();
        Self::new(index, headers.into(), values)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based row number, as used in row ids.
    pub fn row_number(&self) -> usize {
        self.index + 1
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Raw value for `column` (`None` if the column does not exist).
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|header| header == column)?;
        self.values.get(idx).map(String::as_str)
    }

    /// Trimmed value for `column`, `None` when missing or blank.
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        self.get(column)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Untrimmed value for `column`, `None` when missing or blank.
    ///
    /// Coded values are checked exactly as supplied; surrounding whitespace
    /// makes them invalid rather than being stripped.
    pub fn present(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|value| !value.trim().is_empty())
    }

    /// Iterate `(header, value)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }
}
