use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// Column – one typed numeric column
// ---------------------------------------------------------------------------

/// A homogeneous numeric column.
///
/// Integer columns keep 64-bit survey identifiers (`bestObjID`, `plate`, ...)
/// exact; transforms that produce fractional values turn a column into
/// [`Column::Float`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Int(v) => v.len(),
            Column::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the column out as `f64` values.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            Column::Int(v) => v.iter().map(|&i| i as f64).collect(),
            Column::Float(v) => v.clone(),
        }
    }

    /// Value at `row` as `f64`.
    pub fn get_f64(&self, row: usize) -> Option<f64> {
        match self {
            Column::Int(v) => v.get(row).map(|&i| i as f64),
            Column::Float(v) => v.get(row).copied(),
        }
    }

    /// Value at `row` as an integer. Float cells must hold a whole number.
    pub fn get_i64(&self, row: usize) -> Option<i64> {
        match self {
            Column::Int(v) => v.get(row).copied(),
            Column::Float(v) => v
                .get(row)
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|&f| f as i64),
        }
    }

    /// Keep only the rows whose mask entry is `true`.
    pub fn retain_mask(&mut self, mask: &[bool]) {
        fn keep<T: Copy>(values: &[T], mask: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(mask)
                .filter(|(_, m)| **m)
                .map(|(v, _)| *v)
                .collect()
        }
        *self = match self {
            Column::Int(v) => Column::Int(keep(v, mask)),
            Column::Float(v) => Column::Float(keep(v, mask)),
        };
    }

    /// Select rows by index, in the given order. Callers check the bounds.
    pub(crate) fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Int(v) => Column::Int(rows.iter().map(|&r| v[r]).collect()),
            Column::Float(v) => Column::Float(rows.iter().map(|&r| v[r]).collect()),
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Column::Float(values)
    }
}

impl From<Vec<i64>> for Column {
    fn from(values: Vec<i64>) -> Self {
        Column::Int(values)
    }
}

// ---------------------------------------------------------------------------
// TabularDataset – ordered name → column mapping
// ---------------------------------------------------------------------------

/// A rectangular table of named numeric columns.
///
/// Column order is insertion order; row order is the load/query order and is
/// the implicit index used by interpolation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularDataset {
    names: Vec<String>,
    columns: Vec<Column>,
    /// Set once columns have been filtered independently; row `k` of one
    /// column no longer belongs to the same object as row `k` of another.
    unaligned: bool,
}

impl TabularDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from `(name, column)` pairs, rejecting ragged input.
    /// A repeated name replaces the earlier column.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Column)>,
        S: Into<String>,
    {
        let mut dataset = Self::new();
        for (name, column) in columns {
            dataset.insert_column(name, column)?;
        }
        Ok(dataset)
    }

    /// Append a column, or replace one with the same name in place.
    ///
    /// The column must match the current row count.
    pub fn insert_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        let idx = self.position(&name);
        let others_len = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != idx)
            .map(|(_, c)| c.len())
            .next();
        if let Some(expected) = others_len {
            if column.len() != expected {
                return Err(SpectraError::LengthMismatch {
                    expected,
                    found: column.len(),
                });
            }
        }
        match idx {
            Some(i) => self.columns[i] = column,
            None => {
                self.names.push(name);
                self.columns.push(column);
            }
        }
        Ok(())
    }

    /// Replace a column without the row-count check and mark the table as
    /// no longer row-aligned.
    ///
    /// Only column-wise outlier removal uses this; afterwards
    /// [`row_count`](Self::row_count) reports `None` even if the lengths
    /// happen to agree.
    pub(crate) fn replace_column_unaligned(&mut self, idx: usize, column: Column) {
        self.columns[idx] = column;
        self.unaligned = self.columns.len() > 1;
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.position(name)?;
        self.names.remove(idx);
        let column = self.columns.remove(idx);
        if self.columns.len() <= 1 {
            self.unaligned = false;
        }
        Some(column)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|i| &self.columns[i])
    }

    /// Like [`column`](Self::column) but a missing name is an error.
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| SpectraError::missing_column(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    pub(crate) fn columns_mut(&mut self) -> impl Iterator<Item = (&str, &mut Column)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter_mut())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Shared row count, or `None` when columns differ in length or were
    /// filtered independently of each other.
    pub fn row_count(&self) -> Option<usize> {
        if self.unaligned {
            return None;
        }
        let first = self.columns.first().map_or(0, Column::len);
        self.columns
            .iter()
            .all(|c| c.len() == first)
            .then_some(first)
    }

    /// Number of rows, failing on a ragged table.
    pub fn require_rows(&self, operation: &'static str) -> Result<usize> {
        self.row_count()
            .ok_or(SpectraError::RaggedDataset { operation })
    }

    /// True when there are no columns or no rows.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.columns.iter().all(Column::is_empty)
    }

    /// A new dataset holding only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<TabularDataset> {
        let mut out = TabularDataset::new();
        for &name in names {
            let column = self.require(name)?.clone();
            out.insert_column(name, column)?;
        }
        out.unaligned = self.unaligned && out.columns.len() > 1;
        Ok(out)
    }

    /// Keep only the rows whose mask entry is `true`, across all columns.
    pub fn retain_rows(&mut self, mask: &[bool]) -> Result<()> {
        let rows = self.require_rows("row filtering")?;
        if mask.len() != rows {
            return Err(SpectraError::LengthMismatch {
                expected: rows,
                found: mask.len(),
            });
        }
        for column in &mut self.columns {
            column.retain_mask(mask);
        }
        Ok(())
    }

    /// A new dataset with the given rows, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Result<TabularDataset> {
        let n = self.require_rows("row selection")?;
        if let Some(&bad) = rows.iter().find(|&&r| r >= n) {
            return Err(SpectraError::InvalidInput(format!(
                "row {bad} out of range for {n} rows"
            )));
        }
        Ok(TabularDataset {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            unaligned: false,
        })
    }

    /// Row-major `f64` copy of the table.
    pub fn to_rows(&self) -> Result<Vec<Vec<f64>>> {
        let n = self.require_rows("row export")?;
        let cols: Vec<Vec<f64>> = self.columns.iter().map(Column::to_f64).collect();
        Ok((0..n)
            .map(|r| cols.iter().map(|c| c[r]).collect())
            .collect())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl fmt::Display for TabularDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row_count() {
            Some(rows) => write!(f, "{} rows x {} columns", rows, self.num_columns())?,
            None => write!(f, "ragged table, {} columns", self.num_columns())?,
        }
        if !self.names.is_empty() {
            write!(f, " [{}]", self.names.join(", "))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ResultSet – numeric table plus text columns
// ---------------------------------------------------------------------------

/// One tabular result: numeric columns in a [`TabularDataset`] and the
/// remaining columns (e.g. SDSS `class`) kept as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub data: TabularDataset,
    pub text: BTreeMap<String, Vec<String>>,
}

impl ResultSet {
    pub fn new(data: TabularDataset) -> Self {
        Self {
            data,
            text: BTreeMap::new(),
        }
    }

    pub fn text_column(&self, name: &str) -> Result<&[String]> {
        self.text
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| SpectraError::missing_column(name))
    }

    /// Row count of the numeric part, falling back to the text columns.
    pub fn len(&self) -> usize {
        self.data
            .row_count()
            .filter(|&n| n > 0)
            .or_else(|| self.text.values().next().map(Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TabularDataset {
        TabularDataset::from_columns([
            ("plate", Column::Int(vec![266, 267, 268])),
            ("z", Column::Float(vec![0.1, 0.2, 0.3])),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_ragged_columns() {
        let mut ds = sample();
        let err = ds
            .insert_column("u", Column::Float(vec![1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            SpectraError::LengthMismatch {
                expected: 3,
                found: 2
            }
        ));
        assert_eq!(ds.num_columns(), 2);
    }

    #[test]
    fn insert_replaces_existing_column_in_place() {
        let mut ds = sample();
        ds.insert_column("plate", Column::Float(vec![1.0, 2.0, 3.0]))
            .unwrap();
        assert_eq!(ds.column_names(), ["plate", "z"]);
        assert_eq!(ds.column("plate").unwrap().to_f64(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn single_column_can_be_replaced_with_new_length() {
        let mut ds = TabularDataset::from_columns([("a", Column::Float(vec![1.0, 2.0]))]).unwrap();
        ds.insert_column("a", Column::Float(vec![1.0])).unwrap();
        assert_eq!(ds.row_count(), Some(1));
    }

    #[test]
    fn retain_rows_filters_every_column() {
        let mut ds = sample();
        ds.retain_rows(&[true, false, true]).unwrap();
        assert_eq!(ds.column("plate"), Some(&Column::Int(vec![266, 268])));
        assert_eq!(ds.column("z"), Some(&Column::Float(vec![0.1, 0.3])));
    }

    #[test]
    fn ragged_table_has_no_row_count() {
        let mut ds = sample();
        ds.replace_column_unaligned(1, Column::Float(vec![0.1]));
        assert_eq!(ds.row_count(), None);
        assert!(matches!(
            ds.require_rows("test"),
            Err(SpectraError::RaggedDataset { .. })
        ));
    }

    #[test]
    fn independent_filtering_with_equal_lengths_is_still_unaligned() {
        let mut ds = sample();
        ds.replace_column_unaligned(1, Column::Float(vec![0.2, 0.3, 0.4]));
        assert_eq!(ds.row_count(), None);
        assert!(matches!(
            ds.take_rows(&[0]),
            Err(SpectraError::RaggedDataset { .. })
        ));
        assert_eq!(ds.select(&["plate", "z"]).unwrap().row_count(), None);
        // a single column is trivially aligned with itself
        assert_eq!(ds.select(&["z"]).unwrap().row_count(), Some(3));
        ds.remove_column("plate");
        assert_eq!(ds.row_count(), Some(3));
    }

    #[test]
    fn take_rows_rejects_out_of_range_rows() {
        let err = sample().take_rows(&[0, 3]).unwrap_err();
        assert!(matches!(err, SpectraError::InvalidInput(msg) if msg.contains("row 3")));
    }

    #[test]
    fn select_reports_missing_column() {
        let err = sample().select(&["plate", "mjd"]).unwrap_err();
        assert!(matches!(err, SpectraError::MissingColumn { column } if column == "mjd"));
    }

    #[test]
    fn integer_lookup_from_float_cells() {
        let col = Column::Float(vec![3.0, 3.5]);
        assert_eq!(col.get_i64(0), Some(3));
        assert_eq!(col.get_i64(1), None);
    }

    #[test]
    fn to_rows_is_row_major() {
        let rows = sample().to_rows().unwrap();
        assert_eq!(rows[1], vec![267.0, 0.2]);
    }
}
