use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, ResultSet};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – flat columns of ints, floats, strings or bools
/// * `.json`    – `[{ "ra": 1.0, "class": "STAR", ... }, ...]`
/// * `.csv`     – header row followed by one record per row
///
/// Numeric columns land in [`ResultSet::data`]; everything else is kept
/// as text in [`ResultSet::text`].
pub fn load_file(path: &Path) -> anyhow::Result<ResultSet> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let result = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;
    log::info!("loaded {} from {}", result.data, path.display());
    Ok(result)
}

/// Parse comma-separated text with a header row.
///
/// Lines starting with `#` are skipped, which drops the `#Table1` banner
/// SkyServer puts in front of its CSV output.
pub fn parse_csv_text(text: &str) -> Result<ResultSet> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    read_csv(&mut reader)
}

// ---------------------------------------------------------------------------
// Cell – one parsed value before column types are settled
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Cell {
    fn guess(s: &str) -> Cell {
        if s.is_empty() {
            return Cell::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Cell::Int(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Cell::Float(f);
        }
        Cell::Text(s.to_string())
    }

    fn to_text(&self) -> String {
        match self {
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Null => String::new(),
        }
    }
}

/// Settle each column's type and build the result.
///
/// * all cells integers → [`Column::Int`]
/// * all cells numeric or null → [`Column::Float`] (null → NaN)
/// * anything else → text column
fn assemble(names: Vec<String>, columns: Vec<Vec<Cell>>) -> Result<ResultSet> {
    let mut result = ResultSet::default();
    for (name, cells) in names.into_iter().zip(columns) {
        let all_int = cells.iter().all(|c| matches!(c, Cell::Int(_)));
        let all_numeric = cells
            .iter()
            .all(|c| matches!(c, Cell::Int(_) | Cell::Float(_) | Cell::Null));
        let any_value = cells.iter().any(|c| !matches!(c, Cell::Null));

        if all_int && !cells.is_empty() {
            let values = cells
                .iter()
                .map(|c| match c {
                    Cell::Int(i) => *i,
                    _ => 0,
                })
                .collect();
            result.data.insert_column(name, Column::Int(values))?;
        } else if all_numeric && (any_value || cells.is_empty()) {
            let values = cells
                .iter()
                .map(|c| match c {
                    Cell::Int(i) => *i as f64,
                    Cell::Float(f) => *f,
                    _ => f64::NAN,
                })
                .collect();
            result.data.insert_column(name, Column::Float(values))?;
        } else {
            result
                .text
                .insert(name, cells.iter().map(Cell::to_text).collect());
        }
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> anyhow::Result<ResultSet> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening CSV")?;
    read_csv(&mut reader).context("reading CSV")
}

fn read_csv<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<ResultSet> {
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record?;
        for (col, value) in record.iter().enumerate() {
            columns[col].push(Cell::guess(value));
        }
    }

    assemble(headers, columns)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "ra": 150.1, "dec": 2.2, "z": 0.41, "class": "GALAXY" },
///   ...
/// ]
/// ```
///
/// The column set is taken from the first record; every record must carry
/// the same keys.
fn load_json(path: &Path) -> anyhow::Result<ResultSet> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let names: Vec<String> = match records.first() {
        Some(first) => first
            .as_object()
            .context("Row 0 is not a JSON object")?
            .keys()
            .cloned()
            .collect(),
        None => Vec::new(),
    };
    let mut columns: Vec<Vec<Cell>> = vec![Vec::with_capacity(records.len()); names.len()];

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        if obj.len() != names.len() {
            bail!("Row {i}: expected {} fields, found {}", names.len(), obj.len());
        }
        for (col, name) in names.iter().enumerate() {
            let val = obj
                .get(name)
                .with_context(|| format!("Row {i}: missing '{name}'"))?;
            columns[col].push(json_to_cell(val));
        }
    }

    Ok(assemble(names, columns)?)
}

fn json_to_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::String(s) => Cell::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Cell::Int(i)
            } else if let Some(f) = n.as_f64() {
                Cell::Float(f)
            } else {
                Cell::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Cell::Text(b.to_string()),
        JsonValue::Null => Cell::Null,
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`), as well as `generate_sample`.
fn load_parquet(path: &Path) -> anyhow::Result<ResultSet> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); names.len()];

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, cells) in columns.iter_mut().enumerate() {
            let array = batch.column(col_idx);
            for row in 0..batch.num_rows() {
                cells.push(
                    extract_cell(array, row)
                        .with_context(|| format!("column '{}', row {row}", names[col_idx]))?,
                );
            }
        }
    }

    Ok(assemble(names, columns)?)
}

/// Extract a single value from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> anyhow::Result<Cell> {
    if col.is_null(row) {
        return Ok(Cell::Null);
    }
    let cell = match col.data_type() {
        DataType::Utf8 => {
            let s = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Cell::Text(s.value(row).to_string())
        }
        DataType::LargeUtf8 => Cell::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            Cell::Int(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            Cell::Int(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            Cell::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            Cell::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col
                .as_any()
                .downcast_ref::<BooleanArray>()
                .context("expected BooleanArray")?;
            Cell::Text(arr.value(row).to_string())
        }
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn csv_text_types_columns() {
        let text = "#Table1\nbestObjID,ra,class\n1237671939275162601,150.5,GALAXY\n1237671939275162602,151,STAR\n";
        let result = parse_csv_text(text).unwrap();

        assert_eq!(
            result.data.column("bestObjID"),
            Some(&Column::Int(vec![1237671939275162601, 1237671939275162602]))
        );
        assert_eq!(
            result.data.column("ra"),
            Some(&Column::Float(vec![150.5, 151.0]))
        );
        assert_eq!(result.text_column("class").unwrap(), ["GALAXY", "STAR"]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn empty_cells_become_nan_in_float_columns() {
        let result = parse_csv_text("a,b\n1.5,2\n,3\n").unwrap();
        let a = result.data.column("a").unwrap().to_f64();
        assert_eq!(a[0], 1.5);
        assert!(a[1].is_nan());
        assert_eq!(result.data.column("b"), Some(&Column::Int(vec![2, 3])));
    }

    #[test]
    fn loads_json_records() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"u": 7, "z": 0.4, "class": "qso"}}, {{"u": 8, "z": 0.5, "class": "star"}}]"#
        )
        .unwrap();

        let result = load_file(file.path()).unwrap();
        assert_eq!(result.data.column("u"), Some(&Column::Int(vec![7, 8])));
        assert_eq!(result.data.column("z"), Some(&Column::Float(vec![0.4, 0.5])));
        assert_eq!(result.text_column("class").unwrap(), ["qso", "star"]);
    }

    #[test]
    fn loads_csv_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "plate,mjd,fiberid").unwrap();
        writeln!(file, "266,51602,3").unwrap();

        let result = load_file(file.path()).unwrap();
        assert_eq!(result.data.row_count(), Some(1));
        assert_eq!(result.data.column_names(), ["plate", "mjd", "fiberid"]);
    }

    #[test]
    fn csv_file_skips_skyserver_banner() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "#Table1").unwrap();
        writeln!(file, "bestObjID,z,class").unwrap();
        writeln!(file, "1237648720693755918,0.12,GALAXY").unwrap();

        let result = load_file(file.path()).unwrap();
        assert_eq!(
            result.data.column("bestObjID"),
            Some(&Column::Int(vec![1237648720693755918]))
        );
        assert_eq!(result.text_column("class").unwrap(), ["GALAXY"]);
    }

    #[test]
    fn rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".fits").tempfile().unwrap();
        let err = load_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unsupported file extension"));
    }
}
