//! Column-oriented tables and their columnar (Parquet) and R-readable (CSV) sinks.

use crate::error::{PipelineError, PipelineResult};
use arrow_array::cast::AsArray;
use arrow_array::types::{Float64Type, Int64Type};
use arrow_array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use indexmap::IndexMap;
use log::debug;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

/// One scalar value. Nested JSON never reaches a cell; it is either flattened
/// into more columns or carried as its JSON text.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(n) => Some(*n),
            Cell::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    fn to_csv_field(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Bool(true) => "TRUE".to_owned(),
            Cell::Bool(false) => "FALSE".to_owned(),
            Cell::Int(n) => n.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }

    fn to_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Cell::Null => None,
            Cell::Text(s) => Some(Cow::Borrowed(s)),
            other => Some(Cow::Owned(other.to_csv_field())),
        }
    }

    fn kind(&self) -> Option<Kind> {
        match self {
            Cell::Null => None,
            Cell::Bool(_) => Some(Kind::Bool),
            Cell::Int(_) => Some(Kind::Int),
            Cell::Float(_) => Some(Kind::Float),
            Cell::Text(_) => Some(Kind::Text),
        }
    }
}

impl From<&Value> for Cell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
            },
            Value::String(s) => Cell::Text(s.clone()),
            nested => Cell::Text(nested.to_string()),
        }
    }
}

impl From<&Cell> for Value {
    fn from(cell: &Cell) -> Self {
        match cell {
            Cell::Null => Value::Null,
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Int(n) => Value::from(*n),
            Cell::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Text(s) => Value::String(s.clone()),
        }
    }
}

/// One record on its way into (or out of) a [`Table`].
pub type Row = IndexMap<String, Cell>;

/// Storage type of a column, widened as values arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bool,
    Int,
    Float,
    Text,
}

/// The narrowest kind holding both sides: int and float meet at float,
/// any other disagreement falls back to text.
fn widen(seen: Option<Kind>, next: Option<Kind>) -> Option<Kind> {
    match (seen, next) {
        (a, None) => a,
        (None, b) => b,
        (Some(a), Some(b)) if a == b => Some(a),
        (Some(Kind::Int), Some(Kind::Float)) | (Some(Kind::Float), Some(Kind::Int)) => {
            Some(Kind::Float)
        }
        _ => Some(Kind::Text),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Column {
    cells: Vec<Cell>,
    kind: Option<Kind>,
}

impl Column {
    fn nulls(len: usize) -> Self {
        Self {
            cells: vec![Cell::Null; len],
            kind: None,
        }
    }

    fn from_cells(cells: Vec<Cell>) -> Self {
        let kind = cells.iter().fold(None, |kind, cell| widen(kind, cell.kind()));
        Self { cells, kind }
    }

    fn push(&mut self, cell: Cell) {
        self.kind = widen(self.kind, cell.kind());
        self.cells.push(cell);
    }

    fn extend(&mut self, other: Column) {
        self.kind = widen(self.kind, other.kind);
        self.cells.extend(other.cells);
    }

    fn fill_to(&mut self, len: usize) {
        if self.cells.len() < len {
            self.cells.resize(len, Cell::Null);
        }
    }

    /// Arrow type: bool, int64 or float64 when every non-null value fits,
    /// otherwise utf8. An all-null column is utf8.
    fn data_type(&self) -> DataType {
        match self.kind {
            Some(Kind::Bool) => DataType::Boolean,
            Some(Kind::Int) => DataType::Int64,
            Some(Kind::Float) => DataType::Float64,
            Some(Kind::Text) | None => DataType::Utf8,
        }
    }

    fn to_array(&self) -> ArrayRef {
        let cells = self.cells.iter();
        match self.kind {
            Some(Kind::Bool) => Arc::new(cells.map(Cell::as_bool).collect::<BooleanArray>()),
            Some(Kind::Int) => Arc::new(
                cells
                    .map(|c| match c {
                        Cell::Int(n) => Some(*n),
                        _ => None,
                    })
                    .collect::<Int64Array>(),
            ),
            Some(Kind::Float) => Arc::new(
                cells
                    .map(|c| match c {
                        Cell::Int(n) => Some(*n as f64),
                        Cell::Float(f) => Some(*f),
                        _ => None,
                    })
                    .collect::<Float64Array>(),
            ),
            Some(Kind::Text) | None => Arc::new(cells.map(Cell::to_text).collect::<StringArray>()),
        }
    }

    fn from_array(name: &str, array: &ArrayRef) -> PipelineResult<Self> {
        let cells: Vec<Cell> = match array.data_type() {
            DataType::Boolean => array
                .as_boolean()
                .iter()
                .map(|v| v.map_or(Cell::Null, Cell::Bool))
                .collect(),
            DataType::Int64 => array
                .as_primitive::<Int64Type>()
                .iter()
                .map(|v| v.map_or(Cell::Null, Cell::Int))
                .collect(),
            DataType::Float64 => array
                .as_primitive::<Float64Type>()
                .iter()
                .map(|v| v.map_or(Cell::Null, Cell::Float))
                .collect(),
            DataType::Utf8 => array
                .as_string::<i32>()
                .iter()
                .map(|v| v.map_or(Cell::Null, |s| Cell::Text(s.to_owned())))
                .collect(),
            other => {
                return Err(PipelineError::Table(format!(
                    "unsupported column type {other} for `{name}`"
                )));
            }
        };
        Ok(Self::from_cells(cells))
    }
}

/// A table whose columns are the union of its rows' keys, in first-seen order.
/// Cells are stored per column; a row without some column holds
/// [`Cell::Null`] there, including columns that first appear after it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: IndexMap<String, Column>,
    len: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut table = Self::new();
        for row in rows {
            table.push(row);
        }
        table
    }

    pub fn push(&mut self, row: Row) {
        let len = self.len;
        for (name, cell) in row {
            self.columns
                .entry(name)
                .or_insert_with(|| Column::nulls(len))
                .push(cell);
        }
        self.len += 1;
        self.fill_columns();
    }

    pub fn append(&mut self, other: Table) {
        let len = self.len;
        for (name, column) in other.columns {
            self.columns
                .entry(name)
                .or_insert_with(|| Column::nulls(len))
                .extend(column);
        }
        self.len += other.len;
        self.fill_columns();
    }

    fn fill_columns(&mut self) {
        let len = self.len;
        for column in self.columns.values_mut() {
            column.fill_to(len);
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn columns(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.columns.get(name).map(|c| c.cells.as_slice())
    }

    /// Rows rebuilt from the columns, in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.len).map(move |i| {
            self.columns
                .iter()
                .map(|(name, column)| (name.clone(), column.cells[i].clone()))
                .collect()
        })
    }

    pub fn distinct_i64(&self, name: &str) -> HashSet<i64> {
        self.column(name)
            .unwrap_or_default()
            .iter()
            .filter_map(Cell::as_i64)
            .collect()
    }

    #[cfg(test)]
    fn column_type(&self, name: &str) -> DataType {
        self.columns
            .get(name)
            .map(Column::data_type)
            .unwrap_or(DataType::Utf8)
    }

    fn to_record_batch(&self) -> PipelineResult<RecordBatch> {
        let mut fields = Vec::with_capacity(self.columns.len());
        let mut arrays = Vec::with_capacity(self.columns.len());
        for (name, column) in &self.columns {
            fields.push(Field::new(name.as_str(), column.data_type(), true));
            arrays.push(column.to_array());
        }
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }

    fn from_record_batch(batch: &RecordBatch) -> PipelineResult<Self> {
        let schema = batch.schema();
        let mut columns = IndexMap::with_capacity(schema.fields().len());
        for (field, array) in schema.fields().iter().zip(batch.columns()) {
            columns.insert(field.name().clone(), Column::from_array(field.name(), array)?);
        }
        Ok(Self {
            columns,
            len: batch.num_rows(),
        })
    }
}

/// Whole-file writer/reader for season tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableWriter;

impl TableWriter {
    /// Writes the table as Parquet, replacing any existing file.
    pub fn write_parquet(&self, table: &Table, path: &Path) -> PipelineResult<()> {
        ensure_parent(path)?;
        let batch = table.to_record_batch()?;
        let file = File::create(path).map_err(PipelineError::io(path))?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;
        debug!("wrote {} rows to {}", table.len(), path.display());
        Ok(())
    }

    /// Writes the table as CSV with a header row. Booleans are `TRUE`/`FALSE`
    /// and nulls are empty fields, which is what R's readers expect.
    pub fn write_csv(&self, table: &Table, path: &Path) -> PipelineResult<()> {
        ensure_parent(path)?;
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(table.columns.keys())?;
        for i in 0..table.len {
            writer.write_record(table.columns.values().map(|c| c.cells[i].to_csv_field()))?;
        }
        writer.flush().map_err(PipelineError::io(path))?;
        Ok(())
    }

    pub fn write_both(&self, table: &Table, parquet: &Path, csv: &Path) -> PipelineResult<()> {
        self.write_parquet(table, parquet)?;
        self.write_csv(table, csv)
    }

    pub fn read_parquet(&self, path: &Path) -> PipelineResult<Table> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::MissingArtifact(path.to_path_buf()));
            }
            Err(e) => return Err(PipelineError::Io(e, path.to_path_buf())),
        };
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut table = Table::new();
        for batch in reader {
            table.append(Table::from_record_batch(&batch?)?);
        }
        Ok(table)
    }
}

fn ensure_parent(path: &Path) -> PipelineResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(PipelineError::io(parent))?;
    }
    Ok(())
}

/// Flatten a JSON object into `row`, joining nested keys with `_`.
/// Arrays are kept as their JSON text.
pub fn flatten_into(row: &mut Row, prefix: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}_{key}")
                };
                flatten_into(row, &name, child);
            }
        }
        scalar => {
            row.insert(prefix.to_owned(), Cell::from(scalar));
        }
    }
}
