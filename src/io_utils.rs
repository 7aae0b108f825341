//! File ingestion and export for tabular datasets.
//!
//! Two source formats are recognized by extension: `.csv` (headers required,
//! cells type-inferred) and `.xlsx` (first worksheet, first row as header).
//! Anything else is rejected up front. Export is CSV only, writing the
//! feature list in order with blank cells for nulls.

use std::{fs::File, io::Write, path::Path};

use calamine::{Data, Reader, open_workbook_auto};
use log::debug;

use crate::{
    data::Value,
    error::{EngineError, Result},
    frame::{DataFrame, Record},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Xlsx,
}

pub fn detect_format(path: &Path) -> Result<FileFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "csv" => Ok(FileFormat::Csv),
        "xlsx" => Ok(FileFormat::Xlsx),
        other => Err(EngineError::UnsupportedFileType(other.to_string())),
    }
}

/// Loads a dataset from disk, dispatching on the file extension.
pub fn load_table(path: &Path) -> Result<DataFrame> {
    let format = detect_format(path)?;
    if !path.exists() {
        return Err(EngineError::FileNotFound(path.to_path_buf()));
    }
    let frame = match format {
        FileFormat::Csv => load_csv(path)?,
        FileFormat::Xlsx => load_xlsx(path)?,
    };
    debug!(
        "Loaded {} row(s) across {} feature(s) from {:?}",
        frame.row_count(),
        frame.features.len(),
        path
    );
    Ok(frame)
}

fn load_csv(path: &Path) -> Result<DataFrame> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|err| EngineError::invalid_input("load", err.to_string()))?;
    let features = reader
        .headers()
        .map_err(|err| EngineError::invalid_input("load", err.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();
    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|err| {
            EngineError::invalid_input("load", format!("row {}: {err}", row + 2))
        })?;
        let mut mapped = Record::new();
        for (idx, feature) in features.iter().enumerate() {
            let raw = record.get(idx).unwrap_or("");
            mapped.insert(feature.clone(), Value::infer(raw));
        }
        records.push(mapped);
    }
    Ok(DataFrame::new(features, records))
}

fn load_xlsx(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|err| EngineError::invalid_input("load", err.to_string()))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| EngineError::invalid_input("load", "workbook has no worksheets"))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|err| EngineError::invalid_input("load", err.to_string()))?;
    let mut rows = range.rows();
    let features = rows
        .next()
        .ok_or_else(|| EngineError::invalid_input("load", "worksheet is empty"))?
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect::<Vec<String>>();
    let mut records = Vec::new();
    for row in rows {
        let mut mapped = Record::new();
        for (idx, feature) in features.iter().enumerate() {
            let value = row.get(idx).map(cell_to_value).unwrap_or(Value::Null);
            mapped.insert(feature.clone(), value);
        }
        records.push(mapped);
    }
    Ok(DataFrame::new(features, records))
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::Integer(*i),
        Data::Float(f) => Value::Number(*f),
        Data::Bool(b) => Value::Boolean(*b),
        Data::String(s) => Value::infer(s),
        other => Value::Text(other.to_string()),
    }
}

/// Writes a frame as CSV; keys outside the feature list are dropped.
pub fn write_csv_to<W: Write>(frame: &DataFrame, writer: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().from_writer(writer);
    writer
        .write_record(&frame.features)
        .map_err(|err| EngineError::invalid_input("export", err.to_string()))?;
    for row in 0..frame.row_count() {
        let cells = frame
            .features
            .iter()
            .map(|feature| frame.value(row, feature).as_display())
            .collect::<Vec<_>>();
        writer
            .write_record(&cells)
            .map_err(|err| EngineError::invalid_input("export", err.to_string()))?;
    }
    writer
        .flush()
        .map_err(|err| EngineError::invalid_input("export", err.to_string()))?;
    Ok(())
}

pub fn write_csv(frame: &DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .map_err(|err| EngineError::invalid_input("export", format!("{path:?}: {err}")))?;
    write_csv_to(frame, file)
}
