use crate::error::{DatasetError, DatasetResult};
use crate::record::DatasetContent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// File formats accepted for upload, sniffed from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetFormat {
    Csv,
    Jsonl,
    Json,
    Txt,
}

impl DatasetFormat {
    pub fn from_file_name(name: &str) -> DatasetResult<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "jsonl" => Ok(Self::Jsonl),
            "json" => Ok(Self::Json),
            "txt" => Ok(Self::Txt),
            _ => Err(DatasetError::UnsupportedFormat(if ext.is_empty() { name.to_string() } else { format!(".{ext}") })),
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Jsonl => "JSONL",
            Self::Json => "JSON",
            Self::Txt => "TXT",
        }
    }

    /// Validate `content` for this format and materialize it.
    pub fn parse(self, content: &str) -> DatasetResult<DatasetContent> {
        match self {
            Self::Csv => parse_csv(content),
            Self::Jsonl => parse_jsonl(content),
            Self::Json => parse_json(content),
            Self::Txt => parse_txt(content),
        }
    }
}

fn parse_csv(content: &str) -> DatasetResult<DatasetContent> {
    let label = DatasetFormat::Csv.label();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(content.trim().as_bytes());

    let headers = reader.headers().map_err(|e| DatasetError::validation(label, e.to_string()))?.clone();
    if headers.is_empty() {
        return Err(DatasetError::validation(label, "missing header row"));
    }

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row.map_err(|e| match e.kind() {
            csv::ErrorKind::UnequalLengths { expected_len, len, .. } => DatasetError::validation(
                label,
                format!("row {} has {len} columns, expected {expected_len}", idx + 1),
            ),
            _ => DatasetError::validation(label, e.to_string()),
        })?;

        let object = headers
            .iter()
            .zip(row.iter())
            .map(|(h, v)| (h.to_string(), Value::String(v.to_string())))
            .collect::<serde_json::Map<_, _>>();
        records.push(Value::Object(object));
    }

    if records.is_empty() {
        return Err(DatasetError::validation(label, "need a header and at least one data row"));
    }
    Ok(DatasetContent::Records(records))
}

fn parse_jsonl(content: &str) -> DatasetResult<DatasetContent> {
    let label = DatasetFormat::Jsonl.label();
    let mut records = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .map_err(|e| DatasetError::validation(label, format!("line {}: {e}", idx + 1)))?;
        records.push(value);
    }

    if records.is_empty() {
        return Err(DatasetError::validation(label, "no records found"));
    }
    Ok(DatasetContent::Records(records))
}

fn parse_json(content: &str) -> DatasetResult<DatasetContent> {
    let label = DatasetFormat::Json.label();
    let value: Value = serde_json::from_str(content).map_err(|e| DatasetError::validation(label, e.to_string()))?;

    let records = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => return Err(DatasetError::validation(label, "expected a top-level array or a `data` array")),
        },
        _ => return Err(DatasetError::validation(label, "expected a top-level array or a `data` array")),
    };

    if records.is_empty() {
        return Err(DatasetError::validation(label, "dataset array is empty"));
    }
    Ok(DatasetContent::Records(records))
}

fn parse_txt(content: &str) -> DatasetResult<DatasetContent> {
    let label = DatasetFormat::Txt.label();
    if content.trim().is_empty() {
        return Err(DatasetError::validation(label, "file is empty"));
    }
    if !content.contains('\n') {
        return Err(DatasetError::validation(label, "expected at least one line break"));
    }
    Ok(DatasetContent::Text(content.to_string()))
}
