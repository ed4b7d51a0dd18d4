use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for an uploaded dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(pub String);

impl DatasetId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for DatasetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DatasetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Upload/validation state of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetStatus {
    Idle,
    Uploading,
    Validating,
    Success,
    Error,
}

impl std::fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Validating => "validating",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Parsed dataset body: raw text for `.txt`, structured records for everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetContent {
    Text(String),
    Records(Vec<serde_json::Value>),
}

impl DatasetContent {
    /// Number of training examples: records for structured data, newline-separated
    /// segments for text. A trailing newline counts as one more (empty) line.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.split('\n').count(),
            Self::Records(records) => records.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> DatasetStats {
        match self {
            Self::Text(text) => DatasetStats::Text {
                lines: text.split('\n').count(),
                characters: text.chars().count(),
                words: text.split_whitespace().count(),
            },
            Self::Records(records) => DatasetStats::Structured {
                records: records.len(),
                fields: records.first().and_then(serde_json::Value::as_object).map_or(0, |o| o.len()),
            },
        }
    }
}

/// Summary numbers shown next to a dataset preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetStats {
    Text { lines: usize, characters: usize, words: usize },
    Structured { records: usize, fields: usize },
}

/// An uploaded dataset and the outcome of validating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: DatasetId,
    pub name: String,
    /// Raw upload size in bytes.
    pub size: u64,
    pub media_type: String,
    pub status: DatasetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<DatasetContent>,
    pub created_at: DateTime<Utc>,
}

impl DatasetRecord {
    /// Fresh record for a file that has just started uploading.
    #[must_use]
    pub fn uploading(name: &str, size: u64) -> Self {
        Self {
            id: DatasetId::new(),
            name: name.to_string(),
            size,
            media_type: mime_guess::from_path(name).first_or_octet_stream().essence_str().to_string(),
            status: DatasetStatus::Uploading,
            error: None,
            content: None,
            created_at: Utc::now(),
        }
    }

    /// True once validation succeeded and content is available.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == DatasetStatus::Success && self.content.is_some()
    }

    /// Materialized example count, zero when nothing was parsed.
    #[must_use]
    pub fn example_count(&self) -> usize {
        self.content.as_ref().map_or(0, DatasetContent::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_len_counts_lines() {
        let content = DatasetContent::Text("one\ntwo\nthree\n".to_string());
        assert_eq!(content.len(), 4);
        assert_eq!(DatasetContent::Text("one\ntwo".to_string()).len(), 2);
    }

    #[test]
    fn test_text_stats_count_trailing_newline() {
        let content = DatasetContent::Text("a\nb\n".to_string());
        assert!(matches!(content.stats(), DatasetStats::Text { lines: 3, .. }));
    }

    #[test]
    fn test_structured_stats_use_first_record_fields() {
        let content = DatasetContent::Records(vec![
            json!({"prompt": "a", "response": "b"}),
            json!({"prompt": "c", "response": "d"}),
        ]);
        assert_eq!(content.stats(), DatasetStats::Structured { records: 2, fields: 2 });
    }

    #[test]
    fn test_text_stats() {
        let content = DatasetContent::Text("hello world\nsecond line here".to_string());
        assert_eq!(content.stats(), DatasetStats::Text { lines: 2, characters: 28, words: 5 });
    }

    #[test]
    fn test_uploading_record_guesses_media_type() {
        let record = DatasetRecord::uploading("train.csv", 12);
        assert_eq!(record.status, DatasetStatus::Uploading);
        assert_eq!(record.media_type, "text/csv");
        assert!(!record.is_ready());
    }
}
