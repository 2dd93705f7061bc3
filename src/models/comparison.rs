use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Column names of the stored comparison table, in order
pub const RESULT_HEADER: [&str; 3] = ["name", "similarity", "sample_size"];

/// Header line of the tab-separated view consumed by chart clients
pub const TSV_HEADER: &str = "Name\tPearsons\tBooks";

/// Taste similarity between the requesting user and one connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub name: String,
    pub similarity: f64,
    /// Number of rating pairs that survived validation
    pub sample_size: usize,
}

/// The persisted artifact of a comparison run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub header: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonResult {
    pub fn new(rows: Vec<ComparisonRow>) -> Self {
        Self {
            header: RESULT_HEADER.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    /// Encodes the result as the JSON payload kept by the result store
    pub fn to_payload(&self) -> AppResult<String> {
        serde_json::to_string(self)
            .map_err(|e| AppError::Internal(format!("Result serialization error: {}", e)))
    }

    pub fn from_payload(payload: &str) -> AppResult<Self> {
        serde_json::from_str(payload)
            .map_err(|e| AppError::Internal(format!("Result deserialization error: {}", e)))
    }

    /// Renders the tab-separated view
    ///
    /// Tabs and line breaks inside display names become spaces so every
    /// row keeps exactly three fields.
    pub fn to_tsv(&self) -> String {
        let mut tsv = String::from(TSV_HEADER);
        tsv.push('\n');
        for row in &self.rows {
            let name: String = row
                .name
                .chars()
                .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
                .collect();
            tsv.push_str(&format!("{}\t{}\t{}\n", name, row.similarity, row.sample_size));
        }
        tsv
    }
}
