//! JSON Lines input and output records.

use anyhow::{Context, Result};
use argmap::DebugState;
use serde::{Deserialize, Serialize};

/// One prompt/completion pair to score.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InputRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub prompt: String,
    pub completion: String,
}

/// Result line for one input record.
#[derive(Debug, Serialize)]
pub struct OutputRecord {
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<DebugState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutputRecord {
    pub fn scored(line: usize, id: Option<String>, state: DebugState) -> Self {
        Self {
            line,
            id,
            state: Some(state),
            error: None,
        }
    }

    pub fn failed(line: usize, id: Option<String>, error: impl ToString) -> Self {
        Self {
            line,
            id,
            state: None,
            error: Some(error.to_string()),
        }
    }
}

/// Parse one input line; blank lines yield `None`.
pub fn parse_line(line: &str, number: usize) -> Result<Option<InputRecord>> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .with_context(|| format!("line {number}: expected {{\"prompt\", \"completion\"}} object"))
}
