//! Type definitions for file analysis reports

use serde::Serialize;
use std::collections::BTreeMap;

/// Executable metadata. Version fields are present only when the analyzer
/// recovered them; `imphash` and `compilation` are empty strings when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    pub imphash: String,
    /// COFF TimeDateStamp as RFC 3339 (UTC)
    pub compilation: String,
    pub mime: String,
}

/// Analyzer result: metadata, or an error object for unparseable input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnalyzerOutcome {
    Info(PeInfo),
    Error { error: String },
}

impl AnalyzerOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        AnalyzerOutcome::Error { error: message.into() }
    }

    pub fn info(&self) -> Option<&PeInfo> {
        match self {
            AnalyzerOutcome::Info(info) => Some(info),
            AnalyzerOutcome::Error { .. } => None,
        }
    }
}

/// Digests, type and executable metadata of one file inside an image
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    #[serde(rename = "@timestamp")]
    pub timestamp: String,
    pub path: String,
    pub size: u64,
    /// Bytes actually read; lower than `size` on truncated content
    pub bytes_read: u64,
    pub mime_type: String,
    pub hash: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe: Option<AnalyzerOutcome>,
}
