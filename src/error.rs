//! Error types for path resolution and extraction

use std::fmt;
use std::io;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while resolving or reading an image path
#[derive(Debug)]
pub enum EngineError {
    /// Device/mountpoint cannot be derived from the logical path
    Address(String),
    /// Image or device cannot be opened by the filesystem driver
    DriverOpen { device: String, source: io::Error },
    /// A path segment has no matching entry
    EntryNotFound { path: String, segment: String },
    /// Attempted to descend through something that is not a directory
    NotADirectory { path: String, source: io::Error },
    /// Underlying listing or random-access read failed
    Read { path: String, source: io::Error },
    /// Path expression could not be parsed
    InvalidPattern(String),
    /// Batch input is not a well-formed collection of paths
    MalformedBatch(String),
    /// Invalid configuration
    Config(String),
    /// Entry exceeds the configured extraction limit
    TooLarge { path: String, size: u64, limit: u64 },
}

impl EngineError {
    /// True when the failure means "nothing there" rather than a broken image
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::EntryNotFound { .. })
    }

    /// Stable short name used by the strict wire contract
    pub fn kind_name(&self) -> &'static str {
        match self {
            EngineError::Address(_) => "address",
            EngineError::DriverOpen { .. } => "driver_open",
            EngineError::EntryNotFound { .. } => "not_found",
            EngineError::NotADirectory { .. } => "not_a_directory",
            EngineError::Read { .. } => "read",
            EngineError::InvalidPattern(_) => "invalid_pattern",
            EngineError::MalformedBatch(_) => "malformed_batch",
            EngineError::Config(_) => "config",
            EngineError::TooLarge { .. } => "too_large",
        }
    }

    pub(crate) fn read(path: &str, source: io::Error) -> Self {
        EngineError::Read { path: path.to_string(), source }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Address(path) => write!(f, "Cannot derive device address from '{}'", path),
            EngineError::DriverOpen { device, source } => {
                write!(f, "Failed to open filesystem on '{}': {}", device, source)
            }
            EngineError::EntryNotFound { path, segment } => {
                write!(f, "Entry not found: '{}' (no match for segment '{}')", path, segment)
            }
            EngineError::NotADirectory { path, source } => {
                write!(f, "Not a directory: '{}': {}", path, source)
            }
            EngineError::Read { path, source } => write!(f, "Read failed for '{}': {}", path, source),
            EngineError::InvalidPattern(e) => write!(f, "Invalid path expression: {}", e),
            EngineError::MalformedBatch(e) => write!(f, "Malformed batch request: {}", e),
            EngineError::Config(e) => write!(f, "Configuration error: {}", e),
            EngineError::TooLarge { path, size, limit } => write!(
                f,
                "'{}' is {} bytes, above the extraction limit of {} bytes",
                path, size, limit
            ),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::DriverOpen { source, .. } => Some(source),
            EngineError::NotADirectory { source, .. } => Some(source),
            EngineError::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::MalformedBatch(err.to_string())
    }
}

impl From<glob::PatternError> for EngineError {
    fn from(err: glob::PatternError) -> Self {
        EngineError::InvalidPattern(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_not_found_is_distinguishable() {
        let missing = EngineError::EntryNotFound {
            path: "/a/b".into(),
            segment: "b".into(),
        };
        let broken = EngineError::read("/a", io::Error::new(io::ErrorKind::UnexpectedEof, "truncated"));

        assert!(missing.is_not_found());
        assert!(!broken.is_not_found());
        assert_eq!(missing.kind_name(), "not_found");
        assert_eq!(broken.kind_name(), "read");
    }

    #[test]
    fn test_source_is_attached() {
        let err = EngineError::read("/x", io::Error::new(io::ErrorKind::Other, "bad sector"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("bad sector"));
    }
}
