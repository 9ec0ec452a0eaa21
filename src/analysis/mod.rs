//! File analysis for extracted artifacts
//!
//! Produces a [`FileReport`] per file: configured digests computed in one pass
//! over the content, a MIME type sniffed from the first bytes, and executable
//! metadata for files carrying a DOS header.

mod operations;
pub mod pe;
mod types;

pub(crate) use operations::report_entry;
pub use operations::{file_info, try_file_info};
pub use pe::{ExecutableAnalyzer, PeHeaderAnalyzer, MAX_PE_SIZE};
pub use types::{AnalyzerOutcome, FileReport, PeInfo};
