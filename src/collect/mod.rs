//! Artifact collection
//!
//! A [`CollectionPlan`] is a list of `(artifact, pattern, source kind)` triples.
//! Collecting expands every pattern and turns each match into a [`CollectedItem`]:
//!
//! ```text
//! FILE       encoded content of each match
//! FILE_INFO  digest / type / executable report of each match
//! PATH       like FILE, with "**-1" appended unless the pattern ends in '*'
//! ```
//!
//! A pattern starting with a bare `\` is rooted on every configured mountpoint.
//! Failures never abort the plan; they are logged and leave an empty item behind.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::analysis::{self, ExecutableAnalyzer, FileReport};
use crate::driver::{FilesystemDriver, FsHandle};
use crate::engine::{reader, Engine, Entry, EntryKind};

/// How matches of a pattern are collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    #[default]
    File,
    FileInfo,
    Path,
}

/// One registered pattern, after mountpoint rooting and PATH recursion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedPattern {
    pub artifact: String,
    pub pattern: String,
    pub source: SourceKind,
}

/// Result of collecting one match
#[derive(Debug, Clone, Serialize)]
pub struct CollectedItem {
    pub artifact: String,
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    /// Transport-encoded content (FILE and PATH sources)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ordered set of patterns to collect
#[derive(Debug, Clone, Default)]
pub struct CollectionPlan {
    mountpoints: Vec<String>,
    patterns: Vec<PlannedPattern>,
}

impl CollectionPlan {
    /// `mountpoints` root patterns that start with a bare `\`
    pub fn new(mountpoints: Vec<String>) -> Self {
        Self {
            mountpoints,
            patterns: Vec::new(),
        }
    }

    pub fn patterns(&self) -> &[PlannedPattern] {
        &self.patterns
    }

    pub fn add_pattern(&mut self, artifact: &str, pattern: &str, source: SourceKind) {
        let pattern = match source {
            SourceKind::Path if !pattern.ends_with('*') => {
                let separator = if pattern.contains('\\') { '\\' } else { '/' };
                format!("{}{}**-1", pattern.trim_end_matches(['/', '\\']), separator)
            }
            _ => pattern.to_string(),
        };

        let rooted: Vec<String> = match pattern.strip_prefix('\\') {
            Some(rest) if !rest.starts_with('\\') => {
                if self.mountpoints.is_empty() {
                    warn!(artifact, pattern = %pattern, "No mountpoints configured for rooted pattern");
                }
                self.mountpoints
                    .iter()
                    .map(|mountpoint| join_rooted(mountpoint, rest))
                    .collect()
            }
            _ => vec![pattern.clone()],
        };

        for pattern in rooted {
            debug!(artifact, pattern = %pattern, ?source, "Pattern registered");
            self.patterns.push(PlannedPattern {
                artifact: artifact.to_string(),
                pattern,
                source,
            });
        }
    }

    /// Expand and collect every pattern, in registration order
    #[instrument(skip_all, fields(patterns = self.patterns.len()))]
    pub fn collect<D: FilesystemDriver>(
        &self,
        engine: &Engine<D>,
        analyzer: &dyn ExecutableAnalyzer,
    ) -> Vec<CollectedItem> {
        let mut items = Vec::new();
        for planned in &self.patterns {
            let outcome = engine.try_for_each_match(&planned.pattern, |fs, entry| {
                items.push(collect_entry(engine, fs, entry, planned, analyzer));
            });
            match outcome {
                Ok(count) => debug!(artifact = %planned.artifact, pattern = %planned.pattern, count, "Pattern collected"),
                Err(e) => warn!(
                    artifact = %planned.artifact,
                    pattern = %planned.pattern,
                    error = %e,
                    "Pattern could not be expanded"
                ),
            }
        }
        info!(items = items.len(), "Collection complete");
        items
    }
}

/// Root `rest` (backslash-separated) on `mountpoint`, in the mountpoint's convention
fn join_rooted(mountpoint: &str, rest: &str) -> String {
    if mountpoint.contains('\\') || mountpoint.ends_with(':') {
        format!("{}\\{}", mountpoint.trim_end_matches('\\'), rest)
    } else {
        format!("{}/{}", mountpoint.trim_end_matches('/'), rest.replace('\\', "/"))
    }
}

fn collect_entry<D: FilesystemDriver>(
    engine: &Engine<D>,
    fs: &dyn FsHandle,
    entry: Entry,
    planned: &PlannedPattern,
    analyzer: &dyn ExecutableAnalyzer,
) -> CollectedItem {
    let mut item = CollectedItem {
        artifact: planned.artifact.clone(),
        path: entry.path.clone(),
        kind: entry.kind,
        size: entry.size,
        content: None,
        file_info: None,
        error: None,
    };
    if entry.kind.is_directory() {
        return item;
    }

    match planned.source {
        SourceKind::FileInfo => match analysis::report_entry(fs, entry, engine.config(), analyzer) {
            Ok(report) => item.file_info = Some(report),
            Err(e) => {
                warn!(path = %item.path, error = %e, "File report failed");
                item.error = Some(e.to_string());
            }
        },
        SourceKind::File | SourceKind::Path => {
            match reader::read_all(fs, &entry, engine.config().max_extract_size) {
                Ok(data) => item.content = Some(engine.encode(&data)),
                Err(e) => {
                    warn!(path = %item.path, error = %e, "Content read failed");
                    item.content = Some(String::new());
                    item.error = Some(e.to_string());
                }
            }
        }
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Addressing;
    use crate::analysis::PeHeaderAnalyzer;
    use crate::driver::memory::Fault;
    use crate::driver::{MemoryDriver, MemoryImage};

    fn windows_engine() -> Engine<MemoryDriver> {
        let mut image = MemoryImage::new();
        let windows = image.add_dir(image.root(), "Windows");
        let system32 = image.add_dir(windows, "System32");
        let config = image.add_dir(system32, "config");
        image.add_file(config, "SAM", b"regf-sam");
        image.add_file(config, "SYSTEM", b"regf-system");
        let bad = image.add_file(config, "SECURITY", b"regf-security");
        image.set_fault(bad, Fault::FailReads);
        let prefetch = image.add_dir(windows, "Prefetch");
        image.add_file(prefetch, "CMD.EXE-0BD30981.pf", b"MAM\x04");
        let driver = MemoryDriver::new().with_volume("\\\\.\\C:", image);
        Engine::new(driver, Addressing::DriveLetter)
    }

    #[test]
    fn test_path_sources_recurse() {
        let mut plan = CollectionPlan::new(vec!["C:\\".into()]);
        plan.add_pattern("prefetch", "C:\\Windows\\Prefetch", SourceKind::Path);
        plan.add_pattern("hives", "C:\\Windows\\System32\\config\\*", SourceKind::Path);
        assert_eq!(plan.patterns()[0].pattern, "C:\\Windows\\Prefetch\\**-1");
        assert_eq!(plan.patterns()[1].pattern, "C:\\Windows\\System32\\config\\*");
    }

    #[test]
    fn test_rooted_patterns_fan_out() {
        let mut plan = CollectionPlan::new(vec!["C:\\".into(), "D:\\".into()]);
        plan.add_pattern("hives", "\\Windows\\System32\\config\\SAM", SourceKind::File);
        let patterns: Vec<&str> = plan.patterns().iter().map(|p| p.pattern.as_str()).collect();
        assert_eq!(
            patterns,
            vec!["C:\\Windows\\System32\\config\\SAM", "D:\\Windows\\System32\\config\\SAM"]
        );

        let mut empty = CollectionPlan::new(Vec::new());
        empty.add_pattern("hives", "\\Windows", SourceKind::File);
        assert!(empty.patterns().is_empty());
    }

    #[test]
    fn test_rooted_patterns_on_single_root() {
        let mut plan = CollectionPlan::new(vec!["/".into(), "C:".into()]);
        plan.add_pattern("hives", "\\Windows\\System32\\config\\SAM", SourceKind::File);
        let patterns: Vec<&str> = plan.patterns().iter().map(|p| p.pattern.as_str()).collect();
        assert_eq!(
            patterns,
            vec!["/Windows/System32/config/SAM", "C:\\Windows\\System32\\config\\SAM"]
        );

        let mut image = MemoryImage::new();
        let windows = image.add_dir(image.root(), "Windows");
        let system32 = image.add_dir(windows, "System32");
        let config = image.add_dir(system32, "config");
        image.add_file(config, "SAM", b"regf-sam");
        let engine = Engine::new(MemoryDriver::new().with_volume("/", image), Addressing::SingleRoot);

        let mut plan = CollectionPlan::new(vec!["/".into()]);
        plan.add_pattern("hives", "\\windows\\system32\\config\\sam", SourceKind::File);
        let items = plan.collect(&engine, &PeHeaderAnalyzer);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].path, "/Windows/System32/config/SAM");
        assert_eq!(items[0].content.as_deref(), Some(hex::encode(b"regf-sam").as_str()));
    }

    #[test]
    fn test_collect_files_with_failures() {
        let engine = windows_engine();
        let mut plan = CollectionPlan::new(vec!["C:\\".into(), "D:\\".into()]);
        plan.add_pattern("hives", "\\Windows\\System32\\config\\S*", SourceKind::File);
        let items = plan.collect(&engine, &PeHeaderAnalyzer);

        assert_eq!(items.len(), 3);
        let sam = items.iter().find(|i| i.path.ends_with("SAM")).unwrap();
        assert_eq!(sam.content.as_deref(), Some(hex::encode(b"regf-sam").as_str()));
        let security = items.iter().find(|i| i.path.ends_with("SECURITY")).unwrap();
        assert_eq!(security.content.as_deref(), Some(""));
        assert!(security.error.is_some());
        assert_eq!(engine.driver().live_handles(), 0);
    }

    #[test]
    fn test_collect_file_info_and_paths() {
        let engine = windows_engine();
        let mut plan = CollectionPlan::new(vec!["C:\\".into()]);
        plan.add_pattern("sam", "c:\\windows\\system32\\config\\sam", SourceKind::FileInfo);
        plan.add_pattern("prefetch", "C:\\Windows\\Prefetch", SourceKind::Path);
        plan.add_pattern("broken", "C:\\Windows\\**\\**", SourceKind::File);
        let items = plan.collect(&engine, &PeHeaderAnalyzer);

        assert_eq!(items.len(), 2);
        let report = items[0].file_info.as_ref().unwrap();
        assert_eq!(report.path, "C:\\Windows\\System32\\config\\SAM");
        assert!(report.hash.contains_key("sha256"));
        assert_eq!(items[1].artifact, "prefetch");
        assert_eq!(items[1].content.as_deref(), Some(hex::encode(b"MAM\x04").as_str()));
    }

    #[test]
    fn test_source_kind_wire_names() {
        let kind: SourceKind = serde_json::from_str("\"FILE_INFO\"").unwrap();
        assert_eq!(kind, SourceKind::FileInfo);
        assert_eq!(serde_json::to_string(&SourceKind::Path).unwrap(), "\"PATH\"");
    }
}
