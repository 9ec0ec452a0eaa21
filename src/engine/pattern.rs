//! Pattern expansion
//!
//! A path expression is split into segments, each of which is one of:
//!
//! ```text
//! literal     Windows            case-insensitive name match
//! glob        *.evtx, ntuser.?at shell-style, case-insensitive
//! recursive   **, **3, **-1      frontier plus descendants down to depth
//! ```
//!
//! Expansion keeps a frontier of entries, starting at the root. Every segment
//! replaces the frontier with the matching children of its members. A recursive
//! marker adds all descendant directories (bounded by depth, cycles broken by
//! inode); as the final segment it yields every descendant of any kind instead.
//! Results are deduplicated by path.

use std::collections::HashSet;
use std::sync::OnceLock;

use glob::{MatchOptions, Pattern};
use regex::Regex;
use tracing::{instrument, trace};

use crate::address::DeviceAddress;
use crate::driver::{FsHandle, Inode};
use crate::error::{EngineError, EngineResult};

use super::types::{Entry, EntryKind};
use super::walker::{list_children, names_match, root_entry};

/// `**`, `**<depth>` or `**-<n>` (negative is unbounded)
fn recursive_regex() -> &'static Regex {
    static RECURSIVE_REGEX: OnceLock<Regex> = OnceLock::new();
    RECURSIVE_REGEX.get_or_init(|| Regex::new(r"^\*\*(-\d+|\d*)$").expect("Invalid recursion regex"))
}

fn glob_regex() -> &'static Regex {
    static GLOB_REGEX: OnceLock<Regex> = OnceLock::new();
    GLOB_REGEX.get_or_init(|| Regex::new(r"\*|\?|\[.+\]").expect("Invalid glob regex"))
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// One parsed segment of a path expression
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Glob(Pattern),
    /// Depth limit; `None` is unbounded
    Recursive(Option<usize>),
}

impl Segment {
    fn matches(&self, name: &str) -> bool {
        match self {
            Segment::Literal(literal) => names_match(name, literal),
            Segment::Glob(pattern) => pattern.matches_with(&name.to_lowercase(), MATCH_OPTIONS),
            Segment::Recursive(_) => false,
        }
    }
}

fn parse_segment(raw: &str) -> EngineResult<Segment> {
    if let Some(caps) = recursive_regex().captures(raw) {
        let depth = match caps.get(1).map(|m| m.as_str()).unwrap_or("") {
            "" => None,
            negative if negative.starts_with('-') => None,
            digits => Some(digits.parse::<usize>().map_err(|e| {
                EngineError::InvalidPattern(format!("recursion depth '{}': {}", digits, e))
            })?),
        };
        return Ok(Segment::Recursive(depth));
    }
    if raw.contains("**") {
        return Err(EngineError::InvalidPattern(format!(
            "'{}': recursive marker must be a whole segment",
            raw
        )));
    }
    if glob_regex().is_match(raw) {
        // glob folds ASCII only; both sides are lowercased for full Unicode folding
        return Ok(Segment::Glob(Pattern::new(&raw.to_lowercase())?));
    }
    Ok(Segment::Literal(raw.to_string()))
}

/// Parse `expression` (mountpoint already implied by `address`)
pub fn parse_expression(address: &DeviceAddress, expression: &str) -> EngineResult<Vec<Segment>> {
    let segments = address
        .segments(expression)
        .into_iter()
        .map(parse_segment)
        .collect::<EngineResult<Vec<_>>>()?;

    let markers = segments
        .iter()
        .filter(|s| matches!(s, Segment::Recursive(_)))
        .count();
    if markers > 1 {
        return Err(EngineError::InvalidPattern(format!(
            "'{}': at most one recursive marker is allowed",
            expression
        )));
    }
    Ok(segments)
}

/// Insertion-ordered, path-unique collection of entries
#[derive(Default)]
struct Frontier {
    entries: Vec<Entry>,
    seen: HashSet<String>,
}

impl Frontier {
    fn push(&mut self, entry: Entry) {
        if self.seen.insert(entry.path.clone()) {
            self.entries.push(entry);
        }
    }
}

/// Children of `entry`, or nothing when it cannot be opened as a directory
fn children_or_skip(fs: &dyn FsHandle, address: &DeviceAddress, entry: &Entry) -> Vec<Entry> {
    if entry.kind == EntryKind::Regular {
        return Vec::new();
    }
    match list_children(fs, address, entry) {
        Ok(children) => children,
        Err(e) => {
            trace!(path = %entry.path, error = %e, "Skipping unexpandable entry");
            Vec::new()
        }
    }
}

/// Breadth-first descendants of `start`, any kind, down to `depth` levels
fn descendants(
    fs: &dyn FsHandle,
    address: &DeviceAddress,
    start: &[Entry],
    depth: Option<usize>,
) -> Vec<Entry> {
    let mut visited: HashSet<Inode> = start.iter().map(|e| e.raw.inode).collect();
    let mut found = Vec::new();
    let mut level: Vec<Entry> = start.to_vec();
    let mut current_depth = 0usize;

    while !level.is_empty() && depth.map_or(true, |d| current_depth < d) {
        current_depth += 1;
        let mut next = Vec::new();
        for entry in &level {
            for child in children_or_skip(fs, address, entry) {
                if child.kind != EntryKind::Regular && !visited.insert(child.raw.inode) {
                    trace!(path = %child.path, inode = child.raw.inode, "Directory cycle broken");
                    continue;
                }
                found.push(child.clone());
                next.push(child);
            }
        }
        level = next;
    }
    found
}

/// Expand `expression` against an opened filesystem
#[instrument(skip(fs, address), fields(mountpoint = %address.mountpoint))]
pub fn expand(fs: &dyn FsHandle, address: &DeviceAddress, expression: &str) -> EngineResult<Vec<Entry>> {
    let segments = parse_expression(address, expression)?;
    let mut frontier = vec![root_entry(fs, address)?];
    let last = segments.len().saturating_sub(1);

    for (index, segment) in segments.iter().enumerate() {
        let mut next = Frontier::default();
        match segment {
            Segment::Recursive(depth) if index == last => {
                for entry in descendants(fs, address, &frontier, *depth) {
                    next.push(entry);
                }
            }
            Segment::Recursive(depth) => {
                let found = descendants(fs, address, &frontier, *depth);
                for entry in frontier {
                    next.push(entry);
                }
                for entry in found.into_iter().filter(|e| e.kind != EntryKind::Regular) {
                    next.push(entry);
                }
            }
            Segment::Literal(_) | Segment::Glob(_) => {
                for entry in &frontier {
                    for child in children_or_skip(fs, address, entry) {
                        if segment.matches(&child.name) {
                            next.push(child);
                        }
                    }
                }
            }
        }
        frontier = next.entries;
        trace!(segment = index, size = frontier.len(), "Frontier advanced");
        if frontier.is_empty() {
            break;
        }
    }

    Ok(frontier)
}
