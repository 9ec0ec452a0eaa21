//! Device/mountpoint addressing
//!
//! Maps a caller-supplied logical path onto the device that holds it and the
//! mountpoint under which that device is addressed. The platform convention is an
//! injected [`Addressing`] value, chosen once at startup, so no call site branches
//! on the host OS.
//!
//! ```text
//! DriveLetter:  "c:\Windows\notepad.exe"  ->  device "\\.\C:", mountpoint "C:\"
//! SingleRoot:   "/etc/passwd"             ->  device None,     mountpoint "/"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Addressing convention for logical paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Addressing {
    /// `<letter>:\` prefixes, one device per letter
    DriveLetter,
    /// A single `/` root with no explicit device
    SingleRoot,
}

impl Addressing {
    /// Convention of the host this process runs on
    pub fn host() -> Self {
        if cfg!(windows) {
            Addressing::DriveLetter
        } else {
            Addressing::SingleRoot
        }
    }

    /// Separator used when joining display paths
    pub fn separator(self) -> char {
        match self {
            Addressing::DriveLetter => '\\',
            Addressing::SingleRoot => '/',
        }
    }

    /// Whether `c` separates segments under this convention.
    /// Drive-letter paths accept `/` as an alternate separator.
    pub fn is_separator(self, c: char) -> bool {
        match self {
            Addressing::DriveLetter => c == '\\' || c == '/',
            Addressing::SingleRoot => c == '/',
        }
    }

    /// Derive the device address for a logical path. No I/O.
    pub fn resolve(self, logical_path: &str) -> EngineResult<DeviceAddress> {
        match self {
            Addressing::SingleRoot => Ok(DeviceAddress {
                device: None,
                mountpoint: "/".to_string(),
                addressing: self,
            }),
            Addressing::DriveLetter => {
                let letter = drive_letter(logical_path)
                    .ok_or_else(|| EngineError::Address(logical_path.to_string()))?;
                Ok(DeviceAddress {
                    device: Some(format!("\\\\.\\{}:", letter)),
                    mountpoint: format!("{}:\\", letter),
                    addressing: self,
                })
            }
        }
    }
}

fn drive_letter(path: &str) -> Option<char> {
    let mut chars = path.chars();
    let letter = chars.next()?;
    if letter.is_ascii_alphabetic() && chars.next() == Some(':') {
        Some(letter.to_ascii_uppercase())
    } else {
        None
    }
}

/// Where a logical path lives: raw device (if any) plus its mountpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceAddress {
    pub device: Option<String>,
    pub mountpoint: String,
    #[serde(skip)]
    pub addressing: Addressing,
}

impl DeviceAddress {
    /// Identifier handed to the filesystem driver
    pub fn driver_key(&self) -> &str {
        self.device.as_deref().unwrap_or(&self.mountpoint)
    }

    /// Remove the mountpoint prefix (case-insensitive) from `path`.
    /// Paths that do not carry the prefix are returned as-is and treated as relative.
    pub fn strip_mountpoint<'a>(&self, path: &'a str) -> &'a str {
        let bare = self
            .mountpoint
            .trim_end_matches(|c: char| self.addressing.is_separator(c));
        if bare.is_empty() {
            return path;
        }
        match path.get(..bare.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(bare) => {
                let rest = &path[bare.len()..];
                match rest.chars().next() {
                    None => rest,
                    Some(c) if self.addressing.is_separator(c) => rest,
                    Some(_) => path,
                }
            }
            _ => path,
        }
    }

    /// Split a path (mountpoint stripped) into its non-empty segments
    pub fn segments<'a>(&self, path: &'a str) -> Vec<&'a str> {
        self.strip_mountpoint(path)
            .split(|c: char| self.addressing.is_separator(c))
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Join a child name onto a parent display path
    pub fn join(&self, parent: &str, name: &str) -> String {
        let sep = self.addressing.separator();
        if parent.is_empty() {
            name.to_string()
        } else if name.is_empty() {
            parent.to_string()
        } else if parent.ends_with(|c: char| self.addressing.is_separator(c)) {
            format!("{parent}{name}")
        } else {
            format!("{parent}{sep}{name}")
        }
    }
}
