//! Local block-device enumeration and attachment matching.
//!
//! The provider can only say that a volume is attached; the operating system
//! decides what the device is called. The matcher correlates a before/after
//! snapshot of `/sys/block` with the expected byte size to find the one
//! device that appeared. If another device of the identical size shows up in
//! the same window the match is ambiguous and fails loudly; callers must
//! serialize attach operations rather than rely on a tie-break.

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;

/// Number of bytes per sector as reported by sysfs size files.
pub const SECTOR_SIZE: u64 = 512;

const SYS_BLOCK: &str = "/sys/block";

/// Errors raised while enumerating or matching local block devices.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DeviceError {
    /// Raised when a sysfs path cannot be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when a sysfs size file does not contain a sector count.
    #[error("unparsable sector count for {name}: {content}")]
    Parse {
        /// Device the size file belongs to.
        name: String,
        /// Content that failed to parse.
        content: String,
    },
    /// Raised when no new device of the expected size appeared.
    #[error("cannot find a device matching the expected size")]
    NotFound,
    /// Raised when more than one new device matches the expected size.
    #[error("found more than one device matching the expected size: {first} and {second}")]
    Ambiguous {
        /// First matching device name.
        first: String,
        /// Second matching device name.
        second: String,
    },
}

/// Local block-device enumeration collaborator.
pub trait DeviceEnumerator {
    /// Lists the device names currently visible to the operating system.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Io`] when the device directory cannot be read.
    fn list(&self) -> Result<BTreeSet<String>, DeviceError>;

    /// Returns the raw size of a device in 512-byte sectors.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Io`] when the size file cannot be read and
    /// [`DeviceError::Parse`] when its content is not a number.
    fn size_in_sectors(&self, name: &str) -> Result<u64, DeviceError>;
}

/// Enumerator backed by the kernel's `/sys/block` directory.
pub struct SysBlock {
    root: Utf8PathBuf,
    dir: Dir,
}

impl SysBlock {
    /// Opens the real sysfs block directory.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Io`] when `/sys/block` cannot be opened.
    pub fn open() -> Result<Self, DeviceError> {
        Self::open_at(Utf8Path::new(SYS_BLOCK))
    }

    /// Opens an alternative block directory, used by tests.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Io`] when the directory cannot be opened.
    pub fn open_at(root: &Utf8Path) -> Result<Self, DeviceError> {
        let dir =
            Dir::open_ambient_dir(root, ambient_authority()).map_err(|err| DeviceError::Io {
                path: root.to_string(),
                message: err.to_string(),
            })?;
        Ok(Self {
            root: root.to_path_buf(),
            dir,
        })
    }
}

impl DeviceEnumerator for SysBlock {
    fn list(&self) -> Result<BTreeSet<String>, DeviceError> {
        let entries = self.dir.entries().map_err(|err| DeviceError::Io {
            path: self.root.to_string(),
            message: err.to_string(),
        })?;
        let mut names = BTreeSet::new();
        for entry in entries {
            let name = entry
                .and_then(|found| found.file_name())
                .map_err(|err| DeviceError::Io {
                    path: self.root.to_string(),
                    message: err.to_string(),
                })?;
            names.insert(name);
        }
        Ok(names)
    }

    fn size_in_sectors(&self, name: &str) -> Result<u64, DeviceError> {
        let path = format!("{name}/size");
        let content = self
            .dir
            .read_to_string(&path)
            .map_err(|err| DeviceError::Io {
                path,
                message: err.to_string(),
            })?;
        content
            .trim()
            .parse::<u64>()
            .map_err(|_| DeviceError::Parse {
                name: name.to_owned(),
                content: content.trim().to_owned(),
            })
    }
}

/// Identifies the device that appeared since `before` and matches the
/// expected size exactly.
///
/// # Errors
///
/// Returns [`DeviceError::NotFound`] when no new device of that size exists
/// and [`DeviceError::Ambiguous`] when more than one does.
pub fn find_attached_device<D: DeviceEnumerator>(
    devices: &D,
    before: &BTreeSet<String>,
    expected_size_bytes: u64,
) -> Result<String, DeviceError> {
    let current = devices.list()?;
    let mut matched: Option<String> = None;
    for name in current.difference(before) {
        let size_bytes = devices.size_in_sectors(name)? * SECTOR_SIZE;
        if size_bytes != expected_size_bytes {
            continue;
        }
        match matched {
            Some(first) => {
                return Err(DeviceError::Ambiguous {
                    first,
                    second: name.clone(),
                });
            }
            None => matched = Some(name.clone()),
        }
    }
    matched.ok_or(DeviceError::NotFound)
}
