//! Reads a directory's children and normalizes them into [`Entry`] records.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use humansize::{format_size, BINARY};
use serde::Serialize;
use tracing::warn;

use crate::error::ListingError;
use crate::resolve::{Target, TargetResolver};

/// A directory child as reported by the filesystem, before symlinks are
/// looked through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub mode: u32,
}

impl RawEntry {
    /// Builds a raw entry from metadata that was read without following
    /// symlinks.
    pub fn from_metadata(name: String, metadata: &fs::Metadata) -> Self {
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Self {
            name,
            is_dir: metadata.is_dir(),
            is_symlink: metadata.file_type().is_symlink(),
            size: metadata.len(),
            modified: modified.into(),
            mode: mode_bits(metadata),
        }
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    metadata.mode()
}

#[cfg(not(unix))]
fn mode_bits(metadata: &fs::Metadata) -> u32 {
    let kind = if metadata.is_dir() {
        S_IFDIR
    } else if metadata.file_type().is_symlink() {
        S_IFLNK
    } else {
        S_IFREG
    };
    let perm = if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    };
    kind | perm
}

const S_IFMT: u32 = 0o170_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFLNK: u32 = 0o120_000;
const S_IFREG: u32 = 0o100_000;

/// The directory/symlink classification of one entry, with the size that
/// should be shown for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub is_dir: bool,
    pub is_symlink: bool,
    pub size: u64,
}

/// Classifies an entry, consulting `resolve` only for symlinks.
///
/// A symlink whose target resolves takes the target's directory flag and
/// size. An unresolvable one keeps its own metadata.
pub fn classify(raw: &RawEntry, resolve: impl FnOnce() -> Option<Target>) -> Classified {
    let target = if raw.is_symlink { resolve() } else { None };
    match target {
        Some(target) => Classified {
            is_dir: raw.is_dir || target.is_dir,
            is_symlink: true,
            size: target.size,
        },
        None => Classified {
            is_dir: raw.is_dir,
            is_symlink: raw.is_symlink,
            size: raw.size,
        },
    }
}

/// One normalized child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub name: String,
    pub size: u64,
    pub url: String,
    pub mod_time: DateTime<Utc>,
    pub mode: u32,
    pub is_dir: bool,
    pub is_symlink: bool,
}

impl Entry {
    pub fn normalize(raw: RawEntry, url_path: &str, resolver: &dyn TargetResolver) -> Self {
        let kind = classify(&raw, || resolver.resolve(url_path, &raw.name));
        let url = display_url(&raw.name, kind.is_dir);
        Self {
            name: raw.name,
            size: kind.size,
            url,
            mod_time: raw.modified,
            mode: raw.mode,
            is_dir: kind.is_dir,
            is_symlink: kind.is_symlink,
        }
    }

    /// Size in IEC units, e.g. `1.50 KiB`.
    pub fn human_size(&self) -> String {
        format_size(self.size, BINARY)
    }

    /// `ls -l` style permission string, e.g. `drwxr-xr-x`.
    pub fn mode_string(&self) -> String {
        let kind = match self.mode & S_IFMT {
            S_IFLNK => 'l',
            S_IFDIR => 'd',
            S_IFREG => '-',
            0 if self.is_symlink => 'l',
            0 if self.is_dir => 'd',
            _ => '-',
        };
        let mut out = String::with_capacity(10);
        out.push(kind);
        for shift in [6, 3, 0] {
            let bits = (self.mode >> shift) & 0o7;
            out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        out
    }
}

/// Relative link for an entry. The directory slash is appended after
/// encoding so it is never escaped.
pub fn display_url(name: &str, is_dir: bool) -> String {
    let mut url = format!("./{}", urlencoding::encode(name));
    if is_dir {
        url.push('/');
    }
    url
}

/// Reads every child of `dir` in one pass, sorted by raw name.
///
/// Children whose name or metadata cannot be read are skipped with a
/// warning.
pub fn read_entries(dir: &Path) -> Result<Vec<RawEntry>, ListingError> {
    let reader = fs::read_dir(dir).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotADirectory {
            ListingError::NotEnumerable(dir.to_path_buf())
        } else {
            ListingError::Unreadable {
                path: dir.to_path_buf(),
                source: e,
            }
        }
    })?;

    let mut entries = Vec::new();
    for entry in reader {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(
                    "Skipping entry with non-UTF8 filename {:?} in {}",
                    raw,
                    dir.display()
                );
                continue;
            }
        };
        // DirEntry::metadata does not traverse symlinks
        match entry.metadata() {
            Ok(metadata) => entries.push(RawEntry::from_metadata(name, &metadata)),
            Err(e) => {
                warn!("error reading info for {}: {}", name, e);
                continue;
            }
        }
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Reads and normalizes the children of `dir`, the directory served at
/// `url_path`.
pub fn collect(
    dir: &Path,
    url_path: &str,
    resolver: &dyn TargetResolver,
) -> Result<Vec<Entry>, ListingError> {
    let raw = read_entries(dir)?;
    Ok(raw
        .into_iter()
        .map(|raw| Entry::normalize(raw, url_path, resolver))
        .collect())
}
