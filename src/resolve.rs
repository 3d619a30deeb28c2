//! Maps request paths onto the served root.
//!
//! Every path that reaches the filesystem goes through [`sanitized_join`],
//! which cleans the request path as if it were rooted before joining it to
//! the served root. No sequence of `..` segments can climb above the root.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ListingError;

/// Lexically cleans a slash-separated URL path.
///
/// Collapses repeated separators, drops `.` segments and resolves `..`
/// against the preceding segment. A rooted path never climbs above `/`.
/// The empty path cleans to `.`.
pub fn clean_url_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Joins URL path segments and cleans the result.
pub fn join_url_path(base: &str, name: &str) -> String {
    clean_url_path(&format!("{}/{}", base, name))
}

/// Joins `request_path` onto `root` so that the result cannot leave `root`.
///
/// A trailing separator on `request_path` is kept on the result unless the
/// request is for the root itself.
pub fn sanitized_join(root: &Path, request_path: &str) -> PathBuf {
    let mut joined = if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root.to_path_buf()
    };
    let cleaned = clean_url_path(&format!("/{}", request_path));
    for segment in cleaned.split('/').filter(|s| !s.is_empty()) {
        joined.push(segment);
    }

    if request_path.ends_with('/') && request_path.len() > 1 {
        let mut raw = joined.into_os_string();
        raw.push(std::path::MAIN_SEPARATOR_STR);
        joined = PathBuf::from(raw);
    }
    joined
}

/// Strips the mount point from a URI path.
///
/// Returns `None` when the path is not under `mount`. The remainder keeps
/// its trailing slash and always starts with `/`.
pub fn strip_mount<'a>(uri_path: &'a str, mount: &str) -> Option<&'a str> {
    let mount = mount.trim_end_matches('/');
    if mount.is_empty() {
        return Some(uri_path);
    }
    let rest = uri_path.strip_prefix(mount)?;
    if rest.is_empty() {
        Some("/")
    } else if rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// A request path resolved and stat'ed below the served root.
#[derive(Debug)]
pub struct Resolved {
    pub path: PathBuf,
    pub metadata: fs::Metadata,
}

impl Resolved {
    pub fn is_dir(&self) -> bool {
        self.metadata.is_dir()
    }
}

/// Resolves and stats the requested path.
///
/// Symlinks are followed; a failed stat is classified as not found,
/// permission denied or internal.
pub fn resolve_request(root: &Path, request_path: &str) -> Result<Resolved, ListingError> {
    let path = sanitized_join(root, request_path);
    match fs::metadata(&path) {
        Ok(metadata) => Ok(Resolved { path, metadata }),
        // a trailing slash on a regular file
        Err(e) if e.kind() == std::io::ErrorKind::NotADirectory => {
            Err(ListingError::NotFound(path))
        }
        Err(e) => Err(ListingError::from_stat(path, e)),
    }
}

/// What a symlink points at, when that can be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub is_dir: bool,
    pub size: u64,
}

/// Looks up the target of a symlink found in a listed directory.
pub trait TargetResolver {
    /// Returns `None` when the target cannot be stat'ed. Callers fall back
    /// to the link's own metadata in that case.
    fn resolve(&self, url_path: &str, name: &str) -> Option<Target>;
}

/// Resolves symlink targets on the real filesystem below `root`.
#[derive(Debug, Clone)]
pub struct FsResolver {
    root: PathBuf,
}

impl FsResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TargetResolver for FsResolver {
    fn resolve(&self, url_path: &str, name: &str) -> Option<Target> {
        let link = sanitized_join(&self.root, &join_url_path(url_path, name));
        let metadata = fs::metadata(link).ok()?;
        Some(Target {
            is_dir: metadata.is_dir(),
            size: metadata.len(),
        })
    }
}
