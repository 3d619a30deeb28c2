//! Assembles collected entries into the rendering context for one
//! directory view.

use std::borrow::Cow;

use serde::Serialize;

use crate::entry::Entry;

/// Everything needed to render one directory.
///
/// `num_dirs` and `num_files` describe the whole directory and are not
/// touched by pagination.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    /// Last segment of the decoded request path.
    pub name: String,
    /// The request path as given (cleaned, still percent-encoded).
    pub path: String,
    pub can_go_up: bool,
    pub items: Vec<Entry>,
    pub num_dirs: usize,
    pub num_files: usize,
    pub sort: String,
    pub order: String,
    /// Number of leading items dropped, 0 when no offset was applied.
    pub offset: usize,
    /// Page size, 0 when no limit was applied.
    pub limit: usize,
    /// Build time in unix seconds, used to bust caches on rendered links.
    pub timestamp: i64,
    /// Whether the upload form should be offered.
    #[serde(skip)]
    pub writable: bool,
}

/// Builds the listing for `url_path` from freshly collected entries.
pub fn build(items: Vec<Entry>, url_path: &str, timestamp: i64) -> Listing {
    let num_dirs = items.iter().filter(|item| item.is_dir).count();
    let num_files = items.len() - num_dirs;
    Listing {
        name: directory_name(url_path),
        path: url_path.to_string(),
        can_go_up: url_path.len() > 1,
        items,
        num_dirs,
        num_files,
        sort: String::new(),
        order: String::new(),
        offset: 0,
        limit: 0,
        timestamp,
        writable: false,
    }
}

/// Percent-decodes `raw`, keeping it unchanged if it does not decode.
pub fn decode_lossless(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

/// The last element of the decoded path; `/` for the root.
pub fn directory_name(url_path: &str) -> String {
    let decoded = decode_lossless(url_path);
    if decoded.is_empty() {
        return ".".to_string();
    }
    let trimmed = decoded.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    match trimmed.rsplit_once('/') {
        Some((_, last)) => last.to_string(),
        None => trimmed.to_string(),
    }
}

/// One clickable segment of the breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub link: String,
    pub text: String,
}

impl Listing {
    /// Splits the request path into breadcrumbs, root first.
    pub fn breadcrumbs(&self) -> Vec<Crumb> {
        breadcrumbs(&self.path)
    }
}

pub fn breadcrumbs(path: &str) -> Vec<Crumb> {
    if path.is_empty() {
        return Vec::new();
    }
    let path = path.strip_suffix('/').unwrap_or(path);
    let parts: Vec<&str> = path.split('/').collect();
    let n = parts.len();
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let text = if i == 0 && part.is_empty() {
                "/".to_string()
            } else {
                decode_lossless(part).into_owned()
            };
            Crumb {
                link: "../".repeat(n - i - 1),
                text,
            }
        })
        .collect()
}
