//! Sorting and pagination of a built [`Listing`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::entry::Entry;
use crate::listing::Listing;

/// Size assigned to directories when sorting by size, below any file size.
pub const DIRECTORY_SENTINEL: i64 = i64::MIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Name,
    NameDirFirst,
    Size,
    Time,
}

impl SortBy {
    pub const DEFAULT: SortBy = SortBy::NameDirFirst;

    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::Name => "name",
            SortBy::NameDirFirst => "name-dir-first",
            SortBy::Size => "size",
            SortBy::Time => "time",
        }
    }

    fn compare(self, a: &Entry, b: &Entry) -> Ordering {
        match self {
            SortBy::Name => by_name(a, b),
            SortBy::NameDirFirst => by_name_dir_first(a, b),
            SortBy::Size => by_size(a, b),
            SortBy::Time => a.mod_time.cmp(&b.mod_time),
        }
    }
}

impl FromStr for SortBy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortBy::Name),
            "name-dir-first" => Ok(SortBy::NameDirFirst),
            "size" => Ok(SortBy::Size),
            "time" => Ok(SortBy::Time),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub const DEFAULT: SortOrder = SortOrder::Asc;

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn by_name(a: &Entry, b: &Entry) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

fn by_name_dir_first(a: &Entry, b: &Entry) -> Ordering {
    // directories first, then by name within each kind
    b.is_dir.cmp(&a.is_dir).then_with(|| by_name(a, b))
}

fn sort_size(entry: &Entry) -> i64 {
    if entry.is_dir {
        DIRECTORY_SENTINEL
    } else {
        i64::try_from(entry.size).unwrap_or(i64::MAX)
    }
}

fn by_size(a: &Entry, b: &Entry) -> Ordering {
    // reported directory sizes depend on the filesystem
    if a.is_dir && b.is_dir {
        return by_name(a, b);
    }
    sort_size(a).cmp(&sort_size(b))
}

/// Sorts `items` in place. The sort is stable, so ties keep their
/// incoming order in both directions.
pub fn sort_entries(items: &mut [Entry], sort_by: SortBy, order: SortOrder) {
    items.sort_by(|a, b| order.apply(sort_by.compare(a, b)));
}

/// Applies the effective sort and page window to `listing`.
///
/// An unrecognized `sort` leaves the items in collection order, and an
/// unrecognized `order` sorts ascending. `offset` and `limit` are applied
/// only when they parse and fall within `1..=len`; anything else is
/// ignored.
pub fn apply_sort_and_limit(
    listing: &mut Listing,
    sort: &str,
    order: &str,
    limit: Option<&str>,
    offset: Option<&str>,
) {
    listing.sort = sort.to_string();
    listing.order = order.to_string();

    if let Ok(sort_by) = sort.parse::<SortBy>() {
        let order = order.parse().unwrap_or(SortOrder::Asc);
        sort_entries(&mut listing.items, sort_by, order);
    }

    if let Some(offset) = parse_window(offset, listing.items.len()) {
        listing.items.drain(..offset);
        listing.offset = offset;
    }

    if let Some(limit) = parse_window(limit, listing.items.len()) {
        listing.items.truncate(limit);
        listing.limit = limit;
    }
}

fn parse_window(raw: Option<&str>, len: usize) -> Option<usize> {
    let value = raw?.trim().parse::<i64>().ok()?;
    let value = usize::try_from(value).ok()?;
    (value > 0 && value <= len).then_some(value)
}
