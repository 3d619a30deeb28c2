//! HTML rendering of a [`Listing`] with Maud.

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::listing::Listing;
use crate::sort::{SortBy, SortOrder};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #222; }
header { padding: 1em 2em; background: #f4f4f4; border-bottom: 1px solid #ddd; }
header h1 { font-size: 1.3em; margin: 0; }
header h1 a { color: #06c; text-decoration: none; }
.meta { padding: 0.5em 2em; color: #666; font-size: 0.9em; }
main { padding: 0 2em 2em; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 0.35em 0.6em; border-bottom: 1px solid #eee; }
th a { color: inherit; }
td.size, td.mode, td.time { white-space: nowrap; font-family: monospace; }
form.upload { margin: 1em 0; }
"#;

/// Link to the current directory with the given query, cache-busted.
fn self_link(query: &str, timestamp: i64) -> String {
    format!("?{}&timestamp={}", query, timestamp)
}

/// Column header link. The active column toggles its order, the others
/// start ascending.
fn header_link(listing: &Listing, column: SortBy) -> (String, &'static str) {
    let active = listing.sort == column.as_str();
    let current = listing.order.parse().unwrap_or(SortOrder::DEFAULT);
    let (next, marker) = match (active, current) {
        (true, SortOrder::Asc) => (SortOrder::Desc, " ▲"),
        (true, SortOrder::Desc) => (SortOrder::Asc, " ▼"),
        (false, _) => (SortOrder::Asc, ""),
    };
    let mut query = format!("sort={}&order={}", column, next);
    if listing.limit > 0 {
        query.push_str(&format!("&limit={}", listing.limit));
    }
    (self_link(&query, listing.timestamp), marker)
}

pub fn listing_page(listing: &Listing) -> Markup {
    let stamp = listing.timestamp;
    let (name_href, name_marker) = header_link(listing, SortBy::Name);
    let (size_href, size_marker) = header_link(listing, SortBy::Size);
    let (time_href, time_marker) = header_link(listing, SortBy::Time);

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (listing.name) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                header {
                    h1 {
                        @for crumb in listing.breadcrumbs() {
                            a href={ (crumb.link) "?timestamp=" (stamp) } { (crumb.text) }
                            @if crumb.text != "/" { "/" }
                        }
                    }
                }
                div class="meta" {
                    (listing.num_dirs) " directories, " (listing.num_files) " files"
                    @if listing.offset > 0 || listing.limit > 0 {
                        " (showing " (listing.items.len()) " from offset " (listing.offset) ")"
                    }
                }
                main {
                    @if listing.writable {
                        form class="upload" method="post" enctype="multipart/form-data" {
                            input type="file" name="files" multiple;
                            button type="submit" { "Upload" }
                        }
                    }
                    table {
                        thead {
                            tr {
                                th { a href=(name_href) { "Name" (name_marker) } }
                                th { a href=(size_href) { "Size" (size_marker) } }
                                th { a href=(time_href) { "Modified" (time_marker) } }
                                th { "Mode" }
                            }
                        }
                        tbody {
                            @if listing.can_go_up {
                                tr {
                                    td { a href={ "../?timestamp=" (stamp) } { "⬆ Go up" } }
                                    td class="size" { "—" }
                                    td class="time" {}
                                    td class="mode" {}
                                }
                            }
                            @for item in &listing.items {
                                tr {
                                    td {
                                        a href={ (item.url) "?timestamp=" (stamp) } {
                                            (item.name)
                                            @if item.is_dir { "/" }
                                        }
                                        @if item.is_symlink { " ↪" }
                                    }
                                    td class="size" {
                                        @if item.is_dir { "—" } @else { (item.human_size()) }
                                    }
                                    td class="time" { (item.mod_time.format("%Y-%m-%d %H:%M:%S UTC").to_string()) }
                                    td class="mode" { (item.mode_string()) }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
