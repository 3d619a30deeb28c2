//! Directory listing server.
//!
//! Regular files below the served root are streamed as-is; directories are
//! rendered as sortable, paginated listings.

pub mod config;
pub mod entry;
pub mod error;
pub mod listing;
pub mod prefs;
pub mod render;
pub mod resolve;
pub mod server;
pub mod sort;

pub use config::{Args, ServerConfig};
pub use error::{ListingError, WriteError};
pub use server::router;
