use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

// --- Configuration ---
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The root directory to serve files from
    #[arg(short, long, env = "ROOT", value_name = "DIR", default_value = ".")]
    pub root_dir: PathBuf,

    /// The network address to bind to
    #[arg(
        short,
        long,
        env = "BIND_ADDR",
        value_name = "ADDR",
        default_value = "127.0.0.1:8080"
    )]
    pub bind_addr: SocketAddr,

    /// URL path the listing is mounted under
    #[arg(long, env = "RELATIVE_PATH", value_name = "PATH", default_value = "/")]
    pub relative_path: String,

    /// Enable upload and delete behind HTTP basic auth
    #[arg(long, env = "AUTH")]
    pub auth: bool,

    #[arg(long, env = "AUTH_USER", default_value = "admin")]
    pub auth_user: String,

    #[arg(long, env = "AUTH_PASS", default_value = "admin", hide_env_values = true)]
    pub auth_pass: String,

    /// Maximum upload request size in bytes
    #[arg(long, env = "MAX_UPLOAD", value_name = "BYTES", default_value_t = 32 * 1024 * 1024)]
    pub max_upload: usize,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve root directory '{path}': {source}")]
    RootUnresolvable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("root path '{0}' is not a directory")]
    RootNotDirectory(PathBuf),

    #[error("URL parameters can not be used when serving a static folder: {0}")]
    InvalidMount(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

/// Validated server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Canonical, absolute served root.
    pub root: PathBuf,
    /// Mount point, always starting with `/` and without a trailing slash
    /// unless it is `/` itself.
    pub mount: String,
    /// Present when the write surface is enabled.
    pub auth: Option<Credentials>,
    pub max_upload: usize,
}

impl ServerConfig {
    /// Config for serving `root` at `/` with the write surface disabled.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mount: "/".to_string(),
            auth: None,
            max_upload: 32 * 1024 * 1024,
        }
    }

    pub fn writable(&self) -> bool {
        self.auth.is_some()
    }
}

impl TryFrom<&Args> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let root = args
            .root_dir
            .canonicalize()
            .map_err(|source| ConfigError::RootUnresolvable {
                path: args.root_dir.clone(),
                source,
            })?;
        if !root.is_dir() {
            return Err(ConfigError::RootNotDirectory(root));
        }

        let auth = args.auth.then(|| Credentials {
            user: args.auth_user.clone(),
            pass: args.auth_pass.clone(),
        });

        Ok(Self {
            root,
            mount: normalize_mount(&args.relative_path)?,
            auth,
            max_upload: args.max_upload,
        })
    }
}

/// Normalizes the mount point: adds a leading `/` and drops trailing ones.
pub fn normalize_mount(raw: &str) -> Result<String, ConfigError> {
    if raw.contains(':') || raw.contains('*') {
        return Err(ConfigError::InvalidMount(raw.to_string()));
    }
    let trimmed = raw.trim_matches('/');
    Ok(format!("/{}", trimmed))
}
