//! Axum wiring: the per-request flow from URI to rendered listing, file
//! delegation and the optional upload/delete surface.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Query, Request, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use futures_util::TryStreamExt;
use http::{header, HeaderMap, HeaderValue, Method, Uri};
use tokio_util::io::StreamReader;
use tower::ServiceExt;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeFile,
    set_header::SetResponseHeaderLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    validate_request::ValidateRequestHeaderLayer,
};
use tracing::{debug, info, Level};

use crate::config::ServerConfig;
use crate::entry;
use crate::error::{ListingError, WriteError};
use crate::listing::{self, decode_lossless, Listing};
use crate::prefs::Preferences;
use crate::render;
use crate::resolve::{clean_url_path, resolve_request, sanitized_join, strip_mount, FsResolver};
use crate::sort::apply_sort_and_limit;

// --- State ---
pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: ServerConfig,
}

// --- Request Payloads ---
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListingQuery {
    /// Reads the listing parameters from `uri`. A repeated key keeps its
    /// first value; unknown keys are ignored.
    pub fn from_uri(uri: &Uri) -> Self {
        let pairs = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map(|Query(pairs)| pairs)
            .unwrap_or_default();
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "sort" => &mut query.sort,
                "order" => &mut query.order,
                "limit" => &mut query.limit,
                "offset" => &mut query.offset,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

/// Builds the application router for `config`.
pub fn router(config: ServerConfig) -> Router {
    let credentials = config.auth.clone();
    let max_upload = config.max_upload;
    let state = Arc::new(AppState { config });

    let mut files: MethodRouter<SharedState> = get(serve_path);
    if let Some(credentials) = credentials {
        let writes = post(upload)
            .delete(remove)
            .route_layer(ValidateRequestHeaderLayer::basic(
                &credentials.user,
                &credentials.pass,
            ));
        files = files.merge(writes);
    }

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::DELETE])
        .allow_origin(Any);

    Router::new()
        .route("/", files.clone())
        .route("/*path", files)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, max-age=0, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"),
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Runs blocking filesystem work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T, ListingError>
where
    F: FnOnce() -> Result<T, ListingError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ListingError::Internal(format!("listing task failed: {}", e)))?
}

/// True when the request reached us over TLS, directly or via a proxy.
fn is_secure(uri: &Uri, headers: &HeaderMap) -> bool {
    uri.scheme_str() == Some("https")
        || headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("https"))
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}

fn with_trailing_slash(uri: &Uri) -> String {
    match uri.query() {
        Some(query) => format!("{}/?{}", uri.path(), query),
        None => format!("{}/", uri.path()),
    }
}

/// GET/HEAD: lists directories and hands everything else to [`ServeFile`].
async fn serve_path(
    State(state): State<SharedState>,
    jar: CookieJar,
    request: Request,
) -> Result<Response, ListingError> {
    let uri = request.uri().clone();
    let raw_path = strip_mount(uri.path(), &state.config.mount)
        .ok_or_else(|| ListingError::NotFound(PathBuf::from(uri.path())))?
        .to_string();
    let decoded = decode_lossless(&raw_path).into_owned();

    let root = state.config.root.clone();
    let lookup = decoded.clone();
    let resolved = blocking(move || resolve_request(&root, &lookup)).await?;

    if !resolved.is_dir() {
        return Ok(serve_file(resolved.path, request).await);
    }
    // relative entry links need the directory URL to end in a slash
    if !uri.path().ends_with('/') {
        return Ok(Redirect::temporary(&with_trailing_slash(&uri)).into_response());
    }

    let secure = is_secure(&uri, request.headers());
    let json = wants_json(request.headers());
    let url_path = clean_url_path(&raw_path);
    let timestamp = Utc::now().timestamp();

    let root = state.config.root.clone();
    let mut listing: Listing = blocking(move || {
        let resolver = FsResolver::new(&root);
        let items = entry::collect(&resolved.path, &clean_url_path(&decoded), &resolver)?;
        Ok(listing::build(items, &url_path, timestamp))
    })
    .await?;

    let query = ListingQuery::from_uri(&uri);
    let prefs = Preferences::from_jar(query.sort.as_deref(), query.order.as_deref(), &jar);
    apply_sort_and_limit(
        &mut listing,
        &prefs.sort.value,
        &prefs.order.value,
        query.limit.as_deref(),
        query.offset.as_deref(),
    );
    listing.writable = state.config.writable();
    debug!(
        "Listing {} ({} dirs, {} files, sort={} order={})",
        listing.path, listing.num_dirs, listing.num_files, listing.sort, listing.order
    );

    let jar = prefs.persist(jar, &state.config.mount, secure);
    if json {
        Ok((jar, Json(listing)).into_response())
    } else {
        Ok((jar, render::listing_page(&listing)).into_response())
    }
}

/// Streams a regular file with conditional and range support.
async fn serve_file(path: PathBuf, request: Request) -> Response {
    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    match ServeFile::new_with_mime(&path, &mime)
        .oneshot(request)
        .await
    {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

/// Resolves the write target for a request URI, relative to the mount.
fn write_target(state: &AppState, uri: &Uri) -> Result<String, WriteError> {
    let raw_path = strip_mount(uri.path(), &state.config.mount)
        .ok_or_else(|| WriteError::NotFound(uri.path().to_string()))?;
    Ok(clean_url_path(&decode_lossless(raw_path)))
}

/// Where an uploaded file named `file_name` lands below `dir`.
///
/// The name may carry relative directories (folder uploads); it is
/// cleaned so it cannot leave `dir`.
pub fn upload_destination(dir: &Path, file_name: &str) -> Result<PathBuf, WriteError> {
    let cleaned = clean_url_path(&format!("/{}", file_name.replace('\\', "/")));
    if cleaned == "/" {
        return Err(WriteError::BadRequest(format!(
            "invalid file name {:?}",
            file_name
        )));
    }
    Ok(sanitized_join(dir, &cleaned))
}

/// URL of the listing a write request should return to.
fn directory_url(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

fn parent_url(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, _)) => format!("{}/", parent),
        None => "/".to_string(),
    }
}

/// POST: stores the `files` fields of a multipart form below the
/// requested directory.
async fn upload(
    State(state): State<SharedState>,
    uri: Uri,
    mut multipart: Multipart,
) -> Result<Response, WriteError> {
    let target = write_target(&state, &uri)?;
    let dir = sanitized_join(&state.config.root, &target);

    match tokio::fs::metadata(&dir).await {
        Ok(metadata) if !metadata.is_dir() => {
            return Err(WriteError::BadRequest(format!("{} is not a directory", target)));
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Err(e) => return Err(e.into()),
    }

    let mut saved = 0usize;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WriteError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            return Err(WriteError::BadRequest("filename does not exist".to_string()));
        };
        let destination = upload_destination(&dir, &file_name)?;
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&destination).await?;
        let reader = StreamReader::new(field.map_err(io::Error::other));
        tokio::pin!(reader);
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        info!("Saved upload {} ({} bytes)", destination.display(), written);
        saved += 1;
    }

    if saved == 0 {
        return Err(WriteError::BadRequest("files is null".to_string()));
    }
    Ok(Redirect::to(&directory_url(uri.path())).into_response())
}

/// DELETE: removes a file or directory tree below the root.
async fn remove(State(state): State<SharedState>, uri: Uri) -> Result<Response, WriteError> {
    let target = write_target(&state, &uri)?;
    if target == "/" {
        return Err(WriteError::Forbidden(
            "the served root can not be deleted".to_string(),
        ));
    }
    let path = sanitized_join(&state.config.root, &target);

    let metadata = match tokio::fs::symlink_metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(WriteError::NotFound(target));
        }
        Err(e) => return Err(e.into()),
    };
    if metadata.is_dir() {
        tokio::fs::remove_dir_all(&path).await?;
    } else {
        tokio::fs::remove_file(&path).await?;
    }
    info!("Deleted {}", path.display());

    Ok(Redirect::to(&parent_url(uri.path())).into_response())
}
