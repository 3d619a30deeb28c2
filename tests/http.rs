use std::fs;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use fancy_index::config::Credentials;
use fancy_index::{router, ServerConfig};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

// admin:secret
const BASIC_AUTH: &str = "Basic YWRtaW46c2VjcmV0";

fn create_test_structure() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("b.txt"), vec![b'b'; 100]).unwrap();
    fs::write(temp_dir.path().join("a.txt"), vec![b'a'; 50]).unwrap();
    fs::create_dir(temp_dir.path().join("z")).unwrap();
    fs::write(temp_dir.path().join("z/nested.txt"), "Nested").unwrap();
    temp_dir
}

fn app(temp_dir: &TempDir) -> Router {
    router(ServerConfig::new(temp_dir.path().canonicalize().unwrap()))
}

fn writable_app(temp_dir: &TempDir) -> Router {
    let mut config = ServerConfig::new(temp_dir.path().canonicalize().unwrap());
    config.auth = Some(Credentials {
        user: "admin".into(),
        pass: "secret".into(),
    });
    router(config)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn get(app: &Router, uri: &str) -> Response {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn get_json(app: &Router, uri: &str, cookie: Option<&str>) -> (Response, Value) {
    let mut builder = Request::get(uri).header(header::ACCEPT, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let response = send(app, builder.body(Body::empty()).unwrap()).await;
    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap();
    (Response::from_parts(parts, Body::empty()), value)
}

async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn item_names(listing: &Value) -> Vec<String> {
    listing["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap().to_string())
        .collect()
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_root_listing_renders_html() {
    let temp_dir = create_test_structure();
    let app = app(&temp_dir);

    let response = get(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "no-cache, no-store, max-age=0, must-revalidate"
    );
    let body = body_string(response).await;
    assert!(body.contains("1 directories, 2 files"));
    assert!(body.contains("./a.txt?timestamp="));
    assert!(body.contains("./z/?timestamp="));
    // no go-up row at the root
    assert!(!body.contains("Go up"));
}

#[tokio::test]
async fn test_default_sort_is_directories_first() {
    let temp_dir = create_test_structure();
    let app = app(&temp_dir);

    let (response, listing) = get_json(&app, "/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(item_names(&listing), ["z", "a.txt", "b.txt"]);
    assert_eq!(listing["sort"], "name-dir-first");
    assert_eq!(listing["order"], "asc");
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_sort_param_is_persisted_and_reused() {
    let temp_dir = create_test_structure();
    let app = app(&temp_dir);

    let (response, listing) = get_json(&app, "/?sort=size&order=desc", Some("sort=name")).await;
    assert_eq!(item_names(&listing), ["b.txt", "a.txt", "z"]);
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("sort=size")));
    assert!(cookies.iter().any(|c| c.starts_with("order=desc")));

    // the browser now sends the new cookies and no parameters
    let (response, listing) = get_json(&app, "/", Some("sort=size; order=desc")).await;
    assert_eq!(listing["sort"], "size");
    assert_eq!(item_names(&listing), ["b.txt", "a.txt", "z"]);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_unrecognized_sort_is_not_persisted() {
    let temp_dir = create_test_structure();
    let app = app(&temp_dir);

    let (response, listing) = get_json(&app, "/?sort=color", None).await;
    assert_eq!(listing["sort"], "color");
    // collection order
    assert_eq!(item_names(&listing), ["a.txt", "b.txt", "z"]);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_pagination_window() {
    let temp_dir = create_test_structure();
    let app = app(&temp_dir);

    let (_, listing) = get_json(&app, "/?offset=1&limit=1", None).await;
    assert_eq!(item_names(&listing), ["a.txt"]);
    assert_eq!(listing["offset"], 1);
    assert_eq!(listing["limit"], 1);
    assert_eq!(listing["num_dirs"], 1);
    assert_eq!(listing["num_files"], 2);

    let (_, listing) = get_json(&app, "/?offset=9&limit=nope", None).await;
    assert_eq!(item_names(&listing).len(), 3);
    assert_eq!(listing["offset"], 0);
    assert_eq!(listing["limit"], 0);
}

#[tokio::test]
async fn test_repeated_query_keys_use_first_value() {
    let temp_dir = create_test_structure();
    let app = app(&temp_dir);

    let (_, listing) = get_json(&app, "/?sort=name&limit=2&sort=time", None).await;
    assert_eq!(listing["sort"], "name");
    assert_eq!(listing["limit"], 2);
    assert_eq!(item_names(&listing), ["a.txt", "b.txt"]);
}

#[tokio::test]
async fn test_files_are_streamed() {
    let temp_dir = create_test_structure();
    let app = app(&temp_dir);

    let response = get(&app, "/z/nested.txt?timestamp=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(body_string(response).await, "Nested");
}

#[tokio::test]
async fn test_file_range_request() {
    let temp_dir = create_test_structure();
    let app = app(&temp_dir);

    let request = Request::get("/z/nested.txt")
        .header(header::RANGE, "bytes=0-2")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_string(response).await, "Nes");
}

#[tokio::test]
async fn test_missing_path_is_not_found() {
    let temp_dir = create_test_structure();
    let app = app(&temp_dir);

    let response = get(&app, "/missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "file not found");
}

#[tokio::test]
async fn test_traversal_stays_inside_root() {
    let outer = TempDir::new().unwrap();
    fs::create_dir(outer.path().join("root")).unwrap();
    fs::write(outer.path().join("secret.txt"), "top secret").unwrap();
    let app = router(ServerConfig::new(
        outer.path().join("root").canonicalize().unwrap(),
    ));

    for uri in ["/../secret.txt", "/%2e%2e/secret.txt", "/a/../../secret.txt"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_directory_without_slash_redirects() {
    let temp_dir = create_test_structure();
    let app = app(&temp_dir);

    let response = get(&app, "/z?sort=size").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/z/?sort=size");

    let response = get(&app, "/z/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Go up"));
    assert!(body.contains("0 directories, 1 files"));
}

#[tokio::test]
async fn test_head_on_directory() {
    let temp_dir = create_test_structure();
    let app = app(&temp_dir);

    let request = Request::head("/").body(Body::empty()).unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.is_empty());
}

#[tokio::test]
async fn test_writes_are_not_allowed_without_auth() {
    let temp_dir = create_test_structure();
    let app = app(&temp_dir);

    for method in ["POST", "DELETE", "PUT"] {
        let request = Request::builder()
            .method(method)
            .uri("/a.txt")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", method);
    }
    assert!(temp_dir.path().join("a.txt").exists());
}

#[tokio::test]
async fn test_mount_point() {
    let temp_dir = create_test_structure();
    let mut config = ServerConfig::new(temp_dir.path().canonicalize().unwrap());
    config.mount = "/files".into();
    let app = router(config);

    assert_eq!(get(&app, "/files/").await.status(), StatusCode::OK);
    assert_eq!(get(&app, "/files/a.txt").await.status(), StatusCode::OK);
    assert_eq!(get(&app, "/other").await.status(), StatusCode::NOT_FOUND);

    let response = get(&app, "/files").await;
    assert_eq!(response.headers()[header::LOCATION], "/files/");

    let (response, _) = get_json(&app, "/files/?order=desc", None).await;
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.contains("Path=/files")));
}

#[tokio::test]
async fn test_secure_cookie_behind_tls_proxy() {
    let temp_dir = create_test_structure();
    let app = app(&temp_dir);

    let request = Request::get("/?sort=time")
        .header("x-forwarded-proto", "https")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("sort=time") && c.contains("Secure")));
}

fn multipart_body(boundary: &str, files: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, content) in files {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: text/plain\r\n\r\n{content}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    body
}

fn upload_request(uri: &str, auth: Option<&str>, files: &[(&str, &str)]) -> Request<Body> {
    let boundary = "X-FANCY-INDEX-BOUNDARY";
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", boundary),
    );
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder
        .body(Body::from(multipart_body(boundary, files)))
        .unwrap()
}

#[tokio::test]
async fn test_upload_requires_credentials() {
    let temp_dir = create_test_structure();
    let app = writable_app(&temp_dir);

    let response = send(&app, upload_request("/", None, &[("new.txt", "hi")])).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!temp_dir.path().join("new.txt").exists());

    // reads stay public
    assert_eq!(get(&app, "/").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upload_with_folders() {
    let temp_dir = create_test_structure();
    let app = writable_app(&temp_dir);

    let files = [("new.txt", "hello"), ("album/../../escape.txt", "contained")];
    let response = send(&app, upload_request("/incoming", Some(BASIC_AUTH), &files)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/incoming/");

    let incoming = temp_dir.path().join("incoming");
    assert_eq!(fs::read_to_string(incoming.join("new.txt")).unwrap(), "hello");
    assert_eq!(
        fs::read_to_string(incoming.join("escape.txt")).unwrap(),
        "contained"
    );
    assert!(!temp_dir.path().join("escape.txt").exists());
}

#[tokio::test]
async fn test_upload_without_files_is_rejected() {
    let temp_dir = create_test_structure();
    let app = writable_app(&temp_dir);

    let response = send(&app, upload_request("/", Some(BASIC_AUTH), &[])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete() {
    let temp_dir = create_test_structure();
    let app = writable_app(&temp_dir);

    let delete = |uri: &str| {
        Request::delete(uri)
            .header(header::AUTHORIZATION, BASIC_AUTH)
            .body(Body::empty())
            .unwrap()
    };

    let response = send(&app, delete("/z/nested.txt")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/z/");
    assert!(!temp_dir.path().join("z/nested.txt").exists());

    let response = send(&app, delete("/z")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(!temp_dir.path().join("z").exists());

    assert_eq!(send(&app, delete("/z")).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(send(&app, delete("/")).await.status(), StatusCode::FORBIDDEN);
    assert!(temp_dir.path().exists());
}
