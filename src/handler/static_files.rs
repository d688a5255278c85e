//! Static file serving module
//!
//! Serves files beneath the configured static root for GET/HEAD requests
//! that are not API calls. Directories resolve to an index file; a
//! directory requested without a trailing slash is redirected to it.

use crate::config::HttpConfig;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime, urlencoded::percent_decode};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Outcome of mapping a request path onto the static root
#[derive(Debug, PartialEq, Eq)]
enum Lookup {
    File(PathBuf),
    Redirect(String),
    NotFound,
}

/// Serve a static file for the request
pub async fn serve_static(ctx: &RequestContext<'_>, config: &HttpConfig) -> Response<Full<Bytes>> {
    match resolve_path(Path::new(&config.static_dir), ctx.path, &config.index_files) {
        Lookup::File(file_path) => match fs::read(&file_path).await {
            Ok(content) => build_static_file_response(
                content,
                mime::content_type_for(&file_path),
                ctx.if_none_match,
                ctx.is_head,
            ),
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to read file '{}': {e}",
                    file_path.display()
                ));
                http::build_404_response(ctx.is_head)
            }
        },
        Lookup::Redirect(location) => {
            let target = match ctx.query {
                Some(q) => format!("{location}?{q}"),
                None => location,
            };
            http::build_redirect_response(&target)
        }
        Lookup::NotFound => http::build_404_response(ctx.is_head),
    }
}

/// Map a URL path to a file under `root`
///
/// Empty, `.` and `..` segments are dropped, so the joined path never climbs
/// above the root; symlinks escaping the root are rejected after
/// canonicalisation.
fn resolve_path(root: &Path, request_path: &str, index_files: &[String]) -> Lookup {
    let decoded = percent_decode(request_path, false);
    let wants_directory = decoded.ends_with('/');

    let mut file_path = root.to_path_buf();
    for segment in decoded.split('/') {
        if segment.is_empty()
            || segment == "."
            || segment == ".."
            || segment.contains(['\\', '\0'])
        {
            continue;
        }
        file_path.push(segment);
    }

    if file_path.is_dir() {
        if !wants_directory {
            return Lookup::Redirect(format!("{request_path}/"));
        }
        match index_files
            .iter()
            .map(|index| file_path.join(index))
            .find(|candidate| candidate.is_file())
        {
            Some(index_path) => file_path = index_path,
            None => return Lookup::NotFound,
        }
    } else if wants_directory {
        return Lookup::NotFound;
    }

    let root_canonical = match root.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static directory not found or inaccessible '{}': {e}",
                root.display()
            ));
            return Lookup::NotFound;
        }
    };

    // File not found is common (404), no need to log at warning level
    let Ok(file_canonical) = file_path.canonicalize() else {
        return Lookup::NotFound;
    };
    if !file_canonical.starts_with(&root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {request_path} -> {}",
            file_canonical.display()
        ));
        return Lookup::NotFound;
    }

    if file_canonical.is_file() {
        Lookup::File(file_path)
    } else {
        Lookup::NotFound
    }
}

/// Build static file response with `ETag` revalidation
fn build_static_file_response(
    data: Vec<u8>,
    content_type: &str,
    if_none_match: Option<&str>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let etag = cache::generate_etag(&data);

    if cache::check_etag_match(if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    http::build_cached_response(Bytes::from(data), content_type, &etag, is_head)
}
