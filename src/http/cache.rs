//! HTTP cache control module
//!
//! `ETag` generation, conditional request matching and `Cache-Control` policies.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Policy applied to static files
pub const STATIC_FILE_POLICY: CachePolicy = CachePolicy::Public(3600);

/// Policy for API reads, which reflect mutable server state
pub const API_READ_POLICY: CachePolicy = CachePolicy::NoStore;

/// Policy for successful upstream tweet lookups
pub const TWEET_INFO_POLICY: CachePolicy = CachePolicy::Public(3600);

/// Generate `ETag` using fast hashing
///
/// Returns a quoted string, e.g. `"abc123def"`.
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("\"{v:x}\"")
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Accepts a single tag, a comma-separated list, or `*`.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag
            .split(',')
            .any(|e| e.trim() == etag || e.trim() == "*")
    })
}

/// Cache control policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Public cache with specified max-age (seconds)
    Public(u32),
    /// No store
    NoStore,
}

impl CachePolicy {
    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        match self {
            Self::Public(max_age) => format!("public, max-age={max_age}"),
            Self::NoStore => "no-store".to_string(),
        }
    }
}
