//! HTTP protocol layer module
//!
//! Response builders, cache validators, MIME detection and URL decoding,
//! shared by the JSON API and the static file responder.

pub mod cache;
pub mod mime;
pub mod response;
pub mod urlencoded;

// Re-export commonly used items
pub use response::{
    apply_cors_headers, build_304_response, build_404_response, build_413_response, build_cached_response,
    build_empty_response, build_json_response, build_redirect_response,
};
