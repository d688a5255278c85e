// Data API handlers

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::sync::Arc;

use super::date::is_valid_date;
use super::response::{error_response, json_response};
use super::types::{ApiError, DataResponse, UpdateAck, UpdatePayload};
use crate::config::AppState;
use crate::http::cache::API_READ_POLICY;
use crate::http::urlencoded::query_param;
use crate::logger;
use crate::storage::{StoreDocument, StoreError};

/// `GET /api/data?date=YYYY-MM-DD`
///
/// Reads the store fresh and returns the URLs for `date`, or `[]` when the
/// date was never written.
pub async fn handle_get_data(query: Option<&str>, state: &AppState) -> Response<Full<Bytes>> {
    let Some(date) = query_param(query, "date").filter(|d| is_valid_date(d)) else {
        return error_response(ApiError::BadDate);
    };

    let urls = read_document(state).await.urls(&date);
    logger::log_debug(&format!("Read {} URLs for {date}", urls.len()));

    json_response(
        StatusCode::OK,
        &DataResponse { date, urls },
        Some(API_READ_POLICY),
    )
}

/// `POST /api/update` with body `{"date": "YYYY-MM-DD", "urls": [...]}`
///
/// Replaces the stored list for the date. The read-modify-write cycle runs
/// under the state's writer lock.
pub async fn handle_post_update(body: &[u8], state: &AppState) -> Response<Full<Bytes>> {
    let update = match UpdatePayload::from_body(body).validate() {
        Ok(update) => update,
        Err(e) => return error_response(e),
    };

    let _guard = state.write_lock.lock().await;

    let mut document = read_document(state).await;
    let count = update.urls.len();
    document.set_urls(&update.date, update.urls);

    match write_document(state, document).await {
        Ok(total) => {
            logger::log_debug(&format!(
                "Stored {count} URLs for {} ({total} dates total)",
                update.date
            ));
            json_response(StatusCode::OK, &UpdateAck { ok: true }, None)
        }
        Err(e) => {
            logger::log_error(&format!("Failed to persist URLs for {}: {e}", update.date));
            error_response(ApiError::StoreWriteFailed)
        }
    }
}

/// Load the document on the blocking pool; a failed task reads as empty
async fn read_document(state: &AppState) -> StoreDocument {
    let store = Arc::clone(&state.store);
    match tokio::task::spawn_blocking(move || store.read()).await {
        Ok(document) => document,
        Err(e) => {
            logger::log_error(&format!("Store read task failed: {e}"));
            StoreDocument::new()
        }
    }
}

/// Persist the document on the blocking pool, returning its entry count
async fn write_document(state: &AppState, document: StoreDocument) -> Result<usize, String> {
    let store = Arc::clone(&state.store);
    let written = tokio::task::spawn_blocking(move || {
        store.write(&document)?;
        Ok::<_, StoreError>(document.len())
    })
    .await;

    match written {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(format!("store write task failed: {e}")),
    }
}
