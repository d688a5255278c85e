// API request and response types

use hyper::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

use super::date::is_valid_date;

/// Body of a successful `GET /api/data`
#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub date: String,
    pub urls: Vec<Value>,
}

/// Body of a successful `POST /api/update`
#[derive(Debug, Serialize)]
pub struct UpdateAck {
    pub ok: bool,
}

/// Error body, e.g. `{"error":"bad_date"}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

/// Proxy failure body, e.g. `{"error":"proxy_error","details":"..."}`
#[derive(Debug, Serialize)]
pub struct DetailedErrorBody {
    pub error: &'static str,
    pub details: String,
}

/// Failures the API reports to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// `date` query parameter missing or malformed
    BadDate,
    /// Update payload has a bad `date` or a non-array `urls`
    BadRequest,
    /// The store could not be persisted
    StoreWriteFailed,
    /// Tweet lookup without an `id` query parameter
    MissingId,
}

impl ApiError {
    pub const fn code(self) -> &'static str {
        match self {
            Self::BadDate => "bad_date",
            Self::BadRequest => "bad_request",
            Self::StoreWriteFailed => "store_write_failed",
            Self::MissingId => "missing_id",
        }
    }

    pub const fn status(self) -> StatusCode {
        match self {
            Self::BadDate | Self::BadRequest | Self::MissingId => StatusCode::BAD_REQUEST,
            Self::StoreWriteFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn body(self) -> ErrorBody {
        ErrorBody { error: self.code() }
    }
}

/// A validated replacement of one date's URL list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlUpdate {
    pub date: String,
    pub urls: Vec<Value>,
}

/// Raw `POST /api/update` payload, before validation
///
/// Parsing never fails: an empty or malformed body, or a JSON value that is
/// not an object, is treated as `{}`. Falsy fields (`null`, `false`, `0`,
/// `""`, `[]`, `{}`) count as absent; absent `urls` defaults to `[]`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePayload {
    date: Option<Value>,
    urls: Option<Value>,
}

impl UpdatePayload {
    pub fn from_body(body: &[u8]) -> Self {
        let fields = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self::from_fields(fields)
    }

    fn from_fields(mut fields: Map<String, Value>) -> Self {
        let mut take = |name: &str| fields.remove(name).filter(|v| !is_falsy(v));
        Self {
            date: take("date"),
            urls: take("urls"),
        }
    }

    /// Validate into an update; `BadRequest` on any shape problem
    pub fn validate(self) -> Result<UrlUpdate, ApiError> {
        let date = match self.date {
            Some(Value::String(date)) if is_valid_date(&date) => date,
            _ => return Err(ApiError::BadRequest),
        };

        let urls = match self.urls {
            None => Vec::new(),
            Some(Value::Array(urls)) => urls,
            Some(_) => return Err(ApiError::BadRequest),
        };

        Ok(UrlUpdate { date, urls })
    }
}

/// JSON truthiness: empty containers, empty strings, zero, false and null
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
