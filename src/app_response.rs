use std::fmt::{Display, Formatter};

use lmdb::Error as LmdbError;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;

/// Result envelope shared by the library API and the C ABI.
///
/// Every fallible operation in the crate returns `Result<T, AppResponse>`;
/// the host bindings serialize the value as-is, so `Ok` carries the JSON
/// payload of a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppResponse {
    DatabaseError(String),
    SerializationError(String),
    NotFound(String),
    ValidationError(String),
    BadRequest(String),
    UpstreamError(String),
    Ok(String),
}

impl Display for AppResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppResponse::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppResponse::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppResponse::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppResponse::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppResponse::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppResponse::UpstreamError(msg) => write!(f, "Upstream error: {}", msg),
            AppResponse::Ok(msg) => write!(f, "Ok: {}", msg),
        }
    }
}

impl std::error::Error for AppResponse {}

impl From<LmdbError> for AppResponse {
    fn from(err: LmdbError) -> Self {
        match err {
            LmdbError::NotFound => AppResponse::NotFound("Key not found in store".to_string()),
            LmdbError::MapFull => {
                AppResponse::DatabaseError("Store map size exhausted".to_string())
            }
            LmdbError::Corrupted | LmdbError::Panic => {
                AppResponse::DatabaseError(format!("Store is corrupted: {}", err))
            }
            _ => AppResponse::DatabaseError(format!("LMDB error: {}", err)),
        }
    }
}

impl From<SerdeError> for AppResponse {
    fn from(err: SerdeError) -> Self {
        AppResponse::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl From<std::io::Error> for AppResponse {
    fn from(err: std::io::Error) -> Self {
        AppResponse::DatabaseError(format!("IO error: {}", err))
    }
}

impl AppResponse {
    pub fn success(msg: impl Into<String>) -> Self {
        AppResponse::Ok(msg.into())
    }

    /// Serializes `value` into an `Ok` envelope.
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(json) => AppResponse::Ok(json),
            Err(e) => AppResponse::from(e),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, AppResponse::Ok(_))
    }
}
