//! Request and reply shapes of the two serverless helpers the site calls:
//! the text generation proxy and the image upload function.
//!
//! Both reply with `{ "success": bool, ... }` and put a message in `error`
//! when `success` is false. Failures are handed back to the operator as
//! [`AppResponse::UpstreamError`]; nothing here retries.

use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadRequest {
    Batch { items: Vec<UploadItem> },
    Single(UploadItem),
}

impl UploadRequest {
    /// Every item must carry exactly one source and a filename.
    pub fn validate(&self) -> Result<(), AppResponse> {
        let items: &[UploadItem] = match self {
            UploadRequest::Single(item) => std::slice::from_ref(item),
            UploadRequest::Batch { items } => items,
        };
        if items.is_empty() {
            return Err(AppResponse::ValidationError(
                "Upload batch is empty".to_string(),
            ));
        }
        for item in items {
            if item.filename.trim().is_empty() {
                return Err(AppResponse::ValidationError(
                    "Upload item requires a filename".to_string(),
                ));
            }
            if item.data_url.is_some() == item.url.is_some() {
                return Err(AppResponse::ValidationError(format!(
                    "Upload '{}' needs exactly one of dataUrl or url",
                    item.filename
                )));
            }
        }
        Ok(())
    }
}

/// Generic reply envelope; `T` is the payload carried on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReply<T> {
    pub success: bool,
    #[serde(flatten)]
    pub payload: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ServiceReply<T> {
    pub fn into_result(self) -> Result<T, AppResponse> {
        match (self.success, self.payload) {
            (true, Some(payload)) => Ok(payload),
            (true, None) => Err(AppResponse::UpstreamError(
                "Service reported success without a payload".to_string(),
            )),
            (false, _) => Err(AppResponse::UpstreamError(
                self.error
                    .unwrap_or_else(|| "Service reported failure".to_string()),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub filename: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResults {
    pub results: Vec<UploadResult>,
}

pub type TextReply = ServiceReply<TextContent>;
pub type UploadReply = ServiceReply<UploadedUrl>;
pub type BatchUploadReply = ServiceReply<UploadResults>;
