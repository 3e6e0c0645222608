use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Shown when a failure carries no usable message of its own.
pub const DEFAULT_ERROR_MESSAGE: &str = "Đã xảy ra lỗi khi tải dữ liệu. Vui lòng thử lại.";

/// Response half of a failed request, when the server answered at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Failure of a load request.
///
/// Shaped after the error objects the REST backend produces:
/// `{ "response": { "data": { "message": ".." } } }` for structured API
/// errors, or a bare `{ "message": ".." }` for transport failures.
#[derive(Debug, Clone, Default, PartialEq, Error, Serialize, Deserialize)]
#[error("{}", self.user_message())]
pub struct FetchFailure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<FailureResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FetchFailure {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            response: None,
            message: Some(message.into()),
        }
    }

    pub fn from_response(status: u16, data: Option<Value>) -> Self {
        Self {
            response: Some(FailureResponse {
                status: Some(status),
                data,
            }),
            message: Some(format!("request failed with status {status}")),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().and_then(|response| response.status)
    }

    /// Message embedded by the server in the response payload, if any.
    pub fn payload_message(&self) -> Option<&str> {
        self.response
            .as_ref()
            .and_then(|response| response.data.as_ref())
            .and_then(|data| data.get("message"))
            .and_then(Value::as_str)
            .filter(|message| !message.trim().is_empty())
    }

    /// Human-readable message: payload message, then the failure's own
    /// message, then [`DEFAULT_ERROR_MESSAGE`].
    pub fn user_message(&self) -> String {
        if let Some(message) = self.payload_message() {
            return message.to_string();
        }

        match self.message.as_deref() {
            Some(message) if !message.trim().is_empty() => message.to_string(),
            _ => DEFAULT_ERROR_MESSAGE.to_string(),
        }
    }
}
