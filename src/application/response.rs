use serde::Serialize;

use super::AppError;

/// Structured result envelope for the boundary layer. Whatever calls
/// this core (here the CLI, elsewhere an HTTP adapter) renders one of
/// these per operation: a success flag, a human-readable message, and
/// the payload or the error kind.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, payload: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_kind: None,
            payload: Some(payload),
        }
    }

    pub fn failure(error: &AppError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            error_kind: Some(error.kind().as_str()),
            payload: None,
        }
    }

    /// Fold a service result into an envelope with the given success
    /// message.
    pub fn from_result(message: &str, result: Result<T, AppError>) -> Self {
        match result {
            Ok(payload) => Self::ok(message, payload),
            Err(err) => Self::failure(&err),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|err| format!(r#"{{"success":false,"message":"{}"}}"#, err))
    }
}
