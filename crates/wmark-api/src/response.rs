//! Response envelope shared by all `/api` endpoints.

use serde::{Deserialize, Serialize};

/// `{ code, message, data }` envelope.
///
/// `data` is `null` on errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::with_message("Success", data)
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            code: 200,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_has_null_data() {
        let json = serde_json::to_value(ApiResponse::error(404, "Job not found")).unwrap();
        assert_eq!(json["code"], 404);
        assert_eq!(json["message"], "Job not found");
        assert!(json["data"].is_null());
    }
}
