use chrono::{DateTime, Utc};
use serde::Serialize;

/// Uniform response envelope returned by every service endpoint.
///
/// The payload type is fixed per endpoint, so callers get a closed,
/// explicitly-typed result instead of a dynamic blob.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub message: String,
    pub data: Option<T>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status_code: 200,
            message: message.into(),
            data: Some(data),
            timestamp: Utc::now(),
        }
    }

    pub fn error(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            data: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let ok = ApiResponse::ok("created", 42u32);
        assert_eq!(ok.status_code, 200);
        assert_eq!(ok.data, Some(42));

        let err: ApiResponse<u32> = ApiResponse::error(404, "form not found");
        assert_eq!(err.status_code, 404);
        assert!(err.data.is_none());
    }
}
