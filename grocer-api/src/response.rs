/// Success envelope
///
/// ```json
/// { "message": "Product created successfully", "data": { ... }, "error": false, "success": true }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Successful response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub message: String,
    pub data: T,
    pub error: bool,
    pub success: bool,
}

impl<T> Envelope<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
            error: false,
            success: true,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Envelope with a `201 Created` status
pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    (StatusCode::CREATED, Json(Envelope::new(message, data))).into_response()
}

/// Envelope with `200 OK`
pub fn ok<T>(message: impl Into<String>, data: T) -> Envelope<T> {
    Envelope::new(message, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_flags() {
        let json = serde_json::to_value(ok("done", vec![1, 2])).unwrap();
        assert_eq!(json["message"], "done");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(json["error"], false);
        assert_eq!(json["success"], true);
    }

    #[test]
    fn test_created_status() {
        let response = created("Category added", serde_json::json!({}));
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
