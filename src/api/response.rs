//! Success envelopes shared by every JSON endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// `{success: true, data, message?}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_rounds_up() {
        let p = Pagination::new(1, 20, 41);
        assert_eq!(p.total_pages, 3);

        let p = Pagination::new(1, 20, 0);
        assert_eq!(p.total_pages, 0);
    }

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::ok(42).with_message("done")).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], 42);
        assert_eq!(body["message"], "done");
        assert!(body.get("status").is_none());

        let body = serde_json::to_value(ApiResponse::ok("x")).unwrap();
        assert!(body.get("message").is_none());
    }
}
