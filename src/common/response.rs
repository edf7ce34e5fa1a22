// src/common/response.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE: i64 = 1_000_000;

/// Uniform envelope returned by every endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            pagination: None,
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data, message)
        }
    }

    pub fn paginated(data: T, pagination: Pagination, message: impl Into<String>) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(data, message)
        }
    }
}

impl ApiResponse<()> {
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            pagination: None,
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: PageRequest, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + page.limit - 1) / page.limit
        };
        Self {
            page: page.page,
            limit: page.limit,
            total,
            total_pages,
        }
    }
}

/// `?page=&limit=` query parameters, clamped to sane bounds.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        PageQuery { page, limit }.into()
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl From<PageQuery> for PageRequest {
    fn from(q: PageQuery) -> Self {
        let page = q.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let limit = q.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        Self { page, limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_is_clamped() {
        let req: PageRequest = PageQuery { page: Some(0), limit: Some(1000) }.into();
        assert_eq!(req, PageRequest { page: 1, limit: MAX_PAGE_SIZE });
        assert_eq!(req.offset(), 0);

        let req: PageRequest = PageQuery { page: Some(3), limit: None }.into();
        assert_eq!(req.offset(), 2 * DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let req = PageRequest::new(Some(i64::MAX), Some(100));
        assert_eq!(req.page, MAX_PAGE);
        assert!(req.offset() > 0);

        let raw = PageRequest { page: i64::MAX, limit: MAX_PAGE_SIZE };
        assert_eq!(raw.offset(), i64::MAX);
    }

    #[test]
    fn total_pages_rounds_up() {
        let p = Pagination::new(PageRequest { page: 1, limit: 20 }, 41);
        assert_eq!(p.total_pages, 3);
        assert_eq!(Pagination::new(PageRequest { page: 1, limit: 20 }, 0).total_pages, 0);
    }

    #[test]
    fn envelope_serializes_camel_case_and_skips_empty_pagination() {
        let body = serde_json::to_value(ApiResponse::ok(vec![1, 2], "ok")).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!([1, 2]));
        assert!(body.get("pagination").is_none());

        let created = ApiResponse::created("x", "made");
        assert_eq!(created.into_response().status(), StatusCode::CREATED);
    }
}
