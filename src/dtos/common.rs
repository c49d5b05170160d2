// dtos/common.rs
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

/// Standard success envelope used by every handler.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PaginationQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

impl PaginationQueryDto {
    pub fn limit_offset(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(20) as i64;
        let page = self.page.unwrap_or(1) as i64;
        (limit, (page - 1) * limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let query = PaginationQueryDto {
            page: None,
            limit: None,
        };
        assert_eq!(query.limit_offset(), (20, 0));
    }

    #[test]
    fn test_pagination_offset() {
        let query = PaginationQueryDto {
            page: Some(3),
            limit: Some(10),
        };
        assert_eq!(query.limit_offset(), (10, 20));
    }
}
