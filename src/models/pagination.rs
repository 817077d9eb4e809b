//! 分页相关的数据结构

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CreditEntryResponse, CustomerResponse, OrderResponse};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: Some(1),
            page_size: Some(DEFAULT_PAGE_SIZE),
        }
    }
}

impl PaginationParams {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.map(|p| p as i64),
            page_size: per_page.map(|p| p as i64),
        }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn get_offset(&self) -> i64 {
        (self.page() - 1) * self.page_size()
    }

    pub fn get_limit(&self) -> i64 {
        self.page_size()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[aliases(
    PaginatedOrderResponse = PaginatedResponse<OrderResponse>,
    PaginatedCustomerResponse = PaginatedResponse<CustomerResponse>,
    PaginatedCreditEntryResponse = PaginatedResponse<CreditEntryResponse>
)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: i64, page_size: i64, total: i64) -> Self {
        let total_pages = (total + page_size - 1) / page_size;
        Self {
            data,
            page,
            page_size,
            total,
            total_pages,
        }
    }

    pub fn from_params(data: Vec<T>, params: &PaginationParams, total: i64) -> Self {
        Self::new(data, params.page(), params.page_size(), total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_limit() {
        let params = PaginationParams::new(Some(3), Some(10));
        assert_eq!(params.get_offset(), 20);
        assert_eq!(params.get_limit(), 10);

        let defaults = PaginationParams::new(None, None);
        assert_eq!(defaults.get_offset(), 0);
        assert_eq!(defaults.get_limit(), 20);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let params = PaginationParams {
            page: Some(0),
            page_size: Some(10_000),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.get_limit(), 200);
    }

    #[test]
    fn test_total_pages() {
        let resp = PaginatedResponse::new(vec![1, 2], 1, 20, 41);
        assert_eq!(resp.total_pages, 3);
        let empty = PaginatedResponse::<i32>::new(vec![], 1, 20, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
