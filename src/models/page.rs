//! Pagination parameters and the paginated response wrapper

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::loan::{BorrowedBookResponse, LentBookResponse};

pub const DEFAULT_PAGE_SIZE: i64 = 15;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page index a client may ask for
pub const MAX_PAGE_INDEX: i64 = 1_000_000;

/// Page query parameters (page index starts at 0)
#[derive(Debug, Clone, Copy, Default, Deserialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page index, starting at 0 (default: 0, max: 1000000)
    #[validate(range(min = 0, max = 1000000, message = "Page index must be between 0 and 1000000"))]
    pub page: Option<i64>,
    /// Page size (default: 15, max: 100)
    #[validate(range(min = 1, max = 100, message = "Page size must be between 1 and 100"))]
    pub size: Option<i64>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(0),
            self.size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

/// Validated page coordinates handed to the repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    pub fn new(page: i64, size: i64) -> Self {
        Self {
            page: page.clamp(0, MAX_PAGE_INDEX),
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }

    pub fn limit(&self) -> i64 {
        self.size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
#[aliases(BorrowedBooksPage = Page<BorrowedBookResponse>, LentBooksPage = Page<LentBookResponse>)]
pub struct Page<T> {
    /// Entries of this page
    pub items: Vec<T>,
    /// Total number of entries
    pub total: i64,
    /// Current page index
    pub page: i64,
    /// Requested page size
    pub size: i64,
    pub total_pages: i64,
    pub first: bool,
    pub last: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + request.size - 1) / request.size
        };
        Self {
            items,
            total,
            page: request.page,
            size: request.size,
            total_pages,
            first: request.page == 0,
            last: request.page.saturating_add(1) >= total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
        }
    }
}
