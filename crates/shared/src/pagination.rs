//! Offset pagination utilities.

use serde::{Deserialize, Serialize};

/// Default page size for list endpoints.
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Upper bound on page size for list endpoints.
pub const MAX_PER_PAGE: i64 = 100;

/// Page request as received from query parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    DEFAULT_PER_PAGE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageRequest {
    /// Clamps page to >= 1 and per_page to 1..=MAX_PER_PAGE.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.normalized().per_page
    }

    pub fn offset(&self) -> i64 {
        let n = self.normalized();
        (n.page - 1) * n.per_page
    }
}

/// Pagination block returned alongside list responses.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PageInfo {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageInfo {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let n = request.normalized();
        let total_pages = if total <= 0 {
            0
        } else {
            (total + n.per_page - 1) / n.per_page
        };
        Self {
            page: n.page,
            per_page: n.per_page,
            total,
            total_pages,
        }
    }
}
