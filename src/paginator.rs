use serde::{Deserialize, Serialize};

/// Page bookkeeping for paginated queries.
///
/// `total` is the full matching-row count, unaffected by offset and
/// limit. `page` and `per_page` echo the request; pages are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginator {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

impl Paginator {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page,
            per_page,
            total: 0,
        }
    }

    /// Row offset of the current page. Page 0 clamps to the first page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}
