pub mod models;
pub mod ports;
pub mod validation;

#[cfg(any(test, feature = "test-mocks"))]
pub mod memory;

pub use models::*;
pub use ports::*;
pub use validation::{SortKey, UsageFilters, UsageQuery};

use std::sync::Arc;

pub struct UsageInfoServiceImpl {
    repository: Arc<dyn UsageInfoRepository>,
}

impl UsageInfoServiceImpl {
    pub fn new(repository: Arc<dyn UsageInfoRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait::async_trait]
impl UsageInfoServiceTrait for UsageInfoServiceImpl {
    async fn list_usage(
        &self,
        query: &UsageQuery,
        page: PageRequest,
    ) -> Result<UsagePage, UsageInfoError> {
        let count = self.repository.count(query).await?;

        let usage_page = UsagePage {
            rows: Vec::new(),
            count,
            page,
        };
        if page.number > usage_page.num_pages() {
            tracing::debug!(
                page = page.number,
                num_pages = usage_page.num_pages(),
                "Requested page is out of range"
            );
            return Err(UsageInfoError::InvalidPage);
        }
        if count == 0 {
            return Ok(usage_page);
        }

        let rows = self
            .repository
            .list(query, page.size, page.offset())
            .await?;

        tracing::debug!(
            count,
            returned = rows.len(),
            grouped = query.is_grouped(),
            "Listed usage rows"
        );

        Ok(UsagePage { rows, ..usage_page })
    }
}
