use super::models::UsageRow;
use super::validation::UsageQuery;
use crate::common::RepositoryError;
use async_trait::async_trait;

#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;

// ============================================
// Errors
// ============================================

#[derive(Debug, thiserror::Error)]
pub enum UsageInfoError {
    /// Client supplied a malformed or disallowed query parameter
    #[error("{message}")]
    InvalidQueryParameter { param: String, message: String },
    #[error("Invalid page.")]
    InvalidPage,
    #[error("Usage info repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl UsageInfoError {
    pub fn invalid(param: &str, message: String) -> Self {
        UsageInfoError::InvalidQueryParameter {
            param: param.to_string(),
            message,
        }
    }
}

// ============================================
// Pagination
// ============================================

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: i64,
    pub size: i64,
}

impl PageRequest {
    /// Parse the `page` query parameter; absent means the first page
    pub fn parse(raw: Option<&str>, size: i64) -> Result<Self, UsageInfoError> {
        let number = match raw {
            None => 1,
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(UsageInfoError::InvalidPage)?,
        };
        Ok(Self { number, size })
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.size
    }
}

/// One page of rows plus the total number of rows matching the query
#[derive(Debug, Clone, PartialEq)]
pub struct UsagePage {
    pub rows: Vec<UsageRow>,
    pub count: i64,
    pub page: PageRequest,
}

impl UsagePage {
    /// Number of pages; an empty result still has one (empty) page
    pub fn num_pages(&self) -> i64 {
        if self.count == 0 {
            1
        } else {
            (self.count + self.page.size - 1) / self.page.size
        }
    }

    pub fn has_next(&self) -> bool {
        self.page.number < self.num_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page.number > 1
    }
}

// ============================================
// Service Traits
// ============================================

#[async_trait]
pub trait UsageInfoServiceTrait: Send + Sync {
    /// List one page of usage rows for an already validated query
    async fn list_usage(
        &self,
        query: &UsageQuery,
        page: PageRequest,
    ) -> Result<UsagePage, UsageInfoError>;
}

// ============================================
// Repository Traits
// ============================================

#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait UsageInfoRepository: Send + Sync {
    /// Number of rows the query produces (groups when grouped)
    async fn count(&self, query: &UsageQuery) -> Result<i64, RepositoryError>;

    /// Rows produced by the query, filtered, grouped and ordered
    async fn list(
        &self,
        query: &UsageQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UsageRow>, RepositoryError>;
}
