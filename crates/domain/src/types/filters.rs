//! Listing filters and pagination

use serde::{Deserialize, Serialize};

use super::{BusinessId, IntegrationTypeId};
use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Clamp a caller-supplied page size into `[1, MAX_PAGE_SIZE]`.
pub fn clamp_page_size(page_size: i64) -> u32 {
    page_size.clamp(1, i64::from(MAX_PAGE_SIZE)) as u32
}

/// Clamp a caller-supplied page number to at least 1.
pub fn clamp_page(page: i64) -> u32 {
    page.clamp(1, i64::from(u32::MAX)) as u32
}

/// Filters accepted by integration listing.
///
/// `page` and `page_size` are kept signed so the clamping rules apply to
/// whatever the caller sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationFilters {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default)]
    pub integration_type_id: Option<IntegrationTypeId>,
    #[serde(default)]
    pub integration_type_code: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub business_id: Option<BusinessId>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub store_id: Option<String>,
}

const fn default_page() -> i64 {
    1
}

const fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE as i64
}

impl Default for IntegrationFilters {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            integration_type_id: None,
            integration_type_code: None,
            category: None,
            business_id: None,
            is_active: None,
            search: None,
            store_id: None,
        }
    }
}

impl IntegrationFilters {
    pub fn effective_page(&self) -> u32 {
        clamp_page(self.page)
    }

    pub fn effective_page_size(&self) -> u32 {
        clamp_page_size(self.page_size)
    }

    /// Row offset for the effective page.
    pub fn offset(&self) -> u64 {
        u64::from(self.effective_page() - 1) * u64::from(self.effective_page_size())
    }

    /// Trimmed, non-empty search term.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// A page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, page_size: u32) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            u32::try_from(total.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
        };
        Self { items, total, page, page_size, total_pages }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}
