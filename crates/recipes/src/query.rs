//! Listing parameters: recipe filters and page windows.

use serde::Serialize;

use larder_core::{DomainError, DomainResult, UserId};

use crate::recipe::Recipe;

pub const MAX_PAGE_SIZE: u32 = 100;

/// Recipe listing filters. Empty collections and `None` mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    /// Any-of match on tag slugs.
    pub tags: Vec<String>,
    /// Any-of match on author ids.
    pub authors: Vec<UserId>,
    pub favorited_by: Option<UserId>,
    pub in_cart_of: Option<UserId>,
}

impl RecipeQuery {
    /// Checks the filters that depend only on the recipe itself. Membership
    /// filters are resolved by the store.
    pub fn matches(&self, recipe: &Recipe) -> bool {
        let tag_ok = self.tags.is_empty() || self.tags.iter().any(|slug| recipe.has_tag_slug(slug));
        let author_ok = self.authors.is_empty() || self.authors.contains(&recipe.author);
        tag_ok && author_ok
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> DomainResult<Self> {
        if page == 0 {
            return Err(DomainError::invalid_field("page", "page numbers start at 1"));
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(DomainError::invalid_field(
                "limit",
                format!("limit must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Cut the window out of an already-ordered, fully materialized list.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        items
            .iter()
            .skip(start)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

/// One page of results plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paged<T> {
    pub count: u64,
    pub page: u32,
    pub limit: u32,
    pub results: Vec<T>,
}

impl<T> Paged<T> {
    pub fn new(request: PageRequest, count: u64, results: Vec<T>) -> Self {
        Self {
            count,
            page: request.page,
            limit: request.limit,
            results,
        }
    }
}
