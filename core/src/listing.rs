//! Storefront listing: filters, ordering and pagination.

use crate::catalog::{CatalogItem, CatalogKind};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Caller-selectable ordering of a listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Featured first, then bestsellers, then popular items, then by title
    #[default]
    Featured,
    /// Popular first, then bestsellers, then featured items, then by title
    Popular,
    /// Cheapest unit price first
    PriceLow,
    /// Most expensive unit price first
    PriceHigh,
}

impl SortOrder {
    /// Reads a `sort` query parameter. Unknown or missing values fall back to
    /// [`SortOrder::Featured`].
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("popular") => Self::Popular,
            Some("price_low") => Self::PriceLow,
            Some("price_high") => Self::PriceHigh,
            _ => Self::Featured,
        }
    }

    /// Query parameter value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::Popular => "popular",
            Self::PriceLow => "price_low",
            Self::PriceHigh => "price_high",
        }
    }
}

/// Filters, ordering and page of a catalog listing. All filters are conjunctive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingQuery {
    /// Which catalog to list
    pub kind: CatalogKind,
    /// Category slug
    pub category: Option<String>,
    /// Location slug
    pub location: Option<String>,
    /// Case-insensitive substring over titles and descriptions in both languages
    pub search: Option<String>,
    /// Inclusive lower bound on the unit price
    pub min_price: Option<Money>,
    /// Inclusive upper bound on the unit price
    pub max_price: Option<Money>,
    /// Ordering
    pub sort: SortOrder,
    /// 1-based page number
    pub page: u32,
}

impl ListingQuery {
    /// An unfiltered first page in the default order.
    #[must_use]
    pub const fn new(kind: CatalogKind) -> Self {
        Self {
            kind,
            category: None,
            location: None,
            search: None,
            min_price: None,
            max_price: None,
            sort: SortOrder::Featured,
            page: 1,
        }
    }

    /// Page size for this listing.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        CatalogKind::PAGE_SIZE
    }

    /// Row offset of the requested page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * (self.page_size() as u64)
    }

    /// Search term with surrounding whitespace removed, `None` when blank.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Whether `item` belongs in this listing. Inactive items never match.
    #[must_use]
    pub fn matches(&self, item: &CatalogItem) -> bool {
        if !item.is_active || item.kind != self.kind {
            return false;
        }
        if let Some(category) = &self.category {
            if item.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if item.location.as_deref() != Some(location.as_str()) {
                return false;
            }
        }
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            let hit = [
                &item.title,
                &item.title_en,
                &item.description,
                &item.description_en,
            ]
            .iter()
            .any(|text| text.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        let price = item.unit_price();
        if self.min_price.is_some_and(|min| price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| price > max) {
            return false;
        }
        true
    }

    /// Total order used by the listing, ties broken by title then id.
    #[must_use]
    pub fn compare(&self, a: &CatalogItem, b: &CatalogItem) -> Ordering {
        let primary = match self.sort {
            SortOrder::Featured => b
                .is_featured
                .cmp(&a.is_featured)
                .then(b.is_bestseller.cmp(&a.is_bestseller))
                .then(b.is_popular.cmp(&a.is_popular)),
            SortOrder::Popular => b
                .is_popular
                .cmp(&a.is_popular)
                .then(b.is_bestseller.cmp(&a.is_bestseller))
                .then(b.is_featured.cmp(&a.is_featured)),
            SortOrder::PriceLow => a.unit_price().cmp(&b.unit_price()),
            SortOrder::PriceHigh => b.unit_price().cmp(&a.unit_price()),
        };
        primary.then_with(|| a.title.cmp(&b.title)).then(a.id.cmp(&b.id))
    }
}

/// One page of results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// 1-based page number
    pub page: u32,
    /// Page size
    pub page_size: u32,
    /// Matching items across all pages
    pub total_count: u64,
    /// Number of pages, at least 1
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Builds a page, deriving the page count from the total.
    #[must_use]
    pub fn new(items: Vec<T>, page: u32, page_size: u32, total_count: u64) -> Self {
        let size = u64::from(page_size.max(1));
        let pages = total_count.div_ceil(size).max(1);
        Self {
            items,
            page,
            page_size,
            total_count,
            total_pages: u32::try_from(pages).unwrap_or(u32::MAX),
        }
    }

    /// Whether the requested page lies past the last one. Page 1 always exists.
    #[must_use]
    pub const fn is_out_of_range(&self) -> bool {
        self.page != 1 && self.page > self.total_pages
    }

    /// Checks if there is a following page
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Escapes `%`, `_` and `\` so user input is matched literally by `LIKE`.
#[must_use]
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sort_falls_back_to_featured() {
        assert_eq!(SortOrder::from_param(Some("rating")), SortOrder::Featured);
        assert_eq!(SortOrder::from_param(None), SortOrder::Featured);
        assert_eq!(SortOrder::from_param(Some("price_high")), SortOrder::PriceHigh);
    }

    #[test]
    fn page_counts_round_up() {
        let page: Page<()> = Page::new(vec![], 2, 12, 13);
        assert_eq!(page.total_pages, 2);
        assert!(!page.is_out_of_range());

        let empty: Page<()> = Page::new(vec![], 1, 12, 0);
        assert_eq!(empty.total_pages, 1);
        assert!(!empty.is_out_of_range());

        let past: Page<()> = Page::new(vec![], 3, 12, 13);
        assert!(past.is_out_of_range());
    }

    #[test]
    fn offset_is_zero_based() {
        let mut query = ListingQuery::new(CatalogKind::Tour);
        assert_eq!(query.offset(), 0);
        query.page = 3;
        assert_eq!(query.offset(), 24);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("Nil"), "Nil");
    }
}
