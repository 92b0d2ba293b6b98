//! Catalog listing and detail endpoints.

use crate::error::AppError;
use crate::state::AppState;
use ausflug_core::catalog::{CatalogItem, CatalogKind};
use ausflug_core::listing::{ListingQuery, Page, SortOrder};
use ausflug_core::money::Money;
use ausflug_core::services::ItemDetail;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

/// Query string of a listing page. Everything is optional; unusable values are ignored
/// the way the storefront filters always treated them.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListingParams {
    /// Category slug
    pub category: Option<String>,
    /// Location slug
    pub location: Option<String>,
    /// Free-text search
    pub search: Option<String>,
    /// Lower bound of the unit price, e.g. `49.90`
    pub min_price: Option<String>,
    /// Upper bound of the unit price
    pub max_price: Option<String>,
    /// `featured`, `popular`, `price_low` or `price_high`
    pub sort: Option<String>,
    /// 1-based page
    pub page: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn price(value: Option<&str>) -> Option<Money> {
    value.and_then(|v| Money::parse(v.trim()).ok())
}

impl ListingParams {
    /// Builds the listing query for `kind`.
    #[must_use]
    pub fn into_query(self, kind: CatalogKind) -> ListingQuery {
        ListingQuery {
            min_price: price(self.min_price.as_deref()),
            max_price: price(self.max_price.as_deref()),
            sort: SortOrder::from_param(self.sort.as_deref()),
            page: self
                .page
                .and_then(|p| p.trim().parse::<u32>().ok())
                .filter(|p| *p >= 1)
                .unwrap_or(1),
            category: non_blank(self.category),
            location: non_blank(self.location),
            search: non_blank(self.search),
            ..ListingQuery::new(kind)
        }
    }
}

fn parse_kind(raw: &str) -> Result<CatalogKind, AppError> {
    CatalogKind::parse(raw).ok_or_else(|| AppError::not_found(format!("unknown catalog {raw}")))
}

/// One listing page.
///
/// ```text
/// GET /api/catalog/{kind}?category=&location=&search=&min_price=&max_price=&sort=&page=
/// ```
///
/// # Errors
///
/// 404 for an unknown kind or a page past the last one.
pub async fn list(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<ListingParams>,
) -> Result<Json<Page<CatalogItem>>, AppError> {
    let query = params.into_query(parse_kind(&kind)?);
    Ok(Json(state.catalog.list(&query).await?))
}

/// Detail page data: the item, its rating summary and newest visible reviews.
///
/// ```text
/// GET /api/catalog/{kind}/{slug}
/// ```
///
/// # Errors
///
/// 404 if no active item has the slug.
pub async fn detail(
    State(state): State<AppState>,
    Path((kind, slug)): Path<(String, String)>,
) -> Result<Json<ItemDetail>, AppError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.catalog.detail(kind, &slug).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_bad_params_are_ignored() {
        let params = ListingParams {
            category: Some("  ".to_string()),
            min_price: Some("cheap".to_string()),
            max_price: Some("80".to_string()),
            sort: Some("random".to_string()),
            page: Some("0".to_string()),
            ..ListingParams::default()
        };
        let query = params.into_query(CatalogKind::Tour);
        assert_eq!(query.category, None);
        assert_eq!(query.min_price, None);
        assert_eq!(query.max_price, Some(Money::from_cents(8_000)));
        assert_eq!(query.sort, SortOrder::Featured);
        assert_eq!(query.page, 1);
    }

    #[test]
    fn price_bounds_need_whole_cents() {
        let params = ListingParams {
            min_price: Some("49.995".to_string()),
            max_price: Some(" 49.90 ".to_string()),
            ..ListingParams::default()
        };
        let query = params.into_query(CatalogKind::Tour);
        assert_eq!(query.min_price, None);
        assert_eq!(query.max_price, Some(Money::from_cents(4_990)));

        let negative = ListingParams {
            min_price: Some("-10".to_string()),
            ..ListingParams::default()
        };
        assert_eq!(negative.into_query(CatalogKind::Tour).min_price, None);
    }
}
