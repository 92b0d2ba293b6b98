//! Catalog queries.

use crate::PostgresStore;
use crate::convert::{corrupt, count, get, kind, money, optional_money, store_error, to_cents, to_i32};
use async_trait::async_trait;
use ausflug_core::catalog::{Capacity, CatalogItem, CatalogKind, CatalogRef, GroupSize, PricingMode};
use ausflug_core::error::StoreError;
use ausflug_core::listing::{ListingQuery, Page, SortOrder, escape_like};
use ausflug_core::repository::CatalogRepository;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder};
use std::collections::BTreeMap;

const ITEM_COLUMNS: &str = r"
    id, kind, slug, title, title_en, short_description, short_description_en,
    description, description_en, category, location, price_cents, original_price_cents,
    discount_price_cents, pricing, max_participants, group_size, duration, is_active,
    is_featured, is_popular, is_bestseller, created_at
";

fn item_from_row(row: &PgRow) -> Result<CatalogItem, StoreError> {
    let pricing: String = get(row, "pricing")?;
    let max_participants: Option<i32> = get(row, "max_participants")?;
    let group_size: Option<String> = get(row, "group_size")?;
    let capacity = match (max_participants, group_size) {
        (Some(n), None) => Capacity::MaxParticipants(
            u32::try_from(n).map_err(|_| corrupt("max_participants", n))?,
        ),
        (None, Some(size)) => Capacity::GroupSize(
            GroupSize::parse(&size).ok_or_else(|| corrupt("group_size", &size))?,
        ),
        (n, size) => return Err(corrupt("capacity", format!("{n:?}/{size:?}"))),
    };

    Ok(CatalogItem {
        id: get(row, "id")?,
        kind: kind(row, "kind")?,
        slug: get(row, "slug")?,
        title: get(row, "title")?,
        title_en: get(row, "title_en")?,
        short_description: get(row, "short_description")?,
        short_description_en: get(row, "short_description_en")?,
        description: get(row, "description")?,
        description_en: get(row, "description_en")?,
        category: get(row, "category")?,
        location: get(row, "location")?,
        price: money(row, "price_cents")?,
        original_price: optional_money(row, "original_price_cents")?,
        discount_price: optional_money(row, "discount_price_cents")?,
        pricing: PricingMode::parse(&pricing).ok_or_else(|| corrupt("pricing", &pricing))?,
        capacity,
        duration: get(row, "duration")?,
        is_active: get(row, "is_active")?,
        is_featured: get(row, "is_featured")?,
        is_popular: get(row, "is_popular")?,
        is_bestseller: get(row, "is_bestseller")?,
        created_at: get(row, "created_at")?,
    })
}

/// Appends the `WHERE` clause shared by the page and count queries.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ListingQuery) -> Result<(), StoreError> {
    builder
        .push(" WHERE is_active AND kind = ")
        .push_bind(query.kind.as_str());
    if let Some(category) = &query.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(location) = &query.location {
        builder.push(" AND location = ").push_bind(location.clone());
    }
    if let Some(term) = query.search_term() {
        let pattern = format!("%{}%", escape_like(term));
        builder.push(" AND (");
        let mut columns = builder.separated(" OR ");
        for column in ["title", "title_en", "description", "description_en"] {
            columns
                .push(format!("{column} ILIKE "))
                .push_bind_unseparated(pattern.clone())
                .push_unseparated(r" ESCAPE '\'");
        }
        builder.push(")");
    }
    if let Some(min) = query.min_price {
        builder.push(" AND unit_price_cents >= ").push_bind(to_cents(min)?);
    }
    if let Some(max) = query.max_price {
        builder.push(" AND unit_price_cents <= ").push_bind(to_cents(max)?);
    }
    Ok(())
}

const fn order_by(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Featured => {
            " ORDER BY is_featured DESC, is_bestseller DESC, is_popular DESC, title ASC, id ASC"
        }
        SortOrder::Popular => {
            " ORDER BY is_popular DESC, is_bestseller DESC, is_featured DESC, title ASC, id ASC"
        }
        SortOrder::PriceLow => " ORDER BY unit_price_cents ASC, title ASC, id ASC",
        SortOrder::PriceHigh => " ORDER BY unit_price_cents DESC, title ASC, id ASC",
    }
}

#[async_trait]
impl CatalogRepository for PostgresStore {
    async fn find(&self, item: CatalogRef) -> Result<Option<CatalogItem>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items WHERE kind = $1 AND id = $2"
        ))
        .bind(item.kind().as_str())
        .bind(item.id())
        .fetch_optional(self.pool())
        .await
        .map_err(store_error)?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn find_by_slug(
        &self,
        kind: CatalogKind,
        slug: &str,
    ) -> Result<Option<CatalogItem>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items WHERE kind = $1 AND slug = $2 AND is_active"
        ))
        .bind(kind.as_str())
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(store_error)?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn list(&self, query: &ListingQuery) -> Result<Page<CatalogItem>, StoreError> {
        let mut counter = QueryBuilder::new("SELECT COUNT(*) FROM catalog_items");
        push_filters(&mut counter, query)?;
        let total: i64 = counter
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(store_error)?;

        let mut select = QueryBuilder::new(format!("SELECT {ITEM_COLUMNS} FROM catalog_items"));
        push_filters(&mut select, query)?;
        select
            .push(order_by(query.sort))
            .push(" LIMIT ")
            .push_bind(i64::from(query.page_size()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
        let rows = select
            .build()
            .fetch_all(self.pool())
            .await
            .map_err(store_error)?;
        let items = rows.iter().map(item_from_row).collect::<Result<Vec<_>, _>>()?;

        let total = u64::try_from(total).map_err(|_| corrupt("count", total))?;
        Ok(Page::new(items, query.page, query.page_size(), total))
    }

    async fn count_active(&self) -> Result<BTreeMap<CatalogKind, u64>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT kind, COUNT(*) AS total
            FROM catalog_items
            WHERE is_active
            GROUP BY kind
            ",
        )
        .fetch_all(self.pool())
        .await
        .map_err(store_error)?;

        let mut counts: BTreeMap<CatalogKind, u64> =
            CatalogKind::ALL.into_iter().map(|k| (k, 0)).collect();
        for row in &rows {
            counts.insert(kind(row, "kind")?, count(row, "total")?);
        }
        Ok(counts)
    }

    async fn insert(&self, item: CatalogItem) -> Result<CatalogItem, StoreError> {
        let (max_participants, group_size) = match item.capacity {
            Capacity::MaxParticipants(n) => (Some(to_i32(n)?), None),
            Capacity::GroupSize(size) => (None, Some(size.as_str())),
        };
        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO catalog_items (
                kind, slug, title, title_en, short_description, short_description_en,
                description, description_en, category, location, price_cents,
                original_price_cents, discount_price_cents, pricing, max_participants,
                group_size, duration, is_active, is_featured, is_popular, is_bestseller,
                created_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22
            )
            RETURNING id
            ",
        )
        .bind(item.kind.as_str())
        .bind(&item.slug)
        .bind(&item.title)
        .bind(&item.title_en)
        .bind(&item.short_description)
        .bind(&item.short_description_en)
        .bind(&item.description)
        .bind(&item.description_en)
        .bind(&item.category)
        .bind(&item.location)
        .bind(to_cents(item.price)?)
        .bind(item.original_price.map(to_cents).transpose()?)
        .bind(item.discount_price.map(to_cents).transpose()?)
        .bind(item.pricing.as_str())
        .bind(max_participants)
        .bind(group_size)
        .bind(&item.duration)
        .bind(item.is_active)
        .bind(item.is_featured)
        .bind(item.is_popular)
        .bind(item.is_bestseller)
        .bind(item.created_at)
        .fetch_one(self.pool())
        .await
        .map_err(store_error)?;

        tracing::debug!(item = %item.reference(), id, "catalog item stored");
        Ok(CatalogItem { id, ..item })
    }
}
