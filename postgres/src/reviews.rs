//! Review queries.

use crate::PostgresStore;
use crate::convert::{corrupt, count, get, item_ref, store_error};
use async_trait::async_trait;
use ausflug_core::catalog::CatalogRef;
use ausflug_core::environment::StatsWindow;
use ausflug_core::error::StoreError;
use ausflug_core::repository::{ReviewRepository, ReviewStats};
use ausflug_core::review::{MIN_VISIBLE_RATING, NewReview, RatingSummary, Review, ReviewId};
use sqlx::postgres::PgRow;

const REVIEW_COLUMNS: &str =
    "id, item_kind, item_id, name, email, rating, title, comment, is_approved, created_at";

fn review_from_row(row: &PgRow) -> Result<Review, StoreError> {
    let rating: i16 = get(row, "rating")?;
    Ok(Review {
        id: ReviewId::new(get(row, "id")?),
        target: item_ref(row)?,
        name: get(row, "name")?,
        email: get(row, "email")?,
        rating: u8::try_from(rating).map_err(|_| corrupt("rating", rating))?,
        title: get(row, "title")?,
        comment: get(row, "comment")?,
        is_approved: get(row, "is_approved")?,
        created_at: get(row, "created_at")?,
    })
}

#[async_trait]
impl ReviewRepository for PostgresStore {
    async fn insert(&self, review: NewReview) -> Result<Review, StoreError> {
        let row = sqlx::query(&format!(
            r"
            INSERT INTO reviews (item_kind, item_id, name, email, rating, title, comment)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(review.target.kind().as_str())
        .bind(review.target.id())
        .bind(&review.name)
        .bind(&review.email)
        .bind(i16::from(review.rating))
        .bind(&review.title)
        .bind(&review.comment)
        .fetch_one(self.pool())
        .await
        .map_err(store_error)?;
        review_from_row(&row)
    }

    async fn visible_for(&self, target: CatalogRef, limit: u32) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {REVIEW_COLUMNS}
            FROM reviews
            WHERE item_kind = $1 AND item_id = $2 AND is_approved AND rating >= $3
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "
        ))
        .bind(target.kind().as_str())
        .bind(target.id())
        .bind(i16::from(MIN_VISIBLE_RATING))
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(store_error)?;
        rows.iter().map(review_from_row).collect()
    }

    async fn rating_summary(&self, target: CatalogRef) -> Result<RatingSummary, StoreError> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS total, COALESCE(SUM(rating), 0)::BIGINT AS rating_sum
            FROM reviews
            WHERE item_kind = $1 AND item_id = $2 AND is_approved AND rating >= $3
            ",
        )
        .bind(target.kind().as_str())
        .bind(target.id())
        .bind(i16::from(MIN_VISIBLE_RATING))
        .fetch_one(self.pool())
        .await
        .map_err(store_error)?;
        Ok(RatingSummary::from_totals(
            count(&row, "total")?,
            count(&row, "rating_sum")?,
        ))
    }

    async fn pending(&self, limit: u32) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {REVIEW_COLUMNS}
            FROM reviews
            WHERE NOT is_approved
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "
        ))
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(store_error)?;
        rows.iter().map(review_from_row).collect()
    }

    async fn approve(&self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE reviews SET is_approved = TRUE WHERE id = $1 RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id.as_i64())
        .fetch_optional(self.pool())
        .await
        .map_err(store_error)?;
        row.as_ref().map(review_from_row).transpose()
    }

    async fn delete(&self, id: ReviewId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id.as_i64())
            .execute(self.pool())
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self, window: StatsWindow) -> Result<ReviewStats, StoreError> {
        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE NOT is_approved) AS pending,
                COUNT(*) FILTER (WHERE is_approved) AS approved,
                COUNT(*) FILTER (WHERE created_at >= $1) AS today,
                COUNT(*) FILTER (WHERE created_at >= $2) AS last_7_days
            FROM reviews
            ",
        )
        .bind(window.today_start)
        .bind(window.week_start)
        .fetch_one(self.pool())
        .await
        .map_err(store_error)?;

        Ok(ReviewStats {
            total: count(&row, "total")?,
            pending: count(&row, "pending")?,
            approved: count(&row, "approved")?,
            today: count(&row, "today")?,
            last_7_days: count(&row, "last_7_days")?,
        })
    }
}
