//! Catalog listing, detail pages and review moderation.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use ausflug_core::catalog::{CatalogItem, CatalogKind, CatalogRef};
use ausflug_core::error::BookingError;
use ausflug_core::listing::{ListingQuery, SortOrder};
use ausflug_core::money::Money;
use ausflug_core::review::ReviewId;
use ausflug_core::services::ReviewSubmission;
use ausflug_core::validation::ReviewForm;
use ausflug_testing::{TestContext, fixtures};

fn tour(slug: &str, euros: u64) -> CatalogItem {
    fixtures::item(CatalogKind::Tour, slug, Money::from_euros(euros).unwrap())
}

fn slugs(items: &[CatalogItem]) -> Vec<&str> {
    items.iter().map(|i| i.slug.as_str()).collect()
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn inactive_items_are_never_listed() {
    let ctx = TestContext::new();
    ctx.store.seed_item(tour("visible", 50));
    ctx.store.seed_item(CatalogItem {
        is_active: false,
        ..tour("hidden", 50)
    });
    ctx.store.seed_item(fixtures::activity());

    let page = ctx
        .catalog
        .list(&ListingQuery::new(CatalogKind::Tour))
        .await
        .unwrap();

    assert_eq!(slugs(&page.items), vec!["visible"]);
    assert_eq!(page.total_count, 1);
}

#[tokio::test]
async fn featured_order_then_title() {
    let ctx = TestContext::new();
    ctx.store.seed_item(tour("b-plain", 10));
    ctx.store.seed_item(tour("a-plain", 10));
    ctx.store.seed_item(CatalogItem {
        is_popular: true,
        ..tour("popular", 10)
    });
    ctx.store.seed_item(CatalogItem {
        is_featured: true,
        ..tour("featured", 10)
    });

    let page = ctx
        .catalog
        .list(&ListingQuery::new(CatalogKind::Tour))
        .await
        .unwrap();

    assert_eq!(slugs(&page.items), vec!["featured", "popular", "a-plain", "b-plain"]);
}

#[tokio::test]
async fn popular_order_falls_back_to_bestseller_then_featured() {
    let ctx = TestContext::new();
    ctx.store.seed_item(tour("a-plain", 10));
    ctx.store.seed_item(CatalogItem {
        is_featured: true,
        ..tour("z-featured", 10)
    });
    ctx.store.seed_item(CatalogItem {
        is_bestseller: true,
        ..tour("y-bestseller", 10)
    });
    ctx.store.seed_item(CatalogItem {
        is_popular: true,
        ..tour("x-popular", 10)
    });
    let query = ListingQuery {
        sort: SortOrder::Popular,
        ..ListingQuery::new(CatalogKind::Tour)
    };

    let page = ctx.catalog.list(&query).await.unwrap();

    assert_eq!(
        slugs(&page.items),
        vec!["x-popular", "y-bestseller", "z-featured", "a-plain"]
    );
}

#[tokio::test]
async fn price_filters_use_discounted_price() {
    let ctx = TestContext::new();
    ctx.store.seed_item(tour("cheap", 20));
    ctx.store.seed_item(tour("pricey", 200));
    ctx.store.seed_item(CatalogItem {
        discount_price: Some(Money::from_euros(40).unwrap()),
        ..tour("on-sale", 150)
    });
    let query = ListingQuery {
        max_price: Some(Money::from_euros(50).unwrap()),
        sort: SortOrder::PriceHigh,
        ..ListingQuery::new(CatalogKind::Tour)
    };

    let page = ctx.catalog.list(&query).await.unwrap();

    assert_eq!(slugs(&page.items), vec!["on-sale", "cheap"]);
}

#[tokio::test]
async fn search_is_case_insensitive_across_languages() {
    let ctx = TestContext::new();
    ctx.store.seed_item(fixtures::tour());
    ctx.store.seed_item(tour("desert-safari", 80));
    let query = ListingQuery {
        search: Some("  VALLEY ".to_string()),
        ..ListingQuery::new(CatalogKind::Tour)
    };

    let page = ctx.catalog.list(&query).await.unwrap();

    assert_eq!(slugs(&page.items), vec!["valley-of-the-kings"]);
}

#[tokio::test]
async fn paginates_by_twelve_and_rejects_pages_past_the_end() {
    let ctx = TestContext::new();
    for n in 0..13 {
        ctx.store.seed_item(tour(&format!("tour-{n:02}"), 10));
    }

    let first = ctx
        .catalog
        .list(&ListingQuery::new(CatalogKind::Tour))
        .await
        .unwrap();
    let second = ctx
        .catalog
        .list(&ListingQuery {
            page: 2,
            ..ListingQuery::new(CatalogKind::Tour)
        })
        .await
        .unwrap();
    let third = ctx
        .catalog
        .list(&ListingQuery {
            page: 3,
            ..ListingQuery::new(CatalogKind::Tour)
        })
        .await;

    assert_eq!(first.items.len(), 12);
    assert_eq!(first.total_pages, 2);
    assert!(first.has_next());
    assert_eq!(slugs(&second.items), vec!["tour-12"]);
    assert!(matches!(third, Err(BookingError::NotFound(_))));
}

#[tokio::test]
async fn empty_listing_still_has_a_first_page() {
    let ctx = TestContext::new();

    let page = ctx
        .catalog
        .list(&ListingQuery::new(CatalogKind::Excursion))
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total_pages, 1);
}

// ============================================================================
// Detail
// ============================================================================

#[tokio::test]
async fn detail_shows_only_visible_reviews() {
    let ctx = TestContext::new();
    let item = ctx.store.seed_item(fixtures::tour());
    let target = item.reference();
    ctx.store.seed_review(fixtures::review(target, 5, true));
    ctx.store.seed_review(fixtures::review(target, 4, true));
    ctx.store.seed_review(fixtures::review(target, 3, true));
    ctx.store.seed_review(fixtures::review(target, 5, false));

    let detail = ctx
        .catalog
        .detail(CatalogKind::Tour, "valley-of-the-kings")
        .await
        .unwrap();

    assert_eq!(detail.reviews.len(), 2);
    assert!(detail.reviews.iter().all(|r| r.rating >= 4 && r.is_approved));
    assert_eq!(detail.rating.count, 2);
    assert_eq!(detail.rating.average, Some(4.5));
    assert_eq!(detail.unit_price, Money::from_cents(10_000));
}

#[tokio::test]
async fn detail_of_inactive_item_is_not_found() {
    let ctx = TestContext::new();
    ctx.store.seed_item(CatalogItem {
        is_active: false,
        ..fixtures::tour()
    });

    let result = ctx
        .catalog
        .detail(CatalogKind::Tour, "valley-of-the-kings")
        .await;

    assert!(matches!(result, Err(BookingError::NotFound(_))));
}

// ============================================================================
// Reviews
// ============================================================================

#[tokio::test]
async fn submitted_reviews_await_moderation() {
    let ctx = TestContext::new();
    let item = ctx.store.seed_item(fixtures::tour());

    let submission = ctx
        .reviews
        .submit(&fixtures::review_form(item.reference(), 5))
        .await
        .unwrap();

    let ReviewSubmission::Accepted { review, .. } = submission else {
        panic!("expected the review to be accepted");
    };
    assert!(!review.is_approved);
    assert_eq!(review.target, item.reference());
    assert_eq!(ctx.reviews.pending(10).await.unwrap(), vec![review.clone()]);

    let detail = ctx
        .catalog
        .detail(CatalogKind::Tour, &item.slug)
        .await
        .unwrap();
    assert!(detail.reviews.is_empty());

    ctx.reviews.approve(review.id).await.unwrap();
    let detail = ctx
        .catalog
        .detail(CatalogKind::Tour, &item.slug)
        .await
        .unwrap();
    assert_eq!(detail.reviews.len(), 1);
}

#[tokio::test]
async fn approved_low_rating_stays_hidden() {
    let ctx = TestContext::new();
    let item = ctx.store.seed_item(fixtures::tour());
    let submission = ctx
        .reviews
        .submit(&fixtures::review_form(item.reference(), 3))
        .await
        .unwrap();
    let ReviewSubmission::Accepted { review, .. } = submission else {
        panic!("expected the review to be accepted");
    };

    let approved = ctx.reviews.approve(review.id).await.unwrap();

    assert!(approved.is_approved);
    assert!(!approved.is_visible());
    let detail = ctx
        .catalog
        .detail(CatalogKind::Tour, &item.slug)
        .await
        .unwrap();
    assert!(detail.reviews.is_empty());
    assert_eq!(detail.rating.count, 0);
}

#[tokio::test]
async fn invalid_review_is_rejected_with_field_errors() {
    let ctx = TestContext::new();
    let item = ctx.store.seed_item(fixtures::tour());
    let form = ReviewForm {
        rating: "6".to_string(),
        comment: "   ".to_string(),
        ..fixtures::review_form(item.reference(), 5)
    };

    let submission = ctx.reviews.submit(&form).await.unwrap();

    let ReviewSubmission::Rejected { errors, .. } = submission else {
        panic!("expected the review to be rejected");
    };
    assert!(errors.contains("rating"));
    assert!(errors.contains("comment"));
    assert!(ctx.store.reviews().is_empty());
}

#[tokio::test]
async fn review_target_must_exist() {
    let ctx = TestContext::new();

    let unknown_kind = ReviewForm {
        content_type: "cruise".to_string(),
        ..fixtures::review_form(CatalogRef::Tour(1), 5)
    };
    let missing = fixtures::review_form(CatalogRef::Excursion(404), 5);

    assert!(matches!(
        ctx.reviews.submit(&unknown_kind).await,
        Err(BookingError::Validation(_))
    ));
    assert!(matches!(
        ctx.reviews.submit(&missing).await,
        Err(BookingError::NotFound(_))
    ));
}

#[tokio::test]
async fn moderation_of_unknown_review_is_not_found() {
    let ctx = TestContext::new();

    assert!(matches!(
        ctx.reviews.approve(ReviewId::new(404)).await,
        Err(BookingError::NotFound(_))
    ));
    assert!(matches!(
        ctx.reviews.delete(ReviewId::new(404)).await,
        Err(BookingError::NotFound(_))
    ));
}

#[tokio::test]
async fn deleted_review_is_gone() {
    let ctx = TestContext::new();
    let item = ctx.store.seed_item(fixtures::tour());
    let review = ctx
        .store
        .seed_review(fixtures::review(item.reference(), 5, false));

    ctx.reviews.delete(review.id).await.unwrap();

    assert!(ctx.store.reviews().is_empty());
}
