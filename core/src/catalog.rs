//! Bookable catalog items.
//!
//! Tours, excursions, activities and transfers share one shape. A booking or a review
//! refers to exactly one of them through a [`CatalogRef`], so "one item, never zero,
//! never two" holds by construction.

use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four bookable catalog variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    /// Multi-day tour
    Tour,
    /// Day excursion
    Excursion,
    /// Activity (diving, quad, ...)
    Activity,
    /// Airport or hotel transfer
    Transfer,
}

impl CatalogKind {
    /// Every kind, in display order.
    pub const ALL: [Self; 4] = [Self::Tour, Self::Excursion, Self::Activity, Self::Transfer];

    /// Listing page size shared by all bookable kinds.
    pub const PAGE_SIZE: u32 = 12;

    /// Storage and wire name (`"tour"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tour => "tour",
            Self::Excursion => "excursion",
            Self::Activity => "activity",
            Self::Transfer => "transfer",
        }
    }

    /// URL segment of the public pages (`"tours"`).
    #[must_use]
    pub const fn plural(&self) -> &'static str {
        match self {
            Self::Tour => "tours",
            Self::Excursion => "excursions",
            Self::Activity => "activities",
            Self::Transfer => "transfers",
        }
    }

    /// Parses either the singular or the plural name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value || kind.plural() == value)
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed reference to exactly one catalog item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum CatalogRef {
    /// A tour by id
    Tour(i64),
    /// An excursion by id
    Excursion(i64),
    /// An activity by id
    Activity(i64),
    /// A transfer by id
    Transfer(i64),
}

impl CatalogRef {
    /// Builds a reference from a kind and an id.
    #[must_use]
    pub const fn new(kind: CatalogKind, id: i64) -> Self {
        match kind {
            CatalogKind::Tour => Self::Tour(id),
            CatalogKind::Excursion => Self::Excursion(id),
            CatalogKind::Activity => Self::Activity(id),
            CatalogKind::Transfer => Self::Transfer(id),
        }
    }

    /// The kind of item referenced.
    #[must_use]
    pub const fn kind(&self) -> CatalogKind {
        match self {
            Self::Tour(_) => CatalogKind::Tour,
            Self::Excursion(_) => CatalogKind::Excursion,
            Self::Activity(_) => CatalogKind::Activity,
            Self::Transfer(_) => CatalogKind::Transfer,
        }
    }

    /// The referenced item's id.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Tour(id) | Self::Excursion(id) | Self::Activity(id) | Self::Transfer(id) => *id,
        }
    }
}

impl fmt::Display for CatalogRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind(), self.id())
    }
}

/// How the total price of a booking is derived from the unit price.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// Unit price times participant count
    #[default]
    PerPerson,
    /// Unit price regardless of participant count (transfers only)
    Flat,
}

impl PricingMode {
    /// Storage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PerPerson => "per_person",
            Self::Flat => "flat",
        }
    }

    /// Parses the storage name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "per_person" => Some(Self::PerPerson),
            "flat" => Some(Self::Flat),
            _ => None,
        }
    }
}

/// Group size class used by activities instead of a participant maximum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupSize {
    /// Private group
    Private,
    /// Small group (up to 8)
    Small,
    /// Medium group (up to 15)
    Medium,
    /// Large group (more than 15)
    Large,
}

impl GroupSize {
    /// Storage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    /// Label shown on the storefront.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Private => "Privat",
            Self::Small => "Klein (bis 8 Personen)",
            Self::Medium => "Mittel (bis 15 Personen)",
            Self::Large => "Groß (über 15 Personen)",
        }
    }

    /// Parses the storage name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "private" => Some(Self::Private),
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            _ => None,
        }
    }
}

/// Descriptive capacity of an item. Never enforced against cumulative bookings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capacity {
    /// At most this many participants per departure
    MaxParticipants(u32),
    /// Group size class
    GroupSize(GroupSize),
}

/// A bookable product as shown in the storefront.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Database id (unique per kind)
    pub id: i64,
    /// Variant
    pub kind: CatalogKind,
    /// URL slug, unique per kind
    pub slug: String,
    /// German title
    pub title: String,
    /// English title
    pub title_en: String,
    /// German teaser
    pub short_description: String,
    /// English teaser
    pub short_description_en: String,
    /// German description
    pub description: String,
    /// English description
    pub description_en: String,
    /// Category slug
    pub category: Option<String>,
    /// Location slug
    pub location: Option<String>,
    /// Listed price
    pub price: Money,
    /// Strike-through price, display only
    pub original_price: Option<Money>,
    /// Reduced price
    pub discount_price: Option<Money>,
    /// Per-person or flat pricing
    pub pricing: PricingMode,
    /// Descriptive capacity
    pub capacity: Capacity,
    /// Free-text duration ("8 Stunden")
    pub duration: String,
    /// Visible in the storefront
    pub is_active: bool,
    /// Shown first in the default ordering
    pub is_featured: bool,
    /// Popularity flag
    pub is_popular: bool,
    /// Bestseller flag
    pub is_bestseller: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl CatalogItem {
    /// The price actually charged per unit: the discount price when it is set and
    /// strictly lower than the listed price, otherwise the listed price.
    #[must_use]
    pub fn unit_price(&self) -> Money {
        match self.discount_price {
            Some(discount) if discount < self.price => discount,
            _ => self.price,
        }
    }

    /// Checks if a lower discount price applies
    #[must_use]
    pub fn has_discount(&self) -> bool {
        self.unit_price() < self.price
    }

    /// The typed reference to this item.
    #[must_use]
    pub const fn reference(&self) -> CatalogRef {
        CatalogRef::new(self.kind, self.id)
    }

    /// Public page path, e.g. `/tours/nile-cruise/`.
    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}/{}/", self.kind.plural(), self.slug)
    }
}

/// Anything a review can be written about.
pub trait Reviewable {
    /// The reference stored on the review.
    fn review_target(&self) -> CatalogRef;

    /// Human-readable name of the subject.
    fn display_name(&self) -> &str;
}

impl Reviewable for CatalogItem {
    fn review_target(&self) -> CatalogRef {
        self.reference()
    }

    fn display_name(&self) -> &str {
        &self.title
    }
}
