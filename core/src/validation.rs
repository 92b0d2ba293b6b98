//! Form validation for inquiries, checkout requests and reviews.
//!
//! Forms arrive as loosely typed strings. Validation collects every problem into a
//! [`FieldErrors`] map so the caller can render all messages at once, and produces a typed
//! value only when nothing is wrong.

use crate::booking::{Contact, Participants};
use crate::catalog::{CatalogKind, CatalogRef};
use crate::provider::MAX_METADATA_VALUE_LEN;
use crate::review::NewReview;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Smallest accepted group.
pub const MIN_PARTICIPANTS: u32 = 1;
/// Largest accepted group.
pub const MAX_PARTICIPANTS: u32 = 50;

const MAX_NAME_LEN: usize = 100;
const MAX_PHONE_LEN: usize = 20;
const MAX_EMAIL_LEN: usize = 254;
const MAX_REVIEW_TITLE_LEN: usize = 200;

/// Field-level validation messages, ordered by field name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// An empty set of errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// A single-message error set.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Checks if no field has an error
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages for one field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Whether `field` has at least one message.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Iterates over `(field, messages)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// `Ok(value)` when empty, the errors otherwise.
    ///
    /// # Errors
    ///
    /// Returns `self` if any field has a message.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Loose e-mail shape check: one `@`, a non-empty local part, a dotted domain and no
/// whitespace.
#[must_use]
pub fn is_email_shaped(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

/// A validated booking request, shared by inquiries and checkout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingRequest {
    /// The requested item
    pub item: CatalogRef,
    /// Travel date, strictly after today
    pub booking_date: NaiveDate,
    /// Breakdown
    pub participants: Participants,
    /// Contact
    pub contact: Contact,
    /// Customer notes
    pub special_requests: String,
}

/// Raw inquiry form as posted by the storefront.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InquiryForm {
    /// Set when a tour is booked
    pub tour_id: Option<String>,
    /// Set when an excursion is booked
    pub excursion_id: Option<String>,
    /// Set when an activity is booked
    pub activity_id: Option<String>,
    /// Set when a transfer is booked
    pub transfer_id: Option<String>,
    /// `YYYY-MM-DD`
    pub date: String,
    /// Head count
    pub persons: String,
    /// Optional breakdown
    pub adults: Option<String>,
    /// Optional breakdown
    pub children: Option<String>,
    /// Optional breakdown
    pub babies: Option<String>,
    /// Contact name
    pub name: String,
    /// Contact e-mail
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Customer notes
    pub special_requests: String,
}

impl InquiryForm {
    /// Validates the form against the site-local date `today`.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(&self, today: NaiveDate) -> Result<BookingRequest, FieldErrors> {
        let mut errors = FieldErrors::new();

        let candidates = [
            (CatalogKind::Tour, &self.tour_id),
            (CatalogKind::Excursion, &self.excursion_id),
            (CatalogKind::Activity, &self.activity_id),
            (CatalogKind::Transfer, &self.transfer_id),
        ];
        let chosen: Vec<(CatalogKind, &str)> = candidates
            .iter()
            .filter_map(|(kind, value)| {
                value
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (*kind, v))
            })
            .collect();
        let item = match chosen.as_slice() {
            [(kind, raw)] => match parse_id(raw) {
                Some(id) => Some(CatalogRef::new(*kind, id)),
                None => {
                    errors.add("item", "Invalid item id.");
                    None
                }
            },
            _ => {
                errors.add(
                    "item",
                    "Select exactly one tour, excursion, activity or transfer.",
                );
                None
            }
        };

        let booking_date = validate_date(&self.date, today, &mut errors);
        let persons = parse_participants(&self.persons, "persons", &mut errors);
        let participants = persons.and_then(|persons| self.breakdown(persons, &mut errors));
        let contact = validate_contact(&self.name, &self.email, &self.phone, &mut errors);

        match (item, booking_date, participants, contact) {
            (Some(item), Some(booking_date), Some(participants), Some(contact)) => errors
                .into_result(BookingRequest {
                    item,
                    booking_date,
                    participants,
                    contact,
                    special_requests: self.special_requests.trim().to_string(),
                }),
            _ => Err(errors),
        }
    }

    fn breakdown(&self, persons: u32, errors: &mut FieldErrors) -> Option<Participants> {
        let given = [&self.adults, &self.children, &self.babies]
            .iter()
            .any(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()));
        if !given {
            return Some(Participants::adults_only(persons));
        }

        let mut count = |value: &Option<String>, field: &str| -> Option<u32> {
            let raw = value.as_deref().map_or("", str::trim);
            if raw.is_empty() {
                return Some(0);
            }
            raw.parse::<u32>().ok().or_else(|| {
                errors.add(field, "Enter a whole number.");
                None
            })
        };
        let adults = count(&self.adults, "adults");
        let children = count(&self.children, "children");
        let babies = count(&self.babies, "babies");
        let participants = Participants {
            adults: adults?,
            children: children?,
            babies: babies?,
        };
        if participants.total() == persons {
            Some(participants)
        } else {
            errors.add(
                "persons",
                "Adults, children and babies must add up to the number of persons.",
            );
            None
        }
    }
}

/// Checkout request posted as JSON by the storefront.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    /// Item to pay for
    pub item: Option<CatalogRef>,
    /// Bare tour id accepted for older clients
    pub tour_id: Option<i64>,
    /// Head count
    pub participants: Option<u32>,
    /// `YYYY-MM-DD`
    pub date: String,
    /// Contact name
    pub name: String,
    /// Contact e-mail
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Customer notes
    pub special_requests: String,
}

impl CheckoutForm {
    /// Validates the checkout request with the inquiry rules.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(&self, today: NaiveDate) -> Result<BookingRequest, FieldErrors> {
        let mut errors = FieldErrors::new();

        let item = match (self.item, self.tour_id) {
            (Some(item), None) => Some(item),
            (None, Some(id)) => Some(CatalogRef::Tour(id)),
            (Some(item), Some(id)) if item == CatalogRef::Tour(id) => Some(item),
            (None, None) => {
                errors.add("item", "An item is required.");
                None
            }
            (Some(_), Some(_)) => {
                errors.add("item", "Select exactly one item.");
                None
            }
        };
        let item = item.filter(|item| {
            let valid = item.id() > 0;
            if !valid {
                errors.add("item", "Invalid item id.");
            }
            valid
        });

        let participants = match self.participants {
            Some(n) if (MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&n) => Some(n),
            Some(_) => {
                errors.add("participants", participants_range_message());
                None
            }
            None => {
                errors.add("participants", "This field is required.");
                None
            }
        };
        let booking_date = validate_date(&self.date, today, &mut errors);
        let contact = validate_contact(&self.name, &self.email, &self.phone, &mut errors);
        // Travels to the webhook as provider metadata.
        if self.special_requests.trim().chars().count() > MAX_METADATA_VALUE_LEN {
            errors.add(
                "special_requests",
                format!("Use at most {MAX_METADATA_VALUE_LEN} characters."),
            );
        }

        match (item, booking_date, participants, contact) {
            (Some(item), Some(booking_date), Some(participants), Some(contact)) => errors
                .into_result(BookingRequest {
                    item,
                    booking_date,
                    participants: Participants::adults_only(participants),
                    contact,
                    special_requests: self.special_requests.trim().to_string(),
                }),
            _ => Err(errors),
        }
    }
}

/// Raw review form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewForm {
    /// Catalog kind of the reviewed item
    pub content_type: String,
    /// Id of the reviewed item
    pub object_id: String,
    /// 1 to 5
    pub rating: String,
    /// Author name
    pub name: String,
    /// Author e-mail
    pub email: String,
    /// Headline
    pub title: String,
    /// Body
    pub comment: String,
}

impl ReviewForm {
    /// Reads the polymorphic target, `None` if kind or id are unusable.
    #[must_use]
    pub fn target(&self) -> Option<CatalogRef> {
        let kind = CatalogKind::parse(&self.content_type)?;
        let id = parse_id(self.object_id.trim())?;
        Some(CatalogRef::new(kind, id))
    }

    /// Validates everything except target existence.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(&self, target: CatalogRef) -> Result<NewReview, FieldErrors> {
        let mut errors = FieldErrors::new();

        let rating = match self.rating.trim().parse::<u8>() {
            Ok(r @ 1..=5) => Some(r),
            _ => {
                errors.add("rating", "Choose a rating between 1 and 5.");
                None
            }
        };
        let name = required(&self.name, "name", MAX_NAME_LEN, &mut errors);
        let email = self.email.trim();
        if email.is_empty() {
            errors.add("email", "This field is required.");
        } else if !is_email_shaped(email) {
            errors.add("email", "Enter a valid email address.");
        }
        let title = required(&self.title, "title", MAX_REVIEW_TITLE_LEN, &mut errors);
        let comment = self.comment.trim();
        if comment.is_empty() {
            errors.add("comment", "This field is required.");
        }

        match (rating, name, title) {
            (Some(rating), Some(name), Some(title)) => errors.into_result(NewReview {
                target,
                name,
                email: email.to_string(),
                rating,
                title,
                comment: comment.to_string(),
            }),
            _ => Err(errors),
        }
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

fn participants_range_message() -> String {
    format!("Enter a number between {MIN_PARTICIPANTS} and {MAX_PARTICIPANTS}.")
}

fn parse_participants(raw: &str, field: &str, errors: &mut FieldErrors) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.add(field, "This field is required.");
        return None;
    }
    match raw.parse::<u32>() {
        Ok(n) if (MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&n) => Some(n),
        _ => {
            errors.add(field, participants_range_message());
            None
        }
    }
}

fn validate_date(raw: &str, today: NaiveDate, errors: &mut FieldErrors) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.add("date", "This field is required.");
        return None;
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) if date > today => Some(date),
        Ok(_) => {
            errors.add("date", "The booking date must be in the future.");
            None
        }
        Err(_) => {
            errors.add("date", "Enter a valid date.");
            None
        }
    }
}

fn required(raw: &str, field: &str, max_len: usize, errors: &mut FieldErrors) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, "This field is required.");
        None
    } else if value.chars().count() > max_len {
        errors.add(field, format!("Use at most {max_len} characters."));
        None
    } else {
        Some(value.to_string())
    }
}

fn validate_contact(
    name: &str,
    email: &str,
    phone: &str,
    errors: &mut FieldErrors,
) -> Option<Contact> {
    let name = required(name, "name", MAX_NAME_LEN, errors);
    let email = email.trim();
    let email_ok = if email.is_empty() {
        errors.add("email", "This field is required.");
        false
    } else if email.chars().count() > MAX_EMAIL_LEN {
        errors.add("email", format!("Use at most {MAX_EMAIL_LEN} characters."));
        false
    } else if is_email_shaped(email) {
        true
    } else {
        errors.add("email", "Enter a valid email address.");
        false
    };
    let phone = required(phone, "phone", MAX_PHONE_LEN, errors);

    match (name, phone) {
        (Some(name), Some(phone)) if email_ok => Some(Contact {
            name,
            email: email.to_string(),
            phone,
        }),
        _ => None,
    }
}
