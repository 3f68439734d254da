// Query parameters for entry listings and reviews.
//
// Numeric values follow the long-standing API contract: a missing value or an
// explicit 0 means "use the default". Text that is not a number, negative
// values and inverted rating ranges are rejected.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::model::FeedbackEntry;
use crate::reviews::{DEFAULT_REVIEW_LIMIT, MAX_REVIEW_LIMIT};

pub const DEFAULT_REGION_ENTRY_LIMIT: usize = 100;
pub const DEFAULT_ALL_ENTRY_LIMIT: usize = 50;
pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;

/// Query string exactly as received
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntryParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub min_rating: Option<String>,
    pub max_rating: Option<String>,
    pub state: Option<String>,
    pub verified: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawReviewParams {
    pub limit: Option<String>,
}

// ============================================================================
// PAGE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    /// The slice of `items` this page covers
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset.min(items.len());
        let end = self.offset.saturating_add(self.limit).min(items.len());
        &items[start..end]
    }

    pub fn pagination(&self, total: usize) -> Pagination {
        Pagination {
            total,
            limit: self.limit,
            offset: self.offset,
            has_more: self.offset.saturating_add(self.limit) < total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

// ============================================================================
// RATING FILTER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingFilter {
    pub min: f64,
    pub max: f64,
}

impl Default for RatingFilter {
    fn default() -> Self {
        RatingFilter {
            min: MIN_RATING,
            max: MAX_RATING,
        }
    }
}

impl RatingFilter {
    pub fn contains(&self, rating: f64) -> bool {
        rating >= self.min && rating <= self.max
    }

    pub fn is_default(&self) -> bool {
        *self == RatingFilter::default()
    }
}

// ============================================================================
// ENTRY QUERY
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct EntryQuery {
    pub page: Page,
    pub filter: RatingFilter,
    pub state: Option<String>,
    /// Keep only verified (`true`) or unverified (`false`) entries
    pub verified: Option<bool>,
}

impl EntryQuery {
    pub fn parse(raw: &RawEntryParams, default_limit: usize) -> Result<Self, ApiError> {
        let limit = parse_count("limit", raw.limit.as_deref())?.unwrap_or(default_limit);
        let offset = parse_count("offset", raw.offset.as_deref())?.unwrap_or(0);
        let min = parse_rating("minRating", raw.min_rating.as_deref())?.unwrap_or(MIN_RATING);
        let max = parse_rating("maxRating", raw.max_rating.as_deref())?.unwrap_or(MAX_RATING);

        if min > max {
            return Err(ApiError::BadRequest(format!(
                "minRating ({min}) must not exceed maxRating ({max})"
            )));
        }

        let state = raw
            .state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(EntryQuery {
            page: Page { limit, offset },
            filter: RatingFilter { min, max },
            state,
            verified: parse_flag("verified", raw.verified.as_deref())?,
        })
    }

    /// Defaults everywhere except possibly `limit`: the shape a snapshot covers
    pub fn is_snapshot_shape(&self) -> bool {
        self.page.offset == 0
            && self.filter.is_default()
            && self.state.is_none()
            && self.verified.is_none()
    }

    /// Rating range and verification flag
    pub fn accepts(&self, entry: &FeedbackEntry) -> bool {
        self.filter.contains(entry.rating) && self.verified.map_or(true, |v| entry.verified == v)
    }
}

/// `limit` for the reviews endpoint, capped at 20
pub fn review_limit(raw: Option<&str>) -> Result<usize, ApiError> {
    Ok(parse_count("limit", raw)?
        .unwrap_or(DEFAULT_REVIEW_LIMIT)
        .min(MAX_REVIEW_LIMIT))
}

/// `None` for missing, blank or zero
fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<usize>, ApiError> {
    let Some(text) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let value: i64 = text
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {name}: {text}")))?;

    if value < 0 {
        return Err(ApiError::BadRequest(format!("{name} must not be negative")));
    }
    Ok((value > 0).then_some(value as usize))
}

fn parse_flag(name: &str, raw: Option<&str>) -> Result<Option<bool>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(text) if text.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(text) if text.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(text) => Err(ApiError::BadRequest(format!(
            "Invalid {name}: {text} (expected true or false)"
        ))),
    }
}

fn parse_rating(name: &str, raw: Option<&str>) -> Result<Option<f64>, ApiError> {
    let Some(text) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let value: f64 = text
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {name}: {text}")))?;

    if !value.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(ApiError::BadRequest(format!("{name} must be between 0 and 5")));
    }
    Ok((value != 0.0).then_some(value))
}

// ============================================================================
// TESTS
// ============================================================================
