// 🗺️ Region Model - Regions, districts, counties and feedback entries
// Shapes match the JSON produced by the dataset generators

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// RATING ARITHMETIC
// ============================================================================

/// Score on the 0-100 scale for a rating on the 1-5 scale
pub fn score_for(rating: f64) -> i64 {
    (rating * 20.0).round() as i64
}

/// Whole-star rating
pub fn stars_for(rating: f64) -> i64 {
    rating.round() as i64
}

/// Round to 2 decimal places (serialization precision)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamp a rating into [0, 5]
pub fn clamp_rating(value: f64) -> f64 {
    value.clamp(0.0, 5.0)
}

// ============================================================================
// FEEDBACK CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Coverage,
    Price,
    #[serde(rename = "Customer Service")]
    CustomerService,
    #[serde(rename = "Network Speed")]
    NetworkSpeed,
    Reliability,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Coverage => "Coverage",
            Category::Price => "Price",
            Category::CustomerService => "Customer Service",
            Category::NetworkSpeed => "Network Speed",
            Category::Reliability => "Reliability",
        }
    }

    pub fn all() -> [Category; 5] {
        [
            Category::Coverage,
            Category::Price,
            Category::CustomerService,
            Category::NetworkSpeed,
            Category::Reliability,
        ]
    }
}

// ============================================================================
// COUNTY / DISTRICT SUMMARIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyContact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// Extremal county of a region (highest / lowest rated)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountySummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<CountyContact>,
}

/// Sub-region summary. Fields the generators add beyond name and rating are
/// kept in `extra` and echoed back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct District {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// ENTRY DATE
// ============================================================================

/// When an entry was written. Generators emit either a bare `YYYY-MM-DD` or a
/// full RFC 3339 instant; both are accepted and written back in the same form.
/// Bare dates sit at midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryDate {
    instant: DateTime<Utc>,
    date_only: bool,
}

impl EntryDate {
    pub fn from_date(date: NaiveDate) -> Self {
        EntryDate {
            instant: date.and_time(NaiveTime::MIN).and_utc(),
            date_only: true,
        }
    }

    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        EntryDate {
            instant,
            date_only: false,
        }
    }

    pub fn parse(text: &str) -> Result<Self, chrono::ParseError> {
        let text = text.trim();
        match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            Ok(date) => Ok(Self::from_date(date)),
            Err(_) => DateTime::parse_from_rfc3339(text).map(|dt| Self::from_instant(dt.with_timezone(&Utc))),
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn date(&self) -> NaiveDate {
        self.instant.date_naive()
    }
}

impl fmt::Display for EntryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.date_only {
            write!(f, "{}", self.instant.format("%Y-%m-%d"))
        } else {
            f.write_str(&self.instant.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
    }
}

impl Serialize for EntryDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntryDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        EntryDate::parse(&text)
            .map_err(|e| de::Error::custom(format!("invalid entry date {text:?}: {e}")))
    }
}

// ============================================================================
// FEEDBACK ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub county: String,
    #[serde(default)]
    pub city: String,
    pub rating: f64,
    #[serde(default)]
    pub score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    pub date: EntryDate,
    pub category: Category,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county_contact: Option<CountyContact>,
}

impl FeedbackEntry {
    /// Re-derive `score` from `rating`
    pub fn normalize(&mut self) {
        self.score = score_for(self.rating);
    }
}

// ============================================================================
// REGION RECORD
// ============================================================================

/// One region (a state). `name` comes from the registry key, not the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionRecord {
    #[serde(default, skip_serializing)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,

    #[serde(default)]
    pub score: i64,

    #[serde(default)]
    pub stars: i64,

    #[serde(default)]
    pub districts: Vec<District>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_county: Option<CountySummary>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lowest_county: Option<CountySummary>,

    /// Present only in the comprehensive tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<FeedbackEntry>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_entries: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl RegionRecord {
    /// Usable rating. Missing and zero ratings both count as absent.
    pub fn rating(&self) -> Option<f64> {
        self.average_rating.filter(|r| *r > 0.0)
    }

    /// Entries, if this is a comprehensive record
    pub fn entry_slice(&self) -> Option<&[FeedbackEntry]> {
        self.entries.as_deref()
    }

    /// Mean entry rating, `None` when there are no entries
    pub fn entry_mean(&self) -> Option<f64> {
        let entries = self.entries.as_ref()?;
        if entries.is_empty() {
            return None;
        }
        Some(entries.iter().map(|e| e.rating).sum::<f64>() / entries.len() as f64)
    }

    /// Basic-tier view: same record with the entry collection stripped
    pub fn to_basic(&self) -> RegionRecord {
        RegionRecord {
            entries: None,
            total_entries: None,
            last_updated: None,
            ..self.clone()
        }
    }

    /// Restore score/rating consistency after offline adjustments.
    ///
    /// Entry scores are recomputed from entry ratings. When entries exist the
    /// region rating is re-derived from them; otherwise the stored rating is
    /// clamped and score/stars follow it.
    pub fn normalize(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            for entry in entries.iter_mut() {
                entry.normalize();
            }
            self.total_entries = Some(entries.len());
        }

        if let Some(mean) = self.entry_mean() {
            self.average_rating = Some(round2(clamp_rating(mean)));
        } else if let Some(rating) = self.average_rating {
            self.average_rating = Some(clamp_rating(rating));
        }

        if let Some(rating) = self.rating() {
            self.score = score_for(rating);
            self.stars = stars_for(rating);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
