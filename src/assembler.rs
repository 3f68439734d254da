// 🧩 Response Assembler - Picks a data source per query and builds the body
//
// Precedence, strictly in this order:
//   1. Static snapshot for the exact query shape (served verbatim)
//   2. Live computation over the comprehensive tier
//   3. Basic-tier aggregates with injected variation
//
// Every failure comes back as an ApiError; nothing here panics on bad input.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::calculator::{self, RegionStatistics};
use crate::error::ApiError;
use crate::model::{round2, CountySummary, District, FeedbackEntry, RegionRecord};
use crate::query::{EntryQuery, Pagination, DEFAULT_ALL_ENTRY_LIMIT, DEFAULT_REGION_ENTRY_LIMIT};
use crate::registry::{RegionRegistry, RegistrySnapshot};
use crate::resolver;
use crate::reviews::{self, ReviewView, CATALOG};
use crate::snapshots::{self, SnapshotKey, SnapshotStore};
use crate::variation::{VariationInjector, DISTRICT_VARIANCE, OVERALL_VARIANCE, REGION_VARIANCE};

/// District rating assumed when the generator left it out
const DEFAULT_DISTRICT_RATING: f64 = 4.0;

// ============================================================================
// SOURCE SELECTION
// ============================================================================

/// Where an answer comes from
#[derive(Debug)]
pub enum DataSource<'a> {
    Static(Value),
    Comprehensive(&'a RegistrySnapshot),
    Basic(&'a RegistrySnapshot),
}

/// A response body: either a snapshot verbatim or a freshly built value
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Assembled<T> {
    Snapshot(Value),
    Live(T),
}

impl<T> Assembled<T> {
    pub fn is_snapshot(&self) -> bool {
        matches!(self, Assembled::Snapshot(_))
    }

    pub fn live(self) -> Option<T> {
        match self {
            Assembled::Live(value) => Some(value),
            Assembled::Snapshot(_) => None,
        }
    }
}

// ============================================================================
// RESPONSE BODIES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallResponse {
    pub success: bool,
    pub average_rating: f64,
    pub stars: i64,
    pub score: i64,
    pub total_states: usize,
    pub total_reviews: usize,
    pub recommend_rate: i64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSummaryView {
    pub average_rating: f64,
    pub stars: i64,
    pub score: i64,
    pub districts: Vec<District>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllRegionsResponse {
    pub success: bool,
    pub states: BTreeMap<String, RegionSummaryView>,
    pub total_states: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionDetailResponse {
    pub success: bool,
    pub state_name: String,
    pub average_rating: f64,
    pub stars: i64,
    pub score: i64,
    pub districts: Vec<District>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_county: Option<CountySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowest_county: Option<CountySummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingFilters {
    pub min_rating: f64,
    pub max_rating: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionEntriesResponse {
    pub success: bool,
    pub state_name: String,
    pub entries: Vec<FeedbackEntry>,
    pub pagination: Pagination,
    pub filters: RatingFilters,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllEntryFilters {
    pub state: String,
    pub min_rating: f64,
    pub max_rating: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllEntriesResponse {
    pub success: bool,
    pub entries: Vec<FeedbackEntry>,
    pub pagination: Pagination,
    pub filters: AllEntryFilters,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStatisticsResponse {
    pub success: bool,
    pub state_name: String,
    pub statistics: RegionStatistics,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionListResponse {
    pub success: bool,
    pub states: Vec<String>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewsResponse {
    pub success: bool,
    pub reviews: Vec<ReviewView>,
    pub total: usize,
    pub available: usize,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// DISPLAY HELPERS
// ============================================================================

/// Stars shown for a (possibly jittered) rating
pub fn display_stars(rating: f64) -> i64 {
    (rating.round() as i64).clamp(1, 5)
}

/// 0-100 score shown for a (possibly jittered) rating
pub fn display_score(rating: f64) -> i64 {
    ((rating * 20.0).round() as i64).clamp(0, 100)
}

// ============================================================================
// ASSEMBLER
// ============================================================================

#[derive(Clone)]
pub struct ResponseAssembler {
    registry: Arc<RegionRegistry>,
    snapshots: SnapshotStore,
    injector: VariationInjector,
}

impl ResponseAssembler {
    pub fn new(registry: Arc<RegionRegistry>, snapshots: SnapshotStore, injector: VariationInjector) -> Self {
        ResponseAssembler {
            registry,
            snapshots,
            injector,
        }
    }

    pub fn registry(&self) -> &Arc<RegionRegistry> {
        &self.registry
    }

    /// Snapshot first (when `key` is given), then whichever tier is loaded
    pub fn select<'a>(&self, key: Option<SnapshotKey<'_>>, data: &'a RegistrySnapshot) -> DataSource<'a> {
        if let Some(value) = key.and_then(|k| self.snapshots.fetch(&k)) {
            return DataSource::Static(value);
        }
        if data.has_comprehensive() {
            DataSource::Comprehensive(data)
        } else {
            DataSource::Basic(data)
        }
    }

    // ------------------------------------------------------------------------
    // Overall
    // ------------------------------------------------------------------------

    pub fn overall(&self) -> Result<Assembled<OverallResponse>, ApiError> {
        let data = self.registry.snapshot();

        let aggregate = match self.select(Some(SnapshotKey::Overall), &data) {
            DataSource::Static(value) => return Ok(Assembled::Snapshot(value)),
            _ if !data.is_loaded() => return Err(ApiError::unloaded()),
            DataSource::Comprehensive(d) => calculator::overall(d, &self.injector),
            DataSource::Basic(d) => calculator::region_mean(d, &self.injector),
        };

        if !aggregate.rating.is_finite() {
            return Err(ApiError::Internal(
                "Overall rating could not be computed".to_string(),
            ));
        }

        let live = self.injector.jitter(aggregate.rating, OVERALL_VARIANCE);
        Ok(Assembled::Live(OverallResponse {
            success: true,
            average_rating: round2(live),
            stars: display_stars(live),
            score: display_score(live),
            total_states: aggregate.total_states,
            total_reviews: aggregate.total_reviews,
            recommend_rate: aggregate.recommend_rate(),
            last_updated: Utc::now(),
        }))
    }

    // ------------------------------------------------------------------------
    // All regions / single region
    // ------------------------------------------------------------------------

    pub fn all_regions(&self) -> Result<Assembled<AllRegionsResponse>, ApiError> {
        let data = self.registry.snapshot();

        let data = match self.select(Some(SnapshotKey::AllRegions), &data) {
            DataSource::Static(value) => return Ok(Assembled::Snapshot(value)),
            _ if !data.is_loaded() => return Err(ApiError::unloaded()),
            DataSource::Comprehensive(d) | DataSource::Basic(d) => d,
        };

        let now = Utc::now();
        let states: BTreeMap<String, RegionSummaryView> = data
            .regions()
            .filter_map(|record| {
                let rating = record.rating()?;
                let live = self.injector.jitter(rating, REGION_VARIANCE);
                Some((
                    record.name.clone(),
                    RegionSummaryView {
                        average_rating: round2(live),
                        stars: display_stars(live),
                        score: display_score(live),
                        districts: self.jitter_districts(&record.districts),
                        last_updated: now,
                    },
                ))
            })
            .collect();

        Ok(Assembled::Live(AllRegionsResponse {
            success: true,
            total_states: states.len(),
            states,
            timestamp: now,
        }))
    }

    pub fn region(&self, requested: &str) -> Result<Assembled<RegionDetailResponse>, ApiError> {
        if requested.trim().is_empty() {
            return Err(ApiError::BadRequest("State name is required".to_string()));
        }

        let data = self.registry.snapshot();
        let data = match self.select(Some(SnapshotKey::Region(requested)), &data) {
            DataSource::Static(value) => return Ok(Assembled::Snapshot(value)),
            _ if !data.is_loaded() => return Err(ApiError::unloaded()),
            DataSource::Comprehensive(d) | DataSource::Basic(d) => d,
        };

        let record = resolve_record(data, requested)?;
        let rating = record.rating().ok_or_else(|| {
            ApiError::Internal(format!("State data for {} is missing required fields", record.name))
        })?;

        let live = self.injector.jitter(rating, REGION_VARIANCE);

        // Counties are only shown as a pair
        let (highest_county, lowest_county) = match (&record.highest_county, &record.lowest_county) {
            (Some(high), Some(low)) => (Some(high.clone()), Some(low.clone())),
            _ => (None, None),
        };

        Ok(Assembled::Live(RegionDetailResponse {
            success: true,
            state_name: record.name.clone(),
            average_rating: round2(live),
            stars: display_stars(live),
            score: display_score(live),
            districts: self.jitter_districts(&record.districts),
            last_updated: Utc::now(),
            highest_county,
            lowest_county,
        }))
    }

    fn jitter_districts(&self, districts: &[District]) -> Vec<District> {
        districts
            .iter()
            .map(|district| {
                let base = district
                    .average_rating
                    .filter(|r| *r > 0.0)
                    .unwrap_or(DEFAULT_DISTRICT_RATING);
                District {
                    average_rating: Some(round2(self.injector.jitter(base, DISTRICT_VARIANCE))),
                    ..district.clone()
                }
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Entries
    // ------------------------------------------------------------------------

    pub fn region_entries(
        &self,
        requested: &str,
        query: &EntryQuery,
    ) -> Result<Assembled<RegionEntriesResponse>, ApiError> {
        let key = query
            .is_snapshot_shape()
            .then_some(SnapshotKey::RegionEntries(requested));

        let data = self.registry.snapshot();
        let data = match self.select(key, &data) {
            DataSource::Static(mut value) => {
                if query.page.limit != DEFAULT_REGION_ENTRY_LIMIT {
                    snapshots::truncate_entries(&mut value, query.page.limit);
                }
                return Ok(Assembled::Snapshot(value));
            }
            _ if !data.is_loaded() => return Err(ApiError::unloaded()),
            DataSource::Comprehensive(d) => d,
            DataSource::Basic(d) => {
                let record = resolve_record(d, requested)?;
                return Err(ApiError::DataUnavailable {
                    region: record.name.clone(),
                });
            }
        };

        let record = resolve_record(data, requested)?;
        let entries = data.entries(&record.name).ok_or_else(|| ApiError::DataUnavailable {
            region: record.name.clone(),
        })?;

        let mut matching: Vec<&FeedbackEntry> = entries
            .iter()
            .filter(|e| query.accepts(e))
            .collect();
        sort_newest_first(&mut matching);

        let page = query.page.slice(&matching);
        Ok(Assembled::Live(RegionEntriesResponse {
            success: true,
            state_name: record.name.clone(),
            entries: page.iter().map(|e| (*e).clone()).collect(),
            pagination: query.page.pagination(matching.len()),
            filters: RatingFilters {
                min_rating: query.filter.min,
                max_rating: query.filter.max,
                verified: query.verified,
            },
            timestamp: Utc::now(),
        }))
    }

    pub fn all_entries(&self, query: &EntryQuery) -> Result<Assembled<AllEntriesResponse>, ApiError> {
        let key = query.is_snapshot_shape().then_some(SnapshotKey::AllEntries);

        let data = self.registry.snapshot();
        let filters = AllEntryFilters {
            state: query.state.clone().unwrap_or_else(|| "all".to_string()),
            min_rating: query.filter.min,
            max_rating: query.filter.max,
            verified: query.verified,
        };

        let data = match self.select(key, &data) {
            DataSource::Static(mut value) => {
                if query.page.limit != DEFAULT_ALL_ENTRY_LIMIT {
                    snapshots::truncate_entries(&mut value, query.page.limit);
                }
                return Ok(Assembled::Snapshot(value));
            }
            _ if !data.is_loaded() => return Err(ApiError::unloaded()),
            DataSource::Comprehensive(d) => d,
            DataSource::Basic(_) => {
                // No entry-level data anywhere: an empty listing, not an error
                return Ok(Assembled::Live(AllEntriesResponse {
                    success: true,
                    entries: Vec::new(),
                    pagination: query.page.pagination(0),
                    filters,
                    timestamp: Utc::now(),
                }));
            }
        };

        let state_filter = query.state.as_deref().map(str::to_lowercase);
        let mut matching: Vec<(&str, &FeedbackEntry)> = Vec::new();

        for record in data.comprehensive_regions() {
            if let Some(wanted) = &state_filter {
                if record.name.to_lowercase() != *wanted {
                    continue;
                }
            }
            if let Some(entries) = record.entries.as_ref() {
                matching.extend(
                    entries
                        .iter()
                        .filter(|e| query.accepts(e))
                        .map(|e| (record.name.as_str(), e)),
                );
            }
        }

        matching.sort_by(|a, b| b.1.date.cmp(&a.1.date));

        let page = query.page.slice(&matching);
        Ok(Assembled::Live(AllEntriesResponse {
            success: true,
            entries: page
                .iter()
                .map(|(state, entry)| FeedbackEntry {
                    state: (*state).to_string(),
                    ..(*entry).clone()
                })
                .collect(),
            pagination: query.page.pagination(matching.len()),
            filters,
            timestamp: Utc::now(),
        }))
    }

    // ------------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------------

    pub fn region_statistics(&self, requested: &str) -> Result<Assembled<RegionStatisticsResponse>, ApiError> {
        let data = self.registry.snapshot();
        let data = match self.select(Some(SnapshotKey::RegionStatistics(requested)), &data) {
            DataSource::Static(value) => return Ok(Assembled::Snapshot(value)),
            _ if !data.is_loaded() => return Err(ApiError::unloaded()),
            DataSource::Comprehensive(d) | DataSource::Basic(d) => d,
        };

        let record = resolve_record(data, requested)?;
        let now = Utc::now();
        let statistics = calculator::statistics_for(data, &record.name, now)?;

        Ok(Assembled::Live(RegionStatisticsResponse {
            success: true,
            state_name: record.name.clone(),
            statistics,
            timestamp: now,
        }))
    }

    // ------------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------------

    /// Sorted keys; empty (not an error) while unloaded
    pub fn region_keys(&self) -> Assembled<RegionListResponse> {
        let data = self.registry.snapshot();
        match self.select(Some(SnapshotKey::RegionList), &data) {
            DataSource::Static(value) => Assembled::Snapshot(value),
            DataSource::Comprehensive(d) | DataSource::Basic(d) => {
                let states = d.keys();
                Assembled::Live(RegionListResponse {
                    success: true,
                    count: states.len(),
                    states,
                    timestamp: Utc::now(),
                })
            }
        }
    }

    /// Featured reviews; `limit` is already capped
    pub fn reviews(&self, limit: usize) -> Assembled<ReviewsResponse> {
        if let Some(mut value) = self.snapshots.fetch(&SnapshotKey::Reviews) {
            snapshots::truncate_reviews(&mut value, limit);
            return Assembled::Snapshot(value);
        }

        let now = Utc::now();
        let reviews = reviews::featured(limit, &self.injector, now);
        Assembled::Live(ReviewsResponse {
            success: true,
            total: reviews.len(),
            reviews,
            available: CATALOG.len(),
            timestamp: now,
        })
    }
}

fn resolve_record<'a>(data: &'a RegistrySnapshot, requested: &str) -> Result<&'a RegionRecord, ApiError> {
    let keys: Vec<&str> = data.key_refs().collect();
    resolver::resolve(requested, &keys)
        .and_then(|res| data.get(res.name))
        .ok_or_else(|| ApiError::not_found(requested.trim(), &data.keys()))
}

/// Newest first; entries sharing a date keep their stored order
fn sort_newest_first(entries: &mut [&FeedbackEntry]) {
    entries.sort_by(|a, b| b.date.cmp(&a.date));
}

// ============================================================================
// TESTS
// ============================================================================
