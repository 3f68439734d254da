// 📊 Aggregate Calculator - Overall and per-region statistics
//
// Overall: weighted by entry count when the comprehensive tier is present,
// otherwise an unweighted mean over basic ratings with synthetic review counts.
// Per-region statistics need entries and fail with DataUnavailable without them.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::{round2, FeedbackEntry};
use crate::registry::RegistrySnapshot;
use crate::variation::VariationInjector;

/// Review count assumed for a comprehensive region that has no entries
pub const ESTIMATED_REVIEWS_PER_REGION: usize = 100;

/// Window for `recentEntries`
pub const RECENT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Comprehensive data not loaded for {region}")]
pub struct DataUnavailable {
    pub region: String,
}

// ============================================================================
// OVERALL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AggregateBasis {
    /// Σ(mean × count) / Σ count over comprehensive regions
    EntryWeighted,
    /// Plain mean of basic region ratings
    RegionMean,
}

/// Un-jittered overall figures
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallAggregate {
    pub rating: f64,
    pub total_states: usize,
    pub total_reviews: usize,
    pub basis: AggregateBasis,
}

impl OverallAggregate {
    pub fn recommend_rate(&self) -> i64 {
        recommend_rate(self.rating)
    }
}

pub fn recommend_rate(rating: f64) -> i64 {
    ((rating * 20.0 + 5.0).round() as i64).clamp(85, 98)
}

/// Weighted mean across comprehensive regions. `None` when there is no
/// comprehensive tier or nothing to weigh.
pub fn entry_weighted(snapshot: &RegistrySnapshot) -> Option<OverallAggregate> {
    if !snapshot.has_comprehensive() {
        return None;
    }

    let mut weighted_sum = 0.0;
    let mut count = 0usize;
    let mut regions = 0usize;

    for record in snapshot.comprehensive_regions() {
        regions += 1;
        match (record.entry_mean(), record.entries.as_ref()) {
            (Some(mean), Some(entries)) => {
                weighted_sum += mean * entries.len() as f64;
                count += entries.len();
            }
            _ => {
                if let Some(rating) = snapshot.get(&record.name).and_then(|r| r.rating()) {
                    weighted_sum += rating * ESTIMATED_REVIEWS_PER_REGION as f64;
                    count += ESTIMATED_REVIEWS_PER_REGION;
                }
            }
        }
    }

    if count == 0 {
        return None;
    }

    Some(OverallAggregate {
        rating: weighted_sum / count as f64,
        total_states: regions,
        total_reviews: count,
        basis: AggregateBasis::EntryWeighted,
    })
}

/// Unweighted mean over regions with a rating. Review counts are synthetic:
/// 500..1500 per region drawn from the injector's source.
pub fn region_mean(snapshot: &RegistrySnapshot, injector: &VariationInjector) -> OverallAggregate {
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut total_reviews = 0usize;

    for rating in snapshot.regions().filter_map(|r| r.rating()) {
        sum += rating;
        count += 1;
        total_reviews += injector.int_in(500, 1000) as usize;
    }

    OverallAggregate {
        rating: if count > 0 { sum / count as f64 } else { 0.0 },
        total_states: count,
        total_reviews,
        basis: AggregateBasis::RegionMean,
    }
}

pub fn overall(snapshot: &RegistrySnapshot, injector: &VariationInjector) -> OverallAggregate {
    entry_weighted(snapshot).unwrap_or_else(|| region_mean(snapshot, injector))
}

// ============================================================================
// PER-REGION STATISTICS
// ============================================================================

/// Counts for star values 5..1. Only ratings exactly equal to an integer are
/// counted; half-point ratings fall into no bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingDistribution {
    counts: [usize; 5],
}

impl RatingDistribution {
    pub fn from_entries(entries: &[FeedbackEntry]) -> Self {
        let mut counts = [0usize; 5];
        for entry in entries {
            for star in 1..=5u8 {
                if entry.rating == f64::from(star) {
                    counts[usize::from(star) - 1] += 1;
                }
            }
        }
        RatingDistribution { counts }
    }

    /// Count for `star` in 1..=5
    pub fn get(&self, star: u8) -> usize {
        match star {
            1..=5 => self.counts[usize::from(star) - 1],
            _ => 0,
        }
    }

    pub fn bucketed(&self) -> usize {
        self.counts.iter().sum()
    }
}

impl Serialize for RatingDistribution {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(5))?;
        for star in (1..=5u8).rev() {
            map.serialize_entry(&star.to_string(), &self.get(star))?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStatistics {
    pub total_entries: usize,
    pub average_rating: f64,
    pub average_score: i64,
    pub rating_distribution: RatingDistribution,
    pub category_distribution: BTreeMap<String, usize>,
    pub verified_entries: usize,
    pub unverified_entries: usize,
    pub recent_entries: usize,
    pub verified_percentage: i64,
}

/// Statistics over `entries` as of `now`
pub fn region_statistics(
    region: &str,
    entries: &[FeedbackEntry],
    now: DateTime<Utc>,
) -> Result<RegionStatistics, DataUnavailable> {
    if entries.is_empty() {
        return Err(DataUnavailable {
            region: region.to_string(),
        });
    }

    let total = entries.len();
    let average_rating = entries.iter().map(|e| e.rating).sum::<f64>() / total as f64;
    let average_score = entries.iter().map(|e| e.score as f64).sum::<f64>() / total as f64;

    let mut category_distribution = BTreeMap::new();
    for entry in entries {
        *category_distribution
            .entry(entry.category.as_str().to_string())
            .or_insert(0) += 1;
    }

    let verified = entries.iter().filter(|e| e.verified).count();

    let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
    let recent = entries
        .iter()
        .filter(|e| e.date.instant() >= cutoff)
        .count();

    Ok(RegionStatistics {
        total_entries: total,
        average_rating: round2(average_rating),
        average_score: average_score.round() as i64,
        rating_distribution: RatingDistribution::from_entries(entries),
        category_distribution,
        verified_entries: verified,
        unverified_entries: total - verified,
        recent_entries: recent,
        verified_percentage: (verified as f64 / total as f64 * 100.0).round() as i64,
    })
}

/// Look the region up in the snapshot's comprehensive tier, then compute
pub fn statistics_for(
    snapshot: &RegistrySnapshot,
    region: &str,
    now: DateTime<Utc>,
) -> Result<RegionStatistics, DataUnavailable> {
    let entries = snapshot.entries(region).ok_or_else(|| DataUnavailable {
        region: region.to_string(),
    })?;
    region_statistics(region, entries, now)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{entry, region};
    use crate::model::Category;
    use crate::variation::FixedRandom;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn fixed(u: f64) -> VariationInjector {
        VariationInjector::new(Arc::new(FixedRandom(u)))
    }

    fn entries_with(ratings: &[f64]) -> Vec<FeedbackEntry> {
        ratings
            .iter()
            .enumerate()
            .map(|(i, r)| entry(&format!("e-{i}"), *r, "2025-01-01"))
            .collect()
    }

    fn comprehensive(regions: Vec<(&str, Vec<FeedbackEntry>)>) -> RegistrySnapshot {
        let map = regions
            .into_iter()
            .map(|(name, entries)| {
                let mut record = region(name, 3.0);
                record.entries = Some(entries);
                (name.to_string(), record)
            })
            .collect();
        RegistrySnapshot::from_comprehensive(map)
    }

    #[test]
    fn test_weighted_overall_matches_hand_computation() {
        // A: 3 entries mean 4.0, B: 1 entry mean 2.0 → (12 + 2) / 4 = 3.5
        let snapshot = comprehensive(vec![
            ("Alpha", entries_with(&[4.0, 4.5, 3.5])),
            ("Beta", entries_with(&[2.0])),
        ]);

        let agg = entry_weighted(&snapshot).unwrap();
        assert_relative_eq!(agg.rating, 3.5, epsilon = 1e-9);
        assert_eq!(agg.total_reviews, 4);
        assert_eq!(agg.total_states, 2);
        assert_eq!(agg.basis, AggregateBasis::EntryWeighted);
    }

    #[test]
    fn test_weighted_overall_estimates_empty_regions() {
        let mut map = BTreeMap::new();
        let mut alpha = region("Alpha", 5.0);
        alpha.entries = Some(entries_with(&[5.0, 5.0]));
        map.insert("Alpha".to_string(), alpha);
        let mut beta = region("Beta", 4.0);
        beta.entries = Some(Vec::new());
        map.insert("Beta".to_string(), beta);

        let snapshot = RegistrySnapshot::from_comprehensive(map);
        let agg = entry_weighted(&snapshot).unwrap();

        // (5*2 + 4*100) / 102
        assert_relative_eq!(agg.rating, 410.0 / 102.0, epsilon = 1e-9);
        assert_eq!(agg.total_reviews, 102);
    }

    #[test]
    fn test_region_mean_fallback() {
        let mut map = BTreeMap::new();
        map.insert("Alpha".to_string(), region("Alpha", 4.0));
        map.insert("Beta".to_string(), region("Beta", 3.0));
        let mut unrated = region("Gamma", 0.0);
        unrated.average_rating = None;
        map.insert("Gamma".to_string(), unrated);
        let snapshot = RegistrySnapshot::from_basic(map);

        assert!(entry_weighted(&snapshot).is_none());

        let agg = overall(&snapshot, &fixed(0.5));
        assert_relative_eq!(agg.rating, 3.5, epsilon = 1e-9);
        assert_eq!(agg.total_states, 2);
        assert_eq!(agg.total_reviews, 2000);
        assert_eq!(agg.basis, AggregateBasis::RegionMean);
    }

    #[test]
    fn test_region_mean_empty_registry() {
        let agg = region_mean(&RegistrySnapshot::empty(), &fixed(0.5));
        assert_eq!(agg.rating, 0.0);
        assert_eq!(agg.total_states, 0);
        assert_eq!(agg.total_reviews, 0);
    }

    #[test]
    fn test_recommend_rate_clamped() {
        assert_eq!(recommend_rate(4.15), 88);
        assert_eq!(recommend_rate(1.0), 85);
        assert_eq!(recommend_rate(5.0), 98);
        assert_eq!(recommend_rate(4.6), 97);
    }

    #[test]
    fn test_histogram_skips_half_points() {
        let entries = entries_with(&[5.0, 5.0, 4.0, 3.5, 1.0]);
        let dist = RatingDistribution::from_entries(&entries);

        assert_eq!(dist.get(5), 2);
        assert_eq!(dist.get(4), 1);
        assert_eq!(dist.get(3), 0);
        assert_eq!(dist.get(2), 0);
        assert_eq!(dist.get(1), 1);
        // 3.5 lands in no bucket
        assert_eq!(dist.bucketed(), 4);

        let json = serde_json::to_value(&dist).unwrap();
        assert_eq!(json, serde_json::json!({"5": 2, "4": 1, "3": 0, "2": 0, "1": 1}));
    }

    #[test]
    fn test_region_statistics() {
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();

        let mut entries = vec![
            entry("a", 5.0, "2025-06-29"),
            entry("b", 4.5, "2025-06-01"),
            entry("c", 3.0, "2025-05-31"), // midnight is before the cutoff (05-31 12:00)
            entry("d", 1.0, "2025-01-15"),
        ];
        entries[1].category = Category::Price;
        entries[2].category = Category::Price;
        entries[3].verified = false;

        let stats = region_statistics("Texas", &entries, now).unwrap();

        assert_eq!(stats.total_entries, 4);
        assert_relative_eq!(stats.average_rating, 3.38, epsilon = 1e-9);
        assert_eq!(stats.average_score, 68);
        assert_eq!(stats.verified_entries, 3);
        assert_eq!(stats.unverified_entries, 1);
        assert_eq!(stats.verified_percentage, 75);
        assert_eq!(stats.recent_entries, 2);
        assert_eq!(stats.category_distribution.get("Price"), Some(&2));
        assert_eq!(stats.category_distribution.get("Coverage"), Some(&2));
        assert_eq!(stats.rating_distribution.get(4), 0);
    }

    #[test]
    fn test_recent_cutoff_uses_time_of_day() {
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();

        let entries = vec![
            entry("after", 4.0, "2025-05-31T12:00:00Z"),
            entry("before", 4.0, "2025-05-31T11:59:59.999Z"),
            entry("bare", 4.0, "2025-05-31"),
        ];

        let stats = region_statistics("Texas", &entries, now).unwrap();
        assert_eq!(stats.recent_entries, 1);
    }

    #[test]
    fn test_statistics_without_entries_is_data_unavailable() {
        let mut map = BTreeMap::new();
        map.insert("Texas".to_string(), region("Texas", 4.0));
        let basic = RegistrySnapshot::from_basic(map);

        let err = statistics_for(&basic, "Texas", Utc::now()).unwrap_err();
        assert_eq!(err.region, "Texas");

        let empty = comprehensive(vec![("Texas", Vec::new())]);
        assert!(statistics_for(&empty, "Texas", Utc::now()).is_err());
    }
}
