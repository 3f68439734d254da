// 💬 Featured Reviews - Curated testimonials for the landing page
//
// A fixed catalog, shuffled per request. Ratings get the usual jitter but are
// kept at 4-5 stars; dates are spread over the last 30 days.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::variation::{VariationInjector, REVIEW_VARIANCE};

/// Reviews returned when no limit is given
pub const DEFAULT_REVIEW_LIMIT: usize = 6;
/// Hard cap on reviews per request
pub const MAX_REVIEW_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeaturedReview {
    pub id: u32,
    pub name: &'static str,
    pub location: &'static str,
    pub rating: u8,
    pub text: &'static str,
}

pub const CATALOG: [FeaturedReview; 12] = [
    FeaturedReview { id: 1, name: "Sarah M.", location: "Los Angeles, CA", rating: 5, text: "Switched from my old carrier and couldn't be happier! The coverage is excellent and customer service is top-notch." },
    FeaturedReview { id: 2, name: "Michael R.", location: "Austin, TX", rating: 5, text: "Best value for money. The 5G speeds are incredible and I'm saving so much every month." },
    FeaturedReview { id: 3, name: "Jennifer L.", location: "Seattle, WA", rating: 4, text: "Great service overall. Had a small issue with billing but customer support resolved it quickly." },
    FeaturedReview { id: 4, name: "David K.", location: "Miami, FL", rating: 5, text: "The network has improved dramatically. I get great coverage everywhere I go now." },
    FeaturedReview { id: 5, name: "Emily C.", location: "Denver, CO", rating: 4, text: "Love the unlimited data plans. The family plan is a great deal and everyone in my family is happy." },
    FeaturedReview { id: 6, name: "Robert T.", location: "Chicago, IL", rating: 5, text: "Switched three months ago and it's been perfect. Fast speeds, reliable connection, and great customer service." },
    FeaturedReview { id: 7, name: "Amanda P.", location: "Phoenix, AZ", rating: 5, text: "The 5G network is amazing! I can stream videos without any buffering." },
    FeaturedReview { id: 8, name: "James W.", location: "Boston, MA", rating: 4, text: "Good coverage and reasonable prices. Customer service could be faster but they're helpful when you reach them." },
    FeaturedReview { id: 9, name: "Lisa H.", location: "San Diego, CA", rating: 5, text: "Saved $50/month after switching. The service is just as good, if not better. Highly recommend!" },
    FeaturedReview { id: 10, name: "Mark S.", location: "Portland, OR", rating: 4, text: "Solid network coverage. The unlimited data is great for my work. Occasional slow speeds in rural areas." },
    FeaturedReview { id: 11, name: "Rachel B.", location: "Nashville, TN", rating: 5, text: "Excellent customer service! They helped me switch seamlessly and even gave me a better deal than advertised." },
    FeaturedReview { id: 12, name: "Chris M.", location: "Las Vegas, NV", rating: 4, text: "Great value for the price. Network is reliable and fast. The app is user-friendly too." },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewView {
    pub id: u32,
    pub name: &'static str,
    pub location: &'static str,
    pub rating: i64,
    pub text: &'static str,
    pub date: DateTime<Utc>,
}

/// Up to `limit` reviews (already clamped by the caller), shuffled and jittered
pub fn featured(limit: usize, injector: &VariationInjector, now: DateTime<Utc>) -> Vec<ReviewView> {
    let mut picked = CATALOG.to_vec();
    injector.shuffle(&mut picked);
    picked.truncate(limit);

    picked
        .into_iter()
        .map(|review| {
            let rating = injector
                .jitter(f64::from(review.rating), REVIEW_VARIANCE)
                .round() as i64;
            let age_ms = (injector.unit() * 30.0 * 24.0 * 3600.0 * 1000.0) as i64;

            ReviewView {
                id: review.id,
                name: review.name,
                location: review.location,
                rating: rating.clamp(4, 5),
                text: review.text,
                date: now - Duration::milliseconds(age_ms),
            }
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variation::FixedRandom;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_featured_respects_limit_and_bounds() {
        let injector = VariationInjector::live();
        let now = Utc::now();

        let reviews = featured(MAX_REVIEW_LIMIT, &injector, now);
        assert_eq!(reviews.len(), CATALOG.len());

        let ids: HashSet<u32> = reviews.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), CATALOG.len());

        for review in &reviews {
            assert!((4..=5).contains(&review.rating));
            assert!(review.date <= now);
            assert!(review.date >= now - Duration::days(30));
        }

        assert_eq!(featured(3, &injector, now).len(), 3);
    }

    #[test]
    fn test_featured_deterministic_with_fixed_source() {
        let injector = VariationInjector::new(Arc::new(FixedRandom(0.0)));
        let now = Utc::now();
        let reviews = featured(2, &injector, now);

        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].date, now);
    }
}
