// Region Satisfaction - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod model;       // Regions, districts, feedback entries
pub mod registry;    // Region Registry - two tiers behind one swappable snapshot
pub mod resolver;    // Name Resolver - free-form names → canonical keys
pub mod variation;   // Variation Injector - bounded jitter over a RandomSource
pub mod calculator;  // Aggregate Calculator - overall + per-region statistics
pub mod snapshots;   // Precomputed response bodies
pub mod reviews;     // Featured reviews catalog
pub mod query;       // Pagination + rating filters
pub mod error;       // ApiError taxonomy
pub mod assembler;   // Response Assembler - snapshot → comprehensive → basic
pub mod config;

#[cfg(feature = "server")]
pub mod server;      // Serving Boundary - axum routes

// Re-export commonly used types
pub use model::{
    Category, CountyContact, CountySummary, District, FeedbackEntry, RegionRecord,
    score_for, stars_for, round2,
};
pub use registry::{
    DataTier, HealthStatus, LoadError, RegionRegistry, RegistrySnapshot, RegistrySource,
    RegistryState, ReloadOutcome,
};
pub use resolver::{resolve, MatchRule, Resolution};
pub use variation::{
    FixedRandom, RandomSource, SequenceRandom, ThreadRandom, VariationInjector,
};
pub use calculator::{
    AggregateBasis, DataUnavailable, OverallAggregate, RatingDistribution, RegionStatistics,
    region_statistics, statistics_for,
};
pub use snapshots::{SnapshotKey, SnapshotStore};
pub use query::{EntryQuery, Page, Pagination, RatingFilter};
pub use error::{ApiError, ErrorBody, ErrorCategory};
pub use assembler::{Assembled, DataSource, ResponseAssembler};
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
