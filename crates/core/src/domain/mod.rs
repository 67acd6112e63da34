pub mod analytics;
pub mod named;
pub mod profile;
pub mod weights;

pub use analytics::{AnalyticsResult, ChartSeries, Metrics, PortfolioAnalysis, YOUR_MIX};
pub use named::{Allocation, Named};
pub use profile::{Answers, Axes, ProfileDetails, RiskProfile, Variant};
pub use weights::WeightsResult;
