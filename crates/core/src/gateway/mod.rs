use crate::domain::{Allocation, AnalyticsResult, Answers, Axes, RiskProfile, Variant, WeightsResult};
use serde::{Deserialize, Serialize};

pub mod http;

pub const OP_GENERATE_PROFILE: &str = "generate profile";
pub const OP_CALCULATE_WEIGHTS: &str = "calculate weights";
pub const OP_RUN_ANALYTICS: &str = "run analytics";
pub const OP_HEALTH_CHECK: &str = "health check";

/// Liveness record returned by the service's health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

/// Stateless request layer in front of the remote scoring/analytics service.
///
/// Every call is a single request/response exchange and fails with
/// [`ServiceError`](crate::error::ServiceError) wrapped in `anyhow::Error`.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    async fn generate_profile(&self, answers: &Answers) -> anyhow::Result<RiskProfile>;

    async fn calculate_weights(
        &self,
        label: &str,
        variant: Variant,
        axes: &Axes,
    ) -> anyhow::Result<WeightsResult>;

    async fn run_analytics(
        &self,
        user_weights: &Allocation,
        label: &str,
        axes: &Axes,
    ) -> anyhow::Result<AnalyticsResult>;

    async fn health_check(&self) -> anyhow::Result<Health>;
}
