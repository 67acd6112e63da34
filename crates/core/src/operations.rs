//! The three gateway calls a stage can own, as [`Operation`]s for the request lifecycle.

use crate::domain::{Allocation, AnalyticsResult, Answers, Axes, RiskProfile, Variant, WeightsResult};
use crate::error::ValidationError;
use crate::gateway::{Gateway, OP_CALCULATE_WEIGHTS, OP_GENERATE_PROFILE, OP_RUN_ANALYTICS};
use crate::lifecycle::Operation;

pub const PROFILE_FALLBACK: &str =
    "Failed to generate risk profile. Please ensure the scoring service is running and try again.";
pub const WEIGHTS_FALLBACK: &str = "Failed to calculate portfolio weights.";
pub const ANALYTICS_FALLBACK: &str = "Failed to run portfolio analytics.";

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateProfile;

#[async_trait::async_trait]
impl Operation for GenerateProfile {
    type Input = Answers;
    type Output = RiskProfile;

    fn name(&self) -> &'static str {
        OP_GENERATE_PROFILE
    }

    fn fallback_message(&self) -> &'static str {
        PROFILE_FALLBACK
    }

    fn validate(&self, input: &Answers) -> Result<(), ValidationError> {
        input.validate()
    }

    async fn call(&self, gateway: &dyn Gateway, input: &Answers) -> anyhow::Result<RiskProfile> {
        gateway.generate_profile(input).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightsInput {
    pub label: String,
    pub variant: Variant,
    pub axes: Axes,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CalculateWeights;

#[async_trait::async_trait]
impl Operation for CalculateWeights {
    type Input = WeightsInput;
    type Output = WeightsResult;

    fn name(&self) -> &'static str {
        OP_CALCULATE_WEIGHTS
    }

    fn fallback_message(&self) -> &'static str {
        WEIGHTS_FALLBACK
    }

    async fn call(
        &self,
        gateway: &dyn Gateway,
        input: &WeightsInput,
    ) -> anyhow::Result<WeightsResult> {
        gateway
            .calculate_weights(&input.label, input.variant, &input.axes)
            .await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsInput {
    pub user_weights: Allocation,
    pub label: String,
    pub axes: Axes,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunAnalytics;

#[async_trait::async_trait]
impl Operation for RunAnalytics {
    type Input = AnalyticsInput;
    type Output = AnalyticsResult;

    fn name(&self) -> &'static str {
        OP_RUN_ANALYTICS
    }

    fn fallback_message(&self) -> &'static str {
        ANALYTICS_FALLBACK
    }

    async fn call(
        &self,
        gateway: &dyn Gateway,
        input: &AnalyticsInput,
    ) -> anyhow::Result<AnalyticsResult> {
        gateway
            .run_analytics(&input.user_weights, &input.label, &input.axes)
            .await
    }
}
