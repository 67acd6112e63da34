use crate::config::Settings;
use crate::domain::{Allocation, AnalyticsResult, Answers, Axes, RiskProfile, Variant, WeightsResult};
use crate::error::{detail_from_body, ServiceError};
use crate::gateway::{
    Gateway, Health, OP_CALCULATE_WEIGHTS, OP_GENERATE_PROFILE, OP_HEALTH_CHECK, OP_RUN_ANALYTICS,
};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const PROFILE_PATH: &str = "/profile";
const WEIGHTS_PATH: &str = "/weights";
const ANALYTICS_PATH: &str = "/analytics";
const HEALTH_PATH: &str = "/health";

/// JSON-over-HTTP gateway.
///
/// Scoring and backtesting are slow on the service side, so the client timeout is long
/// (`FINTELLECT_TIMEOUT_SECS`, two minutes by default).
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(&settings.api_base_url, settings.request_timeout)
    }

    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build gateway http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(
        &self,
        operation: &'static str,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> anyhow::Result<String> {
        let res = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|source| ServiceError::Transport { operation, source })?;
        read_body(operation, res).await
    }

    async fn get(&self, operation: &'static str, path: &str) -> anyhow::Result<String> {
        let res = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|source| ServiceError::Transport { operation, source })?;
        read_body(operation, res).await
    }
}

async fn read_body(operation: &'static str, res: reqwest::Response) -> anyhow::Result<String> {
    let status = res.status();
    let text = res
        .text()
        .await
        .map_err(|source| ServiceError::Transport { operation, source })?;

    if !status.is_success() {
        tracing::warn!(operation, %status, "service returned an error status");
        return Err(ServiceError::Status {
            operation,
            status: status.as_u16(),
            detail: detail_from_body(&text),
            body: text,
        }
        .into());
    }

    Ok(text)
}

fn decode<Res: DeserializeOwned>(operation: &'static str, text: &str) -> Result<Res, ServiceError> {
    serde_json::from_str::<Res>(text).map_err(|err| ServiceError::Malformed {
        operation,
        reason: format!("{err}: {text}"),
    })
}

fn decode_profile(text: &str) -> Result<RiskProfile, ServiceError> {
    let profile: RiskProfile = decode(OP_GENERATE_PROFILE, text)?;
    let bad = profile.axes.out_of_range();
    if !bad.is_empty() {
        return Err(ServiceError::Malformed {
            operation: OP_GENERATE_PROFILE,
            reason: format!("axes outside [0, 1]: {}", bad.join(", ")),
        });
    }
    Ok(profile)
}

#[derive(Debug, Serialize)]
struct ProfileRequest<'a> {
    answers: &'a Answers,
}

#[derive(Debug, Serialize)]
struct WeightsRequest<'a> {
    label: &'a str,
    variant: Variant,
    axes: &'a Axes,
}

#[derive(Debug, Serialize)]
struct AnalyticsRequest<'a> {
    user_weights: &'a Allocation,
    label: &'a str,
    axes: &'a Axes,
}

#[async_trait::async_trait]
impl Gateway for HttpGateway {
    async fn generate_profile(&self, answers: &Answers) -> anyhow::Result<RiskProfile> {
        if let Err(err) = answers.validate() {
            return Err(ServiceError::InvalidRequest {
                operation: OP_GENERATE_PROFILE,
                reason: err.message,
            }
            .into());
        }

        let text = self
            .post(OP_GENERATE_PROFILE, PROFILE_PATH, &ProfileRequest { answers })
            .await?;
        let profile = decode_profile(&text)?;
        tracing::info!(label = %profile.label, score = profile.score, "profile generated");
        Ok(profile)
    }

    async fn calculate_weights(
        &self,
        label: &str,
        variant: Variant,
        axes: &Axes,
    ) -> anyhow::Result<WeightsResult> {
        let req = WeightsRequest {
            label,
            variant,
            axes,
        };
        let text = self.post(OP_CALCULATE_WEIGHTS, WEIGHTS_PATH, &req).await?;
        let mut result: WeightsResult = decode(OP_CALCULATE_WEIGHTS, &text)?;
        result.variant = variant;
        Ok(result)
    }

    async fn run_analytics(
        &self,
        user_weights: &Allocation,
        label: &str,
        axes: &Axes,
    ) -> anyhow::Result<AnalyticsResult> {
        let req = AnalyticsRequest {
            user_weights,
            label,
            axes,
        };
        let text = self.post(OP_RUN_ANALYTICS, ANALYTICS_PATH, &req).await?;
        let result: AnalyticsResult = decode(OP_RUN_ANALYTICS, &text)?;
        tracing::info!(portfolios = result.portfolios.len(), "analytics received");
        Ok(result)
    }

    async fn health_check(&self) -> anyhow::Result<Health> {
        let text = self.get(OP_HEALTH_CHECK, HEALTH_PATH).await?;
        Ok(decode(OP_HEALTH_CHECK, &text)?)
    }
}
