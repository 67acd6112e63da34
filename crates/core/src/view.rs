//! Serializable snapshot of a [`Session`] for rendering: what the active stage shows and which
//! actions are currently available.

use crate::domain::{Answers, RiskProfile, Variant, WeightsResult};
use crate::format;
use crate::lifecycle::{RequestState, RequestStatus};
use crate::pipeline::{StageId, StepStatus};
use crate::session::Session;
use crate::shaping::{AllocationLine, Dashboard};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestView {
    pub status: RequestStatus,
    pub error: Option<String>,
    /// A failed request can be retried with its last input.
    pub can_retry: bool,
}

impl<T> From<&RequestState<T>> for RequestView {
    fn from(state: &RequestState<T>) -> Self {
        let error = match state {
            RequestState::Failed(message) => Some(message.clone()),
            _ => None,
        };
        Self {
            status: state.status(),
            can_retry: error.is_some(),
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub label: String,
    pub score: i64,
    pub details: Vec<DetailRow>,
    /// Service-specific extras follow the four standard factors.
    pub axes: Vec<AxisRow>,
}

impl From<&RiskProfile> for ProfileSummary {
    fn from(profile: &RiskProfile) -> Self {
        let d = &profile.profile;
        let mut details = vec![
            DetailRow {
                label: "Investment Timeline",
                value: format!("{} years", d.timeline_years),
            },
            DetailRow {
                label: "Loss Aversion",
                value: format::humanize(&d.loss_aversion),
            },
            DetailRow {
                label: "Liquidity Need",
                value: format::humanize(&d.liquidity_need),
            },
            DetailRow {
                label: "Income Stability",
                value: format::humanize(&d.income_stability),
            },
        ];
        if !d.goal.trim().is_empty() {
            details.insert(
                0,
                DetailRow {
                    label: "Goal",
                    value: format::humanize(&d.goal),
                },
            );
        }
        if let Some(level) = d.knowledge_level.as_deref() {
            details.push(DetailRow {
                label: "Knowledge Level",
                value: format::humanize(level),
            });
        }

        let standard = profile
            .axes
            .named()
            .into_iter()
            .map(|(name, value)| AxisRow::new(name, value));
        let extra = profile
            .axes
            .extra
            .iter()
            .map(|(name, value)| AxisRow::new(name, *value));

        Self {
            label: profile.label.clone(),
            score: profile.score.round() as i64,
            details,
            axes: standard.chain(extra).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisRow {
    pub name: String,
    /// Whole percent.
    pub value: String,
}

impl AxisRow {
    fn new(name: &str, fraction: f64) -> Self {
        Self {
            name: format::humanize(name),
            value: format::axis_pct(fraction),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantOption {
    pub variant: Variant,
    pub label: &'static str,
    pub description: &'static str,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightsView {
    pub variant: Variant,
    pub allocation: Vec<AllocationLine>,
    pub explanations: Vec<String>,
    /// The service returned weights that do not sum to one.
    pub sum_anomaly: bool,
}

impl From<&WeightsResult> for WeightsView {
    fn from(result: &WeightsResult) -> Self {
        Self {
            variant: result.variant,
            allocation: result
                .weights
                .iter()
                .map(|(asset, w)| AllocationLine {
                    asset: asset.to_string(),
                    weight: format::weight_pct(*w),
                })
                .collect(),
            explanations: result.explanations.iter().map(|e| format::strip_bold(e)).collect(),
            sum_anomaly: result.has_sum_anomaly(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageView {
    Profiling {
        request: RequestView,
        /// Answers from the most recent submission, for pre-filling the form.
        answers: Option<Answers>,
        answered: usize,
    },
    Configuring {
        profile: ProfileSummary,
        variants: Vec<VariantOption>,
        selected: Variant,
        request: RequestView,
        weights: Option<WeightsView>,
        can_proceed: bool,
    },
    Reviewing {
        variant: Variant,
        request: RequestView,
        dashboard: Option<Dashboard>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub stage: StageId,
    pub steps: [StepStatus; 3],
    pub global_error: Option<String>,
    pub view: StageView,
}

impl SessionView {
    pub fn of(session: &Session) -> Self {
        let state = session.state();
        let view = match state.current_stage() {
            StageId::Profiling => None,
            StageId::Configuring => configuring_view(session),
            StageId::Reviewing => reviewing_view(session),
        }
        .unwrap_or_else(|| profiling_view(session));

        Self {
            stage: state.current_stage(),
            steps: state.steps(),
            global_error: state.global_error().map(str::to_string),
            view,
        }
    }
}

fn profiling_view(session: &Session) -> StageView {
    let answers = session.profiling().last_input().cloned();
    StageView::Profiling {
        request: RequestView::from(session.profiling().state()),
        answered: answers.as_ref().map_or(0, Answers::completed_count),
        answers,
    }
}

fn configuring_view(session: &Session) -> Option<StageView> {
    let profile = session.state().profile()?;
    let engine = session.configuring()?;
    let selected = engine.selected();
    Some(StageView::Configuring {
        profile: ProfileSummary::from(profile),
        variants: Variant::ALL
            .into_iter()
            .map(|variant| VariantOption {
                variant,
                label: variant.label(),
                description: variant.description(),
                selected: variant == selected,
            })
            .collect(),
        selected,
        request: RequestView::from(engine.state()),
        weights: engine.current().map(WeightsView::from),
        can_proceed: engine.can_proceed(),
    })
}

fn reviewing_view(session: &Session) -> Option<StageView> {
    let stage = session.reviewing()?;
    Some(StageView::Reviewing {
        variant: stage.variant(),
        request: RequestView::from(stage.request().state()),
        dashboard: session.dashboard(),
    })
}
