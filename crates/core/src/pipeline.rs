//! Stage controller: which stage is active, what each completed stage produced, and the
//! transitions between them.
//!
//! Transitions are pure: [`PipelineState::apply`] maps a state and an event to a new state or
//! rejects the event, leaving the original untouched.

use crate::domain::{Allocation, RiskProfile, Variant};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Profiling,
    Configuring,
    Reviewing,
}

impl StageId {
    pub fn number(self) -> u8 {
        match self {
            StageId::Profiling => 1,
            StageId::Configuring => 2,
            StageId::Reviewing => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            StageId::Profiling => "Risk Assessment",
            StageId::Configuring => "Portfolio Configuration",
            StageId::Reviewing => "Analytics & Results",
        }
    }
}

/// The active stage together with the upstream data it requires.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Stage {
    #[default]
    Profiling,
    Configuring {
        profile: RiskProfile,
    },
    Reviewing {
        profile: RiskProfile,
        weights: Allocation,
    },
}

#[derive(Debug, Clone)]
pub enum StageEvent {
    ProfileGenerated(RiskProfile),
    WeightsConfirmed { weights: Allocation, variant: Variant },
    StartOver,
    ReportError(String),
    DismissError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("a profile can only be accepted during risk assessment (current stage: {0:?})")]
    NotProfiling(StageId),
    #[error("weights cannot be confirmed without a completed risk profile")]
    ProfileMissing,
    #[error("weights were already confirmed; start over to reconfigure")]
    AlreadyReviewing,
    #[error("weights cannot be confirmed without any allocation")]
    WeightsMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepStatus {
    pub number: u8,
    pub title: &'static str,
    pub active: bool,
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineState {
    stage: Stage,
    selected_variant: Variant,
    global_error: Option<String>,
}

impl PipelineState {
    pub fn current_stage(&self) -> StageId {
        match self.stage {
            Stage::Profiling => StageId::Profiling,
            Stage::Configuring { .. } => StageId::Configuring,
            Stage::Reviewing { .. } => StageId::Reviewing,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn profile(&self) -> Option<&RiskProfile> {
        match &self.stage {
            Stage::Profiling => None,
            Stage::Configuring { profile } | Stage::Reviewing { profile, .. } => Some(profile),
        }
    }

    pub fn weights(&self) -> Option<&Allocation> {
        match &self.stage {
            Stage::Reviewing { weights, .. } => Some(weights),
            _ => None,
        }
    }

    pub fn selected_variant(&self) -> Variant {
        self.selected_variant
    }

    pub fn global_error(&self) -> Option<&str> {
        self.global_error.as_deref()
    }

    pub fn steps(&self) -> [StepStatus; 3] {
        let current = self.current_stage().number();
        [StageId::Profiling, StageId::Configuring, StageId::Reviewing].map(|id| StepStatus {
            number: id.number(),
            title: id.title(),
            active: id.number() == current,
            completed: id.number() < current,
        })
    }

    pub fn apply(&self, event: StageEvent) -> Result<PipelineState, TransitionError> {
        match event {
            StageEvent::ProfileGenerated(profile) => match self.stage {
                Stage::Profiling => Ok(PipelineState {
                    stage: Stage::Configuring { profile },
                    selected_variant: self.selected_variant,
                    global_error: None,
                }),
                _ => Err(TransitionError::NotProfiling(self.current_stage())),
            },
            StageEvent::WeightsConfirmed { weights, variant } => match &self.stage {
                Stage::Profiling => Err(TransitionError::ProfileMissing),
                Stage::Reviewing { .. } => Err(TransitionError::AlreadyReviewing),
                Stage::Configuring { .. } if weights.is_empty() => {
                    Err(TransitionError::WeightsMissing)
                }
                Stage::Configuring { profile } => Ok(PipelineState {
                    stage: Stage::Reviewing {
                        profile: profile.clone(),
                        weights,
                    },
                    selected_variant: variant,
                    global_error: None,
                }),
            },
            StageEvent::StartOver => Ok(PipelineState::default()),
            StageEvent::ReportError(message) => Ok(PipelineState {
                global_error: Some(message),
                ..self.clone()
            }),
            StageEvent::DismissError => Ok(PipelineState {
                global_error: None,
                ..self.clone()
            }),
        }
    }
}

/// Owner of the session's [`PipelineState`].
#[derive(Debug, Default)]
pub struct StageController {
    state: PipelineState,
}

impl StageController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn dispatch(&mut self, event: StageEvent) -> Result<&PipelineState, TransitionError> {
        let from = self.state.current_stage();
        match self.state.apply(event) {
            Ok(next) => {
                if next.current_stage() != from {
                    tracing::info!(?from, to = ?next.current_stage(), "stage transition");
                }
                self.state = next;
                Ok(&self.state)
            }
            Err(err) => {
                tracing::warn!(stage = ?from, error = %err, "transition rejected");
                Err(err)
            }
        }
    }
}
