//! One user's pass through the three stages.
//!
//! Each user action returns an optional [`PendingCall`]. The caller executes it against a
//! [`Gateway`] (possibly without holding the session) and feeds the [`CallOutcome`] back through
//! [`Session::apply`], which may chain a follow-up call (entering configuration immediately
//! computes baseline weights). Outcomes from before a "start over" carry an older epoch and are
//! dropped.

use crate::domain::{AnalyticsResult, Answers, RiskProfile, Variant, WeightsResult};
use crate::gateway::Gateway;
use crate::lifecycle::{Operation, RequestLifecycle, Ticket};
use crate::operations::{AnalyticsInput, CalculateWeights, GenerateProfile, RunAnalytics, WeightsInput};
use crate::pipeline::{PipelineState, StageController, StageEvent, StageId, TransitionError};
use crate::shaping::{self, Dashboard, Palette};
use crate::variant::VariantRecompute;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("{action} is not available during {}", .stage.title())]
    WrongStage { action: &'static str, stage: StageId },
    #[error("portfolio weights are not ready yet")]
    WeightsNotReady,
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

#[derive(Debug, Clone)]
pub enum PendingCall {
    Profile { epoch: u64, ticket: Ticket<Answers> },
    Weights { epoch: u64, ticket: Ticket<WeightsInput> },
    Analytics { epoch: u64, ticket: Ticket<AnalyticsInput> },
}

#[derive(Debug)]
pub enum CallOutcome {
    Profile { epoch: u64, id: u64, result: anyhow::Result<RiskProfile> },
    Weights { epoch: u64, id: u64, result: anyhow::Result<WeightsResult> },
    Analytics { epoch: u64, id: u64, result: anyhow::Result<AnalyticsResult> },
}

impl PendingCall {
    pub async fn execute(self, gateway: &dyn Gateway) -> CallOutcome {
        match self {
            PendingCall::Profile { epoch, ticket } => CallOutcome::Profile {
                epoch,
                id: ticket.id,
                result: GenerateProfile.call(gateway, &ticket.input).await,
            },
            PendingCall::Weights { epoch, ticket } => CallOutcome::Weights {
                epoch,
                id: ticket.id,
                result: CalculateWeights.call(gateway, &ticket.input).await,
            },
            PendingCall::Analytics { epoch, ticket } => CallOutcome::Analytics {
                epoch,
                id: ticket.id,
                result: RunAnalytics.call(gateway, &ticket.input).await,
            },
        }
    }
}

impl CallOutcome {
    fn epoch(&self) -> u64 {
        match self {
            CallOutcome::Profile { epoch, .. }
            | CallOutcome::Weights { epoch, .. }
            | CallOutcome::Analytics { epoch, .. } => *epoch,
        }
    }
}

#[derive(Debug)]
pub struct AnalyticsStage {
    variant: Variant,
    request: RequestLifecycle<RunAnalytics>,
}

impl AnalyticsStage {
    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn request(&self) -> &RequestLifecycle<RunAnalytics> {
        &self.request
    }
}

#[derive(Debug)]
pub struct Session {
    epoch: u64,
    controller: StageController,
    profiling: RequestLifecycle<GenerateProfile>,
    configuring: Option<VariantRecompute>,
    reviewing: Option<AnalyticsStage>,
    palette: Palette,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Palette::default())
    }
}

impl Session {
    pub fn new(palette: Palette) -> Self {
        Self {
            epoch: 0,
            controller: StageController::new(),
            profiling: RequestLifecycle::new(GenerateProfile),
            configuring: None,
            reviewing: None,
            palette,
        }
    }

    pub fn state(&self) -> &PipelineState {
        self.controller.state()
    }

    pub fn profiling(&self) -> &RequestLifecycle<GenerateProfile> {
        &self.profiling
    }

    pub fn configuring(&self) -> Option<&VariantRecompute> {
        self.configuring.as_ref()
    }

    pub fn reviewing(&self) -> Option<&AnalyticsStage> {
        self.reviewing.as_ref()
    }

    /// Chart- and table-ready analytics, once the analytics call has succeeded.
    pub fn dashboard(&self) -> Option<Dashboard> {
        let stage = self.reviewing.as_ref()?;
        let result = stage.request.result()?;
        Some(shaping::shape(result, stage.variant, &self.palette))
    }

    fn require(&self, action: &'static str, stage: StageId) -> Result<(), SessionError> {
        let current = self.state().current_stage();
        if current != stage {
            return Err(SessionError::WrongStage {
                action,
                stage: current,
            });
        }
        Ok(())
    }

    pub fn begin_submit(&mut self, answers: Answers) -> Result<Option<PendingCall>, SessionError> {
        self.require("submitting answers", StageId::Profiling)?;
        let epoch = self.epoch;
        Ok(self
            .profiling
            .begin(answers)
            .map(|ticket| PendingCall::Profile { epoch, ticket }))
    }

    pub fn begin_select_variant(
        &mut self,
        variant: Variant,
    ) -> Result<Option<PendingCall>, SessionError> {
        self.require("selecting a variant", StageId::Configuring)?;
        let epoch = self.epoch;
        let Some(engine) = self.configuring.as_mut() else {
            return Err(TransitionError::ProfileMissing.into());
        };
        Ok(engine
            .select_ticket(variant)
            .map(|ticket| PendingCall::Weights { epoch, ticket }))
    }

    pub fn begin_proceed(&mut self) -> Result<Option<PendingCall>, SessionError> {
        self.require("proceeding to analytics", StageId::Configuring)?;
        let (weights, variant) = self
            .configuring
            .as_ref()
            .and_then(VariantRecompute::confirm)
            .ok_or(SessionError::WeightsNotReady)?;

        let state = self.controller.dispatch(StageEvent::WeightsConfirmed {
            weights: weights.clone(),
            variant,
        })?;
        let profile = state.profile().ok_or(TransitionError::ProfileMissing)?;
        let input = AnalyticsInput {
            user_weights: weights,
            label: profile.label.clone(),
            axes: profile.axes.clone(),
        };

        self.configuring = None;
        let mut request = RequestLifecycle::new(RunAnalytics);
        let epoch = self.epoch;
        let pending = request
            .begin(input)
            .map(|ticket| PendingCall::Analytics { epoch, ticket });
        self.reviewing = Some(AnalyticsStage { variant, request });
        Ok(pending)
    }

    /// Re-issues the active stage's last request if it failed.
    pub fn begin_retry(&mut self) -> Option<PendingCall> {
        let epoch = self.epoch;
        match self.state().current_stage() {
            StageId::Profiling => self
                .profiling
                .retry_ticket()
                .map(|ticket| PendingCall::Profile { epoch, ticket }),
            StageId::Configuring => self
                .configuring
                .as_mut()?
                .lifecycle_mut()
                .retry_ticket()
                .map(|ticket| PendingCall::Weights { epoch, ticket }),
            StageId::Reviewing => self
                .reviewing
                .as_mut()?
                .request
                .retry_ticket()
                .map(|ticket| PendingCall::Analytics { epoch, ticket }),
        }
    }

    pub fn start_over(&mut self) {
        self.epoch += 1;
        self.dispatch_banner_or_reset(StageEvent::StartOver);
        self.profiling.reset();
        self.configuring = None;
        self.reviewing = None;
        tracing::info!(epoch = self.epoch, "session reset");
    }

    pub fn report_error(&mut self, message: impl Into<String>) {
        self.dispatch_banner_or_reset(StageEvent::ReportError(message.into()));
    }

    pub fn dismiss_error(&mut self) {
        self.dispatch_banner_or_reset(StageEvent::DismissError);
    }

    /// Start-over and banner events are accepted from every stage; a rejection is logged and
    /// leaves the state unchanged.
    fn dispatch_banner_or_reset(&mut self, event: StageEvent) {
        if let Err(err) = self.controller.dispatch(event) {
            tracing::warn!(error = %err, "session event not accepted");
        }
    }

    /// Applies a finished call. Returns a follow-up call when the outcome moved the session
    /// into a stage that computes on entry.
    pub fn apply(&mut self, outcome: CallOutcome) -> Option<PendingCall> {
        if outcome.epoch() != self.epoch {
            tracing::debug!(
                outcome_epoch = outcome.epoch(),
                epoch = self.epoch,
                "discarding response from before start over"
            );
            return None;
        }

        match outcome {
            CallOutcome::Profile { id, result, .. } => {
                if !self.profiling.complete(id, result) {
                    return None;
                }
                let profile = self.profiling.result()?.clone();
                if let Err(err) = self
                    .controller
                    .dispatch(StageEvent::ProfileGenerated(profile.clone()))
                {
                    tracing::warn!(error = %err, "generated profile not accepted");
                    return None;
                }
                let mut engine = VariantRecompute::new(&profile);
                let epoch = self.epoch;
                let pending = engine
                    .mount_ticket()
                    .map(|ticket| PendingCall::Weights { epoch, ticket });
                self.configuring = Some(engine);
                pending
            }
            CallOutcome::Weights { id, result, .. } => {
                if let Some(engine) = self.configuring.as_mut() {
                    engine.lifecycle_mut().complete(id, result);
                }
                None
            }
            CallOutcome::Analytics { id, result, .. } => {
                if let Some(stage) = self.reviewing.as_mut() {
                    stage.request.complete(id, result);
                }
                None
            }
        }
    }

    /// Runs `pending` and every follow-up call it chains to completion.
    pub async fn drive(&mut self, gateway: &dyn Gateway, mut pending: Option<PendingCall>) {
        while let Some(call) = pending {
            let outcome = call.execute(gateway).await;
            pending = self.apply(outcome);
        }
    }

    pub async fn submit_answers(
        &mut self,
        gateway: &dyn Gateway,
        answers: Answers,
    ) -> Result<(), SessionError> {
        let pending = self.begin_submit(answers)?;
        self.drive(gateway, pending).await;
        Ok(())
    }

    pub async fn select_variant(
        &mut self,
        gateway: &dyn Gateway,
        variant: Variant,
    ) -> Result<(), SessionError> {
        let pending = self.begin_select_variant(variant)?;
        self.drive(gateway, pending).await;
        Ok(())
    }

    pub async fn proceed(&mut self, gateway: &dyn Gateway) -> Result<(), SessionError> {
        let pending = self.begin_proceed()?;
        self.drive(gateway, pending).await;
        Ok(())
    }

    pub async fn retry(&mut self, gateway: &dyn Gateway) {
        let pending = self.begin_retry();
        self.drive(gateway, pending).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::YOUR_MIX;
    use crate::error::ServiceError;
    use crate::gateway::MockGateway;
    use crate::lifecycle::RequestStatus;
    use crate::test_support::{analytics, sample_profile, weights_for};

    fn answers() -> Answers {
        Answers::from(["I would hold", "steady growth", "no major expenses"])
    }

    #[tokio::test]
    async fn end_to_end_with_variant_switch() {
        let mut gw = MockGateway::new();
        gw.expect_generate_profile()
            .times(1)
            .returning(|_| Ok(sample_profile()));
        gw.expect_calculate_weights()
            .withf(|_, v, _| *v == Variant::Baseline)
            .times(1)
            .returning(|_, v, _| Ok(weights_for(v)));
        gw.expect_calculate_weights()
            .withf(|_, v, _| *v == Variant::Aggressive)
            .times(1)
            .returning(|_, v, _| Ok(weights_for(v)));
        gw.expect_run_analytics()
            .withf(|weights, label, axes| {
                *weights == weights_for(Variant::Aggressive).weights
                    && label == "Balanced Builder"
                    && *axes == sample_profile().axes
            })
            .times(1)
            .returning(|weights, _, _| {
                let mut result = analytics();
                result.portfolios[0].weights = weights.clone();
                Ok(result)
            });

        let mut session = Session::default();
        session.submit_answers(&gw, answers()).await.unwrap();
        assert_eq!(session.state().current_stage(), StageId::Configuring);
        let engine = session.configuring().unwrap();
        assert_eq!(engine.current().unwrap().variant, Variant::Baseline);

        session.select_variant(&gw, Variant::Aggressive).await.unwrap();
        let engine = session.configuring().unwrap();
        assert_eq!(engine.current().unwrap().variant, Variant::Aggressive);

        session.proceed(&gw).await.unwrap();
        assert_eq!(session.state().current_stage(), StageId::Reviewing);
        assert_eq!(session.state().selected_variant(), Variant::Aggressive);

        let dashboard = session.dashboard().unwrap();
        let mix = dashboard.table.iter().find(|r| r.name == YOUR_MIX).unwrap();
        assert!(mix.highlighted);
        assert_eq!(mix.variant_note.as_deref(), Some("aggressive variant"));
        let mix_card = dashboard.cards.iter().find(|c| c.name == YOUR_MIX).unwrap();
        assert!(mix_card
            .allocation
            .iter()
            .any(|line| line.asset == "equity" && line.weight == "70.00%"));
    }

    #[tokio::test]
    async fn rejected_profile_keeps_user_on_first_stage() {
        let mut gw = MockGateway::new();
        gw.expect_generate_profile().times(1).returning(|_| {
            Err(ServiceError::Status {
                operation: "generate profile",
                status: 429,
                detail: Some("rate limited".to_string()),
                body: String::new(),
            }
            .into())
        });

        let mut session = Session::default();
        session.submit_answers(&gw, answers()).await.unwrap();
        assert_eq!(session.state().current_stage(), StageId::Profiling);
        assert_eq!(session.profiling().error(), Some("rate limited"));
    }

    #[tokio::test]
    async fn incomplete_answers_never_reach_gateway() {
        let mut gw = MockGateway::new();
        gw.expect_generate_profile().times(0);

        let mut session = Session::default();
        let pending = session
            .begin_submit(Answers::from(["I would hold", "", "no major expenses"]))
            .unwrap();
        assert!(pending.is_none());
        session.drive(&gw, pending).await;
        assert_eq!(
            session.profiling().state().status(),
            RequestStatus::Failed
        );
    }

    #[tokio::test]
    async fn retry_after_failed_analytics_succeeds() {
        let mut gw = MockGateway::new();
        let mut seq = mockall::Sequence::new();
        gw.expect_generate_profile()
            .returning(|_| Ok(sample_profile()));
        gw.expect_calculate_weights()
            .returning(|_, v, _| Ok(weights_for(v)));
        gw.expect_run_analytics()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(anyhow::anyhow!("operation timed out")));
        gw.expect_run_analytics()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(analytics()));

        let mut session = Session::default();
        session.submit_answers(&gw, answers()).await.unwrap();
        session.proceed(&gw).await.unwrap();
        let stage = session.reviewing().unwrap();
        assert_eq!(
            stage.request().error(),
            Some(crate::operations::ANALYTICS_FALLBACK)
        );
        assert!(session.dashboard().is_none());

        session.retry(&gw).await;
        assert!(session.dashboard().is_some());
    }

    #[test]
    fn actions_outside_their_stage_are_rejected() {
        let mut session = Session::default();
        assert_eq!(
            session.begin_proceed().unwrap_err(),
            SessionError::WrongStage {
                action: "proceeding to analytics",
                stage: StageId::Profiling,
            }
        );
        assert!(session.begin_select_variant(Variant::Defensive).is_err());
        assert_eq!(session.state(), &PipelineState::default());
    }

    #[test]
    fn proceed_requires_successful_weights() {
        let mut session = Session::default();
        let pending = session.begin_submit(answers()).unwrap().unwrap();
        let PendingCall::Profile { epoch, ticket } = pending else {
            panic!("expected a profile call");
        };
        let follow_up = session.apply(CallOutcome::Profile {
            epoch,
            id: ticket.id,
            result: Ok(sample_profile()),
        });
        assert!(matches!(follow_up, Some(PendingCall::Weights { .. })));

        // Baseline weights still loading.
        assert_eq!(
            session.begin_proceed().unwrap_err(),
            SessionError::WeightsNotReady
        );
    }

    #[test]
    fn empty_allocation_keeps_proceed_disabled() {
        let mut session = Session::default();
        let Some(PendingCall::Profile { epoch, ticket }) = session.begin_submit(answers()).unwrap()
        else {
            panic!("expected a profile call");
        };
        let Some(PendingCall::Weights { ticket, .. }) = session.apply(CallOutcome::Profile {
            epoch,
            id: ticket.id,
            result: Ok(sample_profile()),
        }) else {
            panic!("expected a weights call");
        };
        session.apply(CallOutcome::Weights {
            epoch,
            id: ticket.id,
            result: Ok(WeightsResult {
                weights: crate::domain::Allocation::new(),
                explanations: Vec::new(),
                variant: Variant::Baseline,
            }),
        });

        assert!(!session.configuring().unwrap().can_proceed());
        assert_eq!(
            session.begin_proceed().unwrap_err(),
            SessionError::WeightsNotReady
        );
        assert_eq!(session.state().current_stage(), StageId::Configuring);
    }

    #[test]
    fn responses_from_before_start_over_are_dropped() {
        let mut session = Session::default();
        let pending = session.begin_submit(answers()).unwrap().unwrap();
        let PendingCall::Profile { epoch, ticket } = pending else {
            panic!("expected a profile call");
        };

        session.start_over();
        session.start_over();
        let follow_up = session.apply(CallOutcome::Profile {
            epoch,
            id: ticket.id,
            result: Ok(sample_profile()),
        });

        assert!(follow_up.is_none());
        assert_eq!(session.state(), &PipelineState::default());
        assert_eq!(session.profiling().state().status(), RequestStatus::Idle);
    }

    #[tokio::test]
    async fn start_over_from_review_discards_everything() {
        let mut gw = MockGateway::new();
        gw.expect_generate_profile()
            .returning(|_| Ok(sample_profile()));
        gw.expect_calculate_weights()
            .returning(|_, v, _| Ok(weights_for(v)));
        gw.expect_run_analytics()
            .returning(|_, _, _| Ok(analytics()));

        let mut session = Session::default();
        session.submit_answers(&gw, answers()).await.unwrap();
        session.select_variant(&gw, Variant::Defensive).await.unwrap();
        session.proceed(&gw).await.unwrap();
        session.report_error("upstream degraded");

        session.start_over();
        assert_eq!(session.state(), &PipelineState::default());
        assert!(session.configuring().is_none());
        assert!(session.reviewing().is_none());
        assert!(session.dashboard().is_none());
    }

    #[test]
    fn banner_can_be_dismissed() {
        let mut session = Session::default();
        session.report_error("upstream degraded");
        assert_eq!(session.state().global_error(), Some("upstream degraded"));
        session.dismiss_error();
        assert_eq!(session.state().global_error(), None);
    }
}
