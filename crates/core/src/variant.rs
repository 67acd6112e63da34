//! Weight recomputation for the configuration stage.
//!
//! Every variant selection, including re-selecting the current one, issues a fresh
//! `calculate weights` call and supersedes whatever was shown before.

use crate::domain::{Allocation, Axes, RiskProfile, Variant, WeightsResult};
use crate::gateway::Gateway;
use crate::lifecycle::{RequestLifecycle, RequestState, Ticket};
use crate::operations::{CalculateWeights, WeightsInput};

#[derive(Debug)]
pub struct VariantRecompute {
    label: String,
    axes: Axes,
    selected: Variant,
    weights: RequestLifecycle<CalculateWeights>,
}

impl VariantRecompute {
    pub fn new(profile: &RiskProfile) -> Self {
        Self {
            label: profile.label.clone(),
            axes: profile.axes.clone(),
            selected: Variant::Baseline,
            weights: RequestLifecycle::new(CalculateWeights),
        }
    }

    pub fn selected(&self) -> Variant {
        self.selected
    }

    pub fn lifecycle(&self) -> &RequestLifecycle<CalculateWeights> {
        &self.weights
    }

    pub fn lifecycle_mut(&mut self) -> &mut RequestLifecycle<CalculateWeights> {
        &mut self.weights
    }

    pub fn state(&self) -> &RequestState<WeightsResult> {
        self.weights.state()
    }

    /// Weights to display. Absent while a newer computation is loading or after it failed.
    pub fn current(&self) -> Option<&WeightsResult> {
        self.weights.result()
    }

    /// Ticket for the initial baseline computation on entering the stage.
    pub fn mount_ticket(&mut self) -> Option<Ticket<WeightsInput>> {
        self.select_ticket(Variant::Baseline)
    }

    pub fn select_ticket(&mut self, variant: Variant) -> Option<Ticket<WeightsInput>> {
        self.selected = variant;
        tracing::info!(%variant, label = %self.label, "recomputing weights");
        self.weights.begin(WeightsInput {
            label: self.label.clone(),
            variant,
            axes: self.axes.clone(),
        })
    }

    pub async fn mount(&mut self, gateway: &dyn Gateway) -> &RequestState<WeightsResult> {
        self.select(gateway, Variant::Baseline).await
    }

    pub async fn select(
        &mut self,
        gateway: &dyn Gateway,
        variant: Variant,
    ) -> &RequestState<WeightsResult> {
        self.selected = variant;
        self.weights
            .trigger(
                gateway,
                WeightsInput {
                    label: self.label.clone(),
                    variant,
                    axes: self.axes.clone(),
                },
            )
            .await
    }

    /// A successful computation that produced at least one asset.
    pub fn can_proceed(&self) -> bool {
        self.current().is_some_and(|result| !result.weights.is_empty())
    }

    /// The allocation and variant to carry into analytics, once a computation has succeeded
    /// with a non-empty allocation.
    pub fn confirm(&self) -> Option<(Allocation, Variant)> {
        self.current()
            .filter(|result| !result.weights.is_empty())
            .map(|result| (result.weights.clone(), result.variant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use crate::lifecycle::RequestStatus;
    use crate::operations::WEIGHTS_FALLBACK;
    use crate::test_support::{sample_profile, weights_for};

    #[tokio::test]
    async fn mount_computes_baseline() {
        let mut gw = MockGateway::new();
        gw.expect_calculate_weights()
            .withf(|label, variant, _| label == "Balanced Builder" && *variant == Variant::Baseline)
            .times(1)
            .returning(|_, v, _| Ok(weights_for(v)));

        let mut engine = VariantRecompute::new(&sample_profile());
        assert!(!engine.can_proceed());

        engine.mount(&gw).await;
        assert!(engine.can_proceed());
        assert_eq!(engine.current().unwrap().variant, Variant::Baseline);
    }

    #[tokio::test]
    async fn switching_variant_replaces_weights() {
        let mut gw = MockGateway::new();
        gw.expect_calculate_weights()
            .times(2)
            .returning(|_, v, _| Ok(weights_for(v)));

        let mut engine = VariantRecompute::new(&sample_profile());
        engine.mount(&gw).await;
        engine.select(&gw, Variant::Aggressive).await;

        let (weights, variant) = engine.confirm().unwrap();
        assert_eq!(variant, Variant::Aggressive);
        assert_eq!(weights.get("equity"), Some(&0.7));
    }

    #[tokio::test]
    async fn reselecting_same_variant_is_not_memoized() {
        let mut gw = MockGateway::new();
        gw.expect_calculate_weights()
            .withf(|_, variant, _| *variant == Variant::Baseline)
            .times(2)
            .returning(|_, v, _| Ok(weights_for(v)));

        let mut engine = VariantRecompute::new(&sample_profile());
        engine.mount(&gw).await;
        assert_eq!(engine.state().status(), RequestStatus::Success);
        engine.select(&gw, Variant::Baseline).await;
        assert_eq!(engine.state().status(), RequestStatus::Success);
    }

    #[test]
    fn new_selection_hides_previous_weights_while_loading() {
        let mut engine = VariantRecompute::new(&sample_profile());
        let ticket = engine.mount_ticket().unwrap();
        engine
            .lifecycle_mut()
            .complete(ticket.id, Ok(weights_for(Variant::Baseline)));
        assert!(engine.can_proceed());

        let ticket = engine.select_ticket(Variant::Defensive).unwrap();
        assert_eq!(ticket.input.variant, Variant::Defensive);
        assert_eq!(engine.selected(), Variant::Defensive);
        assert!(engine.current().is_none());
        assert!(!engine.can_proceed());
    }

    #[test]
    fn empty_allocation_cannot_be_confirmed() {
        let mut engine = VariantRecompute::new(&sample_profile());
        let ticket = engine.mount_ticket().unwrap();
        engine.lifecycle_mut().complete(
            ticket.id,
            Ok(WeightsResult {
                weights: Allocation::new(),
                explanations: Vec::new(),
                variant: Variant::Baseline,
            }),
        );

        assert_eq!(engine.state().status(), RequestStatus::Success);
        assert!(engine.current().is_some());
        assert!(!engine.can_proceed());
        assert!(engine.confirm().is_none());
    }

    #[tokio::test]
    async fn failed_recompute_does_not_fall_back_to_stale_weights() {
        let mut gw = MockGateway::new();
        let mut seq = mockall::Sequence::new();
        gw.expect_calculate_weights()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, v, _| Ok(weights_for(v)));
        gw.expect_calculate_weights()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(anyhow::anyhow!("timed out")));

        let mut engine = VariantRecompute::new(&sample_profile());
        engine.mount(&gw).await;
        engine.select(&gw, Variant::Aggressive).await;

        assert_eq!(engine.lifecycle().error(), Some(WEIGHTS_FALLBACK));
        assert!(engine.current().is_none());
        assert!(engine.confirm().is_none());
        assert_eq!(engine.selected(), Variant::Aggressive);
    }
}
