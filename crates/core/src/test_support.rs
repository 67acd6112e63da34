use crate::domain::{Allocation, Axes, ProfileDetails, RiskProfile, Variant, WeightsResult};

pub use crate::domain::analytics::fixtures::analytics;

pub fn sample_profile() -> RiskProfile {
    RiskProfile {
        label: "Balanced Builder".to_string(),
        score: 57.3,
        axes: Axes::new(0.33, 0.5, 0.0, 0.0),
        profile: ProfileDetails {
            goal: "wealth".to_string(),
            timeline_years: 10.0,
            loss_aversion: "very_low".to_string(),
            liquidity_need: "low".to_string(),
            income_stability: "stable".to_string(),
            knowledge_level: Some("intermediate".to_string()),
            notes: None,
        },
    }
}

pub fn weights_for(variant: Variant) -> WeightsResult {
    let (equity, bonds) = match variant {
        Variant::Defensive => (0.5, 0.45),
        Variant::Baseline => (0.6, 0.35),
        Variant::Aggressive => (0.7, 0.25),
    };
    WeightsResult {
        weights: Allocation::from([("equity", equity), ("bonds", bonds), ("cash", 0.05)]),
        explanations: vec![format!("Applied {variant} variant")],
        variant,
    }
}
