use crate::domain::named::Allocation;
use crate::domain::profile::Variant;
use serde::{Deserialize, Serialize};

/// Allowed drift of an allocation's total away from 1.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightsResult {
    pub weights: Allocation,
    #[serde(default)]
    pub explanations: Vec<String>,
    /// Not part of the service response; stamped from the request by the gateway.
    #[serde(default)]
    pub variant: Variant,
}

impl WeightsResult {
    /// True when the allocation violates the non-negative, sums-to-one invariant.
    pub fn has_sum_anomaly(&self) -> bool {
        !self.weights.is_normalized(WEIGHT_SUM_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_service_response_without_variant() {
        let v = json!({
            "weights": {"equity": 0.7, "bonds": 0.25, "cash": 0.05},
            "explanations": ["Applied aggressive variant with increased equity allocation"]
        });
        let parsed: WeightsResult = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.variant, Variant::Baseline);
        assert_eq!(parsed.explanations.len(), 1);
        assert!(!parsed.has_sum_anomaly());
    }

    #[test]
    fn flags_allocations_that_do_not_sum_to_one() {
        let parsed: WeightsResult = serde_json::from_value(json!({
            "weights": {"equity": 0.8, "bonds": 0.3}
        }))
        .unwrap();
        assert!(parsed.explanations.is_empty());
        assert!(parsed.has_sum_anomaly());
    }
}
