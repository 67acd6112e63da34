use crate::domain::named::Named;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const INCOMPLETE_ANSWERS_MESSAGE: &str = "Please answer all three questions.";

/// Free-text answers to the three profiling questions, in question order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answers {
    pub answer1: String,
    pub answer2: String,
    pub answer3: String,
}

impl Answers {
    pub fn new(
        answer1: impl Into<String>,
        answer2: impl Into<String>,
        answer3: impl Into<String>,
    ) -> Self {
        Self {
            answer1: answer1.into(),
            answer2: answer2.into(),
            answer3: answer3.into(),
        }
    }

    pub fn as_array(&self) -> [&str; 3] {
        [&self.answer1, &self.answer2, &self.answer3]
    }

    /// Number of answers with non-blank text.
    pub fn completed_count(&self) -> usize {
        self.as_array()
            .iter()
            .filter(|a| !a.trim().is_empty())
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_count() == 3
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(ValidationError::new(INCOMPLETE_ANSWERS_MESSAGE))
        }
    }
}

impl<S: Into<String>> From<[S; 3]> for Answers {
    fn from([a, b, c]: [S; 3]) -> Self {
        Self::new(a, b, c)
    }
}

/// Normalized risk factors, each in `[0, 1]`.
///
/// Factors the scoring service adds beyond the four named ones are kept in `extra` and sent back
/// unchanged on later calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axes {
    pub time_horizon: f64,
    pub loss_aversion: f64,
    pub liquidity: f64,
    pub income_stability: f64,
    #[serde(flatten)]
    pub extra: Named<f64>,
}

impl Axes {
    pub fn new(time_horizon: f64, loss_aversion: f64, liquidity: f64, income_stability: f64) -> Self {
        Self {
            time_horizon,
            loss_aversion,
            liquidity,
            income_stability,
            extra: Named::new(),
        }
    }

    pub fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("time_horizon", self.time_horizon),
            ("loss_aversion", self.loss_aversion),
            ("liquidity", self.liquidity),
            ("income_stability", self.income_stability),
        ]
    }

    /// Names of the four required factors that fall outside `[0, 1]` (NaN included).
    pub fn out_of_range(&self) -> Vec<&'static str> {
        self.named()
            .into_iter()
            .filter(|(_, v)| !(0.0..=1.0).contains(v))
            .map(|(n, _)| n)
            .collect()
    }
}

/// Descriptive sub-record. Display only; the vocabulary belongs to the scoring service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDetails {
    #[serde(default)]
    pub goal: String,
    pub timeline_years: f64,
    pub loss_aversion: String,
    pub liquidity_need: String,
    pub income_stability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub label: String,
    /// 0..=100. The service reports one decimal; views round it.
    pub score: f64,
    pub axes: Axes,
    pub profile: ProfileDetails,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Defensive,
    #[default]
    Baseline,
    Aggressive,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Defensive, Variant::Baseline, Variant::Aggressive];

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Defensive => "defensive",
            Variant::Baseline => "baseline",
            Variant::Aggressive => "aggressive",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Variant::Defensive => "Defensive",
            Variant::Baseline => "Baseline",
            Variant::Aggressive => "Aggressive",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Variant::Defensive => "Lower risk, more bonds and cash",
            Variant::Baseline => "Balanced approach based on your profile",
            Variant::Aggressive => "Higher risk, more equity exposure",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ValidationError::new(format!(
                    "unknown variant '{s}' (expected defensive, baseline or aggressive)"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_answers_do_not_count_as_complete() {
        let answers = Answers::new("I would hold", "   ", "no major expenses");
        assert_eq!(answers.completed_count(), 2);
        assert_eq!(
            answers.validate().unwrap_err().to_string(),
            INCOMPLETE_ANSWERS_MESSAGE
        );
        assert!(Answers::from(["a", "b", "c"]).validate().is_ok());
    }

    #[test]
    fn profile_decodes_and_keeps_extra_axes() {
        let v = json!({
            "label": "Balanced Builder",
            "score": 57.3,
            "axes": {
                "time_horizon": 0.33,
                "loss_aversion": 0.5,
                "liquidity": 0.0,
                "income_stability": 0.0,
                "knowledge_caution": 0.5
            },
            "profile": {
                "goal": "wealth",
                "timeline_years": 10.0,
                "loss_aversion": "moderate",
                "liquidity_need": "low",
                "income_stability": "stable",
                "knowledge_level": "intermediate",
                "notes": ""
            }
        });

        let profile: RiskProfile = serde_json::from_value(v).unwrap();
        assert_eq!(profile.label, "Balanced Builder");
        assert_eq!(profile.axes.extra.get("knowledge_caution"), Some(&0.5));
        assert!(profile.axes.out_of_range().is_empty());

        let back = serde_json::to_value(&profile.axes).unwrap();
        assert_eq!(back["knowledge_caution"], json!(0.5));
        assert_eq!(back["time_horizon"], json!(0.33));
    }

    #[test]
    fn missing_axis_is_rejected() {
        let v = json!({
            "time_horizon": 0.3,
            "loss_aversion": 0.5,
            "liquidity": 0.0
        });
        assert!(serde_json::from_value::<Axes>(v).is_err());
    }

    #[test]
    fn out_of_range_axes_are_reported() {
        let axes = Axes::new(1.2, 0.5, -0.1, f64::NAN);
        assert_eq!(
            axes.out_of_range(),
            ["time_horizon", "liquidity", "income_stability"]
        );
    }

    #[test]
    fn variant_parses_and_defaults_to_baseline() {
        assert_eq!("Aggressive".parse::<Variant>().unwrap(), Variant::Aggressive);
        assert!("reckless".parse::<Variant>().is_err());
        assert_eq!(Variant::default(), Variant::Baseline);
        assert_eq!(serde_json::to_value(Variant::Defensive).unwrap(), json!("defensive"));
    }
}
