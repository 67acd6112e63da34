use crate::domain::named::{Allocation, Named};
use serde::{Deserialize, Serialize};

/// Name the service gives the user's own portfolio; every other portfolio is a benchmark.
pub const YOUR_MIX: &str = "Your Mix";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(rename = "CAGR_pct")]
    pub cagr_pct: f64,
    #[serde(rename = "Vol_ann_pct")]
    pub vol_ann_pct: f64,
    #[serde(rename = "MaxDD_pct")]
    pub max_dd_pct: f64,
    #[serde(rename = "Worst_12m_pct")]
    pub worst_12m_pct: f64,
    /// Longest peak-to-recovery span in months.
    #[serde(rename = "Recovery_m", default)]
    pub recovery_m: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub name: String,
    pub weights: Allocation,
    pub metrics: Metrics,
    #[serde(default)]
    pub explanation: String,
}

impl PortfolioAnalysis {
    pub fn is_your_mix(&self) -> bool {
        self.name == YOUR_MIX
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub dates: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResult {
    pub portfolios: Vec<PortfolioAnalysis>,
    pub growth_chart: Named<ChartSeries>,
    pub drawdown_chart: Named<ChartSeries>,
    #[serde(default)]
    pub comparisons: Vec<String>,
}

impl AnalyticsResult {
    pub fn portfolio(&self, name: &str) -> Option<&PortfolioAnalysis> {
        self.portfolios.iter().find(|p| p.name == name)
    }

    /// Violations of the portfolio/chart key agreement and series length invariants.
    pub fn inconsistencies(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (kind, chart) in [("growth", &self.growth_chart), ("drawdown", &self.drawdown_chart)] {
            for p in &self.portfolios {
                if !chart.contains(&p.name) {
                    out.push(format!("{kind} chart has no series for portfolio '{}'", p.name));
                }
            }
            for (name, series) in chart.iter() {
                if self.portfolio(name).is_none() {
                    out.push(format!("{kind} chart series '{name}' has no portfolio"));
                }
                if series.dates.len() != series.values.len() {
                    out.push(format!(
                        "{kind} chart series '{name}' has {} dates but {} values",
                        series.dates.len(),
                        series.values.len()
                    ));
                }
            }
        }
        out
    }
}
