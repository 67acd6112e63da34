//! Turns an [`AnalyticsResult`] into table, chart and card data for the dashboard.
//!
//! Everything here is a pure function of its inputs; identical inputs serialize to identical
//! output.

use crate::domain::{AnalyticsResult, ChartSeries, Metrics, Named, PortfolioAnalysis, Variant};
use crate::format;
use serde::Serialize;

pub const NEUTRAL_COLOR: &str = "#6c757d";
/// Appended to a series color for its translucent fill.
const FILL_ALPHA_SUFFIX: &str = "20";

pub const GROWTH_AXIS_TITLE: &str = "Portfolio Value (₹)";
pub const DRAWDOWN_AXIS_TITLE: &str = "Drawdown (%)";

/// Portfolio name to series color. Unknown names get the fallback.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Named<String>,
    fallback: String,
}

impl Palette {
    pub fn new(colors: Named<String>, fallback: impl Into<String>) -> Self {
        Self {
            colors,
            fallback: fallback.into(),
        }
    }

    pub fn color_for(&self, name: &str) -> &str {
        self.colors.get(name).map(String::as_str).unwrap_or(self.fallback.as_str())
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(
            Named::from([
                ("Your Mix", "#007bff".to_string()),
                ("Defensive", "#28a745".to_string()),
                ("Aggressive", "#dc3545".to_string()),
                ("60/40", "#6f42c1".to_string()),
                ("All Equity", "#fd7e14".to_string()),
            ]),
            NEUTRAL_COLOR,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub name: String,
    pub highlighted: bool,
    /// Set on the user's row: which variant produced it.
    pub variant_note: Option<String>,
    pub cagr: String,
    pub volatility: String,
    pub max_drawdown: String,
    pub worst_12m: String,
    pub recovery: String,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<f64>,
    pub border_color: String,
    pub background_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub y_axis_title: &'static str,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationLine {
    pub asset: String,
    pub weight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioCard {
    pub name: String,
    pub highlighted: bool,
    pub allocation: Vec<AllocationLine>,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub table: Vec<TableRow>,
    pub growth: ChartData,
    pub drawdown: ChartData,
    pub cards: Vec<PortfolioCard>,
    pub comparisons: Vec<String>,
}

/// One row per portfolio in the order received.
pub fn build_table(portfolios: &[PortfolioAnalysis], variant: Variant) -> Vec<TableRow> {
    portfolios
        .iter()
        .map(|p| {
            let m = &p.metrics;
            TableRow {
                name: p.name.clone(),
                highlighted: p.is_your_mix(),
                variant_note: p
                    .is_your_mix()
                    .then(|| format!("{variant} variant")),
                cagr: format::metric_pct(m.cagr_pct),
                volatility: format::metric_pct(m.vol_ann_pct),
                max_drawdown: format::metric_pct(m.max_dd_pct),
                worst_12m: format::metric_pct(m.worst_12m_pct),
                recovery: format::recovery(m.recovery_m),
                metrics: m.clone(),
            }
        })
        .collect()
}

/// One dataset per series; the shared date axis comes from the first series.
pub fn build_chart(
    series: &Named<ChartSeries>,
    palette: &Palette,
    y_axis_title: &'static str,
) -> ChartData {
    let labels = series
        .first()
        .map(|(_, s)| s.dates.clone())
        .unwrap_or_default();

    let datasets = series
        .iter()
        .map(|(name, s)| {
            let color = palette.color_for(name);
            ChartDataset {
                label: name.to_string(),
                data: s.values.clone(),
                border_color: color.to_string(),
                background_color: format!("{color}{FILL_ALPHA_SUFFIX}"),
            }
        })
        .collect();

    ChartData {
        y_axis_title,
        labels,
        datasets,
    }
}

pub fn build_cards(portfolios: &[PortfolioAnalysis]) -> Vec<PortfolioCard> {
    portfolios
        .iter()
        .map(|p| PortfolioCard {
            name: p.name.clone(),
            highlighted: p.is_your_mix(),
            allocation: p
                .weights
                .iter()
                .map(|(asset, w)| AllocationLine {
                    asset: asset.to_string(),
                    weight: format::allocation_pct(*w),
                })
                .collect(),
            explanation: format::strip_bold(&p.explanation),
        })
        .collect()
}

pub fn shape(result: &AnalyticsResult, variant: Variant, palette: &Palette) -> Dashboard {
    for issue in result.inconsistencies() {
        tracing::warn!(%issue, "analytics result is inconsistent");
    }

    Dashboard {
        table: build_table(&result.portfolios, variant),
        growth: build_chart(&result.growth_chart, palette, GROWTH_AXIS_TITLE),
        drawdown: build_chart(&result.drawdown_chart, palette, DRAWDOWN_AXIS_TITLE),
        cards: build_cards(&result.portfolios),
        comparisons: result.comparisons.clone(),
    }
}
