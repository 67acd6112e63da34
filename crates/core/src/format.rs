//! Fixed-precision display formatting.

pub const CURRENCY_SYMBOL: &str = "₹";

/// Metric already expressed in percent, two decimals: `10.87` -> `"10.87%"`.
pub fn metric_pct(value: f64) -> String {
    format!("{value:.2}%")
}

/// Fraction as percent, one decimal: `0.6` -> `"60.0%"`.
pub fn weight_pct(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Fraction as percent, two decimals, for allocation listings: `0.05` -> `"5.00%"`.
pub fn allocation_pct(fraction: f64) -> String {
    metric_pct(fraction * 100.0)
}

/// Fraction as whole percent for axis labels: `0.33` -> `"33%"`.
pub fn axis_pct(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}

pub fn currency(value: f64) -> String {
    format!("{CURRENCY_SYMBOL}{value:.2}")
}

/// `Some(0)` means no extended recovery period, shown the same as unknown.
pub fn recovery(months: Option<u32>) -> String {
    match months {
        Some(m) if m > 0 => format!("{m} months"),
        _ => "N/A".to_string(),
    }
}

/// Drops markdown bold markers from service-authored prose.
pub fn strip_bold(text: &str) -> String {
    text.replace("**", "")
}

/// `"very_high"` -> `"very high"`.
pub fn humanize(label: &str) -> String {
    label.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages_use_fixed_precision() {
        assert_eq!(metric_pct(10.87), "10.87%");
        assert_eq!(metric_pct(-16.6), "-16.60%");
        assert_eq!(weight_pct(0.6), "60.0%");
        assert_eq!(weight_pct(0.25), "25.0%");
        assert_eq!(allocation_pct(0.05), "5.00%");
        assert_eq!(axis_pct(0.5), "50%");
        assert_eq!(axis_pct(1.0), "100%");
    }

    #[test]
    fn currency_has_symbol_and_two_decimals() {
        assert_eq!(currency(1.5), "₹1.50");
        assert_eq!(currency(2.0), "₹2.00");
    }

    #[test]
    fn recovery_and_text_helpers() {
        assert_eq!(recovery(Some(12)), "12 months");
        assert_eq!(recovery(Some(0)), "N/A");
        assert_eq!(recovery(None), "N/A");
        assert_eq!(strip_bold("**Your Mix**: steady"), "Your Mix: steady");
        assert_eq!(humanize("very_high"), "very high");
    }

    #[test]
    fn non_finite_values_do_not_panic() {
        assert_eq!(weight_pct(f64::NAN), "NaN%");
        assert_eq!(metric_pct(f64::INFINITY), "inf%");
    }
}
