//! Display helpers for alert and feed text

/// Whole-dollar USD with thousands separators, e.g. `$1,200,000,000`.
/// Non-finite input renders as `—`.
pub fn format_usd(amount: f64) -> String {
    if !amount.is_finite() {
        return crate::debt::UNAVAILABLE.to_string();
    }
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded < 0.0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Ratio as a percentage with one decimal, e.g. `62.5`
pub fn format_pct(ratio: f64) -> String {
    format!("{:.1}", ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "$0");
        assert_eq!(format_usd(999.4), "$999");
        assert_eq!(format_usd(1_000.0), "$1,000");
        assert_eq!(format_usd(300e6), "$300,000,000");
        assert_eq!(format_usd(-1_234_567.0), "-$1,234,567");
        assert_eq!(format_usd(f64::NAN), "—");
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(0.625), "62.5");
        assert_eq!(format_pct(1.0), "100.0");
    }
}
