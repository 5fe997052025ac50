// 💵 Money - Rounding discipline for every derived figure
// Each derivation step rounds to cents at the point it is computed,
// so downstream sums are sums of already-rounded values.

/// Round to the nearest integer, halves toward positive infinity
///
/// `2.5 → 3`, `-2.5 → -2`
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Round to two decimal places (cents)
pub fn round2(value: f64) -> f64 {
    round_half_up(value * 100.0) / 100.0
}

/// Replace NaN and infinities with zero
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Format an amount with thousands separators and two decimals
///
/// Example: `1234.5` → `"1,234.50"`, `-42.0` → `"-42.00"`
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Format an amount in the reporting currency
pub fn format_usd(value: f64) -> String {
    let amount = format_amount(value);
    match amount.strip_prefix('-') {
        Some(abs) => format!("-${}", abs),
        None => format!("${}", amount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(57.142857), 57.0);
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(0.0), 0.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(5.421686746987952), 5.42);
        assert_eq!(round2(1050.0), 1050.0);
        assert_eq!(round2(1102.5), 1102.5);
        assert_eq!(round2(-0.001), 0.0);
    }

    #[test]
    fn test_finite_or_zero() {
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(finite_or_zero(f64::INFINITY), 0.0);
        assert_eq!(finite_or_zero(12.5), 12.5);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.5), "999.50");
        assert_eq!(format_amount(1234.5), "1,234.50");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
        assert_eq!(format_amount(-42.0), "-42.00");
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(2850.0), "$2,850.00");
        assert_eq!(format_usd(-313.94), "-$313.94");
    }
}
