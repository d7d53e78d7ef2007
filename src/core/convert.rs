//! Pure conversion between any two currencies of a single-base snapshot.

use super::rates::CanonicalRateMap;

/// Division that yields `None` instead of infinities or NaN.
pub fn safe_div(numerator: f64, denominator: f64) -> Option<f64> {
    if !numerator.is_finite() || !denominator.is_finite() || denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator).filter(|quotient| quotient.is_finite())
}

/// Converts `amount` of `from` into `to` using rates quoted against `base`.
///
/// Pairs that do not involve the base are triangulated through it. Returns
/// `None` when either code is unknown, the amount is not finite, a rate
/// needed as a divisor is zero, or the result overflows.
pub fn convert(
    amount: f64,
    from: &str,
    to: &str,
    base: &str,
    rates: &CanonicalRateMap,
) -> Option<f64> {
    if !amount.is_finite() {
        return None;
    }

    let from = from.trim().to_uppercase();
    let to = to.trim().to_uppercase();
    let base = base.trim().to_uppercase();

    if from == to {
        return Some(amount);
    }

    let resolvable = |code: &str| code == base || rates.contains_key(code);
    if !resolvable(&from) || !resolvable(&to) {
        return None;
    }

    if from == base {
        return rates.get(&to).map(|rate| amount * rate).filter(|v| v.is_finite());
    }
    if to == base {
        return rates.get(&from).and_then(|rate| safe_div(amount, *rate));
    }

    let from_rate = rates.get(&from)?;
    let to_rate = rates.get(&to)?;
    safe_div(*to_rate, *from_rate)
        .map(|cross| amount * cross)
        .filter(|v| v.is_finite())
}

/// Value of one unit of `from` expressed in `to`.
pub fn unit_rate(from: &str, to: &str, base: &str, rates: &CanonicalRateMap) -> Option<f64> {
    convert(1.0, from, to, base, rates)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn sample_rates() -> CanonicalRateMap {
        CanonicalRateMap::from([("SAR".to_string(), 3.75), ("YER".to_string(), 531.5)])
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_identity_for_any_code() {
        let rates = sample_rates();
        assert_eq!(convert(42.5, "SAR", "SAR", "USD", &rates), Some(42.5));
        assert_eq!(convert(42.5, "XYZ", "xyz", "USD", &rates), Some(42.5));
        assert_eq!(convert(-3.0, "USD", "USD", "USD", &rates), Some(-3.0));
    }

    #[test]
    fn test_from_base_multiplies() {
        let rates = sample_rates();
        assert_eq!(convert(1.0, "USD", "YER", "USD", &rates), Some(531.5));
        assert_eq!(convert(2.0, "usd", "sar", "usd", &rates), Some(2.0 * 3.75));
    }

    #[test]
    fn test_to_base_divides() {
        let rates = sample_rates();
        let result = convert(1.0, "YER", "USD", "USD", &rates).unwrap();
        assert_eq!(result, 1.0 / 531.5);
        assert!((result - 0.001882).abs() < 1e-6);
    }

    #[test]
    fn test_to_base_with_zero_rate_is_absent() {
        let mut rates = sample_rates();
        rates.insert("ZZZ".to_string(), 0.0);
        assert_eq!(convert(10.0, "ZZZ", "USD", "USD", &rates), None);
        assert_eq!(convert(10.0, "ZZZ", "SAR", "USD", &rates), None);
    }

    #[test]
    fn test_triangulated_conversion() {
        let rates = sample_rates();
        let result = convert(100.0, "SAR", "YER", "USD", &rates).unwrap();
        assert!(approx_eq(result, 100.0 * (531.5 / 3.75)));
        assert!((result - 14173.33).abs() < 0.01);
    }

    #[test]
    fn test_triangulation_composes_through_base() {
        let rates = sample_rates();
        for amount in [1.0, 100.0, -250.0, 0.0] {
            let direct = convert(amount, "YER", "SAR", "USD", &rates).unwrap();
            let via_base = convert(amount, "YER", "USD", "USD", &rates)
                .and_then(|usd| convert(usd, "USD", "SAR", "USD", &rates))
                .unwrap();
            assert!(approx_eq(direct, via_base), "{direct} vs {via_base}");
        }
    }

    #[test]
    fn test_round_trip() {
        let rates = sample_rates();
        let codes = ["USD", "SAR", "YER"];
        for from in codes {
            for to in codes {
                let there = convert(1234.56, from, to, "USD", &rates).unwrap();
                let back = convert(there, to, from, "USD", &rates).unwrap();
                assert!(approx_eq(back, 1234.56), "{from}->{to}: {back}");
            }
        }
    }

    #[test]
    fn test_unresolvable_codes_are_absent() {
        let rates = sample_rates();
        assert_eq!(convert(1.0, "EUR", "USD", "USD", &rates), None);
        assert_eq!(convert(1.0, "USD", "EUR", "USD", &rates), None);
        assert_eq!(convert(1.0, "SAR", "EUR", "USD", &rates), None);
        assert_eq!(convert(1.0, "EUR", "GBP", "USD", &rates), None);
    }

    #[test]
    fn test_non_finite_amount_is_absent() {
        let rates = sample_rates();
        assert_eq!(convert(f64::NAN, "USD", "SAR", "USD", &rates), None);
        assert_eq!(convert(f64::INFINITY, "SAR", "SAR", "USD", &rates), None);
    }

    #[test]
    fn test_negative_amounts_keep_sign() {
        let rates = sample_rates();
        assert_eq!(convert(-2.0, "USD", "SAR", "USD", &rates), Some(-7.5));
        assert!(convert(-100.0, "SAR", "YER", "USD", &rates).unwrap() < 0.0);
    }

    #[test]
    fn test_base_entry_does_not_change_math() {
        let mut rates = sample_rates();
        rates.insert("USD".to_string(), 2.0);
        assert_eq!(convert(1.0, "USD", "SAR", "USD", &rates), Some(3.75));
        assert_eq!(convert(7.5, "SAR", "USD", "USD", &rates), Some(2.0));
    }

    #[test]
    fn test_safe_div_guards() {
        assert_eq!(safe_div(1.0, 0.0), None);
        assert_eq!(safe_div(1.0, -0.0), None);
        assert_eq!(safe_div(1.0, f64::NAN), None);
        assert_eq!(safe_div(f64::INFINITY, 2.0), None);
        assert_eq!(safe_div(f64::MAX, 1e-300), None);
        assert_eq!(safe_div(3.0, 2.0), Some(1.5));
    }

    #[test]
    fn test_overflowing_product_is_absent() {
        let rates = CanonicalRateMap::from([
            ("YER".to_string(), 1e300),
            ("SAR".to_string(), 1e-10),
        ]);
        assert_eq!(convert(1e10, "USD", "YER", "USD", &rates), None);
        assert_eq!(convert(1e10, "SAR", "YER", "USD", &rates), None);
        assert_eq!(convert(f64::MAX, "USD", "SAR", "USD", &rates), Some(f64::MAX * 1e-10));
    }

    #[test]
    fn test_unit_rate() {
        let rates = sample_rates();
        assert_eq!(unit_rate("USD", "SAR", "USD", &rates), Some(3.75));
        assert_eq!(unit_rate("SAR", "EUR", "USD", &rates), None);
    }
}
