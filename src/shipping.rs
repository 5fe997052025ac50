// 📦 Shipping Rate Model - Tiered per-kilogram pricing
//
// Weight is billed in 1 kg bands. Each band is 15% cheaper per kg than the
// one before it, up to MAX_TIER; anything heavier is billed at the MAX_TIER
// rate. Rates are quoted in INR and reported in USD.

use crate::money::round2;
use serde::{Deserialize, Serialize};

/// Tier-0 rate in the source currency (INR per kg)
pub const BASE_RATE_INR_PER_KG: f64 = 900.0;

/// Fixed conversion from the source currency to the reporting currency
pub const INR_TO_USD: f64 = 1.0 / 83.0;

/// Rate multiplier applied per successive tier
pub const TIER_DISCOUNT: f64 = 0.85;

/// Highest tier index; weight past MAX_TIER full bands stays at this rate
pub const MAX_TIER: u32 = 10;

// ============================================================================
// TIER CHARGE
// ============================================================================

/// One band of a shipping bill
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierCharge {
    /// Tier index (0 = first kilogram)
    pub tier: u32,

    /// Kilograms billed in this band (≤ 1 except for the capped tail)
    pub kg: f64,

    /// Per-kg rate for this band, in the source currency
    pub rate: f64,
}

impl TierCharge {
    /// Charge for this band in the source currency
    pub fn amount(&self) -> f64 {
        self.kg * self.rate
    }
}

// ============================================================================
// SHIPPING RATE MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShippingRateModel {
    /// Tier-0 rate per kg, source currency
    pub base_rate_per_kg: f64,

    /// Multiplier per tier (0.85 = 15% cheaper each band)
    pub tier_discount: f64,

    /// Tier index cap
    pub max_tier: u32,

    /// Source → reporting currency multiplier
    pub conversion_rate: f64,
}

impl ShippingRateModel {
    pub fn new() -> Self {
        ShippingRateModel {
            base_rate_per_kg: BASE_RATE_INR_PER_KG,
            tier_discount: TIER_DISCOUNT,
            max_tier: MAX_TIER,
            conversion_rate: INR_TO_USD,
        }
    }

    /// Per-kg rate for a tier, in the source currency
    pub fn tier_rate(&self, tier: u32) -> f64 {
        self.base_rate_per_kg * self.tier_discount.powf(tier.min(self.max_tier) as f64)
    }

    /// Split a weight into billed bands
    ///
    /// Fractional final bands are billed at that band's rate; weight left
    /// after `max_tier` full bands becomes a single tail band at the
    /// `max_tier` rate.
    pub fn tier_breakdown(&self, weight_kg: f64) -> Vec<TierCharge> {
        let mut charges = Vec::new();
        if is_weightless(weight_kg) {
            return charges;
        }

        let mut remaining = weight_kg;
        let mut tier = 0;
        while remaining > 0.0 && tier < self.max_tier {
            let kg = remaining.min(1.0);
            charges.push(TierCharge {
                tier,
                kg,
                rate: self.tier_rate(tier),
            });
            remaining -= kg;
            tier += 1;
        }

        if remaining > 0.0 {
            charges.push(TierCharge {
                tier,
                kg: remaining,
                rate: self.tier_rate(tier),
            });
        }

        charges
    }

    /// Total bill in the source currency, rounded to cents
    pub fn source_cost(&self, weight_kg: f64) -> f64 {
        let total: f64 = self
            .tier_breakdown(weight_kg)
            .iter()
            .fold(0.0, |acc, charge| acc + charge.amount());
        round2(total)
    }

    /// Shipping cost per order in the reporting currency
    ///
    /// Returns 0 for non-positive weight.
    pub fn shipping_cost(&self, weight_kg: f64) -> f64 {
        if is_weightless(weight_kg) {
            return 0.0;
        }
        round2(self.source_cost(weight_kg) * self.conversion_rate)
    }

    /// Effective reporting-currency rate per kg
    ///
    /// For non-positive weight this is the tier-0 rate.
    pub fn effective_rate(&self, weight_kg: f64) -> f64 {
        if is_weightless(weight_kg) {
            return round2(self.base_rate_per_kg * self.conversion_rate);
        }
        round2(self.shipping_cost(weight_kg) / weight_kg)
    }
}

impl Default for ShippingRateModel {
    fn default() -> Self {
        Self::new()
    }
}

fn is_weightless(weight_kg: f64) -> bool {
    weight_kg.is_nan() || weight_kg <= 0.0
}

/// Shipping cost per order using the standard rate card
pub fn compute_shipping_cost(weight_kg: f64) -> f64 {
    ShippingRateModel::default().shipping_cost(weight_kg)
}

/// Effective per-kg rate using the standard rate card
pub fn compute_effective_rate(weight_kg: f64) -> f64 {
    ShippingRateModel::default().effective_rate(weight_kg)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_negative_weight() {
        assert_eq!(compute_shipping_cost(0.0), 0.0);
        assert_eq!(compute_shipping_cost(-3.0), 0.0);
        assert_eq!(compute_shipping_cost(f64::NAN), 0.0);
    }

    #[test]
    fn test_half_kilo_stays_in_first_tier() {
        let model = ShippingRateModel::default();
        let bands = model.tier_breakdown(0.5);
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].tier, 0);
        assert_eq!(model.source_cost(0.5), 450.0);
        // 450 INR / 83 = 5.4216...
        assert_eq!(model.shipping_cost(0.5), 5.42);
    }

    #[test]
    fn test_whole_kilos() {
        // 900 / 83
        assert_eq!(compute_shipping_cost(1.0), 10.84);
        // (900 + 765) / 83
        assert_eq!(compute_shipping_cost(2.0), 20.06);
        // (900 + 765 + 650.25) / 83
        assert_eq!(compute_shipping_cost(3.0), 27.89);
    }

    #[test]
    fn test_marginal_cost_decreases_per_tier() {
        let c1 = compute_shipping_cost(1.0);
        let c2 = compute_shipping_cost(2.0);
        let c3 = compute_shipping_cost(3.0);

        assert!(c1 < c2 && c2 < c3);
        assert!(c2 - c1 < c1);
        assert!(c3 - c2 < c2 - c1);
    }

    #[test]
    fn test_fractional_band_uses_its_own_rate() {
        let model = ShippingRateModel::default();
        let bands = model.tier_breakdown(1.5);
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[1].kg, 0.5);
        assert!((bands[1].rate - 765.0).abs() < 1e-9);
        assert_eq!(model.source_cost(1.5), 1282.5);
    }

    #[test]
    fn test_tail_beyond_cap_billed_at_cap_rate() {
        let model = ShippingRateModel::default();
        let bands = model.tier_breakdown(13.0);

        assert_eq!(bands.len(), 11);
        let tail = bands.last().unwrap();
        assert_eq!(tail.tier, MAX_TIER);
        assert!((tail.kg - 3.0).abs() < 1e-9);
        assert_eq!(tail.rate, model.tier_rate(MAX_TIER));
        // No discount past the cap
        assert_eq!(model.tier_rate(MAX_TIER + 5), model.tier_rate(MAX_TIER));
    }

    #[test]
    fn test_effective_rate() {
        assert_eq!(compute_effective_rate(0.0), 10.84);
        assert_eq!(compute_effective_rate(0.5), 10.84);
        assert_eq!(compute_effective_rate(2.0), 10.03);
    }
}
