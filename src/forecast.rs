// 📈 Forecast Engine - 12-month sales and P&L projection
//
// For each month of the window:
//   spend    = budget × 1.05^i
//   orders   = spend / (CAC% × AOV) × (1 + lift)
//   profit   = revenue − COGS − shipping − spend
//
// Every figure is rounded to cents where it is derived. The engine holds
// no state: identical arguments always produce identical output.

use crate::calendar::{generate_events, MerchandisingEvent};
use crate::money::{finite_or_zero, round2, round_half_up};
use crate::month::MonthAnchor;
use crate::selection::EventSelection;
use crate::shipping::ShippingRateModel;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{debug, trace};

/// Month-over-month marketing spend multiplier
pub const GROWTH_FACTOR: f64 = 1.05;

/// Acquisition cost as percent of AOV, by month index
pub const CAC_SCHEDULE: [f64; 12] = [
    35.0, 33.0, 30.0, 28.0, 25.0, 25.0, 25.0, 25.0, 25.0, 25.0, 25.0, 25.0,
];

/// CAC percent used when a schedule has no entries at all
pub const DEFAULT_CAC_PERCENT: f64 = 25.0;

// ============================================================================
// BUSINESS INPUTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BusinessInputs {
    /// Average order value
    pub aov: f64,

    /// Cost of goods sold per order
    pub cogs: f64,

    pub product_weight_kg: f64,

    /// Month-0 marketing budget (never negative)
    pub first_month_marketing_budget: f64,

    /// Derived from the weight by the shipping rate model
    pub shipping_per_order: f64,
}

impl BusinessInputs {
    /// Build inputs using the standard shipping rate card
    ///
    /// Non-finite values become 0 and a negative budget is clamped to 0.
    pub fn new(aov: f64, cogs: f64, product_weight_kg: f64, first_month_marketing_budget: f64) -> Self {
        Self::with_shipping_model(
            aov,
            cogs,
            product_weight_kg,
            first_month_marketing_budget,
            &ShippingRateModel::default(),
        )
    }

    pub fn with_shipping_model(
        aov: f64,
        cogs: f64,
        product_weight_kg: f64,
        first_month_marketing_budget: f64,
        shipping: &ShippingRateModel,
    ) -> Self {
        let product_weight_kg = finite_or_zero(product_weight_kg);
        BusinessInputs {
            aov: finite_or_zero(aov),
            cogs: finite_or_zero(cogs),
            product_weight_kg,
            first_month_marketing_budget: finite_or_zero(first_month_marketing_budget).max(0.0),
            shipping_per_order: shipping.shipping_cost(product_weight_kg),
        }
    }

    /// AOV − COGS − shipping per order (may be negative)
    pub fn contribution_margin(&self) -> f64 {
        round2(self.aov - self.cogs - self.shipping_per_order)
    }

    /// Contribution margin as a percent of AOV, floored at 0
    pub fn margin_percent(&self) -> f64 {
        if self.aov <= 0.0 {
            return 0.0;
        }
        self.contribution_margin().max(0.0) / self.aov * 100.0
    }
}

// ============================================================================
// MONTH FORECAST
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthForecast {
    pub month: MonthAnchor,
    pub month_label: String,
    pub orders: u64,
    pub revenue: f64,
    pub cogs_total: f64,
    pub shipping_total: f64,
    pub marketing_total: f64,

    /// May be negative
    pub profit: f64,

    pub conversion_lift_percent: f64,

    /// Event that supplied the lift, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
}

impl MonthForecast {
    pub fn is_event_month(&self) -> bool {
        self.conversion_lift_percent > 0.0
    }

    /// COGS + shipping
    pub fn variable_costs(&self) -> f64 {
        self.cogs_total + self.shipping_total
    }
}

// ============================================================================
// TOTALS & DERIVED VIEWS
// ============================================================================

/// Sums over the 12 monthly records
///
/// Plain sums of the rounded monthly values, in month order, so they match
/// any consumer that adds up the rows itself.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastTotals {
    pub orders: u64,
    pub revenue: f64,
    pub cogs: f64,
    pub shipping: f64,
    pub marketing: f64,
    pub profit: f64,

    /// COGS as percent of revenue (0 with no revenue)
    pub cogs_percent: f64,
}

impl ForecastTotals {
    pub fn from_months(months: &[MonthForecast]) -> Self {
        let mut totals = months.iter().fold(ForecastTotals::default(), |mut acc, m| {
            acc.orders += m.orders;
            acc.revenue += m.revenue;
            acc.cogs += m.cogs_total;
            acc.shipping += m.shipping_total;
            acc.marketing += m.marketing_total;
            acc.profit += m.profit;
            acc
        });

        totals.cogs_percent = if totals.revenue > 0.0 {
            totals.cogs / totals.revenue * 100.0
        } else {
            0.0
        };
        totals
    }
}

/// One P&L table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlRow {
    pub month: String,
    pub revenue: f64,
    pub cogs: f64,
    pub shipping: f64,
    pub marketing: f64,
    pub profit: f64,
    pub is_event_month: bool,
}

/// One point of the revenue / profit / costs / marketing chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub revenue: f64,
    pub profit: f64,
    pub costs: f64,
    pub marketing: f64,
}

/// Headline figures a lead-capture caller may pass along
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub total_revenue: f64,
    pub total_profit: f64,
    pub aov: f64,
}

impl fmt::Display for ForecastSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "12-mo revenue: {}, profit: {}, AOV: {}",
            crate::money::format_usd(self.total_revenue),
            crate::money::format_usd(self.total_profit),
            crate::money::format_usd(self.aov)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub start: MonthAnchor,
    pub months: Vec<MonthForecast>,
    pub totals: ForecastTotals,
}

impl Forecast {
    pub fn pl_rows(&self) -> Vec<PlRow> {
        self.months
            .iter()
            .map(|m| PlRow {
                month: m.month_label.clone(),
                revenue: m.revenue,
                cogs: m.cogs_total,
                shipping: m.shipping_total,
                marketing: m.marketing_total,
                profit: m.profit,
                is_event_month: m.is_event_month(),
            })
            .collect()
    }

    pub fn chart_series(&self) -> Vec<ChartPoint> {
        self.months
            .iter()
            .map(|m| ChartPoint {
                label: m.month_label.clone(),
                revenue: m.revenue,
                profit: m.profit,
                costs: m.variable_costs(),
                marketing: m.marketing_total,
            })
            .collect()
    }

    pub fn summary(&self, inputs: &BusinessInputs) -> ForecastSummary {
        ForecastSummary {
            total_revenue: self.totals.revenue,
            total_profit: self.totals.profit,
            aov: inputs.aov,
        }
    }
}

// ============================================================================
// FORECAST ENGINE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEngine {
    /// Month-over-month marketing spend multiplier (default: 1.05)
    pub growth_factor: f64,

    /// CAC percent of AOV by month index; the last entry repeats
    pub cac_schedule: Vec<f64>,
}

impl ForecastEngine {
    pub fn new() -> Self {
        ForecastEngine {
            growth_factor: GROWTH_FACTOR,
            cac_schedule: CAC_SCHEDULE.to_vec(),
        }
    }

    /// Marketing spend for month `index`, rounded to cents
    pub fn marketing_spend(&self, index: usize, first_month_budget: f64) -> f64 {
        round2(first_month_budget * self.growth_factor.powf(index as f64))
    }

    /// CAC for month `index` as a fraction of AOV
    pub fn cac_fraction(&self, index: usize) -> f64 {
        let percent = match self.cac_schedule.len() {
            0 => DEFAULT_CAC_PERCENT,
            len => self.cac_schedule[index.min(len - 1)],
        };
        percent / 100.0
    }

    /// Orders bought by `spend` before any event lift
    pub fn baseline_orders(&self, spend: f64, cac_fraction: f64, aov: f64) -> f64 {
        if aov <= 0.0 || cac_fraction <= 0.0 {
            return 0.0;
        }
        spend / (cac_fraction * aov)
    }

    /// Project 12 months from `start` with the selected calendar events
    pub fn compute(
        &self,
        inputs: &BusinessInputs,
        start: MonthAnchor,
        selection: &EventSelection,
    ) -> Forecast {
        let calendar = generate_events(start);
        let active = selection.filter(&calendar);

        let months: Vec<MonthForecast> = start
            .forecast_months()
            .into_iter()
            .enumerate()
            .map(|(i, month)| self.project_month(i, month, inputs, &active))
            .collect();

        let totals = ForecastTotals::from_months(&months);
        debug!(
            start = %start,
            active_events = active.len(),
            revenue = totals.revenue,
            profit = totals.profit,
            "computed forecast"
        );

        Forecast {
            start,
            months,
            totals,
        }
    }

    fn project_month(
        &self,
        index: usize,
        month: MonthAnchor,
        inputs: &BusinessInputs,
        active: &[&MerchandisingEvent],
    ) -> MonthForecast {
        let marketing_total = self.marketing_spend(index, inputs.first_month_marketing_budget);
        let cac = self.cac_fraction(index);
        let baseline = self.baseline_orders(marketing_total, cac, inputs.aov);

        let (lift, event_name) = conversion_lift(month, active);
        let orders = round_half_up(baseline * (1.0 + lift / 100.0)).max(0.0) as u64;
        let count = orders as f64;

        let revenue = round2(count * inputs.aov);
        let cogs_total = round2(count * inputs.cogs);
        let shipping_total = round2(count * inputs.shipping_per_order);
        let profit = round2(revenue - cogs_total - shipping_total - marketing_total);

        trace!(month = %month, cac, baseline, lift, orders, "projected month");

        MonthForecast {
            month,
            month_label: month.label(),
            orders,
            revenue,
            cogs_total,
            shipping_total,
            marketing_total,
            profit,
            conversion_lift_percent: lift,
            event_name,
        }
    }
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Highest lift among events dated inside `month`
///
/// When several events share the highest lift, the name reported is the
/// first of them in calendar order.
pub fn conversion_lift(month: MonthAnchor, events: &[&MerchandisingEvent]) -> (f64, Option<String>) {
    let mut best: Option<&MerchandisingEvent> = None;

    for event in events.iter().copied().filter(|e| month.contains(e.date)) {
        match best {
            Some(current) if event.conversion_lift_percent <= current.conversion_lift_percent => {}
            _ => best = Some(event),
        }
    }

    match best {
        Some(event) => (event.conversion_lift_percent, Some(event.name.clone())),
        None => (0.0, None),
    }
}

/// Run the default engine
pub fn compute_forecast(
    inputs: &BusinessInputs,
    start: MonthAnchor,
    selection: &EventSelection,
) -> Forecast {
    ForecastEngine::default().compute(inputs, start, selection)
}

// ============================================================================
// FORECAST REQUEST
// ============================================================================

/// Everything a forecast depends on, as one value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub inputs: BusinessInputs,
    pub start: MonthAnchor,
    pub selection: EventSelection,
}

impl ForecastRequest {
    pub fn new(inputs: BusinessInputs, start: MonthAnchor, selection: EventSelection) -> Self {
        ForecastRequest {
            inputs,
            start,
            selection,
        }
    }

    /// Request with every event of the start month's calendar selected
    pub fn with_all_events(inputs: BusinessInputs, start: MonthAnchor) -> Self {
        let selection = EventSelection::all(&generate_events(start));
        ForecastRequest::new(inputs, start, selection)
    }

    pub fn run(&self) -> Forecast {
        compute_forecast(&self.inputs, self.start, &self.selection)
    }

    /// SHA-256 of the canonical request, for callers that memoize forecasts
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        // Selection is a sorted set, so equal requests serialize identically
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        hasher.update(&canonical);
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// TESTS
// ============================================================================
