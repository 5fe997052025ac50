// Sales Forecast - Core Library
// Exposes the forecasting engine for the CLI, TUI, API server and tests

pub mod calendar;
pub mod config;
pub mod error;
pub mod forecast;
pub mod logging;
pub mod markets;
pub mod money;
pub mod month;
pub mod report;
pub mod selection;
pub mod shipping;

#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use calendar::{
    applies_to_market, event_label, events_by_month, generate_events, rules_for_month,
    Applicability, EventId, EventRule, MerchandisingEvent,
};
pub use config::{ForecastScenario, ServerConfig};
pub use error::{ForecastError, ForecastResult};
pub use forecast::{
    compute_forecast, conversion_lift, BusinessInputs, ChartPoint, Forecast, ForecastEngine,
    ForecastRequest, ForecastSummary, ForecastTotals, MonthForecast, PlRow,
};
pub use markets::{country_display_name, resolve_countries, Market};
pub use money::{format_usd, round2};
pub use month::{MonthAnchor, FORECAST_WINDOW};
pub use report::{
    forecast_to_csv, render_text, report_filename, sanitize_brand, write_report, ExportFormat,
    ForecastReport,
};
pub use selection::EventSelection;
pub use shipping::{compute_effective_rate, compute_shipping_cost, ShippingRateModel, TierCharge};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
