// 📄 Forecast Report - P&L export as CSV, plain text or JSON
//
// A report bundles everything a shared forecast needs: the inputs echo
// (with contribution margin), the selected events grouped by month, the
// 12 monthly records and their totals.

use crate::calendar::{event_label, events_by_month, generate_events, MerchandisingEvent};
use crate::error::ForecastError;
use crate::forecast::{BusinessInputs, Forecast, ForecastRequest, ForecastSummary};
use crate::money::{format_amount, format_usd};
use crate::month::MonthAnchor;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Events listed per month before collapsing into "+N more"
pub const MAX_EVENTS_PER_MONTH: usize = 4;

const FALLBACK_BRAND: &str = "Brand";
const FILENAME_FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

// ============================================================================
// EXPORT FORMAT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Text,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
        }
    }

    /// Guess a format from a file extension
    pub fn from_path(path: &Path) -> Option<ExportFormat> {
        let ext = path.extension()?.to_str()?;
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "txt" | "text" => Some(ExportFormat::Text),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Text => write!(f, "text"),
            ExportFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "text" | "txt" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ForecastError::UnknownFormat(s.to_string())),
        }
    }
}

// ============================================================================
// REPORT MODEL
// ============================================================================

/// Business inputs as printed on a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputsEcho {
    pub aov: f64,
    pub cogs: f64,
    pub product_weight_kg: f64,
    pub shipping_per_order: f64,
    pub first_month_marketing_budget: f64,

    /// AOV − COGS − shipping, unclamped
    pub contribution_margin: f64,
}

impl From<&BusinessInputs> for InputsEcho {
    fn from(inputs: &BusinessInputs) -> Self {
        InputsEcho {
            aov: inputs.aov,
            cogs: inputs.cogs,
            product_weight_kg: inputs.product_weight_kg,
            shipping_per_order: inputs.shipping_per_order,
            first_month_marketing_budget: inputs.first_month_marketing_budget,
            contribution_margin: inputs.contribution_margin(),
        }
    }
}

/// One month bucket of the selected events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMonth {
    pub month: MonthAnchor,
    pub label: String,
    pub events: Vec<MerchandisingEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    /// Brand as typed by the user (may be empty)
    pub brand: String,
    pub start: MonthAnchor,
    pub inputs: InputsEcho,
    pub events: Vec<EventMonth>,
    pub forecast: Forecast,
    pub summary: ForecastSummary,
}

impl ForecastReport {
    /// Run the request and assemble its report
    pub fn new(brand: &str, request: &ForecastRequest) -> Self {
        let forecast = request.run();
        Self::from_forecast(brand, request, forecast)
    }

    /// Assemble a report around an already-computed forecast
    pub fn from_forecast(brand: &str, request: &ForecastRequest, forecast: Forecast) -> Self {
        let calendar = generate_events(request.start);
        let selected = request.selection.filter(&calendar);

        let events = events_by_month(selected, request.start)
            .into_iter()
            .map(|(month, bucket)| EventMonth {
                month,
                label: month.label(),
                events: bucket.into_iter().cloned().collect(),
            })
            .collect();

        ForecastReport {
            brand: brand.trim().to_string(),
            start: request.start,
            inputs: InputsEcho::from(&request.inputs),
            events,
            summary: forecast.summary(&request.inputs),
            forecast,
        }
    }

    pub fn title(&self) -> String {
        if self.brand.is_empty() {
            "SellAbroad 12-Month Forecast".to_string()
        } else {
            format!("SellAbroad 12-Month Forecast For {}", self.brand)
        }
    }

    pub fn render(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => forecast_to_csv(&self.forecast),
            ExportFormat::Text => Ok(render_text(self)),
            ExportFormat::Json => {
                serde_json::to_string_pretty(self).context("Failed to serialize report JSON")
            }
        }
    }
}

// ============================================================================
// FILENAMES
// ============================================================================

/// Strip characters that are not allowed in file names; empty → "Brand"
pub fn sanitize_brand(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| !FILENAME_FORBIDDEN.contains(c)).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        FALLBACK_BRAND.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Default export file name for a brand
///
/// Example: `report_filename("Acme", ExportFormat::Csv)` →
/// `"SellAbroad 12 Month Forecast For Acme.csv"`
pub fn report_filename(brand: &str, format: ExportFormat) -> String {
    format!(
        "SellAbroad 12 Month Forecast For {}.{}",
        sanitize_brand(brand),
        format.extension()
    )
}

// ============================================================================
// CSV
// ============================================================================

pub const CSV_HEADERS: [&str; 9] = [
    "month", "revenue", "cogs", "shipping", "marketing", "profit", "orders", "lift", "event",
];

/// P&L table as CSV: one row per month plus a total row
pub fn forecast_to_csv(forecast: &Forecast) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(CSV_HEADERS)?;

    for m in &forecast.months {
        wtr.write_record([
            m.month.key(),
            format!("{:.2}", m.revenue),
            format!("{:.2}", m.cogs_total),
            format!("{:.2}", m.shipping_total),
            format!("{:.2}", m.marketing_total),
            format!("{:.2}", m.profit),
            m.orders.to_string(),
            m.conversion_lift_percent.to_string(),
            m.event_name.clone().unwrap_or_default(),
        ])?;
    }

    let t = &forecast.totals;
    wtr.write_record([
        "Total".to_string(),
        format!("{:.2}", t.revenue),
        format!("{:.2}", t.cogs),
        format!("{:.2}", t.shipping),
        format!("{:.2}", t.marketing),
        format!("{:.2}", t.profit),
        t.orders.to_string(),
        String::new(),
        String::new(),
    ])?;

    let bytes = wtr.into_inner().context("Failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}

// ============================================================================
// TEXT
// ============================================================================

pub fn render_text(report: &ForecastReport) -> String {
    let mut out = String::new();
    let title = report.title();
    out.push_str(&title);
    out.push('\n');
    out.push_str(&"=".repeat(title.chars().count()));
    out.push_str("\n\n");

    // 1. Inputs
    let i = &report.inputs;
    out.push_str("1. Business inputs\n");
    let brand = if report.brand.is_empty() { "—" } else { report.brand.as_str() };
    let lines = [
        ("Brand", brand.to_string()),
        ("Forecast start", report.start.long_label()),
        ("AOV ($)", format_amount(i.aov)),
        ("COGS ($)", format_amount(i.cogs)),
        ("Product weight (kg)", i.product_weight_kg.to_string()),
        ("Shipping/order ($)", format_amount(i.shipping_per_order)),
        ("Marketing M1 ($)", format_amount(i.first_month_marketing_budget)),
        ("Contribution margin/order ($)", format_amount(i.contribution_margin)),
    ];
    for (label, value) in lines {
        out.push_str(&format!("  {:<31} {}\n", label, value));
    }
    out.push('\n');

    // 2. Events
    out.push_str("2. Merchandising events\n");
    for bucket in &report.events {
        out.push_str(&format!("  {}\n", bucket.label));
        if bucket.events.is_empty() {
            out.push_str("    No events\n");
            continue;
        }
        for event in bucket.events.iter().take(MAX_EVENTS_PER_MONTH) {
            out.push_str(&format!(
                "    {} (+{}%)\n",
                event_label(event),
                event.conversion_lift_percent
            ));
        }
        if bucket.events.len() > MAX_EVENTS_PER_MONTH {
            out.push_str(&format!(
                "    +{} more\n",
                bucket.events.len() - MAX_EVENTS_PER_MONTH
            ));
        }
    }
    out.push('\n');

    // 3. P&L
    out.push_str("3. P&L table (12 months)\n");
    out.push_str(&format!(
        "  {:<18} {:>14} {:>14} {:>14} {:>14} {:>14}  {}\n",
        "Month", "Revenue", "COGS", "Shipping", "Marketing", "Profit", "Event"
    ));
    for m in &report.forecast.months {
        let event = match &m.event_name {
            Some(name) => format!("+{}% {}", m.conversion_lift_percent, name),
            None => "—".to_string(),
        };
        out.push_str(&format!(
            "  {:<18} {:>14} {:>14} {:>14} {:>14} {:>14}  {}\n",
            m.month_label,
            format_usd(m.revenue),
            format_usd(m.cogs_total),
            format_usd(m.shipping_total),
            format_usd(m.marketing_total),
            format_usd(m.profit),
            event
        ));
    }
    let t = &report.forecast.totals;
    out.push_str(&format!(
        "  {:<18} {:>14} {:>14} {:>14} {:>14} {:>14}\n",
        "Total (12 months)",
        format_usd(t.revenue),
        format_usd(t.cogs),
        format_usd(t.shipping),
        format_usd(t.marketing),
        format_usd(t.profit),
    ));
    out.push('\n');

    out.push_str(&format!("Orders: {}\n", t.orders));
    out.push_str(&format!("COGS % of revenue: {:.1}%\n", t.cogs_percent));
    out.push_str(&format!("{}\n", report.summary));
    out
}

// ============================================================================
// FILE OUTPUT
// ============================================================================

/// Render a report and write it to `path`
pub fn write_report<P: AsRef<Path>>(path: P, report: &ForecastReport, format: ExportFormat) -> Result<()> {
    let body = report.render(format)?;
    fs::write(path.as_ref(), body)
        .with_context(|| format!("Failed to write report: {:?}", path.as_ref()))?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
