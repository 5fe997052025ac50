use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use sales_forecast::{
    applies_to_market, event_label, events_by_month, format_usd, generate_events, logging,
    write_report, EventId, ExportFormat, ForecastReport, ForecastScenario, Market, MonthAnchor,
    ShippingRateModel,
};

#[derive(Parser)]
#[command(
    name = "sales-forecast",
    about = "12-month sales and P&L forecast from unit economics and a seasonal calendar",
    version
)]
struct Cli {
    #[command(flatten)]
    scenario: ScenarioArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args)]
struct ScenarioArgs {
    /// JSON scenario file; flags below override its values
    #[arg(long, global = true)]
    scenario: Option<PathBuf>,

    /// Average order value ($)
    #[arg(long, global = true)]
    aov: Option<f64>,

    /// Cost of goods sold per order ($)
    #[arg(long, global = true)]
    cogs: Option<f64>,

    /// Product weight (kg)
    #[arg(long, global = true)]
    weight: Option<f64>,

    /// First-month marketing budget ($)
    #[arg(long, global = true)]
    budget: Option<f64>,

    /// Forecast start month (YYYY-MM), default: current month
    #[arg(long, global = true)]
    start: Option<MonthAnchor>,

    /// Event id to switch off (repeatable)
    #[arg(long = "exclude-event", global = true)]
    exclude_events: Vec<EventId>,

    /// Switch every event off
    #[arg(long, global = true)]
    no_events: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the 12-month forecast (default)
    Forecast {
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the merchandising events of the forecast window
    Calendar {
        /// Only events that apply to this market (GCC, EU, US, Canada)
        #[arg(long)]
        market: Option<Market>,
    },

    /// Show the shipping cost breakdown for the product weight
    Shipping,

    /// Write the forecast report to a file
    Export {
        #[arg(long)]
        out: PathBuf,

        /// csv, text or json (default: from the file extension, else csv)
        #[arg(long)]
        format: Option<ExportFormat>,

        /// Brand shown in the report title
        #[arg(long)]
        brand: Option<String>,
    },

    /// Interactive terminal UI
    Tui,
}

fn main() -> Result<()> {
    logging::init_with_default("warn");

    let cli = Cli::parse();
    let scenario = load_scenario(&cli.scenario)?;

    match cli.command.unwrap_or(Command::Forecast { json: false }) {
        Command::Forecast { json } => run_forecast(&scenario, json),
        Command::Calendar { market } => run_calendar(&scenario, market),
        Command::Shipping => run_shipping(&scenario),
        Command::Export { out, format, brand } => run_export(&scenario, out, format, brand),
        Command::Tui => run_ui_mode(&scenario),
    }
}

/// Scenario file (if any) with command-line overrides applied
fn load_scenario(args: &ScenarioArgs) -> Result<ForecastScenario> {
    let mut scenario = match &args.scenario {
        Some(path) => ForecastScenario::from_file(path)?,
        None => ForecastScenario::default(),
    };

    if let Some(aov) = args.aov {
        scenario.aov = aov;
    }
    if let Some(cogs) = args.cogs {
        scenario.cogs = cogs;
    }
    if let Some(weight) = args.weight {
        scenario.product_weight_kg = weight;
    }
    if let Some(budget) = args.budget {
        scenario.first_month_marketing_budget = budget;
    }
    if let Some(start) = args.start {
        scenario.start = Some(start);
    }
    scenario.excluded_events.extend(args.exclude_events.iter().cloned());
    if args.no_events {
        scenario.include_events = false;
    }

    Ok(scenario)
}

fn run_forecast(scenario: &ForecastScenario, json: bool) -> Result<()> {
    let report = ForecastReport::new(&scenario.brand, &scenario.request());
    let format = if json { ExportFormat::Json } else { ExportFormat::Text };
    println!("{}", report.render(format)?);
    Ok(())
}

fn run_calendar(scenario: &ForecastScenario, market: Option<Market>) -> Result<()> {
    let start = scenario.start();
    let events = generate_events(start);
    let selection = scenario.selection(&events);

    let visible = events
        .iter()
        .filter(|e| market.map_or(true, |m| applies_to_market(e, m.as_str())));

    let scope = market.map(|m| m.label()).unwrap_or("All markets");
    println!("📅 Merchandising calendar from {} ({})", start.long_label(), scope);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for (month, bucket) in events_by_month(visible, start) {
        println!("\n{}", month.label());
        if bucket.is_empty() {
            println!("  No events");
        }
        for event in bucket {
            let mark = if selection.contains(&event.id) { "[x]" } else { "[ ]" };
            println!(
                "  {} {}  {:<45} +{}%",
                mark,
                event.date.format("%d %b"),
                event_label(event),
                event.conversion_lift_percent
            );
            println!("      id: {}", event.id);
        }
    }

    println!("\n✓ {} of {} events selected", selection.len(), events.len());
    Ok(())
}

fn run_shipping(scenario: &ForecastScenario) -> Result<()> {
    let model = ShippingRateModel::default();
    let weight = scenario.product_weight_kg;

    println!("📦 Shipping for {} kg", weight);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for charge in model.tier_breakdown(weight) {
        println!(
            "  tier {:>2}  {:>6.3} kg × ₹{:>8.2}/kg = ₹{:>9.2}",
            charge.tier,
            charge.kg,
            charge.rate,
            charge.amount()
        );
    }
    println!("\n  Total (INR):      ₹{:.2}", model.source_cost(weight));
    println!("  Shipping/order:   {}", format_usd(model.shipping_cost(weight)));
    println!("  Effective rate:   {}/kg", format_usd(model.effective_rate(weight)));
    Ok(())
}

fn run_export(
    scenario: &ForecastScenario,
    out: PathBuf,
    format: Option<ExportFormat>,
    brand: Option<String>,
) -> Result<()> {
    let format = format
        .or_else(|| ExportFormat::from_path(&out))
        .unwrap_or(ExportFormat::Csv);
    let brand = brand.unwrap_or_else(|| scenario.brand.clone());

    let report = ForecastReport::new(&brand, &scenario.request());
    write_report(&out, &report, format)
        .with_context(|| format!("Failed to export {} report", format))?;

    info!(path = ?out, %format, "report exported");
    println!("✓ Wrote {} report to {}", format, out.display());
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(scenario: &ForecastScenario) -> Result<()> {
    use sales_forecast::ui;

    let mut app = ui::App::new(&scenario.request());
    ui::run_ui(&mut app)?;
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_scenario: &ForecastScenario) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_scenario() {
        let cli = Cli::parse_from([
            "sales-forecast",
            "--aov",
            "50",
            "--cogs",
            "15",
            "--weight",
            "0.5",
            "--budget",
            "1000",
            "--start",
            "2026-03",
            "--no-events",
            "forecast",
        ]);
        let scenario = load_scenario(&cli.scenario).unwrap();

        assert_eq!(scenario.aov, 50.0);
        assert_eq!(scenario.start, Some("2026-03".parse().unwrap()));
        assert!(!scenario.include_events);
        assert_eq!(scenario.request().run().months[0].orders, 57);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["sales-forecast", "calendar", "--market", "gcc", "--start", "2026-12"]);
        assert!(matches!(
            cli.command,
            Some(Command::Calendar {
                market: Some(Market::Gcc)
            })
        ));
        assert_eq!(cli.scenario.start, Some("2026-12".parse().unwrap()));
    }

    #[test]
    fn test_export_format_flag() {
        let cli = Cli::parse_from(["sales-forecast", "export", "--out", "r.txt", "--format", "json"]);
        match cli.command {
            Some(Command::Export { format, .. }) => assert_eq!(format, Some(ExportFormat::Json)),
            _ => panic!("expected export command"),
        }
        assert!(Cli::try_parse_from(["sales-forecast", "export", "--out", "r", "--format", "pdf"]).is_err());
    }
}
