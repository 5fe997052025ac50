// ⚙️ Configuration - Scenario files and server settings
//
// A scenario is the JSON form of everything a forecast needs. Every field
// is optional; missing numbers default to 0, a missing start month to the
// current month, and a missing selection to every event in the calendar.

use crate::calendar::{generate_events, EventId, MerchandisingEvent};
use crate::forecast::{BusinessInputs, ForecastRequest};
use crate::month::MonthAnchor;
use crate::selection::EventSelection;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// Environment variable holding the server bind address
pub const SERVER_ADDR_ENV: &str = "FORECAST_SERVER_ADDR";

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";

// ============================================================================
// FORECAST SCENARIO
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastScenario {
    pub brand: String,
    pub aov: f64,
    pub cogs: f64,
    pub product_weight_kg: f64,
    pub first_month_marketing_budget: f64,

    /// Forecast start month ("YYYY-MM" or any date inside the month)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<MonthAnchor>,

    /// Explicit selection; `None` selects every event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_events: Option<Vec<EventId>>,

    /// Removed from the selection after it is resolved
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excluded_events: Vec<EventId>,

    /// `false` turns every event off
    pub include_events: bool,
}

impl Default for ForecastScenario {
    fn default() -> Self {
        ForecastScenario {
            brand: String::new(),
            aov: 0.0,
            cogs: 0.0,
            product_weight_kg: 0.0,
            first_month_marketing_budget: 0.0,
            start: None,
            selected_events: None,
            excluded_events: Vec::new(),
            include_events: true,
        }
    }
}

impl ForecastScenario {
    /// Load a scenario from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read scenario file: {:?}", path.as_ref()))?;

        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse scenario JSON")
    }

    pub fn inputs(&self) -> BusinessInputs {
        BusinessInputs::new(
            self.aov,
            self.cogs,
            self.product_weight_kg,
            self.first_month_marketing_budget,
        )
    }

    pub fn start(&self) -> MonthAnchor {
        self.start.unwrap_or_else(MonthAnchor::current)
    }

    /// Resolve the event selection against a generated calendar
    pub fn selection(&self, events: &[MerchandisingEvent]) -> EventSelection {
        if !self.include_events {
            return EventSelection::empty();
        }

        let mut selection = match &self.selected_events {
            Some(ids) => ids.iter().cloned().collect(),
            None => EventSelection::all(events),
        };
        for id in &self.excluded_events {
            selection.remove(id);
        }
        selection
    }

    pub fn request(&self) -> ForecastRequest {
        let start = self.start();
        let selection = self.selection(&generate_events(start));
        ForecastRequest::new(self.inputs(), start, selection)
    }
}

// ============================================================================
// SERVER CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl ServerConfig {
    /// Read the bind address from FORECAST_SERVER_ADDR (default 0.0.0.0:3000)
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var(SERVER_ADDR_ENV).unwrap_or_else(|_| DEFAULT_SERVER_ADDR.to_string());
        Self::parse(&raw)
    }

    pub fn parse(addr: &str) -> Result<Self> {
        let addr = addr
            .trim()
            .parse()
            .with_context(|| format!("Invalid {} value: {:?}", SERVER_ADDR_ENV, addr))?;
        Ok(ServerConfig { addr })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_scenario_defaults() {
        let scenario = ForecastScenario::from_json("{}").unwrap();
        assert_eq!(scenario, ForecastScenario::default());
        assert!(scenario.include_events);
        assert_eq!(scenario.inputs().aov, 0.0);
    }

    #[test]
    fn test_scenario_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "brand": "Acme",
                "aov": 50,
                "cogs": 15,
                "product_weight_kg": 0.5,
                "first_month_marketing_budget": 1000,
                "start": "2026-03-14"
            }}"#
        )
        .unwrap();

        let scenario = ForecastScenario::from_file(file.path()).unwrap();
        assert_eq!(scenario.brand, "Acme");
        assert_eq!(scenario.start(), "2026-03".parse().unwrap());

        let request = scenario.request();
        assert_eq!(request.inputs.shipping_per_order, 5.42);
        assert_eq!(request.selection.len(), generate_events(request.start).len());
        assert_eq!(request.run().months[0].orders, 57);
    }

    #[test]
    fn test_scenario_missing_file() {
        let err = ForecastScenario::from_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read scenario file"));
    }

    #[test]
    fn test_scenario_bad_json() {
        let err = ForecastScenario::from_json("{\"aov\": \"lots\"}").unwrap_err();
        assert!(err.to_string().contains("Failed to parse scenario JSON"));
        assert!(ForecastScenario::from_json(r#"{"start": "2026-13"}"#).is_err());
    }

    #[test]
    fn test_scenario_exclusions() {
        let start: MonthAnchor = "2026-12".parse().unwrap();
        let events = generate_events(start);
        let scenario = ForecastScenario {
            start: Some(start),
            excluded_events: vec![events[0].id.clone()],
            ..Default::default()
        };

        let selection = scenario.selection(&events);
        assert_eq!(selection.len(), events.len() - 1);
        assert!(!selection.contains(&events[0].id));
    }

    #[test]
    fn test_scenario_explicit_selection_and_switch_off() {
        let start: MonthAnchor = "2026-12".parse().unwrap();
        let events = generate_events(start);
        let mut scenario = ForecastScenario {
            start: Some(start),
            selected_events: Some(vec![events[1].id.clone()]),
            ..Default::default()
        };
        assert_eq!(scenario.selection(&events).len(), 1);

        scenario.include_events = false;
        assert!(scenario.selection(&events).is_empty());
    }

    #[test]
    fn test_server_config_parse() {
        let config = ServerConfig::parse("127.0.0.1:8080").unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert!(ServerConfig::parse("not an address").is_err());
        assert_eq!(ServerConfig::default().addr.to_string(), DEFAULT_SERVER_ADDR);
    }
}
