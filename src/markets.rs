// 🌍 Markets - Forecast regions and the countries they cover
//
// A market scope resolves to a fixed set of country codes. Country-restricted
// calendar events apply to a market only when the two sets intersect.

use crate::error::ForecastError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// European tier-1 markets: (code, display name)
pub const EUROPE_TIER1_COUNTRIES: &[(&str, &str)] = &[
    ("UK", "United Kingdom"),
    ("DE", "Germany"),
    ("FR", "France"),
    ("IT", "Italy"),
    ("ES", "Spain"),
    ("NL", "Netherlands"),
    ("BE", "Belgium"),
    ("AT", "Austria"),
    ("IE", "Ireland"),
    ("SE", "Sweden"),
    ("DK", "Denmark"),
    ("FI", "Finland"),
    ("PT", "Portugal"),
    ("PL", "Poland"),
    ("CH", "Switzerland"),
    ("NO", "Norway"),
    ("LU", "Luxembourg"),
];

const EU_CODES: &[&str] = &[
    "UK", "DE", "FR", "IT", "ES", "NL", "BE", "AT", "IE", "SE", "DK", "FI", "PT", "PL", "CH",
    "NO", "LU",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "GCC")]
    Gcc,
    #[serde(rename = "EU")]
    Eu,
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "Canada")]
    Canada,
}

impl Market {
    pub const ALL: [Market; 4] = [Market::Gcc, Market::Eu, Market::Us, Market::Canada];

    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Gcc => "GCC",
            Market::Eu => "EU",
            Market::Us => "US",
            Market::Canada => "Canada",
        }
    }

    /// Human-readable region name
    pub fn label(&self) -> &'static str {
        match self {
            Market::Gcc => "GCC",
            Market::Eu => "New Europe",
            Market::Us => "North America (US)",
            Market::Canada => "Canada",
        }
    }

    /// Country codes this market covers
    pub fn countries(&self) -> &'static [&'static str] {
        match self {
            Market::Gcc => &["GCC"],
            Market::Eu => EU_CODES,
            Market::Us => &["US"],
            Market::Canada => &["Canada"],
        }
    }

    /// Market a single country code is tagged with
    ///
    /// Anything that is not GCC, US or Canada is treated as European.
    pub fn for_country(code: &str) -> Market {
        match code {
            "GCC" => Market::Gcc,
            "US" => Market::Us,
            "Canada" => Market::Canada,
            _ => Market::Eu,
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Market::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ForecastError::UnknownMarket(s.to_string()))
    }
}

/// Country set for a market scope string; `None` for unknown scopes
pub fn resolve_countries(scope: &str) -> Option<&'static [&'static str]> {
    scope.parse::<Market>().ok().map(|m| m.countries())
}

/// Display name for a country code (falls back to the code itself)
pub fn country_display_name(code: &str) -> &str {
    match code {
        "GCC" => "GCC",
        "US" => "United States",
        "Canada" => "Canada",
        _ => EUROPE_TIER1_COUNTRIES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| *name)
            .unwrap_or(code),
    }
}
