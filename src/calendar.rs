// 🗓️ Merchandising Calendar - Seasonal events as data
//
// A fixed, year-independent rule table keyed by month-of-year. Generating
// the calendar for a start month walks the 12-month window and resolves
// every rule to a concrete date. Same start month in, same events out,
// down to the identifiers that callers keep in their selection sets.

use crate::error::ForecastError;
use crate::markets::{country_display_name, resolve_countries, Market};
use crate::month::MonthAnchor;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

// ============================================================================
// APPLICABILITY
// ============================================================================

/// Which countries an event applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Applicability {
    /// Every market
    Global,

    /// A single country
    Country { country: String },

    /// An explicit list of countries
    #[serde(rename = "multi")]
    Countries { countries: Vec<String> },
}

impl Applicability {
    /// Short mode tag used in event identifiers
    pub fn tag(&self) -> &'static str {
        match self {
            Applicability::Global => "global",
            Applicability::Country { .. } => "country",
            Applicability::Countries { .. } => "multi",
        }
    }

    /// Country codes this event is restricted to (empty for global events)
    pub fn countries(&self) -> Vec<&str> {
        match self {
            Applicability::Global => Vec::new(),
            Applicability::Country { country } => vec![country.as_str()],
            Applicability::Countries { countries } => {
                countries.iter().map(String::as_str).collect()
            }
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Applicability::Global)
    }

    fn from_parts(tag: &str, countries: Vec<String>) -> Option<Self> {
        match (tag, countries.len()) {
            ("global", 0) => Some(Applicability::Global),
            ("country", 1) => countries
                .into_iter()
                .next()
                .map(|country| Applicability::Country { country }),
            ("multi", n) if n > 0 => Some(Applicability::Countries { countries }),
            _ => None,
        }
    }
}

// ============================================================================
// EVENT ID - composite key
// ============================================================================

/// Stable event identity: (applicability, name, date)
///
/// Serialized as a JSON array `[mode, [countries..], name, "YYYY-MM-DD"]`,
/// which cannot collide no matter what characters appear in the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventId {
    pub applicability: Applicability,
    pub name: String,
    pub date: NaiveDate,
}

impl EventId {
    pub fn new(applicability: Applicability, name: impl Into<String>, date: NaiveDate) -> Self {
        EventId {
            applicability,
            name: name.into(),
            date,
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = serde_json::to_string(&(
            self.applicability.tag(),
            self.applicability.countries(),
            &self.name,
            self.date.format("%Y-%m-%d").to_string(),
        ))
        .map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl FromStr for EventId {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ForecastError::InvalidEventId(s.to_string());

        let (tag, countries, name, date): (String, Vec<String>, String, String) =
            serde_json::from_str(s).map_err(|_| invalid())?;
        let applicability = Applicability::from_parts(&tag, countries).ok_or_else(invalid)?;
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| invalid())?;

        Ok(EventId::new(applicability, name, date))
    }
}

impl TryFrom<String> for EventId {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.to_string()
    }
}

// ============================================================================
// MERCHANDISING EVENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchandisingEvent {
    pub id: EventId,
    pub name: String,
    pub date: NaiveDate,

    /// Market tag; only meaningful for single-country events
    pub market: Market,

    /// Conversion uplift while the event is active (percent, ≥ 0)
    pub conversion_lift_percent: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub applicability: Applicability,
}

// ============================================================================
// RULE TABLE
// ============================================================================

/// How a rule picks its day of month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayRule {
    /// Fixed day (values above 28 are capped at 28)
    Fixed(u32),

    /// The Friday 21 days after the month's first Friday
    PeakFriday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    Global,
    Country(&'static str),
    Countries(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRule {
    pub name: &'static str,
    pub day: DayRule,
    pub lift_percent: f64,
    pub scope: RuleScope,
    pub description: &'static str,
}

impl EventRule {
    const fn global(name: &'static str, day: u32, lift_percent: f64, description: &'static str) -> Self {
        EventRule {
            name,
            day: DayRule::Fixed(day),
            lift_percent,
            scope: RuleScope::Global,
            description,
        }
    }

    const fn country(
        name: &'static str,
        day: u32,
        country: &'static str,
        lift_percent: f64,
        description: &'static str,
    ) -> Self {
        EventRule {
            name,
            day: DayRule::Fixed(day),
            lift_percent,
            scope: RuleScope::Country(country),
            description,
        }
    }

    const fn countries(
        name: &'static str,
        day: u32,
        countries: &'static [&'static str],
        lift_percent: f64,
        description: &'static str,
    ) -> Self {
        EventRule {
            name,
            day: DayRule::Fixed(day),
            lift_percent,
            scope: RuleScope::Countries(countries),
            description,
        }
    }

    /// Resolve this rule to a concrete event inside `month`
    pub fn resolve(&self, month: MonthAnchor) -> MerchandisingEvent {
        let date = match self.day {
            DayRule::Fixed(day) => month.day(day),
            DayRule::PeakFriday => peak_friday(month),
        };

        let (applicability, market) = match self.scope {
            RuleScope::Global => (Applicability::Global, Market::Eu),
            RuleScope::Country(code) => (
                Applicability::Country {
                    country: code.to_string(),
                },
                Market::for_country(code),
            ),
            RuleScope::Countries(codes) => (
                Applicability::Countries {
                    countries: codes.iter().map(|c| c.to_string()).collect(),
                },
                Market::Eu,
            ),
        };

        MerchandisingEvent {
            id: EventId::new(applicability.clone(), self.name, date),
            name: self.name.to_string(),
            date,
            market,
            conversion_lift_percent: self.lift_percent,
            description: Some(self.description.to_string()).filter(|d| !d.is_empty()),
            applicability,
        }
    }
}

const JANUARY: &[EventRule] = &[
    EventRule::global("New Year Sale", 1, 7.0, "Post-holiday clearance"),
    EventRule::country("Boxing Day", 26, "UK", 12.0, "UK holiday sales"),
];

const FEBRUARY: &[EventRule] = &[EventRule::global("Valentine's Day", 14, 5.0, "Gift shopping")];

const MARCH: &[EventRule] = &[EventRule::global(
    "Easter prep / Spring sale",
    15,
    6.0,
    "Spring promotions",
)];

const APRIL: &[EventRule] = &[
    EventRule::global("Easter", 20, 8.0, "Holiday shopping"),
    EventRule::country("Ramadan / Eid", 15, "GCC", 18.0, "High gift-giving period"),
];

const MAY: &[EventRule] = &[
    EventRule::global("Mother's Day", 10, 5.0, "Gift demand"),
    EventRule::global("May Day / Labour Day", 1, 3.0, "EU-wide public holiday"),
];

const JUNE: &[EventRule] = &[
    EventRule::global("Summer Sales start", 21, 8.0, "Worldwide mid-year sales"),
    EventRule::global("Father's Day", 21, 4.0, "Gift demand"),
];

const JULY: &[EventRule] = &[
    EventRule::global("Summer Sale", 15, 9.0, "Mid-year promotion"),
    EventRule::country("Bastille Day", 14, "FR", 5.0, "National holiday"),
];

const AUGUST: &[EventRule] = &[
    EventRule::global("Back to School", 15, 5.0, "Seasonal demand"),
    EventRule::country("Assumption Day", 15, "IT", 3.0, "Public holiday"),
    EventRule::country("Assumption Day", 15, "ES", 3.0, "Public holiday"),
];

const SEPTEMBER: &[EventRule] = &[
    EventRule::global("Back to School (Sept)", 1, 5.0, "Peak BTS"),
    EventRule::country("Oktoberfest", 20, "DE", 8.0, "Germany – major shopping period"),
];

const OCTOBER: &[EventRule] = &[
    EventRule::country("German Unity Day", 3, "DE", 4.0, "Public holiday"),
    EventRule::global("Halloween", 31, 6.0, "Seasonal shopping"),
];

const NOVEMBER: &[EventRule] = &[
    EventRule {
        name: "Black Friday",
        day: DayRule::PeakFriday,
        lift_percent: 12.0,
        scope: RuleScope::Global,
        description: "Peak shopping",
    },
    EventRule::global("Cyber Monday", 28, 10.0, "E-commerce peak"),
    EventRule::global("Singles' Day", 11, 7.0, "Shopping festival"),
    EventRule::global("St Martin's Day", 11, 4.0, "EU & North America"),
];

const DECEMBER: &[EventRule] = &[
    EventRule::global("Christmas", 25, 12.0, "Peak holiday"),
    EventRule::global("St Nicholas Day", 6, 4.0, "EU & North America"),
    EventRule::countries(
        "Boxing Day",
        26,
        &["UK", "US", "Canada"],
        10.0,
        "UK & North America only",
    ),
    EventRule::country("UAE National Day", 2, "GCC", 10.0, "Local holiday"),
];

static RULE_TABLE: [&[EventRule]; 12] = [
    JANUARY, FEBRUARY, MARCH, APRIL, MAY, JUNE, JULY, AUGUST, SEPTEMBER, OCTOBER, NOVEMBER,
    DECEMBER,
];

/// Rules for a month of year (1 = January); empty for out-of-range input
pub fn rules_for_month(month_of_year: u32) -> &'static [EventRule] {
    month_of_year
        .checked_sub(1)
        .and_then(|i| RULE_TABLE.get(i as usize))
        .copied()
        .unwrap_or(&[])
}

/// First Friday of the month plus 21 days, capped at day 28
fn peak_friday(month: MonthAnchor) -> NaiveDate {
    let first = month.first_day();
    let days_to_friday = (Weekday::Fri.num_days_from_monday() + 7
        - first.weekday().num_days_from_monday())
        % 7;
    month.day(1 + days_to_friday + 21)
}

// ============================================================================
// CALENDAR GENERATION
// ============================================================================

/// All merchandising events in the 12 months starting at `start`
///
/// Ordered by target month, then by rule order within the month.
pub fn generate_events(start: MonthAnchor) -> Vec<MerchandisingEvent> {
    let events: Vec<MerchandisingEvent> = start
        .forecast_months()
        .into_iter()
        .flat_map(|month| {
            rules_for_month(month.month())
                .iter()
                .map(move |rule| rule.resolve(month))
        })
        .collect();

    debug!(start = %start, events = events.len(), "generated merchandising calendar");
    events
}

/// Whether an event applies to a market scope
///
/// Global events apply everywhere. Restricted events apply when the scope's
/// countries intersect the event's; unknown scopes never match them.
pub fn applies_to_market(event: &MerchandisingEvent, scope: &str) -> bool {
    if event.applicability.is_global() {
        return true;
    }

    match resolve_countries(scope) {
        Some(codes) => event
            .applicability
            .countries()
            .iter()
            .any(|c| codes.contains(c)),
        None => false,
    }
}

/// Display label: name plus country names for restricted events
///
/// Example: "Boxing Day (United Kingdom, United States, Canada)"
pub fn event_label(event: &MerchandisingEvent) -> String {
    let countries = event.applicability.countries();
    if countries.is_empty() {
        return event.name.clone();
    }

    let names: Vec<&str> = countries.into_iter().map(country_display_name).collect();
    format!("{} ({})", event.name, names.join(", "))
}

/// Group events into the 12 month buckets of the forecast window
///
/// Every month appears, in order, even when it has no events.
pub fn events_by_month<'a, I>(events: I, start: MonthAnchor) -> Vec<(MonthAnchor, Vec<&'a MerchandisingEvent>)>
where
    I: IntoIterator<Item = &'a MerchandisingEvent>,
{
    let mut buckets: Vec<(MonthAnchor, Vec<&MerchandisingEvent>)> = start
        .forecast_months()
        .into_iter()
        .map(|m| (m, Vec::new()))
        .collect();

    for event in events {
        if let Some((_, bucket)) = buckets.iter_mut().find(|(m, _)| m.contains(event.date)) {
            bucket.push(event);
        }
    }

    buckets
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn anchor(s: &str) -> MonthAnchor {
        s.parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_events(anchor("2026-03"));
        let b = generate_events(anchor("2026-03"));
        assert_eq!(a, b);
        let ids_a: Vec<String> = a.iter().map(|e| e.id.to_string()).collect();
        let ids_b: Vec<String> = b.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_full_year_covers_every_rule() {
        let events = generate_events(anchor("2026-01"));
        let expected: usize = (1..=12).map(|m| rules_for_month(m).len()).sum();
        assert_eq!(events.len(), expected);
        assert_eq!(events.len(), 27);
    }

    #[test]
    fn test_ids_are_unique() {
        let events = generate_events(anchor("2026-05"));
        let ids: HashSet<&EventId> = events.iter().map(|e| &e.id).collect();
        assert_eq!(ids.len(), events.len());
    }

    #[test]
    fn test_same_day_same_name_different_country_do_not_collide() {
        let events = generate_events(anchor("2026-08"));
        let assumption: Vec<&MerchandisingEvent> =
            events.iter().filter(|e| e.name == "Assumption Day").collect();
        assert_eq!(assumption.len(), 2);
        assert_eq!(assumption[0].date, assumption[1].date);
        assert_ne!(assumption[0].id, assumption[1].id);
    }

    #[test]
    fn test_events_ordered_by_window_then_rule() {
        let events = generate_events(anchor("2026-11"));
        let names: Vec<&str> = events.iter().take(4).map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Black Friday", "Cyber Monday", "Singles' Day", "St Martin's Day"]
        );
        // November → December → January of next year
        assert_eq!(events[4].name, "Christmas");
        assert_eq!(events[8].name, "New Year Sale");
        assert_eq!(events[8].date, date(2027, 1, 1));
    }

    #[test]
    fn test_black_friday_floats() {
        // 2026-11-01 is a Sunday → first Friday the 6th → 27th
        let e2026 = generate_events(anchor("2026-11"));
        assert_eq!(e2026[0].date, date(2026, 11, 27));
        // 2024-11-01 is a Friday → 22nd
        let e2024 = generate_events(anchor("2024-11"));
        assert_eq!(e2024[0].date, date(2024, 11, 22));
        // 2025-11-01 is a Saturday → first Friday the 7th → 28th
        let e2025 = generate_events(anchor("2025-11"));
        assert_eq!(e2025[0].date, date(2025, 11, 28));
    }

    #[test]
    fn test_halloween_capped_at_28() {
        let events = generate_events(anchor("2026-10"));
        let halloween = events.iter().find(|e| e.name == "Halloween").unwrap();
        assert_eq!(halloween.date, date(2026, 10, 28));
    }

    #[test]
    fn test_event_id_round_trips_through_string() {
        for event in generate_events(anchor("2026-01")) {
            let encoded = event.id.to_string();
            let decoded: EventId = encoded.parse().unwrap();
            assert_eq!(decoded, event.id);
        }
    }

    #[test]
    fn test_event_id_encoding_is_delimiter_safe() {
        let d = date(2026, 5, 1);
        let a = EventId::new(Applicability::Global, "a-b", d);
        let b = EventId::new(Applicability::Global, "a", d);
        assert_ne!(a.to_string(), b.to_string());
        assert_eq!(a.to_string(), r#"["global",[],"a-b","2026-05-01"]"#);
    }

    #[test]
    fn test_event_id_rejects_malformed() {
        assert!("global-New Year Sale-2026-01-01".parse::<EventId>().is_err());
        assert!(r#"["country",[],"x","2026-01-01"]"#.parse::<EventId>().is_err());
        assert!(r#"["global",[],"x","2026-02-30"]"#.parse::<EventId>().is_err());
    }

    #[test]
    fn test_event_serializes_with_flat_applicability() {
        let events = generate_events(anchor("2026-12"));
        let boxing = events
            .iter()
            .find(|e| e.name == "Boxing Day")
            .unwrap();
        let json = serde_json::to_value(boxing).unwrap();
        assert_eq!(json["mode"], "multi");
        assert_eq!(json["countries"][1], "US");
        assert_eq!(json["date"], "2026-12-26");

        let back: MerchandisingEvent = serde_json::from_value(json).unwrap();
        assert_eq!(&back, boxing);
    }

    #[test]
    fn test_applies_to_market() {
        let events = generate_events(anchor("2026-12"));
        let christmas = events.iter().find(|e| e.name == "Christmas").unwrap();
        let boxing = events.iter().find(|e| e.name == "Boxing Day").unwrap();
        let uae = events.iter().find(|e| e.name == "UAE National Day").unwrap();

        assert!(applies_to_market(christmas, "GCC"));
        assert!(applies_to_market(christmas, "nowhere"));

        assert!(applies_to_market(boxing, "EU"));
        assert!(applies_to_market(boxing, "US"));
        assert!(applies_to_market(boxing, "Canada"));
        assert!(!applies_to_market(boxing, "GCC"));

        assert!(applies_to_market(uae, "GCC"));
        assert!(!applies_to_market(uae, "EU"));
        assert!(!applies_to_market(uae, "nowhere"));
    }

    #[test]
    fn test_market_tags() {
        let events = generate_events(anchor("2026-04"));
        let eid = events.iter().find(|e| e.name == "Ramadan / Eid").unwrap();
        assert_eq!(eid.market, Market::Gcc);
        let easter = events.iter().find(|e| e.name == "Easter").unwrap();
        assert_eq!(easter.market, Market::Eu);
    }

    #[test]
    fn test_event_label() {
        let events = generate_events(anchor("2026-12"));
        let boxing = events.iter().find(|e| e.name == "Boxing Day").unwrap();
        assert_eq!(
            event_label(boxing),
            "Boxing Day (United Kingdom, United States, Canada)"
        );
        let christmas = events.iter().find(|e| e.name == "Christmas").unwrap();
        assert_eq!(event_label(christmas), "Christmas");
    }

    #[test]
    fn test_events_by_month_keeps_empty_months() {
        let start = anchor("2026-01");
        let events = generate_events(start);
        let grouped = events_by_month(&events, start);

        assert_eq!(grouped.len(), 12);
        assert_eq!(grouped[0].0, start);
        assert_eq!(grouped[0].1.len(), 2);
        assert_eq!(grouped[11].1.len(), 4);

        let none = events_by_month(std::iter::empty(), start);
        assert!(none.iter().all(|(_, bucket)| bucket.is_empty()));
    }

    #[test]
    fn test_rules_for_month_out_of_range() {
        assert!(rules_for_month(0).is_empty());
        assert!(rules_for_month(13).is_empty());
    }
}
