// ✅ Event Selection - Which calendar events the caller has switched on
//
// The caller owns this set and hands it to the engine on every call.
// The engine only reads it.

use crate::calendar::{EventId, MerchandisingEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventSelection {
    ids: BTreeSet<EventId>,
}

impl EventSelection {
    /// Nothing selected
    pub fn empty() -> Self {
        EventSelection::default()
    }

    /// Every event in `events` selected (the default for a fresh calendar)
    pub fn all(events: &[MerchandisingEvent]) -> Self {
        events.iter().map(|e| e.id.clone()).collect()
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.ids.contains(id)
    }

    pub fn insert(&mut self, id: EventId) -> bool {
        self.ids.insert(id)
    }

    pub fn remove(&mut self, id: &EventId) -> bool {
        self.ids.remove(id)
    }

    /// Flip one id; returns whether it is selected afterwards
    pub fn toggle(&mut self, id: &EventId) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.clone());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventId> {
        self.ids.iter()
    }

    /// Selected events from `events`, keeping calendar order
    pub fn filter<'a>(&self, events: &'a [MerchandisingEvent]) -> Vec<&'a MerchandisingEvent> {
        events.iter().filter(|e| self.contains(&e.id)).collect()
    }
}

impl FromIterator<EventId> for EventSelection {
    fn from_iter<I: IntoIterator<Item = EventId>>(iter: I) -> Self {
        EventSelection {
            ids: iter.into_iter().collect(),
        }
    }
}

impl Extend<EventId> for EventSelection {
    fn extend<I: IntoIterator<Item = EventId>>(&mut self, iter: I) {
        self.ids.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::generate_events;
    use crate::month::MonthAnchor;

    fn calendar() -> Vec<MerchandisingEvent> {
        generate_events("2026-01".parse::<MonthAnchor>().unwrap())
    }

    #[test]
    fn test_all_selects_every_event() {
        let events = calendar();
        let selection = EventSelection::all(&events);
        assert_eq!(selection.len(), events.len());
        assert_eq!(selection.filter(&events).len(), events.len());
    }

    #[test]
    fn test_toggle() {
        let events = calendar();
        let mut selection = EventSelection::empty();
        let id = &events[0].id;

        assert!(selection.toggle(id));
        assert!(selection.contains(id));
        assert!(!selection.toggle(id));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_filter_keeps_calendar_order() {
        let events = calendar();
        let selection: EventSelection = vec![events[5].id.clone(), events[1].id.clone()]
            .into_iter()
            .collect();
        let picked = selection.filter(&events);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].id, events[1].id);
        assert_eq!(picked[1].id, events[5].id);
    }

    #[test]
    fn test_selection_survives_regeneration() {
        let selection = EventSelection::all(&calendar());
        let regenerated = calendar();
        assert!(regenerated.iter().all(|e| selection.contains(&e.id)));
    }

    #[test]
    fn test_serializes_as_id_list() {
        let events = calendar();
        let selection: EventSelection = std::iter::once(events[0].id.clone()).collect();
        let json = serde_json::to_value(&selection).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
        let back: EventSelection = serde_json::from_value(json).unwrap();
        assert_eq!(back, selection);
    }
}
