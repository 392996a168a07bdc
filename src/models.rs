// =============================================================================
// models.rs — WHAT COMES BACK, AND WHAT GOES OUT
// =============================================================================
//
// EONET decides what an event looks like. We don't argue: every event is kept
// as the raw JSON value the API sent, and only the envelope around it
// ({"events": [...]}) is something we look at.
//
// The output is a plain object of category -> list of events. Keys keep the
// order in which categories were first seen so the file reads in the same
// order as the configured list.
// =============================================================================

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// One hazard occurrence, exactly as EONET reported it.
pub type EventRecord = Value;

/// Category -> events, insertion ordered, one entry per distinct category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultMap {
    entries: Vec<(String, Vec<EventRecord>)>,
}

impl ResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `events` under `category`. A repeated category replaces the
    /// earlier value but keeps its original position.
    pub fn insert(&mut self, category: &str, events: Vec<EventRecord>) {
        match self.entries.iter_mut().find(|(key, _)| key == category) {
            Some((_, existing)) => *existing = events,
            None => self.entries.push((category.to_string(), events)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, category: &str) -> Option<&[EventRecord]> {
        self.entries
            .iter()
            .find(|(key, _)| key == category)
            .map(|(_, events)| events.as_slice())
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Events across every category.
    pub fn total_events(&self) -> usize {
        self.entries.iter().map(|(_, events)| events.len()).sum()
    }
}

impl Serialize for ResultMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (category, events) in &self.entries {
            map.serialize_entry(category, events)?;
        }
        map.end()
    }
}
