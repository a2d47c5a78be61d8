use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::gateway::meal_analysis::NutritionalInfo;
use crate::gateway::plan_generation::{PersonalizedPlan, UserMetrics};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealHistoryItem {
    pub id: String,
    /// Milliseconds since epoch, non-decreasing in insertion order.
    pub timestamp: u64,
    /// The submitted photo re-encoded as a `data:` URI.
    pub image_data_url: String,
    pub nutritional_info: NutritionalInfo,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanHistoryItem {
    pub id: String,
    pub timestamp: u64,
    pub metrics: UserMetrics,
    pub goal: String,
    pub plan: PersonalizedPlan,
}

/// Tagged union over the two kinds of completed work, so storage and
/// serialization stay uniform.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HistoryEntry {
    Meal(MealHistoryItem),
    Plan(PlanHistoryItem),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct HistoryData {
    pub meals: VecDeque<MealHistoryItem>,
    pub plans: VecDeque<PlanHistoryItem>,
}

#[derive(Debug, Default)]
struct StampState {
    last_ms: u64,
    counter: u64,
}

/// In-memory, append-only log of past analyses and plans, newest-first.
///
/// Volatile by design: it stands in for a real database and is created once
/// at startup by the composition root. A persistent replacement keeps the
/// same `append`/`list`/`clear` surface and maps its own I/O failures to a
/// storage error kind instead of dropping entries.
///
/// The mutex exists because `clear` racing `append`/`list` is the one
/// consistency hazard here once the store is shared across request handlers.
#[derive(Debug, Default)]
pub struct HistoryStore {
    data: Mutex<HistoryData>,
    stamp: Mutex<StampState>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh unique id and a monotonically non-decreasing
    /// millisecond timestamp for a new entry.
    pub fn stamp(&self, prefix: &str) -> (String, u64) {
        let mut state = self.stamp.lock().unwrap_or_else(PoisonError::into_inner);
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        // Clamp against the last issued stamp so entries never go backwards
        // even if the wall clock does.
        state.last_ms = state.last_ms.max(now_ms);
        state.counter += 1;
        (
            format!("{}-{}-{}", prefix, state.last_ms, state.counter),
            state.last_ms,
        )
    }

    /// O(1) prepend into the sequence matching the entry kind.
    /// Infallible: pure in-memory manipulation.
    pub fn append(&self, entry: HistoryEntry) {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        match entry {
            HistoryEntry::Meal(item) => data.meals.push_front(item),
            HistoryEntry::Plan(item) => data.plans.push_front(item),
        }
    }

    /// Returns a deep-copy snapshot of both sequences. Mutating the returned
    /// value has no effect on the store.
    pub fn list(&self) -> HistoryData {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Empties both sequences atomically: no `list` caller ever observes a
    /// partially-cleared state.
    pub fn clear(&self) {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        *data = HistoryData::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::meal_analysis::MacroNutrients;

    fn sample_info(summary: &str) -> NutritionalInfo {
        NutritionalInfo {
            food_items: vec!["Apple".to_string()],
            macros: MacroNutrients {
                calories: 95.0,
                protein: 0.5,
                carbohydrates: 25.0,
                fat: 0.3,
            },
            vitamins: vec![],
            minerals: vec![],
            summary: summary.to_string(),
        }
    }

    fn meal_entry(store: &HistoryStore, summary: &str) -> MealHistoryItem {
        let (id, timestamp) = store.stamp("meal");
        MealHistoryItem {
            id,
            timestamp,
            image_data_url: "data:image/jpeg;base64,AAAA".to_string(),
            nutritional_info: sample_info(summary),
        }
    }

    #[test]
    fn test_append_orders_newest_first() {
        let store = HistoryStore::new();
        store.append(HistoryEntry::Meal(meal_entry(&store, "A")));
        store.append(HistoryEntry::Meal(meal_entry(&store, "B")));
        store.append(HistoryEntry::Meal(meal_entry(&store, "C")));

        let history = store.list();
        let summaries: Vec<&str> = history
            .meals
            .iter()
            .map(|m| m.nutritional_info.summary.as_str())
            .collect();
        assert_eq!(summaries, vec!["C", "B", "A"]);
        assert!(history.plans.is_empty());
    }

    #[test]
    fn test_clear_then_list_is_empty() {
        let store = HistoryStore::new();
        store.append(HistoryEntry::Meal(meal_entry(&store, "A")));
        store.append(HistoryEntry::Meal(meal_entry(&store, "B")));

        store.clear();
        let history = store.list();
        assert!(history.meals.is_empty());
        assert!(history.plans.is_empty());
    }

    #[test]
    fn test_list_returns_isolated_snapshot() {
        let store = HistoryStore::new();
        store.append(HistoryEntry::Meal(meal_entry(&store, "A")));

        let mut snapshot = store.list();
        snapshot.meals.clear();
        snapshot.meals.push_front(meal_entry(&store, "tampered"));

        // The store is unaffected by whatever the caller did to the copy.
        let fresh = store.list();
        assert_eq!(fresh.meals.len(), 1);
        assert_eq!(fresh.meals[0].nutritional_info.summary, "A");
    }

    #[test]
    fn test_stamps_are_unique_and_non_decreasing() {
        let store = HistoryStore::new();
        let mut previous_ts = 0;
        let mut ids = std::collections::HashSet::new();
        for _ in 0..100 {
            let (id, ts) = store.stamp("meal");
            assert!(ts >= previous_ts);
            assert!(ids.insert(id), "duplicate id issued");
            previous_ts = ts;
        }
    }

    #[test]
    fn test_entry_kind_tag_serialization() {
        let store = HistoryStore::new();
        let entry = HistoryEntry::Meal(meal_entry(&store, "A"));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["kind"], "meal");
        assert_eq!(value["nutritionalInfo"]["summary"], "A");
        assert!(value["imageDataUrl"].is_string());
    }
}
