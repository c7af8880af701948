// History ledger: append-only log of field changes and lifecycle events.
//
// One entry per detected field difference, plus one whole-record entry for
// each creation and deletion. Entries reference their point by id only, so
// they survive the point's deletion. Nothing here ever mutates or removes
// a stored entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved field sentinel for creation/deletion entries. Double
/// underscores keep it out of the snake_case tracked-field namespace.
pub const RECORD_SENTINEL: &str = "__record__";

/// Actor recorded when the caller does not identify one.
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Creation,
    Update,
    Deletion,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Creation => "creation",
            ActionKind::Update => "update",
            ActionKind::Deletion => "deletion",
        }
    }

    pub fn parse(s: &str) -> Option<ActionKind> {
        match s {
            "creation" => Some(ActionKind::Creation),
            "update" => Some(ActionKind::Update),
            "deletion" => Some(ActionKind::Deletion),
            _ => None,
        }
    }
}

/// Immutable record of one change. `previous`/`current` hold JSON
/// snapshots: a scalar for a field change, a full point for creation and
/// deletion, null for the missing side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    /// Back-reference by id only; the point may no longer exist.
    pub point_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: ActionKind,
    /// Tracked field name, or RECORD_SENTINEL for lifecycle entries.
    pub field: String,
    pub previous: Value,
    pub current: Value,
    #[serde(default)]
    pub remarks: String,
    pub actor: String,
}

/// Everything `append` needs from the caller; id and timestamp are
/// assigned by the ledger.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub point_id: String,
    pub action: ActionKind,
    pub field: String,
    pub previous: Value,
    pub current: Value,
    pub remarks: String,
    pub actor: String,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub point_id: Option<String>,
    pub action: Option<ActionKind>,
    pub actor: Option<String>,
    /// Inclusive lower bound on the entry timestamp.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the entry timestamp.
    pub to: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    pub fn for_point(point_id: impl Into<String>) -> Self {
        HistoryFilter {
            point_id: Some(point_id.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        HistoryLedger::default()
    }

    /// Append one entry, assigning its id and timestamp. Returns a
    /// reference to the stored entry.
    pub fn append(&mut self, new: NewEntry) -> &HistoryEntry {
        let entry = HistoryEntry {
            id: format!("hc-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]),
            point_id: new.point_id,
            timestamp: Utc::now(),
            action: new.action,
            field: new.field,
            previous: new.previous,
            current: new.current,
            remarks: new.remarks,
            actor: new.actor,
        };
        self.entries.push(entry);
        self.entries.last().expect("entry just pushed")
    }

    /// Filtered view, newest first. Equal timestamps sort by insertion
    /// order with the later insertion first.
    pub fn query(&self, filter: &HistoryFilter) -> Vec<&HistoryEntry> {
        let mut matched: Vec<(usize, &HistoryEntry)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                filter
                    .point_id
                    .as_ref()
                    .map_or(true, |id| &e.point_id == id)
                    && filter.action.map_or(true, |a| e.action == a)
                    && filter.actor.as_ref().map_or(true, |a| &e.actor == a)
                    && filter.from.map_or(true, |from| e.timestamp >= from)
                    && filter.to.map_or(true, |to| e.timestamp <= to)
            })
            .collect();

        matched.sort_by(|(ia, a), (ib, b)| {
            b.timestamp.cmp(&a.timestamp).then(ib.cmp(ia))
        });
        matched.into_iter().map(|(_, e)| e).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(point_id: &str, action: ActionKind, actor: &str) -> NewEntry {
        NewEntry {
            point_id: point_id.to_string(),
            action,
            field: match action {
                ActionKind::Update => "state".to_string(),
                _ => RECORD_SENTINEL.to_string(),
            },
            previous: Value::Null,
            current: json!("e-2"),
            remarks: String::new(),
            actor: actor.to_string(),
        }
    }

    #[test]
    fn test_append_assigns_id_and_timestamp() {
        let mut ledger = HistoryLedger::new();
        let before = Utc::now();
        let stored = ledger.append(entry("pr-aaaaaaaa", ActionKind::Creation, SYSTEM_ACTOR));

        assert!(stored.id.starts_with("hc-"));
        assert_eq!(stored.id.len(), 11);
        assert!(stored.timestamp >= before);
        assert_eq!(stored.field, RECORD_SENTINEL);
    }

    #[test]
    fn test_query_newest_first_with_insertion_tiebreak() {
        let mut ledger = HistoryLedger::new();
        ledger.append(entry("pr-aaaaaaaa", ActionKind::Creation, "ana"));
        ledger.append(entry("pr-aaaaaaaa", ActionKind::Update, "ana"));
        ledger.append(entry("pr-aaaaaaaa", ActionKind::Update, "ana"));

        let all = ledger.query(&HistoryFilter::default());
        assert_eq!(all.len(), 3);
        for window in all.windows(2) {
            assert!(window[0].timestamp >= window[1].timestamp);
        }
        // Entries appended back-to-back share a timestamp often enough
        // that the tiebreak is what this really exercises: the last
        // appended entry must come first.
        assert_eq!(all[0].action, ActionKind::Update);
        assert_eq!(all[2].action, ActionKind::Creation);
    }

    #[test]
    fn test_filter_by_point_action_actor() {
        let mut ledger = HistoryLedger::new();
        ledger.append(entry("pr-aaaaaaaa", ActionKind::Creation, "ana"));
        ledger.append(entry("pr-bbbbbbbb", ActionKind::Creation, "luis"));
        ledger.append(entry("pr-aaaaaaaa", ActionKind::Update, "luis"));

        let by_point = ledger.query(&HistoryFilter::for_point("pr-aaaaaaaa"));
        assert_eq!(by_point.len(), 2);

        let by_action = ledger.query(&HistoryFilter {
            action: Some(ActionKind::Creation),
            ..Default::default()
        });
        assert_eq!(by_action.len(), 2);

        let by_actor = ledger.query(&HistoryFilter {
            actor: Some("luis".to_string()),
            ..Default::default()
        });
        assert_eq!(by_actor.len(), 2);

        let combined = ledger.query(&HistoryFilter {
            point_id: Some("pr-aaaaaaaa".to_string()),
            actor: Some("luis".to_string()),
            ..Default::default()
        });
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].action, ActionKind::Update);
    }

    #[test]
    fn test_date_range_bounds_are_inclusive() {
        let mut ledger = HistoryLedger::new();
        ledger.append(entry("pr-aaaaaaaa", ActionKind::Creation, SYSTEM_ACTOR));
        let mid = ledger.query(&HistoryFilter::default())[0].timestamp;

        let exact = ledger.query(&HistoryFilter {
            from: Some(mid),
            to: Some(mid),
            ..Default::default()
        });
        assert_eq!(exact.len(), 1);

        let before = ledger.query(&HistoryFilter {
            to: Some(mid - chrono::Duration::seconds(1)),
            ..Default::default()
        });
        assert!(before.is_empty());

        let after = ledger.query(&HistoryFilter {
            from: Some(mid + chrono::Duration::seconds(1)),
            ..Default::default()
        });
        assert!(after.is_empty());
    }

    #[test]
    fn test_action_kind_round_trip() {
        assert_eq!(ActionKind::parse("deletion"), Some(ActionKind::Deletion));
        assert_eq!(ActionKind::parse("DELETE"), None);
        assert_eq!(
            serde_json::to_string(&ActionKind::Creation).unwrap(),
            r#""creation""#
        );
    }
}
