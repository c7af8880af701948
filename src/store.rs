// Record store: owns the live collection-point set and drives every
// mutation through the same pipeline - validate against the taxonomy,
// mutate in memory, derive history entries, commit the whole dataset.
//
// A mutation is one logical transaction. The pre-mutation dataset is
// snapshotted first; if the commit fails the snapshot is restored, so the
// in-memory state never drifts from the durable document.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::diff::{diff, FieldChange};
use crate::error::{Result, StoreError};
use crate::history::{
    ActionKind, HistoryEntry, HistoryFilter, HistoryLedger, NewEntry, RECORD_SENTINEL,
    SYSTEM_ACTOR,
};
use crate::persistence::PersistenceGateway;
use crate::point::{generate_point_id, CollectionPoint, NewPoint, PointUpdate};
use crate::taxonomy::Taxonomy;

/// The aggregate root: everything the gateway persists as one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub points: Vec<CollectionPoint>,
    pub history: HistoryLedger,
    pub taxonomy: Taxonomy,
}

impl Dataset {
    pub fn with_default_taxonomy() -> Self {
        Dataset {
            points: Vec::new(),
            history: HistoryLedger::new(),
            taxonomy: Taxonomy::with_defaults(),
        }
    }
}

/// Exact-match filters for `list`, applied as a conjunction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PointFilter {
    pub category: Option<String>,
    pub state: Option<String>,
    pub subcategory: Option<String>,
}

/// Live-set counts, grouped by each categorical field. Computed fresh on
/// every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_state: BTreeMap<String, usize>,
    pub by_subcategory: BTreeMap<String, usize>,
}

/// Result of `update`: the new point plus the differences that were
/// actually applied, in canonical field order.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub point: CollectionPoint,
    pub changes: Vec<FieldChange>,
}

pub struct RecordStore {
    dataset: Dataset,
    gateway: Box<dyn PersistenceGateway + Send>,
}

impl RecordStore {
    pub fn new(dataset: Dataset, gateway: Box<dyn PersistenceGateway + Send>) -> Self {
        RecordStore { dataset, gateway }
    }

    /// Load the dataset through the gateway and wrap it in a store.
    pub fn open(gateway: Box<dyn PersistenceGateway + Send>) -> Result<Self> {
        let dataset = gateway.load()?;
        Ok(RecordStore { dataset, gateway })
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.dataset.taxonomy
    }

    pub fn list(&self, filter: &PointFilter) -> Vec<&CollectionPoint> {
        self.dataset
            .points
            .iter()
            .filter(|p| {
                filter.category.as_ref().map_or(true, |c| &p.category == c)
                    && filter.state.as_ref().map_or(true, |s| &p.state == s)
                    && filter
                        .subcategory
                        .as_ref()
                        .map_or(true, |s| &p.subcategory == s)
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&CollectionPoint> {
        self.dataset.points.iter().find(|p| p.id == id)
    }

    pub fn history(&self, filter: &HistoryFilter) -> Vec<&HistoryEntry> {
        self.dataset.history.query(filter)
    }

    pub fn create(&mut self, input: NewPoint) -> Result<CollectionPoint> {
        if input.address.trim().is_empty() {
            return Err(StoreError::validation("address is required"));
        }
        if input.category.trim().is_empty() {
            return Err(StoreError::validation("category is required"));
        }

        let taxonomy = &self.dataset.taxonomy;
        if taxonomy.resolve_category(&input.category).is_none() {
            return Err(StoreError::invalid_reference(
                "category",
                &input.category,
                taxonomy.category_ids(),
            ));
        }

        let subcategory = match input.subcategory {
            Some(sub) => {
                if !taxonomy.is_valid_subcategory(&input.category, &sub) {
                    return Err(StoreError::invalid_reference(
                        "subcategory",
                        &sub,
                        taxonomy.subcategory_ids(&input.category),
                    ));
                }
                sub
            }
            None => taxonomy
                .default_subcategory(&input.category)
                .ok_or_else(|| {
                    StoreError::validation(format!(
                        "category '{}' has no subcategories",
                        input.category
                    ))
                })?
                .to_string(),
        };

        let state = match input.state {
            Some(state) => {
                if !taxonomy.is_valid_state(&state) {
                    return Err(StoreError::invalid_reference(
                        "state",
                        &state,
                        taxonomy.state_ids(),
                    ));
                }
                state
            }
            None => taxonomy
                .default_state()
                .ok_or_else(|| StoreError::validation("no states configured"))?
                .to_string(),
        };

        let now = Utc::now();
        let point = CollectionPoint {
            id: generate_point_id(),
            address: input.address,
            category: input.category,
            subcategory,
            state,
            remarks: input.remarks.unwrap_or_default(),
            coordinates: input.coordinates.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        let actor = input.actor.unwrap_or_else(|| SYSTEM_ACTOR.to_string());

        let snapshot = self.dataset.clone();
        self.dataset.points.push(point.clone());
        self.dataset.history.append(NewEntry {
            point_id: point.id.clone(),
            action: ActionKind::Creation,
            field: RECORD_SENTINEL.to_string(),
            previous: Value::Null,
            current: json!(point),
            remarks: String::new(),
            actor,
        });
        self.commit_or_restore(snapshot)?;

        Ok(point)
    }

    pub fn update(&mut self, id: &str, patch: PointUpdate) -> Result<UpdateOutcome> {
        let index = self
            .dataset
            .points
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found(id))?;

        let previous = self.dataset.points[index].clone();
        let proposed = self.apply_patch(&previous, &patch)?;

        let changes = diff(&previous, &proposed);
        let actor = patch
            .actor
            .clone()
            .unwrap_or_else(|| SYSTEM_ACTOR.to_string());
        let caller_remark = patch.remarks.clone().flatten();

        let snapshot = self.dataset.clone();
        self.dataset.points[index] = proposed.clone();
        for change in &changes {
            let remarks = caller_remark
                .clone()
                .unwrap_or_else(|| format!("updated field '{}'", change.field));
            self.dataset.history.append(NewEntry {
                point_id: proposed.id.clone(),
                action: ActionKind::Update,
                field: change.field.as_str().to_string(),
                previous: change.previous.clone(),
                current: change.current.clone(),
                remarks,
                actor: actor.clone(),
            });
        }
        self.commit_or_restore(snapshot)?;

        Ok(UpdateOutcome {
            point: proposed,
            changes,
        })
    }

    pub fn delete(&mut self, id: &str, actor: Option<String>) -> Result<CollectionPoint> {
        let index = self
            .dataset
            .points
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found(id))?;

        let point = self.dataset.points[index].clone();
        let actor = actor.unwrap_or_else(|| SYSTEM_ACTOR.to_string());

        let snapshot = self.dataset.clone();
        self.dataset.history.append(NewEntry {
            point_id: point.id.clone(),
            action: ActionKind::Deletion,
            field: RECORD_SENTINEL.to_string(),
            previous: json!(point),
            current: Value::Null,
            remarks: String::new(),
            actor,
        });
        self.dataset.points.remove(index);
        self.commit_or_restore(snapshot)?;

        Ok(point)
    }

    pub fn statistics(&self) -> Statistics {
        let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_state: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_subcategory: BTreeMap<String, usize> = BTreeMap::new();

        for point in &self.dataset.points {
            *by_category.entry(point.category.clone()).or_insert(0) += 1;
            *by_state.entry(point.state.clone()).or_insert(0) += 1;
            *by_subcategory.entry(point.subcategory.clone()).or_insert(0) += 1;
        }

        Statistics {
            total: self.dataset.points.len(),
            by_category,
            by_state,
            by_subcategory,
        }
    }

    /// Build the post-update snapshot. Only supplied fields change; the
    /// last-updated timestamp always moves.
    fn apply_patch(&self, previous: &CollectionPoint, patch: &PointUpdate) -> Result<CollectionPoint> {
        let taxonomy = &self.dataset.taxonomy;
        let mut proposed = previous.clone();

        if let Some(address) = &patch.address {
            if address.trim().is_empty() {
                return Err(StoreError::validation("address cannot be empty"));
            }
            proposed.address = address.clone();
        }

        if let Some(category) = &patch.category {
            if taxonomy.resolve_category(category).is_none() {
                return Err(StoreError::invalid_reference(
                    "category",
                    category,
                    taxonomy.category_ids(),
                ));
            }
            proposed.category = category.clone();
        }

        match &patch.subcategory {
            Some(sub) => {
                if !taxonomy.is_valid_subcategory(&proposed.category, sub) {
                    return Err(StoreError::invalid_reference(
                        "subcategory",
                        sub,
                        taxonomy.subcategory_ids(&proposed.category),
                    ));
                }
                proposed.subcategory = sub.clone();
            }
            None => {
                // A category change can orphan the old subcategory; fall
                // back to the new category's default to keep the pair valid.
                if !taxonomy.is_valid_subcategory(&proposed.category, &proposed.subcategory) {
                    proposed.subcategory = taxonomy
                        .default_subcategory(&proposed.category)
                        .ok_or_else(|| {
                            StoreError::validation(format!(
                                "category '{}' has no subcategories",
                                proposed.category
                            ))
                        })?
                        .to_string();
                }
            }
        }

        if let Some(state) = &patch.state {
            if !taxonomy.is_valid_state(state) {
                return Err(StoreError::invalid_reference(
                    "state",
                    state,
                    taxonomy.state_ids(),
                ));
            }
            proposed.state = state.clone();
        }

        if let Some(remarks) = &patch.remarks {
            proposed.remarks = remarks.clone().unwrap_or_default();
        }

        if let Some(coordinates) = &patch.coordinates {
            proposed.coordinates = coordinates.clone().unwrap_or_default();
        }

        proposed.updated_at = Utc::now();
        Ok(proposed)
    }

    /// Commit the dataset; on failure restore the pre-mutation snapshot so
    /// memory and disk stay in step.
    fn commit_or_restore(&mut self, snapshot: Dataset) -> Result<()> {
        match self.gateway.commit(&self.dataset) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.dataset = snapshot;
                Err(err)
            }
        }
    }
}
