// Change detector: computes the minimal field-level difference between two
// snapshots of the same collection point.
//
// Exactly six fields are compared, always in the same order: address,
// category, subcategory, state, remarks, coordinates. The coordinate pair
// is one unit - a latitude-only change is still a single coordinates
// difference.

use serde::Serialize;
use serde_json::{json, Value};

use crate::point::{CollectionPoint, FieldName};

/// One detected difference, with JSON snapshots of both sides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: FieldName,
    pub previous: Value,
    pub current: Value,
}

/// Compare two point snapshots over the tracked fields. Returns an empty
/// vec when nothing differs.
pub fn diff(previous: &CollectionPoint, proposed: &CollectionPoint) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    for field in FieldName::ALL {
        let differs = match field {
            FieldName::Address => previous.address != proposed.address,
            FieldName::Category => previous.category != proposed.category,
            FieldName::Subcategory => previous.subcategory != proposed.subcategory,
            FieldName::State => previous.state != proposed.state,
            FieldName::Remarks => previous.remarks != proposed.remarks,
            FieldName::Coordinates => previous.coordinates != proposed.coordinates,
        };
        if differs {
            changes.push(FieldChange {
                field,
                previous: field_value(previous, field),
                current: field_value(proposed, field),
            });
        }
    }

    changes
}

fn field_value(point: &CollectionPoint, field: FieldName) -> Value {
    match field {
        FieldName::Address => json!(point.address),
        FieldName::Category => json!(point.category),
        FieldName::Subcategory => json!(point.subcategory),
        FieldName::State => json!(point.state),
        FieldName::Remarks => json!(point.remarks),
        FieldName::Coordinates => json!(point.coordinates),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Coordinates;
    use chrono::Utc;

    fn sample() -> CollectionPoint {
        let now = Utc::now();
        CollectionPoint {
            id: "pr-0a1b2c3d".to_string(),
            address: "Av. Amazonas N34-451".to_string(),
            category: "c-1".to_string(),
            subcategory: "contenedor_soterrado".to_string(),
            state: "e-1".to_string(),
            remarks: String::new(),
            coordinates: Coordinates::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_identical_points_produce_no_changes() {
        let a = sample();
        assert!(diff(&a, &a.clone()).is_empty());
    }

    #[test]
    fn test_timestamps_are_not_tracked() {
        let a = sample();
        let mut b = a.clone();
        b.updated_at = Utc::now();
        assert!(diff(&a, &b).is_empty());
    }

    #[test]
    fn test_single_field_change() {
        let a = sample();
        let mut b = a.clone();
        b.state = "e-2".to_string();

        let changes = diff(&a, &b);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, FieldName::State);
        assert_eq!(changes[0].previous, json!("e-1"));
        assert_eq!(changes[0].current, json!("e-2"));
    }

    #[test]
    fn test_changes_keep_canonical_field_order() {
        let a = sample();
        let mut b = a.clone();
        // Mutate out of order on purpose.
        b.remarks = "repintado".to_string();
        b.address = "Calle Guayaquil 102".to_string();
        b.state = "e-3".to_string();

        let fields: Vec<FieldName> = diff(&a, &b).into_iter().map(|c| c.field).collect();
        assert_eq!(
            fields,
            vec![FieldName::Address, FieldName::State, FieldName::Remarks]
        );
    }

    #[test]
    fn test_latitude_only_is_one_coordinates_change() {
        let mut a = sample();
        a.coordinates = Coordinates::new(-0.1800, -78.4600);
        let mut b = a.clone();
        b.coordinates.latitude = Some(-0.1900);

        let changes = diff(&a, &b);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, FieldName::Coordinates);
        assert_eq!(
            changes[0].previous,
            json!({"latitude": -0.18, "longitude": -78.46})
        );
        assert_eq!(
            changes[0].current,
            json!({"latitude": -0.19, "longitude": -78.46})
        );
    }

    #[test]
    fn test_null_pair_equals_null_pair() {
        let a = sample();
        let b = a.clone();
        assert!(diff(&a, &b).is_empty());

        let mut c = a.clone();
        c.coordinates = Coordinates::new(-0.2, -78.5);
        assert_eq!(diff(&a, &c).len(), 1);
    }

    #[test]
    fn test_all_six_fields_changed() {
        let a = sample();
        let mut b = a.clone();
        b.address = "Av. 6 de Diciembre".to_string();
        b.category = "c-2".to_string();
        b.subcategory = "centro_acopio".to_string();
        b.state = "e-2".to_string();
        b.remarks = "reubicado".to_string();
        b.coordinates = Coordinates::new(-0.17, -78.48);

        let fields: Vec<FieldName> = diff(&a, &b).into_iter().map(|c| c.field).collect();
        assert_eq!(fields, FieldName::ALL.to_vec());
    }
}
