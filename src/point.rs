// Collection point records and their input shapes.
//
// A point has a stable identity (`pr-` + 8 hex chars, never changes) and
// six tracked values: address, category, subcategory, state, remarks,
// coordinates. Timestamps: created_at is set once, updated_at moves on
// every mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Nullable latitude/longitude pair. Compared structurally: a change to
/// either component counts as one coordinates change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinates {
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }
}

/// A waste-collection location record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionPoint {
    /// Stable identity - never changes once assigned.
    pub id: String,

    pub address: String,

    /// Category id, always resolvable in the taxonomy registry.
    pub category: String,

    /// Subcategory id, always one of the category's allowed subcategories.
    pub subcategory: String,

    /// State id, always resolvable in the taxonomy registry.
    pub state: String,

    #[serde(default)]
    pub remarks: String,

    #[serde(default)]
    pub coordinates: Coordinates,

    /// Set once at creation, immutable afterwards.
    pub created_at: DateTime<Utc>,

    /// Refreshed on every mutation, even when nothing else changed.
    pub updated_at: DateTime<Utc>,
}

/// Generate a point id: `pr-` + first 8 hex chars of a v4 UUID.
pub fn generate_point_id() -> String {
    format!("pr-{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}

/// The six fields the change detector tracks, in their canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Address,
    Category,
    Subcategory,
    State,
    Remarks,
    Coordinates,
}

impl FieldName {
    /// Canonical comparison order: address, category, subcategory, state,
    /// remarks, coordinates.
    pub const ALL: [FieldName; 6] = [
        FieldName::Address,
        FieldName::Category,
        FieldName::Subcategory,
        FieldName::State,
        FieldName::Remarks,
        FieldName::Coordinates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Address => "address",
            FieldName::Category => "category",
            FieldName::Subcategory => "subcategory",
            FieldName::State => "state",
            FieldName::Remarks => "remarks",
            FieldName::Coordinates => "coordinates",
        }
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a point. Address and category are required;
/// everything else falls back to taxonomy defaults or empty values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPoint {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub actor: Option<String>,
}

/// Partial update input. Fields left out of the request stay untouched;
/// for remarks and coordinates an explicit JSON `null` is a clear, which
/// is why those two are double-wrapped (outer None = not supplied, inner
/// None = supplied as null).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PointUpdate {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub remarks: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub coordinates: Option<Option<Coordinates>>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl PointUpdate {
    pub fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.category.is_none()
            && self.subcategory.is_none()
            && self.state.is_none()
            && self.remarks.is_none()
            && self.coordinates.is_none()
    }
}

/// Deserialize a field where presence matters: a key that is present
/// (even as null) becomes Some(inner), an absent key stays None via
/// `#[serde(default)]`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_format() {
        let id = generate_point_id();
        assert!(id.starts_with("pr-"));
        assert_eq!(id.len(), 11);
        assert!(id[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_coordinates_structural_equality() {
        assert_eq!(Coordinates::default(), Coordinates::default());
        assert_ne!(
            Coordinates::new(-0.18, -78.46),
            Coordinates {
                latitude: Some(-0.19),
                longitude: Some(-78.46),
            }
        );
    }

    #[test]
    fn test_update_absent_vs_null_remarks() {
        let absent: PointUpdate = serde_json::from_str(r#"{"state":"e-2"}"#).unwrap();
        assert_eq!(absent.remarks, None);

        let cleared: PointUpdate = serde_json::from_str(r#"{"remarks":null}"#).unwrap();
        assert_eq!(cleared.remarks, Some(None));

        let set: PointUpdate = serde_json::from_str(r#"{"remarks":"ok"}"#).unwrap();
        assert_eq!(set.remarks, Some(Some("ok".to_string())));
    }

    #[test]
    fn test_update_absent_vs_null_coordinates() {
        let absent: PointUpdate = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.coordinates, None);

        let cleared: PointUpdate = serde_json::from_str(r#"{"coordinates":null}"#).unwrap();
        assert_eq!(cleared.coordinates, Some(None));
    }

    #[test]
    fn test_field_name_serializes_snake_case() {
        let json = serde_json::to_string(&FieldName::Subcategory).unwrap();
        assert_eq!(json, r#""subcategory""#);
    }
}
