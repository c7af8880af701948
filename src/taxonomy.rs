// Taxonomy registry: the valid categories (each with its allowed
// subcategories) and the valid operational states.
//
// Loaded once with the dataset and treated as read-only configuration for
// the life of the process. Writes against the record store validate every
// categorical field here; the only silent substitution anywhere is the
// documented subcategory default.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDef {
    pub id: String,
    pub name: String,
    /// Allowed subcategory ids, in display order. The first one is the
    /// default when a point is created without a subcategory.
    pub subcategories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub categories: Vec<CategoryDef>,
    pub states: Vec<StateDef>,
}

impl Taxonomy {
    pub fn resolve_category(&self, id: &str) -> Option<&CategoryDef> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn is_valid_subcategory(&self, category_id: &str, sub_id: &str) -> bool {
        self.resolve_category(category_id)
            .map(|c| c.subcategories.iter().any(|s| s == sub_id))
            .unwrap_or(false)
    }

    pub fn is_valid_state(&self, id: &str) -> bool {
        self.states.iter().any(|s| s.id == id)
    }

    /// First allowed subcategory of the category, if the category exists
    /// and has any.
    pub fn default_subcategory(&self, category_id: &str) -> Option<&str> {
        self.resolve_category(category_id)
            .and_then(|c| c.subcategories.first())
            .map(|s| s.as_str())
    }

    /// The registry's "active" state: the first configured state.
    pub fn default_state(&self) -> Option<&str> {
        self.states.first().map(|s| s.id.as_str())
    }

    pub fn category_ids(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.id.clone()).collect()
    }

    pub fn state_ids(&self) -> Vec<String> {
        self.states.iter().map(|s| s.id.clone()).collect()
    }

    /// Subcategory ids allowed for a category (empty when the category is
    /// unknown), used to report valid options on a failed reference.
    pub fn subcategory_ids(&self, category_id: &str) -> Vec<String> {
        self.resolve_category(category_id)
            .map(|c| c.subcategories.clone())
            .unwrap_or_default()
    }

    /// The municipal taxonomy the system ships with.
    pub fn with_defaults() -> Self {
        Taxonomy {
            categories: vec![
                CategoryDef {
                    id: "c-1".to_string(),
                    name: "Contenedores de Basura".to_string(),
                    subcategories: vec![
                        "contenedor_soterrado".to_string(),
                        "contenedor_superficie".to_string(),
                        "tacho_publico".to_string(),
                    ],
                },
                CategoryDef {
                    id: "c-2".to_string(),
                    name: "Puntos de Reciclaje".to_string(),
                    subcategories: vec![
                        "contenedores_diferenciados".to_string(),
                        "centro_acopio".to_string(),
                    ],
                },
                CategoryDef {
                    id: "c-3".to_string(),
                    name: "Puntos Limpios".to_string(),
                    subcategories: vec![
                        "residuos_electronicos".to_string(),
                        "residuos_peligrosos".to_string(),
                    ],
                },
            ],
            states: vec![
                StateDef {
                    id: "e-1".to_string(),
                    name: "Activo".to_string(),
                },
                StateDef {
                    id: "e-2".to_string(),
                    name: "Dañado".to_string(),
                },
                StateDef {
                    id: "e-3".to_string(),
                    name: "Retirado".to_string(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_category() {
        let tax = Taxonomy::with_defaults();
        assert_eq!(
            tax.resolve_category("c-2").map(|c| c.name.as_str()),
            Some("Puntos de Reciclaje")
        );
        assert!(tax.resolve_category("c-99").is_none());
    }

    #[test]
    fn test_subcategory_validation() {
        let tax = Taxonomy::with_defaults();
        assert!(tax.is_valid_subcategory("c-2", "contenedores_diferenciados"));
        assert!(!tax.is_valid_subcategory("c-2", "tacho_publico"));
        assert!(!tax.is_valid_subcategory("c-99", "centro_acopio"));
    }

    #[test]
    fn test_state_validation() {
        let tax = Taxonomy::with_defaults();
        assert!(tax.is_valid_state("e-1"));
        assert!(tax.is_valid_state("e-3"));
        assert!(!tax.is_valid_state("activo"));
    }

    #[test]
    fn test_defaults() {
        let tax = Taxonomy::with_defaults();
        assert_eq!(
            tax.default_subcategory("c-2"),
            Some("contenedores_diferenciados")
        );
        assert_eq!(tax.default_subcategory("c-99"), None);
        assert_eq!(tax.default_state(), Some("e-1"));
    }

    #[test]
    fn test_option_listings() {
        let tax = Taxonomy::with_defaults();
        assert_eq!(tax.category_ids(), vec!["c-1", "c-2", "c-3"]);
        assert_eq!(tax.state_ids(), vec!["e-1", "e-2", "e-3"]);
        assert_eq!(
            tax.subcategory_ids("c-3"),
            vec!["residuos_electronicos", "residuos_peligrosos"]
        );
    }
}
