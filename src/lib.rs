// Punto Registro - Core Library
// Change-tracked store for municipal waste-collection points.
// Exposes all modules for use in the CLI, API server, and tests.

pub mod diff;
pub mod error;
pub mod history;
pub mod persistence;
pub mod point;
pub mod store;
pub mod taxonomy;

// Re-export commonly used types
pub use diff::{diff, FieldChange};
pub use error::StoreError;
pub use history::{
    ActionKind, HistoryEntry, HistoryFilter, HistoryLedger, NewEntry, RECORD_SENTINEL,
    SYSTEM_ACTOR,
};
pub use persistence::{JsonFileGateway, MemoryGateway, PersistenceGateway};
pub use point::{CollectionPoint, Coordinates, FieldName, NewPoint, PointUpdate};
pub use store::{Dataset, PointFilter, RecordStore, Statistics, UpdateOutcome};
pub use taxonomy::{CategoryDef, StateDef, Taxonomy};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
