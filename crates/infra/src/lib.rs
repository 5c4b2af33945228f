//! Infrastructure layer: storage adapters and data import.

pub mod import;
pub mod memory;
pub mod postgres;
pub mod store;

pub use import::{ImportError, parse_ingredients_csv};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{
    CatalogStore, ImportSummary, MembershipStore, RecipeStore, SharedStore, Store, StoreError,
    StoreResult, UserStore,
};
