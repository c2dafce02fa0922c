pub mod catalog;
pub mod memory;
pub mod postgres;

pub use catalog::CatalogStore;
pub use memory::InMemoryCatalog;
pub use postgres::{create_pool, PgCatalog};
