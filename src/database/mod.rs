// file: src/database/mod.rs
// description: state store module exports
// reference: internal module structure

pub mod schema;
pub mod store;

pub use schema::SchemaManager;
pub use store::StateStore;
