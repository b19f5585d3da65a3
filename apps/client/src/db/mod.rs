//! Local persistence on top of a key-value store.

pub mod error;
pub mod kv;
pub mod repository;
pub mod schema;

pub use error::DbError;
pub use kv::{KeyValueStore, SqliteKeyValueStore};
pub use repository::{
    CachedVocabulary, ContentRepository, LocalRepository, MigrationRepository,
    ProgressRepository, SharedRepository,
};
