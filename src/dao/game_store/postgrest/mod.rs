//! PostgREST backend: rows in `games`, `game_stats` and `substitutions` tables
//! reached over HTTP.

mod config;
mod error;
mod models;
mod store;

pub use config::PostgrestConfig;
pub use error::PostgrestDaoError;
pub use store::PostgrestGameStore;

use crate::dao::storage::StorageError;

impl From<PostgrestDaoError> for StorageError {
    fn from(err: PostgrestDaoError) -> Self {
        StorageError::unavailable("postgrest", err)
    }
}
