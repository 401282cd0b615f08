pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;
#[cfg(feature = "postgrest-store")]
pub mod postgrest;

use crate::dao::models::{GameEntity, GameListItemEntity, GameStatEntity, SubstitutionEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for games, stat events and substitutions.
pub trait GameStore: Send + Sync {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// List games, optionally restricted to one tournament.
    fn list_games(
        &self,
        tournament_id: Option<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameListItemEntity>>>;
    /// Delete a game with its stats and substitutions. Returns whether it existed.
    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    fn append_stats(&self, stats: Vec<GameStatEntity>) -> BoxFuture<'static, StorageResult<()>>;
    fn delete_stats(&self, game_id: Uuid, ids: Vec<Uuid>)
    -> BoxFuture<'static, StorageResult<()>>;
    /// Stat events of a game, in recording order.
    fn list_stats(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GameStatEntity>>>;
    fn save_substitution(
        &self,
        substitution: SubstitutionEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn list_substitutions(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SubstitutionEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
