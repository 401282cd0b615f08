//! In-process [`GameStore`] used for local runs and tests.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{GameEntity, GameListItemEntity, GameStatEntity, SubstitutionEntity},
    storage::StorageResult,
};

/// Volatile store keeping every document in concurrent maps.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    games: DashMap<Uuid, GameEntity>,
    stats: DashMap<Uuid, Vec<GameStatEntity>>,
    substitutions: DashMap<Uuid, Vec<SubstitutionEntity>>,
}

impl MemoryGameStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryGameStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.games.insert(game.id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.games.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_games(
        &self,
        tournament_id: Option<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameListItemEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut games: Vec<GameListItemEntity> = inner
                .games
                .iter()
                .filter(|entry| tournament_id.is_none() || entry.tournament_id == tournament_id)
                .map(|entry| GameListItemEntity::from(entry.value()))
                .collect();
            games.sort_by_key(|game| game.created_at);
            Ok(games)
        })
    }

    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.stats.remove(&id);
            inner.substitutions.remove(&id);
            Ok(inner.games.remove(&id).is_some())
        })
    }

    fn append_stats(&self, stats: Vec<GameStatEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            for stat in stats {
                let mut log = inner.stats.entry(stat.game_id).or_default();
                match log.iter_mut().find(|existing| existing.id == stat.id) {
                    Some(existing) => *existing = stat,
                    None => log.push(stat),
                }
            }
            Ok(())
        })
    }

    fn delete_stats(
        &self,
        game_id: Uuid,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if let Some(mut log) = inner.stats.get_mut(&game_id) {
                log.retain(|stat| !ids.contains(&stat.id));
            }
            Ok(())
        })
    }

    fn list_stats(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GameStatEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .stats
                .get(&game_id)
                .map(|log| log.value().clone())
                .unwrap_or_default())
        })
    }

    fn save_substitution(
        &self,
        substitution: SubstitutionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner
                .substitutions
                .entry(substitution.game_id)
                .or_default()
                .push(substitution);
            Ok(())
        })
    }

    fn list_substitutions(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SubstitutionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .substitutions
                .get(&game_id)
                .map(|subs| subs.value().clone())
                .unwrap_or_default())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::{
        config::GameRules,
        dao::models::{GameStatus, TeamEntity},
        engine::{StatModifier, StatType},
    };

    fn team(name: &str) -> TeamEntity {
        TeamEntity {
            id: Uuid::new_v4(),
            name: name.into(),
            players: Vec::new(),
            on_court: Vec::new(),
            timeouts_used: 0,
        }
    }

    fn game(tournament_id: Option<Uuid>) -> GameEntity {
        let now = SystemTime::now();
        GameEntity {
            id: Uuid::new_v4(),
            name: "Final".into(),
            tournament_id,
            created_at: now,
            updated_at: now,
            status: GameStatus::Scheduled,
            rules: GameRules::default(),
            home: team("Home"),
            away: team("Away"),
            period: 1,
            clock_remaining_ms: 600_000,
            shot_clock_ms: Some(24_000),
            possession: None,
        }
    }

    fn stat(game: &GameEntity, stat_type: StatType, modifier: Option<StatModifier>) -> GameStatEntity {
        GameStatEntity {
            id: Uuid::new_v4(),
            game_id: game.id,
            team_id: game.home.id,
            player_id: None,
            stat_type,
            modifier,
            period: 1,
            clock_remaining_ms: 500_000,
            recorded_at: SystemTime::now(),
            sequence_id: None,
            linked_event_id: None,
        }
    }

    #[tokio::test]
    async fn lists_games_by_tournament() {
        let store = MemoryGameStore::new();
        let tournament = Uuid::new_v4();
        let inside = game(Some(tournament));
        store.save_game(inside.clone()).await.unwrap();
        store.save_game(game(None)).await.unwrap();

        assert_eq!(store.list_games(None).await.unwrap().len(), 2);
        let filtered = store.list_games(Some(tournament)).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, inside.id);
    }

    #[tokio::test]
    async fn append_upserts_and_keeps_order() {
        let store = MemoryGameStore::new();
        let game = game(None);
        let first = stat(&game, StatType::TwoPoint, Some(StatModifier::Made));
        let second = stat(&game, StatType::Assist, None);
        store
            .append_stats(vec![first.clone(), second.clone()])
            .await
            .unwrap();

        let mut edited = first.clone();
        edited.modifier = Some(StatModifier::Missed);
        store.append_stats(vec![edited]).await.unwrap();

        let log = store.list_stats(game.id).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].id, first.id);
        assert_eq!(log[0].modifier, Some(StatModifier::Missed));
        assert_eq!(log[1].id, second.id);
    }

    #[tokio::test]
    async fn delete_game_drops_children() {
        let store = MemoryGameStore::new();
        let game = game(None);
        store.save_game(game.clone()).await.unwrap();
        store
            .append_stats(vec![stat(&game, StatType::Steal, None)])
            .await
            .unwrap();

        assert!(store.delete_game(game.id).await.unwrap());
        assert!(!store.delete_game(game.id).await.unwrap());
        assert!(store.list_stats(game.id).await.unwrap().is_empty());
        assert!(store.find_game(game.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_stats_removes_only_listed_ids() {
        let store = MemoryGameStore::new();
        let game = game(None);
        let keep = stat(&game, StatType::Block, None);
        let drop = stat(&game, StatType::Turnover, None);
        store
            .append_stats(vec![keep.clone(), drop.clone()])
            .await
            .unwrap();

        store.delete_stats(game.id, vec![drop.id]).await.unwrap();

        let log = store.list_stats(game.id).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].id, keep.id);
    }
}
