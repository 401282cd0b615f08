use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database,
    bson::{Bson, doc},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::{
        GAME_COLLECTION_NAME, STAT_COLLECTION_NAME, SUBSTITUTION_COLLECTION_NAME, ensure_indexes,
        open_database,
    },
    error::{MongoDaoError, MongoResult},
    models::{
        MongoGameDocument, MongoStatDocument, MongoSubstitutionDocument, bson_uuid, by_game,
        doc_id,
    },
};
use crate::dao::{
    game_store::GameStore,
    models::{GameEntity, GameListItemEntity, GameStatEntity, SubstitutionEntity},
    storage::StorageResult,
};

#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database = open_database(&self.config).await?;
        *self.database.write().await = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = open_database(&config).await?;
        ensure_indexes(&database).await?;

        Ok(Self {
            inner: Arc::new(MongoInner {
                database: RwLock::new(database),
                config,
            }),
        })
    }

    async fn games(&self) -> Collection<MongoGameDocument> {
        let database = self.inner.database.read().await;
        database.collection(GAME_COLLECTION_NAME)
    }

    async fn stats(&self) -> Collection<MongoStatDocument> {
        let database = self.inner.database.read().await;
        database.collection(STAT_COLLECTION_NAME)
    }

    async fn substitutions(&self) -> Collection<MongoSubstitutionDocument> {
        let database = self.inner.database.read().await;
        database.collection(SUBSTITUTION_COLLECTION_NAME)
    }

    async fn save_game(&self, game: GameEntity) -> MongoResult<()> {
        let id = game.id;
        let document: MongoGameDocument = game.into();
        self.games()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGame { id, source })?;
        Ok(())
    }

    async fn find_game(&self, id: Uuid) -> MongoResult<Option<GameEntity>> {
        let document = self
            .games()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn list_games(&self, tournament_id: Option<Uuid>) -> MongoResult<Vec<GameListItemEntity>> {
        let filter = match tournament_id {
            Some(id) => doc! {"tournament_id": bson_uuid(id)},
            None => doc! {},
        };
        let documents: Vec<MongoGameDocument> = self
            .games()
            .await
            .find(filter)
            .sort(doc! {"created_at": 1})
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;

        Ok(documents
            .into_iter()
            .map(|document| {
                let entity: GameEntity = document.into();
                GameListItemEntity::from(&entity)
            })
            .collect())
    }

    async fn delete_game(&self, id: Uuid) -> MongoResult<bool> {
        self.stats()
            .await
            .delete_many(by_game(id))
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?;
        self.substitutions()
            .await
            .delete_many(by_game(id))
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?;
        let result = self
            .games()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn append_stats(&self, stats: Vec<GameStatEntity>) -> MongoResult<()> {
        let Some(game_id) = stats.first().map(|stat| stat.game_id) else {
            return Ok(());
        };
        let collection = self.stats().await;
        let base = collection
            .count_documents(by_game(game_id))
            .await
            .map_err(|source| MongoDaoError::WriteStats { game_id, source })?;
        let base = i64::try_from(base).unwrap_or(i64::MAX);

        for (offset, stat) in (0_i64..).zip(stats) {
            let id = stat.id;
            let document = MongoStatDocument::new(stat, base.saturating_add(offset));
            collection
                .replace_one(doc_id(id), &document)
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::WriteStats { game_id, source })?;
        }
        Ok(())
    }

    async fn delete_stats(&self, game_id: Uuid, ids: Vec<Uuid>) -> MongoResult<()> {
        let ids: Vec<Bson> = ids.into_iter().map(|id| bson_uuid(id).into()).collect();
        self.stats()
            .await
            .delete_many(doc! {"game_id": bson_uuid(game_id), "_id": {"$in": ids}})
            .await
            .map_err(|source| MongoDaoError::WriteStats { game_id, source })?;
        Ok(())
    }

    async fn list_stats(&self, game_id: Uuid) -> MongoResult<Vec<GameStatEntity>> {
        let documents: Vec<MongoStatDocument> = self
            .stats()
            .await
            .find(by_game(game_id))
            .sort(doc! {"seq": 1})
            .await
            .map_err(|source| MongoDaoError::LoadStats { game_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadStats { game_id, source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_substitution(&self, substitution: SubstitutionEntity) -> MongoResult<()> {
        let game_id = substitution.game_id;
        let id = substitution.id;
        let document: MongoSubstitutionDocument = substitution.into();
        self.substitutions()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::WriteSubstitution { game_id, source })?;
        Ok(())
    }

    async fn list_substitutions(&self, game_id: Uuid) -> MongoResult<Vec<SubstitutionEntity>> {
        let documents: Vec<MongoSubstitutionDocument> = self
            .substitutions()
            .await
            .find(by_game(game_id))
            .sort(doc! {"recorded_at": 1})
            .await
            .map_err(|source| MongoDaoError::LoadSubstitutions { game_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadSubstitutions { game_id, source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }
}

impl GameStore for MongoGameStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn list_games(
        &self,
        tournament_id: Option<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameListItemEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games(tournament_id).await.map_err(Into::into) })
    }

    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_game(id).await.map_err(Into::into) })
    }

    fn append_stats(&self, stats: Vec<GameStatEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.append_stats(stats).await.map_err(Into::into) })
    }

    fn delete_stats(
        &self,
        game_id: Uuid,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete_stats(game_id, ids).await.map_err(Into::into) })
    }

    fn list_stats(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GameStatEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_stats(game_id).await.map_err(Into::into) })
    }

    fn save_substitution(
        &self,
        substitution: SubstitutionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .save_substitution(substitution)
                .await
                .map_err(Into::into)
        })
    }

    fn list_substitutions(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SubstitutionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_substitutions(game_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
