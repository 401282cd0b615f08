use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{GameEntity, GameListItemEntity, GameStatEntity, SubstitutionEntity},
    storage::StorageResult,
};

use super::{
    config::PostgrestConfig,
    error::{PostgrestDaoError, PostgrestResult},
    models::{
        GAME_LIST_COLUMNS, GAMES_TABLE, GameListRow, GameRow, STATS_TABLE, SUBSTITUTIONS_TABLE,
        StatRow, SubstitutionRow, eq, in_list,
    },
};

const UPSERT: &str = "resolution=merge-duplicates,return=minimal";

#[derive(Clone)]
pub struct PostgrestGameStore {
    client: Client,
    base_url: Arc<str>,
    api_key: Option<Arc<str>>,
}

impl PostgrestGameStore {
    /// Build the HTTP client and check that PostgREST answers.
    pub async fn connect(config: PostgrestConfig) -> PostgrestResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| PostgrestDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            api_key: config.api_key.map(Arc::<str>::from),
        };
        store.ping().await?;
        Ok(store)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, table);
        let builder = self.client.request(method, url);
        match self.api_key {
            Some(ref key) => builder
                .header("apikey", key.as_ref())
                .bearer_auth(key.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, path: &str, builder: RequestBuilder) -> PostgrestResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| PostgrestDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(PostgrestDaoError::RequestStatus {
                path: path.to_string(),
                status: response.status(),
            })
        }
    }

    async fn fetch<T>(&self, table: &str, query: &[(&str, String)]) -> PostgrestResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .send(table, self.request(Method::GET, table).query(query))
            .await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|source| PostgrestDaoError::DecodeResponse {
                path: table.to_string(),
                source,
            })
    }

    async fn upsert<T>(&self, table: &str, rows: &[T]) -> PostgrestResult<()>
    where
        T: Serialize,
    {
        let builder = self
            .request(Method::POST, table)
            .query(&[("on_conflict", "id")])
            .header("Prefer", UPSERT)
            .json(rows);
        self.send(table, builder).await.map(|_| ())
    }

    async fn delete(&self, table: &str, query: &[(&str, String)]) -> PostgrestResult<usize> {
        let builder = self
            .request(Method::DELETE, table)
            .query(query)
            .query(&[("select", "id")])
            .header("Prefer", "return=representation");
        let response = self.send(table, builder).await?;
        let deleted = response
            .json::<Vec<serde_json::Value>>()
            .await
            .map_err(|source| PostgrestDaoError::DecodeResponse {
                path: table.to_string(),
                source,
            })?;
        Ok(deleted.len())
    }

    async fn ping(&self) -> PostgrestResult<()> {
        let builder = self.request(Method::GET, GAMES_TABLE).query(&[
            ("select", "id".to_string()),
            ("limit", "1".to_string()),
        ]);
        self.send(GAMES_TABLE, builder).await.map(|_| ())
    }

    async fn find_game(&self, id: Uuid) -> PostgrestResult<Option<GameEntity>> {
        let rows: Vec<GameRow> = self
            .fetch(GAMES_TABLE, &[("id", eq(id)), ("limit", "1".to_string())])
            .await?;
        Ok(rows.into_iter().next().map(Into::into))
    }

    async fn list_games(&self, tournament_id: Option<Uuid>) -> PostgrestResult<Vec<GameListItemEntity>> {
        let mut query = vec![
            ("select", GAME_LIST_COLUMNS.to_string()),
            ("order", "created_at.asc".to_string()),
        ];
        if let Some(tournament_id) = tournament_id {
            query.push(("tournament_id", eq(tournament_id)));
        }
        let rows: Vec<GameListRow> = self.fetch(GAMES_TABLE, &query).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_game(&self, id: Uuid) -> PostgrestResult<bool> {
        self.delete(STATS_TABLE, &[("game_id", eq(id))]).await?;
        self.delete(SUBSTITUTIONS_TABLE, &[("game_id", eq(id))])
            .await?;
        let deleted = self.delete(GAMES_TABLE, &[("id", eq(id))]).await?;
        Ok(deleted > 0)
    }
}

impl GameStore for PostgrestGameStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let row = GameRow::from(game);
            store.upsert(GAMES_TABLE, &[row]).await.map_err(Into::into)
        })
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
        Box::pin(async move {
            if stats.is_empty() {
                return Ok(());
            }
            let rows: Vec<StatRow> = stats.into_iter().map(Into::into).collect();
            store.upsert(STATS_TABLE, &rows).await.map_err(Into::into)
        })
    }

    fn delete_stats(
        &self,
        game_id: Uuid,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(());
            }
            store
                .delete(STATS_TABLE, &[("game_id", eq(game_id)), ("id", in_list(&ids))])
                .await
                .map(|_| ())
                .map_err(Into::into)
        })
    }

    fn list_stats(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GameStatEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let rows: Vec<StatRow> = store
                .fetch(
                    STATS_TABLE,
                    &[("game_id", eq(game_id)), ("order", "seq.asc".to_string())],
                )
                .await?;
            Ok(rows.into_iter().map(Into::into).collect())
        })
    }

    fn save_substitution(
        &self,
        substitution: SubstitutionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let row = SubstitutionRow::from(substitution);
            store
                .upsert(SUBSTITUTIONS_TABLE, &[row])
                .await
                .map_err(Into::into)
        })
    }

    fn list_substitutions(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SubstitutionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let rows: Vec<SubstitutionRow> = store
                .fetch(
                    SUBSTITUTIONS_TABLE,
                    &[
                        ("game_id", eq(game_id)),
                        ("order", "recorded_at.asc".to_string()),
                    ],
                )
                .await?;
            Ok(rows.into_iter().map(Into::into).collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
