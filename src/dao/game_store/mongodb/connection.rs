use std::time::Duration;

use mongodb::{
    Client, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

pub(super) const GAME_COLLECTION_NAME: &str = "games";
pub(super) const STAT_COLLECTION_NAME: &str = "game_stats";
pub(super) const SUBSTITUTION_COLLECTION_NAME: &str = "substitutions";

const PING_ATTEMPTS: u32 = 10;
const FIRST_PING_DELAY: Duration = Duration::from_millis(250);
const MAX_PING_DELAY: Duration = Duration::from_secs(5);

/// Secondary index of one collection.
struct IndexSpec {
    collection: &'static str,
    name: &'static str,
    keys: Document,
}

/// Games are listed per tournament; stats and substitutions are read back per game in order.
fn index_specs() -> [IndexSpec; 3] {
    [
        IndexSpec {
            collection: GAME_COLLECTION_NAME,
            name: "game_tournament_idx",
            keys: doc! {"tournament_id": 1, "created_at": 1},
        },
        IndexSpec {
            collection: STAT_COLLECTION_NAME,
            name: "stat_game_seq_idx",
            keys: doc! {"game_id": 1, "seq": 1},
        },
        IndexSpec {
            collection: SUBSTITUTION_COLLECTION_NAME,
            name: "substitution_game_idx",
            keys: doc! {"game_id": 1, "recorded_at": 1},
        },
    ]
}

/// Open the configured database and wait until the server answers a ping.
pub(super) async fn open_database(config: &MongoConfig) -> MongoResult<Database> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    let mut delay = FIRST_PING_DELAY;
    let mut attempt = 1;
    loop {
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                debug!(database = %config.database_name, attempt, "MongoDB reachable");
                return Ok(database);
            }
            Err(source) if attempt >= PING_ATTEMPTS => {
                return Err(MongoDaoError::InitialPing {
                    attempts: attempt,
                    source,
                });
            }
            Err(err) => {
                warn!(attempt, error = %err, "MongoDB ping failed; retrying");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_PING_DELAY);
                attempt += 1;
            }
        }
    }
}

/// Create the indexes the game queries rely on. Existing indexes are left alone.
pub(super) async fn ensure_indexes(database: &Database) -> MongoResult<()> {
    for spec in index_specs() {
        let model = IndexModel::builder()
            .keys(spec.keys)
            .options(
                IndexOptions::builder()
                    .name(Some(spec.name.to_owned()))
                    .build(),
            )
            .build();
        database
            .collection::<Document>(spec.collection)
            .create_index(model)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: spec.collection,
                index: spec.name,
                source,
            })?;
    }
    Ok(())
}
