#![allow(dead_code)]

use std::sync::Arc;

use courtside_back::{
    config::AppConfig,
    dao::game_store::{GameStore, memory::MemoryGameStore},
    dto::game::{CreateGameRequest, GameDetails},
    services::game_service,
    state::{AppState, SharedState},
};
use serde_json::{Value, json};
use uuid::Uuid;

/// State backed by a fresh in-memory store.
pub async fn memory_state() -> (SharedState, Arc<MemoryGameStore>) {
    let state = AppState::new(AppConfig::default());
    let store = Arc::new(MemoryGameStore::new());
    state
        .set_game_store(store.clone() as Arc<dyn GameStore>)
        .await;
    (state, store)
}

/// Six players per side, the first five starting.
fn team(name: &str) -> Value {
    let players: Vec<Value> = (0..6)
        .map(|i| {
            json!({
                "name": format!("{name} {i}"),
                "number": 4 + i,
                "starter": i < 5,
            })
        })
        .collect();
    json!({ "name": name, "players": players })
}

pub fn create_request(name: &str, rules: Option<Value>) -> CreateGameRequest {
    let mut body = json!({
        "name": name,
        "home": team("Hawks"),
        "away": team("Owls"),
    });
    if let Some(rules) = rules {
        body["rules"] = rules;
    }
    serde_json::from_value(body).expect("valid create request")
}

pub async fn create_game(state: &SharedState, rules: Option<Value>) -> GameDetails {
    game_service::create_game(state, create_request("Final Four", rules))
        .await
        .expect("game created")
}

/// Create and load a game, returning its details.
pub async fn loaded_game(state: &SharedState, rules: Option<Value>) -> GameDetails {
    let game = create_game(state, rules).await;
    game_service::load_game(state, game.id)
        .await
        .expect("game loaded")
}

/// Ids of the home and away starters.
pub fn starters(game: &GameDetails) -> (Vec<Uuid>, Vec<Uuid>) {
    (game.home.on_court.clone(), game.away.on_court.clone())
}
