use axum::extract::FromRef;
use domain::WallEvent;
use std::sync::Arc;
use storage::Db;
use tokio::sync::broadcast;

use crate::auth::TokenKeys;
use crate::config::WallSettings;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub tx_events: broadcast::Sender<WallEvent>,
    pub tokens: Arc<TokenKeys>,
    pub wall: Arc<WallSettings>,
}

impl AppState {
    pub fn new(db: Db, tokens: TokenKeys, wall: WallSettings) -> Self {
        let (tx_events, _) = broadcast::channel(100);
        Self {
            db,
            tx_events,
            tokens: Arc::new(tokens),
            wall: Arc::new(wall),
        }
    }

    /// Fire and forget; having no live subscribers is not an error.
    pub fn publish(&self, event: WallEvent) {
        let _ = self.tx_events.send(event);
    }
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
