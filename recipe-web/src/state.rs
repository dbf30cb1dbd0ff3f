use recipe_core::Storage;
use std::sync::Arc;

use crate::config::Config;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub sessions: SessionStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, config: Config) -> Self {
        Self {
            storage,
            sessions: SessionStore::new(config.session_ttl()),
            config: Arc::new(config),
        }
    }
}
