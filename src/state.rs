use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::store::GradingStore;

pub type SharedStore = Arc<dyn GradingStore>;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub config: Config,
}

impl FromRef<AppState> for SharedStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
