use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::PgStore;
use crate::memory::MemoryStore;
use crate::recipes::repo::RecipeStore;
use crate::tokens::repo::TokenStore;
use crate::users::repo::UserStore;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub recipes: Arc<dyn RecipeStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        match config.database_url.as_deref() {
            Some(url) => {
                let store = PgStore::connect(url, config.max_connections).await?;
                Ok(Self::from_store(Arc::new(store), config))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn from_store<S>(store: Arc<S>, config: AppConfig) -> Self
    where
        S: UserStore + TokenStore + RecipeStore + 'static,
    {
        Self {
            users: store.clone(),
            tokens: store.clone(),
            recipes: store,
            config: Arc::new(config),
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_store(Arc::new(MemoryStore::new()), config)
    }
}
