use std::collections::HashMap;

use axum::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::StoreError;
use crate::recipes::{
    repo::RecipeStore,
    repo_types::{NewRecipe, Recipe},
};
use crate::tokens::{repo::TokenStore, repo_types::AuthToken};
use crate::users::{
    repo::UserStore,
    repo_types::{NewUser, User},
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    tokens: HashMap<String, AuthToken>,
    recipes: Vec<Recipe>,
}

/// Process-local store used when no database is configured, and by tests.
/// Writes take one lock, so uniqueness checks and inserts are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = new.into_user(Uuid::new_v4(), OffsetDateTime::now_utc());
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::DuplicateEmail);
        }
        let stored = tables.users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        stored.email = user.email.clone();
        stored.password_hash = user.password_hash.clone();
        stored.name = user.name.clone();
        stored.is_active = user.is_active;
        stored.is_staff = user.is_staff;
        stored.is_superuser = user.is_superuser;
        Ok(stored.clone())
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError> {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn get_or_create_for_user(
        &self,
        user_id: Uuid,
        candidate_key: &str,
    ) -> Result<AuthToken, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.tokens.values().find(|t| t.user_id == user_id) {
            return Ok(existing.clone());
        }
        let token = AuthToken {
            key: candidate_key.to_string(),
            user_id,
            created: OffsetDateTime::now_utc(),
        };
        tables.tokens.insert(token.key.clone(), token.clone());
        Ok(token)
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<AuthToken>, StoreError> {
        Ok(self.tables.read().await.tokens.get(key).cloned())
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn insert_recipe(&self, new: NewRecipe) -> Result<Recipe, StoreError> {
        let new = new.checked()?;
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new.user_id) {
            return Err(StoreError::NotFound);
        }
        let recipe = new.into_recipe(Uuid::new_v4());
        tables.recipes.push(recipe.clone());
        Ok(recipe)
    }

    async fn list_recipes_for_user(&self, user_id: Uuid) -> Result<Vec<Recipe>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Recipe> = tables
            .recipes
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(rows)
    }
}
