use axum::async_trait;
use uuid::Uuid;

use crate::db::{PgStore, StoreError};
use crate::recipes::repo_types::{NewRecipe, Recipe};

/// Contract for every backend:
/// - `insert_recipe` runs [`NewRecipe::checked`] first, so an out-of-range
///   price is `InvalidValue`; an unknown owner is `NotFound`.
/// - `list_recipes_for_user` orders by title (byte order), then id.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn insert_recipe(&self, new: NewRecipe) -> Result<Recipe, StoreError>;
    async fn list_recipes_for_user(&self, user_id: Uuid) -> Result<Vec<Recipe>, StoreError>;
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn insert_recipe(&self, new: NewRecipe) -> Result<Recipe, StoreError> {
        let new = new.checked()?;
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes (id, user_id, title, time_minutes, price, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, title, time_minutes, price, description
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.title)
        .bind(new.time_minutes)
        .bind(new.price)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_owned_write)?;
        Ok(recipe)
    }

    async fn list_recipes_for_user(&self, user_id: Uuid) -> Result<Vec<Recipe>, StoreError> {
        let rows = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, user_id, title, time_minutes, price, description
              FROM recipes
             WHERE user_id = $1
             ORDER BY title COLLATE "C" ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
