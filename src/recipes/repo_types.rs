use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::StoreError;

/// Recipe owned by a user.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal, // NUMERIC(5, 2)
    pub description: String,
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub user_id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub description: String,
}

impl NewRecipe {
    /// Exclusive bound of a `NUMERIC(5, 2)` column.
    pub const PRICE_LIMIT: Decimal = Decimal::ONE_THOUSAND;

    /// Rounds the price to 2 places and rejects values the column cannot hold.
    /// Every store runs this before writing.
    pub fn checked(mut self) -> Result<Self, StoreError> {
        self.price = self.price.round_dp(2);
        if self.price.abs() >= Self::PRICE_LIMIT {
            return Err(StoreError::InvalidValue(format!(
                "price must be below {}",
                Self::PRICE_LIMIT
            )));
        }
        Ok(self)
    }

    pub fn into_recipe(self, id: Uuid) -> Recipe {
        Recipe {
            id,
            user_id: self.user_id,
            title: self.title,
            time_minutes: self.time_minutes,
            price: self.price,
            description: self.description,
        }
    }
}
