use crate::common::error::Result;
use crate::domain::{NewRecipe, Recipe, User};
use crate::search::RecipeFilter;
use async_trait::async_trait;

/// Storage trait for persisting recipes, users and favorites
#[async_trait]
pub trait Storage: Send + Sync {
    // Recipe operations
    async fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe>;
    async fn get_recipe(&self, recipe_id: i64) -> Result<Option<Recipe>>;
    /// Returns `None` when no recipe has this id. The author is never changed.
    async fn update_recipe(&self, recipe_id: i64, recipe: &NewRecipe) -> Result<Option<Recipe>>;
    async fn delete_recipe(&self, recipe_id: i64) -> Result<bool>;
    async fn list_recipes(&self) -> Result<Vec<Recipe>>;
    async fn search_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>>;
    async fn recipes_by_author(&self, user_id: i64) -> Result<Vec<Recipe>>;

    // User operations
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User>;
    async fn get_user(&self, user_id: i64) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    // Favorite operations
    /// Flips the favorite flag and returns the new state.
    async fn toggle_favorite(&self, user_id: i64, recipe_id: i64) -> Result<bool>;
    async fn is_favorite(&self, user_id: i64, recipe_id: i64) -> Result<bool>;
    async fn favorite_recipes(&self, user_id: i64) -> Result<Vec<Recipe>>;
}
