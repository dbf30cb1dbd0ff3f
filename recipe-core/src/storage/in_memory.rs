use super::traits::Storage;
use crate::common::error::{CatalogError, Result};
use crate::domain::{NewRecipe, Recipe, User};
use crate::search::RecipeFilter;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Default)]
struct Tables {
    next_recipe_id: i64,
    next_user_id: i64,
    recipes: BTreeMap<i64, Recipe>,
    users: BTreeMap<i64, User>,
    favorites: BTreeSet<(i64, i64)>,
}

/// In-memory storage implementation for development/testing
#[derive(Default)]
pub struct InMemoryStorage {
    tables: Mutex<Tables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| CatalogError::Database {
            message: "in-memory tables lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let mut tables = self.tables()?;
        tables.next_recipe_id += 1;
        let id = tables.next_recipe_id;

        let created = Recipe {
            id,
            name: recipe.name.clone(),
            ingredients: recipe.ingredients.clone(),
            cooking_time: recipe.cooking_time,
            difficulty: recipe.derive_difficulty(),
            instructions: recipe.instructions.clone(),
            author_id: recipe.author_id,
            created_at: Utc::now(),
        };
        tables.recipes.insert(id, created.clone());

        debug!("Created recipe: {} with id {}", created.name, id);
        Ok(created)
    }

    async fn get_recipe(&self, recipe_id: i64) -> Result<Option<Recipe>> {
        Ok(self.tables()?.recipes.get(&recipe_id).cloned())
    }

    async fn update_recipe(&self, recipe_id: i64, recipe: &NewRecipe) -> Result<Option<Recipe>> {
        let mut tables = self.tables()?;
        let Some(stored) = tables.recipes.get_mut(&recipe_id) else {
            return Ok(None);
        };

        stored.name = recipe.name.clone();
        stored.ingredients = recipe.ingredients.clone();
        stored.cooking_time = recipe.cooking_time;
        stored.instructions = recipe.instructions.clone();
        if let Some(difficulty) = recipe.derive_difficulty() {
            stored.difficulty = Some(difficulty);
        }

        debug!("Updated recipe: {} with id {}", stored.name, recipe_id);
        Ok(Some(stored.clone()))
    }

    async fn delete_recipe(&self, recipe_id: i64) -> Result<bool> {
        let mut tables = self.tables()?;
        tables.favorites.retain(|(_, r)| *r != recipe_id);
        Ok(tables.recipes.remove(&recipe_id).is_some())
    }

    async fn list_recipes(&self) -> Result<Vec<Recipe>> {
        Ok(self.tables()?.recipes.values().cloned().collect())
    }

    async fn search_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        Ok(self
            .tables()?
            .recipes
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn recipes_by_author(&self, user_id: i64) -> Result<Vec<Recipe>> {
        Ok(self
            .tables()?
            .recipes
            .values()
            .filter(|r| r.author_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let mut tables = self.tables()?;
        if tables
            .users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(username))
        {
            return Err(CatalogError::Conflict(format!("username '{username}' is taken")));
        }

        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());

        debug!("Created user: {} with id {}", user.username, user.id);
        Ok(user)
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.tables()?.users.get(&user_id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn toggle_favorite(&self, user_id: i64, recipe_id: i64) -> Result<bool> {
        let mut tables = self.tables()?;
        if !tables.recipes.contains_key(&recipe_id) {
            return Err(CatalogError::NotFound(format!("recipe {recipe_id}")));
        }

        let key = (user_id, recipe_id);
        if tables.favorites.remove(&key) {
            Ok(false)
        } else {
            tables.favorites.insert(key);
            Ok(true)
        }
    }

    async fn is_favorite(&self, user_id: i64, recipe_id: i64) -> Result<bool> {
        Ok(self.tables()?.favorites.contains(&(user_id, recipe_id)))
    }

    async fn favorite_recipes(&self, user_id: i64) -> Result<Vec<Recipe>> {
        let tables = self.tables()?;
        let mut recipes: Vec<Recipe> = tables
            .favorites
            .iter()
            .filter(|(u, _)| *u == user_id)
            .filter_map(|(_, r)| tables.recipes.get(r).cloned())
            .collect();
        recipes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(recipes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;

    fn new_recipe(name: &str, ingredients: &str, cooking_time: i64) -> NewRecipe {
        NewRecipe {
            name: name.to_string(),
            ingredients: ingredients.to_string(),
            cooking_time,
            instructions: "Mix".to_string(),
            author_id: None,
        }
    }

    #[tokio::test]
    async fn test_in_memory_matches_filter_semantics() {
        let storage = InMemoryStorage::new();
        storage.create_recipe(&new_recipe("Scrambled Eggs", "eggs, butter, salt", 5)).await.unwrap();
        storage.create_recipe(&new_recipe("Boiled Potatoes", "potatoes, salt, water", 20)).await.unwrap();

        let filter = RecipeFilter {
            difficulty: Some(Difficulty::Intermediate),
            ..Default::default()
        };
        let found = storage.search_recipes(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Boiled Potatoes");

        let ids: Vec<i64> = storage.list_recipes().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_in_memory_favorites_follow_deletes() {
        let storage = InMemoryStorage::new();
        let user = storage.create_user("cook", "hash").await.unwrap();
        let recipe = storage.create_recipe(&new_recipe("Toast", "bread", 3)).await.unwrap();

        assert!(storage.toggle_favorite(user.id, recipe.id).await.unwrap());
        assert!(storage.delete_recipe(recipe.id).await.unwrap());
        assert!(!storage.is_favorite(user.id, recipe.id).await.unwrap());
        assert!(storage.create_user("Cook", "x").await.is_err());
    }
}
