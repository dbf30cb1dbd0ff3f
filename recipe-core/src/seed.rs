use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::common::error::Result;
use crate::domain::NewRecipe;
use crate::storage::Storage;

#[derive(Debug, Deserialize)]
struct SeedFile {
    recipes: Vec<NewRecipe>,
}

/// Sample recipes covering every difficulty.
pub fn builtin_recipes() -> Vec<NewRecipe> {
    let recipe = |name: &str, ingredients: &str, cooking_time: i64, instructions: &str| NewRecipe {
        name: name.to_string(),
        ingredients: ingredients.to_string(),
        cooking_time,
        instructions: instructions.to_string(),
        author_id: None,
    };

    vec![
        recipe(
            "Scrambled Eggs",
            "eggs, butter, salt",
            5,
            "Beat eggs, cook in butter, season with salt",
        ),
        recipe(
            "Fruit Salad",
            "apple, banana, orange, grapes",
            5,
            "Chop fruit and mix",
        ),
        recipe(
            "Boiled Potatoes",
            "potatoes, salt, water",
            20,
            "Boil potatoes until soft",
        ),
        recipe(
            "Beef Stew",
            "beef, potatoes, carrots, onions, broth",
            60,
            "Brown beef, add vegetables and broth, simmer",
        ),
        recipe(
            "Tea",
            "tea leaves, water",
            3,
            "Steep leaves in boiling water",
        ),
    ]
}

/// Reads `{"recipes": [...]}` from a JSON file.
pub fn load_seed_file<P: AsRef<Path>>(path: P) -> Result<Vec<NewRecipe>> {
    let content = fs::read_to_string(path)?;
    let file: SeedFile = serde_json::from_str(&content)?;
    Ok(file.recipes)
}

pub async fn seed_recipes(storage: &dyn Storage, recipes: &[NewRecipe]) -> Result<usize> {
    for recipe in recipes {
        storage.create_recipe(recipe).await?;
    }
    info!("Seeded {} recipes", recipes.len());
    Ok(recipes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;
    use crate::storage::InMemoryStorage;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_builtin_recipes_cover_all_difficulties() {
        let storage = InMemoryStorage::new();
        let count = seed_recipes(&storage, &builtin_recipes()).await.unwrap();
        assert_eq!(count, 5);

        let seen: HashSet<Difficulty> = storage
            .list_recipes()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|r| r.difficulty)
            .collect();
        assert_eq!(seen.len(), Difficulty::ALL.len());
    }

    #[test]
    fn test_load_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        fs::write(
            &path,
            r#"{"recipes": [{"name": "Toast", "ingredients": "bread", "cooking_time": 3, "instructions": "Toast it"}]}"#,
        )
        .unwrap();

        let recipes = load_seed_file(&path).unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].author_id, None);

        fs::write(&path, "not json").unwrap();
        assert!(load_seed_file(&path).is_err());
    }
}
