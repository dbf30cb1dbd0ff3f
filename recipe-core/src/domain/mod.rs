use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::error::CatalogError;

pub const NAME_MAX_LENGTH: usize = 120;
pub const DIFFICULTY_MAX_LENGTH: usize = 20;
/// Largest accepted cooking time, the range of a 32-bit positive integer column.
pub const MAX_COOKING_TIME: i64 = i32::MAX as i64;
pub const INGREDIENTS_HELP_TEXT: &str = "Enter each ingredient, separated by a comma";
pub const COOKING_TIME_HELP_TEXT: &str = "In minutes";

/// Difficulty label derived from cooking time and ingredient count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Intermediate,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Intermediate,
        Difficulty::Hard,
    ];

    /// Quick dishes are Easy or Medium, slow ones Intermediate or Hard; four
    /// or more ingredients moves a dish to the harder of the pair.
    pub fn classify(cooking_time: i64, ingredient_count: usize) -> Self {
        match (cooking_time < 10, ingredient_count < 4) {
            (true, true) => Difficulty::Easy,
            (true, false) => Difficulty::Medium,
            (false, true) => Difficulty::Intermediate,
            (false, false) => Difficulty::Hard,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .iter()
            .copied()
            .find(|d| d.label() == s)
            .ok_or_else(|| CatalogError::Validation(format!("unknown difficulty '{s}'")))
    }
}

/// Number of comma-separated segments, empty segments included.
pub fn ingredient_count(ingredients: &str) -> usize {
    ingredients.split(',').count()
}

/// Trimmed, non-empty ingredient names for display.
pub fn ingredient_list(ingredients: &str) -> Vec<String> {
    ingredients
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub ingredients: String,
    pub cooking_time: i64,
    pub difficulty: Option<Difficulty>,
    pub instructions: String,
    pub author_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    pub fn ingredient_count(&self) -> usize {
        ingredient_count(&self.ingredients)
    }

    pub fn ingredient_list(&self) -> Vec<String> {
        ingredient_list(&self.ingredients)
    }

    pub fn difficulty_label(&self) -> &'static str {
        self.difficulty.as_ref().map_or("", Difficulty::label)
    }

    /// Seed recipes have no author and stay editable by any signed-in user.
    pub fn can_edit(&self, user_id: i64) -> bool {
        self.author_id.map_or(true, |author| author == user_id)
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Recipe: {}", self.name)
    }
}

/// Writable recipe fields, as accepted by create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub ingredients: String,
    pub cooking_time: i64,
    pub instructions: String,
    #[serde(default)]
    pub author_id: Option<i64>,
}

impl NewRecipe {
    /// Difficulty to store on save. `None` means the recipe has too little
    /// information to classify and the previous value is kept.
    pub fn derive_difficulty(&self) -> Option<Difficulty> {
        if self.ingredients.is_empty() || self.cooking_time == 0 {
            return None;
        }
        Some(Difficulty::classify(
            self.cooking_time,
            ingredient_count(&self.ingredients),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
