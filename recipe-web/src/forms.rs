//! Form payloads for recipes and accounts, and their validation rules.

use recipe_core::search::{clean_positive_int, FormErrors, REQUIRED};
use recipe_core::{NewRecipe, Recipe, NAME_MAX_LENGTH};
use serde::Deserialize;

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MIN_LENGTH: usize = 8;

pub const LOGIN_FAILED: &str = "Oops, something went wrong!";
pub const INVALID_CREDENTIALS: &str = "Invalid username or password. Please try again.";
pub const SIGNUP_FAILED: &str = "Please correct the errors below.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecipeForm {
    pub name: String,
    pub ingredients: String,
    pub cooking_time: String,
    pub instructions: String,
}

impl RecipeForm {
    pub fn from_recipe(recipe: &Recipe) -> Self {
        Self {
            name: recipe.name.clone(),
            ingredients: recipe.ingredients.clone(),
            cooking_time: recipe.cooking_time.to_string(),
            instructions: recipe.instructions.clone(),
        }
    }

    /// The author is filled in by the caller.
    pub fn validate(&self) -> Result<NewRecipe, FormErrors> {
        let mut errors = FormErrors::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", REQUIRED);
        } else if name.chars().count() > NAME_MAX_LENGTH {
            errors.add(
                "name",
                format!("Ensure this value has at most {NAME_MAX_LENGTH} characters."),
            );
        }

        let ingredients = self.ingredients.trim();
        if ingredients.is_empty() {
            errors.add("ingredients", REQUIRED);
        }

        let cooking_time = if self.cooking_time.trim().is_empty() {
            errors.add("cooking_time", REQUIRED);
            None
        } else {
            clean_positive_int(&mut errors, "cooking_time", &self.cooking_time)
        };

        let instructions = self.instructions.trim();
        if instructions.is_empty() {
            errors.add("instructions", REQUIRED);
        }

        errors.into_result(NewRecipe {
            name: name.to_string(),
            ingredients: ingredients.to_string(),
            cooking_time: cooking_time.unwrap_or_default(),
            instructions: instructions.to_string(),
            author_id: None,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
}

impl LoginForm {
    /// Both fields present, or the generic failure message.
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub username: String,
    pub password1: String,
    pub password2: String,
}

fn valid_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

impl SignupForm {
    /// Field rules only; uniqueness is checked against storage by the caller.
    pub fn validate(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::new();

        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else if username.chars().count() > USERNAME_MAX_LENGTH {
            errors.add(
                "username",
                format!("Ensure this value has at most {USERNAME_MAX_LENGTH} characters."),
            );
        } else if !username.chars().all(valid_username_char) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        } else {
            if self.password1.chars().count() < PASSWORD_MIN_LENGTH {
                errors.add(
                    "password2",
                    format!(
                        "This password is too short. It must contain at least {PASSWORD_MIN_LENGTH} characters."
                    ),
                );
            }
            if self.password1.chars().all(|c| c.is_ascii_digit()) {
                errors.add("password2", "This password is entirely numeric.");
            }
        }

        errors.into_result((username.to_string(), self.password1.clone()))
    }
}
