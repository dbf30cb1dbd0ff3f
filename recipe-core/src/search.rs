//! Search form validation and the filter it produces.
//!
//! A submitted [`SearchForm`] is validated into a [`SearchQuery`]; each
//! populated field becomes one conjunctive predicate in [`RecipeFilter`].
//! Storage backends translate the filter into their native operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{Difficulty, Recipe, MAX_COOKING_TIME, NAME_MAX_LENGTH};

/// Chart requested alongside the result table. Codes match the form values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChartType {
    #[default]
    None,
    Bar,
    Pie,
    Line,
}

impl ChartType {
    pub const ALL: [ChartType; 4] = [ChartType::None, ChartType::Bar, ChartType::Pie, ChartType::Line];

    pub fn code(&self) -> &'static str {
        match self {
            ChartType::None => "#1",
            ChartType::Bar => "#2",
            ChartType::Pie => "#3",
            ChartType::Line => "#4",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChartType::None => "None",
            ChartType::Bar => "Bar chart",
            ChartType::Pie => "Pie chart",
            ChartType::Line => "Line chart",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }
}

/// Conjunctive predicates over stored recipes. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeFilter {
    pub name_contains: Option<String>,
    pub ingredient_contains: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub max_cooking_time: Option<i64>,
}

impl RecipeFilter {
    pub fn is_empty(&self) -> bool {
        self.name_contains.is_none()
            && self.ingredient_contains.is_none()
            && self.difficulty.is_none()
            && self.max_cooking_time.is_none()
    }

    pub fn matches(&self, recipe: &Recipe) -> bool {
        let contains = |haystack: &str, needle: &Option<String>| {
            needle
                .as_ref()
                .map_or(true, |n| fold_case(haystack).contains(&fold_case(n)))
        };

        contains(&recipe.name, &self.name_contains)
            && contains(&recipe.ingredients, &self.ingredient_contains)
            && self.difficulty.map_or(true, |d| recipe.difficulty == Some(d))
            && self
                .max_cooking_time
                .map_or(true, |max| recipe.cooking_time <= max)
    }
}

/// Case folding used by substring predicates in every backend.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub filter: RecipeFilter,
    pub chart_type: ChartType,
}

/// Field name to error messages, keyed and iterated by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fields with their messages, by field name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// First message for a field, or an empty string for templates.
    pub fn first(&self, field: &str) -> &str {
        self.get(field).first().map(String::as_str).unwrap_or("")
    }

    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

pub const REQUIRED: &str = "This field is required.";
pub const WHOLE_NUMBER: &str = "Enter a whole number.";
pub const MIN_ONE: &str = "Ensure this value is greater than or equal to 1.";
pub const TOO_LARGE: &str = "Ensure this value is less than or equal to 2147483647.";

/// Optional trimmed text input limited to `max` characters.
pub fn clean_optional_text(
    errors: &mut FormErrors,
    field: &str,
    value: &str,
    max: usize,
) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        );
        return None;
    }
    Some(value.to_string())
}

/// Optional whole number between 1 and [`MAX_COOKING_TIME`].
pub fn clean_positive_int(errors: &mut FormErrors, field: &str, value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let digits = value.strip_prefix('+').unwrap_or(value);
    match value.parse::<i64>() {
        Ok(n) if n > MAX_COOKING_TIME => {
            errors.add(field, TOO_LARGE);
            None
        }
        Ok(n) if n >= 1 => Some(n),
        Ok(_) => {
            errors.add(field, MIN_ONE);
            None
        }
        Err(_) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            errors.add(field, TOO_LARGE);
            None
        }
        Err(_) => {
            errors.add(field, WHOLE_NUMBER);
            None
        }
    }
}

/// Raw search form submission. Every field arrives as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchForm {
    pub recipe_name: String,
    pub ingredient: String,
    pub difficulty: String,
    pub max_cooking_time: String,
    pub chart_type: String,
}

impl SearchForm {
    pub fn validate(&self) -> Result<SearchQuery, FormErrors> {
        let mut errors = FormErrors::new();

        let name_contains =
            clean_optional_text(&mut errors, "recipe_name", &self.recipe_name, NAME_MAX_LENGTH);
        let ingredient_contains =
            clean_optional_text(&mut errors, "ingredient", &self.ingredient, NAME_MAX_LENGTH);

        let difficulty = match self.difficulty.trim() {
            "" => None,
            other => match other.parse::<Difficulty>() {
                Ok(d) => Some(d),
                Err(_) => {
                    errors.add("difficulty", invalid_choice(other));
                    None
                }
            },
        };

        let max_cooking_time =
            clean_positive_int(&mut errors, "max_cooking_time", &self.max_cooking_time);

        let chart_type = match self.chart_type.trim() {
            "" => {
                errors.add("chart_type", REQUIRED);
                ChartType::None
            }
            code => ChartType::from_code(code).unwrap_or_else(|| {
                errors.add("chart_type", invalid_choice(code));
                ChartType::None
            }),
        };

        errors.into_result(SearchQuery {
            filter: RecipeFilter {
                name_contains,
                ingredient_contains,
                difficulty,
                max_cooking_time,
            },
            chart_type,
        })
    }
}

fn invalid_choice(value: &str) -> String {
    format!("Select a valid choice. {value} is not one of the available choices.")
}

/// One row of the result table and the chart input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub id: i64,
    pub name: String,
    pub cooking_time: i64,
    pub difficulty: Option<Difficulty>,
    pub ingredient_count: usize,
}

impl ReportRow {
    pub fn difficulty_label(&self) -> &'static str {
        self.difficulty.as_ref().map_or("", Difficulty::label)
    }
}

pub fn report_rows(recipes: &[Recipe]) -> Vec<ReportRow> {
    recipes
        .iter()
        .map(|r| ReportRow {
            id: r.id,
            name: r.name.clone(),
            cooking_time: r.cooking_time,
            difficulty: r.difficulty,
            ingredient_count: r.ingredient_count(),
        })
        .collect()
}
