use askama::Template;
use recipe_core::search::{ChartType, FormErrors, ReportRow, SearchForm};
use recipe_core::{Difficulty, Recipe};

use crate::forms::{LoginForm, RecipeForm, SignupForm};
use crate::session::SessionUser;

/// One `<option>` of a select field.
pub struct Choice {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub fn difficulty_choices(selected: &str) -> Vec<Choice> {
    std::iter::once(("", "Any"))
        .chain(Difficulty::ALL.iter().map(|d| (d.label(), d.label())))
        .map(|(value, label)| Choice {
            value: value.to_string(),
            label: label.to_string(),
            selected: value == selected,
        })
        .collect()
}

pub fn chart_choices(selected: &str) -> Vec<Choice> {
    ChartType::ALL
        .iter()
        .map(|c| Choice {
            value: c.code().to_string(),
            label: c.label().to_string(),
            selected: c.code() == selected,
        })
        .collect()
}

#[derive(Template)]
#[template(path = "recipes/home.html")]
pub struct HomeTemplate {
    pub user: Option<SessionUser>,
    pub recipes: Vec<Recipe>,
}

#[derive(Template)]
#[template(path = "recipes/list.html")]
pub struct RecipeListTemplate {
    pub user: Option<SessionUser>,
    pub recipes: Vec<Recipe>,
}

#[derive(Template)]
#[template(path = "recipes/detail.html")]
pub struct RecipeDetailTemplate {
    pub user: Option<SessionUser>,
    pub recipe: Recipe,
    pub ingredients: Vec<String>,
    pub author: Option<String>,
    pub is_favorite: bool,
    pub can_edit: bool,
}

#[derive(Template)]
#[template(path = "recipes/form.html")]
pub struct RecipeFormTemplate {
    pub user: Option<SessionUser>,
    pub title: String,
    pub action: String,
    pub form: RecipeForm,
    pub errors: FormErrors,
    pub ingredients_help: &'static str,
    pub cooking_time_help: &'static str,
}

#[derive(Template)]
#[template(path = "recipes/delete.html")]
pub struct RecipeDeleteTemplate {
    pub user: Option<SessionUser>,
    pub recipe: Recipe,
}

#[derive(Template)]
#[template(path = "recipes/search.html")]
pub struct SearchTemplate {
    pub user: Option<SessionUser>,
    pub form: SearchForm,
    pub errors: FormErrors,
    pub difficulty_choices: Vec<Choice>,
    pub chart_choices: Vec<Choice>,
    pub searched: bool,
    pub rows: Vec<ReportRow>,
    pub chart: Option<String>,
}

#[derive(Template)]
#[template(path = "recipes/profile.html")]
pub struct ProfileTemplate {
    pub user: Option<SessionUser>,
    pub username: String,
    pub authored: Vec<Recipe>,
    pub favorites: Vec<Recipe>,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub user: Option<SessionUser>,
    pub form: LoginForm,
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub user: Option<SessionUser>,
    pub form: SignupForm,
    pub errors: FormErrors,
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "auth/success.html")]
pub struct LogoutSuccessTemplate {
    pub user: Option<SessionUser>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub user: Option<SessionUser>,
    pub status: u16,
    pub message: String,
}
