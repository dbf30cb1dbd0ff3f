use axum::{
    extract::{Form, Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use recipe_core::search::FormErrors;
use recipe_core::{NewRecipe, Recipe, COOKING_TIME_HELP_TEXT, INGREDIENTS_HELP_TEXT};
use serde_json::json;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::forms::RecipeForm;
use crate::session::{CurrentUser, MaybeUser, SessionUser};
use crate::state::AppState;
use crate::templates::{
    HomeTemplate, RecipeDeleteTemplate, RecipeDetailTemplate, RecipeFormTemplate, RecipeListTemplate,
};

async fn load_recipe(state: &AppState, recipe_id: i64) -> AppResult<Recipe> {
    state
        .storage
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {recipe_id}")))
}

/// Loads a recipe the user may modify.
async fn load_editable(state: &AppState, recipe_id: i64, user: &SessionUser) -> AppResult<Recipe> {
    let recipe = load_recipe(state, recipe_id).await?;
    if recipe.can_edit(user.id) {
        Ok(recipe)
    } else {
        Err(AppError::Forbidden)
    }
}

pub async fn home(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> AppResult<HomeTemplate> {
    let recipes = state.storage.list_recipes().await?;
    Ok(HomeTemplate { user, recipes })
}

pub async fn recipe_list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<RecipeListTemplate> {
    let recipes = state.storage.list_recipes().await?;
    Ok(RecipeListTemplate {
        user: Some(user),
        recipes,
    })
}

pub async fn recipe_detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<i64>,
) -> AppResult<RecipeDetailTemplate> {
    let recipe = load_recipe(&state, recipe_id).await?;
    let is_favorite = state.storage.is_favorite(user.id, recipe.id).await?;
    let author = match recipe.author_id {
        Some(author_id) => state
            .storage
            .get_user(author_id)
            .await?
            .map(|u| u.username),
        None => None,
    };

    Ok(RecipeDetailTemplate {
        ingredients: recipe.ingredient_list(),
        can_edit: recipe.can_edit(user.id),
        user: Some(user),
        recipe,
        author,
        is_favorite,
    })
}

fn form_page(user: SessionUser, title: &str, action: String, form: RecipeForm, errors: FormErrors) -> RecipeFormTemplate {
    RecipeFormTemplate {
        user: Some(user),
        title: title.to_string(),
        action,
        form,
        errors,
        ingredients_help: INGREDIENTS_HELP_TEXT,
        cooking_time_help: COOKING_TIME_HELP_TEXT,
    }
}

pub async fn add_form(CurrentUser(user): CurrentUser) -> RecipeFormTemplate {
    form_page(user, "Add Recipe", "/add/".to_string(), RecipeForm::default(), FormErrors::new())
}

pub async fn add_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<RecipeForm>,
) -> AppResult<Response> {
    let new_recipe = match form.validate() {
        Ok(recipe) => NewRecipe {
            author_id: Some(user.id),
            ..recipe
        },
        Err(errors) => {
            return Ok(form_page(user, "Add Recipe", "/add/".to_string(), form, errors).into_response());
        }
    };

    let recipe = state.storage.create_recipe(&new_recipe).await?;
    info!(recipe_id = recipe.id, user = %user.username, "Recipe created");
    Ok(Redirect::to(&format!("/list/{}/", recipe.id)).into_response())
}

pub async fn edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<i64>,
) -> AppResult<RecipeFormTemplate> {
    let recipe = load_editable(&state, recipe_id, &user).await?;
    Ok(form_page(
        user,
        "Edit Recipe",
        format!("/list/{recipe_id}/edit/"),
        RecipeForm::from_recipe(&recipe),
        FormErrors::new(),
    ))
}

pub async fn edit_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<i64>,
    Form(form): Form<RecipeForm>,
) -> AppResult<Response> {
    let existing = load_editable(&state, recipe_id, &user).await?;

    let update = match form.validate() {
        Ok(recipe) => NewRecipe {
            author_id: existing.author_id,
            ..recipe
        },
        Err(errors) => {
            let action = format!("/list/{recipe_id}/edit/");
            return Ok(form_page(user, "Edit Recipe", action, form, errors).into_response());
        }
    };

    state
        .storage
        .update_recipe(recipe_id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {recipe_id}")))?;
    info!(recipe_id, user = %user.username, "Recipe updated");
    Ok(Redirect::to(&format!("/list/{recipe_id}/")).into_response())
}

pub async fn delete_confirm(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<i64>,
) -> AppResult<RecipeDeleteTemplate> {
    let recipe = load_editable(&state, recipe_id, &user).await?;
    Ok(RecipeDeleteTemplate {
        user: Some(user),
        recipe,
    })
}

pub async fn delete_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<i64>,
) -> AppResult<Redirect> {
    load_editable(&state, recipe_id, &user).await?;
    state.storage.delete_recipe(recipe_id).await?;
    info!(recipe_id, user = %user.username, "Recipe deleted");
    Ok(Redirect::to("/list/"))
}

fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("X-Requested-With")
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// Script requests get the new state as JSON; plain form posts go back to
/// the recipe page.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<i64>,
    headers: HeaderMap,
) -> AppResult<Response> {
    load_recipe(&state, recipe_id).await?;
    let is_favorited = state.storage.toggle_favorite(user.id, recipe_id).await?;
    info!(recipe_id, user = %user.username, is_favorited, "Favorite toggled");

    if is_ajax(&headers) {
        Ok(Json(json!({ "is_favorited": is_favorited })).into_response())
    } else {
        Ok(Redirect::to(&format!("/list/{recipe_id}/")).into_response())
    }
}
