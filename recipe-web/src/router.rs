use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::auth::{login_page, login_submit, logout, signup_page, signup_submit};
use crate::handlers::profile::profile;
use crate::handlers::recipes::{
    add_form, add_submit, delete_confirm, delete_submit, edit_form, edit_submit, home, recipe_detail, recipe_list,
    toggle_favorite,
};
use crate::handlers::search::{search_page, search_submit};
use crate::handlers::{health, not_found};
use crate::state::AppState;

pub fn app_router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/", get(home))
        .route("/list/", get(recipe_list))
        .route("/list/:id/", get(recipe_detail))
        .route("/list/:id/edit/", get(edit_form).post(edit_submit))
        .route("/list/:id/delete/", get(delete_confirm).post(delete_submit))
        .route("/list/:id/favorite/", post(toggle_favorite))
        .route("/search/", get(search_page).post(search_submit))
        .route("/add/", get(add_form).post(add_submit))
        .route("/profile/", get(profile))
        .route("/login/", get(login_page).post(login_submit))
        .route("/signup/", get(signup_page).post(signup_submit))
        .route("/logout/", get(logout).post(logout))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
