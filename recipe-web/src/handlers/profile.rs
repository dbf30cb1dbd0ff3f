use axum::extract::State;

use crate::error::AppResult;
use crate::session::CurrentUser;
use crate::state::AppState;
use crate::templates::ProfileTemplate;

pub async fn profile(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> AppResult<ProfileTemplate> {
    let authored = state.storage.recipes_by_author(user.id).await?;
    let favorites = state.storage.favorite_recipes(user.id).await?;

    Ok(ProfileTemplate {
        username: user.username.clone(),
        user: Some(user),
        authored,
        favorites,
    })
}
