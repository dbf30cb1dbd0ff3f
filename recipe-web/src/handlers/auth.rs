use axum::{
    extract::{Form, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use recipe_core::password::decoy_hash;
use recipe_core::search::FormErrors;
use serde::Deserialize;
use tracing::{info, warn};

use crate::accounts::{register, verify_blocking};
use crate::error::AppResult;
use crate::forms::{LoginForm, SignupForm, INVALID_CREDENTIALS, LOGIN_FAILED, SIGNUP_FAILED};
use crate::session::{
    expired_cookie, read_cookie, safe_next, see_other, session_cookie, with_cookie, MaybeUser, SessionUser,
};
use crate::state::AppState;
use crate::templates::{LoginTemplate, LogoutSuccessTemplate, SignupTemplate};

const AFTER_LOGIN: &str = "/list/";

#[derive(Debug, Default, Deserialize)]
pub struct NextParam {
    next: Option<String>,
}

/// Starts a session and redirects with the cookie set.
async fn sign_in(state: &AppState, user: SessionUser, next: Option<&str>) -> Response {
    let token = state.sessions.create(user).await;
    let cookie = session_cookie(&state.config.cookie_name, &token, state.sessions.ttl());
    let target = safe_next(next).unwrap_or(AFTER_LOGIN);
    with_cookie(see_other(target, AFTER_LOGIN), &cookie)
}

fn login_page_with(form: LoginForm, error_message: Option<&str>) -> LoginTemplate {
    LoginTemplate {
        user: None,
        form: LoginForm {
            password: String::new(),
            ..form
        },
        error_message: error_message.map(str::to_string),
    }
}

pub async fn login_page(
    MaybeUser(user): MaybeUser,
    Query(params): Query<NextParam>,
) -> Response {
    if user.is_some() {
        return Redirect::to(AFTER_LOGIN).into_response();
    }
    let form = LoginForm {
        next: params.next.unwrap_or_default(),
        ..LoginForm::default()
    };
    login_page_with(form, None).into_response()
}

pub async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> AppResult<Response> {
    if !form.is_complete() {
        return Ok(login_page_with(form, Some(LOGIN_FAILED)).into_response());
    }

    let username = form.username.trim();
    let user = state.storage.get_user_by_username(username).await?;
    let verified = match &user {
        Some(user) => verify_blocking(form.password.clone(), user.password_hash.clone()).await?,
        None => {
            verify_blocking(form.password.clone(), decoy_hash().to_string()).await?;
            false
        }
    };
    let user = match user {
        Some(user) if verified => user,
        _ => {
            warn!(username, "Failed login attempt");
            return Ok(login_page_with(form.clone(), Some(INVALID_CREDENTIALS)).into_response());
        }
    };

    info!(user = %user.username, "User logged in");
    let session_user = SessionUser {
        id: user.id,
        username: user.username,
    };
    Ok(sign_in(&state, session_user, Some(form.next.as_str())).await)
}

fn signup_page_with(form: SignupForm, errors: FormErrors, error_message: Option<&str>) -> SignupTemplate {
    SignupTemplate {
        user: None,
        form: SignupForm {
            username: form.username,
            ..SignupForm::default()
        },
        errors,
        error_message: error_message.map(str::to_string),
    }
}

pub async fn signup_page(MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to(AFTER_LOGIN).into_response();
    }
    signup_page_with(SignupForm::default(), FormErrors::new(), None).into_response()
}

pub async fn signup_submit(State(state): State<AppState>, Form(form): Form<SignupForm>) -> AppResult<Response> {
    let user = match register(state.storage.as_ref(), &form).await {
        Ok(user) => user,
        Err(e) => match e.form_errors() {
            Some(errors) => {
                return Ok(signup_page_with(form, errors, Some(SIGNUP_FAILED)).into_response());
            }
            None => return Err(e.into()),
        },
    };

    let session_user = SessionUser {
        id: user.id,
        username: user.username,
    };
    Ok(sign_in(&state, session_user, None).await)
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = read_cookie(&headers, &state.config.cookie_name) {
        if state.sessions.remove(&token).await {
            info!("User logged out");
        }
    }
    with_cookie(
        LogoutSuccessTemplate { user: None },
        &expired_cookie(&state.config.cookie_name),
    )
}
