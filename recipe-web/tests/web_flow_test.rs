use std::sync::Arc;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use recipe_core::{InMemoryStorage, NewRecipe, Recipe, SqliteStorage, Storage};
use recipe_web::{app_router, AppState, Config};
use tempfile::tempdir;
use tower::ServiceExt;

const PASSWORD: &str = "Sup3rSecret!";

struct TestApp {
    router: Router,
    storage: Arc<dyn Storage>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_storage(Arc::new(InMemoryStorage::new()))
    }

    fn with_storage(storage: Arc<dyn Storage>) -> Self {
        let state = AppState::new(storage.clone(), Config::default());
        Self {
            router: app_router(state),
            storage,
        }
    }

    async fn send(&self, request: Request<Body>) -> Result<Response> {
        Ok(self.router.clone().oneshot(request).await?)
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Result<Response> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty())?).await
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Result<Response> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string()))?).await
    }

    /// Signs up a fresh account and returns the `name=value` session cookie.
    async fn sign_up(&self, username: &str) -> Result<String> {
        let body = format!("username={username}&password1={PASSWORD}&password2={PASSWORD}");
        let response = self.post_form("/signup/", &body, None).await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        Ok(session_cookie(&response))
    }

    async fn user_id(&self, username: &str) -> Result<i64> {
        let user = self.storage.get_user_by_username(username).await?;
        Ok(user.map(|u| u.id).unwrap_or_default())
    }

    async fn add_recipe(&self, name: &str, ingredients: &str, cooking_time: i64, author_id: Option<i64>) -> Result<Recipe> {
        let recipe = NewRecipe {
            name: name.to_string(),
            ingredients: ingredients.to_string(),
            cooking_time,
            instructions: "Mix and cook.".to_string(),
            author_id,
        };
        Ok(self.storage.create_recipe(&recipe).await?)
    }
}

fn session_cookie(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    set_cookie.split(';').next().unwrap_or_default().to_string()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn body_text(response: Response) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

#[tokio::test]
async fn test_health_and_unknown_paths() -> Result<()> {
    let app = TestApp::new();

    let response = app.get("/health", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await?, "OK");

    let response = app.get("/no/such/page/", None).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await?.contains("Page not found"));
    Ok(())
}

#[tokio::test]
async fn test_home_is_public_and_lists_recipes() -> Result<()> {
    let app = TestApp::new();
    app.add_recipe("Pancakes", "flour, milk, eggs", 20, None).await?;

    let response = app.get("/", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("Pancakes"));
    assert!(html.contains("Log in"));
    Ok(())
}

#[tokio::test]
async fn test_protected_pages_redirect_to_login_with_next() -> Result<()> {
    let app = TestApp::new();

    for path in ["/list/", "/search/", "/add/", "/profile/"] {
        let response = app.get(path, None).await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        let encoded: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
        assert_eq!(location(&response), format!("/login/?next={encoded}"), "{path}");
    }
    Ok(())
}

#[tokio::test]
async fn test_signup_logs_in_and_lists_recipes() -> Result<()> {
    let app = TestApp::new();
    let cookie = app.sign_up("cook").await?;
    assert!(cookie.starts_with("recipes_session="));

    let response = app.get("/list/", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await?.contains("cook"));
    Ok(())
}

#[tokio::test]
async fn test_signup_rejects_taken_username() -> Result<()> {
    let app = TestApp::new();
    app.sign_up("cook").await?;

    let body = format!("username=COOK&password1={PASSWORD}&password2={PASSWORD}");
    let response = app.post_form("/signup/", &body, None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await?.contains("A user with that username already exists."));
    Ok(())
}

#[tokio::test]
async fn test_login_messages_and_next_redirect() -> Result<()> {
    let app = TestApp::new();
    app.sign_up("cook").await?;

    let response = app.post_form("/login/", "username=cook&password=", None).await?;
    assert!(body_text(response).await?.contains("Oops, something went wrong!"));

    let response = app.post_form("/login/", "username=cook&password=wrong-password", None).await?;
    assert!(body_text(response)
        .await?
        .contains("Invalid username or password. Please try again."));

    let body = format!("username=cook&password={PASSWORD}&next=%2Fsearch%2F");
    let response = app.post_form("/login/", &body, None).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/search/");

    let body = format!("username=cook&password={PASSWORD}&next=https%3A%2F%2Fevil.example%2F");
    let response = app.post_form("/login/", &body, None).await?;
    assert_eq!(location(&response), "/list/");
    Ok(())
}

#[tokio::test]
async fn test_unknown_user_and_wrong_password_fail_alike() -> Result<()> {
    let app = TestApp::new();
    app.sign_up("cook").await?;

    let wrong_password = app.post_form("/login/", "username=cook&password=wrong-password", None).await?;
    let unknown_user = app.post_form("/login/", "username=nobody&password=wrong-password", None).await?;
    assert_eq!(wrong_password.status(), StatusCode::OK);
    assert_eq!(unknown_user.status(), StatusCode::OK);
    assert!(unknown_user.headers().get(header::SET_COOKIE).is_none());

    let wrong_password = body_text(wrong_password).await?;
    let unknown_user = body_text(unknown_user).await?;
    assert!(unknown_user.contains("Invalid username or password. Please try again."));
    assert_eq!(
        wrong_password.replace("value=\"cook\"", ""),
        unknown_user.replace("value=\"nobody\"", "")
    );
    Ok(())
}

#[tokio::test]
async fn test_login_ignores_next_with_control_characters() -> Result<()> {
    let app = TestApp::new();
    app.sign_up("cook").await?;

    for next in ["%2Fa%0Ab", "%2F%09%2Fevil.example", "%2Fa%0D%0ASet-Cookie%3A+x%3D1"] {
        let body = format!("username=cook&password={PASSWORD}&next={next}");
        let response = app.post_form("/login/", &body, None).await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{next}");
        assert_eq!(location(&response), "/list/", "{next}");
    }
    Ok(())
}

#[tokio::test]
async fn test_logout_ends_session() -> Result<()> {
    let app = TestApp::new();
    let cookie = app.sign_up("cook").await?;

    let response = app.post_form("/logout/", "", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).starts_with("recipes_session="));
    assert!(body_text(response).await?.contains("You have been logged out"));

    let response = app.get("/list/", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    Ok(())
}

#[tokio::test]
async fn test_add_recipe_derives_difficulty() -> Result<()> {
    let app = TestApp::new();
    let cookie = app.sign_up("cook").await?;

    let body = "name=Toast&ingredients=bread%2C+butter&cooking_time=5&instructions=Toast+the+bread.";
    let response = app.post_form("/add/", body, Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response).to_string();
    assert!(target.starts_with("/list/"));

    let response = app.get(&target, Some(&cookie)).await?;
    let html = body_text(response).await?;
    assert!(html.contains("Toast"));
    assert!(html.contains("Easy"));
    assert!(html.contains("By cook"));
    Ok(())
}

#[tokio::test]
async fn test_add_recipe_shows_field_errors() -> Result<()> {
    let app = TestApp::new();
    let cookie = app.sign_up("cook").await?;

    let body = "name=Toast&ingredients=bread&cooking_time=0&instructions=Toast+it.";
    let response = app.post_form("/add/", body, Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await?.contains("field-error"));
    assert!(app.storage.list_recipes().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_only_author_can_edit_or_delete() -> Result<()> {
    let app = TestApp::new();
    let owner_cookie = app.sign_up("owner").await?;
    let other_cookie = app.sign_up("other").await?;
    let owner_id = app.user_id("owner").await?;
    let recipe = app.add_recipe("Stew", "beef, carrot, onion, stock", 90, Some(owner_id)).await?;

    let edit = format!("/list/{}/edit/", recipe.id);
    let delete = format!("/list/{}/delete/", recipe.id);

    let response = app.get(&edit, Some(&other_cookie)).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = app.post_form(&delete, "", Some(&other_cookie)).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(app.storage.get_recipe(recipe.id).await?.is_some());

    let body = "name=Beef+Stew&ingredients=beef%2C+carrot&cooking_time=5&instructions=Simmer.";
    let response = app.post_form(&edit, body, Some(&owner_cookie)).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let updated = app.storage.get_recipe(recipe.id).await?;
    assert_eq!(updated.as_ref().map(|r| r.name.as_str()), Some("Beef Stew"));
    assert_eq!(updated.and_then(|r| r.author_id), Some(owner_id));

    let response = app.post_form(&delete, "", Some(&owner_cookie)).await?;
    assert_eq!(location(&response), "/list/");
    assert!(app.storage.get_recipe(recipe.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_missing_recipe_is_not_found() -> Result<()> {
    let app = TestApp::new();
    let cookie = app.sign_up("cook").await?;

    let response = app.get("/list/999/", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_favorite_toggle_json_and_redirect() -> Result<()> {
    let app = TestApp::new();
    let cookie = app.sign_up("cook").await?;
    let recipe = app.add_recipe("Salad", "lettuce, tomato", 5, None).await?;
    let uri = format!("/list/{}/favorite/", recipe.id);

    let ajax = |cookie: &str| {
        Request::builder()
            .method("POST")
            .uri(&uri)
            .header(header::COOKIE, cookie)
            .header("X-Requested-With", "XMLHttpRequest")
            .body(Body::empty())
    };

    let response = app.send(ajax(&cookie)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(json["is_favorited"], true);

    let response = app.get("/profile/", Some(&cookie)).await?;
    assert!(body_text(response).await?.contains("Salad"));

    let response = app.post_form(&uri, "", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/list/{}/", recipe.id));

    let user_id = app.user_id("cook").await?;
    assert!(!app.storage.is_favorite(user_id, recipe.id).await?);
    Ok(())
}

#[tokio::test]
async fn test_search_renders_table_and_bar_chart() -> Result<()> {
    let app = TestApp::new();
    let cookie = app.sign_up("cook").await?;
    app.add_recipe("Tomato Soup", "tomato, salt, water", 30, None).await?;
    app.add_recipe("Tomato Salad", "tomato, basil", 5, None).await?;
    app.add_recipe("Omelette", "eggs, butter", 8, None).await?;

    let body = "recipe_name=tomato&ingredient=&difficulty=&max_cooking_time=&chart_type=%232";
    let response = app.post_form("/search/", body, Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("results-table"));
    assert!(html.contains("Tomato Soup"));
    assert!(html.contains("Tomato Salad"));
    assert!(!html.contains("Omelette"));
    assert!(html.contains("data:image/svg+xml;base64,"));
    Ok(())
}

#[tokio::test]
async fn test_search_without_chart_and_without_matches() -> Result<()> {
    let app = TestApp::new();
    let cookie = app.sign_up("cook").await?;
    app.add_recipe("Omelette", "eggs, butter", 8, None).await?;

    let body = "recipe_name=&ingredient=egg&difficulty=Easy&max_cooking_time=10&chart_type=%231";
    let html = body_text(app.post_form("/search/", body, Some(&cookie)).await?).await?;
    assert!(html.contains("Omelette"));
    assert!(!html.contains("data:image/svg+xml;base64,"));

    let body = "recipe_name=cake&ingredient=&difficulty=&max_cooking_time=&chart_type=%233";
    let html = body_text(app.post_form("/search/", body, Some(&cookie)).await?).await?;
    assert!(html.contains("No recipes found"));
    assert!(!html.contains("data:image/svg+xml;base64,"));
    Ok(())
}

#[tokio::test]
async fn test_search_reports_invalid_input() -> Result<()> {
    let app = TestApp::new();
    let cookie = app.sign_up("cook").await?;

    let body = "recipe_name=&ingredient=&difficulty=&max_cooking_time=soon&chart_type=%231";
    let response = app.post_form("/search/", body, Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("field-error"));
    assert!(!html.contains("results-table"));
    Ok(())
}

#[tokio::test]
async fn test_search_flow_on_sqlite_database() -> Result<()> {
    let dir = tempdir()?;
    let storage = SqliteStorage::open(dir.path().join("recipes.db"))?;
    let app = TestApp::with_storage(Arc::new(storage));
    let cookie = app.sign_up("cook").await?;

    let body = "name=Cr%C3%A8me+Br%C3%BBl%C3%A9e&ingredients=cream%2C+sugar%2C+egg+yolks%2C+vanilla\
                &cooking_time=50&instructions=Bake+in+a+water+bath.";
    let response = app.post_form("/add/", body, Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    app.add_recipe("Omelette", "eggs, butter", 8, None).await?;

    let body = "recipe_name=CR%C3%88ME&ingredient=&difficulty=Hard&max_cooking_time=60&chart_type=%234";
    let html = body_text(app.post_form("/search/", body, Some(&cookie)).await?).await?;
    assert!(html.contains("Crème Brûlée"));
    assert!(!html.contains("Omelette"));
    assert!(html.contains("data:image/svg+xml;base64,"));
    Ok(())
}
