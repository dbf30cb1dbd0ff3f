use super::traits::Storage;
use crate::common::error::{CatalogError, Result};
use crate::domain::{NewRecipe, Recipe, User};
use crate::search::{fold_case, RecipeFilter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const RECIPE_COLUMNS: &str =
    "r.id, r.name, r.ingredients, r.cooking_time, r.difficulty, r.instructions, r.author_id, r.created_at";
const USER_COLUMNS: &str = "id, username, password_hash, created_at";

/// SQLite storage. A single connection serialized behind a mutex; every
/// statement is short so handlers never hold the lock across an await.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!("Opening recipe database at {}", path.display());
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.run_migrations()?;
        Ok(storage)
    }

    /// Run database migrations
    pub fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");
        let conn = self.conn()?;

        let migration_sql_001 = include_str!("../../migrations/001_create_recipes_and_users.sql");
        conn.execute_batch(migration_sql_001)
            .map_err(|e| CatalogError::Database {
                message: format!("Failed to run base migration: {e}"),
            })?;

        let migration_sql_002 = include_str!("../../migrations/002_indexes_and_pragmas.sql");
        conn.execute_batch(migration_sql_002)
            .map_err(|e| CatalogError::Database {
                message: format!("Failed to run index migration: {e}"),
            })?;

        if !Self::has_column(&conn, "recipes", "name_folded")? {
            let migration_sql_003 = include_str!("../../migrations/003_case_folded_search_columns.sql");
            conn.execute_batch(migration_sql_003)
                .map_err(|e| CatalogError::Database {
                    message: format!("Failed to add case-folded columns: {e}"),
                })?;
            let backfilled = Self::backfill_folded(&conn)?;
            info!("Backfilled case-folded search columns for {} recipes", backfilled);
        }

        info!("Database migrations completed");
        Ok(())
    }

    fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
        let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
        for name in names {
            if name? == column {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn backfill_folded(conn: &Connection) -> Result<usize> {
        let rows: Vec<(i64, String, String)> = {
            let mut stmt = conn.prepare("SELECT id, name, ingredients FROM recipes")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        for (id, name, ingredients) in &rows {
            conn.execute(
                "UPDATE recipes SET name_folded = ?1, ingredients_folded = ?2 WHERE id = ?3",
                params![fold_case(name), fold_case(ingredients), id],
            )?;
        }
        Ok(rows.len())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CatalogError::Database {
            message: "database connection lock poisoned".to_string(),
        })
    }

    fn query_recipes(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Recipe>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_recipe)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn fetch_recipe(conn: &Connection, recipe_id: i64) -> Result<Option<Recipe>> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = ?1");
        Ok(conn
            .query_row(&sql, params![recipe_id], row_to_recipe)
            .optional()?)
    }
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_recipe(row: &Row<'_>) -> rusqlite::Result<Recipe> {
    let difficulty: String = row.get(4)?;
    let created_at: String = row.get(7)?;
    Ok(Recipe {
        id: row.get(0)?,
        name: row.get(1)?,
        ingredients: row.get(2)?,
        cooking_time: row.get(3)?,
        difficulty: difficulty.parse().ok(),
        instructions: row.get(5)?,
        author_id: row.get(6)?,
        created_at: parse_timestamp(7, &created_at)?,
    })
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_at: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
    })
}

/// `%` and `_` are LIKE wildcards; the user's text must match literally.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Builds the WHERE clause for a filter; one predicate per populated field.
fn filter_clause(filter: &RecipeFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(name) = &filter.name_contains {
        clauses.push("r.name_folded LIKE ? ESCAPE '\\'");
        values.push(Value::Text(like_pattern(&fold_case(name))));
    }
    if let Some(ingredient) = &filter.ingredient_contains {
        clauses.push("r.ingredients_folded LIKE ? ESCAPE '\\'");
        values.push(Value::Text(like_pattern(&fold_case(ingredient))));
    }
    if let Some(difficulty) = filter.difficulty {
        clauses.push("r.difficulty = ?");
        values.push(Value::Text(difficulty.label().to_string()));
    }
    if let Some(max) = filter.max_cooking_time {
        clauses.push("r.cooking_time <= ?");
        values.push(Value::Integer(max));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let difficulty = recipe.derive_difficulty();
        let created_at = Utc::now();

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO recipes (name, ingredients, cooking_time, difficulty, instructions, author_id, created_at,
                                  name_folded, ingredients_folded)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                recipe.name,
                recipe.ingredients,
                recipe.cooking_time,
                difficulty.as_ref().map_or("", |d| d.label()),
                recipe.instructions,
                recipe.author_id,
                created_at.to_rfc3339(),
                fold_case(&recipe.name),
                fold_case(&recipe.ingredients),
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Created recipe '{}' with id {}", recipe.name, id);

        Ok(Recipe {
            id,
            name: recipe.name.clone(),
            ingredients: recipe.ingredients.clone(),
            cooking_time: recipe.cooking_time,
            difficulty,
            instructions: recipe.instructions.clone(),
            author_id: recipe.author_id,
            created_at,
        })
    }

    async fn get_recipe(&self, recipe_id: i64) -> Result<Option<Recipe>> {
        let conn = self.conn()?;
        Self::fetch_recipe(&conn, recipe_id)
    }

    async fn update_recipe(&self, recipe_id: i64, recipe: &NewRecipe) -> Result<Option<Recipe>> {
        let difficulty = recipe.derive_difficulty();

        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE recipes
             SET name = ?1, ingredients = ?2, cooking_time = ?3, instructions = ?4,
                 difficulty = COALESCE(?5, difficulty),
                 name_folded = ?6, ingredients_folded = ?7
             WHERE id = ?8",
            params![
                recipe.name,
                recipe.ingredients,
                recipe.cooking_time,
                recipe.instructions,
                difficulty.as_ref().map(|d| d.label()),
                fold_case(&recipe.name),
                fold_case(&recipe.ingredients),
                recipe_id,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        debug!("Updated recipe {}", recipe_id);
        Self::fetch_recipe(&conn, recipe_id)
    }

    async fn delete_recipe(&self, recipe_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM favorites WHERE recipe_id = ?1", params![recipe_id])?;
        let deleted = conn.execute("DELETE FROM recipes WHERE id = ?1", params![recipe_id])?;
        debug!("Deleted recipe {} ({} rows)", recipe_id, deleted);
        Ok(deleted > 0)
    }

    async fn list_recipes(&self) -> Result<Vec<Recipe>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes r ORDER BY r.id");
        Self::query_recipes(&conn, &sql, &[])
    }

    async fn search_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        let (clause, values) = filter_clause(filter);
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes r{clause} ORDER BY r.id");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_recipe)?;
        let recipes = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        debug!("Search matched {} recipes", recipes.len());
        Ok(recipes)
    }

    async fn recipes_by_author(&self, user_id: i64) -> Result<Vec<Recipe>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.author_id = ?1 ORDER BY r.id");
        Self::query_recipes(&conn, &sql, params![user_id])
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let created_at = Utc::now();

        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
            params![username, password_hash, created_at.to_rfc3339()],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(CatalogError::Conflict(format!("username '{username}' is taken")));
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        info!("Created user '{}' with id {}", username, id);
        Ok(User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
        })
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        Ok(conn.query_row(&sql, params![user_id], row_to_user).optional()?)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        Ok(conn.query_row(&sql, params![username], row_to_user).optional()?)
    }

    async fn toggle_favorite(&self, user_id: i64, recipe_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        if Self::fetch_recipe(&conn, recipe_id)?.is_none() {
            return Err(CatalogError::NotFound(format!("recipe {recipe_id}")));
        }

        let removed = conn.execute(
            "DELETE FROM favorites WHERE user_id = ?1 AND recipe_id = ?2",
            params![user_id, recipe_id],
        )?;
        if removed > 0 {
            return Ok(false);
        }

        conn.execute(
            "INSERT INTO favorites (user_id, recipe_id) VALUES (?1, ?2)",
            params![user_id, recipe_id],
        )?;
        Ok(true)
    }

    async fn is_favorite(&self, user_id: i64, recipe_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM favorites WHERE user_id = ?1 AND recipe_id = ?2",
                params![user_id, recipe_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    async fn favorite_recipes(&self, user_id: i64) -> Result<Vec<Recipe>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r
             JOIN favorites f ON f.recipe_id = r.id
             WHERE f.user_id = ?1 ORDER BY r.name"
        );
        Self::query_recipes(&conn, &sql, params![user_id])
    }
}
