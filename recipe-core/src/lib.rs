pub mod chart;
pub mod common;
pub mod domain;
pub mod password;
pub mod search;
pub mod seed;
pub mod storage;

pub use common::error::{CatalogError, Result};
pub use domain::*;
pub use storage::{InMemoryStorage, SqliteStorage, Storage};
