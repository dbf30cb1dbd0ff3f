//! Recipe catalog web application.
//!
//! Server-rendered pages over the `recipe-core` storage: browsing, favorites,
//! authoring, and the search report (filter form, result table, chart).

pub mod accounts;
pub mod config;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod logging;
pub mod router;
pub mod session;
pub mod state;
pub mod templates;

pub use config::Config;
pub use router::app_router;
pub use state::AppState;
