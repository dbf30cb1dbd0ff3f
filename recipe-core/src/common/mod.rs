pub mod error;

pub use error::{CatalogError, Result};
