//! Database module exports.

mod models;
mod repository;
mod sqlite;

pub use models::*;
pub use repository::*;
pub use sqlite::Database;
