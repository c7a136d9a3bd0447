// SQLite reference store
// Holds static reference data (language identities); run results are never written here

mod db;
mod error;
mod migrations;
mod queries;

// Public API
pub use db::Database;
pub use error::{Error, Result};
pub use migrations::{MIGRATIONS, Migration, latest_version};
