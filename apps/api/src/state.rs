//! # Application State
//!
//! Shared by every handler through axum's `State` extractor.
//!
//! ## Thread Safety
//! `Database` wraps a `SqlitePool`, which is cheap to clone and safe to
//! use from many tasks at once. No extra locking is needed.

use stockbook_db::Database;

/// State handed to the router.
#[derive(Debug, Clone)]
pub struct AppState {
    db: Database,
}

impl AppState {
    /// Creates the state around an open database.
    pub fn new(db: Database) -> Self {
        AppState { db }
    }

    /// Returns the database.
    pub fn db(&self) -> &Database {
        &self.db
    }
}
