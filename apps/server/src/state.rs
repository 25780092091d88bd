//! # Shared Application State

use bodega_db::Database;

/// State handed to every handler. Cheap to clone: the database handle is a
/// pool reference.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState { db }
    }
}
