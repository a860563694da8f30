use std::sync::Arc;

use crate::db::Database;
use crate::engine::TransitionEngine;

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub engine: Arc<TransitionEngine>,
}

impl AppState {
    pub fn new(db: Arc<Database>, engine: Arc<TransitionEngine>) -> Self {
        Self { db, engine }
    }
}
