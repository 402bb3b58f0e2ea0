use chrono::{DateTime, Utc};

use crate::engine::EngineContext;

/// Shared by every handler and socket.
#[derive(Clone)]
pub struct AppState {
    pub context: EngineContext,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(context: EngineContext) -> Self {
        Self {
            context,
            started_at: Utc::now(),
        }
    }
}
