use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::routes::middleware_auth::AuthKeys;
use crate::routes::session::SessionRegistry;
use crate::store::TaskStore;
use crate::todos::controller::SyncMode;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub store: Arc<dyn TaskStore>,
    pub keys: AuthKeys,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(
        db: PgPool,
        store: Arc<dyn TaskStore>,
        keys: AuthKeys,
        sync_mode: SyncMode,
        session_idle: Duration,
    ) -> Self {
        let sessions = SessionRegistry::new(Arc::clone(&store), sync_mode, session_idle);
        Self {
            db,
            store,
            keys,
            sessions,
        }
    }
}
