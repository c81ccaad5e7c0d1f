use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{FromRequestParts, Request},
    http::{header::SET_COOKIE, request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::middleware_auth::cookie_value;
use crate::store::TaskStore;
use crate::todos::controller::{ListController, SyncMode};

pub const SESSION_COOKIE: &str = "sid";

/// Browser session id, set by `attach_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub Uuid);

impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionId>()
            .copied()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "missing session"))
    }
}

struct Entry {
    controller: ListController,
    last_seen: Instant,
}

/// One `ListController` per browser session.
///
/// A controller is created on first activation and dropped when the
/// session ends or sits idle past the timeout.
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn TaskStore>,
    mode: SyncMode,
    idle: Duration,
    sessions: Arc<Mutex<HashMap<Uuid, Entry>>>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn TaskStore>, mode: SyncMode, idle: Duration) -> Self {
        Self {
            store,
            mode,
            idle,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn activate(&self, sid: Uuid) -> ListController {
        let mut sessions = self.sessions.lock().await;

        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen.elapsed() < self.idle);
        if sessions.len() < before {
            debug!(expired = before - sessions.len(), "idle sessions dropped");
        }

        let entry = sessions.entry(sid).or_insert_with(|| Entry {
            controller: ListController::new(Arc::clone(&self.store), self.mode),
            last_seen: Instant::now(),
        });
        entry.last_seen = Instant::now();
        let controller = entry.controller.clone();

        debug!(%sid, active = sessions.len(), "session active");
        controller
    }

    pub async fn end(&self, sid: Uuid) -> bool {
        let ended = self.sessions.lock().await.remove(&sid).is_some();
        if ended {
            info!(%sid, "session ended");
        }
        ended
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Resolves the `sid` cookie, minting a new session id when absent.
pub async fn attach_session(mut req: Request, next: Next) -> Response {
    let existing = cookie_value(req.headers(), SESSION_COOKIE).and_then(|v| Uuid::parse_str(v).ok());
    let sid = existing.unwrap_or_else(Uuid::new_v4);
    req.extensions_mut().insert(SessionId(sid));

    let mut response = next.run(req).await;

    if existing.is_none() {
        let cookie = format!("{}={}; HttpOnly; Path=/; SameSite=Lax", SESSION_COOKIE, sid);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}
