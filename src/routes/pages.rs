// src/routes/pages.rs
use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use super::middleware_auth::SessionIdentity;
use super::session::SessionId;
use crate::error::TodoError;
use crate::state::AppState;
use crate::todos::controller::ListController;
use crate::todos::view::render_todo_page;

#[derive(Deserialize)]
pub struct AddTodo {
    pub text: String,
}

/// Activates the session's list and feeds it the request's identity.
async fn session_list(
    state: &AppState,
    session: SessionId,
    identity: SessionIdentity,
) -> Result<ListController, TodoError> {
    let list = state.sessions.activate(session.0).await;
    list.set_identity(identity.0).await?;
    Ok(list)
}

fn failure(e: TodoError) -> Response {
    match e {
        TodoError::SignedOut => Redirect::to("/signin").into_response(),
        other => {
            error!("todo list action failed: {}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update todo list").into_response()
        }
    }
}

// HANDLERS

pub async fn show(
    State(state): State<AppState>,
    session: SessionId,
    identity: SessionIdentity,
) -> Response {
    let list = match session_list(&state, session, identity).await {
        Ok(list) => list,
        Err(e) => return failure(e),
    };

    match list.identity().await {
        Some(identity) => {
            let page = render_todo_page(&identity, &list.input().await, &list.tasks().await);
            Html(page).into_response()
        }
        None => Redirect::to("/signin").into_response(),
    }
}

pub async fn add(
    State(state): State<AppState>,
    session: SessionId,
    identity: SessionIdentity,
    Form(payload): Form<AddTodo>,
) -> Response {
    let list = match session_list(&state, session, identity).await {
        Ok(list) => list,
        Err(e) => return failure(e),
    };

    list.set_input(payload.text.as_str()).await;
    match list.add_task(&payload.text).await {
        Ok(_) => Redirect::to("/todos").into_response(),
        Err(e) => failure(e),
    }
}

pub async fn toggle(
    State(state): State<AppState>,
    session: SessionId,
    identity: SessionIdentity,
    Path(id): Path<Uuid>,
) -> Response {
    let list = match session_list(&state, session, identity).await {
        Ok(list) => list,
        Err(e) => return failure(e),
    };

    // the remote write keeps running after the redirect
    match list.toggle_task(id).await {
        Ok(_) => Redirect::to("/todos").into_response(),
        Err(e) => failure(e),
    }
}

pub async fn delete(
    State(state): State<AppState>,
    session: SessionId,
    identity: SessionIdentity,
    Path(id): Path<Uuid>,
) -> Response {
    let list = match session_list(&state, session, identity).await {
        Ok(list) => list,
        Err(e) => return failure(e),
    };

    match list.delete_task(id).await {
        Ok(_) => Redirect::to("/todos").into_response(),
        Err(e) => failure(e),
    }
}
