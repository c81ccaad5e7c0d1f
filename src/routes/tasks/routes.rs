use axum::{Json, extract::{State, Path, Query}, http::StatusCode, response::IntoResponse};
use tracing::error;
use uuid::Uuid;
use crate::error::StoreError;
use crate::state::AppState;
use crate::routes::middleware_auth::JwtUser;
use crate::store::{NewTask, TaskPatch, TaskQuery, TaskRef};
use crate::todos::{is_valid_entry, Task};
use super::dto::{CreateTask, ListTasks, UpdateTask};

fn store_failure(action: &str, e: StoreError) -> (StatusCode, String) {
    match e {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "Task not found".to_string()),
        other => {
            error!("Error {} task: {}", action, other);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed {} task", action))
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    JwtUser(user_id): JwtUser,
    Json(body): Json<CreateTask>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if !is_valid_entry(&body.text) {
        return Err((StatusCode::BAD_REQUEST, "text must not be blank".to_string()));
    }

    let new_task = NewTask::new(user_id, body.text);
    let (text, created_at) = (new_task.text.clone(), new_task.created_at);
    let id = state.store.insert(new_task).await.map_err(|e| store_failure("creating", e))?;

    let task = Task {
        id,
        user_id,
        text,
        completed: false,
        created_at,
    };
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list(
    State(state): State<AppState>,
    JwtUser(user_id): JwtUser,
    Query(params): Query<ListTasks>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let query = TaskQuery { user_id, order: params.order };
    let tasks = state
        .store
        .query(&query)
        .await
        .map_err(|e| store_failure("listing", e))?;

    Ok(Json(tasks))
}

pub async fn update(
    State(state): State<AppState>,
    JwtUser(user_id): JwtUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTask>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let patch = TaskPatch { completed: Some(body.completed) };
    state
        .store
        .update(TaskRef { id, user_id }, patch)
        .await
        .map_err(|e| store_failure("updating", e))?;

    Ok(Json(serde_json::json!({"updated": true})))
}

pub async fn delete(
    State(state): State<AppState>,
    JwtUser(user_id): JwtUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .store
        .delete(TaskRef { id, user_id })
        .await
        .map_err(|e| store_failure("deleting", e))?;

    Ok(Json(serde_json::json!({"deleted": true})))
}
