use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{NewTask, SortOrder, TaskPatch, TaskQuery, TaskRef, TaskStore};
use crate::error::StoreError;
use crate::todos::Task;

/// `TaskStore` over the `todos` table.
#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn classify(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Unavailable(e.to_string()),
        other => StoreError::Database(other),
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn query(&self, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let sql = match query.order {
            SortOrder::Ascending => {
                r#"
                SELECT id, user_id, text, completed, created_at
                FROM todos
                WHERE user_id = $1
                ORDER BY created_at ASC
                "#
            }
            SortOrder::Descending => {
                r#"
                SELECT id, user_id, text, completed, created_at
                FROM todos
                WHERE user_id = $1
                ORDER BY created_at DESC
                "#
            }
        };

        let rec = sqlx::query_as::<_, Task>(sql)
            .bind(query.user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;

        Ok(rec)
    }

    async fn insert(&self, task: NewTask) -> Result<Uuid, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO todos (id, user_id, text, completed, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(task.user_id)
        .bind(&task.text)
        .bind(task.completed)
        .bind(task.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(id)
    }

    async fn update(&self, target: TaskRef, patch: TaskPatch) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE todos
            SET completed = COALESCE($3, completed)
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(target.id)
        .bind(target.user_id)
        .bind(patch.completed)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(target.id));
        }

        Ok(())
    }

    async fn delete(&self, target: TaskRef) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            DELETE FROM todos
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(target.id)
        .bind(target.user_id)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(())
    }
}
