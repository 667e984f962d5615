//! Database query functions for the `todos` table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::Todo;

/// List every todo in creation order.
pub async fn list_todos(pool: &PgPool) -> Result<Vec<Todo>> {
    let todos = sqlx::query_as::<_, Todo>("SELECT * FROM todos ORDER BY id ASC")
        .fetch_all(pool)
        .await
        .context("failed to list todos")?;

    Ok(todos)
}

/// Fetch a todo by its ID.
pub async fn get_todo(pool: &PgPool, id: i32) -> Result<Option<Todo>> {
    let todo = sqlx::query_as::<_, Todo>("SELECT * FROM todos WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch todo")?;

    Ok(todo)
}

/// Insert a new, uncompleted todo. Returns the row with server-generated
/// defaults (id, created_at).
pub async fn insert_todo(pool: &PgPool, text: &str) -> Result<Todo> {
    let todo = sqlx::query_as::<_, Todo>(
        "INSERT INTO todos (text) \
         VALUES ($1) \
         RETURNING *",
    )
    .bind(text)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert todo {text:?}"))?;

    Ok(todo)
}

/// Set the completion flag of a todo.
///
/// Returns `None` when no todo has the given ID.
pub async fn set_completed(pool: &PgPool, id: i32, completed: bool) -> Result<Option<Todo>> {
    let todo = sqlx::query_as::<_, Todo>(
        "UPDATE todos SET completed = $1 WHERE id = $2 RETURNING *",
    )
    .bind(completed)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to update todo")?;

    Ok(todo)
}

/// Delete a todo. Returns `true` if a row was removed.
pub async fn delete_todo(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM todos WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete todo")?;

    Ok(result.rows_affected() > 0)
}
