use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

use mindplan_core::{MindMapNode, PlanError, PlanGenerator};
use mindplan_db::models::Todo;
use mindplan_db::queries::todos as todo_db;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::EmptyGoal => Self::bad_request(err.to_string()),
            // Provider details (URLs, response bodies) stay in the server log.
            PlanError::Provider(_) => Self::bad_gateway("failed to generate plan"),
            PlanError::Unparseable(_) | PlanError::InvalidTree(_) => {
                Self::bad_gateway(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Procedure inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateTodoInput {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleTodoInput {
    pub id: i32,
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct TodoIdInput {
    pub id: i32,
}

#[derive(Debug, Deserialize)]
pub struct GeneratePlanInput {
    pub goal: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub planner: Arc<PlanGenerator>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/rpc/healthCheck", post(health_check))
        .route("/rpc/todo.getAll", post(todo_get_all))
        .route("/rpc/todo.create", post(todo_create))
        .route("/rpc/todo.toggle", post(todo_toggle))
        .route("/rpc/todo.delete", post(todo_delete))
        .route("/rpc/ai.generatePlan", post(ai_generate_plan))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("mindplan serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("mindplan serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

async fn index(State(state): State<AppState>) -> Result<axum::response::Response, AppError> {
    let todos = todo_db::list_todos(&state.pool)
        .await
        .map_err(AppError::internal)?;

    let rows = if todos.is_empty() {
        "<li>No todos yet.</li>".to_string()
    } else {
        todos
            .iter()
            .map(|t| {
                let text = escape_html(&t.text);
                if t.completed {
                    format!("<li><s>{text}</s></li>")
                } else {
                    format!("<li>{text}</li>")
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let html = format!(
        "<!DOCTYPE html>\
<html><head><title>mindplan</title></head><body>\
<h1>mindplan</h1>\
<ul>{rows}</ul>\
</body></html>"
    );

    Ok(Html(html).into_response())
}

async fn health_check() -> Json<&'static str> {
    Json("OK")
}

async fn todo_get_all(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, AppError> {
    let todos = todo_db::list_todos(&state.pool)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(todos))
}

async fn todo_create(
    State(state): State<AppState>,
    Json(input): Json<CreateTodoInput>,
) -> Result<Json<Todo>, AppError> {
    if input.text.trim().is_empty() {
        return Err(AppError::bad_request("text must not be empty"));
    }
    let todo = todo_db::insert_todo(&state.pool, &input.text)
        .await
        .map_err(AppError::internal)?;
    tracing::debug!(id = todo.id, "todo created");
    Ok(Json(todo))
}

async fn todo_toggle(
    State(state): State<AppState>,
    Json(input): Json<ToggleTodoInput>,
) -> Result<Json<Todo>, AppError> {
    let todo = todo_db::set_completed(&state.pool, input.id, input.completed)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("todo {} not found", input.id)))?;
    Ok(Json(todo))
}

async fn todo_delete(
    State(state): State<AppState>,
    Json(input): Json<TodoIdInput>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = todo_db::delete_todo(&state.pool, input.id)
        .await
        .map_err(AppError::internal)?;
    if !deleted {
        return Err(AppError::not_found(format!("todo {} not found", input.id)));
    }
    Ok(Json(serde_json::json!({ "deleted": true, "id": input.id })))
}

async fn ai_generate_plan(
    State(state): State<AppState>,
    Json(input): Json<GeneratePlanInput>,
) -> Result<Json<MindMapNode>, AppError> {
    let root = state.planner.generate_plan(&input.goal).await?;
    Ok(Json(root))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
