use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        OriginalUri, Path, State,
    },
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics::{counter, describe_counter};
use serde::Deserialize;
use todo_backend_core::{ServiceError, Todo, TodoId, TodoPatch};
use tracing::info;

use crate::problem::{from_service_error, ProblemResponse};
use crate::router::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/incomplete", get(list_incomplete_todos))
        .route(
            "/todos/:id",
            get(get_todo).patch(update_todo).delete(delete_todo),
        )
}

#[derive(Debug, Deserialize)]
struct CreateTodoRequest {
    #[serde(default)]
    description: Option<String>,
}

pub fn describe_metrics() {
    describe_counter!(
        "todo_operations_total",
        "Count of todo service operations, labelled by operation and result"
    );
}

/// Records the outcome of a service call in `todo_operations_total`.
fn observe<T>(operation: &'static str, result: &Result<T, ServiceError>) {
    let outcome = if result.is_ok() { "ok" } else { "error" };
    counter!("todo_operations_total", "operation" => operation, "result" => outcome).increment(1);
}

fn todo_id(path: Result<Path<i64>, PathRejection>, uri: &str) -> Result<TodoId, ProblemResponse> {
    let Path(raw) = path.map_err(|rejection| {
        ProblemResponse::new(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            format!("todo id must be an integer: {}", rejection.body_text()),
        )
        .with_instance(uri)
    })?;
    Ok(TodoId::new(raw))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>, uri: &str) -> Result<T, ProblemResponse> {
    let Json(value) = body.map_err(|rejection| {
        ProblemResponse::new(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            rejection.body_text(),
        )
        .with_instance(uri)
    })?;
    Ok(value)
}

async fn list_todos(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Vec<Todo>>, ProblemResponse> {
    let result = state.todos().get_all_todos().await;
    observe("list", &result);
    let todos = result.map_err(|err| from_service_error(err, &method, uri.path()))?;
    Ok(Json(todos))
}

async fn list_incomplete_todos(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Vec<Todo>>, ProblemResponse> {
    let result = state.todos().get_incomplete_todos().await;
    observe("list_incomplete", &result);
    let todos = result.map_err(|err| from_service_error(err, &method, uri.path()))?;
    Ok(Json(todos))
}

async fn get_todo(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Todo>, ProblemResponse> {
    let id = todo_id(path, uri.path())?;
    let result = state.todos().get_todo(id).await;
    observe("get", &result);
    let todo = result.map_err(|err| from_service_error(err, &method, uri.path()))?;
    Ok(Json(todo))
}

async fn create_todo(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<Response, ProblemResponse> {
    let request = json_body(body, uri.path())?;
    let Some(description) = request.description else {
        return Err(ProblemResponse::new(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "Description is required.",
        )
        .with_field_error("description", "Description is required.")
        .with_instance(uri.path()));
    };

    let result = state.todos().create_todo(&description).await;
    observe("create", &result);
    let todo = result.map_err(|err| from_service_error(err, &method, uri.path()))?;

    info!(stage = "api", todo_id = %todo.id(), "todo created");
    let location = format!("/todos/{}", todo.id());
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(todo)).into_response())
}

async fn update_todo(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<TodoPatch>, JsonRejection>,
) -> Result<Json<Todo>, ProblemResponse> {
    let id = todo_id(path, uri.path())?;
    let patch = json_body(body, uri.path())?;

    let result = state.todos().update_todo(id, &patch).await;
    observe("update", &result);
    let todo = result.map_err(|err| from_service_error(err, &method, uri.path()))?;

    info!(
        stage = "api",
        todo_id = %id,
        description_changed = patch.description.is_some(),
        is_completed = ?patch.is_completed,
        "todo updated"
    );
    Ok(Json(todo))
}

async fn delete_todo(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ProblemResponse> {
    let id = todo_id(path, uri.path())?;
    let result = state.todos().delete_todo(id).await;
    observe("delete", &result);
    result.map_err(|err| from_service_error(err, &method, uri.path()))?;

    info!(stage = "api", todo_id = %id, "todo deleted");
    Ok(StatusCode::NO_CONTENT)
}
