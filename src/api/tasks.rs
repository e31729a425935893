//! Downstream tasks-API handlers.
//!
//! Glue call sites that consume the delegated credential: each handler reads
//! the access token from the context carrier and calls the resource API on
//! the user's behalf.

use super::oauth::AppError;
use super::token_middleware::CurrentToken;
use axum::{
    extract::{Path, State},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::warn;

const PAGE_SIZE: u32 = 100;

/// A task list owned by the user
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskList {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub updated: Option<String>,
}

/// A task within a task list
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub due: Option<String>,
}

/// One page of a paginated resource-API listing
#[derive(Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct Page<T> {
    #[serde(default)]
    items: Vec<T>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

/// Shared application state for the tasks handlers
#[derive(Clone)]
pub struct TasksAppState {
    pub http: reqwest::Client,
    /// Resource API base, e.g. https://tasks.googleapis.com/tasks/v1
    pub base_url: String,
}

/// Create the tasks router with the credential-injection layer applied
pub fn create_tasks_router(
    state: TasksAppState,
    layer_state: super::TokenLayerState,
) -> Router {
    Router::new()
        .route("/api/tasklist", get(list_tasklists))
        .route("/api/tasklist/:tasklist_id", get(list_tasks))
        .route_layer(middleware::from_fn_with_state(
            layer_state,
            super::require_token,
        ))
        .with_state(state)
}

/// GET /api/tasklist - list the user's task lists
async fn list_tasklists(
    State(state): State<TasksAppState>,
    CurrentToken(credentials): CurrentToken,
) -> Result<Json<Vec<TaskList>>, AppError> {
    let url = format!("{}/users/@me/lists", state.base_url);
    let page: Page<TaskList> =
        fetch_page(&state.http, &url, &credentials.access_token, None).await?;
    Ok(Json(page.items))
}

/// GET /api/tasklist/:tasklist_id - list the tasks in one task list,
/// following nextPageToken pagination
async fn list_tasks(
    State(state): State<TasksAppState>,
    Path(tasklist_id): Path<String>,
    CurrentToken(credentials): CurrentToken,
) -> Result<Json<Vec<Task>>, AppError> {
    let url = format!("{}/lists/{}/tasks", state.base_url, tasklist_id);

    let mut page: Page<Task> =
        fetch_page(&state.http, &url, &credentials.access_token, None).await?;
    let mut items = page.items;

    while let Some(token) = page.next_page_token.take() {
        page = match fetch_page(&state.http, &url, &credentials.access_token, Some(&token)).await {
            Ok(page) => page,
            Err(AppError::Upstream(msg)) => {
                // Partial results beat a hard failure once the first page is in
                warn!(error = %msg, "task page fetch failed mid-pagination");
                break;
            }
            Err(other) => return Err(other),
        };
        items.append(&mut page.items);
    }

    Ok(Json(items))
}

async fn fetch_page<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    access_token: &str,
    page_token: Option<&str>,
) -> Result<Page<T>, AppError> {
    let mut request = client
        .get(url)
        .bearer_auth(access_token)
        .query(&[("maxResults", PAGE_SIZE.to_string())]);
    if let Some(token) = page_token {
        request = request.query(&[("pageToken", token)]);
    }

    let response = request
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("tasks API request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::Upstream(format!(
            "tasks API returned {}",
            response.status()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("tasks API response invalid: {}", e)))
}
