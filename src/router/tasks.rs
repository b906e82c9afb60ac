//! Owner-scoped task CRUD, trash and subtasks.

use axum::extract::{Path, State};
use axum::routing::{delete, get, patch, post, put};
use axum::{Extension, Json, Router, http::StatusCode, middleware};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::notification::{Notification, NotificationRepository};
use crate::router::{ApiResponse, Deleted, Valid, ValidQuery};
use crate::task::{
    Category, Priority, Status, Subtask, Task, TaskChanges, TaskFilter, TaskRepository, TaskStats,
};
use crate::user::AuthUser;
use crate::{AppState, ServerError};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        // Fixed paths must come before parameterized ones.
        .route("/stats", get(stats))
        .route("/trash", get(trashed))
        .route("/", post(create).get(list))
        .route("/{id}", get(get_one).put(update).delete(soft_delete))
        .route("/{id}/status", patch(set_status))
        .route("/{id}/restore", post(restore))
        .route("/{id}/permanent", delete(permanent))
        .route("/{id}/subtasks", post(add_subtask))
        .route("/{id}/subtasks/{subtask_id}", put(set_subtask))
        .route_layer(middleware::from_fn_with_state(state, super::gate))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBody {
    #[validate(length(min = 1, max = 100, message = "Title cannot be more than 100 characters."))]
    pub title: String,
    #[validate(length(max = 500, message = "Description cannot be more than 500 characters."))]
    pub description: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub due_date: DateTime<Utc>,
}

/// Handler to create a task.
///
/// The owner and the trash flag always come from the gate, never from the
/// body. A task due on the current UTC day leaves one persisted `dueToday`
/// notice behind.
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Valid(body): Valid<CreateBody>,
) -> Result<(StatusCode, Json<ApiResponse<Task>>)> {
    let now = Utc::now();
    let status = body.status.unwrap_or_default();

    let task = TaskRepository::new(state.db.postgres.clone())
        .insert(&Task {
            id: Uuid::new_v4(),
            user_id: auth.id,
            title: body.title,
            description: body.description,
            status,
            priority: body.priority.unwrap_or_default(),
            category: body.category.unwrap_or_default(),
            tags: body.tags.unwrap_or_default(),
            due_date: body.due_date,
            completed_at: status.completed_at(now),
            is_trashed: false,
            subtasks: Vec::new(),
            created_at: now,
            updated_at: now,
        })
        .await?;

    if task.is_due_on(now.date_naive()) {
        NotificationRepository::new(state.db.postgres.clone())
            .insert(&Notification::due_today(auth.id, &task))
            .await?;
        tracing::debug!(task_id = %task.id, "due-today notice recorded");
    }

    Ok((StatusCode::CREATED, ApiResponse::new(task)))
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

/// Older clients send `status=all` to mean "no filter".
fn status_filter<'de, D>(deserializer: D) -> std::result::Result<Option<Status>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value.as_deref() {
        None | Some("") | Some("all") => Ok(None),
        Some(other) => serde_json::from_value(serde_json::Value::String(other.to_owned()))
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default, deserialize_with = "status_filter")]
    pub status: Option<Status>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub status: bool,
    pub results: usize,
    pub total: i64,
    pub data: Vec<Task>,
}

/// Handler to list non-trashed tasks, newest created first.
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> Result<Json<ListResponse>> {
    let filter = TaskFilter {
        status: query.status,
        priority: query.priority,
        page: query.page,
        limit: query.limit,
    };
    let (tasks, total) = TaskRepository::new(state.db.postgres.clone())
        .list(auth.id, &filter)
        .await?;

    Ok(Json(ListResponse {
        status: true,
        results: tasks.len(),
        total,
        data: tasks,
    }))
}

/// Handler for aggregate counters over non-trashed tasks.
pub async fn stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<TaskStats>>> {
    let stats = TaskRepository::new(state.db.postgres.clone())
        .stats(auth.id)
        .await?;

    Ok(ApiResponse::new(stats))
}

/// Handler to list trashed tasks, most recently updated first.
pub async fn trashed(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<Task>>>> {
    let tasks = TaskRepository::new(state.db.postgres.clone())
        .trashed(auth.id)
        .await?;

    Ok(ApiResponse::new(tasks))
}

/// Handler to read one task. A foreign or trashed task is indistinguishable
/// from a missing one.
pub async fn get_one(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Task>>> {
    let task = TaskRepository::new(state.db.postgres.clone())
        .find(auth.id, task_id, false)
        .await?
        .ok_or(ServerError::NotFound("task"))?;

    Ok(ApiResponse::new(task))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBody {
    #[validate(length(min = 1, max = 100, message = "Title cannot be more than 100 characters."))]
    pub title: Option<String>,
    #[validate(length(max = 500, message = "Description cannot be more than 500 characters."))]
    pub description: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Handler for merge-update of provided fields.
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Valid(body): Valid<UpdateBody>,
) -> Result<Json<ApiResponse<Task>>> {
    let changes = TaskChanges {
        title: body.title,
        description: body.description,
        status: body.status,
        priority: body.priority,
        category: body.category,
        tags: body.tags,
        due_date: body.due_date,
    };
    let task = TaskRepository::new(state.db.postgres.clone())
        .update(auth.id, task_id, changes)
        .await?
        .ok_or(ServerError::NotFound("task"))?;

    Ok(ApiResponse::new(task))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StatusBody {
    pub status: Status,
}

/// Handler for status transitions. Any member of the value set is reachable
/// from any other.
pub async fn set_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Valid(body): Valid<StatusBody>,
) -> Result<Json<ApiResponse<Task>>> {
    let task = TaskRepository::new(state.db.postgres.clone())
        .set_status(auth.id, task_id, body.status)
        .await?
        .ok_or(ServerError::NotFound("task"))?;

    Ok(ApiResponse::new(task))
}

/// Handler to move a task to trash. Idempotent.
pub async fn soft_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Deleted>>> {
    let found = TaskRepository::new(state.db.postgres.clone())
        .trash(auth.id, task_id)
        .await?;
    if !found {
        return Err(ServerError::NotFound("task"));
    }

    Ok(ApiResponse::new(Deleted { id: task_id }))
}

/// Handler to restore a task from trash.
pub async fn restore(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Task>>> {
    let task = TaskRepository::new(state.db.postgres.clone())
        .restore(auth.id, task_id)
        .await?
        .ok_or(ServerError::NotFound("task"))?;

    Ok(ApiResponse::new(task))
}

/// Handler for irreversible deletion, only reachable from trash.
pub async fn permanent(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Deleted>>> {
    let found = TaskRepository::new(state.db.postgres.clone())
        .delete_permanently(auth.id, task_id)
        .await?;
    if !found {
        return Err(ServerError::NotFound("task"));
    }

    Ok(ApiResponse::new(Deleted { id: task_id }))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SubtaskBody {
    #[validate(length(min = 1, max = 100, message = "Title cannot be more than 100 characters."))]
    pub title: String,
}

/// Handler to append a subtask.
pub async fn add_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Valid(body): Valid<SubtaskBody>,
) -> Result<Json<ApiResponse<Task>>> {
    let repo = TaskRepository::new(state.db.postgres.clone());
    let mut task = repo
        .find(auth.id, task_id, false)
        .await?
        .ok_or(ServerError::NotFound("task"))?;

    task.subtasks.push(Subtask::new(&body.title));

    let task = repo
        .save_subtasks(auth.id, task_id, &task.subtasks)
        .await?
        .ok_or(ServerError::NotFound("task"))?;

    Ok(ApiResponse::new(task))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SubtaskStatusBody {
    pub completed: bool,
}

/// Handler to flip one subtask.
pub async fn set_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((task_id, subtask_id)): Path<(Uuid, Uuid)>,
    Valid(body): Valid<SubtaskStatusBody>,
) -> Result<Json<ApiResponse<Task>>> {
    let repo = TaskRepository::new(state.db.postgres.clone());
    let mut task = repo
        .find(auth.id, task_id, false)
        .await?
        .ok_or(ServerError::NotFound("task"))?;

    let subtask = task
        .subtasks
        .iter_mut()
        .find(|subtask| subtask.id == subtask_id)
        .ok_or(ServerError::NotFound("subtask"))?;
    subtask.completed = body.completed;

    let task = repo
        .save_subtasks(auth.id, task_id, &task.subtasks)
        .await?
        .ok_or(ServerError::NotFound("task"))?;

    Ok(ApiResponse::new(task))
}
