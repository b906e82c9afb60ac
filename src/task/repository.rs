//! Handle database requests for tasks.
//!
//! Every query is owner-scoped: a task belonging to another user is
//! indistinguishable from a missing one. Trashed tasks are excluded unless a
//! reader explicitly asks for them.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::Result;
use crate::task::{Subtask, Task, TaskChanges, TaskFilter, TaskStats};

const TASK_COLUMNS: &str = "id, user_id, title, description, status, priority, category, tags, \
                            due_date, completed_at, is_trashed, subtasks, created_at, updated_at";

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone)]
pub struct TaskRepository {
    pool: Pool<Postgres>,
}

impl TaskRepository {
    /// Create a new [`TaskRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert [`Task`] into database.
    pub async fn insert(&self, task: &Task) -> Result<Task> {
        let query = format!(
            r#"INSERT INTO tasks
                (id, user_id, title, description, status, priority, category, tags,
                 due_date, completed_at, is_trashed, subtasks)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                RETURNING {TASK_COLUMNS}"#
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(task.id)
            .bind(task.user_id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.status)
            .bind(task.priority)
            .bind(task.category)
            .bind(&task.tags)
            .bind(task.due_date)
            .bind(task.completed_at)
            .bind(task.is_trashed)
            .bind(sqlx::types::Json(&task.subtasks))
            .fetch_one(&self.pool)
            .await?;

        Ok(task)
    }

    /// Find one task by id, owner-scoped.
    pub async fn find(
        &self,
        owner: Uuid,
        task_id: Uuid,
        include_trashed: bool,
    ) -> Result<Option<Task>> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = "
        ));
        builder.push_bind(owner);
        builder.push(" AND id = ");
        builder.push_bind(task_id);
        if !include_trashed {
            builder.push(" AND NOT is_trashed");
        }

        Ok(builder
            .build_query_as::<Task>()
            .fetch_optional(&self.pool)
            .await?)
    }

    /// List non-trashed tasks with optional equality filters, newest created
    /// first. Returns the matching page and the unpaginated total.
    pub async fn list(&self, owner: Uuid, filter: &TaskFilter) -> Result<(Vec<Task>, i64)> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM tasks");
        push_filters(&mut count, owner, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        // Page and limit are caller-controlled; saturate so an i64::MAX page
        // yields an empty page instead of a wrapped negative offset.
        let limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        let offset = filter.page.max(1).saturating_sub(1).saturating_mul(limit);

        let mut builder = QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));
        push_filters(&mut builder, owner, filter);
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let tasks = builder
            .build_query_as::<Task>()
            .fetch_all(&self.pool)
            .await?;

        Ok((tasks, total))
    }

    /// List trashed tasks, most recently updated first.
    pub async fn trashed(&self, owner: Uuid) -> Result<Vec<Task>> {
        let query = format!(
            r#"SELECT {TASK_COLUMNS} FROM tasks
                WHERE user_id = $1 AND is_trashed
                ORDER BY updated_at DESC"#
        );

        Ok(sqlx::query_as::<_, Task>(&query)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Merge-update of the provided fields. The `completed_at` invariant is
    /// recomputed whenever the status changes.
    pub async fn update(
        &self,
        owner: Uuid,
        task_id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Task>> {
        let Some(mut task) = self.find(owner, task_id, false).await? else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = Some(description);
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(category) = changes.category {
            task.category = category;
        }
        if let Some(tags) = changes.tags {
            task.tags = tags;
        }
        if let Some(due_date) = changes.due_date {
            task.due_date = due_date;
        }
        if let Some(status) = changes.status {
            if status != task.status {
                task.completed_at = status.completed_at(Utc::now());
            }
            task.status = status;
        }

        let query = format!(
            r#"UPDATE tasks
                SET title = $3, description = $4, status = $5, priority = $6,
                    category = $7, tags = $8, due_date = $9, completed_at = $10,
                    updated_at = NOW()
                WHERE id = $1 AND user_id = $2
                RETURNING {TASK_COLUMNS}"#
        );

        Ok(sqlx::query_as::<_, Task>(&query)
            .bind(task.id)
            .bind(owner)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.status)
            .bind(task.priority)
            .bind(task.category)
            .bind(&task.tags)
            .bind(task.due_date)
            .bind(task.completed_at)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Status transition. An already-completed task keeps its original
    /// completion timestamp.
    pub async fn set_status(
        &self,
        owner: Uuid,
        task_id: Uuid,
        status: crate::task::Status,
    ) -> Result<Option<Task>> {
        let query = format!(
            r#"UPDATE tasks
                SET status = $3,
                    completed_at = CASE
                        WHEN $3 = 'completed'::task_status THEN COALESCE(completed_at, NOW())
                        ELSE NULL
                    END,
                    updated_at = NOW()
                WHERE id = $1 AND user_id = $2 AND NOT is_trashed
                RETURNING {TASK_COLUMNS}"#
        );

        Ok(sqlx::query_as::<_, Task>(&query)
            .bind(task_id)
            .bind(owner)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Soft delete. Idempotent: trashing an already-trashed task succeeds.
    pub async fn trash(&self, owner: Uuid, task_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE tasks SET is_trashed = TRUE, updated_at = NOW()
                WHERE id = $1 AND user_id = $2"#,
        )
        .bind(task_id)
        .bind(owner)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Un-trash. Only valid from the trashed state.
    pub async fn restore(&self, owner: Uuid, task_id: Uuid) -> Result<Option<Task>> {
        let query = format!(
            r#"UPDATE tasks SET is_trashed = FALSE, updated_at = NOW()
                WHERE id = $1 AND user_id = $2 AND is_trashed
                RETURNING {TASK_COLUMNS}"#
        );

        Ok(sqlx::query_as::<_, Task>(&query)
            .bind(task_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Irreversible removal, only reachable from the trashed state.
    pub async fn delete_permanently(&self, owner: Uuid, task_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"DELETE FROM tasks WHERE id = $1 AND user_id = $2 AND is_trashed"#,
        )
        .bind(task_id)
        .bind(owner)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace the subtask list of a non-trashed task.
    pub async fn save_subtasks(
        &self,
        owner: Uuid,
        task_id: Uuid,
        subtasks: &[Subtask],
    ) -> Result<Option<Task>> {
        let query = format!(
            r#"UPDATE tasks SET subtasks = $3, updated_at = NOW()
                WHERE id = $1 AND user_id = $2 AND NOT is_trashed
                RETURNING {TASK_COLUMNS}"#
        );

        Ok(sqlx::query_as::<_, Task>(&query)
            .bind(task_id)
            .bind(owner)
            .bind(sqlx::types::Json(subtasks))
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Aggregate counters over non-trashed tasks; all-zero when the owner has
    /// none.
    pub async fn stats(&self, owner: Uuid) -> Result<TaskStats> {
        let stats = sqlx::query_as::<_, TaskStats>(
            r#"SELECT
                    COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                    COUNT(*) FILTER (WHERE status = 'in-progress') AS in_progress,
                    COUNT(*) FILTER (WHERE status = 'todo') AS todo,
                    COUNT(*) FILTER (WHERE priority = 'high') AS high_priority,
                    COUNT(*) FILTER (WHERE priority = 'medium') AS medium_priority,
                    COUNT(*) FILTER (WHERE priority = 'low') AS low_priority
                FROM tasks
                WHERE user_id = $1 AND NOT is_trashed"#,
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    /// Active, non-completed tasks whose due date falls on the given UTC day.
    pub async fn due_on(&self, owner: Uuid, day: chrono::NaiveDate) -> Result<Vec<Task>> {
        let start: DateTime<Utc> = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
        let end = start + chrono::Duration::days(1);

        let query = format!(
            r#"SELECT {TASK_COLUMNS} FROM tasks
                WHERE user_id = $1
                    AND NOT is_trashed
                    AND status <> 'completed'
                    AND due_date >= $2 AND due_date < $3
                ORDER BY due_date"#
        );

        Ok(sqlx::query_as::<_, Task>(&query)
            .bind(owner)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, owner: Uuid, filter: &TaskFilter) {
    builder.push(" WHERE user_id = ");
    builder.push_bind(owner);
    builder.push(" AND NOT is_trashed");

    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    if let Some(priority) = filter.priority {
        builder.push(" AND priority = ");
        builder.push_bind(priority);
    }
}
