mod repository;

pub use repository::*;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary task lifecycle.
///
/// Every value-set member is reachable from every other one; only membership
/// is enforced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Completed,
}

impl Status {
    /// `completed_at` is derived, never independently settable: non-null if
    /// and only if the status is `completed`.
    pub fn completed_at(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Status::Completed => Some(now),
            Status::Todo | Status::InProgress => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "task_category", rename_all = "lowercase")]
pub enum Category {
    Work,
    Personal,
    Shopping,
    Health,
    #[default]
    Other,
}

/// Subtask owned exclusively by its parent [`Task`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
}

impl Subtask {
    pub fn new(title: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_owned(),
            completed: false,
        }
    }
}

/// Task as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    pub category: Category,
    pub tags: Vec<String>,
    pub due_date: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_trashed: bool,
    #[sqlx(json)]
    pub subtasks: Vec<Subtask>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether the due date falls on `day`, midnight-normalized.
    pub fn is_due_on(&self, day: NaiveDate) -> bool {
        self.due_date.date_naive() == day
    }

    pub fn due_today_message(&self) -> String {
        format!("Task \"{}\" is due today!", self.title)
    }
}

/// Optional fields of a merge-update; absent fields keep their stored value.
#[derive(Debug, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Listing filter with 1-based pagination.
#[derive(Debug)]
pub struct TaskFilter {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub page: i64,
    pub limit: i64,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            page: 1,
            limit: 10,
        }
    }
}

/// Aggregate counters over non-trashed tasks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: i64,
    pub completed: i64,
    pub in_progress: i64,
    pub todo: i64,
    pub high_priority: i64,
    pub medium_priority: i64,
    pub low_priority: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_completed_at_follows_status() {
        let now = Utc::now();

        assert_eq!(Status::Completed.completed_at(now), Some(now));
        assert_eq!(Status::Todo.completed_at(now), None);
        assert_eq!(Status::InProgress.completed_at(now), None);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&Status::InProgress).unwrap(),
            "\"in-progress\""
        );
        assert_eq!(
            serde_json::from_str::<Status>("\"todo\"").unwrap(),
            Status::Todo
        );
        assert!(serde_json::from_str::<Status>("\"pending\"").is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Status::default(), Status::Todo);
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(Category::default(), Category::Other);
    }

    #[test]
    fn test_is_due_on() {
        let task = Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Pay rent".into(),
            description: None,
            status: Status::Todo,
            priority: Priority::Medium,
            category: Category::Other,
            tags: Vec::new(),
            due_date: Utc.with_ymd_and_hms(2025, 6, 1, 18, 30, 0).unwrap(),
            completed_at: None,
            is_trashed: false,
            subtasks: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(task.is_due_on(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()));
        assert!(!task.is_due_on(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()));
        assert_eq!(task.due_today_message(), "Task \"Pay rent\" is due today!");
    }

    #[test]
    fn test_new_subtask_starts_uncompleted() {
        let subtask = Subtask::new("buy stamps");
        assert_eq!(subtask.title, "buy stamps");
        assert!(!subtask.completed);
    }
}
