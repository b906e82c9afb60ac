mod repository;

pub use repository::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::Task;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "camelCase")]
#[sqlx(type_name = "notice_type", rename_all = "camelCase")]
pub enum NotiType {
    #[default]
    Alert,
    Message,
    DueToday,
}

/// Notification as saved on database.
///
/// Due-today notices synthesized at read time share this shape but are never
/// persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    #[serde(rename = "task")]
    pub task_id: Option<Uuid>,
    pub message: String,
    pub noti_type: NotiType,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Due-today notice for a task.
    pub fn due_today(owner: Uuid, task: &Task) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: owner,
            task_id: Some(task.id),
            message: task.due_today_message(),
            noti_type: NotiType::DueToday,
            read: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Category, Priority, Status};

    #[test]
    fn test_due_today_notice() {
        let owner = Uuid::new_v4();
        let task = Task {
            id: Uuid::new_v4(),
            user_id: owner,
            title: "Pay rent".into(),
            description: None,
            status: Status::Todo,
            priority: Priority::High,
            category: Category::Personal,
            tags: Vec::new(),
            due_date: Utc::now(),
            completed_at: None,
            is_trashed: false,
            subtasks: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let notice = Notification::due_today(owner, &task);

        assert_eq!(notice.user_id, owner);
        assert_eq!(notice.task_id, Some(task.id));
        assert_eq!(notice.noti_type, NotiType::DueToday);
        assert_eq!(notice.message, "Task \"Pay rent\" is due today!");
        assert!(!notice.read);
    }

    #[test]
    fn test_noti_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&NotiType::DueToday).unwrap(),
            "\"dueToday\""
        );
        assert_eq!(serde_json::to_string(&NotiType::Alert).unwrap(), "\"alert\"");
    }
}
