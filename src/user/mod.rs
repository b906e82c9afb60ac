mod repository;

pub use repository::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::{Priority, Status};

/// User as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Free-text role label, not an authorization level.
    pub role: String,
    #[serde(skip)]
    pub password: String,
    pub is_admin: bool,
    /// Deactivated users must be refused authentication.
    pub is_active: bool,
    #[sqlx(json)]
    pub settings: Settings,
    pub created_at: DateTime<Utc>,
}

/// Authenticated identity attached to every protected request.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
}

/// Per-user preferences, stored as one JSONB document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Settings {
    pub notifications: NotificationSettings,
    pub display: DisplaySettings,
    pub task_defaults: TaskDefaults,
}

impl Settings {
    /// Merge a partial update, section by section.
    pub fn merge(&mut self, patch: SettingsPatch) {
        if let Some(notifications) = patch.notifications {
            self.notifications = notifications;
        }
        if let Some(display) = patch.display {
            self.display = display;
        }
        if let Some(task_defaults) = patch.task_defaults {
            self.task_defaults = task_defaults;
        }
    }
}

/// Sections of a settings update; absent sections keep their stored value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SettingsPatch {
    pub notifications: Option<NotificationSettings>,
    pub display: Option<DisplaySettings>,
    pub task_defaults: Option<TaskDefaults>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct NotificationSettings {
    pub email_notifications: bool,
    pub task_reminders: bool,
    pub weekly_digest: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            task_reminders: true,
            weekly_digest: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DisplaySettings {
    pub dark_mode: bool,
    pub compact_view: bool,
    pub show_completed_tasks: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            compact_view: false,
            show_completed_tasks: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct TaskDefaults {
    pub default_priority: Priority,
    pub default_status: Status,
    /// Due-date offset in days applied by the client form.
    pub default_due_in_days: u8,
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self {
            default_priority: Priority::Medium,
            default_status: Status::Todo,
            default_due_in_days: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();

        assert!(settings.notifications.email_notifications);
        assert!(settings.notifications.task_reminders);
        assert!(!settings.notifications.weekly_digest);
        assert!(!settings.display.dark_mode);
        assert!(settings.display.show_completed_tasks);
        assert_eq!(settings.task_defaults.default_priority, Priority::Medium);
        assert_eq!(settings.task_defaults.default_status, Status::Todo);
        assert_eq!(settings.task_defaults.default_due_in_days, 7);
    }

    #[test]
    fn test_settings_parse_empty_document() {
        // Rows inserted before a settings write hold '{}'.
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_merge_replaces_only_provided_sections() {
        let mut settings = Settings::default();
        let patch: SettingsPatch =
            serde_json::from_str(r#"{"display": {"darkMode": true}}"#).unwrap();

        settings.merge(patch);

        assert!(settings.display.dark_mode);
        assert!(settings.display.show_completed_tasks);
        assert_eq!(settings.notifications, NotificationSettings::default());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<SettingsPatch>(r#"{"theme": "dark"}"#).is_err());
        assert!(
            serde_json::from_str::<Settings>(r#"{"display": {"fontSize": 12}}"#).is_err()
        );
    }
}
