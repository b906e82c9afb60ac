//! Unread notices and read receipts.

use axum::extract::State;
use axum::routing::{get, put};
use axum::{Extension, Json, Router, middleware};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::Result;
use crate::notification::{Notification, NotificationRepository};
use crate::router::{ApiResponse, ValidQuery};
use crate::task::TaskRepository;
use crate::user::AuthUser;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(unread))
        .route("/read", put(mark_read))
        .route_layer(middleware::from_fn_with_state(state, super::gate))
}

/// Handler to list unread notices.
///
/// Persisted notices come first; tasks due on the current UTC day are then
/// appended as synthesized due-today notices. The synthesized ones are never
/// written back, so they reappear on every read until the day passes.
pub async fn unread(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<Notification>>>> {
    let mut notices = NotificationRepository::new(state.db.postgres.clone())
        .unread(auth.id)
        .await?;

    let due = TaskRepository::new(state.db.postgres.clone())
        .due_on(auth.id, Utc::now().date_naive())
        .await?;

    for task in &due {
        let already_noticed = notices
            .iter()
            .any(|notice| notice.task_id == Some(task.id));
        if !already_noticed {
            notices.push(Notification::due_today(auth.id, task));
        }
    }

    Ok(ApiResponse::new(notices))
}

#[derive(Debug, Deserialize)]
pub struct ReadQuery {
    #[serde(default)]
    pub all: bool,
    pub id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub updated: u64,
}

/// Handler to acknowledge notices, one by `id` or every unread one with
/// `all=true`. A receipt with zero updates is a success: the notice may be a
/// synthesized one, already read, or gone.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidQuery(query): ValidQuery<ReadQuery>,
) -> Result<Json<ApiResponse<ReadReceipt>>> {
    let repo = NotificationRepository::new(state.db.postgres.clone());

    let updated = if query.all {
        repo.mark_all_read(auth.id).await?
    } else if let Some(id) = query.id {
        repo.mark_read(auth.id, id).await?
    } else {
        0
    };

    Ok(ApiResponse::new(ReadReceipt { updated }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotiType;
    use crate::router::auth::tests::register_test_user;
    use crate::*;
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    async fn unread_notices(app: &Router, token: &str) -> Vec<Notification> {
        let response = make_request(
            app.clone(),
            Method::GET,
            "/api/notifications",
            Some(token),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: router::ApiResponse<Vec<Notification>> = serde_json::from_slice(&body).unwrap();
        body.data
    }

    async fn create_task_due(app: &Router, token: &str, title: &str, due: chrono::DateTime<Utc>) {
        let response = make_request(
            app.clone(),
            Method::POST,
            "/api/tasks",
            Some(token),
            json!({ "title": title, "dueDate": due }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[sqlx::test]
    async fn test_unread_synthesizes_due_today(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());
        let app = app(state);
        let session = register_test_user(&app, "notices@example.com").await;

        create_task_due(&app, &session.token, "Pay rent", Utc::now()).await;
        create_task_due(
            &app,
            &session.token,
            "Renew passport",
            Utc::now() + chrono::Duration::days(2),
        )
        .await;

        // Drop the persisted notice so only synthesis can explain the result.
        sqlx::query("DELETE FROM notifications")
            .execute(&pool)
            .await
            .unwrap();

        let notices = unread_notices(&app, &session.token).await;

        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].noti_type, NotiType::DueToday);
        assert_eq!(notices[0].message, "Task \"Pay rent\" is due today!");

        // Synthesized notices are not written back.
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        // Reading again yields the same synthesized notice.
        let notices = unread_notices(&app, &session.token).await;
        assert_eq!(notices.len(), 1);
    }

    #[sqlx::test]
    async fn test_unread_deduplicates_persisted_notice(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);
        let session = register_test_user(&app, "dedup@example.com").await;

        // Creation already persisted a due-today notice for this task.
        create_task_due(&app, &session.token, "Pay rent", Utc::now()).await;

        let notices = unread_notices(&app, &session.token).await;
        assert_eq!(notices.len(), 1);
    }

    #[sqlx::test]
    async fn test_mark_one_read(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());
        let app = app(state);
        let session = register_test_user(&app, "read@example.com").await;

        create_task_due(&app, &session.token, "Pay rent", Utc::now()).await;
        let notice_id: Uuid = sqlx::query_scalar("SELECT id FROM notifications")
            .fetch_one(&pool)
            .await
            .unwrap();

        let response = make_request(
            app.clone(),
            Method::PUT,
            &format!("/api/notifications/read?id={notice_id}"),
            Some(&session.token),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: router::ApiResponse<ReadReceipt> = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.data.updated, 1);

        // Acknowledging it again is a zero-update success.
        let response = make_request(
            app,
            Method::PUT,
            &format!("/api/notifications/read?id={notice_id}"),
            Some(&session.token),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: router::ApiResponse<ReadReceipt> = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.data.updated, 0);
    }

    #[sqlx::test]
    async fn test_mark_all_read_is_owner_scoped(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());
        let app = app(state);
        let alice = register_test_user(&app, "alice@example.com").await;
        let bob = register_test_user(&app, "bob@example.com").await;

        create_task_due(&app, &alice.token, "Alice's rent", Utc::now()).await;
        create_task_due(&app, &bob.token, "Bob's rent", Utc::now()).await;

        let response = make_request(
            app,
            Method::PUT,
            "/api/notifications/read?all=true",
            Some(&alice.token),
            String::default(),
        )
        .await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: router::ApiResponse<ReadReceipt> = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.data.updated, 1);

        // Bob's notice is untouched.
        let unread: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT read")
                .bind(bob.user.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(unread, 1);
    }
}
