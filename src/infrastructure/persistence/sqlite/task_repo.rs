//! SQLite Processing Task Repository
//!
//! 任务状态机 queued → running → {completed, failed, cancelled}
//! 的全部迁移都是条件更新，非法迁移以 Conflict 拒绝。

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::book_repo::{parse_timestamp, parse_uuid};
use super::DbPool;
use crate::application::ports::{
    RepositoryError, TaskRecord, TaskRepositoryPort, TaskStatus, TaskType,
};

/// SQLite Processing Task Repository
pub struct SqliteTaskRepository {
    pool: DbPool,
}

impl SqliteTaskRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_required(&self, id: Uuid) -> Result<TaskRecord, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("task: {}", id)))
    }
}

#[derive(FromRow)]
struct TaskRow {
    id: String,
    book_id: String,
    task_type: String,
    status: String,
    total_items: i64,
    processed_items: i64,
    failed_items: i64,
    task_data: String,
    external_task_id: Option<String>,
    error_message: Option<String>,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
}

impl TryFrom<TaskRow> for TaskRecord {
    type Error = RepositoryError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let task_data: Value = serde_json::from_str(&row.task_data)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        Ok(TaskRecord {
            id: parse_uuid(&row.id)?,
            book_id: parse_uuid(&row.book_id)?,
            task_type: TaskType::from_str(&row.task_type)
                .ok_or_else(|| {
                    RepositoryError::SerializationError(format!(
                        "unknown task type: {}",
                        row.task_type
                    ))
                })?,
            status: TaskStatus::from_str(&row.status).unwrap_or(TaskStatus::Queued),
            total_items: row.total_items as u32,
            processed_items: row.processed_items as u32,
            failed_items: row.failed_items as u32,
            task_data,
            external_task_id: row.external_task_id,
            error_message: row.error_message,
            created_at: parse_timestamp(&row.created_at)?,
            started_at: row.started_at.as_deref().map(parse_timestamp).transpose()?,
            completed_at: row
                .completed_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

const TASK_COLUMNS: &str = "id, book_id, task_type, status, total_items, processed_items, failed_items, task_data, external_task_id, error_message, created_at, started_at, completed_at";

#[async_trait]
impl TaskRepositoryPort for SqliteTaskRepository {
    async fn create(&self, task: &TaskRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO processing_tasks
                (id, book_id, task_type, status, total_items, processed_items, failed_items,
                 task_data, external_task_id, error_message, created_at, started_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task.id.to_string())
        .bind(task.book_id.to_string())
        .bind(task.task_type.as_str())
        .bind(task.status.as_str())
        .bind(task.total_items as i64)
        .bind(task.processed_items as i64)
        .bind(task.failed_items as i64)
        .bind(task.task_data.to_string())
        .bind(&task.external_task_id)
        .bind(&task.error_message)
        .bind(task.created_at.to_rfc3339())
        .bind(task.started_at.map(|dt| dt.to_rfc3339()))
        .bind(task.completed_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TaskRecord>, RepositoryError> {
        let query = format!("SELECT {} FROM processing_tasks WHERE id = ?", TASK_COLUMNS);
        let row: Option<TaskRow> = sqlx::query_as(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(TaskRecord::try_from).transpose()
    }

    async fn find_by_book(&self, book_id: Uuid) -> Result<Vec<TaskRecord>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM processing_tasks WHERE book_id = ? ORDER BY created_at DESC",
            TASK_COLUMNS
        );
        let rows: Vec<TaskRow> = sqlx::query_as(&query)
            .bind(book_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(TaskRecord::try_from).collect()
    }

    async fn find_by_external_id(
        &self,
        external_task_id: &str,
    ) -> Result<Option<TaskRecord>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM processing_tasks WHERE external_task_id = ?",
            TASK_COLUMNS
        );
        let row: Option<TaskRow> = sqlx::query_as(&query)
            .bind(external_task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(TaskRecord::try_from).transpose()
    }

    async fn set_external_id(
        &self,
        id: Uuid,
        external_task_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE processing_tasks SET external_task_id = ? WHERE id = ?")
            .bind(external_task_id)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("task: {}", id)));
        }

        Ok(())
    }

    async fn start(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE processing_tasks SET status = 'running', started_at = ? WHERE id = ? AND status = 'queued'",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "task {} is not queued",
                id
            )));
        }

        Ok(())
    }

    async fn record_progress(
        &self,
        id: Uuid,
        succeeded: u32,
        failed: u32,
    ) -> Result<TaskRecord, RepositoryError> {
        // 仅 running 可推进；processed_items 永不超过 total_items
        let result = sqlx::query(
            r#"
            UPDATE processing_tasks
            SET processed_items = processed_items + ?, failed_items = failed_items + ?
            WHERE id = ? AND status = 'running' AND processed_items + ? <= total_items
            "#,
        )
        .bind(succeeded as i64)
        .bind(failed as i64)
        .bind(id.to_string())
        .bind(succeeded as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "progress update rejected for task {}",
                id
            )));
        }

        // 成功数到达总数时强制进入 completed
        sqlx::query(
            r#"
            UPDATE processing_tasks
            SET status = 'completed', completed_at = ?
            WHERE id = ? AND status = 'running' AND processed_items >= total_items
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        self.fetch_required(id).await
    }

    async fn merge_task_data(&self, id: Uuid, updates: &Value) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let current: Option<(String,)> =
            sqlx::query_as("SELECT task_data FROM processing_tasks WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        let (task_data,) =
            current.ok_or_else(|| RepositoryError::NotFound(format!("task: {}", id)))?;

        let mut merged: Value = serde_json::from_str(&task_data)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        // 顶层键浅合并，非对象负载整体替换
        match (merged.as_object_mut(), updates.as_object()) {
            (Some(base), Some(patch)) => {
                for (key, value) in patch {
                    base.insert(key.clone(), value.clone());
                }
            }
            _ => merged = updates.clone(),
        }

        sqlx::query("UPDATE processing_tasks SET task_data = ? WHERE id = ?")
            .bind(merged.to_string())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE processing_tasks
            SET status = 'failed', error_message = ?, completed_at = ?
            WHERE id = ? AND status IN ('queued', 'running')
            "#,
        )
        .bind(error)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "task {} is already terminal",
                id
            )));
        }

        Ok(())
    }

    async fn cancel(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE processing_tasks
            SET status = 'cancelled', completed_at = ?
            WHERE id = ? AND status IN ('queued', 'running')
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "task {} is already terminal",
                id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};
    use serde_json::json;

    async fn setup() -> SqliteTaskRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteTaskRepository::new(pool)
    }

    async fn running_task(repo: &SqliteTaskRepository, total: u32) -> TaskRecord {
        let task = TaskRecord::queued(Uuid::new_v4(), TaskType::Synthesis, total);
        repo.create(&task).await.unwrap();
        repo.start(task.id).await.unwrap();
        task
    }

    #[tokio::test]
    async fn test_start_requires_queued() {
        let repo = setup().await;
        let task = TaskRecord::queued(Uuid::new_v4(), TaskType::Synthesis, 3);
        repo.create(&task).await.unwrap();

        repo.start(task.id).await.unwrap();
        // 二次启动被拒绝
        assert!(matches!(
            repo.start(task.id).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_progress_accumulates_and_autocompletes() {
        let repo = setup().await;
        let task = running_task(&repo, 3).await;

        let after_one = repo.record_progress(task.id, 1, 0).await.unwrap();
        assert_eq!(after_one.processed_items, 1);
        assert_eq!(after_one.status, TaskStatus::Running);

        let after_two = repo.record_progress(task.id, 2, 0).await.unwrap();
        assert_eq!(after_two.processed_items, 3);
        assert_eq!(after_two.status, TaskStatus::Completed);
        assert!(after_two.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_progress_never_exceeds_total() {
        let repo = setup().await;
        let task = running_task(&repo, 2).await;

        repo.record_progress(task.id, 2, 0).await.unwrap();
        // 已 completed，继续推进被拒绝
        assert!(matches!(
            repo.record_progress(task.id, 1, 0).await,
            Err(RepositoryError::Conflict(_))
        ));

        let final_task = repo.find_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(final_task.processed_items, 2);
    }

    #[tokio::test]
    async fn test_overshooting_update_rejected() {
        let repo = setup().await;
        let task = running_task(&repo, 2).await;

        assert!(matches!(
            repo.record_progress(task.id, 3, 0).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_items_do_not_complete_task() {
        let repo = setup().await;
        let task = running_task(&repo, 2).await;

        let after = repo.record_progress(task.id, 1, 1).await.unwrap();
        assert_eq!(after.processed_items, 1);
        assert_eq!(after.failed_items, 1);
        // 失败不算成功完成，任务保持 running 由 worker 收尾
        assert_eq!(after.status, TaskStatus::Running);
    }

    #[tokio::test]
    async fn test_cancel_then_progress_rejected() {
        let repo = setup().await;
        let task = running_task(&repo, 5).await;

        repo.cancel(task.id).await.unwrap();
        assert!(matches!(
            repo.record_progress(task.id, 1, 0).await,
            Err(RepositoryError::Conflict(_))
        ));
        // 终态不可再取消
        assert!(matches!(
            repo.cancel(task.id).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_merge_task_data_shallow() {
        let repo = setup().await;
        let task = running_task(&repo, 1).await;

        repo.merge_task_data(task.id, &json!({"provider": "fake", "attempt": 1}))
            .await
            .unwrap();
        repo.merge_task_data(task.id, &json!({"attempt": 2}))
            .await
            .unwrap();

        let found = repo.find_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(found.task_data["provider"], "fake");
        assert_eq!(found.task_data["attempt"], 2);
    }

    #[tokio::test]
    async fn test_external_id_lookup() {
        let repo = setup().await;
        let task = TaskRecord::queued(Uuid::new_v4(), TaskType::Attribution, 1);
        repo.create(&task).await.unwrap();

        repo.set_external_id(task.id, "ext-42").await.unwrap();
        let found = repo.find_by_external_id("ext-42").await.unwrap().unwrap();
        assert_eq!(found.id, task.id);
        assert!(repo.find_by_external_id("missing").await.unwrap().is_none());
    }
}
