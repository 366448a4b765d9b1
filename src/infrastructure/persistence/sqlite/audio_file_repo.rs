//! SQLite Audio File Repository
//!
//! pending 记录同时充当合成工作队列：认领与状态迁移都是
//! 存储层的条件更新，竞争认领在 SQL 层面天然互斥。

use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;
use uuid::Uuid;

use super::book_repo::{parse_timestamp, parse_uuid};
use super::DbPool;
use crate::application::ports::{
    AudioFileRecord, AudioFileRepositoryPort, AudioStatus, AudioStatusCounts, CompletedAudio,
    RepositoryError,
};

/// SQLite Audio File Repository
pub struct SqliteAudioFileRepository {
    pool: DbPool,
}

impl SqliteAudioFileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AudioFileRow {
    id: String,
    book_id: String,
    sentence_id: Option<String>,
    segment_id: Option<String>,
    file_path: Option<String>,
    duration_ms: Option<i64>,
    file_size: Option<i64>,
    format: Option<String>,
    status: String,
    error_message: Option<String>,
    retry_count: i64,
    provider: Option<String>,
    voice_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<AudioFileRow> for AudioFileRecord {
    type Error = RepositoryError;

    fn try_from(row: AudioFileRow) -> Result<Self, Self::Error> {
        Ok(AudioFileRecord {
            id: parse_uuid(&row.id)?,
            book_id: parse_uuid(&row.book_id)?,
            sentence_id: row.sentence_id.as_deref().map(parse_uuid).transpose()?,
            segment_id: row.segment_id.as_deref().map(parse_uuid).transpose()?,
            file_path: row.file_path,
            duration_ms: row.duration_ms.map(|v| v as u64),
            file_size: row.file_size.map(|v| v as u64),
            format: row.format,
            status: AudioStatus::from_str(&row.status).unwrap_or(AudioStatus::Pending),
            error_message: row.error_message,
            retry_count: row.retry_count as u32,
            provider: row.provider,
            voice_id: row.voice_id.as_deref().map(parse_uuid).transpose()?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

const AUDIO_COLUMNS: &str = "id, book_id, sentence_id, segment_id, file_path, duration_ms, file_size, format, status, error_message, retry_count, provider, voice_id, created_at, updated_at";

#[async_trait]
impl AudioFileRepositoryPort for SqliteAudioFileRepository {
    async fn save_batch(&self, files: &[AudioFileRecord]) -> Result<(), RepositoryError> {
        if files.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        for file in files {
            sqlx::query(
                r#"
                INSERT INTO audio_files
                    (id, book_id, sentence_id, segment_id, file_path, duration_ms, file_size,
                     format, status, error_message, retry_count, provider, voice_id, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(file.id.to_string())
            .bind(file.book_id.to_string())
            .bind(file.sentence_id.map(|id| id.to_string()))
            .bind(file.segment_id.map(|id| id.to_string()))
            .bind(&file.file_path)
            .bind(file.duration_ms.map(|v| v as i64))
            .bind(file.file_size.map(|v| v as i64))
            .bind(&file.format)
            .bind(file.status.as_str())
            .bind(&file.error_message)
            .bind(file.retry_count as i64)
            .bind(&file.provider)
            .bind(file.voice_id.map(|id| id.to_string()))
            .bind(file.created_at.to_rfc3339())
            .bind(file.updated_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AudioFileRecord>, RepositoryError> {
        let query = format!("SELECT {} FROM audio_files WHERE id = ?", AUDIO_COLUMNS);
        let row: Option<AudioFileRow> = sqlx::query_as(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(AudioFileRecord::try_from).transpose()
    }

    async fn find_by_book(
        &self,
        book_id: Uuid,
    ) -> Result<Vec<AudioFileRecord>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM audio_files WHERE book_id = ? ORDER BY created_at",
            AUDIO_COLUMNS
        );
        let rows: Vec<AudioFileRow> = sqlx::query_as(&query)
            .bind(book_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(AudioFileRecord::try_from).collect()
    }

    async fn find_by_sentence(
        &self,
        sentence_id: Uuid,
    ) -> Result<Vec<AudioFileRecord>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM audio_files WHERE sentence_id = ? ORDER BY created_at",
            AUDIO_COLUMNS
        );
        let rows: Vec<AudioFileRow> = sqlx::query_as(&query)
            .bind(sentence_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(AudioFileRecord::try_from).collect()
    }

    async fn claim_next_pending(
        &self,
        book_id: Uuid,
    ) -> Result<Option<AudioFileRecord>, RepositoryError> {
        // 条件更新 + RETURNING，竞争方中恰好一个成功
        let query = format!(
            r#"
            UPDATE audio_files
            SET status = 'processing', updated_at = ?
            WHERE id = (SELECT id FROM audio_files
                        WHERE book_id = ? AND status = 'pending'
                        ORDER BY rowid LIMIT 1)
              AND status = 'pending'
            RETURNING {}
            "#,
            AUDIO_COLUMNS
        );
        let row: Option<AudioFileRow> = sqlx::query_as(&query)
            .bind(Utc::now().to_rfc3339())
            .bind(book_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(AudioFileRecord::try_from).transpose()
    }

    async fn claim(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE audio_files SET status = 'processing', updated_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete(&self, id: Uuid, outcome: &CompletedAudio) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE audio_files
            SET status = 'completed', file_path = ?, duration_ms = ?, file_size = ?,
                format = ?, provider = ?, voice_id = ?, error_message = NULL, updated_at = ?
            WHERE id = ? AND status = 'processing'
            "#,
        )
        .bind(&outcome.file_path)
        .bind(outcome.duration_ms as i64)
        .bind(outcome.file_size as i64)
        .bind(&outcome.format)
        .bind(&outcome.provider)
        .bind(outcome.voice_id.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "audio file {} is not processing",
                id
            )));
        }

        Ok(())
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE audio_files
            SET status = 'failed', error_message = ?, updated_at = ?
            WHERE id = ? AND status = 'processing'
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
                "audio file {} is not processing",
                id
            )));
        }

        Ok(())
    }

    async fn resubmit(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE audio_files
            SET status = 'pending', error_message = NULL, retry_count = retry_count + 1, updated_at = ?
            WHERE id = ? AND status = 'failed'
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "audio file {} is not failed",
                id
            )));
        }

        Ok(())
    }

    async fn find_failed_by_book(
        &self,
        book_id: Uuid,
    ) -> Result<Vec<AudioFileRecord>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM audio_files WHERE book_id = ? AND status = 'failed' ORDER BY created_at",
            AUDIO_COLUMNS
        );
        let rows: Vec<AudioFileRow> = sqlx::query_as(&query)
            .bind(book_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(AudioFileRecord::try_from).collect()
    }

    async fn count_by_status(
        &self,
        book_id: Uuid,
    ) -> Result<AudioStatusCounts, RepositoryError> {
        #[derive(FromRow)]
        struct CountRow {
            status: String,
            count: i64,
        }

        let rows: Vec<CountRow> = sqlx::query_as(
            "SELECT status, COUNT(*) as count FROM audio_files WHERE book_id = ? GROUP BY status",
        )
        .bind(book_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let mut counts = AudioStatusCounts::default();
        for row in rows {
            match AudioStatus::from_str(&row.status) {
                Some(AudioStatus::Pending) => counts.pending = row.count as u64,
                Some(AudioStatus::Processing) => counts.processing = row.count as u64,
                Some(AudioStatus::Completed) => counts.completed = row.count as u64,
                Some(AudioStatus::Failed) => counts.failed = row.count as u64,
                None => {}
            }
        }

        Ok(counts)
    }
}
