//! SQLite Book Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;
use crate::application::ports::{
    BookRecord, BookRepositoryPort, BookStatus, RepositoryError, SegmentStatus, TextSegmentRecord,
};
use crate::domain::text_segmenter::SegmentKind;

/// SQLite Book Repository
pub struct SqliteBookRepository {
    pool: DbPool,
}

impl SqliteBookRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct BookRow {
    id: String,
    title: String,
    total_segments: i64,
    status: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<BookRow> for BookRecord {
    type Error = RepositoryError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(BookRecord {
            id: parse_uuid(&row.id)?,
            title: row.title,
            total_segments: row.total_segments as usize,
            status: BookStatus::from_str(&row.status).unwrap_or_default(),
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct TextSegmentRow {
    id: String,
    book_id: String,
    segment_index: i64,
    start_position: i64,
    end_position: i64,
    content: String,
    word_count: i64,
    kind: String,
    status: String,
}

impl TryFrom<TextSegmentRow> for TextSegmentRecord {
    type Error = RepositoryError;

    fn try_from(row: TextSegmentRow) -> Result<Self, Self::Error> {
        Ok(TextSegmentRecord {
            id: parse_uuid(&row.id)?,
            book_id: parse_uuid(&row.book_id)?,
            segment_index: row.segment_index as usize,
            start_position: row.start_position as usize,
            end_position: row.end_position as usize,
            content: row.content,
            word_count: row.word_count as usize,
            kind: SegmentKind::from_str(&row.kind).unwrap_or(SegmentKind::Paragraph),
            status: SegmentStatus::from_str(&row.status).unwrap_or(SegmentStatus::Pending),
        })
    }
}

pub(super) fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

pub(super) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

const SEGMENT_COLUMNS: &str = "id, book_id, segment_index, start_position, end_position, content, word_count, kind, status";

#[async_trait]
impl BookRepositoryPort for SqliteBookRepository {
    async fn save(&self, book: &BookRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO books (id, title, total_segments, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                total_segments = excluded.total_segments,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(book.id.to_string())
        .bind(&book.title)
        .bind(book.total_segments as i64)
        .bind(book.status.as_str())
        .bind(book.created_at.to_rfc3339())
        .bind(book.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<BookRecord>, RepositoryError> {
        let row: Option<BookRow> = sqlx::query_as(
            "SELECT id, title, total_segments, status, created_at, updated_at FROM books WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(BookRecord::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<BookRecord>, RepositoryError> {
        let rows: Vec<BookRow> = sqlx::query_as(
            "SELECT id, title, total_segments, status, created_at, updated_at FROM books ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(BookRecord::try_from).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        // 使用事务确保原子性，手工级联删除
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM audio_files WHERE book_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM processing_tasks WHERE book_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM script_sentences WHERE book_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query(
            "DELETE FROM character_voice_bindings WHERE character_id IN (SELECT id FROM character_profiles WHERE book_id = ?)",
        )
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query(
            "DELETE FROM character_aliases WHERE character_id IN (SELECT id FROM character_profiles WHERE book_id = ?)",
        )
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM character_merge_audits WHERE book_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM character_profiles WHERE book_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM text_segments WHERE book_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: BookStatus,
        total_segments: usize,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE books
            SET status = ?, total_segments = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(total_segments as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn replace_segments(
        &self,
        book_id: Uuid,
        segments: &[TextSegmentRecord],
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        // 旧句子随片段一起替换
        sqlx::query("DELETE FROM script_sentences WHERE book_id = ?")
            .bind(book_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM text_segments WHERE book_id = ?")
            .bind(book_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        for segment in segments {
            sqlx::query(
                r#"
                INSERT INTO text_segments
                    (id, book_id, segment_index, start_position, end_position, content, word_count, kind, status)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(segment.id.to_string())
            .bind(segment.book_id.to_string())
            .bind(segment.segment_index as i64)
            .bind(segment.start_position as i64)
            .bind(segment.end_position as i64)
            .bind(&segment.content)
            .bind(segment.word_count as i64)
            .bind(segment.kind.as_str())
            .bind(segment.status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_segments_by_book(
        &self,
        book_id: Uuid,
    ) -> Result<Vec<TextSegmentRecord>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM text_segments WHERE book_id = ? ORDER BY segment_index",
            SEGMENT_COLUMNS
        );
        let rows: Vec<TextSegmentRow> = sqlx::query_as(&query)
            .bind(book_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(TextSegmentRecord::try_from).collect()
    }

    async fn find_segment(
        &self,
        segment_id: Uuid,
    ) -> Result<Option<TextSegmentRecord>, RepositoryError> {
        let query = format!("SELECT {} FROM text_segments WHERE id = ?", SEGMENT_COLUMNS);
        let row: Option<TextSegmentRow> = sqlx::query_as(&query)
            .bind(segment_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(TextSegmentRecord::try_from).transpose()
    }

    async fn update_segment_status(
        &self,
        segment_id: Uuid,
        status: SegmentStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE text_segments SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(segment_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "text segment: {}",
                segment_id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};

    async fn setup() -> SqliteBookRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteBookRepository::new(pool)
    }

    fn book(title: &str) -> BookRecord {
        let now = Utc::now();
        BookRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            total_segments: 0,
            status: BookStatus::Processing,
            created_at: now,
            updated_at: now,
        }
    }

    fn segment(book_id: Uuid, index: usize, start: usize, content: &str) -> TextSegmentRecord {
        TextSegmentRecord {
            id: Uuid::new_v4(),
            book_id,
            segment_index: index,
            start_position: start,
            end_position: start + content.len(),
            content: content.to_string(),
            word_count: content.chars().count(),
            kind: SegmentKind::Paragraph,
            status: SegmentStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_save_and_find_book() {
        let repo = setup().await;
        let b = book("测试小说");
        repo.save(&b).await.unwrap();

        let found = repo.find_by_id(b.id).await.unwrap().unwrap();
        assert_eq!(found.title, "测试小说");
        assert_eq!(found.status, BookStatus::Processing);
    }

    #[tokio::test]
    async fn test_replace_segments_roundtrip() {
        let repo = setup().await;
        let b = book("分段");
        repo.save(&b).await.unwrap();

        let text = "第一段。第二段。";
        let s1 = segment(b.id, 0, 0, "第一段。");
        let s2 = segment(b.id, 1, "第一段。".len(), "第二段。");
        repo.replace_segments(b.id, &[s1, s2]).await.unwrap();

        let segments = repo.find_segments_by_book(b.id).await.unwrap();
        assert_eq!(segments.len(), 2);
        let joined: String = segments.iter().map(|s| s.content.as_str()).collect();
        assert_eq!(joined, text);
        assert_eq!(segments[1].start_position, segments[0].end_position);
    }

    #[tokio::test]
    async fn test_replace_segments_drops_old_rows() {
        let repo = setup().await;
        let b = book("替换");
        repo.save(&b).await.unwrap();

        repo.replace_segments(b.id, &[segment(b.id, 0, 0, "旧内容。")])
            .await
            .unwrap();
        repo.replace_segments(b.id, &[segment(b.id, 0, 0, "新内容，完全不同。")])
            .await
            .unwrap();

        let segments = repo.find_segments_by_book(b.id).await.unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].content, "新内容，完全不同。");
    }

    #[tokio::test]
    async fn test_update_segment_status() {
        let repo = setup().await;
        let b = book("状态");
        repo.save(&b).await.unwrap();
        let s = segment(b.id, 0, 0, "内容。");
        let sid = s.id;
        repo.replace_segments(b.id, &[s]).await.unwrap();

        repo.update_segment_status(sid, SegmentStatus::Attributed)
            .await
            .unwrap();
        let found = repo.find_segment(sid).await.unwrap().unwrap();
        assert_eq!(found.status, SegmentStatus::Attributed);
    }

    #[tokio::test]
    async fn test_update_missing_segment_fails() {
        let repo = setup().await;
        let result = repo
            .update_segment_status(Uuid::new_v4(), SegmentStatus::Attributed)
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let repo = setup().await;
        let b = book("删除");
        repo.save(&b).await.unwrap();
        repo.replace_segments(b.id, &[segment(b.id, 0, 0, "内容。")])
            .await
            .unwrap();

        repo.delete(b.id).await.unwrap();
        assert!(repo.find_by_id(b.id).await.unwrap().is_none());
        assert!(repo.find_segments_by_book(b.id).await.unwrap().is_empty());
    }
}
