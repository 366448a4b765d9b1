//! SQLite Script Sentence Repository

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use super::book_repo::{parse_timestamp, parse_uuid};
use super::DbPool;
use crate::application::ports::{RepositoryError, SentenceRecord, SentenceRepositoryPort};
use crate::domain::voice::ParamOverlay;

/// SQLite Script Sentence Repository
pub struct SqliteSentenceRepository {
    pool: DbPool,
}

impl SqliteSentenceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct SentenceRow {
    id: String,
    book_id: String,
    segment_id: String,
    order_in_segment: i64,
    text: String,
    raw_speaker: Option<String>,
    character_id: Option<String>,
    tone: Option<String>,
    strength: Option<f64>,
    pause_after_ms: Option<i64>,
    tts_overrides: Option<String>,
    created_at: String,
}

impl TryFrom<SentenceRow> for SentenceRecord {
    type Error = RepositoryError;

    fn try_from(row: SentenceRow) -> Result<Self, Self::Error> {
        let tts_overrides = row
            .tts_overrides
            .as_deref()
            .map(|json| {
                serde_json::from_str::<ParamOverlay>(json)
                    .map_err(|e| RepositoryError::SerializationError(e.to_string()))
            })
            .transpose()?;

        Ok(SentenceRecord {
            id: parse_uuid(&row.id)?,
            book_id: parse_uuid(&row.book_id)?,
            segment_id: parse_uuid(&row.segment_id)?,
            order_in_segment: row.order_in_segment as usize,
            text: row.text,
            raw_speaker: row.raw_speaker,
            character_id: row.character_id.as_deref().map(parse_uuid).transpose()?,
            tone: row.tone,
            strength: row.strength.map(|v| v as f32),
            pause_after_ms: row.pause_after_ms.map(|v| v as u32),
            tts_overrides,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

const SENTENCE_COLUMNS: &str = "id, book_id, segment_id, order_in_segment, text, raw_speaker, character_id, tone, strength, pause_after_ms, tts_overrides, created_at";

#[async_trait]
impl SentenceRepositoryPort for SqliteSentenceRepository {
    async fn save_batch(&self, sentences: &[SentenceRecord]) -> Result<(), RepositoryError> {
        if sentences.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        for sentence in sentences {
            let tts_overrides = sentence
                .tts_overrides
                .as_ref()
                .map(|o| {
                    serde_json::to_string(o)
                        .map_err(|e| RepositoryError::SerializationError(e.to_string()))
                })
                .transpose()?;

            sqlx::query(
                r#"
                INSERT INTO script_sentences
                    (id, book_id, segment_id, order_in_segment, text, raw_speaker,
                     character_id, tone, strength, pause_after_ms, tts_overrides, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(sentence.id.to_string())
            .bind(sentence.book_id.to_string())
            .bind(sentence.segment_id.to_string())
            .bind(sentence.order_in_segment as i64)
            .bind(&sentence.text)
            .bind(&sentence.raw_speaker)
            .bind(sentence.character_id.map(|id| id.to_string()))
            .bind(&sentence.tone)
            .bind(sentence.strength.map(|v| v as f64))
            .bind(sentence.pause_after_ms.map(|v| v as i64))
            .bind(tts_overrides)
            .bind(sentence.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SentenceRecord>, RepositoryError> {
        let query = format!("SELECT {} FROM script_sentences WHERE id = ?", SENTENCE_COLUMNS);
        let row: Option<SentenceRow> = sqlx::query_as(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(SentenceRecord::try_from).transpose()
    }

    async fn find_by_segment(
        &self,
        segment_id: Uuid,
    ) -> Result<Vec<SentenceRecord>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM script_sentences WHERE segment_id = ? ORDER BY order_in_segment",
            SENTENCE_COLUMNS
        );
        let rows: Vec<SentenceRow> = sqlx::query_as(&query)
            .bind(segment_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(SentenceRecord::try_from).collect()
    }

    async fn find_by_book(&self, book_id: Uuid) -> Result<Vec<SentenceRecord>, RepositoryError> {
        // 书内顺序 = 片段序 + 句序
        let query = format!(
            r#"
            SELECT s.id, s.book_id, s.segment_id, s.order_in_segment, s.text, s.raw_speaker,
                   s.character_id, s.tone, s.strength, s.pause_after_ms, s.tts_overrides, s.created_at
            FROM script_sentences s
            JOIN text_segments t ON t.id = s.segment_id
            WHERE s.book_id = ?
            ORDER BY t.segment_index, s.order_in_segment
            "#,
        );
        let rows: Vec<SentenceRow> = sqlx::query_as(&query)
            .bind(book_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(SentenceRecord::try_from).collect()
    }

    async fn delete_by_segment(&self, segment_id: Uuid) -> Result<usize, RepositoryError> {
        let result = sqlx::query("DELETE FROM script_sentences WHERE segment_id = ?")
            .bind(segment_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};
    use chrono::Utc;

    async fn setup() -> SqliteSentenceRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteSentenceRepository::new(pool)
    }

    fn sentence(book_id: Uuid, segment_id: Uuid, order: usize, text: &str) -> SentenceRecord {
        SentenceRecord {
            id: Uuid::new_v4(),
            book_id,
            segment_id,
            order_in_segment: order,
            text: text.to_string(),
            raw_speaker: None,
            character_id: None,
            tone: None,
            strength: None,
            pause_after_ms: None,
            tts_overrides: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_batch_and_find_by_segment() {
        let repo = setup().await;
        let book_id = Uuid::new_v4();
        let segment_id = Uuid::new_v4();

        let batch = vec![
            sentence(book_id, segment_id, 0, "第一句。"),
            sentence(book_id, segment_id, 1, "第二句。"),
        ];
        repo.save_batch(&batch).await.unwrap();

        let found = repo.find_by_segment(segment_id).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].text, "第一句。");
        assert_eq!(found[1].order_in_segment, 1);
    }

    #[tokio::test]
    async fn test_tts_overrides_roundtrip() {
        let repo = setup().await;
        let mut s = sentence(Uuid::new_v4(), Uuid::new_v4(), 0, "带覆盖。");
        s.tts_overrides = Some(ParamOverlay {
            rate: Some(0.8),
            ..Default::default()
        });
        s.tone = Some("sad".to_string());
        s.strength = Some(0.6);
        repo.save_batch(std::slice::from_ref(&s)).await.unwrap();

        let found = repo.find_by_id(s.id).await.unwrap().unwrap();
        assert_eq!(found.tts_overrides.unwrap().rate, Some(0.8));
        assert_eq!(found.tone.as_deref(), Some("sad"));
    }

    #[tokio::test]
    async fn test_delete_by_segment() {
        let repo = setup().await;
        let book_id = Uuid::new_v4();
        let segment_id = Uuid::new_v4();
        repo.save_batch(&[
            sentence(book_id, segment_id, 0, "一。"),
            sentence(book_id, segment_id, 1, "二。"),
        ])
        .await
        .unwrap();

        let deleted = repo.delete_by_segment(segment_id).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(repo.find_by_segment(segment_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_order_rejected() {
        let repo = setup().await;
        let book_id = Uuid::new_v4();
        let segment_id = Uuid::new_v4();
        repo.save_batch(&[sentence(book_id, segment_id, 0, "一。")])
            .await
            .unwrap();

        let result = repo
            .save_batch(&[sentence(book_id, segment_id, 0, "重复序号。")])
            .await;
        assert!(result.is_err());
    }
}
