//! SQLite Voice Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;
use uuid::Uuid;

use super::book_repo::{parse_timestamp, parse_uuid};
use super::DbPool;
use crate::application::ports::{
    BindingRecord, RepositoryError, VoiceRecord, VoiceRepositoryPort,
};
use crate::domain::voice::{EmotionOverlayMap, ParamOverlay, SynthesisParams, VoiceCharacteristics};

/// SQLite Voice Repository
pub struct SqliteVoiceRepository {
    pool: DbPool,
}

impl SqliteVoiceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct VoiceRow {
    id: String,
    provider: String,
    provider_voice_id: String,
    name: String,
    characteristics: String,
    default_params: String,
    preview_path: Option<String>,
    usage_count: i64,
    rating: f64,
    is_available: i64,
    created_at: String,
}

impl TryFrom<VoiceRow> for VoiceRecord {
    type Error = RepositoryError;

    fn try_from(row: VoiceRow) -> Result<Self, Self::Error> {
        let characteristics: VoiceCharacteristics = serde_json::from_str(&row.characteristics)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        let default_params: SynthesisParams = serde_json::from_str(&row.default_params)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        Ok(VoiceRecord {
            id: parse_uuid(&row.id)?,
            provider: row.provider,
            provider_voice_id: row.provider_voice_id,
            name: row.name,
            characteristics,
            default_params,
            preview_path: row.preview_path,
            usage_count: row.usage_count as u64,
            rating: row.rating as f32,
            is_available: row.is_available != 0,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct BindingRow {
    id: String,
    character_id: String,
    voice_id: String,
    custom_params: String,
    emotion_overlays: String,
    is_default: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<BindingRow> for BindingRecord {
    type Error = RepositoryError;

    fn try_from(row: BindingRow) -> Result<Self, Self::Error> {
        let custom_params: ParamOverlay = serde_json::from_str(&row.custom_params)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        let emotion_overlays: EmotionOverlayMap = serde_json::from_str(&row.emotion_overlays)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        Ok(BindingRecord {
            id: parse_uuid(&row.id)?,
            character_id: parse_uuid(&row.character_id)?,
            voice_id: parse_uuid(&row.voice_id)?,
            custom_params,
            emotion_overlays,
            is_default: row.is_default != 0,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

const VOICE_COLUMNS: &str = "id, provider, provider_voice_id, name, characteristics, default_params, preview_path, usage_count, rating, is_available, created_at";
const BINDING_COLUMNS: &str = "id, character_id, voice_id, custom_params, emotion_overlays, is_default, created_at, updated_at";

#[async_trait]
impl VoiceRepositoryPort for SqliteVoiceRepository {
    async fn save(&self, voice: &VoiceRecord) -> Result<(), RepositoryError> {
        let characteristics = serde_json::to_string(&voice.characteristics)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        let default_params = serde_json::to_string(&voice.default_params)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO voice_profiles
                (id, provider, provider_voice_id, name, characteristics, default_params,
                 preview_path, usage_count, rating, is_available, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                provider = excluded.provider,
                provider_voice_id = excluded.provider_voice_id,
                name = excluded.name,
                characteristics = excluded.characteristics,
                default_params = excluded.default_params,
                preview_path = excluded.preview_path,
                rating = excluded.rating,
                is_available = excluded.is_available
            "#,
        )
        .bind(voice.id.to_string())
        .bind(&voice.provider)
        .bind(&voice.provider_voice_id)
        .bind(&voice.name)
        .bind(characteristics)
        .bind(default_params)
        .bind(&voice.preview_path)
        .bind(voice.usage_count as i64)
        .bind(voice.rating as f64)
        .bind(voice.is_available as i64)
        .bind(voice.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<VoiceRecord>, RepositoryError> {
        let query = format!("SELECT {} FROM voice_profiles WHERE id = ?", VOICE_COLUMNS);
        let row: Option<VoiceRow> = sqlx::query_as(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(VoiceRecord::try_from).transpose()
    }

    async fn find_available(&self) -> Result<Vec<VoiceRecord>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM voice_profiles WHERE is_available = 1 ORDER BY rating DESC, usage_count DESC",
            VOICE_COLUMNS
        );
        let rows: Vec<VoiceRow> = sqlx::query_as(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(VoiceRecord::try_from).collect()
    }

    async fn increment_usage(&self, voice_id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE voice_profiles SET usage_count = usage_count + 1 WHERE id = ?")
            .bind(voice_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn bind(&self, binding: &BindingRecord) -> Result<(), RepositoryError> {
        let custom_params = serde_json::to_string(&binding.custom_params)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        let emotion_overlays = serde_json::to_string(&binding.emotion_overlays)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        // 提升为默认前先降级旧默认，部分唯一索引兜底
        if binding.is_default {
            sqlx::query(
                "UPDATE character_voice_bindings SET is_default = 0, updated_at = ? WHERE character_id = ? AND is_default = 1",
            )
            .bind(binding.updated_at.to_rfc3339())
            .bind(binding.character_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        }

        sqlx::query(
            r#"
            INSERT INTO character_voice_bindings
                (id, character_id, voice_id, custom_params, emotion_overlays, is_default, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(character_id, voice_id) DO UPDATE SET
                custom_params = excluded.custom_params,
                emotion_overlays = excluded.emotion_overlays,
                is_default = excluded.is_default,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(binding.id.to_string())
        .bind(binding.character_id.to_string())
        .bind(binding.voice_id.to_string())
        .bind(custom_params)
        .bind(emotion_overlays)
        .bind(binding.is_default as i64)
        .bind(binding.created_at.to_rfc3339())
        .bind(binding.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict(
                format!("default binding race for character {}", binding.character_id),
            ),
            other => RepositoryError::DatabaseError(other.to_string()),
        })?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_binding(
        &self,
        character_id: Uuid,
        voice_id: Uuid,
    ) -> Result<Option<BindingRecord>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM character_voice_bindings WHERE character_id = ? AND voice_id = ?",
            BINDING_COLUMNS
        );
        let row: Option<BindingRow> = sqlx::query_as(&query)
            .bind(character_id.to_string())
            .bind(voice_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(BindingRecord::try_from).transpose()
    }

    async fn find_bindings_by_character(
        &self,
        character_id: Uuid,
    ) -> Result<Vec<BindingRecord>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM character_voice_bindings WHERE character_id = ? ORDER BY updated_at",
            BINDING_COLUMNS
        );
        let rows: Vec<BindingRow> = sqlx::query_as(&query)
            .bind(character_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(BindingRecord::try_from).collect()
    }

    async fn find_default_binding(
        &self,
        character_id: Uuid,
    ) -> Result<Option<BindingRecord>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM character_voice_bindings WHERE character_id = ? AND is_default = 1",
            BINDING_COLUMNS
        );
        let row: Option<BindingRow> = sqlx::query_as(&query)
            .bind(character_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(BindingRecord::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};

    async fn setup() -> SqliteVoiceRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteVoiceRepository::new(pool)
    }

    fn voice(name: &str) -> VoiceRecord {
        VoiceRecord {
            id: Uuid::new_v4(),
            provider: "fake".to_string(),
            provider_voice_id: format!("fake-{}", name),
            name: name.to_string(),
            characteristics: VoiceCharacteristics::default(),
            default_params: SynthesisParams::default(),
            preview_path: None,
            usage_count: 0,
            rating: 3.5,
            is_available: true,
            created_at: Utc::now(),
        }
    }

    fn binding(character_id: Uuid, voice_id: Uuid, is_default: bool) -> BindingRecord {
        let now = Utc::now();
        BindingRecord {
            id: Uuid::new_v4(),
            character_id,
            voice_id,
            custom_params: ParamOverlay::default(),
            emotion_overlays: EmotionOverlayMap::new(),
            is_default,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_save_and_find_voice() {
        let repo = setup().await;
        let v = voice("温柔女声");
        repo.save(&v).await.unwrap();

        let found = repo.find_by_id(v.id).await.unwrap().unwrap();
        assert_eq!(found.name, "温柔女声");
        assert_eq!(found.default_params, SynthesisParams::default());
    }

    #[tokio::test]
    async fn test_find_available_excludes_disabled() {
        let repo = setup().await;
        let mut v1 = voice("可用");
        let mut v2 = voice("停用");
        v1.rating = 4.0;
        v2.is_available = false;
        repo.save(&v1).await.unwrap();
        repo.save(&v2).await.unwrap();

        let available = repo.find_available().await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, v1.id);
    }

    #[tokio::test]
    async fn test_default_promotion_demotes_previous() {
        let repo = setup().await;
        let character_id = Uuid::new_v4();
        let v1 = voice("音色一");
        let v2 = voice("音色二");
        repo.save(&v1).await.unwrap();
        repo.save(&v2).await.unwrap();

        repo.bind(&binding(character_id, v1.id, true)).await.unwrap();
        repo.bind(&binding(character_id, v2.id, true)).await.unwrap();

        let default = repo.find_default_binding(character_id).await.unwrap().unwrap();
        assert_eq!(default.voice_id, v2.id);

        let old = repo.find_binding(character_id, v1.id).await.unwrap().unwrap();
        assert!(!old.is_default);

        let all = repo.find_bindings_by_character(character_id).await.unwrap();
        assert_eq!(all.iter().filter(|b| b.is_default).count(), 1);
    }

    #[tokio::test]
    async fn test_rebind_updates_overlays() {
        let repo = setup().await;
        let character_id = Uuid::new_v4();
        let v = voice("音色");
        repo.save(&v).await.unwrap();

        repo.bind(&binding(character_id, v.id, false)).await.unwrap();

        let mut updated = binding(character_id, v.id, false);
        updated.custom_params = ParamOverlay {
            pitch: Some(1.2),
            ..Default::default()
        };
        repo.bind(&updated).await.unwrap();

        let found = repo.find_binding(character_id, v.id).await.unwrap().unwrap();
        assert_eq!(found.custom_params.pitch, Some(1.2));

        // (character_id, voice_id) 唯一，重绑不产生第二条记录
        let all = repo.find_bindings_by_character(character_id).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_increment_usage() {
        let repo = setup().await;
        let v = voice("用量");
        repo.save(&v).await.unwrap();

        repo.increment_usage(v.id).await.unwrap();
        repo.increment_usage(v.id).await.unwrap();

        let found = repo.find_by_id(v.id).await.unwrap().unwrap();
        assert_eq!(found.usage_count, 2);
    }
}
