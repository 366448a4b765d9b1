//! SQLite Character Repository
//!
//! 合并图以 character_merge_audits 的有向边表示，
//! merge 在单事务内完成重挂与停用，全有或全无。

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::book_repo::{parse_timestamp, parse_uuid};
use super::DbPool;
use crate::application::ports::{
    AliasRecord, AliasUpsertOutcome, CharacterRecord, CharacterRepositoryPort, MergeAuditRecord,
    MergeOutcome, MergeRequest, RepositoryError,
};
use crate::domain::character::{resolve_root, CharacterMergeAudit, GenderHint, MergeEdge};

/// SQLite Character Repository
pub struct SqliteCharacterRepository {
    pool: DbPool,
}

impl SqliteCharacterRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct CharacterRow {
    id: String,
    book_id: String,
    canonical_name: String,
    characteristics: String,
    voice_preferences: String,
    emotion_profile: String,
    gender_hint: String,
    age_hint: Option<i64>,
    is_active: i64,
    mentions: i64,
    quotes: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<CharacterRow> for CharacterRecord {
    type Error = RepositoryError;

    fn try_from(row: CharacterRow) -> Result<Self, Self::Error> {
        Ok(CharacterRecord {
            id: parse_uuid(&row.id)?,
            book_id: parse_uuid(&row.book_id)?,
            canonical_name: row.canonical_name,
            characteristics: parse_json(&row.characteristics)?,
            voice_preferences: parse_json(&row.voice_preferences)?,
            emotion_profile: parse_json(&row.emotion_profile)?,
            gender_hint: GenderHint::from_str(&row.gender_hint).unwrap_or_default(),
            age_hint: row.age_hint.map(|v| v as u32),
            is_active: row.is_active != 0,
            mentions: row.mentions as u64,
            quotes: row.quotes as u64,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct AliasRow {
    id: String,
    character_id: String,
    alias: String,
    confidence: f64,
    source_sentence: Option<String>,
    created_at: String,
}

impl TryFrom<AliasRow> for AliasRecord {
    type Error = RepositoryError;

    fn try_from(row: AliasRow) -> Result<Self, Self::Error> {
        Ok(AliasRecord {
            id: parse_uuid(&row.id)?,
            character_id: parse_uuid(&row.character_id)?,
            alias: row.alias,
            confidence: row.confidence,
            source_sentence: row.source_sentence,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct MergeAuditRow {
    id: String,
    book_id: String,
    source_id: String,
    target_id: String,
    reason: String,
    actor: String,
    created_at: String,
}

impl TryFrom<MergeAuditRow> for MergeAuditRecord {
    type Error = RepositoryError;

    fn try_from(row: MergeAuditRow) -> Result<Self, Self::Error> {
        Ok(MergeAuditRecord {
            id: parse_uuid(&row.id)?,
            book_id: parse_uuid(&row.book_id)?,
            source_id: parse_uuid(&row.source_id)?,
            target_id: parse_uuid(&row.target_id)?,
            reason: row.reason,
            actor: row.actor,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

fn parse_json(s: &str) -> Result<Value, RepositoryError> {
    serde_json::from_str(s).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

const CHARACTER_COLUMNS: &str = "id, book_id, canonical_name, characteristics, voice_preferences, emotion_profile, gender_hint, age_hint, is_active, mentions, quotes, created_at, updated_at";

#[async_trait]
impl CharacterRepositoryPort for SqliteCharacterRepository {
    async fn save(&self, character: &CharacterRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO character_profiles
                (id, book_id, canonical_name, characteristics, voice_preferences, emotion_profile,
                 gender_hint, age_hint, is_active, mentions, quotes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                canonical_name = excluded.canonical_name,
                characteristics = excluded.characteristics,
                voice_preferences = excluded.voice_preferences,
                emotion_profile = excluded.emotion_profile,
                gender_hint = excluded.gender_hint,
                age_hint = excluded.age_hint,
                is_active = excluded.is_active,
                mentions = excluded.mentions,
                quotes = excluded.quotes,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(character.id.to_string())
        .bind(character.book_id.to_string())
        .bind(&character.canonical_name)
        .bind(character.characteristics.to_string())
        .bind(character.voice_preferences.to_string())
        .bind(character.emotion_profile.to_string())
        .bind(character.gender_hint.as_str())
        .bind(character.age_hint.map(|v| v as i64))
        .bind(character.is_active as i64)
        .bind(character.mentions as i64)
        .bind(character.quotes as i64)
        .bind(character.created_at.to_rfc3339())
        .bind(character.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CharacterRecord>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM character_profiles WHERE id = ?",
            CHARACTER_COLUMNS
        );
        let row: Option<CharacterRow> = sqlx::query_as(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(CharacterRecord::try_from).transpose()
    }

    async fn find_active_by_book(
        &self,
        book_id: Uuid,
    ) -> Result<Vec<CharacterRecord>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM character_profiles WHERE book_id = ? AND is_active = 1 ORDER BY quotes DESC, mentions DESC",
            CHARACTER_COLUMNS
        );
        let rows: Vec<CharacterRow> = sqlx::query_as(&query)
            .bind(book_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(CharacterRecord::try_from).collect()
    }

    async fn find_active_by_name_or_alias(
        &self,
        book_id: Uuid,
        name: &str,
    ) -> Result<Option<CharacterRecord>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {} FROM character_profiles
            WHERE book_id = ? AND is_active = 1
              AND (canonical_name = ?
                   OR id IN (SELECT character_id FROM character_aliases WHERE alias = ?))
            ORDER BY canonical_name = ? DESC
            LIMIT 1
            "#,
            CHARACTER_COLUMNS
        );
        let row: Option<CharacterRow> = sqlx::query_as(&query)
            .bind(book_id.to_string())
            .bind(name)
            .bind(name)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(CharacterRecord::try_from).transpose()
    }

    async fn upsert_alias(
        &self,
        alias: &AliasRecord,
    ) -> Result<AliasUpsertOutcome, RepositoryError> {
        let existing: Option<AliasRow> = sqlx::query_as(
            "SELECT id, character_id, alias, confidence, source_sentence, created_at FROM character_aliases WHERE character_id = ? AND alias = ?",
        )
        .bind(alias.character_id.to_string())
        .bind(&alias.alias)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        match existing {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO character_aliases (id, character_id, alias, confidence, source_sentence, created_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(alias.id.to_string())
                .bind(alias.character_id.to_string())
                .bind(&alias.alias)
                .bind(alias.confidence)
                .bind(&alias.source_sentence)
                .bind(alias.created_at.to_rfc3339())
                .execute(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

                Ok(AliasUpsertOutcome::Inserted)
            }
            // 高置信度胜出，持平时取最近一次观测
            Some(row) if alias.confidence >= row.confidence => {
                sqlx::query(
                    r#"
                    UPDATE character_aliases
                    SET confidence = ?, source_sentence = ?, created_at = ?
                    WHERE character_id = ? AND alias = ?
                    "#,
                )
                .bind(alias.confidence)
                .bind(&alias.source_sentence)
                .bind(alias.created_at.to_rfc3339())
                .bind(alias.character_id.to_string())
                .bind(&alias.alias)
                .execute(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

                Ok(AliasUpsertOutcome::Refreshed)
            }
            Some(_) => Ok(AliasUpsertOutcome::Kept),
        }
    }

    async fn find_aliases(&self, character_id: Uuid) -> Result<Vec<AliasRecord>, RepositoryError> {
        let rows: Vec<AliasRow> = sqlx::query_as(
            "SELECT id, character_id, alias, confidence, source_sentence, created_at FROM character_aliases WHERE character_id = ? ORDER BY confidence DESC, created_at DESC",
        )
        .bind(character_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(AliasRecord::try_from).collect()
    }

    async fn find_merge_edges(&self, book_id: Uuid) -> Result<Vec<MergeEdge>, RepositoryError> {
        #[derive(FromRow)]
        struct EdgeRow {
            source_id: String,
            target_id: String,
        }

        let rows: Vec<EdgeRow> = sqlx::query_as(
            "SELECT source_id, target_id FROM character_merge_audits WHERE book_id = ?",
        )
        .bind(book_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                Ok(MergeEdge {
                    source_id: parse_uuid(&row.source_id)?,
                    target_id: parse_uuid(&row.target_id)?,
                })
            })
            .collect()
    }

    async fn find_merge_audits(
        &self,
        book_id: Uuid,
    ) -> Result<Vec<MergeAuditRecord>, RepositoryError> {
        let rows: Vec<MergeAuditRow> = sqlx::query_as(
            "SELECT id, book_id, source_id, target_id, reason, actor, created_at FROM character_merge_audits WHERE book_id = ? ORDER BY created_at",
        )
        .bind(book_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(MergeAuditRecord::try_from).collect()
    }

    async fn find_active_root(&self, id: Uuid) -> Result<CharacterRecord, RepositoryError> {
        let character = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("character: {}", id)))?;
        if character.is_active {
            return Ok(character);
        }

        let edges = self.find_merge_edges(character.book_id).await?;
        let root_id = resolve_root(id, &edges)
            .map_err(|e| RepositoryError::DatabaseError(format!("merge graph corrupt: {}", e)))?;

        let root = self
            .find_by_id(root_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("merge root: {}", root_id)))?;
        if !root.is_active {
            return Err(RepositoryError::DatabaseError(format!(
                "merge root {} is inactive",
                root_id
            )));
        }

        Ok(root)
    }

    async fn merge(&self, request: &MergeRequest) -> Result<MergeOutcome, RepositoryError> {
        let source = self
            .find_by_id(request.source_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("character: {}", request.source_id)))?;
        let target = self
            .find_by_id(request.target_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("character: {}", request.target_id)))?;
        if !source.is_active {
            return Err(RepositoryError::Conflict(format!(
                "source character {} is inactive",
                source.id
            )));
        }
        if !target.is_active {
            return Err(RepositoryError::Conflict(format!(
                "target character {} is inactive",
                target.id
            )));
        }

        let audit = CharacterMergeAudit::new(
            request.book_id,
            source.id,
            target.id,
            request.reason.clone(),
            request.actor.clone(),
        )
        .map_err(|e| RepositoryError::Conflict(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        let source_id = source.id.to_string();
        let target_id = target.id.to_string();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        // 与 target 冲突的 source 别名直接丢弃（target 侧已有同名记录）
        sqlx::query(
            r#"
            DELETE FROM character_aliases
            WHERE character_id = ?
              AND alias IN (SELECT alias FROM character_aliases WHERE character_id = ?)
            "#,
        )
        .bind(&source_id)
        .bind(&target_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let moved_aliases = sqlx::query(
            "UPDATE character_aliases SET character_id = ? WHERE character_id = ?",
        )
        .bind(&target_id)
        .bind(&source_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?
        .rows_affected() as usize;

        // source 的规范名以满置信度成为 target 的别名
        sqlx::query(
            r#"
            INSERT INTO character_aliases (id, character_id, alias, confidence, source_sentence, created_at)
            VALUES (?, ?, ?, 1.0, NULL, ?)
            ON CONFLICT(character_id, alias) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&target_id)
        .bind(&source.canonical_name)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let moved_sentences = sqlx::query(
            "UPDATE script_sentences SET character_id = ? WHERE character_id = ?",
        )
        .bind(&target_id)
        .bind(&source_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?
        .rows_affected() as usize;

        // 同一音色在 target 侧已有绑定的，source 侧绑定丢弃
        sqlx::query(
            r#"
            DELETE FROM character_voice_bindings
            WHERE character_id = ?
              AND voice_id IN (SELECT voice_id FROM character_voice_bindings WHERE character_id = ?)
            "#,
        )
        .bind(&source_id)
        .bind(&target_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        // target 已有默认绑定时，迁移过去的绑定一律降级，保住默认唯一性
        sqlx::query(
            r#"
            UPDATE character_voice_bindings SET is_default = 0, updated_at = ?
            WHERE character_id = ?
              AND EXISTS (SELECT 1 FROM character_voice_bindings
                          WHERE character_id = ? AND is_default = 1)
            "#,
        )
        .bind(&now)
        .bind(&source_id)
        .bind(&target_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let moved_bindings = sqlx::query(
            "UPDATE character_voice_bindings SET character_id = ?, updated_at = ? WHERE character_id = ?",
        )
        .bind(&target_id)
        .bind(&now)
        .bind(&source_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?
        .rows_affected() as usize;

        // 计数并入 target
        sqlx::query(
            r#"
            UPDATE character_profiles
            SET mentions = mentions + ?, quotes = quotes + ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(source.mentions as i64)
        .bind(source.quotes as i64)
        .bind(&now)
        .bind(&target_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        // 停用 source，身份从不删除
        sqlx::query(
            "UPDATE character_profiles SET is_active = 0, updated_at = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(&source_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO character_merge_audits (id, book_id, source_id, target_id, reason, actor, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(audit.id.to_string())
        .bind(audit.book_id.to_string())
        .bind(&source_id)
        .bind(&target_id)
        .bind(&audit.reason)
        .bind(&audit.actor)
        .bind(audit.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(MergeOutcome {
            audit_id: audit.id,
            target_id: target.id,
            moved_aliases,
            moved_sentences,
            moved_bindings,
        })
    }

    async fn bump_counters(
        &self,
        character_id: Uuid,
        mentions_delta: u64,
        quotes_delta: u64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE character_profiles
            SET mentions = mentions + ?, quotes = quotes + ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(mentions_delta as i64)
        .bind(quotes_delta as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(character_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "character: {}",
                character_id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};

    async fn setup() -> SqliteCharacterRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteCharacterRepository::new(pool)
    }

    fn character(book_id: Uuid, name: &str) -> CharacterRecord {
        let now = Utc::now();
        CharacterRecord {
            id: Uuid::new_v4(),
            book_id,
            canonical_name: name.to_string(),
            characteristics: Value::Object(Default::default()),
            voice_preferences: Value::Object(Default::default()),
            emotion_profile: Value::Object(Default::default()),
            gender_hint: GenderHint::Unknown,
            age_hint: None,
            is_active: true,
            mentions: 0,
            quotes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn alias(character_id: Uuid, alias: &str, confidence: f64) -> AliasRecord {
        AliasRecord {
            id: Uuid::new_v4(),
            character_id,
            alias: alias.to_string(),
            confidence,
            source_sentence: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_find_by_name_or_alias() {
        let repo = setup().await;
        let book_id = Uuid::new_v4();
        let c = character(book_id, "林黛玉");
        repo.save(&c).await.unwrap();
        repo.upsert_alias(&alias(c.id, "黛玉", 0.9)).await.unwrap();

        let by_name = repo
            .find_active_by_name_or_alias(book_id, "林黛玉")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.id, c.id);

        let by_alias = repo
            .find_active_by_name_or_alias(book_id, "黛玉")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_alias.id, c.id);

        assert!(repo
            .find_active_by_name_or_alias(book_id, "贾宝玉")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_alias_confidence_policy() {
        let repo = setup().await;
        let c = character(Uuid::new_v4(), "角色");
        repo.save(&c).await.unwrap();

        let first = repo.upsert_alias(&alias(c.id, "小名", 0.5)).await.unwrap();
        assert_eq!(first, AliasUpsertOutcome::Inserted);

        // 更低置信度保持不变
        let lower = repo.upsert_alias(&alias(c.id, "小名", 0.3)).await.unwrap();
        assert_eq!(lower, AliasUpsertOutcome::Kept);

        // 持平取最近一次
        let equal = repo.upsert_alias(&alias(c.id, "小名", 0.5)).await.unwrap();
        assert_eq!(equal, AliasUpsertOutcome::Refreshed);

        let higher = repo.upsert_alias(&alias(c.id, "小名", 0.8)).await.unwrap();
        assert_eq!(higher, AliasUpsertOutcome::Refreshed);

        let aliases = repo.find_aliases(c.id).await.unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].confidence, 0.8);
    }

    #[tokio::test]
    async fn test_merge_moves_and_deactivates() {
        let repo = setup().await;
        let book_id = Uuid::new_v4();
        let mut source = character(book_id, "老张");
        source.mentions = 3;
        source.quotes = 2;
        let target = character(book_id, "张三");
        repo.save(&source).await.unwrap();
        repo.save(&target).await.unwrap();
        repo.upsert_alias(&alias(source.id, "张叔", 0.7)).await.unwrap();

        let outcome = repo
            .merge(&MergeRequest {
                book_id,
                source_id: source.id,
                target_id: target.id,
                reason: "同一人".to_string(),
                actor: "editor".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(outcome.target_id, target.id);
        assert_eq!(outcome.moved_aliases, 1);

        // source 停用、规范名成为 target 的别名
        let merged_source = repo.find_by_id(source.id).await.unwrap().unwrap();
        assert!(!merged_source.is_active);
        let aliases = repo.find_aliases(target.id).await.unwrap();
        let names: Vec<&str> = aliases.iter().map(|a| a.alias.as_str()).collect();
        assert!(names.contains(&"张叔"));
        assert!(names.contains(&"老张"));

        // 计数并入
        let merged_target = repo.find_by_id(target.id).await.unwrap().unwrap();
        assert_eq!(merged_target.mentions, 3);
        assert_eq!(merged_target.quotes, 2);

        // 审计恰好一条
        let audits = repo.find_merge_audits(book_id).await.unwrap();
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].source_id, source.id);
    }

    #[tokio::test]
    async fn test_merge_inactive_source_rejected() {
        let repo = setup().await;
        let book_id = Uuid::new_v4();
        let a = character(book_id, "甲");
        let b = character(book_id, "乙");
        let c = character(book_id, "丙");
        repo.save(&a).await.unwrap();
        repo.save(&b).await.unwrap();
        repo.save(&c).await.unwrap();

        repo.merge(&MergeRequest {
            book_id,
            source_id: a.id,
            target_id: b.id,
            reason: "r".to_string(),
            actor: "t".to_string(),
        })
        .await
        .unwrap();

        // a 已停用，不能再次作为 source
        let result = repo
            .merge(&MergeRequest {
                book_id,
                source_id: a.id,
                target_id: c.id,
                reason: "r".to_string(),
                actor: "t".to_string(),
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_active_root_follows_chain() {
        let repo = setup().await;
        let book_id = Uuid::new_v4();
        let a = character(book_id, "a");
        let b = character(book_id, "b");
        let c = character(book_id, "c");
        repo.save(&a).await.unwrap();
        repo.save(&b).await.unwrap();
        repo.save(&c).await.unwrap();

        repo.merge(&MergeRequest {
            book_id,
            source_id: a.id,
            target_id: b.id,
            reason: "r".to_string(),
            actor: "t".to_string(),
        })
        .await
        .unwrap();
        repo.merge(&MergeRequest {
            book_id,
            source_id: b.id,
            target_id: c.id,
            reason: "r".to_string(),
            actor: "t".to_string(),
        })
        .await
        .unwrap();

        // a → b → c，a 的活跃根是 c
        let root = repo.find_active_root(a.id).await.unwrap();
        assert_eq!(root.id, c.id);
        // 活跃角色的根是自身
        let self_root = repo.find_active_root(c.id).await.unwrap();
        assert_eq!(self_root.id, c.id);
    }

    #[tokio::test]
    async fn test_bump_counters() {
        let repo = setup().await;
        let c = character(Uuid::new_v4(), "计数");
        repo.save(&c).await.unwrap();

        repo.bump_counters(c.id, 2, 1).await.unwrap();
        repo.bump_counters(c.id, 1, 0).await.unwrap();

        let found = repo.find_by_id(c.id).await.unwrap().unwrap();
        assert_eq!(found.mentions, 3);
        assert_eq!(found.quotes, 1);
    }
}
