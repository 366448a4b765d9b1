//! Character Command Handlers - 角色解析

use std::sync::Arc;

use crate::application::commands::{MergeCharacters, RecordAlias, UpsertCharacter};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AliasRecord, AliasUpsertOutcome, CharacterRecord, CharacterRepositoryPort, MergeLockPort,
    MergeOutcome, MergeRequest,
};
use crate::domain::character::{AliasConfidence, CanonicalName, CharacterAlias, CharacterProfile};

// ============================================================================
// UpsertCharacter
// ============================================================================

/// UpsertCharacter Handler - 创建或取回既有活跃角色
///
/// 匹配顺序：规范名 → 别名；均不命中时创建新角色。
pub struct UpsertCharacterHandler {
    character_repo: Arc<dyn CharacterRepositoryPort>,
}

impl UpsertCharacterHandler {
    pub fn new(character_repo: Arc<dyn CharacterRepositoryPort>) -> Self {
        Self { character_repo }
    }

    pub async fn handle(
        &self,
        command: UpsertCharacter,
    ) -> Result<CharacterRecord, ApplicationError> {
        let name = CanonicalName::new(command.candidate_name)
            .map_err(|e| ApplicationError::validation(e.to_string()))?;

        if let Some(existing) = self
            .character_repo
            .find_active_by_name_or_alias(command.book_id, name.as_str())
            .await?
        {
            return Ok(existing);
        }

        let profile = CharacterProfile::new(command.book_id, name);
        let character = CharacterRecord {
            id: profile.id(),
            book_id: profile.book_id(),
            canonical_name: profile.canonical_name().as_str().to_string(),
            characteristics: profile.characteristics().clone(),
            voice_preferences: profile.voice_preferences().clone(),
            emotion_profile: profile.emotion_profile().clone(),
            gender_hint: profile.gender_hint(),
            age_hint: profile.age_hint(),
            is_active: profile.is_active(),
            mentions: profile.mentions(),
            quotes: profile.quotes(),
            created_at: profile.created_at(),
            updated_at: profile.updated_at(),
        };
        self.character_repo.save(&character).await?;

        tracing::info!(
            book_id = %command.book_id,
            character_id = %character.id,
            canonical_name = %character.canonical_name,
            "Character created"
        );

        Ok(character)
    }
}

// ============================================================================
// RecordAlias
// ============================================================================

/// RecordAlias Handler - 记录/刷新别名
///
/// 别名总是落在角色的活跃根上（历史 ID 先规范化），
/// 保证任意历史别名解析出的角色始终是活跃的。
pub struct RecordAliasHandler {
    character_repo: Arc<dyn CharacterRepositoryPort>,
}

impl RecordAliasHandler {
    pub fn new(character_repo: Arc<dyn CharacterRepositoryPort>) -> Self {
        Self { character_repo }
    }

    pub async fn handle(
        &self,
        command: RecordAlias,
    ) -> Result<AliasUpsertOutcome, ApplicationError> {
        let confidence = AliasConfidence::new(command.confidence)
            .map_err(|e| ApplicationError::validation(e.to_string()))?;
        let alias = command.alias.trim();
        if alias.is_empty() {
            return Err(ApplicationError::validation("别名不能为空"));
        }

        // 规范化到活跃根（角色可能已被合并吸收）
        let root = self
            .character_repo
            .find_active_root(command.character_id)
            .await?;

        let entity =
            CharacterAlias::new(root.id, alias, confidence.value(), command.source_sentence);
        let record = AliasRecord {
            id: entity.id,
            character_id: entity.character_id,
            alias: entity.alias,
            confidence: entity.confidence,
            source_sentence: entity.source_sentence,
            created_at: entity.created_at,
        };
        let outcome = self.character_repo.upsert_alias(&record).await?;

        tracing::debug!(
            character_id = %root.id,
            alias = %record.alias,
            confidence = record.confidence,
            outcome = ?outcome,
            "Alias recorded"
        );

        Ok(outcome)
    }
}

// ============================================================================
// MergeCharacters
// ============================================================================

/// MergeCharacters Handler - 原子身份合并
///
/// 合并按书串行化（顾问锁），双方先规范化到活跃根；
/// 重挂与停用在仓储的单事务内完成，全有或全无。
pub struct MergeCharactersHandler {
    character_repo: Arc<dyn CharacterRepositoryPort>,
    merge_lock: Arc<dyn MergeLockPort>,
}

impl MergeCharactersHandler {
    pub fn new(
        character_repo: Arc<dyn CharacterRepositoryPort>,
        merge_lock: Arc<dyn MergeLockPort>,
    ) -> Self {
        Self {
            character_repo,
            merge_lock,
        }
    }

    pub async fn handle(
        &self,
        command: MergeCharacters,
    ) -> Result<MergeOutcome, ApplicationError> {
        if command.source_id == command.target_id {
            return Err(ApplicationError::validation(format!(
                "不能将角色合并到自身: {}",
                command.source_id
            )));
        }

        let _guard = self.merge_lock.acquire(command.book_id).await;

        // source 必须仍是活跃根（已被吸收的角色不能再次作为 source）
        let source = self
            .character_repo
            .find_active_root(command.source_id)
            .await?;
        if source.id != command.source_id {
            return Err(ApplicationError::invalid_state(format!(
                "源角色 {} 已被合并到 {}",
                command.source_id, source.id
            )));
        }

        // target 规范化到活跃根（链式合并先走合并图）
        let target = self
            .character_repo
            .find_active_root(command.target_id)
            .await?;
        if target.id == source.id {
            return Err(ApplicationError::validation(format!(
                "目标角色规范化后与源角色相同: {}",
                source.id
            )));
        }
        if source.book_id != command.book_id || target.book_id != command.book_id {
            return Err(ApplicationError::validation("合并双方必须属于同一本书"));
        }

        let outcome = self
            .character_repo
            .merge(&MergeRequest {
                book_id: command.book_id,
                source_id: source.id,
                target_id: target.id,
                reason: command.reason,
                actor: command.actor,
            })
            .await?;

        tracing::info!(
            book_id = %command.book_id,
            source_id = %source.id,
            target_id = %outcome.target_id,
            moved_aliases = outcome.moved_aliases,
            moved_sentences = outcome.moved_sentences,
            moved_bindings = outcome.moved_bindings,
            "Characters merged"
        );

        Ok(outcome)
    }
}
