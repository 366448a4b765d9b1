//! Character Context - Entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CharacterError;

/// 角色别名 - 同一角色在文中出现的替代称谓
///
/// 不变量:
/// - (character_id, alias) 唯一
/// - 重复观测时按"高置信度优先、平局取最近"刷新
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterAlias {
    pub id: Uuid,
    pub character_id: Uuid,
    pub alias: String,
    pub confidence: f64,
    /// 产生该别名的原句（供人工核对）
    pub source_sentence: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CharacterAlias {
    pub fn new(
        character_id: Uuid,
        alias: impl Into<String>,
        confidence: f64,
        source_sentence: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            character_id,
            alias: alias.into(),
            confidence,
            source_sentence,
            created_at: Utc::now(),
        }
    }

    /// 重复观测时是否应替换既有记录
    pub fn supersedes(&self, existing: &CharacterAlias) -> bool {
        self.confidence >= existing.confidence
    }
}

/// 角色合并审计 - 一次身份合并的不可变记录
///
/// 不变量:
/// - 只追加，永不修改、永不删除（随 Book 级联除外）
/// - source_id != target_id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterMergeAudit {
    pub id: Uuid,
    pub book_id: Uuid,
    /// 被吸收的角色
    pub source_id: Uuid,
    /// 吸收方角色
    pub target_id: Uuid,
    pub reason: String,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl CharacterMergeAudit {
    pub fn new(
        book_id: Uuid,
        source_id: Uuid,
        target_id: Uuid,
        reason: impl Into<String>,
        actor: impl Into<String>,
    ) -> Result<Self, CharacterError> {
        if source_id == target_id {
            return Err(CharacterError::SelfMerge(source_id));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            book_id,
            source_id,
            target_id,
            reason: reason.into(),
            actor: actor.into(),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_supersedes_policy() {
        let character_id = Uuid::new_v4();
        let old = CharacterAlias::new(character_id, "小炎子", 0.82, None);
        let higher = CharacterAlias::new(character_id, "小炎子", 0.9, None);
        let lower = CharacterAlias::new(character_id, "小炎子", 0.5, None);
        let equal = CharacterAlias::new(character_id, "小炎子", 0.82, None);

        assert!(higher.supersedes(&old));
        assert!(!lower.supersedes(&old));
        // 平局取最近观测
        assert!(equal.supersedes(&old));
    }

    #[test]
    fn test_merge_audit_rejects_self_merge() {
        let id = Uuid::new_v4();
        assert!(CharacterMergeAudit::new(Uuid::new_v4(), id, id, "dup", "tester").is_err());
    }
}
