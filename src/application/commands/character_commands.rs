//! Character Commands

use uuid::Uuid;

/// 创建或取回既有活跃角色命令
#[derive(Debug, Clone)]
pub struct UpsertCharacter {
    pub book_id: Uuid,
    pub candidate_name: String,
}

/// 记录别名命令
#[derive(Debug, Clone)]
pub struct RecordAlias {
    pub character_id: Uuid,
    pub alias: String,
    pub confidence: f64,
    pub source_sentence: Option<String>,
}

/// 合并角色命令（source 被 target 吸收）
#[derive(Debug, Clone)]
pub struct MergeCharacters {
    pub book_id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub reason: String,
    pub actor: String,
}
