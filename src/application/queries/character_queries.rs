//! Character Queries

use uuid::Uuid;

/// 获取书籍的活跃角色
#[derive(Debug, Clone)]
pub struct GetBookCharacters {
    pub book_id: Uuid,
}

/// 获取角色的别名（角色 ID 先规范化到活跃根）
#[derive(Debug, Clone)]
pub struct GetCharacterAliases {
    pub character_id: Uuid,
}

/// 获取书籍的合并审计历史
#[derive(Debug, Clone)]
pub struct GetMergeHistory {
    pub book_id: Uuid,
}
