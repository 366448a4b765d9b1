//! Voice Queries

use uuid::Uuid;

/// 获取所有可用音色
#[derive(Debug, Clone, Default)]
pub struct ListAvailableVoices;

/// 解析角色的有效音色与合成参数
///
/// 解析链：活跃根 → 默认绑定（或任一绑定）→ 无绑定时按
/// 性别/年龄提示启发式兜底。`emotion` 用于情感叠加查表。
#[derive(Debug, Clone)]
pub struct ResolveCharacterVoice {
    pub character_id: Uuid,
    pub emotion: Option<String>,
}
