//! Character Context - Errors

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CharacterError {
    #[error("不能将角色合并到自身: {0}")]
    SelfMerge(Uuid),

    #[error("合并图存在环，审计数据异常: {0}")]
    MergeCycle(Uuid),

    #[error("无效的角色名: {0}")]
    InvalidName(String),

    #[error("无效的置信度: {0}")]
    InvalidConfidence(f64),
}
