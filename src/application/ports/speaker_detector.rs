//! Speaker Detector Port - 说话人/情感检测器抽象
//!
//! 外部 NLP 模型的入站结果端口：给定句子文本，返回原始说话人标签、
//! 候选别名与情感韵律提示。本 crate 只消费、不实现检测本身。

use async_trait::async_trait;
use thiserror::Error;

/// 检测器错误
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Detector unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid detector response: {0}")]
    InvalidResponse(String),
}

/// 候选别名
#[derive(Debug, Clone)]
pub struct AliasCandidate {
    pub alias: String,
    /// 0.0 ~ 1.0
    pub confidence: f64,
}

/// 单句检测结果
#[derive(Debug, Clone, Default)]
pub struct SpeechAnalysis {
    /// 原始说话人标签；None 表示旁白/无法判定
    pub speaker: Option<String>,
    /// 说话人的候选别名
    pub aliases: Vec<AliasCandidate>,
    /// 情感标签（如 "neutral"、"angry"）
    pub tone: Option<String>,
    /// 情感强度（0.0 ~ 1.0）
    pub strength: Option<f32>,
    /// 建议句后停顿（毫秒）
    pub pause_after_ms: Option<u32>,
}

/// Speaker Detector Port
#[async_trait]
pub trait SpeakerDetectorPort: Send + Sync {
    /// 分析一个句子，返回说话人与韵律提示
    async fn analyze(&self, text: &str) -> Result<SpeechAnalysis, DetectorError>;
}
