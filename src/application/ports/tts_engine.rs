//! TTS Engine Port - TTS 合成引擎抽象
//!
//! 外部 TTS 服务的出站端口，具体实现在 infrastructure/adapters 层。
//! 本 crate 只发起合成并记录结果，不落地音频数据本身
//! （产物引用指向外部 blob 存储）。

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::voice::SynthesisParams;

/// TTS 错误
///
/// 瞬时错误（网络、超时、限流）可重试并记录在音频文件上；
/// 致命错误（音色不存在、输入非法）使任务进入 failed。
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TtsError {
    /// 该错误是否值得重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TtsError::NetworkError(_)
                | TtsError::Timeout
                | TtsError::RateLimited
                | TtsError::ServiceError(_)
        )
    }
}

/// 合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// 要合成的文本内容
    pub text: String,
    /// provider 侧的音色标识
    pub provider_voice_id: String,
    /// 有效合成参数（基准 ⊕ 情感叠加 ⊕ 绑定叠加 ⊕ 句级叠加之后）
    pub params: SynthesisParams,
}

/// 合成结果
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    /// 产物在 blob 存储中的不透明引用
    pub audio_ref: String,
    /// 音频时长（毫秒）
    pub duration_ms: u64,
    /// 产物字节数
    pub file_size: u64,
    /// 音频格式（如 "wav"、"mp3"）
    pub format: String,
}

/// TTS Engine Port
#[async_trait]
pub trait TtsEnginePort: Send + Sync {
    /// provider 标识（记录到音频文件上）
    fn provider(&self) -> &str;

    /// 执行合成
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisOutput, TtsError>;

    /// 检查服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
