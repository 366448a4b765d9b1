//! Fake TTS Client - 用于测试的 TTS 客户端
//!
//! 不实际调用 TTS 服务；时长按文本长度确定性推算，
//! 通过文本标记可触发瞬时/致命失败以测试重试路径。

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::ports::{SynthesisOutput, SynthesisRequest, TtsEnginePort, TtsError};

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 每字符时长（毫秒）
    pub ms_per_char: u64,
    /// 产物格式
    pub format: String,
    /// 文本含该标记时返回瞬时错误（可重试）
    pub transient_failure_marker: Option<String>,
    /// 文本含该标记时返回致命错误（不可重试）
    pub fatal_failure_marker: Option<String>,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            ms_per_char: 80,
            format: "wav".to_string(),
            transient_failure_marker: None,
            fatal_failure_marker: None,
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    fn provider(&self) -> &str {
        "fake"
    }

    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisOutput, TtsError> {
        if request.text.trim().is_empty() {
            return Err(TtsError::InvalidInput("empty text".to_string()));
        }
        if let Some(marker) = &self.config.transient_failure_marker {
            if request.text.contains(marker.as_str()) {
                return Err(TtsError::ServiceError("injected transient failure".to_string()));
            }
        }
        if let Some(marker) = &self.config.fatal_failure_marker {
            if request.text.contains(marker.as_str()) {
                return Err(TtsError::VoiceNotFound(request.provider_voice_id.clone()));
            }
        }

        tracing::debug!(
            text_len = request.text.len(),
            provider_voice_id = %request.provider_voice_id,
            rate = request.params.rate,
            "FakeTtsClient: synthesizing"
        );

        // 时长按字符数与语速确定性推算
        let chars = request.text.chars().count() as u64;
        let duration_ms =
            ((chars * self.config.ms_per_char) as f32 / request.params.rate.max(0.1)) as u64;
        let file_size = chars * 256;

        Ok(SynthesisOutput {
            audio_ref: format!("fake://audio/{}.{}", Uuid::new_v4(), self.config.format),
            duration_ms,
            file_size,
            format: self.config.format.clone(),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voice::SynthesisParams;

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest {
            text: text.to_string(),
            provider_voice_id: "fake-v1".to_string(),
            params: SynthesisParams::default(),
        }
    }

    #[tokio::test]
    async fn test_duration_scales_with_text() {
        let client = FakeTtsClient::with_defaults();
        let short = client.synthesize(request("短句。")).await.unwrap();
        let long = client
            .synthesize(request("这是一个明显更长的句子，用来对比时长。"))
            .await
            .unwrap();
        assert!(long.duration_ms > short.duration_ms);
        assert_eq!(short.format, "wav");
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let client = FakeTtsClient::with_defaults();
        let result = client.synthesize(request("   ")).await;
        assert!(matches!(result, Err(TtsError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_failure_markers() {
        let client = FakeTtsClient::new(FakeTtsClientConfig {
            transient_failure_marker: Some("@@flaky@@".to_string()),
            fatal_failure_marker: Some("@@fatal@@".to_string()),
            ..Default::default()
        });

        let transient = client.synthesize(request("内容 @@flaky@@")).await;
        assert!(matches!(&transient, Err(e) if e.is_retryable()));

        let fatal = client.synthesize(request("内容 @@fatal@@")).await;
        assert!(matches!(&fatal, Err(e) if !e.is_retryable()));
    }
}
