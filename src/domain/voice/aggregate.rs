//! Voice Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{SynthesisParams, VoiceCharacteristics};

/// TtsVoiceProfile 聚合根 - 某 provider 提供的一个可合成音色
///
/// 音色跨书共享，不属于任何 Book 聚合。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsVoiceProfile {
    id: Uuid,
    /// TTS 服务提供方（如 "azure"、"edge-tts"）
    provider: String,
    /// provider 侧的音色标识
    provider_voice_id: String,
    name: String,
    characteristics: VoiceCharacteristics,
    /// 基准合成参数
    default_params: SynthesisParams,
    /// 试听音频引用（blob 存储内的不透明引用）
    preview_path: Option<String>,
    usage_count: u64,
    rating: f32,
    is_available: bool,
    created_at: DateTime<Utc>,
}

impl TtsVoiceProfile {
    pub fn new(
        provider: impl Into<String>,
        provider_voice_id: impl Into<String>,
        name: impl Into<String>,
        characteristics: VoiceCharacteristics,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider: provider.into(),
            provider_voice_id: provider_voice_id.into(),
            name: name.into(),
            characteristics,
            default_params: SynthesisParams::default(),
            preview_path: None,
            usage_count: 0,
            rating: 0.0,
            is_available: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_default_params(mut self, params: SynthesisParams) -> Self {
        self.default_params = params;
        self
    }

    pub fn with_preview(mut self, preview_path: impl Into<String>) -> Self {
        self.preview_path = Some(preview_path.into());
        self
    }

    pub fn record_usage(&mut self) {
        self.usage_count += 1;
    }

    pub fn set_rating(&mut self, rating: f32) {
        self.rating = rating.clamp(0.0, 5.0);
    }

    pub fn set_available(&mut self, available: bool) {
        self.is_available = available;
    }

    // Getters
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn provider_voice_id(&self) -> &str {
        &self.provider_voice_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn characteristics(&self) -> &VoiceCharacteristics {
        &self.characteristics
    }

    pub fn default_params(&self) -> &SynthesisParams {
        &self.default_params
    }

    pub fn preview_path(&self) -> Option<&str> {
        self.preview_path.as_deref()
    }

    pub fn usage_count(&self) -> u64 {
        self.usage_count
    }

    pub fn rating(&self) -> f32 {
        self.rating
    }

    pub fn is_available(&self) -> bool {
        self.is_available
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
