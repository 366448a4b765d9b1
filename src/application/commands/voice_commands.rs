//! Voice Commands

use uuid::Uuid;

use crate::domain::voice::{
    EmotionOverlayMap, ParamOverlay, SynthesisParams, VoiceCharacteristics,
};

/// 注册音色命令
#[derive(Debug, Clone)]
pub struct RegisterVoice {
    pub provider: String,
    pub provider_voice_id: String,
    pub name: String,
    pub characteristics: VoiceCharacteristics,
    pub default_params: Option<SynthesisParams>,
    pub preview_path: Option<String>,
}

/// 绑定音色命令
///
/// `is_default = true` 时提升为默认绑定，旧默认在同一事务内被降级。
#[derive(Debug, Clone)]
pub struct BindVoice {
    pub character_id: Uuid,
    pub voice_id: Uuid,
    pub custom_params: Option<ParamOverlay>,
    pub emotion_overlays: Option<EmotionOverlayMap>,
    pub is_default: bool,
}
