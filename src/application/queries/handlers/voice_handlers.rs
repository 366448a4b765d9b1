//! Voice Query Handlers - 音色解析
//!
//! ResolveCharacterVoice 是合成前的核心查询：
//! 有效参数 = 音色基准参数 ⊕ 情感叠加 ⊕ 绑定自定义叠加，
//! 无绑定时按角色提示走启发式兜底选择。

use std::sync::Arc;
use uuid::Uuid;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    BindingRecord, CharacterRecord, CharacterRepositoryPort, VoiceRecord, VoiceRepositoryPort,
};
use crate::application::queries::{ListAvailableVoices, ResolveCharacterVoice};
use crate::domain::character::GenderHint;
use crate::domain::voice::{
    AgeRange, SynthesisParams, VoiceCandidate, VoiceGender, VoicePreference, VoiceSelector,
};

/// 音色解析结果
#[derive(Debug, Clone)]
pub struct ResolvedVoice {
    pub voice: VoiceRecord,
    /// 解析途径的绑定（兜底选择时为 None）
    pub binding_id: Option<Uuid>,
    /// 叠加合并后的有效合成参数
    pub params: SynthesisParams,
    /// 是否走了启发式兜底（角色无可用绑定）
    pub is_fallback: bool,
}

/// ListAvailableVoices Handler
pub struct ListAvailableVoicesHandler {
    voice_repo: Arc<dyn VoiceRepositoryPort>,
}

impl ListAvailableVoicesHandler {
    pub fn new(voice_repo: Arc<dyn VoiceRepositoryPort>) -> Self {
        Self { voice_repo }
    }

    pub async fn handle(
        &self,
        _query: ListAvailableVoices,
    ) -> Result<Vec<VoiceRecord>, ApplicationError> {
        Ok(self.voice_repo.find_available().await?)
    }
}

/// ResolveCharacterVoice Handler
///
/// 解析链：
/// 1. 角色 ID 规范化到活跃根（合并后旧 ID 仍可解析）
/// 2. 默认绑定优先，否则取最近更新的绑定
/// 3. 绑定音色不可用或无绑定时，按性别/年龄提示兜底选择
pub struct ResolveCharacterVoiceHandler {
    character_repo: Arc<dyn CharacterRepositoryPort>,
    voice_repo: Arc<dyn VoiceRepositoryPort>,
    selector: Arc<dyn VoiceSelector>,
}

impl ResolveCharacterVoiceHandler {
    pub fn new(
        character_repo: Arc<dyn CharacterRepositoryPort>,
        voice_repo: Arc<dyn VoiceRepositoryPort>,
        selector: Arc<dyn VoiceSelector>,
    ) -> Self {
        Self {
            character_repo,
            voice_repo,
            selector,
        }
    }

    pub async fn handle(
        &self,
        query: ResolveCharacterVoice,
    ) -> Result<ResolvedVoice, ApplicationError> {
        let character = self
            .character_repo
            .find_active_root(query.character_id)
            .await?;

        if let Some(binding) = self.pick_binding(character.id).await? {
            if let Some(voice) = self.voice_repo.find_by_id(binding.voice_id).await? {
                if voice.is_available {
                    let params = effective_params(&voice, &binding, query.emotion.as_deref());
                    return Ok(ResolvedVoice {
                        voice,
                        binding_id: Some(binding.id),
                        params,
                        is_fallback: false,
                    });
                }
                tracing::warn!(
                    character_id = %character.id,
                    voice_id = %voice.id,
                    "Bound voice unavailable, falling back"
                );
            }
        }

        self.fallback(&character).await
    }

    /// 按旁白偏好解析兜底音色（未归属句子无角色可查）
    pub async fn resolve_narrator(&self) -> Result<ResolvedVoice, ApplicationError> {
        let voice = self.select_fallback(&VoicePreference::default()).await?;
        let params = voice.default_params.clone();
        Ok(ResolvedVoice {
            voice,
            binding_id: None,
            params,
            is_fallback: true,
        })
    }

    async fn pick_binding(
        &self,
        character_id: Uuid,
    ) -> Result<Option<BindingRecord>, ApplicationError> {
        if let Some(binding) = self.voice_repo.find_default_binding(character_id).await? {
            return Ok(Some(binding));
        }
        let mut bindings = self
            .voice_repo
            .find_bindings_by_character(character_id)
            .await?;
        bindings.sort_by_key(|b| b.updated_at);
        Ok(bindings.pop())
    }

    async fn fallback(
        &self,
        character: &CharacterRecord,
    ) -> Result<ResolvedVoice, ApplicationError> {
        let preference = VoicePreference {
            gender: match character.gender_hint {
                GenderHint::Male => Some(VoiceGender::Male),
                GenderHint::Female => Some(VoiceGender::Female),
                GenderHint::Unknown => None,
            },
            age_range: character.age_hint.map(AgeRange::from_age),
        };

        let voice = self.select_fallback(&preference).await?;
        let params = voice.default_params.clone();

        tracing::debug!(
            character_id = %character.id,
            voice_id = %voice.id,
            "Fallback voice selected"
        );

        Ok(ResolvedVoice {
            voice,
            binding_id: None,
            params,
            is_fallback: true,
        })
    }

    async fn select_fallback(
        &self,
        preference: &VoicePreference,
    ) -> Result<VoiceRecord, ApplicationError> {
        let voices = self.voice_repo.find_available().await?;
        let candidates: Vec<VoiceCandidate> = voices
            .iter()
            .map(|v| VoiceCandidate {
                voice_id: v.id,
                characteristics: v.characteristics.clone(),
                rating: v.rating,
                is_available: v.is_available,
            })
            .collect();

        let chosen = self
            .selector
            .select(preference, &candidates)
            .ok_or_else(|| ApplicationError::invalid_state("没有可用音色"))?;

        voices
            .into_iter()
            .find(|v| v.id == chosen.voice_id)
            .ok_or_else(|| ApplicationError::internal("selected voice missing from candidates"))
    }
}

/// 叠加合并：基准参数 ⊕ 情感叠加 ⊕ 绑定自定义叠加（右侧覆盖）
fn effective_params(
    voice: &VoiceRecord,
    binding: &BindingRecord,
    emotion: Option<&str>,
) -> SynthesisParams {
    let mut overlays = Vec::new();
    if let Some(tone) = emotion {
        if let Some(overlay) = binding.emotion_overlays.get(tone) {
            overlays.push(overlay);
        }
    }
    if !binding.custom_params.is_empty() {
        overlays.push(&binding.custom_params);
    }
    voice.default_params.apply_all(overlays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voice::{EmotionOverlayMap, ParamOverlay, VoiceCharacteristics};
    use chrono::Utc;

    fn voice_with_params(params: SynthesisParams) -> VoiceRecord {
        VoiceRecord {
            id: Uuid::new_v4(),
            provider: "fake".to_string(),
            provider_voice_id: "v1".to_string(),
            name: "测试音色".to_string(),
            characteristics: VoiceCharacteristics::default(),
            default_params: params,
            preview_path: None,
            usage_count: 0,
            rating: 3.0,
            is_available: true,
            created_at: Utc::now(),
        }
    }

    fn binding_with(
        custom: ParamOverlay,
        overlays: EmotionOverlayMap,
    ) -> BindingRecord {
        let now = Utc::now();
        BindingRecord {
            id: Uuid::new_v4(),
            character_id: Uuid::new_v4(),
            voice_id: Uuid::new_v4(),
            custom_params: custom,
            emotion_overlays: overlays,
            is_default: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_custom_overlay_wins_over_emotion() {
        let voice = voice_with_params(SynthesisParams::default());
        let mut overlays = EmotionOverlayMap::new();
        overlays.insert(
            "angry",
            ParamOverlay {
                pitch: Some(1.4),
                rate: Some(1.3),
                ..Default::default()
            },
        );
        let binding = binding_with(
            ParamOverlay {
                pitch: Some(0.9),
                ..Default::default()
            },
            overlays,
        );

        let params = effective_params(&voice, &binding, Some("angry"));
        assert_eq!(params.pitch, 0.9); // 绑定自定义覆盖情感叠加
        assert_eq!(params.rate, 1.3); // 情感叠加保留未被覆盖的字段
        assert_eq!(params.volume, 1.0);
    }

    #[test]
    fn test_unknown_emotion_ignored() {
        let voice = voice_with_params(SynthesisParams::default());
        let binding = binding_with(ParamOverlay::default(), EmotionOverlayMap::new());

        let params = effective_params(&voice, &binding, Some("wistful"));
        assert_eq!(params, SynthesisParams::default());
    }

    #[test]
    fn test_no_emotion_applies_custom_only() {
        let voice = voice_with_params(SynthesisParams {
            pitch: 1.1,
            rate: 1.0,
            volume: 0.8,
            style: None,
        });
        let binding = binding_with(
            ParamOverlay {
                volume: Some(0.5),
                ..Default::default()
            },
            EmotionOverlayMap::new(),
        );

        let params = effective_params(&voice, &binding, None);
        assert_eq!(params.pitch, 1.1);
        assert_eq!(params.volume, 0.5);
    }
}
