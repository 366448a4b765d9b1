//! Voice Command Handlers - 音色登记与绑定

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{BindVoice, RegisterVoice};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    BindingRecord, CharacterRepositoryPort, VoiceRecord, VoiceRepositoryPort,
};
use crate::domain::voice::TtsVoiceProfile;

// ============================================================================
// RegisterVoice
// ============================================================================

/// RegisterVoice Handler - 登记供应商音色
pub struct RegisterVoiceHandler {
    voice_repo: Arc<dyn VoiceRepositoryPort>,
}

impl RegisterVoiceHandler {
    pub fn new(voice_repo: Arc<dyn VoiceRepositoryPort>) -> Self {
        Self { voice_repo }
    }

    pub async fn handle(&self, command: RegisterVoice) -> Result<VoiceRecord, ApplicationError> {
        if command.name.trim().is_empty() {
            return Err(ApplicationError::validation("音色名称不能为空"));
        }
        if command.provider.trim().is_empty() || command.provider_voice_id.trim().is_empty() {
            return Err(ApplicationError::validation(
                "provider 与 provider_voice_id 不能为空",
            ));
        }

        let mut profile = TtsVoiceProfile::new(
            command.provider,
            command.provider_voice_id,
            command.name,
            command.characteristics,
        );
        if let Some(params) = command.default_params {
            params
                .validate()
                .map_err(|e| ApplicationError::validation(e.to_string()))?;
            profile = profile.with_default_params(params);
        }
        if let Some(preview) = command.preview_path {
            profile = profile.with_preview(preview);
        }

        let voice = VoiceRecord {
            id: profile.id(),
            provider: profile.provider().to_string(),
            provider_voice_id: profile.provider_voice_id().to_string(),
            name: profile.name().to_string(),
            characteristics: profile.characteristics().clone(),
            default_params: profile.default_params().clone(),
            preview_path: profile.preview_path().map(str::to_string),
            usage_count: profile.usage_count(),
            rating: profile.rating(),
            is_available: profile.is_available(),
            created_at: profile.created_at(),
        };
        self.voice_repo.save(&voice).await?;

        tracing::info!(
            voice_id = %voice.id,
            provider = %voice.provider,
            name = %voice.name,
            "Voice registered"
        );

        Ok(voice)
    }
}

// ============================================================================
// BindVoice
// ============================================================================

/// BindVoice Handler - 建立角色-音色绑定
///
/// 角色先规范化到活跃根；`is_default = true` 的提升由仓储
/// 在同一事务内降级旧默认，单角色默认绑定唯一性由部分唯一索引兜底。
pub struct BindVoiceHandler {
    voice_repo: Arc<dyn VoiceRepositoryPort>,
    character_repo: Arc<dyn CharacterRepositoryPort>,
}

impl BindVoiceHandler {
    pub fn new(
        voice_repo: Arc<dyn VoiceRepositoryPort>,
        character_repo: Arc<dyn CharacterRepositoryPort>,
    ) -> Self {
        Self {
            voice_repo,
            character_repo,
        }
    }

    pub async fn handle(&self, command: BindVoice) -> Result<BindingRecord, ApplicationError> {
        let character = self
            .character_repo
            .find_active_root(command.character_id)
            .await?;

        let voice = self
            .voice_repo
            .find_by_id(command.voice_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Voice", command.voice_id))?;
        if !voice.is_available {
            return Err(ApplicationError::business_rule(format!(
                "音色不可用: {}",
                voice.id
            )));
        }

        let now = Utc::now();
        let binding = BindingRecord {
            id: Uuid::new_v4(),
            character_id: character.id,
            voice_id: voice.id,
            custom_params: command.custom_params.unwrap_or_default(),
            emotion_overlays: command.emotion_overlays.unwrap_or_default(),
            is_default: command.is_default,
            created_at: now,
            updated_at: now,
        };
        self.voice_repo.bind(&binding).await?;

        tracing::info!(
            character_id = %character.id,
            voice_id = %voice.id,
            is_default = command.is_default,
            "Voice bound to character"
        );

        Ok(binding)
    }
}
