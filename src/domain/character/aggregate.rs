//! Character Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{CanonicalName, GenderHint};

/// CharacterProfile 聚合根 - 一本书内的一个规范说话实体
///
/// 不变量:
/// - 被合并吸收的角色只停用（is_active = false），从不删除
/// - mentions / quotes 计数只增不减
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterProfile {
    id: Uuid,
    book_id: Uuid,
    canonical_name: CanonicalName,
    /// 人物特征包（外部检测器给出的描述、性格、重要度等）
    characteristics: Value,
    /// 音色偏好包
    voice_preferences: Value,
    /// 情感画像包
    emotion_profile: Value,
    gender_hint: GenderHint,
    age_hint: Option<u32>,
    is_active: bool,
    mentions: u64,
    quotes: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CharacterProfile {
    /// 首次检测到说话人时创建角色
    pub fn new(book_id: Uuid, canonical_name: CanonicalName) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            book_id,
            canonical_name,
            characteristics: Value::Object(Default::default()),
            voice_preferences: Value::Object(Default::default()),
            emotion_profile: Value::Object(Default::default()),
            gender_hint: GenderHint::Unknown,
            age_hint: None,
            is_active: true,
            mentions: 0,
            quotes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 记录一次提及
    pub fn record_mention(&mut self) {
        self.mentions += 1;
        self.updated_at = Utc::now();
    }

    /// 记录一次引语（角色开口说话）
    pub fn record_quote(&mut self) {
        self.quotes += 1;
        self.updated_at = Utc::now();
    }

    /// 吸收另一角色的计数（合并时调用）
    pub fn absorb_counters(&mut self, other: &CharacterProfile) {
        self.mentions += other.mentions;
        self.quotes += other.quotes;
        self.updated_at = Utc::now();
    }

    /// 停用角色（合并后的 source 角色保留历史但不再参与解析）
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }

    pub fn set_gender_hint(&mut self, hint: GenderHint) {
        self.gender_hint = hint;
        self.updated_at = Utc::now();
    }

    pub fn set_age_hint(&mut self, age: Option<u32>) {
        self.age_hint = age;
        self.updated_at = Utc::now();
    }

    pub fn set_characteristics(&mut self, value: Value) {
        self.characteristics = value;
        self.updated_at = Utc::now();
    }

    pub fn set_voice_preferences(&mut self, value: Value) {
        self.voice_preferences = value;
        self.updated_at = Utc::now();
    }

    pub fn set_emotion_profile(&mut self, value: Value) {
        self.emotion_profile = value;
        self.updated_at = Utc::now();
    }

    // Getters
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn book_id(&self) -> Uuid {
        self.book_id
    }

    pub fn canonical_name(&self) -> &CanonicalName {
        &self.canonical_name
    }

    pub fn characteristics(&self) -> &Value {
        &self.characteristics
    }

    pub fn voice_preferences(&self) -> &Value {
        &self.voice_preferences
    }

    pub fn emotion_profile(&self) -> &Value {
        &self.emotion_profile
    }

    pub fn gender_hint(&self) -> GenderHint {
        self.gender_hint
    }

    pub fn age_hint(&self) -> Option<u32> {
        self.age_hint
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn mentions(&self) -> u64 {
        self.mentions
    }

    pub fn quotes(&self) -> u64 {
        self.quotes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_character_is_active() {
        let name = CanonicalName::new("萧炎").unwrap();
        let character = CharacterProfile::new(Uuid::new_v4(), name);

        assert!(character.is_active());
        assert_eq!(character.mentions(), 0);
        assert_eq!(character.quotes(), 0);
    }

    #[test]
    fn test_deactivate_preserves_counters() {
        let name = CanonicalName::new("萧炎").unwrap();
        let mut character = CharacterProfile::new(Uuid::new_v4(), name);
        character.record_mention();
        character.record_quote();
        character.deactivate();

        assert!(!character.is_active());
        assert_eq!(character.mentions(), 1);
        assert_eq!(character.quotes(), 1);
    }

    #[test]
    fn test_absorb_counters() {
        let book_id = Uuid::new_v4();
        let mut target = CharacterProfile::new(book_id, CanonicalName::new("萧炎").unwrap());
        let mut source = CharacterProfile::new(book_id, CanonicalName::new("小炎子").unwrap());
        target.record_quote();
        source.record_quote();
        source.record_mention();

        target.absorb_counters(&source);
        assert_eq!(target.quotes(), 2);
        assert_eq!(target.mentions(), 1);
    }
}
