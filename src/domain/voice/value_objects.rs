//! Voice Context - Value Objects
//!
//! 合成参数与叠加（overlay）合并是音色解析的核心：
//! 有效参数 = 音色基准参数 ⊕ 情感叠加 ⊕ 绑定自定义叠加（右侧覆盖左侧）。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::VoiceError;

/// 合成参数（完整参数集，作为叠加的基底）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisParams {
    /// 音高（0.5 ~ 2.0）
    pub pitch: f32,
    /// 语速（0.5 ~ 2.0）
    pub rate: f32,
    /// 音量（0.0 ~ 1.0）
    pub volume: f32,
    /// 风格标签（provider 相关）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            rate: 1.0,
            volume: 1.0,
            style: None,
        }
    }
}

impl SynthesisParams {
    /// 校验参数处于各 provider 普遍接受的取值范围内
    pub fn validate(&self) -> Result<(), VoiceError> {
        if !(0.5..=2.0).contains(&self.pitch) {
            return Err(VoiceError::InvalidParameters(format!(
                "pitch out of range [0.5, 2.0]: {}",
                self.pitch
            )));
        }
        if !(0.5..=2.0).contains(&self.rate) {
            return Err(VoiceError::InvalidParameters(format!(
                "rate out of range [0.5, 2.0]: {}",
                self.rate
            )));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(VoiceError::InvalidParameters(format!(
                "volume out of range [0.0, 1.0]: {}",
                self.volume
            )));
        }
        Ok(())
    }

    /// 应用一层叠加，叠加中出现的字段覆盖基底
    pub fn apply(&self, overlay: &ParamOverlay) -> Self {
        Self {
            pitch: overlay.pitch.unwrap_or(self.pitch),
            rate: overlay.rate.unwrap_or(self.rate),
            volume: overlay.volume.unwrap_or(self.volume),
            style: overlay.style.clone().or_else(|| self.style.clone()),
        }
    }

    /// 依次应用多层叠加（越靠后优先级越高）
    pub fn apply_all<'a>(&self, overlays: impl IntoIterator<Item = &'a ParamOverlay>) -> Self {
        overlays
            .into_iter()
            .fold(self.clone(), |params, overlay| params.apply(overlay))
    }
}

/// 参数叠加（部分参数集，未出现的字段保持基底值）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamOverlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl ParamOverlay {
    pub fn is_empty(&self) -> bool {
        self.pitch.is_none() && self.rate.is_none() && self.volume.is_none() && self.style.is_none()
    }
}

/// 情感 → 参数叠加映射
///
/// 以结构化叠加表示情感参数，合成时按情感标签取出并合并到基准参数，
/// 不使用 ad hoc 的动态对象。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionOverlayMap(HashMap<String, ParamOverlay>);

impl EmotionOverlayMap {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn insert(&mut self, emotion: impl Into<String>, overlay: ParamOverlay) {
        self.0.insert(emotion.into(), overlay);
    }

    pub fn get(&self, emotion: &str) -> Option<&ParamOverlay> {
        self.0.get(emotion)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ParamOverlay)> for EmotionOverlayMap {
    fn from_iter<T: IntoIterator<Item = (String, ParamOverlay)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// 音色性别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceGender {
    Male,
    Female,
    Neutral,
    Child,
}

impl VoiceGender {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceGender::Male => "male",
            VoiceGender::Female => "female",
            VoiceGender::Neutral => "neutral",
            VoiceGender::Child => "child",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "male" => Some(VoiceGender::Male),
            "female" => Some(VoiceGender::Female),
            "neutral" => Some(VoiceGender::Neutral),
            "child" => Some(VoiceGender::Child),
            _ => None,
        }
    }
}

/// 音色年龄段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeRange {
    Young,
    Adult,
    MiddleAged,
    Elderly,
}

impl AgeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeRange::Young => "young",
            AgeRange::Adult => "adult",
            AgeRange::MiddleAged => "middle_aged",
            AgeRange::Elderly => "elderly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "young" => Some(AgeRange::Young),
            "adult" => Some(AgeRange::Adult),
            "middle_aged" => Some(AgeRange::MiddleAged),
            "elderly" => Some(AgeRange::Elderly),
            _ => None,
        }
    }

    /// 由具体年龄归入年龄段
    pub fn from_age(age: u32) -> Self {
        match age {
            0..=25 => AgeRange::Young,
            26..=45 => AgeRange::Adult,
            46..=60 => AgeRange::MiddleAged,
            _ => AgeRange::Elderly,
        }
    }
}

/// 音色特征
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceCharacteristics {
    pub gender: VoiceGender,
    pub age_range: AgeRange,
    /// 风格标签（如 "narration"、"gentle"）
    #[serde(default)]
    pub styles: Vec<String>,
}

impl Default for VoiceCharacteristics {
    fn default() -> Self {
        Self {
            gender: VoiceGender::Neutral,
            age_range: AgeRange::Adult,
            styles: Vec::new(),
        }
    }
}
