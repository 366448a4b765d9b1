//! Character Context - Value Objects

use serde::{Deserialize, Serialize};

use super::CharacterError;

/// 角色规范名
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalName(String);

impl CanonicalName {
    pub fn new(name: impl Into<String>) -> Result<Self, CharacterError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CharacterError::InvalidName("角色名不能为空".to_string()));
        }
        if trimmed.chars().count() > 100 {
            return Err(CharacterError::InvalidName(
                "角色名长度不能超过100字符".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 别名置信度（0.0 ~ 1.0）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AliasConfidence(f64);

impl AliasConfidence {
    pub fn new(value: f64) -> Result<Self, CharacterError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(CharacterError::InvalidConfidence(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// 性别提示（来自外部检测器，仅作为音色选择依据）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderHint {
    Male,
    Female,
    Unknown,
}

impl GenderHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenderHint::Male => "male",
            GenderHint::Female => "female",
            GenderHint::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "male" => Some(GenderHint::Male),
            "female" => Some(GenderHint::Female),
            "unknown" => Some(GenderHint::Unknown),
            _ => None,
        }
    }
}

impl Default for GenderHint {
    fn default() -> Self {
        GenderHint::Unknown
    }
}
