//! 音色兜底选择
//!
//! 角色没有任何音色绑定时，由可插拔的选择器按角色的性别/年龄提示
//! 对可用音色打分，选出兜底音色。

use uuid::Uuid;

use super::{AgeRange, VoiceCharacteristics, VoiceGender};

/// 选择偏好（由角色的 gender/age 提示映射而来；叙述旁白两者皆空）
#[derive(Debug, Clone, Default)]
pub struct VoicePreference {
    pub gender: Option<VoiceGender>,
    pub age_range: Option<AgeRange>,
}

/// 候选音色的打分视图
#[derive(Debug, Clone)]
pub struct VoiceCandidate {
    pub voice_id: Uuid,
    pub characteristics: VoiceCharacteristics,
    pub rating: f32,
    pub is_available: bool,
}

/// 音色选择器
pub trait VoiceSelector: Send + Sync {
    /// 从候选中选出最合适的音色；无可用候选时返回 None
    fn select<'a>(
        &self,
        preference: &VoicePreference,
        candidates: &'a [VoiceCandidate],
    ) -> Option<&'a VoiceCandidate>;
}

/// 默认启发式选择器
///
/// 打分: 性别匹配 +4，年龄段匹配 +2，评分作为小数位平局项；
/// 不可用音色直接排除。
#[derive(Debug, Default)]
pub struct HeuristicVoiceSelector;

impl HeuristicVoiceSelector {
    pub fn new() -> Self {
        Self
    }

    fn score(&self, preference: &VoicePreference, candidate: &VoiceCandidate) -> f32 {
        let mut score = 0.0;
        if let Some(gender) = preference.gender {
            if candidate.characteristics.gender == gender {
                score += 4.0;
            }
        }
        if let Some(age_range) = preference.age_range {
            if candidate.characteristics.age_range == age_range {
                score += 2.0;
            }
        }
        // 评分归一到 [0,1) 作为平局项，不盖过特征匹配
        score + candidate.rating.clamp(0.0, 5.0) / 5.1
    }
}

impl VoiceSelector for HeuristicVoiceSelector {
    fn select<'a>(
        &self,
        preference: &VoicePreference,
        candidates: &'a [VoiceCandidate],
    ) -> Option<&'a VoiceCandidate> {
        candidates
            .iter()
            .filter(|c| c.is_available)
            .map(|c| (self.score(preference, c), c))
            .max_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, c)| c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(gender: VoiceGender, age_range: AgeRange, rating: f32) -> VoiceCandidate {
        VoiceCandidate {
            voice_id: Uuid::new_v4(),
            characteristics: VoiceCharacteristics {
                gender,
                age_range,
                styles: Vec::new(),
            },
            rating,
            is_available: true,
        }
    }

    #[test]
    fn test_gender_match_beats_age_match() {
        let selector = HeuristicVoiceSelector::new();
        let preference = VoicePreference {
            gender: Some(VoiceGender::Male),
            age_range: Some(AgeRange::Young),
        };
        let candidates = vec![
            candidate(VoiceGender::Female, AgeRange::Young, 5.0),
            candidate(VoiceGender::Male, AgeRange::Elderly, 0.0),
        ];

        let chosen = selector.select(&preference, &candidates).unwrap();
        assert_eq!(chosen.characteristics.gender, VoiceGender::Male);
    }

    #[test]
    fn test_rating_breaks_ties() {
        let selector = HeuristicVoiceSelector::new();
        let preference = VoicePreference {
            gender: Some(VoiceGender::Female),
            age_range: None,
        };
        let candidates = vec![
            candidate(VoiceGender::Female, AgeRange::Adult, 2.0),
            candidate(VoiceGender::Female, AgeRange::Adult, 4.5),
        ];

        let chosen = selector.select(&preference, &candidates).unwrap();
        assert_eq!(chosen.voice_id, candidates[1].voice_id);
    }

    #[test]
    fn test_unavailable_excluded() {
        let selector = HeuristicVoiceSelector::new();
        let mut best = candidate(VoiceGender::Male, AgeRange::Adult, 5.0);
        best.is_available = false;
        let fallback = candidate(VoiceGender::Female, AgeRange::Adult, 1.0);
        let candidates = vec![best, fallback.clone()];

        let preference = VoicePreference {
            gender: Some(VoiceGender::Male),
            age_range: None,
        };
        let chosen = selector.select(&preference, &candidates).unwrap();
        assert_eq!(chosen.voice_id, fallback.voice_id);
    }

    #[test]
    fn test_empty_candidates() {
        let selector = HeuristicVoiceSelector::new();
        assert!(selector.select(&VoicePreference::default(), &[]).is_none());
    }
}
