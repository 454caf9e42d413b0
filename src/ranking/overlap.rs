use crate::core::{MatchResult, MatchedSkill, ProfileSnapshot, RankedMatch, SkillClaim};
use crate::ranking::Ranker;

/// Points for a skill pair at identical levels
const SKILL_PAIR_POINTS: u32 = 25;
/// Points lost per rank of level distance
const LEVEL_STEP_PENALTY: u32 = 5;
/// Flat bonus when both users live in the same city
const SAME_CITY_BONUS: u32 = 15;
/// Points per shared availability token
const AVAILABILITY_POINTS: u32 = 5;
/// Cap on the availability bonus
const AVAILABILITY_CAP: u32 = 15;

/// Points a single offered/wanted pair is worth at a given level distance.
pub fn skill_pair_points(level_difference: u8) -> u32 {
    SKILL_PAIR_POINTS.saturating_sub(LEVEL_STEP_PENALTY * u32::from(level_difference))
}

/// City part of a location: text before the first comma, trimmed, lowercased
fn city_key(location: &str) -> String {
    location
        .split(',')
        .next()
        .unwrap_or(location)
        .trim()
        .to_lowercase()
}

/// First wanted claim with exactly the same skill name (case-sensitive)
fn find_wanted<'a>(wanting: &'a ProfileSnapshot, offered: &SkillClaim) -> Option<&'a SkillClaim> {
    wanting.wanted().find(|w| w.name() == offered.name())
}

/// Score how well `other` fits as a swap partner for `current`.
///
/// Sum of four parts:
/// 1. every skill `current` offers that `other` wants: `25 - 5 × level distance`,
///    recorded in `matched_skills`
/// 2. every skill `other` offers that `current` wants: same points, not recorded
/// 3. same city (text before the first comma, case-insensitive): +15
/// 4. shared availability tokens: +5 each, at most +15
pub fn score_match(current: &ProfileSnapshot, other: &ProfileSnapshot) -> MatchResult {
    let mut result = MatchResult::new(other.id.clone());

    for offered in current.offered() {
        if let Some(wanted) = find_wanted(other, offered) {
            let level_difference = offered.level.distance(wanted.level);
            result.score += skill_pair_points(level_difference);
            result.matched_skills.push(MatchedSkill {
                user_offered: offered.name().to_string(),
                other_wanted: wanted.name().to_string(),
                level_difference,
            });
        }
    }

    // Reverse pairs count towards the score but are not reported.
    for offered in other.offered() {
        if let Some(wanted) = find_wanted(current, offered) {
            result.score += skill_pair_points(offered.level.distance(wanted.level));
        }
    }

    if let (Some(a), Some(b)) = (current.location.as_deref(), other.location.as_deref()) {
        let (city_a, city_b) = (city_key(a), city_key(b));
        if !city_a.is_empty() && city_a == city_b {
            result.score += SAME_CITY_BONUS;
        }
    }

    let overlap = current
        .availability
        .iter()
        .filter(|slot| other.availability.contains(slot))
        .count() as u32;
    result.score += (AVAILABILITY_POINTS * overlap).min(AVAILABILITY_CAP);

    result
}

/// Score every candidate against `current` and sort by score, highest first.
///
/// Equal scores keep their input order.
pub fn rank_candidates(current: &ProfileSnapshot, candidates: &[ProfileSnapshot]) -> Vec<RankedMatch> {
    let mut ranked: Vec<RankedMatch> = candidates
        .iter()
        .map(|candidate| RankedMatch::new(candidate.clone(), score_match(current, candidate)))
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.score().cmp(&a.score()));

    ranked
}

/// Ranker backed by mutual skill overlap, location and availability
pub struct OverlapRanker;

impl OverlapRanker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OverlapRanker {
    fn default() -> Self {
        Self::new()
    }
}

impl Ranker for OverlapRanker {
    fn rank(&self, current: &ProfileSnapshot, candidates: &[ProfileSnapshot]) -> Vec<RankedMatch> {
        rank_candidates(current, candidates)
    }

    fn name(&self) -> &str {
        "skill-overlap"
    }
}
