use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core_api::CoreError;
use crate::vocab::statblock_enum;

pub const DEFAULT_SCORE: i32 = 10;
pub const SPELL_SAVE_BASE: i32 = 8;

statblock_enum!(Ability {
    Strength => "Strength",
    Dexterity => "Dexterity",
    Constitution => "Constitution",
    Intelligence => "Intelligence",
    Wisdom => "Wisdom",
    Charisma => "Charisma",
});

impl Ability {
    pub fn abbreviation(self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn from_abbreviation(code: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.abbreviation().eq_ignore_ascii_case(code))
    }
}

impl FromStr for Ability {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_abbreviation(s)
            .or_else(|| Self::from_display_name(s))
            .ok_or_else(|| CoreError::configuration(format!("unknown ability code {s:?}")))
    }
}

statblock_enum!(Proficiency {
    Normal => "Normal",
    Proficient => "Proficient",
    Expertise => "Expertise",
});

impl Proficiency {
    /// How many proficiency bonuses this tier adds.
    pub fn multiplier(self) -> i32 {
        match self {
            Proficiency::Normal => 0,
            Proficiency::Proficient => 1,
            Proficiency::Expertise => 2,
        }
    }
}

impl Default for Proficiency {
    fn default() -> Self {
        Proficiency::Normal
    }
}

statblock_enum!(Skill {
    Athletics => "Athletics",
    Acrobatics => "Acrobatics",
    SleightOfHand => "Sleight of Hand",
    Stealth => "Stealth",
    Arcana => "Arcana",
    History => "History",
    Investigation => "Investigation",
    Nature => "Nature",
    Religion => "Religion",
    AnimalHandling => "Animal Handling",
    Insight => "Insight",
    Medicine => "Medicine",
    Perception => "Perception",
    Survival => "Survival",
    Deception => "Deception",
    Intimidation => "Intimidation",
    Performance => "Performance",
    Persuasion => "Persuasion",
});

impl Skill {
    pub fn ability(self) -> Ability {
        match self {
            Skill::Athletics => Ability::Strength,
            Skill::Acrobatics | Skill::SleightOfHand | Skill::Stealth => Ability::Dexterity,
            Skill::Arcana
            | Skill::History
            | Skill::Investigation
            | Skill::Nature
            | Skill::Religion => Ability::Intelligence,
            Skill::AnimalHandling
            | Skill::Insight
            | Skill::Medicine
            | Skill::Perception
            | Skill::Survival => Ability::Wisdom,
            Skill::Deception | Skill::Intimidation | Skill::Performance | Skill::Persuasion => {
                Ability::Charisma
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatOperation {
    /// Proficiency bonus + modifier + bonus.
    Attack,
    /// Saving-throw bonus + bonus.
    Save,
    /// 8 + proficiency bonus + modifier.
    SpellSave,
}

impl StatOperation {
    pub fn code(self) -> &'static str {
        match self {
            StatOperation::Attack => "ATK",
            StatOperation::Save => "SAVE",
            StatOperation::SpellSave => "SPELLSAVE",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "ATK" => Some(StatOperation::Attack),
            "SAVE" => Some(StatOperation::Save),
            "SPELLSAVE" => Some(StatOperation::SpellSave),
            _ => None,
        }
    }
}

impl FromStr for StatOperation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
            .ok_or_else(|| CoreError::configuration(format!("unknown stat operation {s:?}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Plus,
    Minus,
}

/// A bonus whose sign is fixed by an explicit `+` or `-`, whatever the sign
/// of the magnitude it was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignedBonus {
    pub sign: Sign,
    pub magnitude: i32,
}

impl SignedBonus {
    pub fn new(sign: Sign, magnitude: i32) -> Self {
        Self { sign, magnitude }
    }

    pub fn value(self) -> i32 {
        match self.sign {
            Sign::Plus => self.magnitude.saturating_abs(),
            Sign::Minus => -self.magnitude.saturating_abs(),
        }
    }
}

/// `floor((score - 10) / 2)`, defined for every `i32` score.
pub fn ability_modifier(score: i32) -> i32 {
    score.div_euclid(2) - 5
}

pub fn format_modifier(modifier: i32) -> String {
    if modifier >= 0 {
        format!("+{modifier}")
    } else {
        modifier.to_string()
    }
}

/// Six ability scores, the proficiency bonus and per-ability save tiers.
///
/// Missing entries read as score 10 and tier `Normal`; a partially filled
/// creature is a normal state while it is being edited.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AbilityScores {
    pub proficiency_bonus: i32,
    #[serde(default)]
    pub scores: BTreeMap<Ability, i32>,
    #[serde(default)]
    pub proficiency_levels: BTreeMap<Ability, Proficiency>,
}

impl AbilityScores {
    pub fn new(proficiency_bonus: i32) -> Self {
        Self {
            proficiency_bonus,
            scores: BTreeMap::new(),
            proficiency_levels: BTreeMap::new(),
        }
    }

    pub fn from_maps(
        proficiency_bonus: i32,
        scores: BTreeMap<Ability, i32>,
        proficiency_levels: BTreeMap<Ability, Proficiency>,
    ) -> Self {
        Self {
            proficiency_bonus,
            scores,
            proficiency_levels,
        }
    }

    pub fn with_score(mut self, ability: Ability, score: i32) -> Self {
        self.scores.insert(ability, score);
        self
    }

    pub fn with_proficiency(mut self, ability: Ability, level: Proficiency) -> Self {
        self.proficiency_levels.insert(ability, level);
        self
    }

    pub fn score(&self, ability: Ability) -> i32 {
        self.scores.get(&ability).copied().unwrap_or(DEFAULT_SCORE)
    }

    pub fn proficiency(&self, ability: Ability) -> Proficiency {
        self.proficiency_levels
            .get(&ability)
            .copied()
            .unwrap_or_default()
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.score(ability))
    }

    pub fn save_bonus(&self, ability: Ability) -> i32 {
        self.modifier(ability).saturating_add(
            self.proficiency(ability)
                .multiplier()
                .saturating_mul(self.proficiency_bonus),
        )
    }

    pub fn skill_bonus(&self, skill: Skill, extra_bonus: i32) -> i32 {
        self.modifier(skill.ability()).saturating_add(extra_bonus)
    }

    /// Every ability with its effective save tier, defaults included.
    pub fn saving_throws(&self) -> BTreeMap<Ability, Proficiency> {
        Ability::ALL
            .iter()
            .map(|&ability| (ability, self.proficiency(ability)))
            .collect()
    }

    pub fn stat_operation(
        &self,
        ability: Ability,
        operation: StatOperation,
        bonus: Option<SignedBonus>,
    ) -> i32 {
        let bonus = bonus.map(SignedBonus::value).unwrap_or(0);
        match operation {
            StatOperation::Attack => self
                .proficiency_bonus
                .saturating_add(self.modifier(ability))
                .saturating_add(bonus),
            StatOperation::Save => self.save_bonus(ability).saturating_add(bonus),
            StatOperation::SpellSave => SPELL_SAVE_BASE
                .saturating_add(self.proficiency_bonus)
                .saturating_add(self.modifier(ability)),
        }
    }

    /// String-coded form used by callers holding raw directive text.
    pub fn stat_operation_by_code(
        &self,
        ability_code: &str,
        operation: &str,
        bonus: Option<SignedBonus>,
    ) -> Result<i32, CoreError> {
        let ability = ability_code.parse::<Ability>()?;
        let operation = operation.parse::<StatOperation>()?;
        Ok(self.stat_operation(ability, operation, bonus))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_api::CoreErrorCode;

    fn ogre() -> AbilityScores {
        AbilityScores::new(2)
            .with_score(Ability::Strength, 18)
            .with_score(Ability::Dexterity, 8)
            .with_score(Ability::Constitution, 16)
            .with_proficiency(Ability::Constitution, Proficiency::Proficient)
            .with_proficiency(Ability::Wisdom, Proficiency::Expertise)
    }

    #[test]
    fn modifier_floors_toward_negative_infinity() {
        let cases = [(1, -5), (9, -1), (10, 0), (11, 0), (20, 5), (30, 10)];
        for (score, expected) in cases {
            assert_eq!(ability_modifier(score), expected, "score {score}");
        }
    }

    #[test]
    fn modifier_is_defined_at_the_integer_limits() {
        assert_eq!(ability_modifier(i32::MIN), -1_073_741_829);
        assert_eq!(ability_modifier(i32::MAX), 1_073_741_818);
        let scores = AbilityScores::new(i32::MAX)
            .with_score(Ability::Wisdom, i32::MAX)
            .with_proficiency(Ability::Wisdom, Proficiency::Expertise);
        assert_eq!(scores.save_bonus(Ability::Wisdom), i32::MAX);
        assert_eq!(scores.skill_bonus(Skill::Perception, i32::MAX), i32::MAX);
        assert_eq!(SignedBonus::new(Sign::Minus, i32::MIN).value(), -i32::MAX);
    }

    #[test]
    fn missing_entries_use_defaults() {
        let scores = AbilityScores::new(3);
        assert_eq!(scores.score(Ability::Charisma), 10);
        assert_eq!(scores.proficiency(Ability::Charisma), Proficiency::Normal);
        assert_eq!(scores.save_bonus(Ability::Charisma), 0);
    }

    #[test]
    fn save_bonus_applies_tier_multiplier() {
        let scores = ogre();
        assert_eq!(scores.save_bonus(Ability::Strength), 4);
        assert_eq!(scores.save_bonus(Ability::Constitution), 5);
        assert_eq!(scores.save_bonus(Ability::Wisdom), 4);
        assert_eq!(scores.save_bonus(Ability::Dexterity), -1);
    }

    #[test]
    fn stat_operations_follow_formulas() {
        let scores = ogre();
        assert_eq!(
            scores.stat_operation(Ability::Strength, StatOperation::Attack, None),
            6
        );
        assert_eq!(
            scores.stat_operation(
                Ability::Strength,
                StatOperation::Attack,
                Some(SignedBonus::new(Sign::Minus, 3))
            ),
            3
        );
        assert_eq!(
            scores.stat_operation(
                Ability::Constitution,
                StatOperation::Save,
                Some(SignedBonus::new(Sign::Plus, -2))
            ),
            7
        );
        assert_eq!(
            scores.stat_operation(
                Ability::Strength,
                StatOperation::SpellSave,
                Some(SignedBonus::new(Sign::Plus, 5))
            ),
            14
        );
    }

    #[test]
    fn skill_bonus_uses_governing_ability() {
        let scores = ogre();
        assert_eq!(scores.skill_bonus(Skill::Athletics, 0), 4);
        assert_eq!(scores.skill_bonus(Skill::Stealth, 2), 1);
        assert_eq!(Skill::AnimalHandling.ability(), Ability::Wisdom);
    }

    #[test]
    fn unknown_codes_are_configuration_errors() {
        let scores = ogre();
        let err = scores
            .stat_operation_by_code("STR", "HEAL", None)
            .expect_err("unknown op must fail");
        assert_eq!(err.code, CoreErrorCode::Configuration);
        assert!(err.message.contains("HEAL"));

        let err = scores
            .stat_operation_by_code("LCK", "ATK", None)
            .expect_err("unknown ability must fail");
        assert_eq!(err.code, CoreErrorCode::Configuration);
        assert_eq!(scores.stat_operation_by_code("str", "atk", None), Ok(6));
    }
}
