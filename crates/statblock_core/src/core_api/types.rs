use serde::{Deserialize, Serialize};

use crate::ability::{Ability, Proficiency, Skill};
use crate::characteristic::CharacteristicKind;
use crate::hit_dice::HitDice;

/// Header lines of a statblock, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub name: String,
    pub epithet: String,
    pub description: String,
    pub habitat: String,
    pub treasure: String,
    pub subheader: String,
    pub armor_class: String,
    pub hit_points: Option<HitDice>,
    pub speed: String,
    pub initiative: String,
    pub proficiency_bonus: i32,
    pub challenge_rating: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AbilityEntry {
    pub ability: Ability,
    pub abbreviation: String,
    pub score: i32,
    pub modifier: i32,
    pub save: i32,
    pub proficiency: Proficiency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkillEntry {
    pub skill: Skill,
    pub name: String,
    pub proficiency: Proficiency,
    pub bonus: i32,
}

/// The optional one-line properties under the ability table.
/// Empty strings mean the line is omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyLines {
    pub skills: String,
    pub vulnerabilities: String,
    pub resistances: String,
    pub immunities: String,
    pub gear: String,
    pub senses: String,
    pub languages: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CharacteristicEntry {
    pub index: usize,
    pub kind: CharacteristicKind,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionEntry {
    pub kind: CharacteristicKind,
    pub title: String,
    /// Only set on the legendary actions section.
    pub preamble: Option<String>,
    pub entries: Vec<CharacteristicEntry>,
}
