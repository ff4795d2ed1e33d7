use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ability::{Ability, AbilityScores, Proficiency, Skill, format_modifier};
use crate::challenge_rating::{ChallengeRating, Rating};
use crate::characteristic::{CharacteristicKind, CombatCharacteristic, title_case};
use crate::core_api::{CoreError, CoreErrorCode};
use crate::dice::RollMode;
use crate::hit_dice::{HitDice, select_hit_dice};
use crate::macros::MacroContext;
use crate::templates::TemplateCatalog;
use crate::vocab::{
    Alignment, Condition, CreatureType, DamageType, Habitat, Language, LanguageProficiency, Sense,
    Size, SpeedType, Treasure,
};

pub const DEFAULT_WALK_SPEED: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Immunity {
    Damage(DamageType),
    Condition(Condition),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Languages {
    #[serde(default)]
    pub values: BTreeMap<Language, LanguageProficiency>,
    /// Range in feet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telepathy: Option<u32>,
}

impl Languages {
    /// Spoken languages, then understood-only ones, each alphabetical, then
    /// telepathy.
    pub fn display_str(&self) -> String {
        let sorted = |wanted: LanguageProficiency| {
            let mut names: Vec<&str> = self
                .values
                .iter()
                .filter(|(_, p)| **p == wanted)
                .map(|(l, _)| l.display_name())
                .collect();
            names.sort_by_key(|n| n.to_lowercase());
            names
        };
        let mut parts: Vec<String> = sorted(LanguageProficiency::Speaks)
            .into_iter()
            .map(str::to_string)
            .collect();
        parts.extend(
            sorted(LanguageProficiency::Understands)
                .into_iter()
                .map(|name| format!("Understands {name} but can't speak")),
        );
        let languages = parts.join(", ");
        match (self.telepathy, languages.is_empty()) {
            (Some(range), true) => format!("telepathy {range} ft."),
            (Some(range), false) => format!("{languages}; telepathy {range} ft."),
            (None, _) => languages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.telepathy.is_none()
    }
}

/// The whole creature: descriptive metadata, stats and characteristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatBlock {
    pub name: String,
    #[serde(default)]
    pub epithet: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub habitats: Vec<Habitat>,
    #[serde(default)]
    pub treasure: Vec<Treasure>,
    pub sizes: Vec<Size>,
    pub creature_type: CreatureType,
    #[serde(default)]
    pub tags: Vec<String>,
    pub alignment: Alignment,
    pub armor_class: i32,
    #[serde(default)]
    pub speed: BTreeMap<SpeedType, u32>,
    pub ability_scores: AbilityScores,
    #[serde(default)]
    pub skills: BTreeMap<Skill, Proficiency>,
    #[serde(default)]
    pub vulnerabilities: Vec<DamageType>,
    #[serde(default)]
    pub resistances: Vec<DamageType>,
    #[serde(default)]
    pub immunities: Vec<Immunity>,
    #[serde(default)]
    pub gear: Vec<String>,
    #[serde(default)]
    pub senses: BTreeMap<Sense, u32>,
    #[serde(default)]
    pub languages: Languages,
    pub challenge_rating: ChallengeRating,
    #[serde(default)]
    pub characteristics: Vec<CombatCharacteristic>,
    #[serde(default)]
    pub is_swarm: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legendary_resistances: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legendary_resistances_lair_bonus: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legendary_actions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legendary_actions_lair_bonus: Option<u32>,
}

impl StatBlock {
    /// A Medium, unaligned humanoid with 30 ft. walking speed and the armor
    /// class baseline for its rating.
    pub fn new(name: &str, challenge_rating: ChallengeRating) -> Result<Self, CoreError> {
        Ok(Self {
            name: title_case(name),
            epithet: String::new(),
            description: String::new(),
            habitats: Vec::new(),
            treasure: Vec::new(),
            sizes: vec![Size::Medium],
            creature_type: CreatureType::Humanoid,
            tags: Vec::new(),
            alignment: Alignment::Unaligned,
            armor_class: challenge_rating.armor_class()?,
            speed: BTreeMap::from([(SpeedType::Walk, DEFAULT_WALK_SPEED)]),
            ability_scores: AbilityScores::new(challenge_rating.proficiency_bonus()),
            skills: BTreeMap::new(),
            vulnerabilities: Vec::new(),
            resistances: Vec::new(),
            immunities: Vec::new(),
            gear: Vec::new(),
            senses: BTreeMap::new(),
            languages: Languages::default(),
            challenge_rating,
            characteristics: Vec::new(),
            is_swarm: false,
            legendary_resistances: None,
            legendary_resistances_lair_bonus: None,
            legendary_actions: None,
            legendary_actions_lair_bonus: None,
        })
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Serialization,
                format!("failed to serialize statblock: {e}"),
            )
        })
    }

    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        let statblock: StatBlock = serde_json::from_str(text).map_err(|e| {
            warn!(error = %e, "statblock document rejected");
            CoreError::new(
                CoreErrorCode::Serialization,
                format!("invalid statblock document: {e}"),
            )
        })?;
        for characteristic in &statblock.characteristics {
            characteristic
                .validate()
                .map_err(|e| CoreError::new(CoreErrorCode::Serialization, e.message))?;
        }
        Ok(statblock)
    }

    // --- derived values ---

    pub fn proficiency_bonus(&self) -> i32 {
        self.challenge_rating.proficiency_bonus()
    }

    pub fn largest_size(&self) -> Option<Size> {
        self.sizes.iter().copied().max()
    }

    /// `None` until at least one size is set.
    pub fn hit_dice(&self) -> Option<HitDice> {
        let size = self.largest_size()?;
        Some(select_hit_dice(
            self.challenge_rating.hit_point_target(),
            size,
            self.ability_scores.modifier(Ability::Constitution),
        ))
    }

    pub fn initiative(&self) -> i32 {
        self.ability_scores.modifier(Ability::Dexterity)
    }

    /// `"+2 (14)"`.
    pub fn initiative_str(&self) -> String {
        format!(
            "{} ({})",
            format_modifier(self.initiative()),
            self.ability_scores.score(Ability::Dexterity)
        )
    }

    pub fn passive_perception(&self) -> i32 {
        10i32
            .saturating_add(self.ability_scores.modifier(Ability::Wisdom))
            .saturating_add(self.proficiency_bonus())
    }

    pub fn skill_bonus(&self, skill: Skill) -> i32 {
        let tier = self.skills.get(&skill).copied().unwrap_or_default();
        self.ability_scores
            .skill_bonus(skill, tier.multiplier().saturating_mul(self.proficiency_bonus()))
    }

    /// Skills alphabetically by display name with their bonus.
    pub fn skill_bonuses(&self) -> Vec<(Skill, i32)> {
        let mut skills: Vec<Skill> = self.skills.keys().copied().collect();
        skills.sort_by_key(|s| s.display_name());
        skills
            .into_iter()
            .map(|skill| (skill, self.skill_bonus(skill)))
            .collect()
    }

    pub fn armor_class_str(&self) -> String {
        if self.armor_class == 0 {
            "\u{2014}".to_string()
        } else {
            self.armor_class.to_string()
        }
    }

    /// `"Medium"`, or `"Small or Medium"` / `"Tiny, Small or Medium"`.
    pub fn size_str(&self) -> String {
        let mut sizes = self.sizes.clone();
        sizes.sort();
        sizes.dedup();
        let names: Vec<&str> = sizes.iter().map(|s| s.display_name()).collect();
        match names.split_last() {
            None => String::new(),
            Some((last, [])) => (*last).to_string(),
            Some((last, rest)) => format!("{} or {last}", rest.join(", ")),
        }
    }

    pub fn tags_str(&self) -> String {
        if self.tags.is_empty() {
            return String::new();
        }
        let mut tags = self.tags.clone();
        tags.sort_by_key(|t| t.to_lowercase());
        format!("({})", tags.join(", "))
    }

    /// `"Large Giant (tag), Chaotic Evil"`.
    pub fn subheader(&self) -> String {
        let tags = self.tags_str();
        let mut out = format!("{} {}", self.size_str(), self.creature_type.display_name());
        if !tags.is_empty() {
            out.push(' ');
            out.push_str(&tags);
        }
        out.push_str(", ");
        out.push_str(self.alignment.display_name());
        out
    }

    pub fn habitat_str(&self) -> String {
        let names: Vec<&str> = self.habitats.iter().map(|h| h.display_name()).collect();
        sorted_or(names, Habitat::Any.display_name())
    }

    pub fn treasure_str(&self) -> String {
        let names: Vec<&str> = self.treasure.iter().map(|t| t.display_name()).collect();
        sorted_or(names, Treasure::None.display_name())
    }

    /// Zero non-walking speeds are skipped.
    pub fn speed_str(&self) -> String {
        let walk = self.speed.get(&SpeedType::Walk).copied().unwrap_or(0);
        let mut parts = vec![SpeedType::Walk.display_str(walk)];
        parts.extend(
            self.speed
                .iter()
                .filter(|(kind, _)| **kind != SpeedType::Walk)
                .map(|(kind, feet)| kind.display_str(*feet))
                .filter(|s| !s.is_empty()),
        );
        parts.join(", ")
    }

    pub fn senses_str(&self) -> String {
        let mut senses: Vec<String> = self
            .senses
            .iter()
            .map(|(sense, feet)| format!("{} {feet} ft.", sense.display_name()))
            .collect();
        senses.sort();
        let passive = format!("Passive Perception {}", self.passive_perception());
        if senses.is_empty() {
            passive
        } else {
            format!("{}; {passive}", senses.join(", "))
        }
    }

    pub fn vulnerabilities_str(&self) -> String {
        sorted_join(self.vulnerabilities.iter().map(|d| d.display_name()).collect())
    }

    pub fn resistances_str(&self) -> String {
        sorted_join(self.resistances.iter().map(|d| d.display_name()).collect())
    }

    /// Damage types, then conditions after a `; `.
    pub fn immunities_str(&self) -> String {
        let damage = sorted_join(
            self.immunities
                .iter()
                .filter_map(|i| match i {
                    Immunity::Damage(d) => Some(d.display_name()),
                    Immunity::Condition(_) => None,
                })
                .collect(),
        );
        let conditions = sorted_join(
            self.immunities
                .iter()
                .filter_map(|i| match i {
                    Immunity::Condition(c) => Some(c.display_name()),
                    Immunity::Damage(_) => None,
                })
                .collect(),
        );
        match (damage.is_empty(), conditions.is_empty()) {
            (false, false) => format!("{damage}; {conditions}"),
            (false, true) => damage,
            _ => conditions,
        }
    }

    pub fn gear_str(&self) -> String {
        let mut gear = self.gear.clone();
        gear.sort_by_key(|g| g.to_lowercase());
        gear.join(", ")
    }

    /// `"3 (4 in Lair)"`; `None` without a configured count.
    pub fn legendary_action_uses(&self) -> Option<String> {
        let uses = self.legendary_actions?;
        Some(match self.legendary_actions_lair_bonus {
            Some(bonus) => format!("{uses} ({} in Lair)", u64::from(uses) + u64::from(bonus)),
            None => uses.to_string(),
        })
    }

    pub fn short_name(&self) -> &str {
        self.macro_context(RollMode::Average).short_name()
    }

    /// Directive context for free text attached to the creature itself.
    pub fn macro_context(&self, roll_mode: RollMode) -> MacroContext<'_> {
        MacroContext::new(&self.name, &self.ability_scores)
            .with_legendary_resistances(
                self.legendary_resistances,
                self.legendary_resistances_lair_bonus,
            )
            .with_roll_mode(roll_mode)
    }

    // --- editing ---

    pub fn set_ability_score(&mut self, ability: Ability, score: i32) {
        self.ability_scores.scores.insert(ability, score);
    }

    pub fn set_save_proficiency(&mut self, ability: Ability, level: Proficiency) {
        self.ability_scores.proficiency_levels.insert(ability, level);
    }

    pub fn set_skill_proficiency(&mut self, skill: Skill, level: Proficiency) {
        self.skills.insert(skill, level);
    }

    /// Validates the rating and moves the proficiency bonus with it.
    pub fn set_challenge_rating(&mut self, rating: Rating, has_lair: bool) -> Result<(), CoreError> {
        let challenge_rating = ChallengeRating::new(rating, has_lair)?;
        self.ability_scores.proficiency_bonus = challenge_rating.proficiency_bonus();
        self.challenge_rating = challenge_rating;
        debug!(rating = %rating, has_lair, "challenge rating changed");
        Ok(())
    }

    fn snapshot(&self, kind: CharacteristicKind, title: &str, description: &str) -> CombatCharacteristic {
        CombatCharacteristic::new(
            kind,
            &self.name,
            self.ability_scores.clone(),
            self.challenge_rating.has_lair(),
            title,
            description,
        )
        .with_legendary_resistances(
            self.legendary_resistances,
            self.legendary_resistances_lair_bonus,
        )
    }

    /// Appends a characteristic built from the current stats.
    pub fn add_characteristic(
        &mut self,
        kind: CharacteristicKind,
        title: &str,
        description: &str,
    ) -> &CombatCharacteristic {
        let entry = self.snapshot(kind, title, description);
        self.characteristics.push(entry);
        &self.characteristics[self.characteristics.len() - 1]
    }

    pub fn add_template(
        &mut self,
        catalog: &TemplateCatalog,
        label: &str,
    ) -> Result<&CombatCharacteristic, CoreError> {
        let entry = catalog
            .get(label)?
            .instantiate(
                &self.name,
                self.ability_scores.clone(),
                self.challenge_rating.has_lair(),
            )
            .with_legendary_resistances(
                self.legendary_resistances,
                self.legendary_resistances_lair_bonus,
            );
        self.characteristics.push(entry);
        Ok(&self.characteristics[self.characteristics.len() - 1])
    }

    pub fn remove_characteristic(&mut self, index: usize) -> Option<CombatCharacteristic> {
        (index < self.characteristics.len()).then(|| self.characteristics.remove(index))
    }

    /// Re-creates every characteristic's snapshot from the current stats,
    /// keeping kind, text and limited-use data.
    pub fn refresh_characteristics(&mut self) {
        let refreshed: Vec<CombatCharacteristic> = self
            .characteristics
            .iter()
            .map(|old| {
                let mut entry = self.snapshot(old.kind, &old.title, &old.description);
                entry.limited_use = old.limited_use.clone();
                entry
            })
            .collect();
        self.characteristics = refreshed;
    }

    pub fn characteristics_of(
        &self,
        kind: CharacteristicKind,
    ) -> impl Iterator<Item = &CombatCharacteristic> {
        self.characteristics.iter().filter(move |c| c.kind == kind)
    }

    /// Rendered `***Title.*** Text.` entries of one section, in order.
    pub fn resolved_section(
        &self,
        kind: CharacteristicKind,
        roll_mode: RollMode,
    ) -> Result<Vec<String>, CoreError> {
        self.characteristics_of(kind)
            .map(|c| c.markdown(roll_mode))
            .collect()
    }
}

fn sorted_join(mut names: Vec<&str>) -> String {
    names.sort_by_key(|n| n.to_lowercase());
    names.dedup();
    names.join(", ")
}

fn sorted_or(names: Vec<&str>, fallback: &str) -> String {
    if names.is_empty() {
        fallback.to_string()
    } else {
        sorted_join(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ogre() -> StatBlock {
        let cr = ChallengeRating::new(Rating::whole(2), false).expect("valid");
        let mut sb = StatBlock::new("ogre", cr).expect("valid");
        sb.sizes = vec![Size::Large];
        sb.creature_type = CreatureType::Giant;
        sb.alignment = Alignment::ChaoticEvil;
        sb.set_ability_score(Ability::Strength, 19);
        sb.set_ability_score(Ability::Dexterity, 8);
        sb.set_ability_score(Ability::Constitution, 16);
        sb.set_ability_score(Ability::Wisdom, 7);
        sb
    }

    #[test]
    fn new_statblock_takes_baselines_from_rating() {
        let sb = ogre();
        assert_eq!(sb.name, "Ogre");
        assert_eq!(sb.armor_class, 13);
        assert_eq!(sb.ability_scores.proficiency_bonus, 2);
        assert_eq!(sb.speed_str(), "30 ft.");
    }

    #[test]
    fn derived_values() {
        let mut sb = ogre();
        assert_eq!(sb.initiative_str(), "-1 (8)");
        assert_eq!(sb.passive_perception(), 10);
        // CR 2 -> 45 HP target; Large with CON +3 is 8.5 per die
        let hd = sb.hit_dice().expect("has a size");
        assert_eq!(hd.to_string(), "42 (5d10 + 15)");

        sb.set_skill_proficiency(Skill::Perception, Proficiency::Expertise);
        sb.set_skill_proficiency(Skill::Athletics, Proficiency::Proficient);
        assert_eq!(
            sb.skill_bonuses(),
            vec![(Skill::Athletics, 6), (Skill::Perception, 2)]
        );

        sb.sizes.clear();
        assert_eq!(sb.hit_dice(), None);
    }

    #[test]
    fn descriptive_strings() {
        let mut sb = ogre();
        sb.sizes = vec![Size::Medium, Size::Tiny, Size::Small];
        sb.tags = vec!["shapechanger".into(), "Demon".into()];
        assert_eq!(sb.size_str(), "Tiny, Small or Medium");
        assert_eq!(sb.subheader(), "Tiny, Small or Medium Giant (Demon, shapechanger), Chaotic Evil");
        assert_eq!(sb.habitat_str(), "Any");
        assert_eq!(sb.treasure_str(), "None");

        sb.speed.insert(SpeedType::FlyHover, 40);
        sb.speed.insert(SpeedType::Swim, 0);
        assert_eq!(sb.speed_str(), "30 ft., Fly 40 ft. (hover)");

        sb.senses.insert(Sense::Darkvision, 60);
        assert_eq!(sb.senses_str(), "Darkvision 60 ft.; Passive Perception 10");

        sb.immunities = vec![
            Immunity::Condition(Condition::Poisoned),
            Immunity::Damage(DamageType::Poison),
            Immunity::Damage(DamageType::Acid),
        ];
        assert_eq!(sb.immunities_str(), "Acid, Poison; Poisoned");
        sb.armor_class = 0;
        assert_eq!(sb.armor_class_str(), "\u{2014}");
    }

    #[test]
    fn languages_list_spoken_then_understood_then_telepathy() {
        let mut languages = Languages::default();
        languages.values.insert(Language::Giant, LanguageProficiency::Speaks);
        languages.values.insert(Language::Common, LanguageProficiency::Speaks);
        languages.values.insert(Language::Abyssal, LanguageProficiency::Understands);
        assert_eq!(
            languages.display_str(),
            "Common, Giant, Understands Abyssal but can't speak"
        );
        languages.telepathy = Some(60);
        assert!(languages.display_str().ends_with("; telepathy 60 ft."));
        assert_eq!(
            Languages { values: BTreeMap::new(), telepathy: Some(120) }.display_str(),
            "telepathy 120 ft."
        );
    }

    #[test]
    fn changing_rating_moves_proficiency_but_not_snapshots() {
        let mut sb = ogre();
        sb.add_characteristic(CharacteristicKind::Action, "Slam", "[STR ATK] to hit.");
        sb.set_challenge_rating(Rating::whole(9), true).expect("valid");
        assert_eq!(sb.ability_scores.proficiency_bonus, 4);
        assert_eq!(sb.characteristics[0].ability_scores.proficiency_bonus, 2);

        sb.refresh_characteristics();
        assert_eq!(sb.characteristics[0].ability_scores.proficiency_bonus, 4);
        assert!(sb.characteristics[0].has_lair);
        assert_eq!(
            sb.resolved_section(CharacteristicKind::Action, RollMode::Average),
            Ok(vec!["***Slam.*** +8 to hit.".to_string()])
        );

        assert!(sb.set_challenge_rating(Rating::whole(31), false).is_err());
        assert_eq!(sb.challenge_rating.rating(), Rating::whole(9));
    }

    #[test]
    fn templates_snapshot_current_stats() {
        let mut sb = ogre();
        let catalog = TemplateCatalog::builtin();
        let entry = sb.add_template(&catalog, "Greatsword").expect("known label");
        assert_eq!(entry.creature_name, "Ogre");
        assert!(sb.add_template(&catalog, "Nope").is_err());
        assert_eq!(sb.characteristics.len(), 1);
        assert_eq!(sb.remove_characteristic(3), None);
        assert!(sb.remove_characteristic(0).is_some());
    }

    #[test]
    fn legendary_uses_include_lair_bonus() {
        let mut sb = ogre();
        assert_eq!(sb.legendary_action_uses(), None);
        sb.legendary_actions = Some(3);
        assert_eq!(sb.legendary_action_uses(), Some("3".to_string()));
        sb.legendary_actions_lair_bonus = Some(1);
        assert_eq!(sb.legendary_action_uses(), Some("3 (4 in Lair)".to_string()));

        sb.legendary_actions = Some(u32::MAX);
        sb.legendary_actions_lair_bonus = Some(u32::MAX);
        assert_eq!(
            sb.legendary_action_uses(),
            Some("4294967295 (8589934590 in Lair)".to_string())
        );
    }

    #[test]
    fn extreme_scores_keep_derived_values_finite() {
        let mut sb = ogre();
        sb.set_ability_score(Ability::Wisdom, i32::MAX);
        sb.skills.insert(Skill::Perception, Proficiency::Expertise);
        assert_eq!(sb.passive_perception(), 10 + 1_073_741_818 + sb.proficiency_bonus());
        assert_eq!(
            sb.skill_bonus(Skill::Perception),
            1_073_741_818 + 2 * sb.proficiency_bonus()
        );
        sb.set_ability_score(Ability::Dexterity, i32::MIN);
        assert_eq!(sb.initiative(), -1_073_741_829);
    }

    #[test]
    fn json_round_trip_and_rejections() {
        let mut sb = ogre();
        sb.add_characteristic(CharacteristicKind::Trait, "Siege Monster", "x");
        let json = sb.to_json().expect("serializes");
        assert_eq!(StatBlock::from_json(&json), Ok(sb));

        let err = StatBlock::from_json("{\"name\": 3}").expect_err("bad document");
        assert_eq!(err.code, CoreErrorCode::Serialization);
    }
}
