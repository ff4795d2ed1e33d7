use tracing::debug;

use crate::ability::{Ability, Proficiency, format_modifier};
use crate::challenge_rating::{ChallengeRating, Rating};
use crate::characteristic::CharacteristicKind;
use crate::dice::RollMode;
use crate::hit_dice::HitDice;
use crate::keywords::format_keywords;
use crate::macros::resolve;
use crate::statblock::StatBlock;
use crate::templates::TemplateCatalog;

use super::error::CoreError;
use super::types::{
    AbilityEntry, CharacteristicEntry, PropertyLines, SectionEntry, SkillEntry, Snapshot,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Engine {
    roll_mode: RollMode,
}

/// One open statblock plus the roll mode its text is resolved with.
#[derive(Debug, Clone)]
pub struct Session {
    statblock: StatBlock,
    roll_mode: RollMode,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roll_mode(mut self, roll_mode: RollMode) -> Self {
        self.roll_mode = roll_mode;
        self
    }

    pub fn roll_mode(&self) -> RollMode {
        self.roll_mode
    }

    /// Opens a statblock document from its JSON form.
    pub fn open_str(&self, text: &str) -> Result<Session, CoreError> {
        let statblock = StatBlock::from_json(text)?;
        debug!(name = %statblock.name, "statblock opened");
        Ok(self.session(statblock))
    }

    /// Starts a blank statblock at the given rating.
    pub fn create(&self, name: &str, rating: Rating, has_lair: bool) -> Result<Session, CoreError> {
        let challenge_rating = ChallengeRating::new(rating, has_lair)?;
        Ok(self.session(StatBlock::new(name, challenge_rating)?))
    }

    pub fn session(&self, statblock: StatBlock) -> Session {
        Session {
            statblock,
            roll_mode: self.roll_mode,
        }
    }
}

impl Session {
    pub fn statblock(&self) -> &StatBlock {
        &self.statblock
    }

    pub fn into_statblock(self) -> StatBlock {
        self.statblock
    }

    pub fn roll_mode(&self) -> RollMode {
        self.roll_mode
    }

    pub fn snapshot(&self) -> Result<Snapshot, CoreError> {
        let sb = &self.statblock;
        Ok(Snapshot {
            name: sb.name.clone(),
            epithet: sb.epithet.clone(),
            description: sb.description.clone(),
            habitat: sb.habitat_str(),
            treasure: sb.treasure_str(),
            subheader: sb.subheader(),
            armor_class: sb.armor_class_str(),
            hit_points: sb.hit_dice(),
            speed: sb.speed_str(),
            initiative: sb.initiative_str(),
            proficiency_bonus: sb.proficiency_bonus(),
            challenge_rating: sb.challenge_rating.display_str()?,
        })
    }

    pub fn hit_dice(&self) -> Option<HitDice> {
        self.statblock.hit_dice()
    }

    pub fn abilities(&self) -> Vec<AbilityEntry> {
        let scores = &self.statblock.ability_scores;
        Ability::ALL
            .iter()
            .map(|&ability| AbilityEntry {
                ability,
                abbreviation: ability.abbreviation().to_string(),
                score: scores.score(ability),
                modifier: scores.modifier(ability),
                save: scores.save_bonus(ability),
                proficiency: scores.proficiency(ability),
            })
            .collect()
    }

    pub fn skills(&self) -> Vec<SkillEntry> {
        self.statblock
            .skill_bonuses()
            .into_iter()
            .map(|(skill, bonus)| SkillEntry {
                skill,
                name: skill.display_name().to_string(),
                proficiency: self.statblock.skills.get(&skill).copied().unwrap_or_default(),
                bonus,
            })
            .collect()
    }

    pub fn properties(&self) -> PropertyLines {
        let sb = &self.statblock;
        let skills = self
            .skills()
            .iter()
            .map(|entry| format!("{} {}", entry.name, format_modifier(entry.bonus)))
            .collect::<Vec<_>>()
            .join(", ");
        PropertyLines {
            skills,
            vulnerabilities: sb.vulnerabilities_str(),
            resistances: sb.resistances_str(),
            immunities: sb.immunities_str(),
            gear: sb.gear_str(),
            senses: sb.senses_str(),
            languages: sb.languages.display_str(),
        }
    }

    /// Resolved entries of one kind, in document order.
    pub fn characteristics(&self, kind: CharacteristicKind) -> Result<Vec<CharacteristicEntry>, CoreError> {
        self.statblock
            .characteristics
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == kind)
            .map(|(index, c)| {
                Ok(CharacteristicEntry {
                    index,
                    kind,
                    title: c.resolved_title(self.roll_mode)?,
                    text: c.markdown(self.roll_mode)?,
                })
            })
            .collect()
    }

    /// Every non-empty section in display order. Legendary actions are
    /// listed only once a use count is configured.
    pub fn sections(&self) -> Result<Vec<SectionEntry>, CoreError> {
        let mut sections = Vec::new();
        for &kind in CharacteristicKind::ALL {
            let entries = self.characteristics(kind)?;
            if entries.is_empty() {
                continue;
            }
            let preamble = if kind == CharacteristicKind::LegendaryAction {
                match self.legendary_preamble() {
                    Some(text) => Some(text),
                    None => continue,
                }
            } else {
                None
            };
            sections.push(SectionEntry {
                kind,
                title: kind.section_title().to_string(),
                preamble,
                entries,
            });
        }
        Ok(sections)
    }

    pub fn legendary_preamble(&self) -> Option<String> {
        let uses = self.statblock.legendary_action_uses()?;
        let short = self.statblock.short_name();
        Some(format!(
            "Legendary Action Uses: {uses}. Immediately after another creature's turn, the {short} \
             can expend a use to take one of the following actions. The {short} regains all \
             expended uses at the start of each of its turns."
        ))
    }

    /// Resolves free text against the creature's current stats.
    pub fn resolve_text(&self, text: &str) -> Result<String, CoreError> {
        resolve(text, &self.statblock.macro_context(self.roll_mode))
    }

    /// Keyword emphasis followed by directive resolution.
    pub fn format_text(&self, text: &str) -> Result<String, CoreError> {
        self.resolve_text(&format_keywords(text))
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        self.statblock.to_json()
    }

    pub fn set_roll_mode(&mut self, roll_mode: RollMode) {
        self.roll_mode = roll_mode;
    }

    pub fn set_ability_score(&mut self, ability: Ability, score: i32) {
        self.statblock.set_ability_score(ability, score);
    }

    pub fn set_save_proficiency(&mut self, ability: Ability, level: Proficiency) {
        self.statblock.set_save_proficiency(ability, level);
    }

    pub fn set_challenge_rating(&mut self, rating: Rating, has_lair: bool) -> Result<(), CoreError> {
        self.statblock.set_challenge_rating(rating, has_lair)
    }

    pub fn add_characteristic(&mut self, kind: CharacteristicKind, title: &str, description: &str) {
        self.statblock.add_characteristic(kind, title, description);
    }

    pub fn add_template(&mut self, catalog: &TemplateCatalog, label: &str) -> Result<(), CoreError> {
        self.statblock.add_template(catalog, label).map(|_| ())
    }

    pub fn refresh_characteristics(&mut self) {
        self.statblock.refresh_characteristics();
    }
}
