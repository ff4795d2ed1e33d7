use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ability::AbilityScores;
use crate::core_api::CoreError;
use crate::dice::RollMode;
use crate::keywords::format_keywords;
use crate::macros::{MacroContext, resolve};
use crate::vocab::{LimitedUsageType, statblock_enum};

// Kept lowercase by `title_case` unless they open the title.
const MINOR_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "in", "of", "on", "or", "the", "to", "with",
];

statblock_enum!(CharacteristicKind {
    Trait => "Trait",
    Action => "Action",
    BonusAction => "Bonus Action",
    Reaction => "Reaction",
    LegendaryAction => "Legendary Action",
});

impl CharacteristicKind {
    pub fn section_title(self) -> &'static str {
        match self {
            CharacteristicKind::Trait => "Traits",
            CharacteristicKind::Action => "Actions",
            CharacteristicKind::BonusAction => "Bonus Actions",
            CharacteristicKind::Reaction => "Reactions",
            CharacteristicKind::LegendaryAction => "Legendary Actions",
        }
    }

    pub fn supports_limited_use(self) -> bool {
        matches!(
            self,
            CharacteristicKind::Trait | CharacteristicKind::LegendaryAction
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitedUse {
    pub usage: LimitedUsageType,
    #[serde(default)]
    pub charges: BTreeMap<String, u32>,
    #[serde(default)]
    pub lair_charge_bonuses: BTreeMap<String, u32>,
}

/// One trait, action, bonus action, reaction or legendary action.
///
/// The ability scores are a copy taken when the entry was created; later
/// edits to the creature reach it only through re-creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombatCharacteristic {
    pub kind: CharacteristicKind,
    pub creature_name: String,
    pub ability_scores: AbilityScores,
    pub has_lair: bool,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legendary_resistances: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legendary_resistances_lair_bonus: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limited_use: Option<LimitedUse>,
}

impl CombatCharacteristic {
    pub fn new(
        kind: CharacteristicKind,
        creature_name: &str,
        ability_scores: AbilityScores,
        has_lair: bool,
        title: &str,
        description: &str,
    ) -> Self {
        Self {
            kind,
            creature_name: title_case(creature_name),
            ability_scores,
            has_lair,
            title: title_case(title),
            description: description.to_string(),
            legendary_resistances: None,
            legendary_resistances_lair_bonus: None,
            limited_use: None,
        }
    }

    pub fn with_legendary_resistances(mut self, count: Option<u32>, lair_bonus: Option<u32>) -> Self {
        self.legendary_resistances = count;
        self.legendary_resistances_lair_bonus = lair_bonus;
        self
    }

    pub fn with_limited_use(mut self, limited_use: LimitedUse) -> Result<Self, CoreError> {
        self.limited_use = Some(limited_use);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.limited_use.is_some() && !self.kind.supports_limited_use() {
            return Err(CoreError::configuration(format!(
                "{} {:?} cannot carry limited-use charges",
                self.kind, self.title
            )));
        }
        Ok(())
    }

    pub fn macro_context(&self, roll_mode: RollMode) -> MacroContext<'_> {
        MacroContext::new(&self.creature_name, &self.ability_scores)
            .with_legendary_resistances(
                self.legendary_resistances,
                self.legendary_resistances_lair_bonus,
            )
            .with_roll_mode(roll_mode)
    }

    pub fn resolved_title(&self, roll_mode: RollMode) -> Result<String, CoreError> {
        resolve(strip_period(&self.title), &self.macro_context(roll_mode))
    }

    /// Keyword emphasis runs before directives are resolved.
    pub fn resolved_description(&self, roll_mode: RollMode) -> Result<String, CoreError> {
        let formatted = format_keywords(strip_period(&self.description));
        resolve(&formatted, &self.macro_context(roll_mode))
    }

    /// `***Title.*** Description.`
    pub fn markdown(&self, roll_mode: RollMode) -> Result<String, CoreError> {
        let title = with_period(self.resolved_title(roll_mode)?);
        let description = self.resolved_description(roll_mode)?;
        if description.is_empty() {
            return Ok(format!("***{title}***"));
        }
        Ok(format!("***{title}*** {}", with_period(description)))
    }
}

fn strip_period(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed.strip_suffix('.').unwrap_or(trimmed)
}

fn with_period(mut text: String) -> String {
    if !text.ends_with('.') {
        text.push('.');
    }
    text
}

/// Capitalizes the first letter of each word, leaving the rest of the word
/// as written. Minor words stay lowercase after the first word.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .enumerate()
        .map(|(index, word)| {
            if index > 0 && MINOR_WORDS.contains(&word) {
                return word.to_string();
            }
            let mut out = String::with_capacity(word.len());
            let mut done = false;
            for ch in word.chars() {
                if !done && ch.is_alphabetic() {
                    out.extend(ch.to_uppercase());
                    done = true;
                } else {
                    out.push(ch);
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::Ability;
    use crate::core_api::CoreErrorCode;

    fn ogre_scores() -> AbilityScores {
        AbilityScores::new(2).with_score(Ability::Strength, 18)
    }

    fn action(title: &str, description: &str) -> CombatCharacteristic {
        CombatCharacteristic::new(
            CharacteristicKind::Action,
            "test ogre",
            ogre_scores(),
            false,
            title,
            description,
        )
    }

    #[test]
    fn construction_title_cases_names() {
        let entry = action("greatclub of the deep", "x");
        assert_eq!(entry.creature_name, "Test Ogre");
        assert_eq!(entry.title, "Greatclub of the Deep");
        assert_eq!(title_case("  the   OGRE  "), "The OGRE");
        assert_eq!(title_case("(cha)"), "(Cha)");
    }

    #[test]
    fn markdown_strips_and_reappends_one_period() {
        let entry = action(
            "Greatclub.",
            "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 2D8] Bludgeoning damage.",
        );
        assert_eq!(
            entry.markdown(RollMode::Average),
            Ok("***Greatclub.*** _Melee Attack Roll:_ +6, reach 5 ft. _Hit:_ 13 (2d8 + 4) _Bludgeoning_ damage.".to_string())
        );
    }

    #[test]
    fn keywords_apply_to_description_only() {
        let entry = action("Fire Breath", "Fire damage");
        assert_eq!(entry.resolved_title(RollMode::Average), Ok("Fire Breath".to_string()));
        assert_eq!(
            entry.resolved_description(RollMode::Average),
            Ok("_Fire_ damage".to_string())
        );
    }

    #[test]
    fn legendary_resistance_title_resolves_counts() {
        let entry = CombatCharacteristic::new(
            CharacteristicKind::Trait,
            "ancient dragon",
            ogre_scores(),
            true,
            "Legendary Resistance ([LR]/Day, or [LRL]/Day in Lair)",
            "If the [SMON] fails a saving throw, it can choose to succeed instead.",
        )
        .with_legendary_resistances(Some(3), Some(1));
        assert_eq!(
            entry.markdown(RollMode::Average),
            Ok("***Legendary Resistance (3/Day, or 4/Day in Lair).*** If the Dragon fails a saving throw, it can choose to succeed instead.".to_string())
        );
    }

    #[test]
    fn empty_description_renders_title_only() {
        let entry = action("Overclocked Core", ".");
        assert_eq!(
            entry.markdown(RollMode::Average),
            Ok("***Overclocked Core.***".to_string())
        );
    }

    #[test]
    fn limited_use_is_restricted_to_traits_and_legendary_actions() {
        let usage = LimitedUse {
            usage: LimitedUsageType::XPerDay,
            charges: BTreeMap::from([("Day".to_string(), 3)]),
            lair_charge_bonuses: BTreeMap::new(),
        };
        let err = action("Slam", "x")
            .with_limited_use(usage.clone())
            .expect_err("actions cannot carry charges");
        assert_eq!(err.code, CoreErrorCode::Configuration);

        let mut trait_entry = action("Regeneration", "x");
        trait_entry.kind = CharacteristicKind::Trait;
        assert!(trait_entry.with_limited_use(usage).is_ok());
    }

    #[test]
    fn parse_errors_surface_from_either_field() {
        let err = action("Bad [FOO]", "fine")
            .markdown(RollMode::Average)
            .expect_err("title directive is invalid");
        assert_eq!(err.code, CoreErrorCode::Parse);
    }
}
