//! Bracketed directives embedded in characteristic text.
//!
//! Grammar, one directive per `[...]`:
//!
//! ```text
//! directive := name | dice | ability op | "LR" | "LRL"    (then optional modifier)
//! name      := "MON" | "SMON"
//! dice      := N "D" M
//! op        := "ATK" | "SAVE" | "SPELLSAVE" | dice
//! ability   := "STR" | "DEX" | "CON" | "INT" | "WIS" | "CHA"
//! modifier  := ("+" | "-") N
//! ```
//!
//! Tokens are case-insensitive. Text is parsed into segments first and only
//! then evaluated, so a malformed directive anywhere in the input fails the
//! whole resolution without emitting partial output.

use rand::Rng;
use tracing::{trace, warn};

use crate::ability::{Ability, AbilityScores, Sign, SignedBonus, StatOperation, format_modifier};
use crate::core_api::CoreError;
use crate::dice::{DiceRoll, RollMode};

const OPEN: char = '[';
const CLOSE: char = ']';

/// Largest magnitude accepted for a trailing `+ N` / `- N`.
pub const MAX_DIRECTIVE_MODIFIER: i32 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// `[MON]`: the creature's full name.
    CreatureName,
    /// `[SMON]`: the last word of the creature's name.
    ShortName,
    /// `[2D6]`, `[1d4 + 1]`.
    Dice {
        roll: DiceRoll,
        modifier: Option<SignedBonus>,
    },
    /// `[STR ATK]`, `[CON SAVE - 1]`, `[WIS SPELLSAVE]`.
    AbilityOperation {
        ability: Ability,
        operation: StatOperation,
        modifier: Option<SignedBonus>,
    },
    /// `[STR 2D6]`: dice plus the ability modifier, added once.
    AbilityDice {
        ability: Ability,
        roll: DiceRoll,
        modifier: Option<SignedBonus>,
    },
    /// `[LR]` and `[LRL]`.
    LegendaryResistances {
        lair: bool,
        modifier: Option<SignedBonus>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Directive { source: &'a str, directive: Directive },
}

/// Everything a directive may read while it is evaluated.
#[derive(Debug, Clone, Copy)]
pub struct MacroContext<'a> {
    pub creature_name: &'a str,
    pub ability_scores: &'a AbilityScores,
    pub legendary_resistances: Option<u32>,
    pub legendary_resistances_lair_bonus: Option<u32>,
    pub roll_mode: RollMode,
}

impl<'a> MacroContext<'a> {
    pub fn new(creature_name: &'a str, ability_scores: &'a AbilityScores) -> Self {
        Self {
            creature_name,
            ability_scores,
            legendary_resistances: None,
            legendary_resistances_lair_bonus: None,
            roll_mode: RollMode::Average,
        }
    }

    pub fn with_legendary_resistances(mut self, count: Option<u32>, lair_bonus: Option<u32>) -> Self {
        self.legendary_resistances = count;
        self.legendary_resistances_lair_bonus = lair_bonus;
        self
    }

    pub fn with_roll_mode(mut self, roll_mode: RollMode) -> Self {
        self.roll_mode = roll_mode;
        self
    }

    pub fn short_name(&self) -> &'a str {
        self.creature_name
            .split_whitespace()
            .next_back()
            .unwrap_or(self.creature_name)
    }
}

/// Splits `text` into literal runs and parsed directives.
pub fn tokenize(text: &str) -> Result<Vec<Segment<'_>>, CoreError> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut open_at: Option<usize> = None;

    for (index, ch) in text.char_indices() {
        match (ch, open_at) {
            (OPEN, None) => {
                if index > literal_start {
                    segments.push(Segment::Text(&text[literal_start..index]));
                }
                open_at = Some(index);
            }
            (OPEN, Some(start)) => {
                return Err(parse_failure(format!(
                    "nested '[' in directive starting {:?}",
                    &text[start..]
                )));
            }
            (CLOSE, Some(start)) => {
                let source = &text[start + 1..index];
                let directive = parse_directive(source)?;
                segments.push(Segment::Directive { source, directive });
                open_at = None;
                literal_start = index + 1;
            }
            (CLOSE, None) => {
                return Err(parse_failure(format!(
                    "unmatched ']' after {:?}",
                    &text[literal_start..index]
                )));
            }
            _ => {}
        }
    }

    if let Some(start) = open_at {
        return Err(parse_failure(format!(
            "unterminated directive {:?}",
            &text[start..]
        )));
    }
    if literal_start < text.len() {
        segments.push(Segment::Text(&text[literal_start..]));
    }
    Ok(segments)
}

/// Parses the inside of one `[...]`.
pub fn parse_directive(source: &str) -> Result<Directive, CoreError> {
    let unrecognized = || parse_failure(format!("unrecognized directive [{}]", source.trim()));

    let (body, modifier) = split_modifier(source).ok_or_else(unrecognized)?;
    let upper = body.to_ascii_uppercase();
    let tokens: Vec<&str> = upper.split_whitespace().collect();

    let directive = match tokens.as_slice() {
        ["MON"] if modifier.is_none() => Directive::CreatureName,
        ["SMON"] if modifier.is_none() => Directive::ShortName,
        ["LR"] => Directive::LegendaryResistances {
            lair: false,
            modifier,
        },
        ["LRL"] => Directive::LegendaryResistances {
            lair: true,
            modifier,
        },
        [dice] => {
            let roll = DiceRoll::parse(dice).ok_or_else(unrecognized)?;
            Directive::Dice { roll, modifier }
        }
        [ability, op] => {
            let ability = Ability::from_abbreviation(ability).ok_or_else(unrecognized)?;
            if let Some(operation) = StatOperation::from_code(op) {
                Directive::AbilityOperation {
                    ability,
                    operation,
                    modifier,
                }
            } else {
                let roll = DiceRoll::parse(op).ok_or_else(unrecognized)?;
                Directive::AbilityDice {
                    ability,
                    roll,
                    modifier,
                }
            }
        }
        _ => return Err(unrecognized()),
    };
    Ok(directive)
}

/// Separates a trailing `+ N` / `- N`. `None` when the modifier is malformed
/// or nothing precedes it.
fn split_modifier(source: &str) -> Option<(&str, Option<SignedBonus>)> {
    let trimmed = source.trim();
    let Some(sign_at) = trimmed.rfind(['+', '-']) else {
        return (!trimmed.is_empty()).then_some((trimmed, None));
    };

    let body = trimmed[..sign_at].trim_end();
    let digits = trimmed[sign_at + 1..].trim_start();
    if body.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude = digits
        .parse::<i32>()
        .ok()
        .filter(|m| *m <= MAX_DIRECTIVE_MODIFIER)?;
    let sign = if trimmed[sign_at..].starts_with('+') {
        Sign::Plus
    } else {
        Sign::Minus
    };
    Some((body, Some(SignedBonus::new(sign, magnitude))))
}

/// Resolves every directive in `text`. `RollMode::Random` draws from the
/// thread RNG.
pub fn resolve(text: &str, ctx: &MacroContext<'_>) -> Result<String, CoreError> {
    resolve_with(text, ctx, &mut rand::thread_rng())
}

pub fn resolve_with<R: Rng + ?Sized>(
    text: &str,
    ctx: &MacroContext<'_>,
    rng: &mut R,
) -> Result<String, CoreError> {
    let segments = tokenize(text)?;
    let mut out = String::with_capacity(text.len());
    for segment in segments {
        match segment {
            Segment::Text(literal) => out.push_str(literal),
            Segment::Directive { source, directive } => {
                let value = evaluate(&directive, ctx, rng)?;
                trace!(directive = source, value = %value, "resolved directive");
                out.push_str(&value);
            }
        }
    }
    Ok(out)
}

pub fn evaluate<R: Rng + ?Sized>(
    directive: &Directive,
    ctx: &MacroContext<'_>,
    rng: &mut R,
) -> Result<String, CoreError> {
    let bonus = |modifier: &Option<SignedBonus>| modifier.map(SignedBonus::value).unwrap_or(0);

    let text = match directive {
        Directive::CreatureName => ctx.creature_name.to_string(),
        Directive::ShortName => ctx.short_name().to_string(),
        Directive::Dice { roll, modifier } => {
            dice_text(*roll, bonus(modifier), ctx.roll_mode, rng)
        }
        Directive::AbilityDice {
            ability,
            roll,
            modifier,
        } => {
            let total_modifier = ctx
                .ability_scores
                .modifier(*ability)
                .saturating_add(bonus(modifier));
            dice_text(*roll, total_modifier, ctx.roll_mode, rng)
        }
        Directive::AbilityOperation {
            ability,
            operation,
            modifier,
        } => {
            let scores = ctx.ability_scores;
            match operation {
                StatOperation::Attack => {
                    format_modifier(scores.stat_operation(*ability, *operation, *modifier))
                }
                StatOperation::Save => scores
                    .stat_operation(*ability, *operation, *modifier)
                    .to_string(),
                StatOperation::SpellSave => {
                    scores
                        .stat_operation(*ability, *operation, None)
                        .saturating_add(bonus(modifier))
                        .to_string()
                }
            }
        }
        Directive::LegendaryResistances { lair, modifier } => {
            let Some(count) = ctx.legendary_resistances else {
                warn!(creature = ctx.creature_name, "legendary resistance count missing");
                return Err(CoreError::configuration(format!(
                    "{} has no legendary resistance count configured",
                    ctx.creature_name
                )));
            };
            let lair_bonus = if *lair {
                ctx.legendary_resistances_lair_bonus.unwrap_or(0)
            } else {
                0
            };
            (i64::from(count) + i64::from(lair_bonus) + i64::from(bonus(modifier))).to_string()
        }
    };
    Ok(text)
}

/// `"8 (1d6 + 4)"`: the rolled value first, then the expression it came from.
/// The rolled value never drops below 1.
fn dice_text<R: Rng + ?Sized>(roll: DiceRoll, modifier: i32, mode: RollMode, rng: &mut R) -> String {
    let value = (roll.roll_with(mode, rng) + i64::from(modifier)).max(1);
    match modifier {
        0 => format!("{value} ({roll})"),
        m if m > 0 => format!("{value} ({roll} + {m})"),
        m => format!("{value} ({roll} - {})", -i64::from(m)),
    }
}

fn parse_failure(message: String) -> CoreError {
    warn!(%message, "macro parse failed");
    CoreError::parse(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::Proficiency;
    use crate::core_api::CoreErrorCode;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ogre_scores() -> AbilityScores {
        AbilityScores::new(2)
            .with_score(Ability::Strength, 18)
            .with_score(Ability::Dexterity, 8)
            .with_score(Ability::Constitution, 16)
            .with_score(Ability::Wisdom, 12)
            .with_proficiency(Ability::Constitution, Proficiency::Proficient)
    }

    fn resolve_ogre(text: &str) -> Result<String, CoreError> {
        let scores = ogre_scores();
        let ctx = MacroContext::new("Test Ogre", &scores).with_legendary_resistances(Some(3), Some(1));
        resolve(text, &ctx)
    }

    #[test]
    fn parses_each_directive_family() {
        assert_eq!(parse_directive("MON"), Ok(Directive::CreatureName));
        assert_eq!(parse_directive(" smon "), Ok(Directive::ShortName));
        assert_eq!(
            parse_directive("3D6"),
            Ok(Directive::Dice {
                roll: DiceRoll { count: 3, sides: 6 },
                modifier: None
            })
        );
        assert_eq!(
            parse_directive("STR ATK+2"),
            Ok(Directive::AbilityOperation {
                ability: Ability::Strength,
                operation: StatOperation::Attack,
                modifier: Some(SignedBonus::new(Sign::Plus, 2)),
            })
        );
        assert_eq!(
            parse_directive("dex 1d4 - 1"),
            Ok(Directive::AbilityDice {
                ability: Ability::Dexterity,
                roll: DiceRoll { count: 1, sides: 4 },
                modifier: Some(SignedBonus::new(Sign::Minus, 1)),
            })
        );
        assert_eq!(
            parse_directive("LRL"),
            Ok(Directive::LegendaryResistances {
                lair: true,
                modifier: None
            })
        );
    }

    #[test]
    fn rejects_malformed_directives() {
        for source in ["", "MON + 1", "STR", "STR HEAL", "LCK ATK", "1D6 +", "STR ATK ++1", "???D???", "STR ???D???", "A B C"] {
            let err = parse_directive(source).expect_err(source);
            assert_eq!(err.code, CoreErrorCode::Parse, "{source:?}");
        }
    }

    #[test]
    fn resolves_attack_and_damage_line() {
        assert_eq!(
            resolve_ogre("[MON] makes a [STR ATK] attack for [STR 1D6] damage"),
            Ok("Test Ogre makes a +6 attack for 8 (1d6 + 4) damage".to_string())
        );
    }

    #[test]
    fn resolves_saves_and_spell_dcs() {
        assert_eq!(resolve_ogre("DC [CON SAVE]"), Ok("DC 5".to_string()));
        assert_eq!(resolve_ogre("DC [CON SAVE + 8]"), Ok("DC 13".to_string()));
        assert_eq!(resolve_ogre("DC [WIS SPELLSAVE]"), Ok("DC 11".to_string()));
        assert_eq!(resolve_ogre("DC [WIS SPELLSAVE+1]"), Ok("DC 12".to_string()));
        assert_eq!(resolve_ogre("[DEX ATK]"), Ok("+1".to_string()));
        assert_eq!(resolve_ogre("[DEX ATK - 5]"), Ok("-4".to_string()));
    }

    #[test]
    fn resolves_bare_dice_and_names() {
        assert_eq!(resolve_ogre("[2D6]"), Ok("7 (2d6)".to_string()));
        assert_eq!(resolve_ogre("[1d10+2]"), Ok("8 (1d10 + 2)".to_string()));
        assert_eq!(resolve_ogre("[DEX 1D4]"), Ok("2 (1d4 - 1)".to_string()));
        assert_eq!(resolve_ogre("the [SMON] roars"), Ok("the Ogre roars".to_string()));
    }

    #[test]
    fn resolves_legendary_resistance_counts() {
        assert_eq!(
            resolve_ogre("Legendary Resistance ([LR]/Day, or [LRL]/Day in Lair)"),
            Ok("Legendary Resistance (3/Day, or 4/Day in Lair)".to_string())
        );

        let scores = ogre_scores();
        let ctx = MacroContext::new("Test Ogre", &scores);
        let err = resolve("[LR]/Day", &ctx).expect_err("count missing");
        assert_eq!(err.code, CoreErrorCode::Configuration);
    }

    #[test]
    fn unknown_directive_names_offending_text() {
        let err = resolve_ogre("hits for [FOO BAR] damage").expect_err("must fail");
        assert_eq!(err.code, CoreErrorCode::Parse);
        assert!(err.message.contains("FOO BAR"), "{}", err.message);
    }

    #[test]
    fn oversized_operands_are_parse_errors() {
        for text in [
            "[STR ATK + 2147483647]",
            "[STR SAVE + 2147483647]",
            "[STR 1D6 + 2147483647]",
            "[4294967295D4294967295]",
            "[4294967295D6]",
            "[LR + 1000]",
        ] {
            let err = resolve_ogre(text).expect_err(text);
            assert_eq!(err.code, CoreErrorCode::Parse, "{text:?}");
            assert!(err.message.contains(text), "{}", err.message);
        }
        assert_eq!(resolve_ogre("[STR ATK + 999]"), Ok("+1005".to_string()));
        assert_eq!(resolve_ogre("[999D1000]"), Ok("500000 (999d1000)".to_string()));
    }

    #[test]
    fn extreme_document_scores_do_not_overflow() {
        let low = AbilityScores::new(2).with_score(Ability::Strength, i32::MIN);
        let ctx = MacroContext::new("Test Ogre", &low);
        assert_eq!(resolve("[STR ATK]", &ctx), Ok("-1073741827".to_string()));
        assert_eq!(resolve("[STR 1D6]", &ctx), Ok("1 (1d6 - 1073741829)".to_string()));

        let high = AbilityScores::new(i32::MAX)
            .with_score(Ability::Strength, i32::MAX)
            .with_proficiency(Ability::Strength, Proficiency::Expertise);
        let ctx = MacroContext::new("Test Ogre", &high);
        assert_eq!(resolve("[STR SAVE + 999]", &ctx), Ok(i32::MAX.to_string()));
        assert_eq!(resolve("[STR ATK + 999]", &ctx), Ok(format!("+{}", i32::MAX)));
        assert_eq!(resolve("[STR SPELLSAVE + 999]", &ctx), Ok(i32::MAX.to_string()));
    }

    #[test]
    fn unbalanced_brackets_are_parse_errors() {
        for text in ["[MON", "MON]", "[[MON]]", "[STR [ATK]]"] {
            let err = resolve_ogre(text).expect_err(text);
            assert_eq!(err.code, CoreErrorCode::Parse, "{text:?}");
        }
    }

    #[test]
    fn resolution_is_idempotent() {
        let once = resolve_ogre("[MON] hits with [STR 2D6 + 1] damage").expect("resolves");
        assert_eq!(resolve_ogre(&once), Ok(once.clone()));
        assert_eq!(resolve_ogre("plain text"), Ok("plain text".to_string()));
    }

    #[test]
    fn roll_modes_change_dice_only() {
        let scores = ogre_scores();
        let max = MacroContext::new("Test Ogre", &scores).with_roll_mode(RollMode::Max);
        assert_eq!(resolve("[STR 1D6] / [STR ATK]", &max), Ok("10 (1d6 + 4) / +6".to_string()));

        let min = MacroContext::new("Test Ogre", &scores).with_roll_mode(RollMode::Min);
        assert_eq!(resolve("[3D6 - 10]", &min), Ok("1 (3d6 - 10)".to_string()));

        let random = MacroContext::new("Test Ogre", &scores).with_roll_mode(RollMode::Random);
        let mut rng = StdRng::seed_from_u64(11);
        let text = resolve_with("[1D6]", &random, &mut rng).expect("resolves");
        assert!(text.ends_with(" (1d6)"), "{text}");
    }

    #[test]
    fn tokenize_keeps_literal_runs() {
        let segments = tokenize("a [MON] b").expect("tokenizes");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment::Text("a "));
        assert_eq!(
            segments[1],
            Segment::Directive {
                source: "MON",
                directive: Directive::CreatureName
            }
        );
        assert_eq!(segments[2], Segment::Text(" b"));
    }
}
