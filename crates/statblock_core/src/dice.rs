//! Dice expressions of the form `NdM` and the roll modes used to evaluate
//! them.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core_api::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Die {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
}

impl Die {
    pub fn sides(self) -> u32 {
        match self {
            Die::D4 => 4,
            Die::D6 => 6,
            Die::D8 => 8,
            Die::D10 => 10,
            Die::D12 => 12,
            Die::D20 => 20,
        }
    }

    pub fn from_sides(sides: u32) -> Option<Self> {
        match sides {
            4 => Some(Die::D4),
            6 => Some(Die::D6),
            8 => Some(Die::D8),
            10 => Some(Die::D10),
            12 => Some(Die::D12),
            20 => Some(Die::D20),
            _ => None,
        }
    }

    /// Mean face value, `(max + 1) / 2`.
    pub fn average(self) -> f64 {
        f64::from(self.sides() + 1) / 2.0
    }
}

impl fmt::Display for Die {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// How a dice expression turns into a number.
///
/// Published text is always generated with `Average` so exports are
/// reproducible; the other modes exist for previews and simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RollMode {
    Random,
    #[default]
    Average,
    Min,
    Max,
}

impl RollMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "random" | "normal" => Some(RollMode::Random),
            "average" | "avg" => Some(RollMode::Average),
            "min" => Some(RollMode::Min),
            "max" => Some(RollMode::Max),
            _ => None,
        }
    }
}

pub const MAX_DICE_COUNT: u32 = 999;
pub const MAX_DIE_SIDES: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiceRoll {
    pub count: u32,
    pub sides: u32,
}

impl DiceRoll {
    pub fn new(count: u32, sides: u32) -> Result<Self, CoreError> {
        if count == 0 {
            return Err(CoreError::parse(format!(
                "dice count must be at least 1 in {count}d{sides}"
            )));
        }
        if sides < 2 {
            return Err(CoreError::parse(format!(
                "die size must be at least 2 in {count}d{sides}"
            )));
        }
        if count > MAX_DICE_COUNT || sides > MAX_DIE_SIDES {
            return Err(CoreError::parse(format!(
                "{count}d{sides} exceeds {MAX_DICE_COUNT}d{MAX_DIE_SIDES}"
            )));
        }
        Ok(Self { count, sides })
    }

    /// Parses `NdM`, case-insensitive, with no surrounding whitespace.
    pub fn parse(input: &str) -> Option<Self> {
        let lower = input.to_ascii_lowercase();
        let (count, sides) = lower.split_once('d')?;
        if count.is_empty()
            || sides.is_empty()
            || !count.bytes().all(|b| b.is_ascii_digit())
            || !sides.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let count = count.parse().ok()?;
        let sides = sides.parse().ok()?;
        Self::new(count, sides).ok()
    }

    /// Evaluates without randomness; `Random` falls back to the thread RNG.
    pub fn roll(&self, mode: RollMode) -> i64 {
        self.roll_with(mode, &mut rand::thread_rng())
    }

    pub fn roll_with<R: Rng + ?Sized>(&self, mode: RollMode, rng: &mut R) -> i64 {
        let count = i64::from(self.count);
        let sides = i64::from(self.sides);
        match mode {
            RollMode::Random => (0..self.count)
                .map(|_| i64::from(rng.gen_range(1..=self.sides)))
                .sum(),
            RollMode::Min => count,
            RollMode::Max => count * sides,
            // Half rounds up: 1d6 -> 4, 2d6 -> 7.
            RollMode::Average => (count * (sides + 1) + 1) / 2,
        }
    }
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn parses_case_insensitive_dice() {
        assert_eq!(DiceRoll::parse("3D6"), Some(DiceRoll { count: 3, sides: 6 }));
        assert_eq!(DiceRoll::parse("1d10"), Some(DiceRoll { count: 1, sides: 10 }));
        assert_eq!(DiceRoll::parse("D6"), None);
        assert_eq!(DiceRoll::parse("0d6"), None);
        assert_eq!(DiceRoll::parse("2d1"), None);
        assert_eq!(DiceRoll::parse("???D???"), None);
        assert_eq!(DiceRoll::parse("2d6+1"), None);
    }

    #[test]
    fn dice_beyond_the_limits_are_rejected() {
        assert_eq!(
            DiceRoll::parse("999d1000"),
            Some(DiceRoll { count: 999, sides: 1000 })
        );
        assert_eq!(DiceRoll::parse("1000d6"), None);
        assert_eq!(DiceRoll::parse("1d1001"), None);
        assert_eq!(DiceRoll::parse("4294967295d4294967295"), None);
        let err = DiceRoll::new(u32::MAX, 6).expect_err("count too large");
        assert_eq!(err.code, crate::core_api::CoreErrorCode::Parse);
    }

    #[test]
    fn fixed_modes_are_deterministic() {
        let roll = DiceRoll { count: 1, sides: 6 };
        assert_eq!(roll.roll(RollMode::Average), 4);
        assert_eq!(roll.roll(RollMode::Min), 1);
        assert_eq!(roll.roll(RollMode::Max), 6);

        let roll = DiceRoll { count: 2, sides: 6 };
        assert_eq!(roll.roll(RollMode::Average), 7);
        let roll = DiceRoll { count: 3, sides: 10 };
        assert_eq!(roll.roll(RollMode::Average), 17);
    }

    #[test]
    fn random_mode_stays_in_range() {
        let roll = DiceRoll { count: 4, sides: 8 };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let value = roll.roll_with(RollMode::Random, &mut rng);
            assert!((4..=32).contains(&value));
        }
    }

    #[test]
    fn die_average_is_half_of_max_plus_one() {
        assert_eq!(Die::D4.average(), 2.5);
        assert_eq!(Die::D10.average(), 5.5);
        assert_eq!(Die::from_sides(12), Some(Die::D12));
        assert_eq!(Die::from_sides(7), None);
    }
}
