use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dice::{Die, MAX_DICE_COUNT};
use crate::vocab::Size;

/// Lowest hit-point total a creature can be published with.
pub const MIN_HIT_POINTS: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HitDice {
    pub count: u32,
    pub die: Die,
    pub modifier_per_die: i32,
    pub hit_points: i32,
}

impl HitDice {
    /// Hit points for `count` dice, with the die average rounded down and the
    /// modifier applied per die. Never below [`MIN_HIT_POINTS`].
    pub fn new(count: u32, die: Die, modifier_per_die: i32) -> Self {
        let count_i = i64::from(count);
        let dice_total = count_i * i64::from(die.sides() + 1) / 2;
        let raw = dice_total + count_i * i64::from(modifier_per_die);
        let hit_points = raw.clamp(i64::from(MIN_HIT_POINTS), i64::from(i32::MAX)) as i32;
        Self {
            count,
            die,
            modifier_per_die,
            hit_points,
        }
    }

    pub fn total_modifier(&self) -> i64 {
        i64::from(self.count) * i64::from(self.modifier_per_die)
    }

    /// `"10d10 + 20"`, `"4d6 - 4"` or `"3d8"`.
    pub fn expression(&self) -> String {
        let total = self.total_modifier();
        match total {
            0 => format!("{}{}", self.count, self.die),
            t if t > 0 => format!("{}{} + {t}", self.count, self.die),
            t => format!("{}{} - {}", self.count, self.die, -t),
        }
    }
}

impl fmt::Display for HitDice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.hit_points, self.expression())
    }
}

/// Picks the dice count whose expected total lands closest to `target_hp`.
/// Ties go to the smaller count.
pub fn select_hit_dice(target_hp: i32, size: Size, con_modifier: i32) -> HitDice {
    let die = size.hit_die();
    let per_die = die.average() + f64::from(con_modifier);
    let target = f64::from(target_hp);

    let mut best_count = 1;
    let mut best_distance = f64::INFINITY;
    for count in 1..=MAX_DICE_COUNT {
        let distance = (f64::from(count) * per_die - target).abs();
        if distance < best_distance {
            best_distance = distance;
            best_count = count;
        }
    }

    let selected = HitDice::new(best_count, die, con_modifier);
    debug!(
        target_hp,
        size = size.display_name(),
        con_modifier,
        count = selected.count,
        hit_points = selected.hit_points,
        "selected hit dice"
    );
    selected
}
