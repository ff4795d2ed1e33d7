use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core_api::CoreError;

pub const MIN_RATING: u32 = 0;
pub const MAX_RATING: u32 = 30;

// (rating numerator, rating denominator, XP, baseline AC)
#[rustfmt::skip]
const RATING_TABLE: &[(u32, u32, u32, i32)] = &[
    ( 0, 1,      10, 13),
    ( 1, 8,      25, 13),
    ( 1, 4,      50, 13),
    ( 1, 2,     100, 13),
    ( 1, 1,     200, 13),
    ( 2, 1,     450, 13),
    ( 3, 1,     700, 13),
    ( 4, 1,   1_100, 14),
    ( 5, 1,   1_800, 15),
    ( 6, 1,   2_300, 15),
    ( 7, 1,   2_900, 15),
    ( 8, 1,   3_900, 16),
    ( 9, 1,   5_000, 16),
    (10, 1,   5_900, 17),
    (11, 1,   7_200, 17),
    (12, 1,   8_400, 17),
    (13, 1,  10_000, 18),
    (14, 1,  11_500, 18),
    (15, 1,  13_000, 18),
    (16, 1,  15_000, 18),
    (17, 1,  18_000, 19),
    (18, 1,  20_000, 19),
    (19, 1,  22_000, 19),
    (20, 1,  25_000, 19),
    (21, 1,  33_000, 19),
    (22, 1,  41_000, 19),
    (23, 1,  50_000, 19),
    (24, 1,  62_000, 19),
    (25, 1,  75_000, 19),
    (26, 1,  90_000, 19),
    (27, 1, 105_000, 19),
    (28, 1, 120_000, 19),
    (29, 1, 135_000, 19),
    (30, 1, 155_000, 19),
];

/// A challenge rating value: a whole number or a fraction with denominator
/// 2, 4 or 8. Always stored reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RatingRepr", into = "String")]
pub struct Rating {
    numerator: u32,
    denominator: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RatingRepr {
    Text(String),
    Number(f64),
}

impl TryFrom<RatingRepr> for Rating {
    type Error = CoreError;

    fn try_from(value: RatingRepr) -> Result<Self, Self::Error> {
        match value {
            RatingRepr::Text(text) => text.parse(),
            RatingRepr::Number(n) => Rating::from_f64(n),
        }
    }
}

impl From<Rating> for String {
    fn from(value: Rating) -> Self {
        value.to_string()
    }
}

impl Rating {
    pub fn whole(value: u32) -> Self {
        Self {
            numerator: value,
            denominator: 1,
        }
    }

    pub fn fraction(numerator: u32, denominator: u32) -> Result<Self, CoreError> {
        if denominator == 0 || 8 % denominator != 0 {
            return Err(CoreError::configuration(format!(
                "unsupported challenge rating {numerator}/{denominator}"
            )));
        }
        let divisor = gcd(numerator, denominator);
        Ok(Self {
            numerator: numerator / divisor,
            denominator: denominator / divisor,
        })
    }

    pub fn from_f64(value: f64) -> Result<Self, CoreError> {
        let eighths = value * 8.0;
        if !value.is_finite() || value < 0.0 || eighths.fract() != 0.0 || eighths > f64::from(u32::MAX) {
            return Err(CoreError::configuration(format!(
                "unsupported challenge rating {value}"
            )));
        }
        Self::fraction(eighths as u32, 8)
    }

    pub fn numerator(self) -> u32 {
        self.numerator
    }

    pub fn denominator(self) -> u32 {
        self.denominator
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }

    pub fn is_whole(self) -> bool {
        self.denominator == 1
    }

    /// The rating used when the creature is encountered in its lair.
    pub fn plus_one(self) -> Self {
        Self {
            numerator: self.numerator + self.denominator,
            denominator: self.denominator,
        }
    }

    fn table_entry(self) -> Option<&'static (u32, u32, u32, i32)> {
        RATING_TABLE
            .iter()
            .find(|(n, d, _, _)| *n == self.numerator && *d == self.denominator)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl FromStr for Rating {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || CoreError::configuration(format!("invalid challenge rating {s:?}"));
        if let Some((n, d)) = s.split_once('/') {
            let n = n.trim().parse::<u32>().map_err(|_| invalid())?;
            let d = d.trim().parse::<u32>().map_err(|_| invalid())?;
            return Rating::fraction(n, d);
        }
        if let Ok(whole) = s.parse::<u32>() {
            return Ok(Rating::whole(whole));
        }
        let value = s.parse::<f64>().map_err(|_| invalid())?;
        Rating::from_f64(value)
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a.max(1) } else { gcd(b, a % b) }
}

/// Proficiency bonus band for a rating: 2 for 0..=4 (fractions included),
/// then +1 every four ratings, 9 for 29..=30.
pub fn proficiency_bonus_for(rating: Rating) -> Result<i32, CoreError> {
    let value = rating.as_f64();
    if !(f64::from(MIN_RATING)..=f64::from(MAX_RATING)).contains(&value) {
        return Err(CoreError::configuration(format!(
            "challenge rating {rating} is outside {MIN_RATING}..={MAX_RATING}"
        )));
    }
    if value <= 4.0 {
        return Ok(2);
    }
    if !rating.is_whole() {
        return Err(CoreError::configuration(format!(
            "challenge rating {rating} falls between proficiency bands"
        )));
    }
    let bonus = match rating.numerator {
        5..=8 => 3,
        9..=12 => 4,
        13..=16 => 5,
        17..=20 => 6,
        21..=24 => 7,
        25..=28 => 8,
        _ => 9,
    };
    Ok(bonus)
}

/// Expected hit points before hit-dice rounding.
pub fn hit_point_target(rating: Rating) -> i32 {
    let r = rating.as_f64();
    let hp = if r < 1.0 {
        30.0 * r.sqrt()
    } else if r <= 19.0 {
        15.0 * (r + 1.0)
    } else {
        45.0 * (r - 13.0)
    };
    hp.ceil() as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ChallengeRatingRepr", into = "ChallengeRatingRepr")]
pub struct ChallengeRating {
    rating: Rating,
    has_lair: bool,
    proficiency_bonus: i32,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChallengeRatingRepr {
    rating: Rating,
    #[serde(default)]
    has_lair: bool,
}

impl TryFrom<ChallengeRatingRepr> for ChallengeRating {
    type Error = CoreError;

    fn try_from(value: ChallengeRatingRepr) -> Result<Self, Self::Error> {
        ChallengeRating::new(value.rating, value.has_lair)
    }
}

impl From<ChallengeRating> for ChallengeRatingRepr {
    fn from(value: ChallengeRating) -> Self {
        Self {
            rating: value.rating,
            has_lair: value.has_lair,
        }
    }
}

impl ChallengeRating {
    /// Fails when the rating has no proficiency band.
    pub fn new(rating: Rating, has_lair: bool) -> Result<Self, CoreError> {
        let proficiency_bonus = proficiency_bonus_for(rating)?;
        Ok(Self {
            rating,
            has_lair,
            proficiency_bonus,
        })
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    pub fn has_lair(&self) -> bool {
        self.has_lair
    }

    pub fn lair_rating(&self) -> Rating {
        self.rating.plus_one()
    }

    pub fn proficiency_bonus(&self) -> i32 {
        self.proficiency_bonus
    }

    pub fn hit_point_target(&self) -> i32 {
        hit_point_target(self.rating)
    }

    pub fn experience_points(&self) -> Result<u32, CoreError> {
        lookup(self.rating).map(|(_, _, xp, _)| *xp)
    }

    pub fn lair_experience_points(&self) -> Result<u32, CoreError> {
        lookup(self.lair_rating()).map(|(_, _, xp, _)| *xp)
    }

    pub fn armor_class(&self) -> Result<i32, CoreError> {
        lookup(self.rating).map(|(_, _, _, ac)| *ac)
    }

    pub fn lair_armor_class(&self) -> Result<i32, CoreError> {
        lookup(self.lair_rating()).map(|(_, _, _, ac)| *ac)
    }

    /// `"1/2 (XP 100; PB +2)"`, or with a lair
    /// `"5 (XP 1,800, or 2,300 in lair; PB +3)"`.
    pub fn display_str(&self) -> Result<String, CoreError> {
        let xp = group_thousands(self.experience_points()?);
        if self.has_lair {
            let lair_xp = group_thousands(self.lair_experience_points()?);
            Ok(format!(
                "{} (XP {xp}, or {lair_xp} in lair; PB +{})",
                self.rating, self.proficiency_bonus
            ))
        } else {
            Ok(format!(
                "{} (XP {xp}; PB +{})",
                self.rating, self.proficiency_bonus
            ))
        }
    }
}

fn lookup(rating: Rating) -> Result<&'static (u32, u32, u32, i32), CoreError> {
    rating.table_entry().ok_or_else(|| {
        CoreError::configuration(format!("no XP/AC table entry for challenge rating {rating}"))
    })
}

pub(crate) fn group_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_api::CoreErrorCode;

    fn cr(s: &str) -> Rating {
        s.parse().expect("valid rating")
    }

    #[test]
    fn proficiency_bands_match_at_both_boundaries() {
        let cases = [
            ("0", 2),
            ("1/8", 2),
            ("1/2", 2),
            ("4", 2),
            ("5", 3),
            ("8", 3),
            ("9", 4),
            ("12", 4),
            ("13", 5),
            ("16", 5),
            ("17", 6),
            ("20", 6),
            ("21", 7),
            ("24", 7),
            ("25", 8),
            ("28", 8),
            ("29", 9),
            ("30", 9),
        ];
        for (rating, expected) in cases {
            assert_eq!(proficiency_bonus_for(cr(rating)), Ok(expected), "CR {rating}");
        }
    }

    #[test]
    fn out_of_range_rating_is_configuration_error() {
        let err = ChallengeRating::new(Rating::whole(31), false).expect_err("31 is out of range");
        assert_eq!(err.code, CoreErrorCode::Configuration);
        assert!(err.message.contains("31"));

        let err = proficiency_bonus_for(cr("9/2")).expect_err("4.5 has no band");
        assert_eq!(err.code, CoreErrorCode::Configuration);
    }

    #[test]
    fn hit_point_targets_follow_tiered_formula() {
        assert_eq!(hit_point_target(cr("1/2")), 22);
        assert_eq!(hit_point_target(cr("1/4")), 15);
        assert_eq!(hit_point_target(cr("0")), 0);
        assert_eq!(hit_point_target(cr("5")), 90);
        assert_eq!(hit_point_target(cr("19")), 300);
        assert_eq!(hit_point_target(cr("20")), 315);
        assert_eq!(hit_point_target(cr("30")), 765);
    }

    #[test]
    fn ratings_parse_and_reduce() {
        assert_eq!(cr("2/4"), cr("1/2"));
        assert_eq!(cr("0.25"), cr("1/4"));
        assert_eq!(cr("8/8"), Rating::whole(1));
        assert_eq!(cr("1/2").plus_one().to_string(), "3/2");
        assert!("1/3".parse::<Rating>().is_err());
        assert!("abc".parse::<Rating>().is_err());
    }

    #[test]
    fn display_renders_fractions_and_lair_xp() {
        let half = ChallengeRating::new(cr("0.5"), false).expect("valid");
        assert_eq!(half.display_str(), Ok("1/2 (XP 100; PB +2)".to_string()));

        let five = ChallengeRating::new(cr("5"), true).expect("valid");
        assert_eq!(
            five.display_str(),
            Ok("5 (XP 1,800, or 2,300 in lair; PB +3)".to_string())
        );
    }

    #[test]
    fn lair_lookup_misses_surface_to_caller() {
        let top = ChallengeRating::new(Rating::whole(30), true).expect("valid");
        assert_eq!(top.experience_points(), Ok(155_000));
        let err = top.lair_experience_points().expect_err("CR 31 has no XP");
        assert_eq!(err.code, CoreErrorCode::Configuration);
        assert!(top.display_str().is_err());

        let half = ChallengeRating::new(cr("1/2"), true).expect("valid");
        assert!(half.lair_armor_class().is_err());
    }

    #[test]
    fn armor_class_baseline_by_rating() {
        let low = ChallengeRating::new(cr("1/4"), false).expect("valid");
        assert_eq!(low.armor_class(), Ok(13));
        let mid = ChallengeRating::new(Rating::whole(10), true).expect("valid");
        assert_eq!(mid.armor_class(), Ok(17));
        assert_eq!(mid.lair_armor_class(), Ok(17));
    }

    #[test]
    fn serializes_rating_as_string_and_accepts_numbers() {
        let value = ChallengeRating::new(cr("1/4"), true).expect("valid");
        let json = serde_json::to_string(&value).expect("serialize");
        assert_eq!(json, r#"{"rating":"1/4","has_lair":true}"#);

        let parsed: ChallengeRating =
            serde_json::from_str(r#"{"rating":0.125}"#).expect("numeric rating");
        assert_eq!(parsed.rating(), cr("1/8"));
        assert!(!parsed.has_lair());

        assert!(serde_json::from_str::<ChallengeRating>(r#"{"rating":"40"}"#).is_err());
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(10), "10");
        assert_eq!(group_thousands(1_100), "1,100");
        assert_eq!(group_thousands(155_000), "155,000");
        assert_eq!(group_thousands(1_000_000), "1,000,000");
    }
}
