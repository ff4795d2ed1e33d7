//! Rule vocabulary shared by the document model, the keyword formatter and
//! the reference table.
//!
//! Every enum serializes by its SCREAMING_SNAKE_CASE variant name, so stored
//! documents survive reordering of the variants below.

use crate::dice::Die;

macro_rules! statblock_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $display:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn display_name(self) -> &'static str {
                match self {
                    $($name::$variant => $display),+
                }
            }

            /// Case-insensitive lookup by display name ("Sleight of Hand",
            /// "large", ...).
            pub fn from_display_name(name: &str) -> Option<Self> {
                let wanted = name.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.display_name().eq_ignore_ascii_case(wanted))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.display_name())
            }
        }
    };
}

pub(crate) use statblock_enum;

statblock_enum!(Size {
    Tiny => "Tiny",
    Small => "Small",
    Medium => "Medium",
    Large => "Large",
    Huge => "Huge",
    Gargantuan => "Gargantuan",
});

impl Size {
    pub fn hit_die(self) -> Die {
        match self {
            Size::Tiny => Die::D4,
            Size::Small => Die::D6,
            Size::Medium => Die::D8,
            Size::Large => Die::D10,
            Size::Huge => Die::D12,
            Size::Gargantuan => Die::D20,
        }
    }
}

statblock_enum!(CreatureType {
    Aberration => "Aberration",
    Beast => "Beast",
    Celestial => "Celestial",
    Construct => "Construct",
    Dragon => "Dragon",
    Elemental => "Elemental",
    Fey => "Fey",
    Fiend => "Fiend",
    Giant => "Giant",
    Humanoid => "Humanoid",
    Monstrosity => "Monstrosity",
    Ooze => "Ooze",
    Plant => "Plant",
    Undead => "Undead",
});

statblock_enum!(Alignment {
    Unaligned => "Unaligned",
    LawfulGood => "Lawful Good",
    NeutralGood => "Neutral Good",
    ChaoticGood => "Chaotic Good",
    LawfulNeutral => "Lawful Neutral",
    Neutral => "Neutral",
    ChaoticNeutral => "Chaotic Neutral",
    LawfulEvil => "Lawful Evil",
    NeutralEvil => "Neutral Evil",
    ChaoticEvil => "Chaotic Evil",
});

statblock_enum!(Habitat {
    Any => "Any",
    Underdark => "Underdark",
    Urban => "Urban",
    Forest => "Forest",
    Grassland => "Grassland",
    Arctic => "Arctic",
    Hill => "Hill",
    Mountain => "Mountain",
    Underwater => "Underwater",
    Swamp => "Swamp",
    Coastal => "Coastal",
    Desert => "Desert",
    PlanarAbyss => "Planar (Abyss)",
    PlanarNineHells => "Planar (Nine Hells)",
    PlanarUpperPlanes => "Planar (Upper Planes)",
    PlanarLowerPlanes => "Planar (Lower Planes)",
    PlanarOuterPlanes => "Planar (Outer Planes)",
    PlanarLimbo => "Planar (Limbo)",
    PlanarFeywild => "Planar (Feywild)",
    PlanarAstralPlane => "Planar (Astral Plane)",
    PlanarElementalChaos => "Planar (Elemental Chaos)",
    PlanarElementalPlaneOfFire => "Planar (Elemental Plane of Fire)",
    PlanarElementalPlaneOfAir => "Planar (Elemental Plane of Air)",
    PlanarElementalPlaneOfWater => "Planar (Elemental Plane of Water)",
    PlanarElementalPlaneOfEarth => "Planar (Elemental Plane of Earth)",
});

statblock_enum!(Treasure {
    None => "None",
    Any => "Any",
    Arcana => "Arcana",
    Armaments => "Armaments",
    Implements => "Implements",
    Individual => "Individual",
    Relics => "Relics",
});

statblock_enum!(DamageType {
    Acid => "Acid",
    Cold => "Cold",
    Fire => "Fire",
    Force => "Force",
    Lightning => "Lightning",
    Necrotic => "Necrotic",
    Poison => "Poison",
    Psychic => "Psychic",
    Radiant => "Radiant",
    Thunder => "Thunder",
    Bludgeoning => "Bludgeoning",
    Slashing => "Slashing",
    Piercing => "Piercing",
});

statblock_enum!(Condition {
    Blinded => "Blinded",
    Charmed => "Charmed",
    Deafened => "Deafened",
    Exhaustion => "Exhaustion",
    Frightened => "Frightened",
    Grappled => "Grappled",
    Incapacitated => "Incapacitated",
    Invisible => "Invisible",
    Paralyzed => "Paralyzed",
    Petrified => "Petrified",
    Poisoned => "Poisoned",
    Prone => "Prone",
    Restrained => "Restrained",
    Stunned => "Stunned",
    Unconscious => "Unconscious",
});

statblock_enum!(Sense {
    Blindsight => "Blindsight",
    Darkvision => "Darkvision",
    Tremorsense => "Tremorsense",
    Truesight => "Truesight",
});

statblock_enum!(SpeedType {
    Walk => "Walk",
    Burrow => "Burrow",
    Climb => "Climb",
    Fly => "Fly",
    FlyHover => "Fly (hover)",
    Swim => "Swim",
});

impl SpeedType {
    /// Empty for a zero non-walking speed, so callers can drop it.
    pub fn display_str(self, feet: u32) -> String {
        match self {
            SpeedType::Walk => format!("{feet} ft."),
            SpeedType::FlyHover if feet > 0 => format!("Fly {feet} ft. (hover)"),
            _ if feet > 0 => format!("{} {feet} ft.", self.display_name()),
            _ => String::new(),
        }
    }
}

statblock_enum!(LanguageProficiency {
    Understands => "Understands",
    Speaks => "Speaks",
});

statblock_enum!(Language {
    Common => "Common",
    CommonPlusOneOtherLanguage => "Common plus one other language",
    CommonPlusTwoOtherLanguages => "Common plus two other languages",
    CommonPlusThreeOtherLanguages => "Common plus three other languages",
    CommonPlusFourOtherLanguages => "Common plus four other languages",
    CommonPlusFiveOtherLanguages => "Common plus five other languages",
    Dwarvish => "Dwarvish",
    Elvish => "Elvish",
    Giant => "Giant",
    Gnomish => "Gnomish",
    Goblin => "Goblin",
    Halfling => "Halfling",
    Orc => "Orc",
    Draconic => "Draconic",
    CommonSignLanguage => "Common Sign Language",
    Abyssal => "Abyssal",
    Celestial => "Celestial",
    Infernal => "Infernal",
    DeepSpeech => "Deep Speech",
    Primordial => "Primordial",
    Sylvan => "Sylvan",
    Undercommon => "Undercommon",
});

impl Language {
    pub fn is_rare(self) -> bool {
        matches!(
            self,
            Language::Abyssal
                | Language::Celestial
                | Language::Infernal
                | Language::DeepSpeech
                | Language::Primordial
                | Language::Sylvan
                | Language::Undercommon
        )
    }
}

statblock_enum!(LimitedUsageType {
    Unlimited => "Unlimited",
    XPerDay => "X/Day",
    RechargeXY => "Recharge X-Y",
    RechargeAfterShortRest => "Recharge after a Short Rest",
    RechargeAfterLongRest => "Recharge after a Long Rest",
    RechargeAfterShortOrLongRest => "Recharge after a Short or Long Rest",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_fix_their_hit_die() {
        assert_eq!(Size::Tiny.hit_die(), Die::D4);
        assert_eq!(Size::Medium.hit_die(), Die::D8);
        assert_eq!(Size::Gargantuan.hit_die(), Die::D20);
    }

    #[test]
    fn display_name_lookup_ignores_case() {
        assert_eq!(Size::from_display_name("large"), Some(Size::Large));
        assert_eq!(
            CreatureType::from_display_name(" Monstrosity "),
            Some(CreatureType::Monstrosity)
        );
        assert_eq!(Size::from_display_name("Colossal"), None);
    }

    #[test]
    fn serializes_by_stable_name() {
        let json = serde_json::to_string(&Habitat::PlanarNineHells).expect("serialize");
        assert_eq!(json, "\"PLANAR_NINE_HELLS\"");
        let json = serde_json::to_string(&LimitedUsageType::RechargeXY).expect("serialize");
        assert_eq!(json, "\"RECHARGE_X_Y\"");

        let err = serde_json::from_str::<Size>("\"COLOSSAL\"");
        assert!(err.is_err());
    }

    #[test]
    fn zero_speeds_render_empty_except_walk() {
        assert_eq!(SpeedType::Walk.display_str(30), "30 ft.");
        assert_eq!(SpeedType::Walk.display_str(0), "0 ft.");
        assert_eq!(SpeedType::Fly.display_str(60), "Fly 60 ft.");
        assert_eq!(SpeedType::FlyHover.display_str(40), "Fly 40 ft. (hover)");
        assert_eq!(SpeedType::Swim.display_str(0), "");
    }
}
