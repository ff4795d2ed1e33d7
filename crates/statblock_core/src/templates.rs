//! Built-in characteristic skeletons.
//!
//! Descriptions keep `???` placeholders for the author to fill in after
//! insertion, so some of them (`[STR ???D???]`) do not resolve until edited.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::ability::{Ability, AbilityScores};
use crate::characteristic::{CharacteristicKind, CombatCharacteristic};
use crate::core_api::CoreError;

use CharacteristicKind::{Action, BonusAction, Reaction, Trait};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacteristicTemplate {
    pub kind: CharacteristicKind,
    pub label: String,
    pub name: String,
    pub description: String,
}

impl CharacteristicTemplate {
    fn from_seed(seed: &Seed) -> Self {
        Self {
            kind: seed.kind,
            label: seed.label.to_string(),
            name: seed.name.to_string(),
            description: seed.description.to_string(),
        }
    }

    pub fn instantiate(
        &self,
        creature_name: &str,
        ability_scores: AbilityScores,
        has_lair: bool,
    ) -> CombatCharacteristic {
        CombatCharacteristic::new(
            self.kind,
            creature_name,
            ability_scores,
            has_lair,
            &self.name,
            &self.description,
        )
    }
}

struct Seed {
    kind: CharacteristicKind,
    label: &'static str,
    name: &'static str,
    description: &'static str,
}

const fn seed(kind: CharacteristicKind, label: &'static str, description: &'static str) -> Seed {
    Seed { kind, label, name: label, description }
}

const fn named(
    kind: CharacteristicKind,
    label: &'static str,
    name: &'static str,
    description: &'static str,
) -> Seed {
    Seed { kind, label, name, description }
}

#[rustfmt::skip]
const TRAITS: &[Seed] = &[
    seed(Trait, "Amphibious", "The [MON] can breathe air and water."),
    seed(Trait, "Aversion to Fire", "If the [MON] takes Fire damage, it has Disadvantage on attack rolls and ability checks until the end of its next turn."),
    seed(Trait, "Battle Ready", "The [MON] has advantage on Initiative rolls."),
    seed(Trait, "Beast Whisperer", "The [MON] can communicate with Beasts as if they shared a common language."),
    seed(Trait, "Death Burst", "The [MON] explodes when it dies. _Dexterity Saving Throw:_ DC [DEX SAVE], each creature in a 5-foot Emanation originating from the [MON]. _Failure:_ [???D???] ??? damage. _Success:_ Half damage."),
    seed(Trait, "Death Jinx", "When the [MON] dies, one random creature within 10 feet of the dead [MON] is targeted by a _Bane_ spell (save DC 13), which lasts for its full duration."),
    seed(Trait, "Demonic Restoration", "If the [MON] dies outside the Abyss, its body dissolves into ichor, and it gains a new body instantly, reviving with all of its Hit Points somewhere in the Abyss."),
    seed(Trait, "Dimensional Disruption", "Disruptive energy extends from the [MON] in a 30-foot Emanation. Other creatures can't teleport to or from a space in that area. Any attempt to do so is wasted."),
    seed(Trait, "Disciple of the Nine Hells", "When the [MON] dies, its body disgorges a Hostile *Imp* in the same space."),
    seed(Trait, "Disintegration", "When the [MON] dies, its body and nonmagical possessions turn to dust. Any magic items it possessed are left behind in its space."),
    seed(Trait, "Emissary of Juiblex", "When the [MON] dies, its body disgorges a Hostile *Ochre Jelly* in the same space."),
    seed(Trait, "Fey Ancestry", "The [MON] has Advantage on saving throws it makes to avoid or end the Charmed condition, and magic can't put it to sleep."),
    seed(Trait, "Flyby", "The [MON] doesn't provoke an Opportunity Attack when it flies out of an enemy's reach."),
    seed(Trait, "Forbiddance", "The [MON] can't enter a residence without an invitation from one of its occupants."),
    seed(Trait, "Gloom Shroud", "Imperceptible energy channeled from the Shadowfell extends from the creature in a 20-foot Emanation. Other creatures in that area have Disadvantage on Charisma checks and Charisma saving throws."),
    seed(Trait, "Incorporeal Movement", "The [MON] can move through others creatures and objects as if they were Difficult Terrain. It takes [1D10] Force damage if it ends its turn inside an object."),
    seed(Trait, "Light", "The [MON] sheds Bright Light in a 10-foot radius and Dim Light for an additional 10 feet. As a Bonus Action, the creature can suppress this light or cause it to return. The light winks out if the [MON] dies."),
    seed(Trait, "Magic Resistance", "The [MON] has Advantage on saving throws against spells and other magical effects."),
    seed(Trait, "Mimicry", "The [MON] can mimic Beast sounds and Humanoid voices. A creature that hears the sounds can tell they are imitations with a successful DC [WIS SAVE] Wisdom (Insight) check."),
    seed(Trait, "Pack Tactics", "The [MON] has Advantage on an attack roll against a creature if at least one of the [MON]'s allies is within 5 feet of the creature and the ally doesn't have the Incapacitated condition."),
    seed(Trait, "Poison Tolerant", "The [MON] has Advantage on saving throws it makes to avoid or end the Poisoned condition."),
    seed(Trait, "Regeneration", "The [MON] regains ??? Hit Points at the start of each of its turns. If the [MON] takes ??? damage, this trait doesn't function on the [MON]'s next turn. The [MON] dies only if it starts its turn with 0 Hit Points and doesn't regenerate."),
    seed(Trait, "Resonant Connection", "The [MON] has a supernatural connection to another creature or an object and knows the most direct route to it, provided the two are within 1 mile of each other."),
    seed(Trait, "Siege Monster", "The [MON] deals double damage to objects and structures."),
    seed(Trait, "Slaad Host", "When the [MON] dies, a Hostile *Slaad Tadpole* bursts from its innards in the same space."),
    seed(Trait, "Steadfast", "The [MON] has Immunity to the Frightened condition while it can see an ally within 30 feet of itself."),
    seed(Trait, "Sunlight Sensitivity", "While in sunlight, the [MON] has Disadvantage on ability checks and attack rolls."),
    seed(Trait, "Swarm", "The swarm can occupy another creature's space and vice versa, and the swarm can move through any opening large enough for a Tiny ???. The swarm can't regain Hit Points or gain Temporary Hit Points."),
    seed(Trait, "Telepathic Bond", "The [MON] is linked psychically to another creature. While both are on the same plane of existence, they can communicate telepathically with each other."),
    seed(Trait, "Telepathic Shroud", "The [MON] is immune to any effect that would sense its emotions or read its thoughts, as well as to spells from the school of Divination. As a Bonus Action, the creature can suppress this trait or reactivate it."),
    seed(Trait, "Ventriloquism", "Whenever the [MON] speaks, it can choose a point within 30 feet of itself; its voice emanates from that point."),
    seed(Trait, "Warrior's Wrath", "The [MON] has Advantage on melee attack rolls against any Bloodied creature."),
    seed(Trait, "Wild Talent", "Choose one cantrip; the creature can cast that cantrip without spell components, using Intelligence, Wisdom or Charisma as the spellcasting ability."),
    seed(Trait, "Ritual Scarring", "This creature's body is lined with sacred scars. Whenever it takes slashing or piercing damage, roll a d4. On a 4, a magical glyph embedded in its flesh flares, and one creature within 10 feet must succeed on a Constitution saving throw (DC [CON SPELLSAVE]) or be blinded until the end of their next turn."),
    seed(Trait, "Blood Channeling", "When this creature casts a spell that deals damage, it can choose to take damage equal to one of its damage dice in order to reroll one damage die."),
    seed(Trait, "Hemomantic Bond", "While within 30 feet of another allied creature with this trait, the creature can choose to redirect damage it takes to that ally as a reaction."),
    seed(Trait, "Pulse of Mortifera", "Once per day, when the creature is reduced to 0 hit points, it instead returns with 1 hit point and casts Crown of Madness on the nearest enemy."),
    seed(Trait, "Twisted Immune Response", "Any Necrotic or Poison damage this creature takes is instead treated as healing."),
    seed(Trait, "Wretching Touch", "Any creature that hits this creature with a non-magical melee weapon or unarmed strike must succeed on a Constitution saving throw or vomit bile, losing its bonus action on its next turn."),
    seed(Trait, "Aether Dampening Field", "Spells cast within 10 feet of the creature have their range halved unless the caster succeeds on a spellcasting ability check (DC 10 + creature's CR)."),
    seed(Trait, "Ablative Armor", "At the start of its turn, the creature chooses one damage type (except Psychic). Until the start of its next turn, it has resistance to that type. It cannot choose the same type two rounds in a row."),
    seed(Trait, "Corrupting Presence", "Healing spells cast within a 30-foot Emanation from the [MON] restore only half the usual amount of Hit Points."),
    seed(Trait, "Dreadful Clarity", "The [MON] has Advantage on all attacks against any creature that is Frightened by it."),
    seed(Trait, "Night Veil", "While in Dim Light or Darkness, the [MON] gains Resistance to Bludgeoning, Piercing and Slashing damage."),
    seed(Trait, "Grisly Rebirth", "When the [MON] dies, roll 1d6. On a result of 5 or higher, at the start of its next turn, it horrifically reanimates with half of its maximum Hit Points. If killed again, this trait does not trigger again."),
    seed(Trait, "Eldritch Reflection", "Once per round, when the [MON] successfully saves against a targeted spell or spell attack by 5 or more, it can immediately reflect the spell back at the caster. The caster must succeed on the original saving throw or be affected by their own spell."),
    seed(Trait, "Parasitic Horror", "When the [MON] grapples a creature, that creature must succeed on a DC [CON SAVE] Constitution saving throw or be implanted with a parasite. This parasite will grow for [1D10] days until it transforms its host into a [MON], unless the creature is cured with a Lesser Restoration spell or otherwise has the parasite removed."),
    seed(Trait, "Weeping Wounds", "When the [MON] deals damage with a melee attack, the target suffers from deep, bleeding wounds. At the start of the wounded creature's turn, it takes [1D4] Necrotic damage and it cannot regain Hit Points until it or another creature spends an action to staunch the wound, ending this effect."),
    seed(Trait, "Blighted Ground", "The terrain within 15 feet of the [MON] is considered Difficult Terrain. Creatures who start their turn within this radius must succeed on a DC [CON SAVE] Constitution saving throw or take [1d6] Poison damage and have their speed reduced by 10 feet until the start of their next turn."),
    seed(Trait, "Stygian Symbiosis", "While within 10 feet of another creature with this trait, both creatures gain +2 to their AC as their corrupted flesh briefly knits together."),
    seed(Trait, "Skinwalker's Guise", "The [MON] can perfectly replicate the appearance, voice and general mannerisms of any creature it has killed within the last 24 hours. A successful DC [WIS SAVE] Insight check reveals its true nature."),
    seed(Trait, "Aura of Agony", "Whenever a creature within 5 feet of the [MON] deals damage to it with a melee attack, that attacker takes [1D8] Psychic damage as the pain rebounds onto them."),
    seed(Trait, "Veinburst", "When the [MON] is first reduced below half of its maximum Hit Points, its veins violently rupture, spraying tainted blood. Each creature within a 10-foot Emanation from the [MON] must succeed on a DC [DEX SAVE] Dexterity saving throw or have the Poisoned condition for 1 minute."),
    named(Trait, "Legendary Resistance (???/Day, or ???/Day in Lair)", "Legendary Resistance ([LR]/Day, or [LRL]/Day in Lair)", "If the [SMON] fails a saving throw, it can choose to succeed instead."),
];

#[rustfmt::skip]
const WEAPONS: &[Seed] = &[
    seed(Action, "Dagger",         "_Melee or Ranged Attack Roll:_ [DEX ATK], reach 5 ft. or range 20/60 ft. _Hit:_ [DEX 1D4] Piercing damage."),
    seed(Action, "Greatsword",     "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 2D6] Slashing damage."),
    seed(Action, "Shortsword",     "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 1D6] Piercing damage."),
    seed(Action, "Longsword",      "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 1D8] Slashing damage."),
    seed(Action, "Club",           "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 1D4] Bludgeoning damage."),
    seed(Action, "Mace",           "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 1D6] Bludgeoning damage."),
    seed(Action, "Handaxe",        "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 1D6] Slashing damage."),
    seed(Action, "Greataxe",       "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 1D12] Slashing damage."),
    seed(Action, "Warhammer",      "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 1D8] Bludgeoning damage."),
    seed(Action, "Maul",           "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 2D6] Bludgeoning damage."),
    seed(Action, "Glaive",         "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 1D10] Slashing damage."),
    seed(Action, "Rapier",         "_Melee Attack Roll:_ [DEX ATK], reach 5 ft. _Hit:_ [DEX 1D8] Piercing damage."),
    seed(Action, "Bite",           "_Melee Attack Roll:_ [DEX ATK], reach 5 ft. _Hit:_ [DEX 2D4] Piercing damage."),
    named(Action, "Bites (Swarm)", "Bites", "_Melee Attack Roll:_ [DEX ATK], reach 5 ft. _Hit:_ [DEX 2D4] Piercing damage, or [DEX 1D4] Piercing damage if the swarm is Bloodied."),
    seed(Action, "Claw",           "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 1D6] Slashing damage. If the target is a Large or smaller creature, it has the Grappled condition (escape DC [STR SAVE]) from one of two claws."),
    seed(Action, "Gore",           "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 2D8] Piercing damage. If the target is a Large or smaller creature and the [MON] moved 20+ feet straight toward it immediately before the hit, the target takes an extra [2D8] Piercing damage and has the Prone condition."),
    seed(Action, "Hooves",         "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 1D8] Bludgeoning damage."),
    seed(Action, "Slam",           "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 1D8] Bludgeoning damage."),
    seed(Action, "Tentacles",      "_Melee Attack Roll:_ [DEX ATK], reach 5 ft. _Hit:_ [DEX 1D6] Bludgeoning damage."),
    seed(Action, "Rend",           "_Melee Attack Roll:_ [STR ATK], reach 5 ft. _Hit:_ [STR 2D6] Slashing damage. If the target is a Large or smaller creature, it has the Prone condition."),
    seed(Action, "Longbow",        "_Ranged Attack Roll:_ [DEX ATK], range 150/600 ft. _Hit:_ [DEX 1D8] Piercing damage."),
    seed(Action, "Shortbow",       "_Ranged Attack Roll:_ [DEX ATK], range 80/320 ft. _Hit:_ [DEX 1D6] Piercing damage."),
    seed(Action, "Heavy Crossbow", "_Ranged Attack Roll:_ [DEX ATK], range 100/400 ft. _Hit:_ [DEX 1D10] Piercing damage."),
    seed(Action, "Light Crossbow", "_Ranged Attack Roll:_ [DEX ATK], range 80/320 ft. _Hit:_ [DEX 1D8] Piercing damage."),
    seed(Action, "Hand Crossbow",  "_Ranged Attack Roll:_ [DEX ATK], range 30/120 ft. _Hit:_ [DEX 1D6] Piercing damage."),
];

#[rustfmt::skip]
const OTHER_ENTRIES: &[Seed] = &[
    seed(BonusAction, "Leap", "The [MON] jumps up to 30 feet by spending 10 feet of movement."),
    seed(Reaction, "Parry", "_Trigger:_ The [MON] is hit by a melee attack roll while holding a weapon. _Response:_ The [MON] adds 2 to its AC against that attack, possibly causing it to miss."),
    seed(Reaction, "Ghastly Imitation", "_Trigger:_ The [MON] is the target of any enemy attack roll. _Response:_ The [MON] briefly takes on the visage of the attacker's loved one or ally. The attacker must succeed on a DC [WIS SAVE] saving throw or suffer Disadvantage on that attack."),
];

const ATTACK_ABILITIES: [Ability; 2] = [Ability::Strength, Ability::Dexterity];
const SPELLCASTING_ABILITIES: [Ability; 3] = [Ability::Intelligence, Ability::Wisdom, Ability::Charisma];

fn multiattack() -> CharacteristicTemplate {
    CharacteristicTemplate {
        kind: Action,
        label: "Multiattack (Action)".to_string(),
        name: "Multiattack".to_string(),
        description: "The [MON] makes ??? attacks, using ??? or ??? in any combination.".to_string(),
    }
}

fn attack_roll(style: &str, distance: &str, ability: Ability) -> CharacteristicTemplate {
    let code = ability.abbreviation();
    let name = format!("{style} ({code})");
    CharacteristicTemplate {
        kind: Action,
        label: name.clone(),
        name,
        description: format!(
            "_{style}:_ [{code} ATK], {distance}. _Hit:_ [{code} ???D???] ??? damage."
        ),
    }
}

fn spellcasting(ability: Ability) -> CharacteristicTemplate {
    let code = ability.abbreviation();
    CharacteristicTemplate {
        kind: Action,
        label: format!("Spellcasting ({code})"),
        name: "Spellcasting".to_string(),
        description: format!(
            "The [MON] casts one of the following spells, requiring no Material components and using {} as the spellcasting ability (spell save DC [{code} SPELLSAVE], [{code} ATK] to hit with spell attacks):\n:\n***At Will:*** _???_ (level ??? version)\n:\n***3/Day Each:*** _???_ (level ??? version)\n:\n***1/Day Each:*** _???_ (level ??? version)",
            ability.display_name()
        ),
    }
}

fn saving_throw(ability: Ability, targeted: bool) -> CharacteristicTemplate {
    let ability_name = ability.display_name();
    let code = ability.abbreviation();
    let (name, target) = if targeted {
        (format!("{ability_name} Saving Throw (Targeted)"), ", one creature that ???")
    } else {
        (format!("{ability_name} Saving Throw"), "")
    };
    CharacteristicTemplate {
        kind: Action,
        label: name.clone(),
        name,
        description: format!(
            "_{ability_name} Saving Throw:_ DC [{code} SAVE]{target}. _Failure:_ ???. _Success:_ ???. _Failure or Success:_ ???."
        ),
    }
}

/// Templates in presentation order with a label index.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<CharacteristicTemplate>,
    by_label: BTreeMap<String, usize>,
}

impl TemplateCatalog {
    pub fn builtin() -> Self {
        let mut templates: Vec<CharacteristicTemplate> =
            TRAITS.iter().map(CharacteristicTemplate::from_seed).collect();

        templates.push(multiattack());
        for (style, distance) in [
            ("Melee Attack Roll", "reach ??? ft."),
            ("Ranged Attack Roll", "range ??? ft."),
            ("Melee or Ranged Attack Roll", "reach ??? ft. or range ??? ft."),
        ] {
            for ability in ATTACK_ABILITIES {
                templates.push(attack_roll(style, distance, ability));
            }
        }
        templates.extend(SPELLCASTING_ABILITIES.into_iter().map(spellcasting));
        for &ability in Ability::ALL {
            templates.push(saving_throw(ability, false));
            templates.push(saving_throw(ability, true));
        }
        templates.extend(WEAPONS.iter().map(CharacteristicTemplate::from_seed));
        templates.extend(OTHER_ENTRIES.iter().map(CharacteristicTemplate::from_seed));

        Self::from_templates(templates)
    }

    /// Later duplicates of a label are dropped.
    pub fn from_templates(templates: Vec<CharacteristicTemplate>) -> Self {
        let mut unique = Vec::with_capacity(templates.len());
        let mut by_label = BTreeMap::new();
        for template in templates {
            if by_label.contains_key(&template.label) {
                warn!(label = %template.label, "duplicate template label ignored");
                continue;
            }
            by_label.insert(template.label.clone(), unique.len());
            unique.push(template);
        }
        Self {
            templates: unique,
            by_label,
        }
    }

    pub fn all(&self) -> &[CharacteristicTemplate] {
        &self.templates
    }

    pub fn list_by_kind(&self, kind: CharacteristicKind) -> Vec<&CharacteristicTemplate> {
        self.templates.iter().filter(|t| t.kind == kind).collect()
    }

    pub fn get(&self, label: &str) -> Result<&CharacteristicTemplate, CoreError> {
        self.by_label
            .get(label)
            .and_then(|&index| self.templates.get(index))
            .ok_or_else(|| CoreError::configuration(format!("unknown template label {label:?}")))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
