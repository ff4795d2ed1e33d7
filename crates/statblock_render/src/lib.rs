use std::fmt::Write as _;

use serde_json::{Map as JsonMap, Value as JsonValue};
use statblock_core::ability::format_modifier;
use statblock_core::core_api::{
    AbilityEntry, CharacteristicEntry, CoreError, PropertyLines, SectionEntry, Session, SkillEntry,
    Snapshot,
};
use tracing::debug;

const DESCRIPTION_PLACEHOLDER: &str = "<DESCRIPTION HERE>";
const ABILITY_TABLE_HEADER: &str = "\
|   |   | MOD | SAVE |   |   | MOD | SAVE |   |   | MOD | SAVE |
|:--|:-:|:---:|:----:|:--|:-:|:---:|:----:|:--|:-:|:---:|:----:|
";
const ABILITIES_PER_ROW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    #[default]
    CanonicalV1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarkdownOptions {
    /// Emits a two-column `{{monster,frame,wide}}` block.
    pub wide: bool,
}

pub fn render_json_full(session: &Session, style: JsonStyle) -> Result<JsonValue, CoreError> {
    match style {
        JsonStyle::CanonicalV1 => default_json(session).map(JsonValue::Object),
    }
}

/// Homebrewery V3 markdown: a header block followed by the monster frame.
pub fn render_markdown(session: &Session, options: MarkdownOptions) -> Result<String, CoreError> {
    let snapshot = session.snapshot()?;
    let properties = session.properties();
    let sections = session.sections()?;

    let mut out = String::new();
    writeln!(out, "## {}", snapshot.name).expect("writing to String cannot fail");
    writeln!(out, "*{}*", snapshot.epithet).expect("writing to String cannot fail");
    writeln!(
        out,
        "{{{{habitat **Habitat:** {}; **Treasure:** {}}}}}",
        snapshot.habitat, snapshot.treasure
    )
    .expect("writing to String cannot fail");
    if snapshot.description.is_empty() {
        out.push_str(DESCRIPTION_PLACEHOLDER);
    } else {
        out.push_str(&snapshot.description);
    }
    out.push_str("\n\n");

    writeln!(
        out,
        "{{{{monster,frame{}",
        if options.wide { ",wide" } else { "" }
    )
    .expect("writing to String cannot fail");
    writeln!(out, "## {}", snapshot.name).expect("writing to String cannot fail");
    writeln!(out, "*{}*", snapshot.subheader).expect("writing to String cannot fail");
    out.push('\n');
    writeln!(out, "**AC** :: {}", snapshot.armor_class).expect("writing to String cannot fail");
    writeln!(out, "**HP** :: {}", hit_points_str(&snapshot))
        .expect("writing to String cannot fail");
    writeln!(out, "**Speed** :: {}", snapshot.speed).expect("writing to String cannot fail");
    out.push('\n');
    writeln!(out, "**Initiative** :: {}", snapshot.initiative)
        .expect("writing to String cannot fail");
    out.push('\n');
    write_ability_table(&mut out, &session.abilities());
    out.push('\n');

    for (label, value) in property_lines(&properties) {
        if !value.is_empty() {
            writeln!(out, "**{label}** :: {value}").expect("writing to String cannot fail");
        }
    }
    writeln!(out, "**CR** :: {}", snapshot.challenge_rating)
        .expect("writing to String cannot fail");
    out.push('\n');

    for section in &sections {
        write_section(&mut out, section);
    }
    out.push_str("}}\n");

    debug!(
        name = %snapshot.name,
        wide = options.wide,
        sections = sections.len(),
        "rendered markdown"
    );
    Ok(out)
}

fn hit_points_str(snapshot: &Snapshot) -> String {
    snapshot
        .hit_points
        .map(|hd| hd.to_string())
        .unwrap_or_default()
}

fn property_lines(properties: &PropertyLines) -> [(&'static str, &str); 7] {
    [
        ("Skills", properties.skills.as_str()),
        ("Vulnerabilities", properties.vulnerabilities.as_str()),
        ("Resistances", properties.resistances.as_str()),
        ("Immunities", properties.immunities.as_str()),
        ("Gear", properties.gear.as_str()),
        ("Senses", properties.senses.as_str()),
        ("Languages", properties.languages.as_str()),
    ]
}

fn write_ability_table(out: &mut String, abilities: &[AbilityEntry]) {
    out.push_str(ABILITY_TABLE_HEADER);
    for row in abilities.chunks(ABILITIES_PER_ROW) {
        out.push('|');
        for entry in row {
            write!(
                out,
                " {} | {} | {} | {} |",
                entry.abbreviation,
                entry.score,
                format_modifier(entry.modifier),
                format_modifier(entry.save)
            )
            .expect("writing to String cannot fail");
        }
        out.push('\n');
    }
}

fn write_section(out: &mut String, section: &SectionEntry) {
    writeln!(out, "### {}", section.title).expect("writing to String cannot fail");
    if let Some(preamble) = &section.preamble {
        writeln!(out, "_{preamble}_").expect("writing to String cannot fail");
        out.push_str("{{color:gray}}\n");
    }
    let body = section
        .entries
        .iter()
        .map(|entry| entry.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push_str(&body);
    out.push('\n');
}

fn default_json(session: &Session) -> Result<JsonMap<String, JsonValue>, CoreError> {
    let snapshot = session.snapshot()?;
    let properties = session.properties();
    let statblock = session.statblock();
    let mut out = JsonMap::new();

    out.insert("name".to_string(), JsonValue::String(snapshot.name.clone()));
    out.insert(
        "epithet".to_string(),
        JsonValue::String(snapshot.epithet.clone()),
    );
    out.insert(
        "description".to_string(),
        JsonValue::String(snapshot.description.clone()),
    );
    out.insert(
        "habitat".to_string(),
        JsonValue::String(snapshot.habitat.clone()),
    );
    out.insert(
        "treasure".to_string(),
        JsonValue::String(snapshot.treasure.clone()),
    );
    out.insert(
        "subheader".to_string(),
        JsonValue::String(snapshot.subheader.clone()),
    );
    out.insert(
        "armor_class".to_string(),
        JsonValue::from(statblock.armor_class),
    );
    out.insert(
        "hit_points".to_string(),
        match snapshot.hit_points {
            Some(hd) => JsonValue::from(hd.hit_points),
            None => JsonValue::Null,
        },
    );
    out.insert(
        "hit_dice".to_string(),
        match snapshot.hit_points {
            Some(hd) => JsonValue::String(hd.expression()),
            None => JsonValue::Null,
        },
    );
    out.insert("speed".to_string(), JsonValue::String(snapshot.speed.clone()));
    out.insert(
        "initiative".to_string(),
        JsonValue::from(statblock.initiative()),
    );
    out.insert(
        "proficiency_bonus".to_string(),
        JsonValue::from(snapshot.proficiency_bonus),
    );
    out.insert("abilities".to_string(), abilities_to_json(&session.abilities()));
    out.insert("skills".to_string(), skills_to_json(&session.skills()));
    for (key, value) in [
        ("vulnerabilities", &properties.vulnerabilities),
        ("resistances", &properties.resistances),
        ("immunities", &properties.immunities),
        ("gear", &properties.gear),
        ("senses", &properties.senses),
        ("languages", &properties.languages),
    ] {
        out.insert(key.to_string(), JsonValue::String(value.clone()));
    }
    out.insert(
        "passive_perception".to_string(),
        JsonValue::from(statblock.passive_perception()),
    );
    out.insert(
        "challenge_rating".to_string(),
        JsonValue::String(snapshot.challenge_rating.clone()),
    );
    out.insert("sections".to_string(), sections_to_json(&session.sections()?));

    Ok(out)
}

fn abilities_to_json(abilities: &[AbilityEntry]) -> JsonValue {
    JsonValue::Array(
        abilities
            .iter()
            .map(|a| {
                let mut m = JsonMap::new();
                m.insert("name".to_string(), JsonValue::String(a.abbreviation.clone()));
                m.insert("score".to_string(), JsonValue::from(a.score));
                m.insert("modifier".to_string(), JsonValue::from(a.modifier));
                m.insert("save".to_string(), JsonValue::from(a.save));
                m.insert(
                    "proficiency".to_string(),
                    JsonValue::String(a.proficiency.display_name().to_string()),
                );
                JsonValue::Object(m)
            })
            .collect(),
    )
}

fn skills_to_json(skills: &[SkillEntry]) -> JsonValue {
    JsonValue::Array(
        skills
            .iter()
            .map(|s| {
                let mut m = JsonMap::new();
                m.insert("name".to_string(), JsonValue::String(s.name.clone()));
                m.insert("bonus".to_string(), JsonValue::from(s.bonus));
                m.insert(
                    "proficiency".to_string(),
                    JsonValue::String(s.proficiency.display_name().to_string()),
                );
                JsonValue::Object(m)
            })
            .collect(),
    )
}

fn sections_to_json(sections: &[SectionEntry]) -> JsonValue {
    JsonValue::Array(
        sections
            .iter()
            .map(|section| {
                let mut m = JsonMap::new();
                m.insert("title".to_string(), JsonValue::String(section.title.clone()));
                if let Some(preamble) = &section.preamble {
                    m.insert("preamble".to_string(), JsonValue::String(preamble.clone()));
                }
                m.insert(
                    "entries".to_string(),
                    JsonValue::Array(section.entries.iter().map(entry_to_json).collect()),
                );
                JsonValue::Object(m)
            })
            .collect(),
    )
}

fn entry_to_json(entry: &CharacteristicEntry) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("title".to_string(), JsonValue::String(entry.title.clone()));
    m.insert("text".to_string(), JsonValue::String(entry.text.clone()));
    JsonValue::Object(m)
}
