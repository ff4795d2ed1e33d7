use std::fs;
use std::path::PathBuf;

use statblock_core::core_api::{CoreErrorCode, Engine};
use statblock_core::statblock::StatBlock;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn fixture(name: &str) -> String {
    let path = workspace_root().join("tests/fixtures").join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {:?}: {}", path, e))
}

#[test]
fn ogre_document_roundtrip() {
    let original = StatBlock::from_json(&fixture("ogre.json")).expect("failed to parse ogre");
    let emitted = original.to_json().expect("failed to emit ogre");
    let reparsed = StatBlock::from_json(&emitted).expect("failed to reparse ogre");
    assert_eq!(reparsed, original);
    assert_eq!(reparsed.characteristics.len(), 3);
}

#[test]
fn dragon_document_roundtrip_keeps_optional_fields() {
    let original =
        StatBlock::from_json(&fixture("adult_red_dragon.json")).expect("failed to parse dragon");
    let emitted = original.to_json().expect("failed to emit dragon");
    let reparsed = StatBlock::from_json(&emitted).expect("failed to reparse dragon");
    assert_eq!(reparsed, original);
    assert_eq!(reparsed.legendary_actions, Some(3));
    assert_eq!(reparsed.legendary_actions_lair_bonus, Some(1));
    assert!(reparsed.characteristics[0].limited_use.is_some());
    assert!(reparsed.challenge_rating.has_lair());
}

#[test]
fn document_rejects_unknown_fields() {
    let mut value: serde_json::Value =
        serde_json::from_str(&fixture("ogre.json")).expect("fixture is JSON");
    value["hit_points"] = serde_json::json!(59);
    let err = StatBlock::from_json(&value.to_string()).expect_err("unknown field accepted");
    assert_eq!(err.code, CoreErrorCode::Serialization);
}

#[test]
fn document_rejects_unknown_enum_names() {
    let text = fixture("ogre.json").replace("\"CHAOTIC_EVIL\"", "\"MOSTLY_EVIL\"");
    let err = StatBlock::from_json(&text).expect_err("unknown alignment accepted");
    assert_eq!(err.code, CoreErrorCode::Serialization);
}

#[test]
fn document_rejects_out_of_range_rating() {
    let text = fixture("ogre.json").replace(
        "\"rating\": \"2\"",
        "\"rating\": \"31\"",
    );
    let err = StatBlock::from_json(&text).expect_err("rating 31 accepted");
    assert_eq!(err.code, CoreErrorCode::Serialization);
}

#[test]
fn document_rejects_limited_use_on_actions() {
    let mut value: serde_json::Value =
        serde_json::from_str(&fixture("ogre.json")).expect("fixture is JSON");
    value["characteristics"][1]["limited_use"] = serde_json::json!({
        "usage": "X_PER_DAY",
        "charges": {"Day": 1}
    });
    let err = StatBlock::from_json(&value.to_string()).expect_err("limited use on an action");
    assert_eq!(err.code, CoreErrorCode::Serialization);
    assert!(err.message.contains("Greatclub"), "{}", err.message);
}

#[test]
fn engine_session_edits_survive_roundtrip() {
    let engine = Engine::new();
    let mut session = engine.open_str(&fixture("ogre.json")).expect("failed to open ogre");
    session.set_ability_score(statblock_core::ability::Ability::Strength, 21);
    session.refresh_characteristics();

    let reopened = engine
        .open_str(&session.to_json().expect("failed to emit"))
        .expect("failed to reopen");
    assert_eq!(reopened.statblock(), session.statblock());
    let actions = reopened
        .characteristics(statblock_core::characteristic::CharacteristicKind::Action)
        .expect("actions resolve");
    assert!(actions[0].text.contains("+7"), "{}", actions[0].text);
}
