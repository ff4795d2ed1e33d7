//! Emphasis for rules keywords (damage types and conditions).

use crate::vocab::{Condition, DamageType};

const EMPHASIS: char = '_';

pub fn is_keyword(word: &str) -> bool {
    DamageType::ALL.iter().any(|d| d.display_name() == word)
        || Condition::ALL.iter().any(|c| c.display_name() == word)
}

/// Wraps every whole-word keyword in `_..._`.
///
/// Matching is case-sensitive. Words already touching emphasis markup and
/// anything inside `[...]` directives are left alone.
pub fn format_keywords(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut word_start: Option<usize> = None;
    let mut bracket_depth = 0usize;

    for (index, ch) in text.char_indices() {
        if ch.is_ascii_alphabetic() && bracket_depth == 0 {
            word_start.get_or_insert(index);
            continue;
        }
        if let Some(start) = word_start.take() {
            push_word(&mut out, text, start, index);
        }
        match ch {
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            _ => {}
        }
        out.push(ch);
    }
    if let Some(start) = word_start {
        push_word(&mut out, text, start, text.len());
    }
    out
}

fn push_word(out: &mut String, text: &str, start: usize, end: usize) {
    let word = &text[start..end];
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    let touches_markup = |c: Option<char>| {
        c.is_some_and(|c| matches!(c, '_' | '*' | '\'') || c.is_alphanumeric())
    };

    if is_keyword(word) && !touches_markup(before) && !touches_markup(after) {
        out.push(EMPHASIS);
        out.push_str(word);
        out.push(EMPHASIS);
    } else {
        out.push_str(word);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_damage_types_and_conditions() {
        assert_eq!(
            format_keywords("takes Fire damage and has the Prone condition"),
            "takes _Fire_ damage and has the _Prone_ condition"
        );
        assert_eq!(
            format_keywords("Bludgeoning, Piercing and Slashing damage."),
            "_Bludgeoning_, _Piercing_ and _Slashing_ damage."
        );
    }

    #[test]
    fn matching_is_case_sensitive_and_whole_word() {
        assert_eq!(format_keywords("a fire in the hold"), "a fire in the hold");
        assert_eq!(format_keywords("Firebolt"), "Firebolt");
        assert_eq!(format_keywords("Poisoned"), "_Poisoned_");
        assert_eq!(format_keywords("Poison2"), "Poison2");
    }

    #[test]
    fn existing_markup_and_directives_are_untouched() {
        assert_eq!(format_keywords("_Fire_ damage"), "_Fire_ damage");
        assert_eq!(format_keywords("*Acid* splash"), "*Acid* splash");
        assert_eq!(
            format_keywords("[STR 1D6] Cold damage"),
            "[STR 1D6] _Cold_ damage"
        );
    }

    #[test]
    fn is_pure_and_total() {
        assert_eq!(format_keywords(""), "");
        let once = format_keywords("Radiant light");
        assert_eq!(format_keywords(&once), once);
    }
}
