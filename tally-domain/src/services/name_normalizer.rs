use fxhash::FxBuildHasher;
use indexmap::{IndexMap, map::Entry};

use crate::model::PersonKey;

/// Identity key for a name: trimmed and lower-cased. Never displayed.
///
/// Lower-cases one character at a time, without the context-sensitive
/// final-sigma rule of `str::to_lowercase`, so a name keeps its key however
/// its words are capitalized.
pub fn canonical_key(name: &str) -> String {
    name.trim().chars().flat_map(char::to_lowercase).collect()
}

/// Trimmed name with the first letter of every word capitalized.
///
/// A word is a maximal run of alphanumeric characters, so `"o'brien"` becomes
/// `"O'Brien"`. Letters after the first keep their case.
pub fn display_form(name: &str) -> String {
    let mut output = String::with_capacity(name.len());
    let mut at_word_start = true;

    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                match capitalize(c) {
                    Some(upper) => output.push(upper),
                    None => output.push(c),
                }
            } else {
                output.push(c);
            }
            at_word_start = false;
        } else {
            output.push(c);
            at_word_start = true;
        }
    }

    output
}

// Only single-char capitals that lower-case back to the same letter, so the
// display form always maps to the original canonical key.
fn capitalize(c: char) -> Option<char> {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) if u.to_lowercase().eq(c.to_lowercase()) => Some(u),
        _ => None,
    }
}

/// Display-name side table: canonical key to the first-seen display form,
/// kept in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct NameRegistry {
    names: IndexMap<PersonKey, String, FxBuildHasher>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `raw` if its canonical key is unseen. Later spellings of a
    /// known person do not replace the stored display form.
    pub fn register(&mut self, raw: &str) -> Option<PersonKey> {
        let key = PersonKey::from_name(raw)?;
        if let Entry::Vacant(entry) = self.names.entry(key.clone()) {
            entry.insert(display_form(raw));
        }
        Some(key)
    }

    pub fn display_name(&self, key: &PersonKey) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PersonKey, &str)> + '_ {
        self.names.iter().map(|(key, name)| (key, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("alice", "alice")]
    #[case::padded("  Bob \t", "bob")]
    #[case::mixed_case("McDonald", "mcdonald")]
    #[case::inner_space("Mary  Jane", "mary  jane")]
    #[case::sigma_per_char("ΟΔΟΣ", "οδοσ")]
    fn canonical_key_trims_and_lowercases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(canonical_key(input), expected);
    }

    #[rstest]
    #[case::single_word("alice", "Alice")]
    #[case::two_words(" mary jane ", "Mary Jane")]
    #[case::keeps_inner_capitals("mcDonald", "McDonald")]
    #[case::apostrophe("o'brien", "O'Brien")]
    #[case::hyphen("anne-marie", "Anne-Marie")]
    #[case::accented("élodie", "Élodie")]
    #[case::digits("team 2b", "Team 2b")]
    #[case::blank("   ", "")]
    fn display_form_capitalizes_words(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(display_form(input), expected);
    }

    #[rstest]
    #[case::sigma_after_apostrophe("a'σ")]
    #[case::capital_sigma_word("o'Σ")]
    #[case::greek_word("οδυσσέας")]
    fn display_form_keeps_the_key(#[case] raw: &str) {
        assert_eq!(canonical_key(&display_form(raw)), canonical_key(raw));
    }

    #[test]
    fn registry_keeps_first_seen_display_form() {
        let mut registry = NameRegistry::new();

        let first = registry.register("sam");
        let second = registry.register("  SAM ");
        let blank = registry.register("  ");

        assert_eq!(first, second);
        assert_eq!(blank, None);
        assert_eq!(registry.len(), 1);
        let key = first.expect("key");
        assert_eq!(registry.display_name(&key), Some("Sam"));
    }

    #[test]
    fn registry_iterates_in_first_seen_order() {
        let mut registry = NameRegistry::new();
        for name in ["carol", "Alice", "bob", "ALICE"] {
            registry.register(name);
        }

        let names: Vec<&str> = registry.iter().map(|(_, name)| name).collect();
        assert_eq!(names, vec!["Carol", "Alice", "Bob"]);
    }
}
