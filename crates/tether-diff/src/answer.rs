//! Answer comparison
//!
//! `diff_strings(base, candidate)` compares a candidate answer with a base
//! (reference) answer. Case and insignificant characters never count as a
//! difference. `added` marks text present in the candidate only, `removed`
//! text present in the base only.

use unicode_normalization::UnicodeNormalization;

use crate::{diff_chars, DiffToken};

/// Punctuation, quotes and whitespace that never make two answers differ
pub const INSIGNIFICANT_CHARS: &[char] = &[
    '.', ',', ';', ':', '?', '¿', '!', '¡', '(', ')', '"', ' ', '\t', '\n', '\r', '\u{a0}',
];

#[inline]
pub fn is_insignificant(c: char) -> bool {
    INSIGNIFICANT_CHARS.contains(&c)
}

/// NFC form of `s`, with insignificant characters trimmed from both ends
pub fn normalize_answer(s: &str) -> String {
    let normalized: String = s.nfc().collect();
    normalized.trim_matches(is_insignificant).to_string()
}

/// Comparator used for the alignment
pub fn chars_equivalent(left: char, right: char) -> bool {
    left == right
        || left.to_lowercase().eq(right.to_lowercase())
        || (is_insignificant(left) && is_insignificant(right))
}

/// Compare two answers
///
/// Returns `None` when they are equivalent, otherwise the aligned tokens
/// (at least one of which is added or removed). Edits made only of
/// insignificant characters are kept in the output but never make the
/// answers differ on their own.
pub fn diff_strings(base: &str, candidate: &str) -> Option<Vec<DiffToken>> {
    // The alignment keeps characters of its second argument as the
    // backbone, and we want the base text there.
    let tokens = diff_chars(
        &normalize_answer(candidate),
        &normalize_answer(base),
        chars_equivalent,
    );

    let substantive = tokens
        .iter()
        .any(|token| token.is_change() && !token.value.chars().all(is_insignificant));
    if !substantive {
        return None;
    }

    Some(tokens.into_iter().map(DiffToken::inverted).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn base_side(tokens: &[DiffToken]) -> String {
        tokens
            .iter()
            .filter(|t| !t.added)
            .map(|t| t.value.as_str())
            .collect()
    }

    #[test]
    fn test_punctuation_and_case_are_ignored() {
        assert_eq!(diff_strings("Hello, world!", "hello world"), None);
        assert_eq!(diff_strings("¿Qué tal?", "qué tal"), None);
        assert_eq!(diff_strings("\u{a0}\"Yes.\"", "YES"), None);
    }

    #[test]
    fn test_canonical_equivalence() {
        // Precomposed vs combining acute accent
        assert_eq!(diff_strings("caf\u{e9}", "cafe\u{301}"), None);
    }

    #[test]
    fn test_missing_word_is_removed() {
        let tokens = diff_strings("I eat an apple", "I eat apple").unwrap();

        let changes: Vec<_> = tokens.iter().filter(|t| t.is_change()).collect();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].removed);
        assert_eq!(changes[0].count, 3);
        assert_eq!(base_side(&tokens), "I eat an apple");
    }

    #[test]
    fn test_extra_word_is_added() {
        let tokens = diff_strings("I eat apples", "I eat green apples").unwrap();

        let added: String = tokens
            .iter()
            .filter(|t| t.added)
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(added.chars().count(), 6);
        assert!(tokens.iter().all(|t| !t.removed));
    }

    #[test]
    fn test_substitution_lists_candidate_side_first() {
        let tokens = diff_strings("cat", "cut").unwrap();
        assert_eq!(
            tokens,
            vec![
                DiffToken::unchanged("c".to_string()),
                DiffToken::added("u".to_string()),
                DiffToken::removed("a".to_string()),
                DiffToken::unchanged("t".to_string()),
            ]
        );
    }

    #[test]
    fn test_unchanged_text_comes_from_base() {
        let tokens = diff_strings("The Dog runs", "the dog walks").unwrap();
        assert!(tokens[0].value.starts_with("The Dog"));
    }

    #[test]
    fn test_insignificant_edits_reported_alongside_real_ones() {
        let tokens = diff_strings("yes, sir", "yes sur").unwrap();
        assert!(tokens.iter().any(|t| t.is_change()));
        assert_eq!(base_side(&tokens), "yes, sir");
    }

    proptest! {
        #[test]
        fn prop_reflexive(s in "\\PC{0,40}") {
            prop_assert_eq!(diff_strings(&s, &s), None);
        }

        #[test]
        fn prop_edges_and_case_ignored(
            s in "[a-z][a-z ]{0,20}",
            prefix in "[.,;:?!() \"]{0,4}",
            suffix in "[.,;:?!() \"]{0,4}",
        ) {
            let decorated = format!("{prefix}{}{suffix}", s.to_uppercase());
            prop_assert_eq!(diff_strings(&s, &decorated), None);
        }

        #[test]
        fn prop_sides_are_consistent(base in "[a-zA-Z ,.]{0,24}", candidate in "[a-zA-Z ,.]{0,24}") {
            if let Some(tokens) = diff_strings(&base, &candidate) {
                prop_assert!(tokens.iter().any(|t| t.is_change()));
                prop_assert!(tokens.iter().all(|t| !(t.added && t.removed)));
                prop_assert_eq!(base_side(&tokens), normalize_answer(&base));

                let candidate_len: usize = tokens.iter().filter(|t| !t.removed).map(|t| t.count).sum();
                prop_assert_eq!(candidate_len, normalize_answer(&candidate).chars().count());
            }
        }

        #[test]
        fn prop_substantive_change_detected(s in "[a-z]{1,12}", c in "[0-9]") {
            let changed = format!("{s}{c}");
            prop_assert!(diff_strings(&s, &changed).is_some());
        }
    }
}
