//! Plate normalization and Brazilian-format correction.
//!
//! Plates follow a fixed 7-character position grammar: three letters, one
//! digit, one position that is a digit in the old national format and a
//! letter in the Mercosul format, then two digits. OCR confusions are
//! systematic (visually similar glyphs), so position-aware substitution
//! recovers far more valid plates than raw string matching.
//!
//! Everything here is a pure, total function: the same input always yields
//! the same output or rejection, and a half-corrected string is never
//! emitted.

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters OCR commonly reads instead of a digit, and the digit they
/// stand for. Part of the normalizer's contract; reproduced exactly from
/// the deployed correction tables.
const LETTER_TO_DIGIT: &[(char, char)] = &[
    ('O', '0'),
    ('Q', '0'),
    ('D', '0'),
    ('U', '0'),
    ('I', '1'),
    ('J', '1'),
    ('L', '1'),
    ('Z', '2'),
    ('A', '4'),
    ('S', '5'),
    ('$', '5'),
    ('G', '6'),
    ('b', '6'),
    ('T', '7'),
    ('B', '8'),
    ('g', '9'),
];

/// Characters OCR commonly reads instead of a letter, and the letter they
/// stand for. `3` and `9` have no letter reading: they reject the string
/// when they land in a letter position.
const DIGIT_TO_LETTER: &[(char, char)] = &[
    ('0', 'O'),
    ('1', 'I'),
    ('2', 'Z'),
    ('4', 'A'),
    ('5', 'S'),
    ('6', 'G'),
    ('7', 'T'),
    ('8', 'B'),
];

/// Canonical 7-character plate shape after grammar correction.
static PLATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{3}[0-9][A-Z0-9][0-9]{2}$").unwrap_or_else(|_| unreachable!())
});

fn lookup(table: &[(char, char)], c: char) -> Option<char> {
    table.iter().find(|(from, _)| *from == c).map(|(_, to)| *to)
}

/// Strips everything outside `[A-Z0-9]`, case-folding to upper.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_uppercase)
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Whether a string already has the canonical 7-character plate shape.
///
/// Used to validate registry input before an upsert.
#[must_use]
pub fn is_canonical_plate(s: &str) -> bool {
    PLATE_SHAPE.is_match(s)
}

/// Applies the position grammar to the first 7 sanitized characters.
///
/// Positions 0-2 must resolve to letters, position 3 to a digit, position
/// 4 may be either (the Mercosul format puts a letter there, the old
/// format a digit; an unambiguous character is kept as observed), and
/// positions 5-6 to digits. A position that cannot be resolved rejects
/// the whole string.
#[must_use]
pub fn correct_brazilian(sanitized: &str) -> Option<String> {
    let mut chars: Vec<char> = sanitized.chars().take(7).collect();
    if chars.len() < 7 {
        return None;
    }

    // Three leading letters.
    for c in chars.iter_mut().take(3) {
        if let Some(letter) = lookup(DIGIT_TO_LETTER, *c) {
            *c = letter;
        }
        if !c.is_ascii_alphabetic() {
            return None;
        }
    }

    // Fourth position is always a digit.
    if let Some(digit) = lookup(LETTER_TO_DIGIT, chars[3]) {
        chars[3] = digit;
    }
    if !chars[3].is_ascii_digit() {
        return None;
    }

    // Fifth position distinguishes the formats and is kept as observed;
    // sanitization already guarantees it is alphanumeric.

    // Two trailing digits.
    for c in &mut chars[5..7] {
        if let Some(digit) = lookup(LETTER_TO_DIGIT, *c) {
            *c = digit;
        }
        if !c.is_ascii_digit() {
            return None;
        }
    }

    Some(chars.into_iter().collect())
}

/// Full normalization: sanitize, gate on length `[6, 8]`, then optionally
/// apply the position grammar.
///
/// Returns `None` when the reading is rejected; rejection is an expected
/// high-frequency outcome, not an error.
#[must_use]
pub fn normalize(raw: &str, grammar_correction: bool) -> Option<String> {
    let sanitized = sanitize(raw);
    if sanitized.len() < 6 || sanitized.len() > 8 {
        return None;
    }
    if grammar_correction {
        correct_brazilian(&sanitized)
    } else {
        Some(sanitized)
    }
}
