//! Format checks on a reconstructed plate.

use crate::{symbols::is_digit, InvalidReason, LayoutRule, ReconstructionOptions};

/// Checks the mapped graphemes of a plate, in reading order.
///
/// Returns the first failing check, or `None` for a valid plate. The checks run in this order:
/// no characters, character count, then the layout rule if one is enabled. The result depends
/// only on the number of graphemes and, for [`LayoutRule::LettersBeforeDigits`], on which of them
/// are digits.
pub fn validate(graphemes: &[char], options: &ReconstructionOptions) -> Option<InvalidReason> {
    let count = graphemes.len();
    if count == 0 {
        return Some(InvalidReason::NoCharacters);
    }
    if count < options.min_characters || count > options.max_characters {
        return Some(InvalidReason::CharacterCount {
            count,
            min: options.min_characters,
            max: options.max_characters,
        });
    }
    match options.layout {
        LayoutRule::CountOnly => None,
        LayoutRule::LettersBeforeDigits => letter_after_digit(graphemes),
    }
}

fn letter_after_digit(graphemes: &[char]) -> Option<InvalidReason> {
    let first_digit = graphemes.iter().position(|&it| is_digit(it))?;
    graphemes[first_digit..]
        .iter()
        .position(|&it| !is_digit(it))
        .map(|offset| InvalidReason::LetterAfterDigit {
            position: first_digit + offset,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTERS: [char; 3] = ['\u{0623}', '\u{0628}', '\u{062C}'];
    const DIGITS: [char; 4] = ['\u{0661}', '\u{0662}', '\u{0663}', '\u{0664}'];

    fn strict() -> ReconstructionOptions {
        ReconstructionOptions {
            layout: LayoutRule::LettersBeforeDigits,
            ..Default::default()
        }
    }

    #[test]
    fn count_bounds_are_inclusive() {
        let options = ReconstructionOptions::default();
        for count in 0..=9 {
            let graphemes = vec!['\u{0661}'; count];
            let valid = validate(&graphemes, &options).is_none();
            assert_eq!(valid, (6..=7).contains(&count), "count {count}");
        }
    }

    #[test]
    fn empty_plate_reports_no_characters() {
        assert_eq!(
            validate(&[], &ReconstructionOptions::default()),
            Some(InvalidReason::NoCharacters)
        );
    }

    #[test]
    fn count_reason_names_count() {
        let reason = validate(&DIGITS, &ReconstructionOptions::default()).unwrap();
        assert_eq!(reason.to_string(), "character count 4 outside [6,7]");
    }

    #[test]
    fn count_only_ignores_layout() {
        let graphemes = [DIGITS[0], LETTERS[0], DIGITS[1], LETTERS[1], DIGITS[2], LETTERS[2]];
        assert_eq!(validate(&graphemes, &ReconstructionOptions::default()), None);
    }

    #[test]
    fn letters_then_digits_passes_strict_mode() {
        let graphemes = [LETTERS[0], LETTERS[1], LETTERS[2], DIGITS[0], DIGITS[1], DIGITS[2]];
        assert_eq!(validate(&graphemes, &strict()), None);
        assert_eq!(validate(&DIGITS.repeat(2)[..6], &strict()), None);
    }

    #[test]
    fn letter_after_digit_fails_strict_mode() {
        let graphemes = [LETTERS[0], LETTERS[1], DIGITS[0], LETTERS[2], DIGITS[1], DIGITS[2]];
        assert_eq!(
            validate(&graphemes, &strict()),
            Some(InvalidReason::LetterAfterDigit { position: 3 })
        );
    }

    #[test]
    fn count_is_checked_before_layout() {
        let graphemes = [DIGITS[0], LETTERS[0]];
        assert!(matches!(
            validate(&graphemes, &strict()),
            Some(InvalidReason::CharacterCount { count: 2, .. })
        ));
    }
}
