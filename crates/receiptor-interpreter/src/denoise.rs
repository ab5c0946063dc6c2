//! Stage 1 — whitespace normalization and scoped digit/letter de-confusion.
//!
//! Mirrors the teacher's regex-cache idiom (`OnceLock`-backed compiled
//! patterns) even though this stage needs only one pattern, to keep the
//! style consistent with the later stages that need many.

use std::sync::OnceLock;

use regex::Regex;

fn re_run_of_blanks() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"[ \t]+").expect("invalid regex"))
}

/// Digit/letter pairs that OCR engines commonly confuse in numeric columns.
const CONFUSIONS: [(char, char); 3] = [('l', '1'), ('O', '0'), ('S', '5')];

/// Collapses horizontal whitespace and fixes digit/letter confusions that
/// only make sense in a numeric context. Line breaks are preserved exactly.
pub fn denoise(transcript: &str) -> String {
    transcript
        .split('\n')
        .map(|line| fix_digit_confusions(&collapse_blanks(line)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_blanks(line: &str) -> String {
    re_run_of_blanks().replace_all(line, " ").into_owned()
}

/// Replaces a confusable letter with its digit twin only when directly
/// adjacent to a decimal digit and not adjacent to any other letter — the
/// latter check is what keeps `SALE`, `COST`, and `TOTAL` untouched.
fn fix_digit_confusions(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());

    for i in 0..chars.len() {
        let c = chars[i];
        let replacement = CONFUSIONS.iter().find(|(letter, _)| *letter == c);

        match replacement {
            Some((_, digit)) if should_replace(&chars, i) => out.push(*digit),
            _ => out.push(c),
        }
    }

    out
}

fn should_replace(chars: &[char], i: usize) -> bool {
    let prev = i.checked_sub(1).and_then(|j| chars.get(j)).copied();
    let next = chars.get(i + 1).copied();

    let neighbor_is_alpha = prev.is_some_and(|c| c.is_ascii_alphabetic())
        || next.is_some_and(|c| c.is_ascii_alphabetic());
    let neighbor_is_digit =
        prev.is_some_and(|c| c.is_ascii_digit()) || next.is_some_and(|c| c.is_ascii_digit());

    neighbor_is_digit && !neighbor_is_alpha
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_of_spaces_and_tabs() {
        assert_eq!(denoise("A   B\t\tC"), "A B C");
    }

    #[test]
    fn preserves_line_breaks() {
        assert_eq!(denoise("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn fixes_l_adjacent_to_digit() {
        assert_eq!(denoise("$1l.99"), "$11.99");
    }

    #[test]
    fn fixes_o_adjacent_to_digit() {
        assert_eq!(denoise("1O.99"), "10.99");
    }

    #[test]
    fn fixes_s_adjacent_to_digit() {
        assert_eq!(denoise("9.9S"), "9.95");
    }

    #[test]
    fn does_not_touch_word_sale() {
        assert_eq!(denoise("SALE TODAY"), "SALE TODAY");
    }

    #[test]
    fn does_not_touch_word_cost() {
        assert_eq!(denoise("TOTAL COST"), "TOTAL COST");
    }

    #[test]
    fn does_not_alter_other_punctuation_or_case() {
        assert_eq!(denoise("Whole Foods #42"), "Whole Foods #42");
    }
}
