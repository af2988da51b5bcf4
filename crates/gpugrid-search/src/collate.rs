//! Locale-aware string ordering for result lists.
//!
//! Approximates root-locale collation for the names the cluster uses
//! (ASCII model prefixes, digits, Hangul). At the primary level characters
//! group as whitespace < punctuation < symbols < digits < letters, and
//! letters compare without regard to case. Lower case sorts before upper
//! case on an otherwise equal string, and code-point order breaks any
//! remaining tie.

use std::cmp::Ordering;

/// ASCII punctuation and symbols in root collation order.
const ASCII_MARKS: &str = "_-,;:!?.'\"()[]{}@*/\\&#%`^+<=>|~$";

pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let primary = a
        .chars()
        .flat_map(char::to_lowercase)
        .map(primary_weight)
        .cmp(b.chars().flat_map(char::to_lowercase).map(primary_weight));
    if primary != Ordering::Equal {
        return primary;
    }

    let tertiary = a
        .chars()
        .zip(b.chars())
        .map(|(x, y)| case_rank(x).cmp(&case_rank(y)))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal);

    tertiary.then_with(|| a.cmp(b))
}

fn primary_weight(c: char) -> (u8, u32) {
    if c.is_whitespace() {
        (0, u32::from(c))
    } else if let Some(i) = ASCII_MARKS.find(c) {
        (1, i as u32)
    } else if c.is_numeric() {
        (3, c.to_digit(10).unwrap_or(u32::from(c)))
    } else if c.is_alphabetic() {
        (4, u32::from(c))
    } else {
        // Non-ASCII punctuation and symbols follow the ASCII ones.
        (2, u32::from(c))
    }
}

fn case_rank(c: char) -> u8 {
    if c.is_uppercase() { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_case_at_primary_level() {
        assert_eq!(locale_compare("a30-02", "A30-10"), Ordering::Less);
        assert_eq!(locale_compare("H100-01", "a100-01"), Ordering::Greater);
    }

    #[test]
    fn lower_case_first_on_tie() {
        assert_eq!(locale_compare("a100", "A100"), Ordering::Less);
        assert_eq!(locale_compare("A100", "A100"), Ordering::Equal);
    }

    #[test]
    fn orders_model_prefixes() {
        let mut names = vec!["H200-01", "A30-01", "H100-02", "A100-12", "A100-02"];
        names.sort_by(|a, b| locale_compare(a, b));
        assert_eq!(names, vec!["A100-02", "A100-12", "A30-01", "H100-02", "H200-01"]);
    }

    #[test]
    fn punctuation_before_digits_before_letters() {
        assert_eq!(locale_compare("node_2", "node1"), Ordering::Less);
        assert_eq!(locale_compare("node 9", "node-1"), Ordering::Less);
        assert_eq!(locale_compare("node~1", "node0"), Ordering::Less);
        assert_eq!(locale_compare("node9", "nodea"), Ordering::Less);

        let mut names = vec!["dgx1", "dgx_a100_01", "dgx-a100-01", "dgxa"];
        names.sort_by(|a, b| locale_compare(a, b));
        assert_eq!(names, vec!["dgx_a100_01", "dgx-a100-01", "dgx1", "dgxa"]);
    }

    #[test]
    fn hangul_orders_by_syllable() {
        assert_eq!(locale_compare("김철수", "이영희"), Ordering::Less);
    }
}
