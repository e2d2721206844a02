//! Lexical month detection over a fixed 12-name vocabulary.

/// Canonical month names, in calendar order. Detection iterates this list
/// in order, so when a query mentions several months the earliest calendar
/// month wins regardless of where it appears in the text.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Find the first canonical month name appearing anywhere in `text`.
///
/// Matching is case-insensitive and purely substring-based: there is no
/// word-boundary check, so "decemberfest" matches December. Returns the
/// capitalized canonical form, or `None` when no month name occurs.
pub fn detect_month(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    MONTH_NAMES
        .iter()
        .find(|name| lowered.contains(&name.to_lowercase()))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_month_any_case() {
        assert_eq!(detect_month("something fun in December"), Some("December"));
        assert_eq!(detect_month("SOMETHING FUN IN DECEMBER"), Some("December"));
        assert_eq!(detect_month("deCEmber plans"), Some("December"));
    }

    #[test]
    fn returns_none_without_month() {
        assert_eq!(detect_month("I want something fun"), None);
        assert_eq!(detect_month(""), None);
    }

    #[test]
    fn substring_match_without_word_boundary() {
        assert_eq!(detect_month("tickets for decemberfest"), Some("December"));
        // "march" hides inside "marching" as well
        assert_eq!(detect_month("a marching band parade"), Some("March"));
    }

    #[test]
    fn calendar_order_wins_over_input_position() {
        // June appears first in the text, but March comes first in the calendar.
        assert_eq!(
            detect_month("I liked June more than March"),
            Some("March")
        );
        assert_eq!(
            detect_month("december or january, either works"),
            Some("January")
        );
    }
}
