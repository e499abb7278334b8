//! Text classification shared by every stage.
//!
//! Two independent predicates over [`normalize_text`]-ed strings:
//!
//! - [`is_noise`]: structural text (pagination, bare numbers, dash rules)
//!   that must never become a label or a section header.
//! - [`is_suspect`]: a resolved label too weak to trust without a second
//!   opinion from the vision oracle.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::Lexicon;

/// Pagination markers, boilerplate tokens, short bare numbers, and dash
/// rules.
static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:page\s*\d+\s*of\s*\d+|page|of|\d{1,3}|pdf|form|[-–—]+)$")
        .expect("valid regex")
});

/// Fill-in blanks and leader dots (`____`, `.....`, `--`).
static FILLER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:_+|[.…]{2,}|[-–—]{2,})$").expect("valid regex"));

/// Trims and collapses internal whitespace runs to a single space.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns `true` if the (already normalized) text is structural noise.
#[must_use]
pub fn is_noise(text: &str) -> bool {
    NOISE_RE.is_match(text)
}

/// Returns `true` if a single OCR token is a fill-in blank or leader
/// rather than printed label text.
#[must_use]
pub fn is_filler(token: &str) -> bool {
    FILLER_RE.is_match(token.trim())
}

/// Returns `true` if the text has at least one letter and no lowercase
/// letters.
#[must_use]
pub fn is_all_caps(text: &str) -> bool {
    text.chars().any(char::is_alphabetic) && !text.chars().any(char::is_lowercase)
}

/// Number of whitespace-separated words.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Decides whether a resolved label should be escalated for confirmation.
///
/// Whitelisted labels are never suspect. Otherwise a label is suspect if
/// it is empty, is a single colon-terminated word not in the short-label
/// list, is shorter than the minimum length and not a known short label,
/// lacks a trailing colon, contains a comma or period, or is a generic
/// word on its own.
#[must_use]
pub fn is_suspect(label: Option<&str>, lexicon: &Lexicon) -> bool {
    let text = normalize_text(label.unwrap_or_default());
    if text.is_empty() {
        return true;
    }
    if lexicon.whitelist.contains(&text) {
        return false;
    }

    let short_ok = lexicon.short_ok.contains(&text);

    if let Some(core) = text.strip_suffix(':')
        && word_count(core) == 1
        && !short_ok
    {
        return true;
    }
    if text.chars().count() < lexicon.min_label_len && !short_ok {
        return true;
    }
    if !text.ends_with(':') {
        return true;
    }
    if text.contains(',') || text.contains('.') {
        return true;
    }

    lexicon.generic_words.contains(&text.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_whitespace() {
        assert_eq!(normalize_text("  FIRST \t  NAME:\n"), "FIRST NAME:");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn pagination_is_noise() {
        assert!(is_noise("Page 2 of 10"));
        assert!(is_noise("PAGE 1 OF 3"));
        assert!(is_noise("page2of3"));
        assert!(is_noise("Page"));
        assert!(is_noise("of"));
    }

    #[test]
    fn boilerplate_tokens_are_noise() {
        assert!(is_noise("PDF"));
        assert!(is_noise("Form"));
        assert!(is_noise("12"));
        assert!(is_noise("999"));
        assert!(is_noise("—"));
        assert!(is_noise("---"));
    }

    #[test]
    fn real_labels_are_not_noise() {
        assert!(!is_noise("1234"));
        assert!(!is_noise("Form Number:"));
        assert!(!is_noise("CITY:"));
        assert!(!is_noise("Page Count:"));
    }

    #[test]
    fn detects_filler_tokens() {
        assert!(is_filler("_____"));
        assert!(is_filler("......"));
        assert!(is_filler("--"));
        assert!(!is_filler("-"));
        assert!(!is_filler("NAME:"));
    }

    #[test]
    fn all_caps_requires_a_letter() {
        assert!(is_all_caps("APPLICANT INFORMATION"));
        assert!(is_all_caps("SECTION 2"));
        assert!(!is_all_caps("Applicant"));
        assert!(!is_all_caps("1234"));
    }

    #[test]
    fn empty_label_is_suspect() {
        let lexicon = Lexicon::default();
        assert!(is_suspect(None, &lexicon));
        assert!(is_suspect(Some("   "), &lexicon));
    }

    #[test]
    fn single_word_colon_label_is_suspect_unless_short_ok() {
        let lexicon = Lexicon::default();
        assert!(is_suspect(Some("Telephone:"), &lexicon));
        assert!(!is_suspect(Some("ZIP:"), &lexicon));
        assert!(!is_suspect(Some("CITY:"), &lexicon));
    }

    #[test]
    fn short_ok_labels_are_not_generic() {
        let lexicon = Lexicon::default();
        for label in ["ZIP:", "CITY:", "STATE:", "zip:"] {
            assert!(!is_suspect(Some(label), &lexicon), "{label} should be trusted");
        }
    }

    #[test]
    fn missing_colon_is_suspect() {
        let lexicon = Lexicon::default();
        assert!(is_suspect(Some("Business Address"), &lexicon));
    }

    #[test]
    fn punctuation_is_suspect() {
        let lexicon = Lexicon::default();
        assert!(is_suspect(Some("Name, Last First:"), &lexicon));
        assert!(is_suspect(Some("Apt. Number:"), &lexicon));
    }

    #[test]
    fn generic_words_are_suspect() {
        let mut lexicon = Lexicon::default();
        assert!(!is_suspect(Some("Contact Person:"), &lexicon));

        lexicon.generic_words.insert("contact person:".to_string());
        assert!(is_suspect(Some("Contact Person:"), &lexicon));
        assert!(is_suspect(Some("  CONTACT   PERSON: "), &lexicon));
    }

    #[test]
    fn complete_multi_word_label_is_trusted() {
        let lexicon = Lexicon::default();
        assert!(!is_suspect(Some("BUSINESS ADDRESS:"), &lexicon));
        assert!(!is_suspect(Some("  Date  of birth: "), &lexicon));
    }

    #[test]
    fn whitelist_short_circuits_every_rule() {
        let mut lexicon = Lexicon::default();
        lexicon.whitelist.insert("Signature".to_string());
        assert!(!is_suspect(Some("Signature"), &lexicon));
    }
}
