//! Best-effort PII redaction.
//!
//! Pattern-matching only (emails, SSNs, North American phone numbers),
//! applied before any text leaves the process. Redaction is deterministic
//! and irreversible: placeholders are fixed strings, so the same input
//! always produces the same redacted output.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email regex")
});

static SSN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("ssn regex"));

// No leading \b: a word boundary can never sit between a space and '+',
// which would strand the '+' outside the match.
static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[-. ]?)?\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}\b").expect("phone regex")
});

/// Replace detected PII with fixed placeholders. SSNs are matched before
/// phone numbers so the more specific pattern wins.
pub fn redact(text: &str) -> String {
    let text = EMAIL.replace_all(text, "[EMAIL]");
    let text = SSN.replace_all(&text, "[SSN]");
    PHONE.replace_all(&text, "[PHONE]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_emails() {
        assert_eq!(redact("mail me at bob@example.com now"), "mail me at [EMAIL] now");
    }

    #[test]
    fn redacts_ssns_not_as_phones() {
        assert_eq!(redact("ssn 123-45-6789 on file"), "ssn [SSN] on file");
    }

    #[test]
    fn redacts_phone_numbers() {
        assert_eq!(redact("call 555-867-5309"), "call [PHONE]");
        // The '+' prefix must be consumed, not stranded outside the match.
        assert_eq!(redact("call +1 (555) 867-5309"), "call [PHONE]");
        assert_eq!(redact("call +1-555-867-5309"), "call [PHONE]");
    }

    #[test]
    fn redaction_is_deterministic() {
        let input = "bob@example.com, 123-45-6789, 555-867-5309";
        assert_eq!(redact(input), redact(input));
    }

    #[test]
    fn clean_text_is_unchanged() {
        let input = "nothing sensitive here, version 1.2.3";
        assert_eq!(redact(input), input);
    }
}
