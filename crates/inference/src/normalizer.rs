//! Symptom text normalization
//!
//! Free-text symptoms and trained vocabulary terms are both reduced to a
//! canonical form before comparison: lowercase ASCII letters, digits and
//! single spaces, with no leading or trailing space.

/// Suffixes stripped by [`variants`], in the order they are tried.
const STRIPPED_SUFFIXES: [&str; 3] = ["ing", "ed", "s"];

/// Canonicalize a symptom string.
///
/// Total and pure: garbage input yields an empty string, which callers
/// treat as "no symptom". The output is a fixed point of this function.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '_' {
            pending_space = true;
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        }
        // anything else is dropped without acting as a separator
    }

    out
}

/// Surface-form variants of an already normalized string.
///
/// Yields the string itself first, then one form per matching suffix in
/// `ing`, `ed`, `s` order. Stripping is a heuristic, not a stemmer: two
/// unrelated terms may collide after stripping. Empty forms are skipped.
pub fn variants(canonical: &str) -> Vec<&str> {
    let mut out = Vec::with_capacity(2);
    if canonical.is_empty() {
        return out;
    }
    out.push(canonical);

    for suffix in STRIPPED_SUFFIXES {
        if let Some(stem) = canonical.strip_suffix(suffix) {
            if !stem.is_empty() {
                out.push(stem);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("Chest Pain!"), "chest pain");
        assert_eq!(normalize("  shortness_of__breath "), "shortness of breath");
        assert_eq!(normalize("Runny\tNose"), "runny nose");
        assert_eq!(normalize("COVID-19"), "covid19");
    }

    #[test]
    fn test_normalize_garbage_is_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("!!!???"), "");
        assert_eq!(normalize("___"), "");
    }

    #[test]
    fn test_normalize_drops_punctuation_between_spaces() {
        assert_eq!(normalize("pain ! here"), "pain here");
        assert_eq!(normalize(" _fever"), "fever");
    }

    #[test]
    fn test_normalize_non_ascii_letters_removed() {
        assert_eq!(normalize("Fièvre"), "fivre");
    }

    #[test]
    fn test_normalize_idempotent_examples() {
        for s in ["Chest Pain!", " _a ! b_ ", "İstanbul", "x\u{00a0}y"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "input {s:?}");
        }
    }

    #[test]
    fn test_variants_suffixes() {
        assert_eq!(variants("coughing"), vec!["coughing", "cough"]);
        assert_eq!(variants("bruised"), vec!["bruised", "bruis"]);
        assert_eq!(variants("chills"), vec!["chills", "chill"]);
        assert_eq!(variants("fever"), vec!["fever"]);
    }

    #[test]
    fn test_variants_skip_empty() {
        assert!(variants("").is_empty());
        assert_eq!(variants("s"), vec!["s"]);
        assert_eq!(variants("ed"), vec!["ed"]);
    }
}
