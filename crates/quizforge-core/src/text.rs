use deunicode::deunicode;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strips HTML tags and collapses runs of whitespace. Only for names; question
/// content goes through [`tidy`] so `2 < x` survives.
pub fn sanitize(input: &str) -> String {
    tidy(&HTML_TAG.replace_all(input, ""))
}

/// Trims and collapses runs of whitespace, leaving every other character alone.
pub fn tidy(input: &str) -> String {
    WHITESPACE.replace_all(input.trim(), " ").into_owned()
}

pub fn tidy_opt(input: Option<String>) -> Option<String> {
    input.map(|s| tidy(&s))
}

pub fn sanitize_opt(input: Option<String>) -> Option<String> {
    input.map(|s| sanitize(&s))
}

/// URL-safe slug: the name transliterated to ASCII, then lowercase
/// alphanumerics separated by single dashes.
pub fn slugify(name: &str) -> String {
    let folded = deunicode(name);
    let mut slug = String::with_capacity(folded.len());
    let mut pending_dash = false;
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c == '\'' {
            // apostrophes vanish: "Newton's" -> "newtons"
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("item");
    }
    slug
}

/// Slug for `name`, optionally suffixed with the first 8 chars of a fresh UUID.
pub fn generate_slug(name: &str, add_random: bool) -> String {
    let base = slugify(name);
    if add_random {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", base, &suffix[..8])
    } else {
        base
    }
}

/// Lowercases and collapses whitespace so cosmetic edits hash the same.
pub fn normalize_for_hash(input: &str) -> String {
    WHITESPACE
        .replace_all(input.trim(), " ")
        .to_lowercase()
}

/// Fingerprint used to spot duplicate questions.
pub fn content_hash(question_text: &str, explanation: Option<&str>, options: &[String]) -> String {
    let content = format!(
        "{}{}{}",
        question_text,
        explanation.unwrap_or_default(),
        options.join("\u{1f}")
    );
    let digest = Sha256::digest(normalize_for_hash(&content).as_bytes());
    format!("{:x}", digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_markup() {
        assert_eq!(sanitize("  <b>Solve</b>   for\n x "), "Solve for x");
    }

    #[test]
    fn slugify_handles_punctuation() {
        assert_eq!(slugify("Newton's Laws of Motion!"), "newtons-laws-of-motion");
        assert_eq!(slugify("  A  -- B "), "a-b");
        assert_eq!(slugify("???"), "item");
    }

    #[test]
    fn slugify_folds_to_ascii() {
        assert_eq!(slugify("Café"), "cafe");
        assert_eq!(slugify("Français"), "francais");
        assert_eq!(slugify("Ökonomie"), "okonomie");
        assert_eq!(slugify("数学"), "shu-xue");
    }

    #[test]
    fn tidy_keeps_inequalities() {
        assert_eq!(tidy("  If 2 < x and\n x > 5 "), "If 2 < x and x > 5");
        assert_eq!(sanitize("<i>Ada</i> Lovelace"), "Ada Lovelace");
    }

    #[test]
    fn random_slug_has_suffix() {
        let slug = generate_slug("Algebra I", true);
        assert!(slug.starts_with("algebra-i-"));
        assert_eq!(slug.len(), "algebra-i-".len() + 8);
    }

    #[test]
    fn hash_ignores_case_and_spacing() {
        let opts = vec!["1".to_string(), "2".to_string()];
        let a = content_hash("What is  1+1?", Some("Basic"), &opts);
        let b = content_hash("what is 1+1?", Some("basic"), &opts);
        assert_eq!(a, b);
        let c = content_hash("what is 1+2?", Some("basic"), &opts);
        assert_ne!(a, c);
    }
}
