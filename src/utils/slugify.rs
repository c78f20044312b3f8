/// Slug derivation for project titles.
///
/// The slug column is VARCHAR(220); the base is truncated to 200 characters
/// so there is always room for a `-N` collision suffix.
const MAX_BASE_LENGTH: usize = 200;

/// URL-safe base slug for a title, truncated to fit the column.
pub fn slug_base(title: &str) -> String {
    let mut base = slug::slugify(title);
    if base.len() > MAX_BASE_LENGTH {
        base.truncate(MAX_BASE_LENGTH);
        // never end on the separator after a mid-word cut
        while base.ends_with('-') {
            base.pop();
        }
    }
    base
}

/// Candidate for the Nth collision retry: `base` itself for attempt 0,
/// then `base-1`, `base-2`, ...
pub fn slug_candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_is_lowercase_and_hyphenated() {
        assert_eq!(slug_base("Save the Rainforest!"), "save-the-rainforest");
        assert_eq!(slug_base("  Clean   Water  "), "clean-water");
    }

    #[test]
    fn base_strips_non_ascii_punctuation() {
        assert_eq!(slug_base("Éducation & Espoir"), "education-espoir");
    }

    #[test]
    fn base_is_truncated_without_trailing_hyphen() {
        let title = "word ".repeat(60); // slugifies to far over 200 chars
        let base = slug_base(&title);
        assert!(base.len() <= MAX_BASE_LENGTH);
        assert!(!base.ends_with('-'));
    }

    #[test]
    fn candidates_are_strictly_distinct() {
        let base = "solar-school";
        assert_eq!(slug_candidate(base, 0), "solar-school");
        assert_eq!(slug_candidate(base, 1), "solar-school-1");
        assert_eq!(slug_candidate(base, 2), "solar-school-2");
    }
}
