//! Slug generation shared by articles, categories, tags, tiers and tenants

/// Generate a URL-friendly slug.
///
/// Lowercases the input, keeps ASCII letters, digits and non-ASCII
/// characters, turns everything else into hyphens and collapses runs of
/// hyphens. Leading and trailing hyphens are removed.
pub fn generate_slug(title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || !c.is_ascii() {
                c
            } else {
                '-'
            }
        })
        .collect();

    let mut result = String::with_capacity(slug.len());
    let mut prev_hyphen = false;
    for c in slug.chars() {
        if c == '-' {
            if !prev_hyphen && !result.is_empty() {
                result.push(c);
                prev_hyphen = true;
            }
        } else {
            result.push(c);
            prev_hyphen = false;
        }
    }

    result.trim_end_matches('-').to_string()
}

/// Whether a slug is lowercase words joined by single hyphens
pub fn is_well_formed(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .split('-')
            .all(|word| !word.is_empty() && word.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generate_slug_simple() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
    }

    #[test]
    fn test_generate_slug_with_special_chars() {
        assert_eq!(generate_slug("Hello, World!"), "hello-world");
        assert_eq!(generate_slug("SEO: 10 tips_for 2024"), "seo-10-tips-for-2024");
    }

    #[test]
    fn test_generate_slug_trims_hyphens() {
        assert_eq!(generate_slug("  --Hello--  "), "hello");
        assert_eq!(generate_slug("!!!"), "");
    }

    #[test]
    fn test_generate_slug_keeps_non_ascii() {
        assert_eq!(generate_slug("Café Über"), "café-über");
    }

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed("content-marketing-101"));
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("Upper-Case"));
        assert!(!is_well_formed("double--hyphen"));
        assert!(!is_well_formed("-leading"));
        assert!(!is_well_formed("under_score"));
    }

    proptest! {
        #[test]
        fn ascii_slugs_are_well_formed(title in "[ -~]{0,60}") {
            let slug = generate_slug(&title);
            prop_assert!(slug.is_empty() || is_well_formed(&slug));
        }
    }
}
