//! SEO analysis
//!
//! A fixed checklist over an article's metadata and body. Each check carries
//! a weight; the score is the passed weight as a percentage of the total.
//! Analysis is pure and synchronous so it can run on every save.

use serde::Serialize;

use crate::models::Article;
use crate::services::markdown::MarkdownRenderer;
use crate::services::slug::{generate_slug, is_well_formed};

const TITLE_MIN: usize = 30;
const TITLE_MAX: usize = 60;
const META_DESCRIPTION_MIN: usize = 120;
const META_DESCRIPTION_MAX: usize = 160;
const MIN_WORDS: usize = 300;
const INTRODUCTION_WORDS: usize = 100;
const DENSITY_MIN: f64 = 0.5;
const DENSITY_MAX: f64 = 2.5;
const SLUG_MAX: usize = 75;

/// Check identifiers and weights, summing to 100
const WEIGHTS: [(&str, u32); 14] = [
    ("title_length", 10),
    ("meta_description_length", 10),
    ("focus_keyword_set", 10),
    ("keyword_in_title", 10),
    ("keyword_in_meta_description", 5),
    ("keyword_in_introduction", 5),
    ("keyword_in_slug", 5),
    ("content_length", 15),
    ("keyword_density", 5),
    ("subheadings", 5),
    ("featured_image", 5),
    ("image_alt_text", 5),
    ("links", 5),
    ("slug_format", 5),
];

/// Fields the analysis looks at
#[derive(Debug, Clone, Copy, Default)]
pub struct SeoInput<'a> {
    pub title: &'a str,
    pub meta_title: Option<&'a str>,
    pub meta_description: Option<&'a str>,
    pub focus_keyword: Option<&'a str>,
    pub slug: &'a str,
    /// Markdown body
    pub content: &'a str,
    pub featured_image: Option<&'a str>,
    pub featured_image_alt: Option<&'a str>,
}

impl<'a> From<&'a Article> for SeoInput<'a> {
    fn from(article: &'a Article) -> Self {
        Self {
            title: &article.title,
            meta_title: article.meta_title.as_deref(),
            meta_description: article.meta_description.as_deref(),
            focus_keyword: article.focus_keyword.as_deref(),
            slug: &article.slug,
            content: &article.content,
            featured_image: article.featured_image.as_deref(),
            featured_image_alt: article.featured_image_alt.as_deref(),
        }
    }
}

/// Outcome of one checklist item
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SeoCheck {
    pub id: &'static str,
    pub weight: u32,
    pub passed: bool,
    pub message: String,
}

/// Full analysis result
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SeoAnalysis {
    /// 0..=100
    pub score: i64,
    pub label: &'static str,
    pub word_count: usize,
    pub checks: Vec<SeoCheck>,
}

/// Label for a score: `good`, `needs_improvement` or `poor`
pub fn score_label(score: i64) -> &'static str {
    if score >= 80 {
        "good"
    } else if score >= 50 {
        "needs_improvement"
    } else {
        "poor"
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Run the checklist over an article
pub fn analyze_article_seo(input: &SeoInput<'_>) -> SeoAnalysis {
    let outline = MarkdownRenderer::new().outline(input.content);
    let words: Vec<&str> = outline.text.split_whitespace().collect();
    let word_count = words.len();
    let body = tokens(&outline.text);
    let introduction = tokens(&words[..word_count.min(INTRODUCTION_WORDS)].join(" "));

    let title = present(input.meta_title).unwrap_or_else(|| input.title.trim());
    let title_len = title.chars().count();
    let description = present(input.meta_description).unwrap_or("");
    let description_len = description.chars().count();
    let keyword = present(input.focus_keyword).map(|k| k.to_lowercase());
    let slug = input.slug.trim();

    let mut results: Vec<(bool, String)> = Vec::with_capacity(WEIGHTS.len());

    results.push((
        (TITLE_MIN..=TITLE_MAX).contains(&title_len),
        format!("Title is {} characters (recommended {}-{})", title_len, TITLE_MIN, TITLE_MAX),
    ));
    results.push((
        (META_DESCRIPTION_MIN..=META_DESCRIPTION_MAX).contains(&description_len),
        format!(
            "Meta description is {} characters (recommended {}-{})",
            description_len, META_DESCRIPTION_MIN, META_DESCRIPTION_MAX
        ),
    ));

    match keyword.as_deref() {
        Some(keyword) => {
            let phrase = tokens(keyword);
            let occurrences = count_phrase(&body, &phrase);
            let density = if word_count == 0 {
                0.0
            } else {
                occurrences as f64 / word_count as f64 * 100.0
            };
            let keyword_slug = generate_slug(keyword);

            results.push((true, format!("Focus keyword is \"{}\"", keyword)));
            results.push(found(count_phrase(&tokens(title), &phrase) > 0, "title"));
            results.push(found(count_phrase(&tokens(description), &phrase) > 0, "meta description"));
            results.push(found(count_phrase(&introduction, &phrase) > 0, "introduction"));
            results.push(found(!keyword_slug.is_empty() && slug.contains(&keyword_slug), "slug"));
            results.push(content_length(word_count));
            results.push((
                (DENSITY_MIN..=DENSITY_MAX).contains(&density),
                format!(
                    "Keyword density is {:.1}% (recommended {}-{}%)",
                    density, DENSITY_MIN, DENSITY_MAX
                ),
            ));
        }
        None => {
            results.push((false, "No focus keyword set".to_string()));
            for place in ["title", "meta description", "introduction", "slug"] {
                results.push((false, format!("Keyword cannot be checked in {} without a focus keyword", place)));
            }
            results.push(content_length(word_count));
            results.push((false, "Keyword density needs a focus keyword".to_string()));
        }
    }

    results.push(if outline.subheadings > 0 {
        (true, format!("Content has {} subheading(s)", outline.subheadings))
    } else {
        (false, "Add at least one subheading (##)".to_string())
    });
    results.push(if present(input.featured_image).is_some() {
        (true, "Featured image is set".to_string())
    } else {
        (false, "Add a featured image".to_string())
    });
    results.push(if present(input.featured_image_alt).is_some() {
        (true, "Featured image has alt text".to_string())
    } else {
        (false, "Add alt text to the featured image".to_string())
    });
    results.push(if outline.links > 0 {
        (true, format!("Content has {} link(s)", outline.links))
    } else {
        (false, "Add at least one link".to_string())
    });
    results.push(if slug.chars().count() <= SLUG_MAX && is_well_formed(slug) {
        (true, "Slug is well formed".to_string())
    } else {
        (
            false,
            format!("Slug should be lowercase words joined by hyphens, at most {} characters", SLUG_MAX),
        )
    });

    let checks: Vec<SeoCheck> = WEIGHTS
        .iter()
        .zip(results)
        .map(|(&(id, weight), (passed, message))| SeoCheck {
            id,
            weight,
            passed,
            message,
        })
        .collect();

    let total: u32 = checks.iter().map(|c| c.weight).sum();
    let passed: u32 = checks.iter().filter(|c| c.passed).map(|c| c.weight).sum();
    let score = if total == 0 {
        0
    } else {
        ((passed as f64 * 100.0) / total as f64).round() as i64
    };

    SeoAnalysis {
        score,
        label: score_label(score),
        word_count,
        checks,
    }
}

/// Lowercased words, split on anything that is not a letter or digit
fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whole-word occurrences of `phrase` in `words`
fn count_phrase(words: &[String], phrase: &[String]) -> usize {
    if phrase.is_empty() {
        return 0;
    }
    words.windows(phrase.len()).filter(|window| *window == phrase).count()
}

fn found(hit: bool, place: &str) -> (bool, String) {
    if hit {
        (true, format!("Focus keyword appears in the {}", place))
    } else {
        (false, format!("Focus keyword is missing from the {}", place))
    }
}

fn content_length(word_count: usize) -> (bool, String) {
    (
        word_count >= MIN_WORDS,
        format!("Content has {} words (recommended at least {})", word_count, MIN_WORDS),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TITLE: &str = "Rust caching guide for busy backend teams";

    fn meta_description() -> String {
        let mut description = "Learn rust caching patterns that keep busy services fast".to_string();
        while description.chars().count() < 130 {
            description.push_str(" more");
        }
        description
    }

    fn optimised_content() -> String {
        format!(
            "## Rust caching guide\n\nRust caching starts here. {}\n\nRead [more](https://example.com) about rust caching.",
            "lorem ".repeat(300)
        )
    }

    #[test]
    fn test_weights_sum_to_100() {
        assert_eq!(WEIGHTS.iter().map(|(_, w)| w).sum::<u32>(), 100);
    }

    #[test]
    fn test_fully_optimised_article_scores_100() {
        let description = meta_description();
        let content = optimised_content();
        let input = SeoInput {
            title: TITLE,
            meta_title: None,
            meta_description: Some(&description),
            focus_keyword: Some("Rust Caching"),
            slug: "rust-caching-guide",
            content: &content,
            featured_image: Some("/img/cache.png"),
            featured_image_alt: Some("Cache diagram"),
        };

        let analysis = analyze_article_seo(&input);
        let failed: Vec<_> = analysis.checks.iter().filter(|c| !c.passed).collect();
        assert!(failed.is_empty(), "failed checks: {:?}", failed);
        assert_eq!(analysis.score, 100);
        assert_eq!(analysis.label, "good");
        assert!(analysis.word_count >= 300);
    }

    #[test]
    fn test_empty_article_scores_low() {
        let analysis = analyze_article_seo(&SeoInput::default());
        assert_eq!(analysis.checks.len(), 14);
        assert_eq!(analysis.score, 0);
        assert_eq!(analysis.label, "poor");
        assert_eq!(analysis.word_count, 0);
    }

    #[test]
    fn test_keyword_checks_fail_without_keyword() {
        let description = meta_description();
        let content = optimised_content();
        let input = SeoInput {
            title: TITLE,
            meta_description: Some(&description),
            focus_keyword: Some("   "),
            slug: "rust-caching-guide",
            content: &content,
            featured_image: Some("/img/cache.png"),
            featured_image_alt: Some("Cache diagram"),
            ..Default::default()
        };

        let analysis = analyze_article_seo(&input);
        for id in [
            "focus_keyword_set",
            "keyword_in_title",
            "keyword_in_meta_description",
            "keyword_in_introduction",
            "keyword_in_slug",
            "keyword_density",
        ] {
            let check = analysis.checks.iter().find(|c| c.id == id).unwrap();
            assert!(!check.passed, "{} should fail", id);
        }
        // 100 minus the 40 keyword-dependent points
        assert_eq!(analysis.score, 60);
        assert_eq!(analysis.label, "needs_improvement");
    }

    #[test]
    fn test_meta_title_overrides_title() {
        let input = SeoInput {
            title: "Short",
            meta_title: Some("A meta title that is comfortably long enough"),
            ..Default::default()
        };
        let analysis = analyze_article_seo(&input);
        assert!(analysis.checks[0].passed);
    }

    #[test]
    fn test_keyword_stuffing_fails_density() {
        let content = "cache ".repeat(300);
        let input = SeoInput {
            title: "t",
            focus_keyword: Some("cache"),
            content: &content,
            slug: "cache",
            ..Default::default()
        };
        let analysis = analyze_article_seo(&input);
        let density = analysis.checks.iter().find(|c| c.id == "keyword_density").unwrap();
        assert!(!density.passed);
        assert!(density.message.contains("100.0%"));
    }

    #[test]
    fn test_keyword_counts_whole_words_only() {
        let content = "We trust rusty tools. Rust is fast, and rust-based services stay up.";
        let input = SeoInput {
            title: "Entrusted with rustic charm",
            focus_keyword: Some("rust"),
            content,
            ..Default::default()
        };
        let analysis = analyze_article_seo(&input);
        let title = analysis.checks.iter().find(|c| c.id == "keyword_in_title").unwrap();
        assert!(!title.passed);
        let density = analysis.checks.iter().find(|c| c.id == "keyword_density").unwrap();
        // 2 of 12 words
        assert!(density.message.contains("16.7%"), "{}", density.message);

        let words = tokens("Trust the rust, then trust Rust Caching again");
        assert_eq!(count_phrase(&words, &tokens("rust")), 2);
        assert_eq!(count_phrase(&words, &tokens("rust caching")), 1);
        assert_eq!(count_phrase(&words, &tokens("  ")), 0);
    }

    #[test]
    fn test_slug_format() {
        let long = "a-".repeat(40) + "a";
        for (slug, ok) in [("good-slug", true), ("Bad_Slug", false), ("", false), (long.as_str(), false)] {
            let input = SeoInput {
                slug,
                ..Default::default()
            };
            let analysis = analyze_article_seo(&input);
            assert_eq!(analysis.checks.last().unwrap().passed, ok, "slug {:?}", slug);
        }
    }

    #[test]
    fn test_score_label_boundaries() {
        assert_eq!(score_label(100), "good");
        assert_eq!(score_label(80), "good");
        assert_eq!(score_label(79), "needs_improvement");
        assert_eq!(score_label(50), "needs_improvement");
        assert_eq!(score_label(49), "poor");
        assert_eq!(score_label(0), "poor");
    }

    proptest! {
        #[test]
        fn score_stays_within_bounds(
            title in ".{0,80}",
            meta_title in proptest::option::of(".{0,80}"),
            description in proptest::option::of(".{0,200}"),
            keyword in proptest::option::of("[a-zA-Z ]{0,12}"),
            slug in "[a-zA-Z0-9 -]{0,90}",
            content in ".{0,400}",
            image in proptest::option::of("[a-z/.]{0,10}"),
            alt in proptest::option::of(".{0,10}"),
        ) {
            let input = SeoInput {
                title: &title,
                meta_title: meta_title.as_deref(),
                meta_description: description.as_deref(),
                focus_keyword: keyword.as_deref(),
                slug: &slug,
                content: &content,
                featured_image: image.as_deref(),
                featured_image_alt: alt.as_deref(),
            };
            let analysis = analyze_article_seo(&input);
            prop_assert!((0..=100).contains(&analysis.score));
            let passed: u32 = analysis.checks.iter().filter(|c| c.passed).map(|c| c.weight).sum();
            prop_assert_eq!(analysis.score, passed as i64);
        }
    }
}
