//! Markdown rendering service
//!
//! Converts article bodies to HTML with pulldown-cmark and extracts the
//! structural facts SEO analysis needs (plain text, headings, links).
//!
//! # Example
//!
//! ```
//! use quillpress::services::markdown::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new();
//! let html = renderer.render("# Hello World\n\nThis is **bold** text.");
//! assert!(html.contains("<h1>"));
//! assert!(html.contains("<strong>"));
//! ```

use pulldown_cmark::{html, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Structural summary of a Markdown document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownOutline {
    /// Readable text with markup removed, words separated by spaces
    pub text: String,
    /// Headings of level 2 or deeper
    pub subheadings: usize,
    /// Inline and reference links
    pub links: usize,
}

impl MarkdownOutline {
    /// Number of whitespace-separated words in the text
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Markdown renderer.
///
/// Supports the CommonMark core plus tables, strikethrough, task lists and
/// smart punctuation. Fenced code blocks keep their language as a
/// `language-*` class for client-side highlighting.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        Self { options }
    }

    /// Renders Markdown text to HTML.
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let events = self.process_events(parser);

        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    /// Walks the document once and collects text, subheadings and links.
    pub fn outline(&self, markdown: &str) -> MarkdownOutline {
        let mut outline = MarkdownOutline::default();

        for event in Parser::new_ext(markdown, self.options) {
            match event {
                Event::Start(Tag::Heading { level, .. }) if level != HeadingLevel::H1 => {
                    outline.subheadings += 1;
                }
                Event::Start(Tag::Link { .. }) => outline.links += 1,
                Event::Text(text) | Event::Code(text) => {
                    outline.text.push_str(&text);
                }
                Event::SoftBreak | Event::HardBreak => outline.text.push(' '),
                Event::End(TagEnd::Paragraph)
                | Event::End(TagEnd::Heading(_))
                | Event::End(TagEnd::Item)
                | Event::End(TagEnd::TableCell)
                | Event::End(TagEnd::CodeBlock) => outline.text.push(' '),
                _ => {}
            }
        }

        outline
    }

    /// Replaces code blocks with pre-rendered HTML carrying a language class.
    fn process_events<'a>(&self, parser: Parser<'a>) -> Vec<Event<'a>> {
        let mut events = Vec::new();
        let mut in_code_block = false;
        let mut code_lang: Option<String> = None;
        let mut code_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_content.clear();
                    code_lang = match kind {
                        CodeBlockKind::Fenced(lang) => {
                            // Info strings may carry attributes after the language
                            let lang = lang.split_whitespace().next().unwrap_or("").to_string();
                            (!lang.is_empty()).then_some(lang)
                        }
                        CodeBlockKind::Indented => None,
                    };
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    let block = match code_lang.take() {
                        Some(lang) => format!(
                            "<pre><code class=\"language-{}\">{}</code></pre>\n",
                            html_escape(&lang),
                            html_escape(&code_content)
                        ),
                        None => format!("<pre><code>{}</code></pre>\n", html_escape(&code_content)),
                    };
                    events.push(Event::Html(block.into()));
                }
                Event::Text(text) if in_code_block => {
                    code_content.push_str(&text);
                }
                _ => events.push(event),
            }
        }

        events
    }
}

/// Escapes HTML special characters in a string.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_heading() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("# Title\n\n## Section");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<h2>Section</h2>"));
    }

    #[test]
    fn test_render_inline_formatting() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("**bold** *italic* ~~gone~~ `code`");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("<code>code</code>"));
    }

    #[test]
    fn test_render_link_and_image() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("[Docs](https://example.com) ![Logo](/logo.png)");
        assert!(html.contains("<a href=\"https://example.com\">Docs</a>"));
        assert!(html.contains("<img src=\"/logo.png\" alt=\"Logo\""));
    }

    #[test]
    fn test_render_table() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn test_render_task_list() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("- [x] done\n- [ ] todo");
        assert!(html.contains("checkbox"));
    }

    #[test]
    fn test_render_code_block_with_language() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```rust\nlet x = 1 < 2;\n```");
        assert!(html.contains("<pre><code class=\"language-rust\">let x = 1 &lt; 2;\n</code></pre>"));
    }

    #[test]
    fn test_render_code_block_without_language() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```\n<div>\n```");
        assert!(html.contains("<pre><code>&lt;div&gt;\n</code></pre>"));
    }

    #[test]
    fn test_render_empty_input() {
        assert_eq!(MarkdownRenderer::new().render(""), "");
    }

    #[test]
    fn test_outline_counts_structure() {
        let renderer = MarkdownRenderer::new();
        let outline = renderer.outline(
            "# Title\n\nIntro with a [link](https://example.com).\n\n## Part one\n\nBody text here.\n\n### Deeper\n\n- item one\n- item two",
        );
        assert_eq!(outline.subheadings, 2);
        assert_eq!(outline.links, 1);
        assert!(outline.text.contains("Intro with a link."));
        assert!(!outline.text.contains('#'));
        assert!(!outline.text.contains("https://"));
    }

    #[test]
    fn test_outline_word_count() {
        let renderer = MarkdownRenderer::new();
        let outline = renderer.outline("# One two\n\nthree **four** five\nsix");
        assert_eq!(outline.word_count(), 6);
        assert_eq!(renderer.outline("").word_count(), 0);
    }

    #[test]
    fn test_outline_ignores_h1_only_documents() {
        let outline = MarkdownRenderer::new().outline("# Only a title\n\nText");
        assert_eq!(outline.subheadings, 0);
        assert_eq!(outline.links, 0);
    }

    #[test]
    fn test_html_escape_function() {
        assert_eq!(html_escape("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;");
    }
}
