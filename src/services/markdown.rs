//! Markdown rendering service
//!
//! Converts a post's `original_content` into the HTML stored in
//! `format_content`. Parsing is done by pulldown-cmark; fenced code blocks
//! with a known language are highlighted by syntect.
//!
//! # Example
//!
//! ```
//! use postdesk::services::markdown::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new();
//! let html = renderer.render("# Hello World\n\nThis is **bold** text.");
//! assert!(html.contains("<h1>"));
//! assert!(html.contains("<strong>"));
//! ```

use once_cell::sync::Lazy;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::config::MarkdownConfig;

/// Theme used when the configured one is unknown
pub const DEFAULT_CODE_THEME: &str = "base16-ocean.dark";

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

/// Markdown to HTML renderer with code highlighting.
///
/// Enabled extensions: tables, strikethrough, task lists and smart
/// punctuation. Syntax definitions and themes are loaded once per process
/// and shared by every renderer, so cloning is cheap.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    theme_name: String,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_CODE_THEME)
    }

    /// Use the named syntect theme, falling back to `DEFAULT_CODE_THEME`
    /// when it is not bundled.
    pub fn with_theme(theme_name: &str) -> Self {
        let theme_name = if THEME_SET.themes.contains_key(theme_name) {
            theme_name.to_string()
        } else {
            tracing::warn!(
                "Unknown code theme '{}', using {}",
                theme_name,
                DEFAULT_CODE_THEME
            );
            DEFAULT_CODE_THEME.to_string()
        };

        Self { theme_name }
    }

    pub fn from_config(config: &MarkdownConfig) -> Self {
        Self::with_theme(&config.code_theme)
    }

    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);

        let mut output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(
            &mut output,
            self.highlight_code_blocks(Parser::new_ext(markdown, options))
                .into_iter(),
        );
        output
    }

    /// Replace each code block's events with a single pre-rendered HTML event
    fn highlight_code_blocks<'a>(&self, parser: Parser<'a>) -> Vec<Event<'a>> {
        let mut events = Vec::new();
        // (language, collected source) of the code block being read
        let mut block: Option<(Option<String>, String)> = None;

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    block = Some((lang, String::new()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, source)) = block.take() {
                        let rendered = match lang {
                            Some(lang) => self.highlight(&source, &lang),
                            None => code_block(&source, None),
                        };
                        events.push(Event::Html(CowStr::from(rendered)));
                    }
                }
                Event::Text(text) => match block.as_mut() {
                    Some((_, source)) => source.push_str(&text),
                    None => events.push(Event::Text(text)),
                },
                event => events.push(event),
            }
        }

        events
    }

    fn highlight(&self, source: &str, lang: &str) -> String {
        let syntax = SYNTAX_SET
            .find_syntax_by_token(lang)
            .or_else(|| SYNTAX_SET.find_syntax_by_extension(lang));
        let Some(syntax) = syntax else {
            return code_block(source, Some(lang));
        };

        THEME_SET
            .themes
            .get(&self.theme_name)
            .and_then(|theme| {
                highlighted_html_for_string(source, &SYNTAX_SET, syntax, theme).ok()
            })
            .unwrap_or_else(|| code_block(source, None))
    }
}

/// Unhighlighted `<pre><code>` block
fn code_block(source: &str, lang: Option<&str>) -> String {
    match lang {
        Some(lang) => format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            escape_html(lang),
            escape_html(source)
        ),
        None => format!("<pre><code>{}</code></pre>", escape_html(source)),
    }
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_theme() {
        assert_eq!(MarkdownRenderer::new().theme_name(), DEFAULT_CODE_THEME);
        assert_eq!(MarkdownRenderer::default().theme_name(), DEFAULT_CODE_THEME);
    }

    #[test]
    fn test_with_valid_theme() {
        let renderer = MarkdownRenderer::with_theme("InspiredGitHub");
        assert_eq!(renderer.theme_name(), "InspiredGitHub");
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let renderer = MarkdownRenderer::with_theme("nonexistent-theme");
        assert_eq!(renderer.theme_name(), DEFAULT_CODE_THEME);
    }

    #[test]
    fn test_from_config() {
        let config = MarkdownConfig {
            code_theme: "Solarized (dark)".to_string(),
        };
        assert_eq!(
            MarkdownRenderer::from_config(&config).theme_name(),
            "Solarized (dark)"
        );
    }

    #[test]
    fn test_render_basic_markup() {
        let html = MarkdownRenderer::new().render("# Title\n\nSome **bold** and *italic* text.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
    }

    #[test]
    fn test_render_extensions() {
        let renderer = MarkdownRenderer::new();

        let html = renderer.render("| A | B |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>"));

        let html = renderer.render("~~gone~~");
        assert!(html.contains("<del>gone</del>"));

        let html = renderer.render("- [x] Done\n- [ ] Todo");
        assert!(html.contains("type=\"checkbox\""));
        assert!(html.contains("checked"));
    }

    #[test]
    fn test_render_link() {
        let html = MarkdownRenderer::new().render("[Example](https://example.com)");
        assert!(html.contains("<a href=\"https://example.com\">Example</a>"));
    }

    #[test]
    fn test_code_block_without_language() {
        let html = MarkdownRenderer::new().render("```\nlet x = 1;\n```");
        assert!(html.contains("<pre><code>let x = 1;\n</code></pre>"));
    }

    #[test]
    fn test_indented_code_block() {
        let html = MarkdownRenderer::new().render("Intro\n\n    indented();\n");
        assert!(html.contains("<pre><code>indented();"));
    }

    #[test]
    fn test_code_block_with_known_language_is_highlighted() {
        let html = MarkdownRenderer::new()
            .render("```rust\nfn main() {\n    println!(\"Hello\");\n}\n```");
        assert!(html.contains("<pre"));
        assert!(html.contains("style="));
    }

    #[test]
    fn test_code_block_with_unknown_language() {
        let html = MarkdownRenderer::new().render("```unknownlang\nsome code\n```");
        assert!(html.contains("<pre><code class=\"language-unknownlang\">some code"));
    }

    #[test]
    fn test_code_is_escaped() {
        let html = MarkdownRenderer::new().render("```\n<script>alert('xss')</script>\n```");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;"));
    }

    #[test]
    fn test_render_empty_input() {
        assert!(MarkdownRenderer::new().render("").is_empty());
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = MarkdownRenderer::new();
        let source = "## Notes\n\n```python\nprint('hi')\n```\n";
        assert_eq!(renderer.render(source), renderer.clone().render(source));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<>&\"'"), "&lt;&gt;&amp;&quot;&#x27;");
        assert_eq!(escape_html("plain"), "plain");
    }
}
