//! Markdown to Anki HTML conversion for card fields.
//!
//! Models often answer with light Markdown (`**bold**`, lists, inline code).
//! Anki renders HTML, so fields that look like Markdown are converted before
//! they are stored. Fields that already contain HTML or plain prose are left
//! alone.

use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser, Tag, html};

/// Convert a field to Anki HTML if it looks like Markdown.
pub fn render_field(text: &str) -> String {
    if looks_like_html(text) || !looks_like_markdown(text) {
        return text.to_string();
    }
    markdown_to_html(text)
}

/// Convert Markdown to HTML.
///
/// A single paragraph is unwrapped; multiple paragraphs are joined with
/// `<br><br>`.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let source = protect_latex(markdown, options);
    let parser = Parser::new_ext(&source, options);

    let mut output = String::new();
    html::push_html(&mut output, parser);
    let output = output.trim();

    if let Some(inner) = output
        .strip_prefix("<p>")
        .and_then(|rest| rest.strip_suffix("</p>"))
    {
        if !inner.contains("<p>") {
            return inner.to_string();
        }
    }

    output
        .replace("</p>\n<p>", "<br><br>")
        .replace("<p>", "")
        .replace("</p>", "")
}

/// Whether a string contains HTML tags.
pub fn looks_like_html(s: &str) -> bool {
    let Some(open) = s.find('<') else {
        return false;
    };
    s[open..]
        .chars()
        .nth(1)
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '/')
        && s[open..].contains('>')
}

/// Whether a string contains common Markdown syntax.
pub fn looks_like_markdown(s: &str) -> bool {
    s.contains("**")
        || s.contains("__")
        || s.contains('`')
        || s.contains("~~")
        || s.contains("](")
        || s.lines().any(|line| {
            let line = line.trim_start();
            line.starts_with("- ")
                || line.starts_with("* ")
                || line.starts_with('#')
                || line
                    .split_once(". ")
                    .is_some_and(|(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        })
        || is_emphasis(s)
}

fn is_emphasis(s: &str) -> bool {
    let parts: Vec<&str> = s.split('*').collect();
    parts.len() >= 3
        && parts[1..parts.len() - 1]
            .iter()
            .any(|inner| !inner.is_empty() && !inner.starts_with(' ') && !inner.ends_with(' '))
}

/// Double the backslash of MathJax delimiters (`\(`, `\)`, `\[`, `\]`) so
/// Markdown does not consume it as an escape. Code spans and blocks keep
/// backslashes literally and are left untouched.
fn protect_latex(markdown: &str, options: Options) -> String {
    let code: Vec<Range<usize>> = Parser::new_ext(markdown, options)
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Code(_) | Event::Start(Tag::CodeBlock(_)) => Some(range),
            _ => None,
        })
        .collect();

    let mut out = String::with_capacity(markdown.len());
    let mut chars = markdown.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        out.push(c);
        if c == '\\'
            && matches!(chars.peek(), Some((_, '(' | ')' | '[' | ']')))
            && !code.iter().any(|r| r.contains(&i))
        {
            out.push('\\');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_to_html_bold() {
        assert_eq!(markdown_to_html("**bold text**"), "<strong>bold text</strong>");
    }

    #[test]
    fn test_markdown_to_html_list() {
        let html = markdown_to_html("- item 1\n- item 2");
        assert!(html.contains("<li>item 1</li>"));
        assert!(html.contains("<li>item 2</li>"));
    }

    #[test]
    fn test_paragraphs_joined_with_breaks() {
        assert_eq!(
            markdown_to_html("first *one*\n\nsecond"),
            "first <em>one</em><br><br>second"
        );
    }

    #[test]
    fn test_latex_delimiters_survive() {
        let html = markdown_to_html("**Area**: \\(\\pi r^2\\)");
        assert!(html.contains("<strong>Area</strong>"));
        assert!(html.contains("\\(\\pi r^2\\)"));
    }

    #[test]
    fn test_latex_delimiters_in_inline_code_untouched() {
        assert_eq!(
            markdown_to_html("Use `\\(x\\)` in code"),
            "Use <code>\\(x\\)</code> in code"
        );
        assert_eq!(
            markdown_to_html("`\\[a\\]` renders as \\[a\\]"),
            "<code>\\[a\\]</code> renders as \\[a\\]"
        );
    }

    #[test]
    fn test_latex_delimiters_in_fenced_code_untouched() {
        let html = markdown_to_html("```\nlet y = \\(x\\)\n```");
        assert_eq!(html, "<pre><code>let y = \\(x\\)\n</code></pre>");
        assert!(!html.contains("\\\\("));
    }

    #[test]
    fn test_render_field_leaves_plain_text() {
        assert_eq!(render_field("What is 2 * 3?"), "What is 2 * 3?");
        assert_eq!(render_field("Is 1 < 2?"), "Is 1 < 2?");
    }

    #[test]
    fn test_render_field_leaves_html() {
        assert_eq!(render_field("<b>**kept**</b>"), "<b>**kept**</b>");
    }

    #[test]
    fn test_render_field_converts_inline_code() {
        assert_eq!(
            render_field("Use `Vec::new()`"),
            "Use <code>Vec::new()</code>"
        );
    }

    #[test]
    fn test_looks_like_markdown() {
        assert!(looks_like_markdown("1. first\n2. second"));
        assert!(looks_like_markdown("*emphasis*"));
        assert!(!looks_like_markdown("Version 1.2 of the manual"));
        assert!(!looks_like_markdown("a * b * c"));
    }
}
