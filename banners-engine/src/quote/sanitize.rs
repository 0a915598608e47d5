//! Quote markup -> display HTML, as an ordered list of pure text steps.
//!
//! Structural stripping runs before emphasis conversion, so markers inside
//! removed property lines are never turned into tags. Block text is
//! HTML-escaped before any tags are introduced; only the tags emitted by
//! later steps reach the page as markup.

use regex::Regex;
use std::sync::LazyLock;
use strum::{AsRefStr, EnumIter, IntoEnumIterator};

static LOGBOOK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?ms)^[ \t]*:LOGBOOK:.*?:END:[ \t]*\n?").unwrap());
static PROPERTY_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[\w-]+::.*(\n|$)").unwrap());
static SCHEDULING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(SCHEDULED|DEADLINE):[ \t]*<[^>\n]*>[ \t]*(\n|$)").unwrap());
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]\n]*\]\([^)\n]*\)").unwrap());
static BRACKET_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\[\[[^\]\n]+\]\]").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#[^\s#\[\]]+").unwrap());

/// (pattern, replacement), bold before italic.
static EMPHASIS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\*\*([^\n]+?)\*\*", "<b>$1</b>"),
        (r"\b__([^\n]+?)__\b", "<b>$1</b>"),
        (r"~~([^\n]+?)~~", "<s>$1</s>"),
        (r"==([^\n]+?)==", "<mark>$1</mark>"),
        (r"\^\^([^\n]+?)\^\^", "<mark>$1</mark>"),
        (r"`([^`\n]+)`", "<code>$1</code>"),
        (r"\*([^*\n]+?)\*", "<i>$1</i>"),
        (r"\b_([^_\n]+?)_\b", "<i>$1</i>"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

static WIKI_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[([^\]\n]+)\]\]").unwrap());
static MD_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]\n]+)\]\([^)\n]*\)").unwrap());
static NEWLINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, AsRefStr)]
pub enum SanitizeStep {
    CleanupBefore,
    StripTag,
    StripMetadata,
    EscapeHtml,
    Emphasis,
    UnwrapLinks,
    LineBreaks,
    CleanupAfter,
}

pub struct QuoteSanitizer {
    tag_re: Option<Regex>,
    before: Vec<Regex>,
    after: Vec<Regex>,
}

fn compile_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter(|p| !p.is_empty())
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                log::warn!("[QUOTE] Skipping invalid cleanup pattern '{}': {}", p, e);
                None
            }
        })
        .collect()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn remove_all(re: &Regex, text: &str) -> String {
    re.replace_all(text, "").trim().to_string()
}

impl QuoteSanitizer {
    /// `tag` without the leading `#`.
    pub fn new(tag: &str, before: &[String], after: &[String]) -> Self {
        let tag = tag.trim().trim_start_matches('#');
        let tag_re = if tag.is_empty() {
            None
        } else {
            let escaped = regex::escape(tag);
            Regex::new(&format!(r"(?i)#\[\[{escaped}\]\]|#{escaped}\b")).ok()
        };

        Self {
            tag_re,
            before: compile_patterns(before),
            after: compile_patterns(after),
        }
    }

    pub fn apply(&self, step: SanitizeStep, text: &str) -> String {
        match step {
            SanitizeStep::CleanupBefore => self.before.iter().fold(text.to_string(), |t, re| remove_all(re, &t)),
            SanitizeStep::StripTag => match &self.tag_re {
                Some(re) => remove_all(re, text),
                None => text.to_string(),
            },
            SanitizeStep::StripMetadata => [
                &*LOGBOOK_RE,
                &*PROPERTY_LINE_RE,
                &*SCHEDULING_RE,
                &*IMAGE_RE,
                &*BRACKET_TAG_RE,
                &*TAG_RE,
            ]
            .into_iter()
            .fold(text.to_string(), |t, re| remove_all(re, &t)),
            SanitizeStep::EscapeHtml => escape_html(text),
            SanitizeStep::Emphasis => EMPHASIS
                .iter()
                .fold(text.to_string(), |t, (re, replacement)| re.replace_all(&t, *replacement).into_owned()),
            SanitizeStep::UnwrapLinks => {
                let text = WIKI_LINK_RE.replace_all(text, "$1");
                MD_LINK_RE.replace_all(&text, "$1").into_owned()
            }
            SanitizeStep::LineBreaks => NEWLINE_RE.replace_all(text.trim(), "<br/>").into_owned(),
            SanitizeStep::CleanupAfter => self.after.iter().fold(text.to_string(), |t, re| remove_all(re, &t)),
        }
    }

    pub fn sanitize_with(&self, steps: &[SanitizeStep], text: &str) -> String {
        steps.iter().fold(text.to_string(), |t, step| self.apply(*step, &t))
    }

    pub fn sanitize(&self, text: &str) -> String {
        SanitizeStep::iter().fold(text.to_string(), |t, step| self.apply(step, &t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> QuoteSanitizer {
        QuoteSanitizer::new("quote", &[], &[])
    }

    #[test]
    fn test_property_line_removed_before_emphasis() {
        assert_eq!(sanitizer().sanitize("tag:: #quote\n**bold**"), "<b>bold</b>");
    }

    #[test]
    fn test_step_order_matters() {
        let s = sanitizer();
        let text = "tag:: #quote\n**bold**";
        let line_breaks_first = [
            SanitizeStep::StripTag,
            SanitizeStep::LineBreaks,
            SanitizeStep::StripMetadata,
            SanitizeStep::Emphasis,
        ];
        assert_ne!(s.sanitize_with(&line_breaks_first, text), s.sanitize(text));
    }

    #[test]
    fn test_strips_tag_case_insensitively() {
        let s = sanitizer();
        assert_eq!(s.apply(SanitizeStep::StripTag, "Be kind #Quote"), "Be kind");
        assert_eq!(s.apply(SanitizeStep::StripTag, "Be kind #[[quote]]"), "Be kind");
        assert_eq!(s.apply(SanitizeStep::StripTag, "#quotes stay"), "#quotes stay");
    }

    #[test]
    fn test_strips_metadata() {
        let s = sanitizer();
        let text = "Stay hungry #life #[[big ideas]] ![img](../assets/a.png)\nSCHEDULED: <2026-10-19 Mon>\n:LOGBOOK:\nCLOCK: [2026-10-19]\n:END:\nauthor:: Jobs";
        assert_eq!(s.apply(SanitizeStep::StripMetadata, text), "Stay hungry");
    }

    #[test]
    fn test_emphasis() {
        let s = sanitizer();
        assert_eq!(
            s.apply(SanitizeStep::Emphasis, "**a** *b* ~~c~~ ==d== ^^e^^ `f` _g_ __h__"),
            "<b>a</b> <i>b</i> <s>c</s> <mark>d</mark> <mark>e</mark> <code>f</code> <i>g</i> <b>h</b>"
        );
        assert_eq!(s.apply(SanitizeStep::Emphasis, "snake_case_name"), "snake_case_name");
    }

    #[test]
    fn test_block_markup_is_escaped() {
        let s = sanitizer();
        assert_eq!(
            s.sanitize("<img src=x onerror=alert(1)> **R&D** #quote"),
            "&lt;img src=x onerror=alert(1)&gt; <b>R&amp;D</b>"
        );
        assert_eq!(s.sanitize("SCHEDULED: <2026-10-19 Mon>\na < b"), "a &lt; b");
    }

    #[test]
    fn test_unwrap_links_and_breaks() {
        let s = sanitizer();
        assert_eq!(
            s.sanitize("[[Seneca]] said\n[this](https://example.com)"),
            "Seneca said<br/>this"
        );
    }

    #[test]
    fn test_user_patterns_run_first_and_last() {
        let s = QuoteSanitizer::new("quote", &["^Q: ".to_string(), "[".to_string()], &["~.*$".to_string()]);
        assert_eq!(s.sanitize("Q: **Hello** #quote ~ Anon"), "<b>Hello</b>");
    }

    #[test]
    fn test_unresolved_reference_left_alone() {
        let token = "((6530b2a4-0d9b-4a4e-9a8e-1c2d3e4f5a6b))";
        assert_eq!(sanitizer().sanitize(token), token);
    }
}
