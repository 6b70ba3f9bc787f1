// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Rich-text to markup conversion for a single message body.
//!
//! Slack's block structure is walked element by element and turned into
//! either HTML fragments or plain text, depending on the
//! [`OutputFormat`]. Mentions are resolved through the workspace
//! [`Directory`]; unresolvable ids are shown raw.
//!
//! Paragraphs are wrapped to the configured width. Preformatted blocks are
//! left exactly as written.

use crate::metadata::Directory;
use crate::parser::{Attachment, Block, Inline, Message, RichTextElement, Style};
use crate::renderer::{OutputFormat, RenderOptions};
use std::borrow::Cow;
use tracing::debug;

/// Renders the content of a message.
///
/// The result has no trailing newline. For [`OutputFormat::Text`] the lines
/// are unindented; the document writer indents them.
///
/// # Example
///
/// ```
/// use slack2doc::markup::render_body;
/// use slack2doc::metadata::Directory;
/// use slack2doc::parser::parse_messages;
/// use slack2doc::renderer::RenderOptions;
///
/// let messages = parse_messages(
///     r#"[{"type": "message", "user": "U1", "ts": "1.0", "text": "a &lt;b&gt; &amp; c"}]"#,
/// ).unwrap();
///
/// let html = render_body(&messages[0], &Directory::default(), &RenderOptions::default());
/// assert_eq!(html, "a &lt;b&gt; &amp; c");
/// ```
#[must_use]
pub fn render_body(message: &Message, directory: &Directory, opts: &RenderOptions) -> String {
    let renderer = BodyRenderer { directory, opts };
    let mut chunks = Vec::new();

    for block in &message.blocks {
        match block {
            Block::RichText(elements) => {
                for element in elements {
                    if let Some(chunk) = renderer.element(element) {
                        chunks.push(chunk);
                    }
                }
            }
            Block::Text(inlines) => chunks.push(renderer.paragraph(&renderer.inlines(inlines))),
            Block::Other => debug!(ts = %message.ts, "skipping non-text block"),
        }
    }

    for file in &message.files {
        chunks.push(renderer.attachment(file));
    }

    chunks.join("\n")
}

struct BodyRenderer<'a> {
    directory: &'a Directory,
    opts: &'a RenderOptions,
}

impl BodyRenderer<'_> {
    const fn format(&self) -> OutputFormat {
        self.opts.format
    }

    /// Width left for text after a prefix of `used` columns. Zero stays zero.
    const fn inner_width(&self, used: usize) -> usize {
        if self.opts.width == 0 {
            0
        } else {
            let width = self.opts.width.saturating_sub(used);
            if width == 0 { 1 } else { width }
        }
    }

    fn element(&self, element: &RichTextElement) -> Option<String> {
        match element {
            RichTextElement::Section(inlines) => Some(self.paragraph(&self.inlines(inlines))),
            RichTextElement::Preformatted(inlines) => {
                let code: String = inlines.iter().map(|i| self.inline(i, true)).collect();
                Some(match self.format() {
                    OutputFormat::Html => format!("<pre>{code}</pre>"),
                    OutputFormat::Text => format!("```\n{code}\n```"),
                })
            }
            RichTextElement::Quote(inlines) => {
                let text = self.inlines(inlines);
                Some(match self.format() {
                    OutputFormat::Html => {
                        format!("<blockquote>{}</blockquote>", self.paragraph(&text))
                    }
                    OutputFormat::Text => {
                        prefix_lines(&wrap_all(&text, self.inner_width(2)), "> ", "> ")
                    }
                })
            }
            RichTextElement::List {
                ordered,
                indent,
                items,
            } => Some(self.list(*ordered, *indent, items)),
            RichTextElement::Other => {
                debug!("skipping unknown rich text element");
                None
            }
        }
    }

    fn list(&self, ordered: bool, indent: u8, items: &[Vec<Inline>]) -> String {
        match self.format() {
            OutputFormat::Html => {
                let tag = if ordered { "ol" } else { "ul" };
                let mut out = if indent == 0 {
                    format!("<{tag}>\n")
                } else {
                    format!("<{tag} style=\"margin-left: {}em\">\n", u32::from(indent) * 2)
                };
                for item in items {
                    out.push_str("<li>");
                    out.push_str(&self.paragraph(&self.inlines(item)));
                    out.push_str("</li>\n");
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
                out
            }
            OutputFormat::Text => {
                let pad = "  ".repeat(usize::from(indent));
                let mut lines = Vec::new();
                for (n, item) in items.iter().enumerate() {
                    let marker = if ordered {
                        format!("{pad}{}. ", n + 1)
                    } else {
                        format!("{pad}• ")
                    };
                    let hanging = " ".repeat(marker.chars().count());
                    let text = wrap_all(&self.inlines(item), self.inner_width(hanging.len()));
                    lines.push(prefix_lines(&text, &marker, &hanging));
                }
                lines.join("\n")
            }
        }
    }

    fn attachment(&self, file: &Attachment) -> String {
        let name = self.escape(&file.name);
        match (self.format(), &file.url) {
            (OutputFormat::Html, Some(url)) => {
                format!("[file: <a href='{}'>{name}</a>]", escape_html(url))
            }
            (OutputFormat::Text, Some(url)) => format!("[file: {name} <{url}>]"),
            (_, None) => format!("[file: {name}]"),
        }
    }

    /// Wraps rendered inline text, keeping its own line breaks.
    fn paragraph(&self, text: &str) -> String {
        let wrapped: Vec<String> = text
            .split('\n')
            .map(|line| wrap(line, self.opts.width).join("\n"))
            .collect();
        match self.format() {
            OutputFormat::Html => wrapped.join("<br>\n"),
            OutputFormat::Text => wrapped.join("\n"),
        }
    }

    fn inlines(&self, inlines: &[Inline]) -> String {
        inlines.iter().map(|i| self.inline(i, false)).collect()
    }

    fn inline(&self, inline: &Inline, preformatted: bool) -> String {
        match inline {
            Inline::Text { text, style } => {
                let text = normalize_typography(text);
                if preformatted {
                    self.escape(&text).into_owned()
                } else {
                    self.styled(&text, *style)
                }
            }
            Inline::Channel { id } => {
                let name = self.directory.channel_name(id).unwrap_or(id);
                format!("#{}", self.escape(name))
            }
            Inline::Emoji { name, unicode } => unicode
                .as_deref()
                .filter(|_| self.opts.unicode_emoji)
                .and_then(emoji_from_code_points)
                .unwrap_or_else(|| format!(":{name}:")),
            Inline::Link { url, text, style } => {
                let label = text.as_deref().unwrap_or(url);
                match self.format() {
                    OutputFormat::Html => format!(
                        "<a href='{}'>{}</a>",
                        escape_html(url),
                        self.styled(&normalize_typography(label), *style)
                    ),
                    OutputFormat::Text if label == url.as_str() => url.clone(),
                    OutputFormat::Text => format!(
                        "{} <{url}>",
                        self.styled(&normalize_typography(label), *style)
                    ),
                }
            }
            Inline::User { id } => {
                let name = self.directory.user_name(id).unwrap_or(id);
                format!("@{}", self.escape(name))
            }
            Inline::Usergroup { id } => format!("@{}", self.escape(id)),
            Inline::Broadcast { range } => format!("@{}", self.escape(range)),
            Inline::Other => {
                debug!("skipping unknown inline element");
                String::new()
            }
        }
    }

    /// Applies a run's formatting, keeping surrounding whitespace outside
    /// the markers.
    fn styled(&self, text: &str, style: Style) -> String {
        let core = text.trim();
        if core.is_empty() || style == Style::default() {
            return self.escape(text).into_owned();
        }
        let lead = &text[..text.len() - text.trim_start().len()];
        let trail = &text[text.trim_end().len()..];

        let mut out = self.escape(core).into_owned();
        let markers: [(bool, &str, &str, &str); 4] = [
            (style.code, "<code>", "</code>", "`"),
            (style.strike, "<s>", "</s>", "~"),
            (style.italic, "<i>", "</i>", "_"),
            (style.bold, "<b>", "</b>", "*"),
        ];
        for (enabled, open, close, text_marker) in markers {
            if enabled {
                out = match self.format() {
                    OutputFormat::Html => format!("{open}{out}{close}"),
                    OutputFormat::Text => format!("{text_marker}{out}{text_marker}"),
                };
            }
        }
        format!("{lead}{out}{trail}")
    }

    fn escape<'s>(&self, s: &'s str) -> Cow<'s, str> {
        match self.format() {
            OutputFormat::Html => Cow::Owned(escape_html(s)),
            OutputFormat::Text => Cow::Borrowed(s),
        }
    }
}

/// Wraps every line of `text`, returning the wrapped lines.
fn wrap_all(text: &str, width: usize) -> Vec<String> {
    text.split('\n').flat_map(|line| wrap(line, width)).collect()
}

/// Prefixes the first line with `first` and the rest with `rest`.
fn prefix_lines(lines: &[String], first: &str, rest: &str) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let prefix = if i == 0 { first } else { rest };
            format!("{prefix}{line}").trim_end().to_owned()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Converts hyphen-separated hex code points (`1f44d-1f3fb`) to a string.
fn emoji_from_code_points(code_points: &str) -> Option<String> {
    code_points
        .split('-')
        .map(|hex| u32::from_str_radix(hex, 16).ok().and_then(char::from_u32))
        .collect()
}

/// Wraps a single line of text to `width` columns.
///
/// Words are separated by runs of whitespace and packed greedily; a word
/// longer than `width` gets a line of its own. Lines already within the
/// width are returned unchanged. A `width` of 0 disables wrapping.
///
/// # Example
///
/// ```
/// use slack2doc::markup::wrap;
///
/// assert_eq!(wrap("the quick brown fox", 10), ["the quick", "brown fox"]);
/// ```
#[must_use]
pub fn wrap(line: &str, width: usize) -> Vec<String> {
    if width == 0 || line.chars().count() <= width {
        return vec![line.to_owned()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in line.split_whitespace() {
        let len = word.chars().count();
        if current_len > 0 && current_len + 1 + len > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += len;
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Escapes the characters that are significant in HTML text and attributes.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Replaces typographic punctuation with plain ASCII equivalents.
#[must_use]
pub fn normalize_typography(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201c}' | '\u{201d}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{a0}' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}
