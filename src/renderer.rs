// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Document rendering for loaded channel histories.
//!
//! This module turns a [`Channel`] into one complete output document,
//! either an HTML page or a plain-text file.
//!
//! # Output Format
//!
//! Both formats contain:
//! - A title naming the project, the channel and the covered date range
//! - One entry per message: sender, posting time, then the message body
//! - Thread replies nested beneath their root message
//!
//! HTML output uses a definition list (`<dl>`), with each reply thread in a
//! nested list. Plain-text output indents message bodies and marks replies
//! with a `|` gutter.
//!
//! # Example
//!
//! ```
//! use slack2doc::archive::{group_threads, Channel};
//! use slack2doc::metadata::Directory;
//! use slack2doc::parser::parse_messages;
//! use slack2doc::renderer::{render_channel, RenderOptions};
//!
//! let messages = parse_messages(r#"[{
//!     "type": "message",
//!     "user": "U1",
//!     "user_profile": {"display_name": "ada"},
//!     "ts": "1609459200.000100",
//!     "text": "Hello!"
//! }]"#).unwrap();
//!
//! let channel = Channel {
//!     name: "general".into(),
//!     dates: vec!["2021-01-01".into()],
//!     threads: group_threads(messages),
//! };
//!
//! let opts = RenderOptions { utc: true, ..Default::default() };
//! let html = render_channel(&channel, &Directory::default(), &opts);
//!
//! assert!(html.contains("<title>Slack archives general 2021-01-01---2021-01-01</title>"));
//! assert!(html.contains("ada  Fri 2021-01-01 12:00AM"));
//! assert!(html.contains("Hello!"));
//! ```

use crate::archive::{Channel, Thread};
use crate::markup::{escape_html, render_body};
use crate::metadata::Directory;
use crate::parser::Message;
use chrono::{DateTime, Local, Utc};
use snafu::prelude::*;
use std::fmt::Write;
use std::str::FromStr;

/// How message times are printed, e.g. `Fri 2021-01-01 09:30AM`.
const TIME_FORMAT: &str = "%a %Y-%m-%d %I:%M%p";

/// Shown when a sender cannot be resolved to a name.
const UNKNOWN_SENDER: &str = "???";

/// Column width of the sender name in plain-text headers.
const NAME_WIDTH: usize = 25;

/// Prefix marking thread replies in plain-text output.
const REPLY_GUTTER: &str = "|   ";

/// Indentation of message bodies in plain-text output.
const BODY_INDENT: &str = "    ";

/// The kind of document to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// An HTML page.
    #[default]
    Html,
    /// A plain-text file.
    Text,
}

impl OutputFormat {
    /// The file extension for documents of this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Text => "txt",
        }
    }
}

/// Error returned when parsing an unknown [`OutputFormat`] name.
#[derive(Debug, Snafu)]
#[snafu(display("unknown output format {name:?} (expected html or text)"))]
pub struct UnknownFormatError {
    name: String,
}

impl FromStr for OutputFormat {
    type Err = UnknownFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(Self::Html),
            "text" | "txt" => Ok(Self::Text),
            _ => UnknownFormatSnafu { name: s }.fail(),
        }
    }
}

/// Configuration options for document rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// The document format.
    pub format: OutputFormat,

    /// Column at which message text is wrapped. 0 disables wrapping.
    ///
    /// Preformatted blocks are never wrapped.
    pub width: usize,

    /// Project name shown at the start of the document title.
    pub project: Option<String>,

    /// Whether to print times in UTC rather than the local time zone.
    pub utc: bool,

    /// Whether to print emoji as Unicode characters instead of `:name:`
    /// codes, where the export records the code points.
    pub unicode_emoji: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Html,
            width: 100,
            project: None,
            utc: false,
            unicode_emoji: false,
        }
    }
}

/// Returns the document title for a channel.
///
/// The title names the project (if any), the channel, and the first and
/// last dates of the history.
#[must_use]
pub fn title(channel: &Channel, opts: &RenderOptions) -> String {
    let span = match (channel.dates.first(), channel.dates.last()) {
        (Some(first), Some(last)) => format!(" {first}---{last}"),
        _ => String::new(),
    };
    match &opts.project {
        Some(project) => format!("{project} slack archives {}{span}", channel.name),
        None => format!("Slack archives {}{span}", channel.name),
    }
}

/// Renders a channel history as a complete document.
///
/// This is the main entry point for rendering.
///
/// # Arguments
///
/// * `channel` - The loaded channel history
/// * `directory` - Workspace metadata used to resolve names
/// * `opts` - Configuration options controlling the output
///
/// # Returns
///
/// A `String` containing the whole document.
#[must_use]
pub fn render_channel(channel: &Channel, directory: &Directory, opts: &RenderOptions) -> String {
    let doc = Document { directory, opts };
    match opts.format {
        OutputFormat::Html => doc.html(channel),
        OutputFormat::Text => doc.text(channel),
    }
}

/// Formats a message time using the configured time zone.
#[must_use]
pub fn format_time(date: DateTime<Utc>, utc: bool) -> String {
    if utc {
        date.format(TIME_FORMAT).to_string()
    } else {
        date.with_timezone(&Local).format(TIME_FORMAT).to_string()
    }
}

struct Document<'a> {
    directory: &'a Directory,
    opts: &'a RenderOptions,
}

impl Document<'_> {
    fn html(&self, channel: &Channel) -> String {
        let title = escape_html(&title(channel, self.opts));
        let mut out = String::new();

        writeln!(out, "<!DOCTYPE html>").unwrap();
        writeln!(out, "<html>\n<head>").unwrap();
        writeln!(out, "  <meta charset=\"utf-8\">").unwrap();
        writeln!(out, "  <title>{title}</title>").unwrap();
        writeln!(out, "</head>\n<body>\n<h3>{title}</h3>\n\n<dl>").unwrap();

        for thread in &channel.threads {
            self.html_thread(&mut out, thread);
            out.push('\n');
        }

        writeln!(out, "</dl>\n</body>\n</html>").unwrap();
        out
    }

    fn html_thread(&self, out: &mut String, thread: &Thread) {
        self.html_message(out, &thread.root);
        if thread.replies.is_empty() {
            return;
        }

        writeln!(out, "<dt></dt><dd><dl>").unwrap();
        for reply in &thread.replies {
            self.html_message(out, reply);
        }
        writeln!(out, "</dl></dd>").unwrap();
    }

    fn html_message(&self, out: &mut String, message: &Message) {
        out.push_str("<dt>");
        if let Some(url) = self.sender_image(message) {
            write!(
                out,
                "<img width=\"16\" height=\"16\" src=\"{}\" alt=\"\"> ",
                escape_html(url)
            )
            .unwrap();
        }
        writeln!(
            out,
            "{}  {}</dt>",
            escape_html(self.sender_name(message)),
            format_time(message.date, self.opts.utc)
        )
        .unwrap();

        let body = render_body(message, self.directory, self.opts);
        if body.is_empty() {
            writeln!(out, "<dd></dd>").unwrap();
        } else {
            writeln!(out, "<dd>\n{body}\n</dd>").unwrap();
        }
    }

    fn text(&self, channel: &Channel) -> String {
        let title = title(channel, self.opts);
        let mut out = String::new();

        writeln!(out, "{title}").unwrap();
        writeln!(out, "{}\n", "=".repeat(title.chars().count())).unwrap();

        for thread in &channel.threads {
            out.push_str(&self.text_message(&thread.root));
            for reply in &thread.replies {
                out.push('\n');
                for line in self.text_message(reply).lines() {
                    writeln!(out, "{}", format!("{REPLY_GUTTER}{line}").trim_end()).unwrap();
                }
            }
            out.push('\n');
        }

        out
    }

    /// Renders one message as a header line plus indented body lines.
    fn text_message(&self, message: &Message) -> String {
        let mut out = String::new();
        writeln!(
            out,
            "{:<width$}  {}",
            self.sender_name(message),
            format_time(message.date, self.opts.utc),
            width = NAME_WIDTH
        )
        .unwrap();

        let body = render_body(message, self.directory, self.opts);
        for line in body.lines() {
            if line.is_empty() {
                out.push('\n');
            } else {
                writeln!(out, "{BODY_INDENT}{line}").unwrap();
            }
        }
        out
    }

    fn sender_name<'m>(&'m self, message: &'m Message) -> &'m str {
        message
            .sender
            .name
            .as_deref()
            .or_else(|| self.directory.user_name(&message.sender.id))
            .unwrap_or(UNKNOWN_SENDER)
    }

    fn sender_image<'m>(&'m self, message: &'m Message) -> Option<&'m str> {
        message.sender.image_url.as_deref().or_else(|| {
            self.directory
                .user(&message.sender.id)?
                .image_url
                .as_deref()
        })
    }
}
