// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! JSON parsing for Slack message-dump files.
//!
//! Each channel directory of a Slack export holds one file per day, named
//! `YYYY-MM-DD.json`, containing a JSON array of message records. This
//! module turns those records into typed [`Message`] values.
//!
//! # Format Overview
//!
//! A message record carries:
//! - `ts`, the message timestamp (seconds since the epoch as a decimal string)
//! - `thread_ts`, shared by every message in a thread
//! - the sender, either `user` plus an optional `user_profile`, or `bot_id`
//!   and `username` for bot messages
//! - `blocks`, Slack's nested rich-text structure, and `text`, a flat
//!   "mrkdwn" rendition used when no blocks are present
//!
//! # Example
//!
//! ```
//! use slack2doc::parser::{parse_messages, Block};
//!
//! let json = r#"[{
//!     "type": "message",
//!     "user": "U01",
//!     "ts": "1609459200.000100",
//!     "text": "Happy new year <@U02>!"
//! }]"#;
//!
//! let messages = parse_messages(json).unwrap();
//! assert_eq!(messages.len(), 1);
//! assert!(matches!(messages[0].blocks[0], Block::RichText(_)));
//! ```

use crate::metadata::Profile;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use snafu::prelude::*;

/// Error type for message-file parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Failed to parse JSON content.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },

    /// A record that is not a message appeared in a message file.
    #[snafu(display("unexpected record type {kind:?}"))]
    UnexpectedType {
        /// The `type` field of the offending record.
        kind: String,
    },

    /// A message timestamp is not a decimal number of seconds.
    #[snafu(display("invalid message timestamp {ts:?}"))]
    InvalidTimestamp {
        /// The offending `ts` value.
        ts: String,
    },
}

/// A single message from a channel's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The Slack timestamp, which doubles as the message id.
    pub ts: String,

    /// The timestamp of the thread root, for messages that belong to a thread.
    ///
    /// The root itself carries its own `ts` here.
    pub thread_ts: Option<String>,

    /// When the message was posted.
    pub date: DateTime<Utc>,

    /// The message subtype (e.g. `bot_message`, `channel_join`).
    pub subtype: Option<String>,

    /// Who posted the message.
    pub sender: Sender,

    /// The formatted content of the message.
    pub blocks: Vec<Block>,

    /// Files uploaded with the message.
    pub files: Vec<Attachment>,
}

/// The author of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sender {
    /// The user id, or the bot id for bot messages.
    pub id: String,

    /// The name embedded in the message itself, if any.
    ///
    /// When `None`, the name is looked up in the user directory.
    pub name: Option<String>,

    /// The avatar URL embedded in the message itself, if any.
    pub image_url: Option<String>,
}

/// A top-level block of message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A `rich_text` block: the structure Slack clients produce for user input.
    RichText(Vec<RichTextElement>),

    /// A layout block (`section`, `header`, `context`) carrying mrkdwn text,
    /// decoded into inline elements.
    Text(Vec<Inline>),

    /// An unrecognized or non-textual block (images, dividers, actions).
    Other,
}

/// An element inside a `rich_text` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RichTextElement {
    /// A run of inline content.
    Section(Vec<Inline>),

    /// A preformatted (code) block.
    Preformatted(Vec<Inline>),

    /// A block quote.
    Quote(Vec<Inline>),

    /// A bulleted or numbered list.
    List {
        /// Whether the list is numbered.
        ordered: bool,
        /// Nesting depth, 0 for a top-level list.
        indent: u8,
        /// The list items, each a run of inline content.
        items: Vec<Vec<Inline>>,
    },

    /// An unrecognized element.
    Other,
}

/// Inline content within a rich-text element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// A run of literal text.
    Text {
        /// The text content.
        text: String,
        /// Formatting applied to the run.
        style: Style,
    },

    /// A reference to a channel.
    Channel {
        /// The channel id.
        id: String,
    },

    /// An emoji, by short name.
    Emoji {
        /// The short name, without colons (e.g. `slightly_smiling_face`).
        name: String,
        /// Hyphen-separated hex code points (e.g. `1f642`), for standard emoji.
        unicode: Option<String>,
    },

    /// A hyperlink.
    Link {
        /// The link target.
        url: String,
        /// The link label, when it differs from the URL.
        text: Option<String>,
        /// Formatting applied to the label.
        style: Style,
    },

    /// A mention of a user.
    User {
        /// The user id.
        id: String,
    },

    /// A mention of a user group.
    Usergroup {
        /// The user group id.
        id: String,
    },

    /// An `@here`, `@channel` or `@everyone` mention.
    Broadcast {
        /// The audience: `here`, `channel` or `everyone`.
        range: String,
    },

    /// An unrecognized inline element.
    Other,
}

/// Text formatting flags carried by rich-text runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Style {
    /// Bold text.
    #[serde(default)]
    pub bold: bool,
    /// Italic text.
    #[serde(default)]
    pub italic: bool,
    /// Struck-through text.
    #[serde(default)]
    pub strike: bool,
    /// Inline code.
    #[serde(default)]
    pub code: bool,
}

/// A file uploaded alongside a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// The file title, or its name when untitled.
    pub name: String,
    /// Where the file can be viewed, if the export records it.
    pub url: Option<String>,
}

impl Message {
    /// Builds a message from one record of a message-dump file.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is not a message or its timestamp
    /// cannot be parsed.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ParseError> {
        let kind = get_str(value, &["type"]).unwrap_or_default();
        ensure!(kind == "message", UnexpectedTypeSnafu { kind });

        let ts = get_str(value, &["ts"]).unwrap_or_default();
        let date = parse_ts(ts).context(InvalidTimestampSnafu { ts })?;

        let subtype = get_string(value, &["subtype"]);
        let sender = if subtype.as_deref() == Some("bot_message") {
            Sender {
                id: get_string(value, &["bot_id"]).unwrap_or_default(),
                name: get_string(value, &["username"]),
                image_url: get_string(value, &["icons", "image_48"]),
            }
        } else {
            let profile: Option<Profile> = value
                .get("user_profile")
                .and_then(|p| serde_json::from_value(p.clone()).ok());
            Sender {
                id: get_string(value, &["user"]).unwrap_or_default(),
                name: profile
                    .as_ref()
                    .and_then(Profile::display_name)
                    .map(str::to_owned),
                image_url: profile.and_then(|p| p.image_72),
            }
        };

        let blocks: Vec<Block> = value
            .get("blocks")
            .and_then(|b| serde_json::from_value(b.clone()).ok())
            .unwrap_or_default();
        let blocks = if blocks.is_empty() {
            fallback_blocks(get_str(value, &["text"]).unwrap_or_default())
        } else {
            blocks
        };

        Ok(Self {
            ts: ts.to_owned(),
            thread_ts: get_string(value, &["thread_ts"]),
            date,
            subtype,
            sender,
            blocks,
            files: extract_files(value),
        })
    }

    /// Returns `true` if this message started its thread.
    #[must_use]
    pub fn is_thread_root(&self) -> bool {
        self.thread_ts.as_deref() == Some(self.ts.as_str())
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        Ok(match get_str(&value, &["type"]) {
            Some("rich_text") => Self::RichText(extract_rich_text(&value)),
            Some("section" | "header") => get_str(&value, &["text", "text"])
                .map_or(Self::Other, |text| Self::Text(decode_mrkdwn(text))),
            Some("context") => {
                let text = value
                    .get("elements")
                    .and_then(serde_json::Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(|el| get_str(el, &["text"]))
                    .collect::<Vec<_>>()
                    .join(" ");
                if text.is_empty() {
                    Self::Other
                } else {
                    Self::Text(decode_mrkdwn(&text))
                }
            }
            // Untyped blocks with elements are rich text in older exports
            None if value.get("elements").is_some() => Self::RichText(extract_rich_text(&value)),
            _ => Self::Other,
        })
    }
}

impl<'de> Deserialize<'de> for RichTextElement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        Ok(match get_str(&value, &["type"]) {
            Some("rich_text_section") => Self::Section(extract_inlines(&value)),
            Some("rich_text_preformatted") => Self::Preformatted(extract_inlines(&value)),
            Some("rich_text_quote") => Self::Quote(extract_inlines(&value)),
            Some("rich_text_list") => Self::List {
                ordered: get_str(&value, &["style"]) == Some("ordered"),
                indent: value
                    .get("indent")
                    .and_then(serde_json::Value::as_u64)
                    .and_then(|i| u8::try_from(i).ok())
                    .unwrap_or(0),
                items: value
                    .get("elements")
                    .and_then(serde_json::Value::as_array)
                    .into_iter()
                    .flatten()
                    .map(extract_inlines)
                    .collect(),
            },
            _ => Self::Other,
        })
    }
}

fn inline_from_value(value: &serde_json::Value) -> Inline {
    let style = value
        .get("style")
        .and_then(|s| serde_json::from_value(s.clone()).ok())
        .unwrap_or_default();

    match get_str(value, &["type"]) {
        Some("text") => Inline::Text {
            text: get_string(value, &["text"]).unwrap_or_default(),
            style,
        },
        Some("channel") => Inline::Channel {
            id: get_string(value, &["channel_id"]).unwrap_or_default(),
        },
        Some("emoji") => Inline::Emoji {
            name: get_string(value, &["name"]).unwrap_or_default(),
            unicode: get_string(value, &["unicode"]),
        },
        Some("link") => Inline::Link {
            url: get_string(value, &["url"]).unwrap_or_default(),
            text: get_string(value, &["text"]).filter(|t| !t.is_empty()),
            style,
        },
        Some("user") => Inline::User {
            id: get_string(value, &["user_id"]).unwrap_or_default(),
        },
        Some("usergroup") => Inline::Usergroup {
            id: get_string(value, &["usergroup_id"]).unwrap_or_default(),
        },
        Some("broadcast") => Inline::Broadcast {
            range: get_string(value, &["range"]).unwrap_or_default(),
        },
        Some("date") => get_string(value, &["fallback"])
            .map_or(Inline::Other, |text| Inline::Text { text, style }),
        _ => Inline::Other,
    }
}

/// Extracts the elements of a `rich_text` block.
fn extract_rich_text(value: &serde_json::Value) -> Vec<RichTextElement> {
    value
        .get("elements")
        .and_then(|e| serde_json::from_value(e.clone()).ok())
        .unwrap_or_default()
}

/// Extracts the inline elements of a rich-text element.
///
/// Sections nested inside another element are flattened into it.
fn extract_inlines(value: &serde_json::Value) -> Vec<Inline> {
    let mut inlines = Vec::new();
    for el in value
        .get("elements")
        .and_then(serde_json::Value::as_array)
        .into_iter()
        .flatten()
    {
        if get_str(el, &["type"]) == Some("rich_text_section") {
            inlines.extend(extract_inlines(el));
        } else {
            inlines.push(inline_from_value(el));
        }
    }
    inlines
}

/// Extracts uploaded files from the `files` array.
fn extract_files(value: &serde_json::Value) -> Vec<Attachment> {
    value
        .get("files")
        .and_then(serde_json::Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|file| {
            let name = get_string(file, &["title"])
                .filter(|t| !t.is_empty())
                .or_else(|| get_string(file, &["name"]))?;
            let url = get_string(file, &["url_private"])
                .or_else(|| get_string(file, &["permalink"]));
            Some(Attachment { name, url })
        })
        .collect()
}

/// Builds blocks from the flat `text` field of a message without `blocks`.
fn fallback_blocks(text: &str) -> Vec<Block> {
    if text.is_empty() {
        return Vec::new();
    }
    vec![Block::RichText(vec![RichTextElement::Section(
        decode_mrkdwn(text),
    )])]
}

/// Parses a Slack timestamp (`"1609459200.000100"`) into a UTC instant.
fn parse_ts(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, ""));
    let secs: i64 = secs.parse().ok()?;
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits: String = frac.chars().chain(std::iter::repeat('0')).take(9).collect();
    let nanos: u32 = digits.parse().ok()?;
    DateTime::from_timestamp(secs, nanos)
}

/// Decodes Slack mrkdwn text into inline elements.
///
/// Angle-bracket tokens become mentions and links; everything else is
/// plain text with `&lt;`, `&gt;` and `&amp;` unescaped. Emphasis markers
/// (`*bold*`, `_italic_`) are left as typed.
#[must_use]
pub fn decode_mrkdwn(text: &str) -> Vec<Inline> {
    let mut inlines = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find('<') {
        let Some(len) = rest[start..].find('>') else {
            break;
        };
        push_text(&mut inlines, &rest[..start]);
        inlines.push(decode_token(&rest[start + 1..start + len]));
        rest = &rest[start + len + 1..];
    }
    push_text(&mut inlines, rest);

    inlines
}

/// Decodes the inside of one `<...>` token.
fn decode_token(token: &str) -> Inline {
    let (target, label) = match token.split_once('|') {
        Some((target, label)) => (target, Some(unescape_entities(label))),
        None => (token, None),
    };

    if let Some(id) = target.strip_prefix('@') {
        return Inline::User { id: id.to_owned() };
    }
    if let Some(id) = target.strip_prefix('#') {
        return Inline::Channel { id: id.to_owned() };
    }
    if let Some(command) = target.strip_prefix('!') {
        return match command {
            "here" | "channel" | "everyone" => Inline::Broadcast {
                range: command.to_owned(),
            },
            _ => command.strip_prefix("subteam^").map_or_else(
                || Inline::Text {
                    text: label.unwrap_or_else(|| command.to_owned()),
                    style: Style::default(),
                },
                |id| Inline::Usergroup { id: id.to_owned() },
            ),
        };
    }

    Inline::Link {
        url: unescape_entities(target),
        text: label.filter(|l| !l.is_empty()),
        style: Style::default(),
    }
}

fn push_text(inlines: &mut Vec<Inline>, text: &str) {
    if !text.is_empty() {
        inlines.push(Inline::Text {
            text: unescape_entities(text),
            style: Style::default(),
        });
    }
}

/// Reverses the three entity escapes Slack applies to message text.
fn unescape_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Navigates a JSON path and returns the string value at the end.
///
/// # Arguments
///
/// * `value` - The root JSON value to navigate from
/// * `path` - A sequence of keys to follow through the JSON structure
fn get_str<'a>(value: &'a serde_json::Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str()
}

/// Like [`get_str`] but returns an owned `String`.
fn get_string(value: &serde_json::Value, path: &[&str]) -> Option<String> {
    get_str(value, path).map(str::to_owned)
}

/// Parses the contents of a message-dump file into messages.
///
/// This is the main entry point for parsing a single day of channel history.
///
/// # Arguments
///
/// * `json_str` - The raw JSON content of a `YYYY-MM-DD.json` file
///
/// # Errors
///
/// Returns an error if the JSON is malformed, a record is not a message,
/// or a timestamp cannot be parsed.
///
/// # Example
///
/// ```
/// use slack2doc::parser::parse_messages;
///
/// let messages = parse_messages("[]").unwrap();
/// assert!(messages.is_empty());
/// ```
pub fn parse_messages(json_str: &str) -> Result<Vec<Message>, ParseError> {
    let records: Vec<serde_json::Value> = serde_json::from_str(json_str).context(JsonSnafu)?;
    records.iter().map(Message::from_value).collect()
}
