// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Discovery and loading of channel histories in an export directory.
//!
//! The expected layout is:
//!
//! ```text
//! root/channels.json
//!      users.json
//!      general/2021-01-04.json
//!              2021-01-05.json
//!      random/2021-01-04.json
//! ```
//!
//! Each channel is loaded in date order and its messages are grouped into
//! threads, ready for rendering.

use crate::parser::{self, Message};
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Error type for archive traversal and loading failures.
#[derive(Debug, Snafu)]
pub enum ArchiveError {
    /// A directory of the export could not be listed.
    #[snafu(display("failed to list {}: {source}", path.display()))]
    Walk {
        /// The directory being listed.
        path: PathBuf,
        /// The underlying traversal error.
        source: walkdir::Error,
    },

    /// A message file could not be read.
    #[snafu(display("failed to read {}: {source}", path.display()))]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A message file could not be parsed.
    #[snafu(display("failed to parse {}: {source}", path.display()))]
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// The underlying parse error.
        source: parser::ParseError,
    },
}

/// A channel directory and the message files it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDir {
    /// The channel name (the directory name).
    pub name: String,
    /// The channel directory.
    pub path: PathBuf,
    /// The `*.json` message files, sorted by name and therefore by date.
    pub files: Vec<PathBuf>,
}

impl ChannelDir {
    /// Returns the date of each message file (its file stem), in order.
    #[must_use]
    pub fn dates(&self) -> Vec<String> {
        self.files
            .iter()
            .filter_map(|f| f.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }
}

/// A root message and its replies.
///
/// A message outside any thread is a thread with no replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    /// The message that started the thread.
    pub root: Message,
    /// The replies, in posting order.
    pub replies: Vec<Message>,
}

impl Thread {
    /// Builds a thread from all of its messages, in the order they were read.
    ///
    /// The root is the message whose `ts` equals its `thread_ts`; when the
    /// export does not contain it, the earliest message stands in.
    fn from_members(mut members: Vec<Message>) -> Self {
        let root_index = members
            .iter()
            .position(Message::is_thread_root)
            .or_else(|| {
                members
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, m)| m.date)
                    .map(|(i, _)| i)
            })
            .unwrap_or(0);
        let root = members.remove(root_index);
        members.sort_by_key(|m| m.date);
        Self {
            root,
            replies: members,
        }
    }

    /// Total number of messages in the thread, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.replies.len()
    }

    /// Always `false`: a thread has at least its root.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// A fully loaded channel history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// The channel name.
    pub name: String,
    /// The dates covered by the history, in order.
    pub dates: Vec<String>,
    /// The top-level entries of the channel, in document order.
    pub threads: Vec<Thread>,
}

impl Channel {
    /// Total number of messages in the channel.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.threads.iter().map(Thread::len).sum()
    }
}

/// Lists the channel directories under an export root, sorted by name.
///
/// Plain files at the root (metadata, earlier outputs) are ignored. When
/// `only` is given, channels not named in it are skipped.
///
/// # Errors
///
/// Returns an error if the root or a channel directory cannot be listed.
pub fn list_channels(root: &Path, only: Option<&[String]>) -> Result<Vec<ChannelDir>, ArchiveError> {
    let mut channels = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.context(WalkSnafu { path: root })?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if only.is_some_and(|names| !names.contains(&name)) {
            continue;
        }

        let files = list_message_files(entry.path())?;
        channels.push(ChannelDir {
            name,
            path: entry.into_path(),
            files,
        });
    }

    Ok(channels)
}

/// Collects the `*.json` files directly inside a channel directory.
fn list_message_files(dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.context(WalkSnafu { path: dir })?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "json")
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Reads and parses every message file of a channel, in date order.
///
/// # Errors
///
/// Returns an error naming the first file that cannot be read or parsed.
pub fn load_channel(dir: &ChannelDir) -> Result<Channel, ArchiveError> {
    let mut messages = Vec::new();

    for path in &dir.files {
        let json = std::fs::read_to_string(path).context(ReadSnafu { path })?;
        messages.extend(parser::parse_messages(&json).context(ParseSnafu { path })?);
    }

    Ok(Channel {
        name: dir.name.clone(),
        dates: dir.dates(),
        threads: group_threads(messages),
    })
}

/// Groups messages into threads by their shared `thread_ts`.
///
/// Each thread takes the position of its first message in the input, and
/// every message ends up in exactly one thread.
#[must_use]
pub fn group_threads(messages: Vec<Message>) -> Vec<Thread> {
    let mut groups: Vec<Vec<Message>> = Vec::new();
    let mut by_thread: HashMap<String, usize> = HashMap::new();

    for message in messages {
        match message.thread_ts.clone() {
            Some(thread_ts) => {
                if let Some(&i) = by_thread.get(&thread_ts) {
                    groups[i].push(message);
                } else {
                    by_thread.insert(thread_ts, groups.len());
                    groups.push(vec![message]);
                }
            }
            None => groups.push(vec![message]),
        }
    }

    groups.into_iter().map(Thread::from_members).collect()
}
