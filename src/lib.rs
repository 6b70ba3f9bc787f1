// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert Slack workspace exports to HTML or plain text.
//!
//! This crate provides loading, parsing and rendering functionality for
//! turning the JSON archive produced by Slack's workspace export into
//! readable per-channel documents.
//!
//! # Overview
//!
//! A Slack export is a directory with `channels.json`, `users.json` and one
//! subdirectory per channel holding a JSON file per day. This crate:
//!
//! 1. Loads the channel and user metadata into a lookup directory
//! 2. Parses each channel's messages and groups them into threads
//! 3. Renders every channel as an HTML page or a plain-text document
//!
//! # Example
//!
//! ```no_run
//! use slack2doc::{archive, metadata::Directory, renderer};
//! use std::path::Path;
//!
//! let root = Path::new("slack-export");
//! let directory = Directory::load(root).unwrap();
//!
//! for dir in archive::list_channels(root, None).unwrap() {
//!     let channel = archive::load_channel(&dir).unwrap();
//!     let html = renderer::render_channel(&channel, &directory, &Default::default());
//!     std::fs::write(format!("{}.html", channel.name), html).unwrap();
//! }
//! ```
//!
//! # Modules
//!
//! - [`metadata`]: channel and user lookup tables
//! - [`parser`]: JSON parsing and type definitions for message files
//! - [`archive`]: export traversal, channel loading and thread grouping
//! - [`markup`]: rich-text to HTML or plain-text conversion
//! - [`renderer`]: whole-document generation with configurable output

#![deny(missing_docs)]

pub mod archive;
pub mod markup;
pub mod metadata;
pub mod parser;
pub mod renderer;
