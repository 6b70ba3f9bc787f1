// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Workspace metadata: channel and user directories.
//!
//! A Slack export carries `channels.json` and `users.json` at its root.
//! Messages only reference channels and users by id, so these files are
//! loaded up front and consulted while rendering mentions and senders.
//!
//! Private conversations live in `groups.json`, `mpims.json` and
//! `dms.json`; those are merged in when present.

use serde::{Deserialize, Deserializer};
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Optional conversation lists merged into the channel table when present.
const EXTRA_CHANNEL_FILES: [&str; 3] = ["groups.json", "mpims.json", "dms.json"];

/// Error type for metadata loading failures.
#[derive(Debug, Snafu)]
pub enum MetadataError {
    /// A metadata file could not be read.
    #[snafu(display("failed to read {}: {source}", path.display()))]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A metadata file is not valid JSON of the expected shape.
    #[snafu(display("failed to parse {}: {source}", path.display()))]
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// A Slack user profile.
///
/// The same object appears in `users.json` records and, as `user_profile`,
/// embedded in individual messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Profile {
    /// The name the user chose to display. Often empty.
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,

    /// The user's full name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub real_name: String,

    /// URL of the 72x72 avatar image.
    #[serde(default)]
    pub image_72: Option<String>,
}

impl Profile {
    /// Returns the display name, falling back to the real name.
    ///
    /// Returns `None` when both are empty.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        [&self.display_name, &self.real_name]
            .into_iter()
            .map(String::as_str)
            .find(|name| !name.is_empty())
    }
}

/// A workspace member resolved from `users.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// The Slack user id (e.g. `U012AB3CD`).
    pub id: String,
    /// The best available human-readable name.
    pub name: String,
    /// URL of the avatar image, if the export includes one.
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
struct ChannelRecord {
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
}

#[derive(Deserialize)]
struct UserRecord {
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    profile: Profile,
}

/// Reads an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        let name = record
            .profile
            .display_name()
            .map(str::to_owned)
            .or_else(|| (!record.name.is_empty()).then_some(record.name))
            .unwrap_or_else(|| record.id.clone());
        Self {
            id: record.id,
            name,
            image_url: record.profile.image_72,
        }
    }
}

/// Lookup tables for the channels and users of a workspace.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    channels: HashMap<String, String>,
    users: HashMap<String, User>,
}

impl Directory {
    /// Loads the metadata files from the root of an export.
    ///
    /// `channels.json` and `users.json` are required. `groups.json`,
    /// `mpims.json` and `dms.json` are merged in when they exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a required file is missing or any file present
    /// is not valid JSON.
    pub fn load(root: &Path) -> Result<Self, MetadataError> {
        let channels = read(&root.join("channels.json"))?;
        let users = read(&root.join("users.json"))?;

        let mut directory = Self::default();
        directory.merge_channels(&channels, &root.join("channels.json"))?;
        directory.merge_users(&users, &root.join("users.json"))?;

        for name in EXTRA_CHANNEL_FILES {
            let path = root.join(name);
            if path.is_file() {
                let json = read(&path)?;
                directory.merge_channels(&json, &path)?;
            }
        }

        Ok(directory)
    }

    /// Builds a directory from the contents of `channels.json` and `users.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if either string is not valid JSON of the expected shape.
    ///
    /// # Example
    ///
    /// ```
    /// use slack2doc::metadata::Directory;
    ///
    /// let dir = Directory::from_json(
    ///     r#"[{"id": "C1", "name": "general"}]"#,
    ///     r#"[{"id": "U1", "profile": {"display_name": "ada"}}]"#,
    /// ).unwrap();
    ///
    /// assert_eq!(dir.channel_name("C1"), Some("general"));
    /// assert_eq!(dir.user_name("U1"), Some("ada"));
    /// ```
    pub fn from_json(channels_json: &str, users_json: &str) -> Result<Self, MetadataError> {
        let mut directory = Self::default();
        directory.merge_channels(channels_json, Path::new("channels.json"))?;
        directory.merge_users(users_json, Path::new("users.json"))?;
        Ok(directory)
    }

    /// Merges another channel list (same shape as `channels.json`).
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a JSON array of channel records.
    pub fn add_channels(&mut self, json: &str) -> Result<(), MetadataError> {
        self.merge_channels(json, Path::new("<channels>"))
    }

    fn merge_channels(&mut self, json: &str, path: &Path) -> Result<(), MetadataError> {
        let records: Vec<ChannelRecord> =
            serde_json::from_str(json).context(ParseSnafu { path })?;
        self.channels
            .extend(records.into_iter().map(|c| (c.id, c.name)));
        Ok(())
    }

    fn merge_users(&mut self, json: &str, path: &Path) -> Result<(), MetadataError> {
        let records: Vec<UserRecord> = serde_json::from_str(json).context(ParseSnafu { path })?;
        self.users.extend(
            records
                .into_iter()
                .map(User::from)
                .map(|u| (u.id.clone(), u)),
        );
        Ok(())
    }

    /// Returns the name of the channel with the given id.
    #[must_use]
    pub fn channel_name(&self, id: &str) -> Option<&str> {
        self.channels
            .get(id)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Returns the user with the given id.
    #[must_use]
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.get(id)
    }

    /// Returns the display name of the user with the given id.
    #[must_use]
    pub fn user_name(&self, id: &str) -> Option<&str> {
        self.user(id).map(|u| u.name.as_str())
    }

    /// Number of known channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of known users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

fn read(path: &Path) -> Result<String, MetadataError> {
    std::fs::read_to_string(path).context(ReadSnafu { path })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANNELS: &str = r#"[
        {"id": "C01", "name": "general", "created": 1600000000},
        {"id": "C02", "name": "random"}
    ]"#;

    const USERS: &str = r#"[
        {
            "id": "U01",
            "name": "ada",
            "profile": {
                "display_name": "Ada",
                "real_name": "Ada Lovelace",
                "image_72": "https://example.com/ada.png"
            }
        },
        {
            "id": "U02",
            "name": "charles",
            "profile": { "display_name": "", "real_name": "Charles Babbage" }
        },
        {
            "id": "U03",
            "name": "ghost",
            "profile": { "display_name": "", "real_name": "" }
        },
        { "id": "U04" }
    ]"#;

    fn directory() -> Directory {
        Directory::from_json(CHANNELS, USERS).unwrap()
    }

    #[test]
    fn resolves_channel_names() {
        let dir = directory();

        assert_eq!(dir.channel_name("C01"), Some("general"));
        assert_eq!(dir.channel_name("C02"), Some("random"));
        assert_eq!(dir.channel_name("C99"), None);
        assert_eq!(dir.channel_count(), 2);
    }

    #[test]
    fn prefers_display_name() {
        let dir = directory();
        let user = dir.user("U01").unwrap();

        assert_eq!(user.name, "Ada");
        assert_eq!(user.image_url.as_deref(), Some("https://example.com/ada.png"));
    }

    #[test]
    fn falls_back_to_real_name() {
        assert_eq!(directory().user_name("U02"), Some("Charles Babbage"));
    }

    #[test]
    fn falls_back_to_account_name_then_id() {
        let dir = directory();

        assert_eq!(dir.user_name("U03"), Some("ghost"));
        assert_eq!(dir.user_name("U04"), Some("U04"));
        assert_eq!(dir.user_count(), 4);
    }

    #[test]
    fn unknown_user_is_none() {
        assert!(directory().user("U99").is_none());
    }

    #[test]
    fn add_channels_merges() {
        let mut dir = directory();
        dir.add_channels(r#"[{"id": "G01", "name": "secret"}]"#)
            .unwrap();

        assert_eq!(dir.channel_name("G01"), Some("secret"));
        assert_eq!(dir.channel_name("C01"), Some("general"));
    }

    #[test]
    fn profile_display_name_is_none_when_blank() {
        assert_eq!(Profile::default().display_name(), None);
    }

    #[test]
    fn null_profile_fields_count_as_missing() {
        let dir = Directory::from_json(
            r#"[{"id": "C03", "name": null}]"#,
            r#"[
                {"id": "U05", "name": "lin", "profile": {"display_name": null, "real_name": "Lin"}},
                {"id": "U06", "name": null, "profile": null}
            ]"#,
        )
        .unwrap();

        assert_eq!(dir.channel_name("C03"), None);
        assert_eq!(dir.channel_count(), 1);
        assert_eq!(dir.user_name("U05"), Some("Lin"));
        assert_eq!(dir.user_name("U06"), Some("U06"));
    }

    #[test]
    fn returns_error_for_invalid_json() {
        let err = Directory::from_json("not json", USERS).unwrap_err();
        assert!(err.to_string().contains("channels.json"));
    }

    #[test]
    fn loads_from_export_root() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("channels.json"), CHANNELS).unwrap();
        std::fs::write(root.path().join("users.json"), USERS).unwrap();
        std::fs::write(
            root.path().join("groups.json"),
            r#"[{"id": "G07", "name": "private-stuff"}]"#,
        )
        .unwrap();

        let dir = Directory::load(root.path()).unwrap();

        assert_eq!(dir.channel_name("C01"), Some("general"));
        assert_eq!(dir.channel_name("G07"), Some("private-stuff"));
        assert_eq!(dir.user_name("U01"), Some("Ada"));
    }

    #[test]
    fn load_requires_users_file() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("channels.json"), CHANNELS).unwrap();

        let err = Directory::load(root.path()).unwrap_err();
        assert!(matches!(err, MetadataError::Read { .. }));
        assert!(err.to_string().contains("users.json"));
    }
}
