// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Integration tests for slack2doc loading and rendering.

use slack2doc::archive;
use slack2doc::metadata::Directory;
use slack2doc::renderer::{self, OutputFormat, RenderOptions};
use std::fs;
use std::path::Path;

const CHANNELS: &str = r#"[
    {"id": "C01", "name": "general"},
    {"id": "C02", "name": "builds"}
]"#;

const USERS: &str = r#"[
    {
        "id": "U01",
        "name": "ada",
        "profile": {"display_name": "Ada", "real_name": "Ada Lovelace", "image_72": "https://img.example/ada.png"}
    },
    {
        "id": "U02",
        "name": "charles",
        "profile": {"display_name": "", "real_name": "Charles Babbage"}
    }
]"#;

const GENERAL_DAY_ONE: &str = r#"[
    {
        "type": "message",
        "subtype": "channel_join",
        "user": "U02",
        "ts": "1609459100.000100",
        "text": "<@U02> has joined the channel"
    },
    {
        "type": "message",
        "user": "U01",
        "ts": "1609459200.000100",
        "thread_ts": "1609459200.000100",
        "blocks": [{
            "type": "rich_text",
            "elements": [
                {
                    "type": "rich_text_section",
                    "elements": [
                        {"type": "text", "text": "Hey "},
                        {"type": "user", "user_id": "U02"},
                        {"type": "text", "text": ", try "},
                        {"type": "text", "text": "make check", "style": {"code": true}},
                        {"type": "text", "text": " and see "},
                        {"type": "channel", "channel_id": "C02"},
                        {"type": "text", "text": " "},
                        {"type": "emoji", "name": "wink", "unicode": "1f609"}
                    ]
                },
                {
                    "type": "rich_text_preformatted",
                    "elements": [{"type": "text", "text": "$ make check\nok <all>"}]
                }
            ]
        }]
    }
]"#;

const GENERAL_DAY_TWO: &str = r#"[
    {
        "type": "message",
        "user": "U02",
        "ts": "1609545600.000100",
        "thread_ts": "1609459200.000100",
        "text": "Works, see <https://example.com/log|the log>"
    },
    {
        "type": "message",
        "user": "U01",
        "ts": "1609549200.000100",
        "text": "Thanks!"
    }
]"#;

const BUILDS_DAY_ONE: &str = r#"[
    {
        "type": "message",
        "subtype": "bot_message",
        "bot_id": "B01",
        "username": "ci",
        "ts": "1609459200.000100",
        "text": "nightly passed"
    }
]"#;

fn write_export(root: &Path) {
    fs::write(root.join("channels.json"), CHANNELS).unwrap();
    fs::write(root.join("users.json"), USERS).unwrap();

    let general = root.join("general");
    fs::create_dir(&general).unwrap();
    fs::write(general.join("2021-01-01.json"), GENERAL_DAY_ONE).unwrap();
    fs::write(general.join("2021-01-02.json"), GENERAL_DAY_TWO).unwrap();

    let builds = root.join("builds");
    fs::create_dir(&builds).unwrap();
    fs::write(builds.join("2021-01-01.json"), BUILDS_DAY_ONE).unwrap();
}

fn render_general(opts: &RenderOptions) -> String {
    let root = tempfile::tempdir().unwrap();
    write_export(root.path());

    let directory = Directory::load(root.path()).unwrap();
    let only = ["general".to_owned()];
    let dirs = archive::list_channels(root.path(), Some(&only[..])).unwrap();
    assert_eq!(dirs.len(), 1);

    let channel = archive::load_channel(&dirs[0]).unwrap();
    renderer::render_channel(&channel, &directory, opts)
}

/// Loads every channel of an export and verifies each renders.
#[test]
fn renders_every_channel() {
    let root = tempfile::tempdir().unwrap();
    write_export(root.path());

    let directory = Directory::load(root.path()).unwrap();
    let dirs = archive::list_channels(root.path(), None).unwrap();
    let names: Vec<_> = dirs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["builds", "general"]);

    for dir in &dirs {
        let channel = archive::load_channel(dir).unwrap();
        let html = renderer::render_channel(&channel, &directory, &RenderOptions::default());

        assert!(
            html.contains(&format!("<h3>Slack archives {}", dir.name)),
            "Missing title in {}",
            dir.name
        );
    }
}

/// Tests that thread replies from a later day are nested under their root.
#[test]
fn nests_replies_across_days() {
    let html = render_general(&RenderOptions {
        utc: true,
        ..Default::default()
    });

    let root_pos = html.find("Hey @Charles Babbage").unwrap();
    let nested_pos = html.find("<dt></dt><dd><dl>").unwrap();
    let reply_pos = html.find("Works, see").unwrap();
    let later_pos = html.find("Thanks!").unwrap();

    assert!(root_pos < nested_pos);
    assert!(nested_pos < reply_pos);
    assert!(reply_pos < later_pos);
    assert_eq!(html.matches("Works, see").count(), 1);
}

/// Tests the rendered HTML for mentions, code, emoji and links.
#[test]
fn renders_rich_text_as_html() {
    let html = render_general(&RenderOptions {
        utc: true,
        ..Default::default()
    });

    assert!(html.contains("<title>Slack archives general 2021-01-01---2021-01-02</title>"));
    assert!(html.contains("@Charles Babbage has joined the channel"));
    assert!(html.contains(
        "Hey @Charles Babbage, try <code>make check</code> and see #builds :wink:"
    ));
    assert!(html.contains("<pre>$ make check\nok &lt;all&gt;</pre>"));
    assert!(html.contains("<a href='https://example.com/log'>the log</a>"));
    assert!(html.contains("src=\"https://img.example/ada.png\""));
    assert!(html.contains("Ada  Fri 2021-01-01 12:00AM"));
}

/// Tests that the plain-text format marks replies and keeps code blocks.
#[test]
fn renders_plain_text() {
    let text = render_general(&RenderOptions {
        format: OutputFormat::Text,
        utc: true,
        project: Some("PFS".into()),
        ..Default::default()
    });

    assert!(text.starts_with("PFS slack archives general 2021-01-01---2021-01-02\n===="));
    assert!(text.contains("    Hey @Charles Babbage, try `make check` and see #builds :wink:"));
    assert!(text.contains("    ```\n    $ make check\n    ok <all>\n    ```"));
    assert!(text.contains("|       Works, see the log <https://example.com/log>"));
    assert!(!text.contains("<a href"));
}

/// Tests that Unicode emoji are used when requested.
#[test]
fn unicode_emoji_option() {
    let html = render_general(&RenderOptions {
        unicode_emoji: true,
        ..Default::default()
    });

    assert!(html.contains("#builds \u{1f609}"));
    assert!(!html.contains(":wink:"));
}

/// Tests that a malformed day file aborts loading with its path in the error.
#[test]
fn malformed_message_file_fails() {
    let root = tempfile::tempdir().unwrap();
    write_export(root.path());
    fs::write(
        root.path().join("builds").join("2021-01-02.json"),
        r#"[{"type": "message", "ts": "soon"}]"#,
    )
    .unwrap();

    let only = ["builds".to_owned()];
    let dirs = archive::list_channels(root.path(), Some(&only[..])).unwrap();
    let err = archive::load_channel(&dirs[0]).unwrap_err();

    assert!(err.to_string().contains("2021-01-02.json"));
}
