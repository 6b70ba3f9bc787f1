// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for slack2doc.
//!
//! This binary provides the `slack2doc` command for converting a Slack
//! workspace export into one HTML or plain-text document per channel.

use lexopt::prelude::*;
use slack2doc::archive::{self, ChannelDir};
use slack2doc::metadata::{self, Directory};
use slack2doc::renderer::{self, OutputFormat};
use snafu::{ensure, prelude::*};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where to write the rendered output.
#[derive(Clone)]
enum OutputTarget {
    /// Write one file per channel to the specified directory.
    Directory(PathBuf),
    /// Write to stdout.
    Stdout,
}

#[allow(clippy::struct_excessive_bools)]
struct Cli {
    root: PathBuf,
    output: OutputTarget,
    channels: Option<Vec<String>>,
    project: Option<String>,
    format: OutputFormat,
    width: usize,
    utc: bool,
    unicode_emoji: bool,
    quiet: bool,
    verbose: bool,
    dry_run: bool,
    force: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("{} is not a directory", path.display()))]
    NotADirectory { path: PathBuf },

    #[snafu(display("no channel with message files to output to stdout"))]
    NoChannelToStdout,

    #[snafu(display("cannot output multiple channels to stdout"))]
    MultipleChannelsToStdout,

    #[snafu(display("failed to load workspace metadata: {source}"))]
    LoadMetadata { source: metadata::MetadataError },

    #[snafu(display("{source}"))]
    LoadArchive { source: archive::ArchiveError },

    #[snafu(display("failed to create output directory: {source}"))]
    CreateOutputDir { source: std::io::Error },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert Slack workspace exports to HTML or plain text

Usage: {name} [OPTIONS] <ROOT>

Arguments:
  <ROOT>  Export directory containing channels.json, users.json and one
          directory per channel

Options:
  -o, --output <DIR>        Output directory (default: <ROOT>, or - for stdout)
  -c, --channels <NAME>...  Only process these channels
  -p, --project <NAME>      Project name shown in document titles
  -F, --format <FORMAT>     Output format: html or text (default: html)
  -w, --width <N>           Wrap message text at N columns, 0 to disable (default: 100)
      --utc                 Show times in UTC instead of local time
      --unicode-emoji       Show emoji as Unicode characters where known

Other options:
  -q, --quiet               Only report warnings and errors
  -v, --verbose             Report skipped message content
  -n, --dry-run             Show what would be written without writing
  -f, --force               Overwrite existing output files
  -h, --help                Print help
  -V, --version             Print version

The RUST_LOG environment variable overrides --quiet and --verbose.",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut root: Option<PathBuf> = None;
    let mut output: Option<OutputTarget> = None;
    let mut channels: Option<Vec<String>> = None;
    let mut project = None;
    let mut format = OutputFormat::default();
    let mut width: usize = 100;
    let mut utc = false;
    let mut unicode_emoji = false;
    let mut quiet = false;
    let mut verbose = false;
    let mut dry_run = false;
    let mut force = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('o') | Long("output") => {
                let val: PathBuf = parser.value()?.parse()?;
                output = Some(if val == Path::new("-") {
                    OutputTarget::Stdout
                } else {
                    OutputTarget::Directory(val)
                });
            }
            Short('c') | Long("channels") => {
                let names = channels.get_or_insert_with(Vec::new);
                for val in parser.values()? {
                    names.push(val.string()?);
                }
            }
            Short('p') | Long("project") => project = Some(parser.value()?.string()?),
            Short('F') | Long("format") => format = parser.value()?.parse()?,
            Short('w') | Long("width") => {
                width = parser
                    .value()?
                    .parse()
                    .map_err(|_| "width must be a non-negative number")?;
            }
            Long("utc") => utc = true,
            Long("unicode-emoji") => unicode_emoji = true,
            Short('q') | Long("quiet") => quiet = true,
            Short('v') | Long("verbose") => verbose = true,
            Short('n') | Long("dry-run") => dry_run = true,
            Short('f') | Long("force") => force = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) if root.is_none() => root = Some(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    let root = root.ok_or("missing required argument: <ROOT>")?;
    Ok(Cli {
        output: output.unwrap_or_else(|| OutputTarget::Directory(root.clone())),
        root,
        channels,
        project,
        format,
        width,
        utc,
        unicode_emoji,
        quiet,
        verbose,
        dry_run,
        force,
    })
}

/// Sends diagnostics to stderr, honoring `RUST_LOG` when set.
fn init_logging(cli: &Cli) {
    let default_filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;
    init_logging(&cli);

    ensure!(cli.root.is_dir(), NotADirectorySnafu { path: &cli.root });

    let directory = Directory::load(&cli.root).context(LoadMetadataSnafu)?;
    debug!(
        channels = directory.channel_count(),
        users = directory.user_count(),
        "loaded workspace metadata"
    );

    let channels = select_channels(&cli)?;

    match &cli.output {
        OutputTarget::Stdout => {
            ensure!(!channels.is_empty(), NoChannelToStdoutSnafu);
            ensure!(channels.len() == 1, MultipleChannelsToStdoutSnafu);
            process_to_stdout(&channels[0], &directory, &cli)?;
        }
        OutputTarget::Directory(out_dir) => {
            if !cli.dry_run {
                std::fs::create_dir_all(out_dir).context(CreateOutputDirSnafu)?;
            }
            for dir in &channels {
                process_channel(dir, out_dir, &directory, &cli)?;
            }
        }
    }

    Ok(())
}

/// Lists the channels to convert, skipping those with no message files.
fn select_channels(cli: &Cli) -> Result<Vec<ChannelDir>, Error> {
    let found = archive::list_channels(&cli.root, cli.channels.as_deref())
        .context(LoadArchiveSnafu)?;

    if let Some(names) = &cli.channels {
        for name in names.iter().filter(|n| !found.iter().any(|c| &c.name == *n)) {
            warn!("no channel directory named {name}");
        }
    }

    Ok(found
        .into_iter()
        .filter(|dir| {
            if dir.files.is_empty() {
                debug!(channel = %dir.name, "skipping channel without message files");
                false
            } else {
                true
            }
        })
        .collect())
}

/// Creates render options from CLI arguments.
fn make_render_options(cli: &Cli) -> renderer::RenderOptions {
    renderer::RenderOptions {
        format: cli.format,
        width: cli.width,
        project: cli.project.clone(),
        utc: cli.utc,
        unicode_emoji: cli.unicode_emoji,
    }
}

/// Loads and renders a single channel.
fn render(dir: &ChannelDir, directory: &Directory, cli: &Cli) -> Result<String, Error> {
    let channel = archive::load_channel(dir).context(LoadArchiveSnafu)?;
    debug!(
        channel = %channel.name,
        messages = channel.message_count(),
        threads = channel.threads.len(),
        "loaded channel"
    );
    Ok(renderer::render_channel(
        &channel,
        directory,
        &make_render_options(cli),
    ))
}

/// Processes a single channel and outputs to stdout.
fn process_to_stdout(dir: &ChannelDir, directory: &Directory, cli: &Cli) -> Result<(), Error> {
    if cli.dry_run {
        info!("would output channel {}", dir.name);
        return Ok(());
    }

    print!("{}", render(dir, directory, cli)?);
    Ok(())
}

/// Processes a single channel and writes it to the output directory.
fn process_channel(
    dir: &ChannelDir,
    out_dir: &Path,
    directory: &Directory,
    cli: &Cli,
) -> Result<(), Error> {
    let out_path = out_dir.join(format!("{}.{}", dir.name, cli.format.extension()));

    // Handle dry-run mode
    if cli.dry_run {
        info!(
            "would write {} ({} files)",
            out_path.display(),
            dir.files.len()
        );
        return Ok(());
    }

    // Check if output exists and handle overwrite
    if out_path.exists() && !cli.force {
        warn!(
            "skipping {} (already exists, use --force to overwrite)",
            out_path.display()
        );
        return Ok(());
    }

    let document = render(dir, directory, cli)?;
    std::fs::write(&out_path, &document).context(WriteFileSnafu { path: &out_path })?;

    info!("wrote {}", out_path.display());
    Ok(())
}
