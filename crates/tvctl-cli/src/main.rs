//! tvctl CLI
//!
//! Command-line interface for a channel management server: browse the
//! channel and stream tables, manage playlists, and run backups.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use tvctl_core::Config;

mod commands;
mod output;

use commands::ListArgs;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "tvctl")]
#[command(about = "tvctl - Command-line client for a channel management server")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show server version and login state
    Status,
    /// Log in and store the access token
    Login {
        /// Username
        username: String,
        /// Password (prompted for if not given)
        #[arg(long)]
        password: Option<String>,
    },
    /// End the session and forget the stored token
    Logout,
    /// Browse and manage channels
    Channels {
        #[command(subcommand)]
        command: ChannelCommands,
    },
    /// Browse and manage streams
    Streams {
        #[command(subcommand)]
        command: StreamCommands,
    },
    /// Manage M3U / Xtream Codes playlists
    Playlists {
        #[command(subcommand)]
        command: PlaylistCommands,
    },
    /// Create, restore and manage backups
    Backups {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Manage channel logos
    Logos {
        #[command(subcommand)]
        command: LogoCommands,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (server_url, token, page_size, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[derive(Subcommand)]
enum ChannelCommands {
    /// List one page of channels
    #[command(alias = "ls")]
    List {
        /// Filter by channel group name
        #[arg(short, long)]
        group: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Delete channels by id
    #[command(alias = "rm")]
    Delete {
        /// Channel ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Subcommand)]
enum StreamCommands {
    /// List one page of streams
    #[command(alias = "ls")]
    List {
        /// Filter by stream group name
        #[arg(short, long)]
        group: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Delete streams by id
    #[command(alias = "rm")]
    Delete {
        /// Stream ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Show the values available to stream filters
    Filters {
        /// Restrict to a stream group
        #[arg(short, long)]
        group: Option<String>,
    },
}

#[derive(Subcommand)]
enum PlaylistCommands {
    /// List playlists
    #[command(alias = "ls")]
    List,
    /// Refresh one playlist's streams
    Refresh {
        /// Playlist id
        id: i64,
    },
    /// Refresh every active playlist
    RefreshAll,
    /// Refresh VOD content of an Xtream Codes playlist
    RefreshVod {
        /// Playlist id
        id: i64,
    },
    /// Refresh account info of an Xtream Codes profile
    RefreshInfo {
        /// Profile id
        profile_id: i64,
    },
    /// Enable a playlist
    Enable {
        /// Playlist id
        id: i64,
    },
    /// Disable a playlist
    Disable {
        /// Playlist id
        id: i64,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// List backups on the server
    #[command(alias = "ls")]
    List,
    /// Create a backup and wait for it to finish
    Create,
    /// Restore a backup and wait for it to finish
    Restore {
        /// Backup file name
        name: String,
    },
    /// Upload a backup archive
    Upload {
        /// Path to the archive
        file: PathBuf,
    },
    /// Delete a backup
    #[command(alias = "rm")]
    Delete {
        /// Backup file name
        name: String,
    },
    /// Print a direct download URL
    Url {
        /// Backup file name
        name: String,
    },
}

#[derive(Subcommand)]
enum LogoCommands {
    /// Upload an image as a new logo
    Upload {
        /// Path to the image
        file: PathBuf,
        /// Logo name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work even when the config is broken
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config = Config::load_with_cli_override(config_path)?;
    init_logging(&config);

    match cli.command {
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Status => commands::status::show(&config, &output).await,
        Commands::Login { username, password } => {
            commands::accounts::login(&config, config_path, username, password, &output).await
        }
        Commands::Logout => commands::accounts::logout(&config, config_path, &output).await,
        Commands::Channels { command } => handle_channel_command(command, &config, &output).await,
        Commands::Streams { command } => handle_stream_command(command, &config, &output).await,
        Commands::Playlists { command } => {
            handle_playlist_command(command, &config, &output).await
        }
        Commands::Backups { command } => handle_backup_command(command, &config, &output).await,
        Commands::Logos { command } => match command {
            LogoCommands::Upload { file, name } => {
                commands::logos::upload(&config, file, name, &output).await
            }
        },
    }
}

async fn handle_channel_command(
    command: ChannelCommands,
    config: &Config,
    output: &Output,
) -> Result<()> {
    match command {
        ChannelCommands::List { group, list } => {
            commands::channels::list(config, group, list, output).await
        }
        ChannelCommands::Delete { ids } => commands::channels::delete(config, ids, output).await,
    }
}

async fn handle_stream_command(
    command: StreamCommands,
    config: &Config,
    output: &Output,
) -> Result<()> {
    match command {
        StreamCommands::List { group, list } => {
            commands::streams::list(config, group, list, output).await
        }
        StreamCommands::Delete { ids } => commands::streams::delete(config, ids, output).await,
        StreamCommands::Filters { group } => {
            commands::streams::filters(config, group, output).await
        }
    }
}

async fn handle_playlist_command(
    command: PlaylistCommands,
    config: &Config,
    output: &Output,
) -> Result<()> {
    match command {
        PlaylistCommands::List => commands::playlists::list(config, output).await,
        PlaylistCommands::Refresh { id } => commands::playlists::refresh(config, id, output).await,
        PlaylistCommands::RefreshAll => commands::playlists::refresh_all(config, output).await,
        PlaylistCommands::RefreshVod { id } => {
            commands::playlists::refresh_vod(config, id, output).await
        }
        PlaylistCommands::RefreshInfo { profile_id } => {
            commands::playlists::refresh_info(config, profile_id, output).await
        }
        PlaylistCommands::Enable { id } => {
            commands::playlists::set_active(config, id, true, output).await
        }
        PlaylistCommands::Disable { id } => {
            commands::playlists::set_active(config, id, false, output).await
        }
    }
}

async fn handle_backup_command(
    command: BackupCommands,
    config: &Config,
    output: &Output,
) -> Result<()> {
    match command {
        BackupCommands::List => commands::backups::list(config, output).await,
        BackupCommands::Create => commands::backups::create(config, output).await,
        BackupCommands::Restore { name } => commands::backups::restore(config, name, output).await,
        BackupCommands::Upload { file } => commands::backups::upload(config, file, output).await,
        BackupCommands::Delete { name } => commands::backups::delete(config, name, output).await,
        BackupCommands::Url { name } => commands::backups::url(config, name, output).await,
    }
}

/// Initialize logging
///
/// Level comes from TVCTL_LOG (default `warn`). Logs go to the configured
/// log file, or to stderr when none is set.
fn init_logging(config: &Config) {
    let log_level = std::env::var("TVCTL_LOG").unwrap_or_else(|_| "warn".to_string());
    let env_filter = EnvFilter::new(format!("tvctl_core={},tvctl_cli={}", log_level, log_level));

    let writer = match &config.log_file {
        Some(path) => match std::fs::File::create(path) {
            Ok(file) => BoxMakeWriter::new(file),
            Err(e) => {
                eprintln!("Warning: Could not create log file {:?}: {}", path, e);
                BoxMakeWriter::new(std::io::stderr)
            }
        },
        None => BoxMakeWriter::new(std::io::stderr),
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .try_init();
}
