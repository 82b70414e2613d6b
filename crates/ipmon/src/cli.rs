//! Clap derive structures for the `ipmon` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. Kept
//! free of crate-internal imports so `build.rs` can include it for man
//! page generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ipmon -- command-line client for the IP monitor
#[derive(Debug, Parser)]
#[command(
    name = "ipmon",
    version,
    about = "Watch segment status and manage IP monitor settings",
    long_about = "Command-line client for the IP monitor backend.\n\n\
        Shows the device status of a network segment and edits the\n\
        monitor's configuration: local drafts, validation, save, dry-run\n\
        test and reset to defaults.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "IPMON_PROFILE", global = true)]
    pub profile: Option<String>,

    /// IP monitor base URL (overrides profile)
    #[arg(long, short = 'S', env = "IPMON_SERVER", global = true)]
    pub server: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "IPMON_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "IPMON_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "IPMON_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the device status of a network segment
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Edit, save, test and reset the monitor configuration
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Manage server profiles in the local config file
    Profile(ProfileArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Segment to show (defaults to the profile's default segment)
    pub segment: Option<String>,

    /// Keep polling and redraw on every refresh
    #[arg(long, short = 'w')]
    pub watch: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the form as it stands (draft, or defaults)
    Show,

    /// Change form fields and keep the result as the local draft
    Set {
        /// Assignments as dotted.path=value
        #[arg(required = true, value_name = "PATH=VALUE")]
        assignments: Vec<String>,
    },

    /// Validate the form and send it to the server
    Save {
        /// Load the form from a JSON file first
        #[arg(long, short = 'F')]
        from_file: Option<PathBuf>,
    },

    /// Ask the server to dry-run the form without applying it
    Test {
        /// Load the form from a JSON file first
        #[arg(long, short = 'F')]
        from_file: Option<PathBuf>,
    },

    /// Restore the server's default settings
    Reset,

    /// Write the form to ipmonitor_config_<date>.json
    Export {
        /// Target directory (defaults to the current directory)
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,
    },

    /// Load a JSON file into the form and keep it as the draft
    Import {
        /// File to import
        file: PathBuf,
    },

    /// Inspect or discard the local draft
    Draft(DraftArgs),
}

#[derive(Debug, Args)]
pub struct DraftArgs {
    #[command(subcommand)]
    pub command: DraftCommand,
}

#[derive(Debug, Subcommand)]
pub enum DraftCommand {
    /// Print the stored draft
    Show,
    /// Delete the stored draft
    Clear,
}

// ── Profile ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Add or replace a profile (prompts for anything not given)
    Init {
        /// Profile name
        #[arg(long)]
        name: Option<String>,

        /// Server base URL
        #[arg(long = "url")]
        url: Option<String>,

        /// Segment the status view opens on
        #[arg(long)]
        segment: Option<String>,

        /// Make this the default profile
        #[arg(long)]
        set_default: bool,
    },

    /// Display the resolved configuration file
    Show,

    /// Print the configuration file location
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
