use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use assignment::{DedupKey, GroupKind, Intent};

#[derive(Parser)]
#[command(name = "intune-tools")]
#[command(version)]
#[command(about = "Bulk assign macOS apps to groups in Microsoft Intune", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use built-in demo data instead of Microsoft Graph
    #[arg(long, global = true, env = "INTUNE_TOOLS_DEMO")]
    pub demo: bool,

    /// Config file (default: <config dir>/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in and show the signed-in identity
    Login {
        /// Sign-in method (overrides config)
        #[arg(short, long, value_enum)]
        method: Option<MethodArg>,
    },

    /// List groups
    Groups {
        /// Only groups of this kind
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,

        /// Case-insensitive name filter
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// List macOS apps
    Apps(AppsArgs),

    /// List existing assignments of an app
    Assignments {
        /// App id
        app_id: String,
    },

    /// Assign apps to groups
    Assign(AssignArgs),

    /// Select groups and apps interactively, then assign
    #[command(alias = "i")]
    Interactive,

    /// Remove every assignment of an app
    Clear {
        /// App id
        app_id: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show group and app statistics
    Stats,

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct AppsArgs {
    /// Case-insensitive name filter
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Case-insensitive publisher filter
    #[arg(short, long)]
    pub publisher: Option<String>,

    /// App type filter, e.g. pkg, dmg, macOSLobApp
    #[arg(short = 't', long = "type")]
    pub app_type: Option<String>,

    /// Include apps for every platform
    #[arg(long)]
    pub all_platforms: bool,
}

#[derive(Args)]
pub struct AssignArgs {
    /// Group id (repeatable)
    #[arg(short, long = "group", value_name = "GROUP_ID", required = true)]
    pub groups: Vec<String>,

    /// App id (repeatable)
    #[arg(short, long = "app", value_name = "APP_ID", required = true)]
    pub apps: Vec<String>,

    /// Assignment intent (overrides config)
    #[arg(short, long, value_enum)]
    pub intent: Option<IntentArg>,

    /// Assignment option as key=value: notify, restart_required, override_existing
    #[arg(short, long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    /// How existing assignments are matched (overrides config)
    #[arg(long, value_enum)]
    pub dedup: Option<DedupArg>,

    /// Concurrent requests (overrides config)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Show what would be created without applying
    #[arg(long)]
    pub preview: bool,

    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the config file path
    Path,
}

// ============================================================================
// Value enums
// ============================================================================

#[derive(Clone, Copy, ValueEnum)]
pub enum MethodArg {
    DeviceCode,
    Browser,
    ClientSecret,
}

impl From<MethodArg> for graph::AuthMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::DeviceCode => Self::DeviceCode,
            MethodArg::Browser => Self::Browser,
            MethodArg::ClientSecret => Self::ClientSecret,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Security,
    Dynamic,
    MailEnabled,
}

impl From<KindArg> for GroupKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Security => Self::Security,
            KindArg::Dynamic => Self::Dynamic,
            KindArg::MailEnabled => Self::MailEnabled,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum IntentArg {
    Required,
    Available,
    Uninstall,
}

impl From<IntentArg> for Intent {
    fn from(arg: IntentArg) -> Self {
        match arg {
            IntentArg::Required => Self::Required,
            IntentArg::Available => Self::Available,
            IntentArg::Uninstall => Self::Uninstall,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DedupArg {
    /// Any assignment to the group counts
    Group,
    /// Only an assignment with the same intent counts
    GroupAndIntent,
}

impl From<DedupArg> for DedupKey {
    fn from(arg: DedupArg) -> Self {
        match arg {
            DedupArg::Group => Self::Group,
            DedupArg::GroupAndIntent => Self::GroupAndIntent,
        }
    }
}
