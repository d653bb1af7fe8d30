use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "adminctl")]
#[command(about = "Admin console shell: sign in, inspect the session, browse dictionaries")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API base URL (overrides profile and config file)
    #[arg(short, long, global = true, env = "ADMIN_CONSOLE_URL")]
    pub server: Option<String>,

    /// Config profile name
    #[arg(
        short,
        long,
        global = true,
        env = "ADMIN_CONSOLE_PROFILE",
        default_value = "default"
    )]
    pub profile: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Client configuration file (defaults to ./admin-console.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level filter, e.g. `debug` or `admin_client=trace`
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq, Eq, Debug)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session for this profile
    Login(LoginArgs),
    /// Sign out and clear the local session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Fetch a login captcha challenge
    Captcha,
    /// Show the items of a dictionary
    Dict(DictArgs),
    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct LoginArgs {
    /// Username
    #[arg(short, long)]
    pub username: String,
    /// Password
    #[arg(long)]
    pub password: String,
    /// Keep the tokens after this process exits
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub remember_me: bool,
    /// Captcha key returned by `adminctl captcha`
    #[arg(long, requires = "captcha_code")]
    pub captcha_key: Option<String>,
    /// Captcha answer
    #[arg(long, requires = "captcha_key")]
    pub captcha_code: Option<String>,
}

#[derive(clap::Args)]
pub struct DictArgs {
    /// Dictionary code (e.g. gender)
    pub code: String,
    /// Drop the cached copy and fetch again
    #[arg(long)]
    pub refresh: bool,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (server, format)
    pub key: String,
    /// Value
    pub value: String,
}
