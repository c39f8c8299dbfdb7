//! CLI argument definitions using the clap derive API.
//!
//! Argument names, aliases, help text and value enums live here. No
//! business logic.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name    = "fastblocks",
    bin_name = "fastblocks",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "\u{26a1} Drop-in feature modules for FastAPI projects",
    long_about = "fastblocks copies self-contained feature modules (auth, users, \
                  logging, ...) from a module registry into a FastAPI project and \
                  wires them into the router, requirements, .env, settings and \
                  .gitignore.",
    after_help = "EXAMPLES:\n\
        \x20 fastblocks init --name my-api -p ./my-api\n\
        \x20 fastblocks list --search auth\n\
        \x20 fastblocks add users -p ./my-api\n\
        \x20 fastblocks add --all --dry-run\n\
        \x20 fastblocks completions bash > /usr/share/bash-completion/completions/fastblocks",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(
        visible_alias = "ls",
        about = "List modules in the registry",
        after_help = "EXAMPLES:\n\
            \x20 fastblocks list\n\
            \x20 fastblocks list --search jwt\n\
            \x20 fastblocks list --format json"
    )]
    List(ListArgs),

    #[command(
        about = "Show everything known about one module",
        after_help = "EXAMPLES:\n\
            \x20 fastblocks info auth"
    )]
    Info(InfoArgs),

    #[command(
        about = "Create a new FastAPI project skeleton",
        after_help = "EXAMPLES:\n\
            \x20 fastblocks init                       # current directory\n\
            \x20 fastblocks init -p ./shop --name shop\n\
            \x20 fastblocks init -p . --force          # write into a non-empty directory"
    )]
    Init(InitArgs),

    #[command(
        visible_alias = "install",
        about = "Install modules into a project",
        after_help = "EXAMPLES:\n\
            \x20 fastblocks add auth\n\
            \x20 fastblocks add users notes -p ./my-api\n\
            \x20 fastblocks add --all --dry-run\n\
            \x20 fastblocks add users --no-deps   # fail if auth is not installed yet"
    )]
    Add(AddArgs),

    #[command(
        visible_alias = "rm",
        about = "Remove an installed module",
        after_help = "EXAMPLES:\n\
            \x20 fastblocks remove notes\n\
            \x20 fastblocks remove notes --keep-registration -y"
    )]
    Remove(RemoveArgs),

    #[command(
        visible_alias = "st",
        about = "Show which registry modules are installed",
        after_help = "EXAMPLES:\n\
            \x20 fastblocks status -p ./my-api"
    )]
    Status(StatusArgs),

    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 fastblocks completions bash > ~/.local/share/bash-completion/completions/fastblocks\n\
            \x20 fastblocks completions zsh  > ~/.zfunc/_fastblocks\n\
            \x20 fastblocks completions fish > ~/.config/fish/completions/fastblocks.fish"
    )]
    Completions(CompletionsArgs),

    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 fastblocks config path\n\
            \x20 fastblocks config get registry.path\n\
            \x20 fastblocks config init"
    )]
    Config(ConfigCommands),
}

// ── list ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(
        short = 's',
        long = "search",
        value_name = "TEXT",
        help = "Only modules whose id, name, description or tags contain TEXT"
    )]
    pub search: Option<String>,

    #[arg(
        short = 'f',
        long = "format",
        value_enum,
        default_value = "table",
        help = "Listing format"
    )]
    pub format: ListFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Table,
    List,
    Json,
    Csv,
}

// ── info ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InfoArgs {
    #[arg(value_name = "MODULE", help = "Module id")]
    pub module: String,
}

// ── init ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InitArgs {
    #[arg(
        short = 'p',
        long = "project-path",
        value_name = "DIR",
        default_value = ".",
        help = "Directory to create the project in"
    )]
    pub project_path: PathBuf,

    /// Defaults to the directory name.
    #[arg(short = 'n', long = "name", value_name = "NAME", help = "Project name")]
    pub name: Option<String>,

    #[arg(
        short = 'd',
        long = "description",
        value_name = "TEXT",
        default_value = "A FastAPI application",
        help = "Project description"
    )]
    pub description: String,

    #[arg(
        short = 'f',
        long = "force",
        help = "Write the skeleton even if the directory is not empty"
    )]
    pub force: bool,

    /// Files ending in `.template` have the suffix dropped.
    #[arg(
        long = "skeleton",
        value_name = "DIR",
        help = "Use the project skeleton in DIR instead of the built-in one"
    )]
    pub skeleton: Option<PathBuf>,

    #[arg(short = 'y', long = "yes", help = "Skip confirmation prompts")]
    pub yes: bool,
}

// ── add ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(
        value_name = "MODULE",
        required_unless_present = "all",
        conflicts_with = "all",
        help = "Module ids to install"
    )]
    pub modules: Vec<String>,

    #[arg(long = "all", help = "Install every module in the registry")]
    pub all: bool,

    #[arg(
        short = 'p',
        long = "project-path",
        value_name = "DIR",
        default_value = ".",
        help = "Project root"
    )]
    pub project_path: PathBuf,

    #[arg(
        short = 'f',
        long = "force",
        help = "Rewrite module files even if the module is already installed"
    )]
    pub force: bool,

    #[arg(long = "dry-run", help = "Show what would change without writing anything")]
    pub dry_run: bool,

    /// Prerequisites must already be installed; otherwise the install fails.
    #[arg(long = "no-deps", help = "Do not install missing prerequisite modules")]
    pub no_deps: bool,

    #[arg(short = 'y', long = "yes", help = "Skip confirmation prompts")]
    pub yes: bool,
}

// ── remove ────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RemoveArgs {
    #[arg(value_name = "MODULE", help = "Module id")]
    pub module: String,

    #[arg(
        short = 'p',
        long = "project-path",
        value_name = "DIR",
        default_value = ".",
        help = "Project root"
    )]
    pub project_path: PathBuf,

    #[arg(short = 'y', long = "yes", help = "Skip confirmation prompts")]
    pub yes: bool,

    #[arg(
        long = "keep-registration",
        help = "Leave the router registration in place"
    )]
    pub keep_registration: bool,
}

// ── status ────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(
        short = 'p',
        long = "project-path",
        value_name = "DIR",
        default_value = ".",
        help = "Project root"
    )]
    pub project_path: PathBuf,
}

// ── completions ───────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(value_enum, value_name = "SHELL")]
    pub shell: Shell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}

// ── config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one effective value, e.g. `install.resolve_dependencies`.
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Print the effective configuration as TOML.
    List,
    /// Print the default config file location.
    Path,
    /// Write a config file holding the defaults.
    Init {
        #[arg(short = 'f', long = "force", help = "Overwrite an existing file")]
        force: bool,
    },
}
