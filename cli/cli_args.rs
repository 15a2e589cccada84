use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Specify the target project directory (default: current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long,
        help = "Specify path/filename of the TOML config file (default: .quickdoc/quickdoc.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "no_config",
        help_heading = "Project Setup"
    )]
    pub config: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config",
        help_heading = "Project Setup"
    )]
    pub no_config: bool,

    #[arg(
        long,
        help = "Specify the project name (overrides config/dir name).",
        value_name = "NAME",
        help_heading = "Project Setup"
    )]
    pub project_name: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct TraversalOpts {
    #[arg(
        short = 'i',
        long = "ignore",
        value_name = "RULES",
        value_delimiter = ',',
        help = "Comma-separated ignore rules, added to the config file rules. '*name' ignores any file or folder named 'name'; 'a/b' ignores that exact path.",
        help_heading = "Filtering"
    )]
    pub ignore: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct LanguageOpts {
    #[arg(
        short = 'l',
        long = "lang",
        value_name = "CODE",
        value_parser = ["en", "ru", "ua", "chs", "es", "pl"],
        help = "Language of the generated documentation.",
        help_heading = "Generation"
    )]
    pub lang: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Generate Markdown documentation for a project with a text-generation model.",
    long_about = "quickdoc walks a project directory, skips files and folders matched by ignore rules, \nbuilds one overview prompt plus one prompt per file, sends them to an OpenAI-compatible \nbackend and writes the answers into a single Markdown file.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  quickdoc generate --ignore '*__pycache__,*__init__.py' --lang en\n  quickdoc scan --project-root ./src\n  quickdoc prompts --ignore tests\n  quickdoc generate --dry-run",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "g",
        visible_alias = "gen",
        about = "Generate the documentation file."
    )]
    Generate(GenerateArgs),

    #[command(
        visible_alias = "s",
        about = "List the files that would be documented."
    )]
    Scan(ScanArgs),

    #[command(
        visible_alias = "p",
        about = "Print the prompts that would be sent to the backend."
    )]
    Prompts(PromptsArgs),

    #[command(about = "Show or save the default configuration file.")]
    Config(ConfigArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub traversal: TraversalOpts,
    #[clap(flatten)]
    pub language: LanguageOpts,

    #[arg(
        short = 'o',
        long,
        value_name = "PATH",
        help = "Where to write the documentation (default: <project root>/documentation.md).",
        help_heading = "Output Control"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Number of rounds used to write the main section.",
        help_heading = "Generation"
    )]
    pub parts: Option<u32>,

    #[arg(long, value_name = "MODEL", help = "Model name sent to the backend.", help_heading = "Backend")]
    pub model: Option<String>,

    #[arg(
        long,
        value_name = "URL",
        help = "OpenAI-compatible chat completions endpoint.",
        help_heading = "Backend"
    )]
    pub endpoint: Option<String>,

    #[arg(
        long,
        help = "Use an offline stub backend instead of sending prompts over the network.",
        help_heading = "Backend"
    )]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub traversal: TraversalOpts,

    #[arg(short = 'f', long, help = "Print structured output instead of a table.", value_name = "FORMAT", value_parser = ["json", "yaml"], help_heading = "Output Formatting")]
    pub format: Option<String>,

    #[arg(long, help = "Also list files that were skipped and why.", help_heading = "Output Formatting")]
    pub show_skipped: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PromptsArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub traversal: TraversalOpts,
    #[clap(flatten)]
    pub language: LanguageOpts,

    #[arg(long, help = "Print only the main prompt.", conflicts_with = "file")]
    pub main_only: bool,

    #[arg(long, value_name = "RELATIVE_PATH", help = "Print only the prompt for this file.")]
    pub file: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(
        short = 's',
        long,
        help = "Save the default configuration to <project root>/.quickdoc/quickdoc.toml."
    )]
    pub save: bool,

    #[arg(long, help = "Show the effective configuration instead of the defaults.")]
    pub effective: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(value_name = "SHELL", help = "Shell to generate completions for (fish, bash, zsh) [default: fish].")]
    pub shell: Option<String>,

    #[arg(short = 's', long, help = "Save the script to the shell's standard completion directory.")]
    pub save: bool,
}
