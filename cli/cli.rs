mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use std::path::Path;
use std::process;

use cli_args::{Cli, Commands, LanguageOpts, ProjectConfigOpts, TraversalOpts};
use quickdoc_core::{AppError, Config, IgnoreRules};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = match e.downcast_ref::<AppError>() {
                Some(AppError::Config(_)) => 1,
                Some(AppError::TomlParse(_)) => 1,
                Some(AppError::TomlSerialize(_)) => 1,
                Some(AppError::PromptTemplate(_)) => 1,
                Some(AppError::Io(_)) => 2,
                Some(AppError::FileRead { .. }) => 2,
                Some(AppError::FileWrite { .. }) => 2,
                Some(AppError::DirCreation { .. }) => 2,
                Some(AppError::WalkDir(_)) => 2,
                Some(AppError::InvalidRoot { .. }) => 2,
                Some(AppError::BackendRequest(_)) => 3,
                Some(AppError::BackendResponse(_)) => 3,
                Some(AppError::InvalidArgument(_)) => 5,
                Some(AppError::DurationParse(_)) => 5,
                Some(AppError::JsonSerialize(_)) => 6,
                Some(AppError::YamlError(_)) => 6,
                Some(_) => 1,
                None => 1,
            };

            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(Commands::Generate(args)) => {
            log::debug!("Executing 'generate' command...");
            commands::generate::handle_generate_command(args, quiet)?;
        }
        Some(Commands::Scan(args)) => {
            log::debug!("Executing 'scan' command...");
            commands::scan::handle_scan_command(args, quiet)?;
        }
        Some(Commands::Prompts(args)) => {
            log::debug!("Executing 'prompts' command...");
            commands::prompts::handle_prompts_command(args)?;
        }
        Some(Commands::Config(args)) => {
            log::debug!("Executing 'config' command...");
            commands::config::handle_config_command(args, quiet)?;
        }
        Some(Commands::Completion(args)) => {
            log::debug!("Executing 'completion' command...");
            commands::completion::handle_completion_command(&args, quiet)?;
        }
    }
    Ok(())
}

/// Loads the config file (if any) and applies the options every command shares.
pub fn load_config_for_command(
    project_root: &Path,
    project_opts: &ProjectConfigOpts,
    traversal: Option<&TraversalOpts>,
    language: Option<&LanguageOpts>,
) -> Result<Config> {
    let config_path =
        Config::resolve_config_path(project_root, project_opts.config.as_ref(), project_opts.no_config)
            .context("Failed to resolve configuration path")?;

    let mut config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(name) = &project_opts.project_name {
        config.general.project_name = Some(name.clone());
    }
    if let Some(traversal) = traversal {
        let cli_rules = traversal.ignore.iter().map(|r| r.trim()).filter(|r| !r.is_empty());
        config.ignore.rules.extend(cli_rules.map(String::from));
    }
    if let Some(lang) = language.and_then(|l| l.lang.as_deref()) {
        config.general.language = lang.parse()?;
    }

    config.general.project_name = Some(config.get_effective_project_name(project_root));
    log::trace!("Effective config: {:?}", config);
    Ok(config)
}

// Configured rules plus the tool's own output, with context for the user
pub fn ignore_rules_for(config: &Config, project_root: &Path) -> Result<IgnoreRules> {
    let rules = config
        .effective_ignore_rules(project_root)
        .context("Invalid ignore rule in configuration or --ignore")?;
    log::debug!(
        "Ignore rules: {:?}",
        rules.iter().map(|r| r.to_string()).collect::<Vec<_>>()
    );
    Ok(rules)
}
