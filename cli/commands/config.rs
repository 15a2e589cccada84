use crate::cli_args::ConfigArgs;
use crate::load_config_for_command;
use crate::output::write_to_stdout;
use anyhow::{Context, Result, bail};
use colored::*;
use quickdoc_core::Config;
use quickdoc_core::config::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME};
use std::fs;

pub fn handle_config_command(args: ConfigArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root for config command")?;

    let config = if args.effective {
        load_config_for_command(&project_root, &args.project_config, None, None)?
    } else {
        Config::default()
    };
    let toml_text = config
        .to_toml_string()
        .context("Failed to serialize configuration")?;

    if !args.save {
        return write_to_stdout(&toml_text);
    }

    let config_dir = project_root.join(DEFAULT_CONFIG_DIR);
    let save_path = config_dir.join(DEFAULT_CONFIG_FILENAME);
    if save_path.exists() {
        bail!(
            "Config file already exists at '{}'; remove it first to regenerate.",
            save_path.display()
        );
    }
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create directory {}", config_dir.display()))?;
    fs::write(&save_path, toml_text)
        .with_context(|| format!("Failed to write config file {}", save_path.display()))?;

    if !quiet {
        println!(
            "{} Configuration saved to: {}",
            "✅".green(),
            save_path.display().to_string().blue()
        );
    }
    Ok(())
}
