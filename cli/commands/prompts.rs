use crate::cli_args::PromptsArgs;
use crate::output::write_to_stdout;
use crate::{ignore_rules_for, load_config_for_command};
use anyhow::{Context, Result, bail};
use colored::Colorize;
use quickdoc_core::{self as core, Config, PromptBuilder};

pub fn handle_prompts_command(args: PromptsArgs) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;

    let config = load_config_for_command(
        &project_root,
        &args.project_config,
        Some(&args.traversal),
        Some(&args.language),
    )
    .context("Failed to load configuration for prompts command")?;
    let rules = ignore_rules_for(&config, &project_root)?;
    let result = core::traverse(&project_root, &rules).context("Failed to gather project files")?;

    let project_name = config.get_effective_project_name(&project_root);
    let prompts = PromptBuilder::new(&result, config.general.language, &project_name)
        .with_templates(config.prompt_templates())
        .context("Invalid prompt templates")?;

    if let Some(wanted) = &args.file {
        let Some(file_prompt) = prompts
            .file_prompts()
            .into_iter()
            .find(|p| &p.relative_path == wanted)
        else {
            bail!(
                "No prompt for '{}': the file is ignored, unreadable or does not exist",
                wanted
            );
        };
        return write_to_stdout(&file_prompt.prompt);
    }

    println!("{}", "=== main ===".green().bold());
    write_to_stdout(&prompts.main_prompt())?;
    if args.main_only {
        return Ok(());
    }

    for file_prompt in prompts.file_prompts() {
        println!("\n{}", format!("=== {} ===", file_prompt.relative_path).green().bold());
        write_to_stdout(&file_prompt.prompt)?;
    }
    Ok(())
}
