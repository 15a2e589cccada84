use crate::cli_args::GenerateArgs;
use crate::output::TerminalProgress;
use crate::{ignore_rules_for, load_config_for_command};
use anyhow::{Context, Result};
use colored::Colorize;
use quickdoc_core::{
    self as core, Config, DocWriter, MockBackend, NoProgress, OpenAiBackend, ProgressReporter,
    PromptBuilder, Retry, TextBackend,
};

pub fn handle_generate_command(args: GenerateArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let mut config = load_config_for_command(
        &project_root,
        &args.project_config,
        Some(&args.traversal),
        Some(&args.language),
    )
    .context("Failed to load configuration")?;
    apply_generate_overrides(&mut config, &args)?;

    let rules = ignore_rules_for(&config, &project_root)?;
    let result = core::traverse(&project_root, &rules)
        .context("Failed to gather project files")?;
    for skipped in result.skipped() {
        log::warn!("Skipped {}: {}", skipped.path, skipped.reason);
    }
    if result.is_empty() {
        log::warn!("No files matched; the document will only contain the overview section.");
    }

    let project_name = config.get_effective_project_name(&project_root);
    let prompts = PromptBuilder::new(&result, config.general.language, &project_name)
        .with_templates(config.prompt_templates())
        .context("Invalid prompt templates")?;

    let backend: Box<dyn TextBackend> = if args.dry_run {
        log::info!("Dry run: prompts are answered offline.");
        Box::new(MockBackend::echo())
    } else {
        let settings = config.backend_settings()?;
        Box::new(Retry::new(
            OpenAiBackend::new(settings)?,
            config.backend.max_attempts,
            config.get_retry_delay()?,
        ))
    };

    let mut terminal_progress;
    let mut silent = NoProgress;
    let progress: &mut dyn ProgressReporter = if quiet {
        &mut silent
    } else {
        terminal_progress = TerminalProgress::new();
        &mut terminal_progress
    };

    let doc = DocWriter::new(backend, &prompts)
        .with_parts(config.output.parts)
        .generate(progress)
        .context("Failed to generate documentation")?;

    let output_path = config.output_path(&project_root);
    core::save_doc(&doc, &output_path)?;

    if !quiet {
        println!(
            "{} Documented {} files into: {}",
            "✅".green(),
            result.len(),
            output_path.display().to_string().blue()
        );
    }
    Ok(())
}

fn apply_generate_overrides(config: &mut Config, args: &GenerateArgs) -> Result<()> {
    log::trace!("Applying generate command CLI overrides to config...");
    // --output is relative to the working directory, unlike the config file value.
    if let Some(output) = &args.output {
        config.output.file_name = std::path::absolute(output)
            .with_context(|| format!("Failed to resolve output path {}", output.display()))?;
    }
    if let Some(parts) = args.parts {
        config.output.parts = parts as usize;
    }
    if let Some(model) = &args.model {
        config.backend.model = model.clone();
    }
    if let Some(endpoint) = &args.endpoint {
        config.backend.endpoint = endpoint.clone();
    }
    Ok(())
}
