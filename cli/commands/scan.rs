use crate::cli_args::ScanArgs;
use crate::output::{print_scan_table, print_structured};
use crate::{ignore_rules_for, load_config_for_command};
use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use quickdoc_core::{self as core, Config, SkippedFile, TraversalResult};
use serde::Serialize;
use std::path::Path;
use tiktoken_rs::cl100k_base;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub project_root: String,
    pub ignore_rules: Vec<String>,
    pub total_files: usize,
    pub total_lines: usize,
    pub total_bytes: u128,
    pub total_bytes_readable: String,
    pub estimated_tokens: usize,
    pub files: Vec<FileStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<Vec<SkippedFile>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub path: String,
    pub lines: usize,
    pub bytes: usize,
    pub bytes_readable: String,
    pub estimated_tokens: usize,
}

pub fn handle_scan_command(args: ScanArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = load_config_for_command(&project_root, &args.project_config, Some(&args.traversal), None)
        .context("Failed to load configuration for scan command")?;
    let rules = ignore_rules_for(&config, &project_root)?;

    let result = core::traverse(&project_root, &rules).context("Failed to scan project files")?;

    if result.is_empty() && args.format.is_none() && !args.show_skipped {
        if !quiet {
            println!("No files would be documented with the current ignore rules.");
        }
        return Ok(());
    }

    let ignore_rules = rules.iter().map(|r| r.to_string()).collect();
    let report = build_report(&result, &project_root, ignore_rules, args.show_skipped)?;

    match args.format.as_deref() {
        Some(format) => print_structured(&report, format),
        None => print_scan_table(&report),
    }
}

fn build_report(
    result: &TraversalResult,
    project_root: &Path,
    ignore_rules: Vec<String>,
    show_skipped: bool,
) -> Result<ScanReport> {
    let bpe = cl100k_base()
        .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

    let mut total_lines = 0;
    let mut total_bytes: u128 = 0;
    let mut total_tokens = 0;
    let mut files = Vec::with_capacity(result.len());

    for record in result.records() {
        let lines = record.content.lines().count();
        let bytes = record.content.len();
        let tokens = bpe.encode_ordinary(record.content).len();

        total_lines += lines;
        total_bytes = total_bytes.saturating_add(bytes as u128);
        total_tokens += tokens;

        files.push(FileStats {
            path: record.relative_path.to_string(),
            lines,
            bytes,
            bytes_readable: readable_size(bytes as u128),
            estimated_tokens: tokens,
        });
    }

    Ok(ScanReport {
        project_root: project_root.display().to_string(),
        ignore_rules,
        total_files: files.len(),
        total_lines,
        total_bytes,
        total_bytes_readable: readable_size(total_bytes),
        estimated_tokens: total_tokens,
        files,
        skipped: show_skipped.then(|| result.skipped().to_vec()),
    })
}

fn readable_size(bytes: u128) -> String {
    Byte::from_u128(bytes)
        .unwrap_or_default()
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}
