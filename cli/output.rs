use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use quickdoc_core::{ProgressReporter, SkippedFile};
use serde::Serialize;
use std::io::{self, Write};

use crate::commands::scan::ScanReport;

const BAR_WIDTH: usize = 30;

// Redrawn in place on stderr
#[derive(Debug, Default)]
pub struct TerminalProgress {
    total: usize,
    done: usize,
    last_line_len: usize,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn draw(&mut self, label: &str) {
        let percent = if self.total == 0 {
            100
        } else {
            self.done * 100 / self.total
        };
        let filled = if self.total == 0 {
            BAR_WIDTH
        } else {
            self.done * BAR_WIDTH / self.total
        };
        let plain_len = format!(" {:>3}% |{}|: {}", percent, " ".repeat(BAR_WIDTH), label).chars().count();
        let line = format!(
            " {} |{}{}|: {}",
            format!("{:>3}%", percent).green(),
            " ".repeat(filled).on_white(),
            " ".repeat(BAR_WIDTH - filled),
            label.cyan()
        );
        let padding = " ".repeat(self.last_line_len.saturating_sub(plain_len));
        let mut stderr = io::stderr().lock();
        // A broken terminal must not abort generation.
        let _ = write!(stderr, "\r{}{}", line, padding);
        let _ = stderr.flush();
        self.last_line_len = plain_len;
    }
}

impl ProgressReporter for TerminalProgress {
    fn start(&mut self, total: usize) {
        self.total = total;
        self.done = 0;
        self.draw("Starting...");
    }

    fn advance(&mut self, label: &str) {
        self.done = (self.done + 1).min(self.total);
        self.draw(label);
    }

    fn finish(&mut self) {
        self.draw("Done");
        eprintln!();
    }
}

pub fn print_structured<T: Serialize>(data: &T, format: &str) -> Result<()> {
    let content = match format.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yml::to_string(data).context("Failed to serialize YAML")?,
        _ => serde_json::to_string_pretty(data).context("Failed to serialize JSON")?,
    };
    write_to_stdout(&content)
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn print_scan_table(report: &ScanReport) -> Result<()> {
    println!();
    println!("{}", " Documentation Inputs ".green().bold().underline());
    println!("{:<20} {}", "Project Root:".green(), report.project_root.cyan());
    println!("{:<20} {}", "Ignore Rules:".green(), report.ignore_rules.join(", ").cyan());
    println!("{:<20} {}", "Files:".green(), report.total_files.to_string().cyan());
    println!("{:<20} {}", "Total Lines:".green(), report.total_lines.to_string().cyan());
    println!("{:<20} {}", "Total Size:".green(), report.total_bytes_readable.cyan());
    println!("{:<20} {}", "Est. Tokens:".green(), report.estimated_tokens.to_string().cyan());

    if report.files.is_empty() {
        println!("\n{}", "(No files would be documented)".yellow());
    } else {
        println!("\n{}", " Files ".green().bold().underline());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Path").fg(Color::Green),
            Cell::new("Lines").fg(Color::Green),
            Cell::new("Size").fg(Color::Green),
            Cell::new("Tokens").fg(Color::Green),
        ]);
        for file in &report.files {
            table.add_row(vec![
                Cell::new(&file.path).fg(Color::Cyan),
                Cell::new(file.lines).set_alignment(CellAlignment::Right),
                Cell::new(&file.bytes_readable)
                    .set_alignment(CellAlignment::Right)
                    .fg(Color::DarkGrey),
                Cell::new(file.estimated_tokens).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{table}");
    }

    if let Some(skipped) = &report.skipped {
        print_skipped(skipped);
    }
    println!();
    Ok(())
}

pub fn print_skipped(skipped: &[SkippedFile]) {
    if skipped.is_empty() {
        println!("\n{}", "(No files were skipped)".dimmed());
        return;
    }
    println!("\n{}", " Skipped Files ".yellow().bold().underline());
    for file in skipped {
        println!(" - {} {}", file.path.yellow(), format!("({})", file.reason).dimmed());
    }
}
