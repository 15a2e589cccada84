use crate::error::{AppError, Result};
use crate::gather::TraversalResult;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
    Ua,
    Chs,
    Es,
    Pl,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::En,
        Language::Ru,
        Language::Ua,
        Language::Chs,
        Language::Es,
        Language::Pl,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
            Language::Ua => "ua",
            Language::Chs => "chs",
            Language::Es => "es",
            Language::Pl => "pl",
        }
    }

    // Name written into prompts
    pub fn display_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ru => "Russian",
            Language::Ua => "Ukrainian",
            Language::Chs => "Simplified Chinese",
            Language::Es => "Spanish",
            Language::Pl => "Polish",
        }
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let supported: Vec<&str> = Language::ALL.iter().map(|l| l.code()).collect();
                AppError::InvalidArgument(format!(
                    "Unsupported language '{}'. Supported: {}",
                    s,
                    supported.join(", ")
                ))
            })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplates {
    pub main: String,
    pub file: String,
    #[serde(rename = "continue")]
    pub continuation: String,
}

impl PromptTemplates {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("main", &self.main, "{files}"),
            ("file", &self.file, "{file_path}"),
        ];
        for (name, template, placeholder) in required {
            if !template.contains(placeholder) {
                return Err(AppError::PromptTemplate(format!(
                    "Template '{}' must contain the {} placeholder",
                    name, placeholder
                )));
            }
        }
        Ok(())
    }
}

static DEFAULT_TEMPLATES: Lazy<PromptTemplates> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../data/prompts.yaml"));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/prompts.yaml")
});

pub fn default_templates() -> &'static PromptTemplates {
    &DEFAULT_TEMPLATES
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePrompt {
    pub relative_path: String,
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    language: Language,
    project_name: String,
    templates: PromptTemplates,
    file_paths: Vec<String>,
    files_block: String,
}

impl PromptBuilder {
    pub fn new(result: &TraversalResult, language: Language, project_name: &str) -> Self {
        Self {
            language,
            project_name: project_name.to_string(),
            templates: default_templates().clone(),
            file_paths: result.paths().map(String::from).collect(),
            files_block: render_files(result),
        }
    }

    pub fn with_templates(mut self, templates: PromptTemplates) -> Result<Self> {
        templates.validate()?;
        self.templates = templates;
        Ok(self)
    }

    pub fn main_prompt(&self) -> String {
        render_template(&self.templates.main, &self.base_values())
    }

    pub fn file_count(&self) -> usize {
        self.file_paths.len()
    }

    // One per file, in traversal order
    pub fn file_prompts(&self) -> Vec<FilePrompt> {
        let mut values = self.base_values();
        self.file_paths
            .iter()
            .map(|path| {
                values.insert("file_path", path.as_str());
                FilePrompt {
                    relative_path: path.clone(),
                    prompt: render_template(&self.templates.file, &values),
                }
            })
            .collect()
    }

    pub fn continuation_prompt(&self) -> String {
        render_template(&self.templates.continuation, &self.base_values())
    }

    fn base_values(&self) -> HashMap<&'static str, &str> {
        HashMap::from([
            ("language", self.language.display_name()),
            ("project_name", self.project_name.as_str()),
            ("files", self.files_block.as_str()),
        ])
    }
}

pub fn render_files(result: &TraversalResult) -> String {
    let mut out = String::new();
    for record in result.records() {
        let fence = fence_for(record.content);
        out.push_str("### ");
        out.push_str(record.relative_path);
        out.push('\n');
        out.push_str(&fence);
        out.push('\n');
        out.push_str(record.content);
        if !record.content.is_empty() && !record.content.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&fence);
        out.push_str("\n\n");
    }
    out.truncate(out.trim_end().len());
    out
}

// A fence must be longer than any backtick run inside the content.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for c in content.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

// Single pass: unknown placeholders and braces inside substituted values stay as they are.
fn render_template(template: &str, values: &HashMap<&str, &str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => match values.get(&after[..close]) {
                Some(value) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            },
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
