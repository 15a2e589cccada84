use crate::backend::BackendSettings;
use crate::error::{AppError, Result};
use crate::prompts::{Language, PromptTemplates, default_templates};
use crate::rules::{IgnoreRule, IgnoreRules, RelativePath};
use parse_duration::parse;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_DIR: &str = ".quickdoc";
pub const DEFAULT_CONFIG_FILENAME: &str = "quickdoc.toml";
pub const DEFAULT_OUTPUT_FILENAME: &str = "documentation.md";
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub ignore: IgnoreConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct IgnoreConfig {
    #[serde(default)]
    pub rules: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: String,
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

/// Optional replacements for the built-in prompt templates.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PromptsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continuation: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_file")]
    pub file_name: PathBuf,
    #[serde(default = "default_parts")]
    pub parts: usize,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay() -> String {
    "5s".to_string()
}
fn default_timeout() -> String {
    "120s".to_string()
}
fn default_output_file() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILENAME)
}
fn default_parts() -> usize {
    1
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_attempts: default_max_attempts(),
            retry_delay: default_retry_delay(),
            timeout: default_timeout(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_name: default_output_file(),
            parts: default_parts(),
        }
    }
}

impl Config {
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        path_to_resolve
            .canonicalize()
            .map_err(|e| AppError::InvalidRoot {
                path: path_to_resolve.clone(),
                reason: e.to_string(),
            })
    }

    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        let Some(p_str) = cli_config_file else {
            let default_path = project_root
                .join(DEFAULT_CONFIG_DIR)
                .join(DEFAULT_CONFIG_FILENAME);
            if default_path.exists() {
                log::debug!("Using default config file path: {}", default_path.display());
                return Ok(Some(default_path));
            }
            log::debug!(
                "No config file specified and default not found at: {}",
                default_path.display()
            );
            return Ok(None);
        };

        let mut path = PathBuf::from(shellexpand::tilde(p_str).as_ref());
        let looks_like_path =
            path.is_absolute() || path.components().count() > 1 || p_str.contains(['/', '\\']);

        if looks_like_path {
            if !path.exists() && path.extension().is_none() {
                path.set_extension("toml");
            }
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Specified config file not found at path: {}",
                    path.display()
                )));
            }
            log::debug!("Using specified config file path: {}", path.display());
            return Ok(Some(path));
        }

        // A bare name refers to a file inside the default config directory.
        let filename = if path.extension().is_none_or(|e| e != "toml") {
            format!("{}.toml", path.to_string_lossy())
        } else {
            path.to_string_lossy().to_string()
        };
        let full_path = project_root.join(DEFAULT_CONFIG_DIR).join(filename);
        if !full_path.exists() {
            return Err(AppError::Config(format!(
                "Specified config file '{}' not found in default directory: {}",
                path.display(),
                project_root.join(DEFAULT_CONFIG_DIR).display()
            )));
        }
        log::debug!(
            "Using specified config filename in default directory: {}",
            full_path.display()
        );
        Ok(Some(full_path))
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                e
            ))
        })
    }

    pub fn from_toml_str(toml_content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str::<Config>(toml_content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn ignore_rules(&self) -> Result<IgnoreRules> {
        IgnoreRules::parse_all(&self.ignore.rules)
    }

    // Configured rules plus quickdoc's own files under the root: the config
    // folder and the output document, so reruns never feed them back.
    pub fn effective_ignore_rules(&self, project_root: &Path) -> Result<IgnoreRules> {
        let mut rules = self.ignore_rules()?;
        rules.push(IgnoreRule::ExactPath(RelativePath::from_segments([DEFAULT_CONFIG_DIR])));

        let output = self.output_path(project_root);
        if let Some(relative) = output
            .strip_prefix(project_root)
            .ok()
            .and_then(RelativePath::from_path)
            .filter(|p| !p.is_root())
        {
            log::debug!("Excluding generated document '{}' from traversal", relative);
            rules.push(IgnoreRule::ExactPath(relative));
        }
        Ok(rules)
    }

    pub fn get_effective_project_name(&self, project_root: &Path) -> String {
        self.general.project_name.clone().unwrap_or_else(|| {
            project_root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "UnknownProject".to_string())
        })
    }

    pub fn prompt_templates(&self) -> PromptTemplates {
        let defaults = default_templates();
        PromptTemplates {
            main: self.prompts.main.clone().unwrap_or_else(|| defaults.main.clone()),
            file: self.prompts.file.clone().unwrap_or_else(|| defaults.file.clone()),
            continuation: self
                .prompts
                .continuation
                .clone()
                .unwrap_or_else(|| defaults.continuation.clone()),
        }
    }

    // Relative names are placed under the project root
    pub fn output_path(&self, project_root: &Path) -> PathBuf {
        let expanded = PathBuf::from(
            shellexpand::tilde(&self.output.file_name.to_string_lossy()).as_ref(),
        );
        if expanded.is_absolute() {
            expanded
        } else {
            project_root.join(expanded)
        }
    }

    pub fn get_retry_delay(&self) -> Result<Duration> {
        parse_duration_setting("retry_delay", &self.backend.retry_delay)
    }

    pub fn get_timeout(&self) -> Result<Duration> {
        parse_duration_setting("timeout", &self.backend.timeout)
    }

    pub fn backend_settings(&self) -> Result<BackendSettings> {
        dotenvy::dotenv().ok();
        let api_key = env::var(&self.backend.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            log::warn!(
                "Environment variable {} is not set; requests are sent without authorization.",
                self.backend.api_key_env
            );
        }
        Ok(BackendSettings {
            endpoint: self.backend.endpoint.clone(),
            model: self.backend.model.clone(),
            api_key,
            timeout: self.get_timeout()?,
        })
    }
}

fn parse_duration_setting(name: &str, value: &str) -> Result<Duration> {
    parse(value).map_err(|e| {
        AppError::InvalidArgument(format!(
            "Invalid {} duration '{}': {}. Use format like '500ms', '2s'.",
            name, value, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backend.model, DEFAULT_MODEL);
        assert_eq!(config.output.parts, 1);
        assert_eq!(config.general.language, Language::En);
    }

    #[test]
    fn parses_full_file() {
        let config = Config::from_toml_str(
            r#"
            [general]
            project_name = "Demo"
            language = "pl"

            [ignore]
            rules = ["*__pycache__", "docs/build"]

            [backend]
            model = "local-model"
            retry_delay = "250ms"

            [prompts]
            continue = "more please"

            [output]
            file_name = "out/README.md"
            parts = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.general.language, Language::Pl);
        assert_eq!(config.ignore_rules().unwrap().len(), 2);
        assert_eq!(config.get_retry_delay().unwrap(), Duration::from_millis(250));
        assert_eq!(config.prompt_templates().continuation, "more please");
        assert_eq!(config.output.parts, 3);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml_str("[general]\ncolour = \"red\"").is_err());
    }

    #[test]
    fn invalid_duration_is_an_invalid_argument() {
        let mut config = Config::default();
        config.backend.timeout = "soon".to_string();
        assert!(matches!(config.get_timeout(), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let text = Config::default().to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), Config::default());
    }

    #[test]
    fn output_path_is_relative_to_project_root() {
        let config = Config::default();
        assert_eq!(
            config.output_path(Path::new("/work/proj")),
            PathBuf::from("/work/proj/documentation.md")
        );
    }

    #[test]
    fn effective_rules_exclude_output_and_config_folder_under_root() {
        let mut config = Config::default();
        config.ignore.rules = vec!["*target".to_string()];
        config.output.file_name = PathBuf::from("docs/api.md");
        let rules = config.effective_ignore_rules(Path::new("/work/proj")).unwrap();

        assert_eq!(rules.len(), 3);
        assert!(!rules.is_file_included(&RelativePath::parse("docs/api.md")));
        assert!(rules.is_file_included(&RelativePath::parse("docs/guide.md")));
        assert!(!rules.is_folder_included(&RelativePath::parse(".quickdoc")));
        assert!(!rules.is_folder_included(&RelativePath::parse("a/target")));
    }

    #[test]
    fn effective_rules_ignore_output_outside_root() {
        let mut config = Config::default();
        config.output.file_name = PathBuf::from("/elsewhere/documentation.md");
        let rules = config.effective_ignore_rules(Path::new("/work/proj")).unwrap();

        assert_eq!(rules.len(), 1);
        assert!(rules.is_file_included(&RelativePath::parse("documentation.md")));
    }

    #[test]
    fn resolve_config_path_finds_default_and_named_files() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Config::resolve_config_path(dir.path(), None, false).unwrap(), None);

        let config_dir = dir.path().join(DEFAULT_CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join(DEFAULT_CONFIG_FILENAME), "").unwrap();
        fs::write(config_dir.join("ci.toml"), "").unwrap();

        assert_eq!(
            Config::resolve_config_path(dir.path(), None, false).unwrap(),
            Some(config_dir.join(DEFAULT_CONFIG_FILENAME))
        );
        assert_eq!(
            Config::resolve_config_path(dir.path(), Some(&"ci".to_string()), false).unwrap(),
            Some(config_dir.join("ci.toml"))
        );
        assert!(Config::resolve_config_path(dir.path(), Some(&"missing".to_string()), false).is_err());
        assert_eq!(Config::resolve_config_path(dir.path(), None, true).unwrap(), None);
    }
}
