use crate::error::{AppError, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

pub const SEPARATOR: char = '/';
const WILDCARD_PREFIX: char = '*';

// Location below the traversal root, as ordered segments
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RelativePath {
    segments: Vec<String>,
}

impl RelativePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    // `./src//lib/` and `src/lib` are the same path
    pub fn parse(raw: &str) -> Self {
        Self::from_segments(
            raw.split(SEPARATOR)
                .filter(|segment| !segment.is_empty() && *segment != "."),
        )
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(name) => segments.push(name.to_str()?.to_string()),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl Serialize for RelativePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreRule {
    // `*name`
    Wildcard(String),
    ExactPath(RelativePath),
}

impl IgnoreRule {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(AppError::InvalidArgument(
                "Ignore rule must not be empty".to_string(),
            ));
        }

        if let Some(name) = raw.strip_prefix(WILDCARD_PREFIX) {
            if name.is_empty() {
                return Err(AppError::InvalidArgument(format!(
                    "Wildcard ignore rule '{}' needs a name after '*'",
                    raw
                )));
            }
            return Ok(IgnoreRule::Wildcard(name.to_string()));
        }

        let path = RelativePath::parse(raw);
        if path.is_root() {
            return Err(AppError::InvalidArgument(format!(
                "Ignore rule '{}' names the project root, which cannot be ignored",
                raw
            )));
        }
        Ok(IgnoreRule::ExactPath(path))
    }

    pub fn excludes_folder(&self, folder: &RelativePath) -> bool {
        match self {
            IgnoreRule::Wildcard(name) => folder.segments().iter().any(|segment| segment == name),
            // Matching a prefix of the folder's segments covers every ancestor depth.
            IgnoreRule::ExactPath(rule) => folder.segments().starts_with(rule.segments()),
        }
    }

    pub fn excludes_file(&self, file: &RelativePath) -> bool {
        match self {
            IgnoreRule::Wildcard(name) => file.file_name() == Some(name.as_str()),
            IgnoreRule::ExactPath(rule) => file == rule,
        }
    }
}

impl FromStr for IgnoreRule {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        IgnoreRule::parse(s)
    }
}

impl fmt::Display for IgnoreRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreRule::Wildcard(name) => write!(f, "{}{}", WILDCARD_PREFIX, name),
            IgnoreRule::ExactPath(path) => write!(f, "{}", path),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRules {
    rules: Vec<IgnoreRule>,
}

impl IgnoreRules {
    pub fn new(rules: Vec<IgnoreRule>) -> Self {
        Self { rules }
    }

    pub fn parse_all<I, S>(raw_rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = raw_rules
            .into_iter()
            .map(|raw| IgnoreRule::parse(raw.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("Parsed {} ignore rules", rules.len());
        Ok(Self { rules })
    }

    pub fn push(&mut self, rule: IgnoreRule) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    pub fn is_folder_included(&self, folder: &RelativePath) -> bool {
        // The root can never be excluded
        if folder.is_root() {
            return true;
        }
        match self.rules.iter().find(|rule| rule.excludes_folder(folder)) {
            Some(rule) => {
                log::trace!("Folder '{}' excluded by rule '{}'", folder, rule);
                false
            }
            None => true,
        }
    }

    pub fn is_file_included(&self, file: &RelativePath) -> bool {
        match self.rules.iter().find(|rule| rule.excludes_file(file)) {
            Some(rule) => {
                log::trace!("File '{}' excluded by rule '{}'", file, rule);
                false
            }
            None => true,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &IgnoreRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(raw: &str) -> RelativePath {
        RelativePath::parse(raw)
    }

    fn rules(raw: &[&str]) -> IgnoreRules {
        IgnoreRules::parse_all(raw).unwrap()
    }

    #[test]
    fn parse_distinguishes_wildcard_from_exact_path() {
        assert_eq!(
            IgnoreRule::parse("*__pycache__").unwrap(),
            IgnoreRule::Wildcard("__pycache__".to_string())
        );
        assert_eq!(
            IgnoreRule::parse("sub/deep").unwrap(),
            IgnoreRule::ExactPath(RelativePath::from_segments(["sub", "deep"]))
        );
    }

    #[test]
    fn parse_rejects_empty_bare_star_and_root() {
        assert!(IgnoreRule::parse("").is_err());
        assert!(IgnoreRule::parse("*").is_err());
        assert!(IgnoreRule::parse(".").is_err());
        assert!(IgnoreRule::parse("/").is_err());
    }

    #[test]
    fn relative_path_normalizes_redundant_separators() {
        assert_eq!(path("./src//lib/"), path("src/lib"));
        assert_eq!(path("src/lib").to_string(), "src/lib");
        assert!(path("").is_root());
    }

    #[test]
    fn relative_path_from_path_rejects_parent_components() {
        assert_eq!(
            RelativePath::from_path(Path::new("a/b.txt")),
            Some(RelativePath::from_segments(["a", "b.txt"]))
        );
        assert_eq!(RelativePath::from_path(Path::new("../a")), None);
    }

    #[test]
    fn wildcard_excludes_folder_at_any_depth() {
        let rules = rules(&["*a"]);
        assert!(!rules.is_folder_included(&path("a")));
        assert!(!rules.is_folder_included(&path("x/a")));
        assert!(!rules.is_folder_included(&path("a/b")));
        assert!(rules.is_folder_included(&path("ab/b")));
    }

    #[test]
    fn exact_path_excludes_folder_and_descendants_only() {
        let rules = rules(&["sub/deep"]);
        assert!(rules.is_folder_included(&path("sub")));
        assert!(!rules.is_folder_included(&path("sub/deep")));
        assert!(!rules.is_folder_included(&path("sub/deep/deeper")));
        assert!(rules.is_folder_included(&path("sub/deeper")));
        assert!(rules.is_folder_included(&path("other/sub/deep")));
    }

    #[test]
    fn root_folder_is_always_included() {
        let rules = rules(&["*a", "sub"]);
        assert!(rules.is_folder_included(&RelativePath::root()));
    }

    #[test]
    fn file_wildcard_matches_exact_basename_only() {
        let rules = rules(&["*README.md"]);
        assert!(!rules.is_file_included(&path("README.md")));
        assert!(!rules.is_file_included(&path("docs/README.md")));
        assert!(rules.is_file_included(&path("README.md.bak")));
        assert!(rules.is_file_included(&path("readme.md")));
    }

    #[test]
    fn file_exact_path_requires_full_match() {
        let rules = rules(&["sub/file.txt"]);
        assert!(!rules.is_file_included(&path("sub/file.txt")));
        assert!(rules.is_file_included(&path("file.txt")));
        assert!(rules.is_file_included(&path("other/sub/file.txt")));
    }

    #[test]
    fn exact_path_prefix_applies_to_folders_but_not_files() {
        // A rule naming a folder prefix blocks the folder, but the same rule never
        // matches a file below it on its own.
        let rules = rules(&["sub"]);
        assert!(!rules.is_folder_included(&path("sub/inner")));
        assert!(rules.is_file_included(&path("sub/inner.txt")));
    }

    #[test]
    fn display_round_trips_rule_text() {
        for raw in ["*target", "src/generated"] {
            assert_eq!(IgnoreRule::parse(raw).unwrap().to_string(), raw);
        }
    }
}
