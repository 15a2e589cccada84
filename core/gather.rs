use crate::error::{AppError, Result};
use crate::rules::{IgnoreRules, RelativePath};
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum SkipReason {
    NotUtf8,
    // Permission denied, or removed between listing and reading
    Unreadable(String),
    NonUtf8Path,
    // The walker could not inspect the entry at all
    Unlisted(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotUtf8 => f.write_str("not valid UTF-8 text"),
            SkipReason::Unreadable(e) => write!(f, "unreadable: {}", e),
            SkipReason::NonUtf8Path => f.write_str("path is not valid UTF-8"),
            SkipReason::Unlisted(e) => write!(f, "could not be listed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Text(String),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRecord<'a> {
    pub relative_path: &'a str,
    pub content: &'a str,
}

// Keyed by `/`-separated relative path, in traversal order. Never mutated after `traverse`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalResult {
    files: IndexMap<String, String>,
    skipped: Vec<SkippedFile>,
}

impl TraversalResult {
    pub fn files(&self) -> &IndexMap<String, String> {
        &self.files
    }

    pub fn get(&self, relative_path: &str) -> Option<&str> {
        self.files.get(relative_path).map(String::as_str)
    }

    pub fn records(&self) -> impl Iterator<Item = FileRecord<'_>> {
        self.files.iter().map(|(path, content)| FileRecord {
            relative_path: path,
            content,
        })
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }
}

pub fn read_text_file(path: &Path) -> ReadOutcome {
    match fs::read(path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(content) => ReadOutcome::Text(content),
            Err(e) => {
                log::debug!("Skipping non-UTF-8 file: {} ({})", path.display(), e);
                ReadOutcome::Skipped(SkipReason::NotUtf8)
            }
        },
        Err(e) => {
            log::debug!("Skipping unreadable file: {} ({})", path.display(), e);
            ReadOutcome::Skipped(SkipReason::Unreadable(e.to_string()))
        }
    }
}

/// Walks `root` depth-first and collects every file not excluded by `rules`.
///
/// Within a directory, files come first in name order, then each
/// subdirectory is walked in name order. Excluded folders are never
/// descended into. Only a missing or non-directory root is an error.
/// Per-file failures end up in [`TraversalResult::skipped`].
pub fn traverse(root: &Path, rules: &IgnoreRules) -> Result<TraversalResult> {
    let metadata = fs::metadata(root).map_err(|e| AppError::InvalidRoot {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !metadata.is_dir() {
        return Err(AppError::InvalidRoot {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    log::info!(
        "Walking project directory: {} ({} ignore rules)",
        root.display(),
        rules.len()
    );

    let mut files = IndexMap::<String, String>::new();
    let mut skipped = Vec::<SkippedFile>::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by(files_before_folders)
        .into_iter()
        .filter_entry(|entry| is_entry_allowed(entry, root, rules));

    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                if e.depth() == 0 {
                    return Err(AppError::InvalidRoot {
                        path: root.to_path_buf(),
                        reason: e.to_string(),
                    });
                }
                log::warn!("Error walking directory: {}", e);
                if let Some(path) = e.path() {
                    skipped.push(SkippedFile {
                        path: display_relative(path, root),
                        reason: SkipReason::Unlisted(e.to_string()),
                    });
                }
                continue;
            }
        };

        if entry.depth() == 0 || !is_readable_file(&entry) {
            continue;
        }

        let Some(relative_path) = relative_path_of(entry.path(), root) else {
            log::warn!("Could not get relative path for: {}", entry.path().display());
            skipped.push(SkippedFile {
                path: display_relative(entry.path(), root),
                reason: SkipReason::NonUtf8Path,
            });
            continue;
        };

        if !rules.is_file_included(&relative_path) {
            continue;
        }

        let key = relative_path.to_string();
        match read_text_file(entry.path()) {
            ReadOutcome::Text(content) => {
                log::trace!("Including file: {} ({} bytes)", key, content.len());
                files.insert(key, content);
            }
            ReadOutcome::Skipped(reason) => {
                skipped.push(SkippedFile { path: key, reason });
            }
        }
    }

    log::info!(
        "Directory walk complete. Included {} files, skipped {}.",
        files.len(),
        skipped.len()
    );
    Ok(TraversalResult { files, skipped })
}

fn files_before_folders(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn is_entry_allowed(entry: &DirEntry, root: &Path, rules: &IgnoreRules) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    match relative_path_of(entry.path(), root) {
        Some(folder) => rules.is_folder_included(&folder),
        None => {
            log::warn!(
                "Skipping folder with non UTF-8 path: {}",
                entry.path().display()
            );
            false
        }
    }
}

// Symlinks are never descended into, but a link pointing at a regular file is read.
fn is_readable_file(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

fn relative_path_of(path: &Path, root: &Path) -> Option<RelativePath> {
    let relative = pathdiff::diff_paths(path, root)?;
    RelativePath::from_path(&relative)
}

fn display_relative(path: &Path, root: &Path) -> String {
    pathdiff::diff_paths(path, root)
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}
