use quickdoc_core::{AppError, IgnoreRules, SkipReason, traverse};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn rules(raw: &[&str]) -> IgnoreRules {
    IgnoreRules::parse_all(raw).unwrap()
}

fn paths(root: &Path, raw_rules: &[&str]) -> Vec<String> {
    traverse(root, &rules(raw_rules))
        .unwrap()
        .paths()
        .map(String::from)
        .collect()
}

#[test]
fn traversal_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "main.py", b"print(1)");
    write(dir.path(), "pkg/a.py", b"a = 1");
    write(dir.path(), "pkg/sub/b.py", b"b = 2");
    write(dir.path(), "z.md", b"# z");

    let first = traverse(dir.path(), &IgnoreRules::default()).unwrap();
    let second = traverse(dir.path(), &IgnoreRules::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.paths().collect::<Vec<_>>(),
        vec!["main.py", "z.md", "pkg/a.py", "pkg/sub/b.py"]
    );
}

#[test]
fn wildcard_on_ancestor_prunes_whole_subtree() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a/b/c.txt", b"c");
    write(dir.path(), "keep.txt", b"k");

    assert_eq!(paths(dir.path(), &["*a"]), vec!["keep.txt"]);
}

#[test]
fn wildcard_prunes_nested_folder_of_that_name() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "quick_doc/__pycache__/m.pyc", b"cache");
    write(dir.path(), "quick_doc/__init__.py", b"");
    write(dir.path(), "quick_doc/manage.py", b"pass");

    assert_eq!(
        paths(dir.path(), &["*__pycache__", "*__init__.py"]),
        vec!["quick_doc/manage.py"]
    );
}

#[test]
fn exact_path_prunes_only_that_folder() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "sub/deep/file.txt", b"deep");
    write(dir.path(), "sub/other.txt", b"other");

    assert_eq!(paths(dir.path(), &["sub/deep"]), vec!["sub/other.txt"]);
}

#[test]
fn exact_path_matches_ancestor_of_deeper_folders() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "sub/deep/deeper/x.txt", b"x");
    write(dir.path(), "sub/y.txt", b"y");

    assert_eq!(paths(dir.path(), &["sub/deep"]), vec!["sub/y.txt"]);
}

#[test]
fn exact_path_excludes_a_single_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/gen.rs", b"// generated");
    write(dir.path(), "src/lib.rs", b"// lib");
    write(dir.path(), "gen.rs", b"// top level");

    assert_eq!(paths(dir.path(), &["src/gen.rs"]), vec!["gen.rs", "src/lib.rs"]);
}

#[test]
fn file_wildcard_matches_basename_exactly() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "README.md", b"top");
    write(dir.path(), "docs/README.md", b"nested");
    write(dir.path(), "README.md.bak", b"backup");

    assert_eq!(paths(dir.path(), &["*README.md"]), vec!["README.md.bak"]);
}

#[test]
fn matching_is_case_sensitive() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Build/out.txt", b"o");

    assert_eq!(paths(dir.path(), &["*build"]), vec!["Build/out.txt"]);
}

#[test]
fn empty_file_is_included_with_empty_content() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "empty.txt", b"");

    let result = traverse(dir.path(), &IgnoreRules::default()).unwrap();
    assert_eq!(result.get("empty.txt"), Some(""));
    assert_eq!(result.len(), 1);
}

#[test]
fn non_text_file_is_omitted_without_aborting() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "image.png", &[0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe]);
    write(dir.path(), "script.sh", b"echo hi");

    let result = traverse(dir.path(), &IgnoreRules::default()).unwrap();
    assert_eq!(result.paths().collect::<Vec<_>>(), vec!["script.sh"]);
    assert_eq!(result.skipped().len(), 1);
    assert_eq!(result.skipped()[0].path, "image.png");
    assert_eq!(result.skipped()[0].reason, SkipReason::NotUtf8);
}

#[test]
fn empty_tree_without_rules_gives_empty_result() {
    let dir = TempDir::new().unwrap();
    let result = traverse(dir.path(), &IgnoreRules::default()).unwrap();
    assert!(result.is_empty());
    assert!(result.skipped().is_empty());
}

#[test]
fn root_cannot_be_excluded_by_its_own_name() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("project");
    write(&root, "lib.rs", b"fn main() {}");

    assert_eq!(paths(&root, &["*project"]), vec!["lib.rs"]);
}

#[test]
fn missing_root_is_fatal() {
    let dir = TempDir::new().unwrap();
    let err = traverse(&dir.path().join("nope"), &IgnoreRules::default()).unwrap_err();
    assert!(matches!(err, AppError::InvalidRoot { .. }));
}

#[cfg(unix)]
#[test]
fn symlinked_folders_are_not_followed() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "real/a.txt", b"a");
    std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("loop")).unwrap();

    assert_eq!(paths(dir.path(), &[]), vec!["real/a.txt"]);
}
